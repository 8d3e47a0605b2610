pub mod institution;
pub mod search_query;

pub use institution::{CallerRole, Field, Institution, InstitutionId, detail_fields};
pub use search_query::{Criteria, SearchQuery, SearchRequest, ValidationError, validate};
