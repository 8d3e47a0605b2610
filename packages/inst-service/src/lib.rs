pub mod directory;
pub mod hierarchy;
pub mod scope;
pub mod search;

mod context;
mod error;

pub use context::{CallerContext, CancelReason};
pub use directory::PgDirectory;
pub use error::{Error, Result};
pub use hierarchy::{Expansion, HierarchyExpander};
pub use inst_domain::{
	CallerRole, Criteria, Field, Institution, InstitutionId, SearchQuery, SearchRequest,
	ValidationError,
};
pub use scope::{AuthorizationScope, AuthorizationScopeResolver};
pub use search::SearchResult;

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use inst_config::Config;
use inst_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Ids of one page plus the size of the whole listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdPage {
	pub ids: Vec<InstitutionId>,
	pub total: u64,
}

/// One page of a node's direct children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildrenPage {
	pub ids: Vec<InstitutionId>,
	/// Children's details projected to the requested fields, for callers that render a level
	/// directly. Expansion reads only `ids` and `total`.
	pub info: HashMap<InstitutionId, Institution>,
	pub total: u64,
}

/// Arguments forwarded to the persistence search.
#[derive(Debug, Clone, Copy)]
pub struct BackendSearch<'a> {
	pub criteria: &'a Criteria,
	pub fields: Option<&'a [Field]>,
	pub offset: u64,
	pub limit: u32,
	pub include_inactive: bool,
	pub role: CallerRole,
	/// `Some` restricts matches to these ids. An empty list matches nothing.
	pub allowed_ids: Option<&'a [InstitutionId]>,
}

pub trait OwnedInstitutionsLookup
where
	Self: Send + Sync,
{
	fn owned<'a>(
		&'a self,
		ctx: &'a CallerContext,
		fields: Option<&'a [Field]>,
		offset: u64,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<IdPage>>;
}

pub trait ChildrenLookup
where
	Self: Send + Sync,
{
	fn children<'a>(
		&'a self,
		ctx: &'a CallerContext,
		parent_id: InstitutionId,
		fields: Option<&'a [Field]>,
		offset: u64,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<ChildrenPage>>;
}

pub trait InstitutionSearchBackend
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		ctx: &'a CallerContext,
		args: BackendSearch<'a>,
	) -> BoxFuture<'a, color_eyre::Result<IdPage>>;
}

pub trait InstitutionDetailLookup
where
	Self: Send + Sync,
{
	fn details<'a>(
		&'a self,
		ctx: &'a CallerContext,
		ids: &'a [InstitutionId],
		fields: &'a [Field],
	) -> BoxFuture<'a, color_eyre::Result<HashMap<InstitutionId, Institution>>>;
}

#[derive(Clone)]
pub struct Collaborators {
	pub owned: Arc<dyn OwnedInstitutionsLookup>,
	pub children: Arc<dyn ChildrenLookup>,
	pub search: Arc<dyn InstitutionSearchBackend>,
	pub details: Arc<dyn InstitutionDetailLookup>,
}
impl Collaborators {
	pub fn new(
		owned: Arc<dyn OwnedInstitutionsLookup>,
		children: Arc<dyn ChildrenLookup>,
		search: Arc<dyn InstitutionSearchBackend>,
		details: Arc<dyn InstitutionDetailLookup>,
	) -> Self {
		Self { owned, children, search, details }
	}

	/// Backs all four lookups with the same collaborator.
	pub fn uniform<T>(collaborator: Arc<T>) -> Self
	where
		T: OwnedInstitutionsLookup
			+ ChildrenLookup
			+ InstitutionSearchBackend
			+ InstitutionDetailLookup
			+ 'static,
	{
		Self {
			owned: collaborator.clone(),
			children: collaborator.clone(),
			search: collaborator.clone(),
			details: collaborator,
		}
	}
}

pub struct InstitutionService {
	pub cfg: Config,
	pub collaborators: Collaborators,
}
impl InstitutionService {
	pub fn new(cfg: Config, db: Db) -> Self {
		let collaborators = Collaborators::uniform(Arc::new(PgDirectory::new(db)));

		Self { cfg, collaborators }
	}

	pub fn with_collaborators(cfg: Config, collaborators: Collaborators) -> Self {
		Self { cfg, collaborators }
	}

	pub fn scope_resolver(&self) -> AuthorizationScopeResolver<'_> {
		AuthorizationScopeResolver::new(
			self.collaborators.owned.as_ref(),
			HierarchyExpander::new(self.collaborators.children.as_ref(), &self.cfg.hierarchy),
			&self.cfg.hierarchy,
		)
	}
}
