use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::institution::Field;

/// Search request as received from a caller, before any shape checks.
///
/// Absent members deserialize to `null` and take their defaults during [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
	#[serde(default)]
	pub criteria: Value,
	#[serde(default)]
	pub fields: Value,
	#[serde(default)]
	pub offset: Value,
	#[serde(default)]
	pub limit: Value,
	#[serde(default)]
	pub include_inactive: bool,
}
impl SearchRequest {
	pub fn text(criteria: impl Into<String>) -> Self {
		Self { criteria: Value::String(criteria.into()), ..Default::default() }
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criteria {
	/// Matched against every searchable attribute in scope.
	Text(String),
	/// Every entry must match its attribute.
	Structured(BTreeMap<Field, String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
	pub criteria: Criteria,
	pub fields: Option<Vec<Field>>,
	pub offset: u64,
	pub limit: u32,
	pub include_inactive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
	#[error("No search criteria provided.")]
	MissingCriteria,
	#[error("Invalid fields format.")]
	InvalidFieldsFormat,
	#[error("Invalid offset.")]
	InvalidOffset,
	#[error("Invalid limit.")]
	InvalidLimit,
}
impl ValidationError {
	/// Stable numeric code reported alongside the message.
	pub fn code(self) -> u32 {
		match self {
			Self::MissingCriteria => 114_120,
			Self::InvalidFieldsFormat => 114_121,
			Self::InvalidOffset => 114_122,
			Self::InvalidLimit => 114_123,
		}
	}

	/// Request member that failed validation.
	pub fn field(self) -> &'static str {
		match self {
			Self::MissingCriteria => "criteria",
			Self::InvalidFieldsFormat => "fields",
			Self::InvalidOffset => "offset",
			Self::InvalidLimit => "limit",
		}
	}

	pub fn error_code(self) -> &'static str {
		match self {
			Self::MissingCriteria => "MISSING_CRITERIA",
			Self::InvalidFieldsFormat => "INVALID_FIELDS_FORMAT",
			Self::InvalidOffset => "INVALID_OFFSET",
			Self::InvalidLimit => "INVALID_LIMIT",
		}
	}
}

/// Checks the request shape and produces a typed query.
///
/// Rules run in order (criteria, fields, offset, limit) and the first violation is returned.
pub fn validate(
	req: &SearchRequest,
	limits: &inst_config::Search,
) -> Result<SearchQuery, ValidationError> {
	let criteria = parse_criteria(&req.criteria).ok_or(ValidationError::MissingCriteria)?;
	let fields = parse_fields(&req.fields)?;
	let offset = parse_offset(&req.offset)?;
	let limit = parse_limit(&req.limit, limits)?;

	Ok(SearchQuery { criteria, fields, offset, limit, include_inactive: req.include_inactive })
}

fn parse_criteria(raw: &Value) -> Option<Criteria> {
	match raw {
		Value::String(text) => {
			let trimmed = text.trim();

			(!trimmed.is_empty()).then(|| Criteria::Text(trimmed.to_string()))
		},
		Value::Number(number) => Some(Criteria::Text(number.to_string())),
		Value::Object(map) => {
			if map.is_empty() {
				return None;
			}

			let mut structured = BTreeMap::new();

			for (key, value) in map {
				let field = Field::parse(key).filter(|field| field.is_searchable())?;
				let term = value.as_str().map(str::trim).filter(|term| !term.is_empty())?;

				structured.insert(field, term.to_string());
			}

			Some(Criteria::Structured(structured))
		},
		Value::Null | Value::Bool(_) | Value::Array(_) => None,
	}
}

fn parse_fields(raw: &Value) -> Result<Option<Vec<Field>>, ValidationError> {
	let items = match raw {
		Value::Null => return Ok(None),
		Value::Array(items) => items,
		_ => return Err(ValidationError::InvalidFieldsFormat),
	};

	if items.is_empty() {
		return Ok(None);
	}

	let mut fields = Vec::with_capacity(items.len());

	for item in items {
		let field = item
			.as_str()
			.and_then(Field::parse)
			.ok_or(ValidationError::InvalidFieldsFormat)?;

		if !fields.contains(&field) {
			fields.push(field);
		}
	}

	Ok(Some(fields))
}

fn parse_offset(raw: &Value) -> Result<u64, ValidationError> {
	match raw {
		Value::Null => Ok(0),
		Value::Number(number) => number.as_u64().ok_or(ValidationError::InvalidOffset),
		_ => Err(ValidationError::InvalidOffset),
	}
}

fn parse_limit(raw: &Value, limits: &inst_config::Search) -> Result<u32, ValidationError> {
	let limit = match raw {
		Value::Null => return Ok(limits.default_limit),
		Value::Number(number) => number.as_u64().ok_or(ValidationError::InvalidLimit)?,
		_ => return Err(ValidationError::InvalidLimit),
	};

	if limit == 0 || limit > u64::from(limits.max_limit) {
		return Err(ValidationError::InvalidLimit);
	}

	u32::try_from(limit).map_err(|_| ValidationError::InvalidLimit)
}
