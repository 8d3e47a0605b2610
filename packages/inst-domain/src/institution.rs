use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub type InstitutionId = i64;

/// A node of the institution forest as returned to callers.
///
/// `id`, `name`, `country`, and `parent_id` are always hydrated. `active` is only present when the
/// request asked for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
	pub id: InstitutionId,
	pub name: String,
	pub country: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub parent_id: Option<InstitutionId>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
	Id,
	Name,
	Country,
	ParentId,
	Active,
}
impl Field {
	/// Attributes hydrated for every institution regardless of the requested fields.
	pub const IDENTIFYING: [Self; 4] = [Self::Id, Self::Country, Self::Name, Self::ParentId];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Id => "id",
			Self::Name => "name",
			Self::Country => "country",
			Self::ParentId => "parent_id",
			Self::Active => "active",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim() {
			"id" => Some(Self::Id),
			"name" => Some(Self::Name),
			"country" => Some(Self::Country),
			"parent_id" | "parentId" => Some(Self::ParentId),
			"active" => Some(Self::Active),
			_ => None,
		}
	}

	/// Whether free-text criteria can be matched against this attribute.
	pub fn is_searchable(self) -> bool {
		matches!(self, Self::Name | Self::Country)
	}
}
impl fmt::Display for Field {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
	FullAccess,
	Restricted,
}
impl CallerRole {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::FullAccess => "full_access",
			Self::Restricted => "restricted",
		}
	}

	pub fn is_restricted(self) -> bool {
		self != Self::FullAccess
	}
}
impl FromStr for CallerRole {
	type Err = String;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw.trim() {
			"full_access" => Ok(Self::FullAccess),
			"restricted" => Ok(Self::Restricted),
			other => Err(format!("Unknown caller role {other:?}.")),
		}
	}
}
impl fmt::Display for CallerRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Fields to hydrate for detail assembly: the identifying attributes followed by any extra
/// requested ones, without duplicates.
pub fn detail_fields(requested: Option<&[Field]>) -> Vec<Field> {
	let mut out = Field::IDENTIFYING.to_vec();

	for field in requested.unwrap_or_default() {
		if !out.contains(field) {
			out.push(*field);
		}
	}

	out
}
