use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InstitutionRow {
	pub institution_id: i64,
	pub name: String,
	pub country: String,
	pub parent_id: Option<i64>,
	pub active: bool,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewInstitution {
	pub institution_id: i64,
	pub name: String,
	pub country: String,
	pub parent_id: Option<i64>,
	pub active: bool,
}

/// One page of a paginated listing together with the size of the whole listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
	pub items: Vec<T>,
	pub total: u64,
}
