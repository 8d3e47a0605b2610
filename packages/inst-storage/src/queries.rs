use sqlx::{PgConnection, Postgres, QueryBuilder};

use inst_domain::{Criteria, Field, InstitutionId};

use crate::{
	Error, Result,
	db::Db,
	models::{InstitutionRow, NewInstitution, Page},
};

const INSTITUTION_COLUMNS: &str =
	"institution_id, name, country, parent_id, active, created_at, updated_at";

/// Filter shared by the page query and the count query of a search.
pub struct SearchFilter<'a> {
	pub criteria: &'a Criteria,
	pub fields: Option<&'a [Field]>,
	pub include_inactive: bool,
	/// `Some` restricts matches to these ids; an empty list matches nothing.
	pub allowed: Option<&'a [InstitutionId]>,
}

pub async fn owned_page(db: &Db, caller_id: &str, offset: u64, limit: u32) -> Result<Page<i64>> {
	let mut snapshot = db.snapshot().await?;
	let page = owned_page_on(&mut snapshot, caller_id, offset, limit).await?;

	snapshot.commit().await?;

	Ok(page)
}

/// Reads one page of owned ids and their total on `conn`, which should hold a snapshot.
pub async fn owned_page_on(
	conn: &mut PgConnection,
	caller_id: &str,
	offset: u64,
	limit: u32,
) -> Result<Page<i64>> {
	let items: Vec<i64> = sqlx::query_scalar(
		"\
SELECT institution_id
FROM institution_owners
WHERE caller_id = $1
ORDER BY institution_id
OFFSET $2
LIMIT $3",
	)
	.bind(caller_id)
	.bind(to_i64(offset, "offset")?)
	.bind(i64::from(limit))
	.fetch_all(&mut *conn)
	.await?;
	let total: i64 =
		sqlx::query_scalar("SELECT count(*) FROM institution_owners WHERE caller_id = $1")
			.bind(caller_id)
			.fetch_one(&mut *conn)
			.await?;

	Ok(Page { items, total: to_u64(total) })
}

pub async fn children_page(
	db: &Db,
	parent_id: InstitutionId,
	offset: u64,
	limit: u32,
) -> Result<Page<InstitutionRow>> {
	let mut snapshot = db.snapshot().await?;
	let page = children_page_on(&mut snapshot, parent_id, offset, limit).await?;

	snapshot.commit().await?;

	Ok(page)
}

pub async fn children_page_on(
	conn: &mut PgConnection,
	parent_id: InstitutionId,
	offset: u64,
	limit: u32,
) -> Result<Page<InstitutionRow>> {
	let sql = format!(
		"\
SELECT {INSTITUTION_COLUMNS}
FROM institutions
WHERE parent_id = $1
ORDER BY institution_id
OFFSET $2
LIMIT $3"
	);
	let items: Vec<InstitutionRow> = sqlx::query_as(&sql)
		.bind(parent_id)
		.bind(to_i64(offset, "offset")?)
		.bind(i64::from(limit))
		.fetch_all(&mut *conn)
		.await?;
	let total: i64 = sqlx::query_scalar("SELECT count(*) FROM institutions WHERE parent_id = $1")
		.bind(parent_id)
		.fetch_one(&mut *conn)
		.await?;

	Ok(Page { items, total: to_u64(total) })
}

pub async fn search_page(
	db: &Db,
	filter: &SearchFilter<'_>,
	offset: u64,
	limit: u32,
) -> Result<Page<i64>> {
	let mut snapshot = db.snapshot().await?;
	let page = search_page_on(&mut snapshot, filter, offset, limit).await?;

	snapshot.commit().await?;

	Ok(page)
}

/// Page and count share `filter`; run both on one snapshot so the total covers the page.
pub async fn search_page_on(
	conn: &mut PgConnection,
	filter: &SearchFilter<'_>,
	offset: u64,
	limit: u32,
) -> Result<Page<i64>> {
	if filter.allowed.is_some_and(<[InstitutionId]>::is_empty) {
		return Ok(Page { items: Vec::new(), total: 0 });
	}

	let mut builder = QueryBuilder::<Postgres>::new("SELECT institution_id FROM institutions");

	push_filter(&mut builder, filter);
	builder.push(" ORDER BY name, institution_id OFFSET ");
	builder.push_bind(to_i64(offset, "offset")?);
	builder.push(" LIMIT ");
	builder.push_bind(i64::from(limit));

	let items: Vec<i64> = builder.build_query_scalar::<i64>().fetch_all(&mut *conn).await?;
	let mut builder = QueryBuilder::<Postgres>::new("SELECT count(*) FROM institutions");

	push_filter(&mut builder, filter);

	let total: i64 = builder.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

	Ok(Page { items, total: to_u64(total) })
}

pub async fn details(db: &Db, ids: &[InstitutionId]) -> Result<Vec<InstitutionRow>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let sql = format!("SELECT {INSTITUTION_COLUMNS} FROM institutions WHERE institution_id = ANY($1)");
	let rows = sqlx::query_as(&sql).bind(ids).fetch_all(&db.pool).await?;

	Ok(rows)
}

pub async fn insert_institution(db: &Db, institution: &NewInstitution) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO institutions (
	institution_id,
	name,
	country,
	parent_id,
	active
)
VALUES ($1, $2, $3, $4, $5)",
	)
	.bind(institution.institution_id)
	.bind(institution.name.as_str())
	.bind(institution.country.as_str())
	.bind(institution.parent_id)
	.bind(institution.active)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn grant_owner(db: &Db, caller_id: &str, institution_id: InstitutionId) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO institution_owners (caller_id, institution_id)
VALUES ($1, $2)
ON CONFLICT (caller_id, institution_id) DO NOTHING",
	)
	.bind(caller_id)
	.bind(institution_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub fn column(field: Field) -> &'static str {
	match field {
		Field::Id => "institution_id",
		Field::Name => "name",
		Field::Country => "country",
		Field::ParentId => "parent_id",
		Field::Active => "active",
	}
}

/// Searchable columns a free-text term is matched against.
///
/// Falls back to every searchable attribute when the requested fields name none.
pub fn text_search_fields(fields: Option<&[Field]>) -> Vec<Field> {
	let requested: Vec<Field> = fields
		.unwrap_or_default()
		.iter()
		.copied()
		.filter(|field| field.is_searchable())
		.collect();

	if requested.is_empty() { vec![Field::Name, Field::Country] } else { requested }
}

/// Wraps a term for a substring `ILIKE` match, escaping the pattern metacharacters.
pub fn like_pattern(term: &str) -> String {
	let mut out = String::with_capacity(term.len() + 2);

	out.push('%');

	for ch in term.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(ch);
	}

	out.push('%');

	out
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &SearchFilter<'_>) {
	builder.push(" WHERE ");

	match filter.criteria {
		Criteria::Text(term) => {
			let pattern = like_pattern(term);

			builder.push("(");

			for (i, field) in text_search_fields(filter.fields).into_iter().enumerate() {
				if i > 0 {
					builder.push(" OR ");
				}

				builder.push(column(field));
				builder.push(" ILIKE ");
				builder.push_bind(pattern.clone());
			}

			builder.push(")");
		},
		Criteria::Structured(terms) => {
			builder.push("(");

			for (i, (field, term)) in terms.iter().enumerate() {
				if i > 0 {
					builder.push(" AND ");
				}

				builder.push(column(*field));
				builder.push(" ILIKE ");
				builder.push_bind(like_pattern(term));
			}

			builder.push(")");
		},
	}

	if !filter.include_inactive {
		builder.push(" AND active");
	}
	if let Some(allowed) = filter.allowed {
		builder.push(" AND institution_id = ANY(");
		builder.push_bind(allowed.to_vec());
		builder.push(")");
	}
}

fn to_i64(value: u64, label: &str) -> Result<i64> {
	i64::try_from(value).map_err(|_| Error::InvalidArgument(format!("{label} is out of range.")))
}

fn to_u64(value: i64) -> u64 {
	u64::try_from(value).unwrap_or_default()
}
