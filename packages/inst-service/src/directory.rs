use std::collections::HashMap;

use inst_storage::{
	db::Db,
	models::InstitutionRow,
	queries::{self, SearchFilter},
};

use crate::{
	BackendSearch, BoxFuture, CallerContext, ChildrenLookup, ChildrenPage, Field, IdPage,
	Institution, InstitutionDetailLookup, InstitutionId, InstitutionSearchBackend,
	OwnedInstitutionsLookup,
};

/// Postgres-backed implementation of every collaborator the search needs.
pub struct PgDirectory {
	db: Db,
}
impl PgDirectory {
	pub fn new(db: Db) -> Self {
		Self { db }
	}

	pub fn db(&self) -> &Db {
		&self.db
	}
}

impl OwnedInstitutionsLookup for PgDirectory {
	fn owned<'a>(
		&'a self,
		ctx: &'a CallerContext,
		_fields: Option<&'a [Field]>,
		offset: u64,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<IdPage>> {
		Box::pin(async move {
			let page = queries::owned_page(&self.db, &ctx.caller_id, offset, limit).await?;

			Ok(IdPage { ids: page.items, total: page.total })
		})
	}
}

impl ChildrenLookup for PgDirectory {
	fn children<'a>(
		&'a self,
		_ctx: &'a CallerContext,
		parent_id: InstitutionId,
		fields: Option<&'a [Field]>,
		offset: u64,
		limit: u32,
	) -> BoxFuture<'a, color_eyre::Result<ChildrenPage>> {
		Box::pin(async move {
			let page = queries::children_page(&self.db, parent_id, offset, limit).await?;
			let mut ids = Vec::with_capacity(page.items.len());
			let mut info = HashMap::with_capacity(page.items.len());

			for row in page.items {
				ids.push(row.institution_id);
				info.insert(row.institution_id, project(row, fields.unwrap_or_default()));
			}

			Ok(ChildrenPage { ids, info, total: page.total })
		})
	}
}

impl InstitutionSearchBackend for PgDirectory {
	fn search<'a>(
		&'a self,
		_ctx: &'a CallerContext,
		args: BackendSearch<'a>,
	) -> BoxFuture<'a, color_eyre::Result<IdPage>> {
		Box::pin(async move {
			let filter = SearchFilter {
				criteria: args.criteria,
				fields: args.fields,
				include_inactive: args.include_inactive,
				allowed: args.allowed_ids,
			};
			let page = queries::search_page(&self.db, &filter, args.offset, args.limit).await?;

			Ok(IdPage { ids: page.items, total: page.total })
		})
	}
}

impl InstitutionDetailLookup for PgDirectory {
	fn details<'a>(
		&'a self,
		_ctx: &'a CallerContext,
		ids: &'a [InstitutionId],
		fields: &'a [Field],
	) -> BoxFuture<'a, color_eyre::Result<HashMap<InstitutionId, Institution>>> {
		Box::pin(async move {
			let rows = queries::details(&self.db, ids).await?;

			Ok(rows.into_iter().map(|row| (row.institution_id, project(row, fields))).collect())
		})
	}
}

/// Identifying attributes are always kept; `active` only when requested.
fn project(row: InstitutionRow, fields: &[Field]) -> Institution {
	Institution {
		id: row.institution_id,
		name: row.name,
		country: row.country,
		parent_id: row.parent_id,
		active: fields.contains(&Field::Active).then_some(row.active),
	}
}
