use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
	AuthorizationScope, BackendSearch, CallerContext, Error, Field, IdPage, Institution,
	InstitutionId, InstitutionService, Result, SearchRequest,
};
use inst_domain::detail_fields;

/// One page of matching institutions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
	/// Matches on this page, unique, at most `limit` long.
	pub ids: Vec<InstitutionId>,
	/// Size of the whole match set across all pages.
	pub total: u64,
	pub institution_info: BTreeMap<InstitutionId, Institution>,
}

impl InstitutionService {
	/// Validates the request, narrows restricted callers to their scope, and returns one page of
	/// hydrated matches.
	pub async fn search(&self, req: &SearchRequest, ctx: &CallerContext) -> Result<SearchResult> {
		let result = self.run_search(req, ctx).await;

		if let Err(err) = &result {
			log_failure(ctx, err);
		}

		result
	}

	async fn run_search(&self, req: &SearchRequest, ctx: &CallerContext) -> Result<SearchResult> {
		let query = inst_domain::validate(req, &self.cfg.search)?;
		let fields = query.fields.as_deref();
		let scope = if ctx.role.is_restricted() {
			Some(self.scope_resolver().resolve(ctx, fields, query.offset, query.limit).await?)
		} else {
			None
		};
		let args = BackendSearch {
			criteria: &query.criteria,
			fields,
			offset: query.offset,
			limit: query.limit,
			include_inactive: query.include_inactive,
			role: ctx.role,
			allowed_ids: scope.as_ref().map(|scope| scope.ids.as_slice()),
		};
		let page = ctx
			.guard(self.collaborators.search.search(ctx, args))
			.await
			.map_err(|reason| Error::cancelled(ctx, reason))?
			.map_err(|err| Error::backend(ctx, format!("Search backend failed: {err}")))?;
		let page = check_page(ctx, page, query.limit, scope.as_ref())?;
		let institution_info = if page.ids.is_empty() {
			BTreeMap::new()
		} else {
			self.hydrate(ctx, &page.ids, fields).await?
		};

		tracing::info!(
			request_id = %ctx.request_id,
			role = %ctx.role,
			scope_size = scope.as_ref().map(AuthorizationScope::len),
			expanded_total = scope.as_ref().map(AuthorizationScope::expanded_total),
			total = page.total,
			returned = page.ids.len(),
			"Institution search completed."
		);

		Ok(SearchResult { ids: page.ids, total: page.total, institution_info })
	}

	async fn hydrate(
		&self,
		ctx: &CallerContext,
		ids: &[InstitutionId],
		fields: Option<&[Field]>,
	) -> Result<BTreeMap<InstitutionId, Institution>> {
		let hydrated_fields = detail_fields(fields);
		let mut details = ctx
			.guard(self.collaborators.details.details(ctx, ids, &hydrated_fields))
			.await
			.map_err(|reason| Error::cancelled(ctx, reason))?
			.map_err(|err| Error::backend(ctx, format!("Detail lookup failed: {err}")))?;
		let mut info = BTreeMap::new();

		for id in ids {
			let Some(institution) = details.remove(id) else {
				return Err(Error::backend(ctx, format!("Detail lookup returned no record for {id}.")));
			};

			info.insert(*id, institution);
		}

		Ok(info)
	}
}

/// Rejects a backend page that breaks the result invariants instead of repairing it.
fn check_page(
	ctx: &CallerContext,
	page: IdPage,
	limit: u32,
	scope: Option<&AuthorizationScope>,
) -> Result<IdPage> {
	if page.ids.len() > limit as usize {
		return Err(Error::backend(
			ctx,
			format!("Search backend returned {} ids for a limit of {limit}.", page.ids.len()),
		));
	}
	if page.total < page.ids.len() as u64 {
		return Err(Error::backend(
			ctx,
			format!(
				"Search backend reported a total of {} for a page of {} ids.",
				page.total,
				page.ids.len()
			),
		));
	}

	let mut seen = HashSet::with_capacity(page.ids.len());

	for id in &page.ids {
		if !seen.insert(*id) {
			return Err(Error::backend(ctx, format!("Search backend returned {id} twice.")));
		}
		if let Some(scope) = scope
			&& !scope.contains(*id)
		{
			return Err(Error::backend(
				ctx,
				format!("Search backend returned {id} outside the caller's scope."),
			));
		}
	}

	Ok(page)
}

fn log_failure(ctx: &CallerContext, err: &Error) {
	match err {
		Error::ScopeResolution { message, .. } | Error::SearchBackend { message, .. } => {
			tracing::error!(
				request_id = %ctx.request_id,
				caller_id = %ctx.caller_id,
				error = %message,
				"{err}"
			);
		},
		Error::Cancelled { reason, .. } => {
			tracing::warn!(request_id = %ctx.request_id, %reason, "Institution search interrupted.");
		},
		Error::Validation(_) => {},
	}
}
