use std::collections::HashSet;

use futures::{StreamExt, TryStreamExt, stream};

use crate::{
	CallerContext, Error, Expansion, Field, HierarchyExpander, InstitutionId,
	OwnedInstitutionsLookup, Result,
};

/// Institution ids a restricted caller may search within.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationScope {
	/// Base ids followed by their descendants, first-seen order, no duplicates.
	pub ids: Vec<InstitutionId>,
	/// Number of base ids returned by the owned-institutions lookup.
	pub base_total: u64,
	/// Sum of the per-root descendant counts.
	pub descendant_total: u64,
	members: HashSet<InstitutionId>,
}
impl AuthorizationScope {
	/// Folds expansions into one scope, keeping the first occurrence of every id.
	pub fn merge(base_ids: &[InstitutionId], expansions: &[Expansion]) -> Self {
		let mut ids = Vec::with_capacity(base_ids.len());
		let mut members = HashSet::with_capacity(base_ids.len());
		let descendants = expansions.iter().flat_map(|expansion| expansion.descendants.iter());

		for id in base_ids.iter().chain(descendants) {
			if members.insert(*id) {
				ids.push(*id);
			}
		}

		Self {
			ids,
			base_total: base_ids.len() as u64,
			descendant_total: expansions.iter().map(|expansion| expansion.count).sum(),
			members,
		}
	}

	/// Base ids plus every expansion's descendant count.
	///
	/// Diagnostic accounting only: overlapping subtrees are counted once per root, so this can
	/// exceed `ids.len()`. It is unrelated to a search result's `total`.
	pub fn expanded_total(&self) -> u64 {
		self.base_total + self.descendant_total
	}

	pub fn contains(&self, id: InstitutionId) -> bool {
		self.members.contains(&id)
	}

	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}
}

pub struct AuthorizationScopeResolver<'a> {
	owned: &'a dyn OwnedInstitutionsLookup,
	expander: HierarchyExpander<'a>,
	concurrency: usize,
}
impl<'a> AuthorizationScopeResolver<'a> {
	pub fn new(
		owned: &'a dyn OwnedInstitutionsLookup,
		expander: HierarchyExpander<'a>,
		cfg: &inst_config::Hierarchy,
	) -> Self {
		Self { owned, expander, concurrency: (cfg.expand_concurrency as usize).max(1) }
	}

	/// Computes the scope of a restricted caller.
	///
	/// The base lookup is paged with the search's own `offset` and `limit`. Any lookup failure
	/// fails the resolution; a partial scope is never returned.
	pub async fn resolve(
		&self,
		ctx: &CallerContext,
		fields: Option<&[Field]>,
		offset: u64,
		limit: u32,
	) -> Result<AuthorizationScope> {
		let base = ctx
			.guard(self.owned.owned(ctx, fields, offset, limit))
			.await
			.map_err(|reason| Error::cancelled(ctx, reason))?
			.map_err(|err| Error::scope(ctx, format!("Owned institutions lookup failed: {err}")))?;
		let expansions: Vec<Expansion> = stream::iter(base.ids.iter().copied())
			.map(|root| self.expander.expand(ctx, root, fields))
			.buffered(self.concurrency)
			.try_collect()
			.await?;
		let scope = AuthorizationScope::merge(&base.ids, &expansions);

		tracing::debug!(
			request_id = %ctx.request_id,
			base_total = scope.base_total,
			descendant_total = scope.descendant_total,
			expanded_total = scope.expanded_total(),
			permitted = scope.len(),
			"Resolved authorization scope."
		);

		Ok(scope)
	}
}
