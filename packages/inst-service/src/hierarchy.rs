use std::collections::{HashSet, VecDeque};

use crate::{CallerContext, ChildrenLookup, Error, Field, InstitutionId, Result};

/// Descendants collected beneath one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
	pub root: InstitutionId,
	/// Distinct descendants in breadth-first order, root excluded.
	pub descendants: Vec<InstitutionId>,
	pub count: u64,
}

/// Flattens the subtree under an institution one level at a time.
///
/// The walk is an explicit breadth-first worklist with a visited set seeded with the root, so an
/// id is emitted at most once and cyclic parent links terminate. Each node's children are paged
/// until the lookup's reported total is reached; a lookup that repeats an id for the same parent or
/// needs more than `ceil(total / page_size) + 1` pages is rejected instead of looped on.
#[derive(Clone, Copy)]
pub struct HierarchyExpander<'a> {
	children: &'a dyn ChildrenLookup,
	page_size: u32,
	max_nodes: usize,
}
impl<'a> HierarchyExpander<'a> {
	pub fn new(children: &'a dyn ChildrenLookup, cfg: &inst_config::Hierarchy) -> Self {
		Self {
			children,
			page_size: cfg.children_page_size.max(1),
			max_nodes: cfg.max_nodes as usize,
		}
	}

	pub async fn expand(
		&self,
		ctx: &CallerContext,
		root: InstitutionId,
		fields: Option<&[Field]>,
	) -> Result<Expansion> {
		let mut visited = HashSet::from([root]);
		let mut queue = VecDeque::from([root]);
		let mut descendants = Vec::new();

		while let Some(node) = queue.pop_front() {
			let mut offset = 0_u64;
			let mut pages = 0_u64;
			let mut page_cap = None;
			let mut node_children = HashSet::new();

			loop {
				let page = ctx
					.guard(self.children.children(ctx, node, fields, offset, self.page_size))
					.await
					.map_err(|reason| Error::cancelled(ctx, reason))?
					.map_err(|err| {
						Error::scope(ctx, format!("Children lookup for institution {node} failed: {err}"))
					})?;
				let fetched = page.ids.len() as u64;
				let max_pages =
					*page_cap.get_or_insert(page.total.div_ceil(u64::from(self.page_size)) + 1);

				pages += 1;

				for child in page.ids {
					// A page must not repeat an id an earlier page of the same parent returned.
					if !node_children.insert(child) {
						return Err(Error::scope(
							ctx,
							format!("Children lookup for institution {node} repeated institution {child}."),
						));
					}
					if !visited.insert(child) {
						continue;
					}
					if descendants.len() >= self.max_nodes {
						return Err(Error::scope(
							ctx,
							format!(
								"Hierarchy under institution {root} exceeds {} descendants.",
								self.max_nodes
							),
						));
					}

					descendants.push(child);
					queue.push_back(child);
				}

				offset += fetched;

				if fetched == 0 || offset >= page.total {
					break;
				}
				if pages >= max_pages {
					return Err(Error::scope(
						ctx,
						format!(
							"Children lookup for institution {node} did not finish within {max_pages} pages."
						),
					));
				}
			}
		}

		tracing::debug!(
			request_id = %ctx.request_id,
			root,
			count = descendants.len(),
			"Expanded institution hierarchy."
		);

		Ok(Expansion { root, count: descendants.len() as u64, descendants })
	}
}
