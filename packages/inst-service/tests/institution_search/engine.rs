use std::sync::Arc;

use serde_json::json;

use crate::institution_search::support::{self, MemoryDirectory};
use inst_service::{
	CallerRole, Error, IdPage, Institution, SearchRequest, SearchResult, ValidationError,
};

fn beijing_request() -> SearchRequest {
	SearchRequest {
		criteria: json!("International School of Beijing"),
		fields: json!(["id", "name", "country", "parentId"]),
		offset: json!(0),
		limit: json!(100),
		include_inactive: false,
	}
}

#[tokio::test]
async fn restricted_search_is_narrowed_to_the_expanded_scope() {
	let directory = Arc::new(MemoryDirectory {
		search_override: Some(IdPage { ids: vec![61, 60], total: 2 }),
		..support::beijing_directory()
	});
	let service = support::service(directory.clone());
	let result =
		service.search(&beijing_request(), &support::restricted()).await.expect("Search failed.");

	assert_eq!(result.ids, vec![61, 60]);
	assert_eq!(result.total, 2);
	assert_eq!(result.institution_info.len(), 2);
	assert_eq!(result.institution_info[&61].parent_id, Some(60));
	assert_eq!(result.institution_info[&60].name, "International School of Beijing");
	assert_eq!(result.institution_info[&60].active, None);

	let calls = directory.recorded_searches();

	assert_eq!(calls.len(), 1);
	assert_eq!(calls[0].role, CallerRole::Restricted);
	assert_eq!(calls[0].allowed_ids, Some(vec![60, 62, 61]));
	assert_eq!((calls[0].offset, calls[0].limit), (0, 100));
}

#[tokio::test]
async fn restricted_search_without_override_matches_by_name() {
	let directory = Arc::new(support::beijing_directory());
	let service = support::service(directory.clone());
	let result =
		service.search(&beijing_request(), &support::restricted()).await.expect("Search failed.");

	assert_eq!(result.ids, vec![60, 61]);
	assert_eq!(result.total, 2);
}

#[tokio::test]
async fn full_access_skips_scope_resolution() {
	let directory = Arc::new(support::beijing_directory());
	let service = support::service(directory.clone());
	let result = service
		.search(&SearchRequest::text("institution"), &support::full_access())
		.await
		.expect("Search failed.");

	assert_eq!(result.ids, vec![62]);
	assert_eq!(MemoryDirectory::count(&directory.owned_calls), 0);
	assert_eq!(MemoryDirectory::count(&directory.children_calls), 0);
	assert_eq!(directory.recorded_searches()[0].allowed_ids, None);
}

#[tokio::test]
async fn empty_page_is_a_well_formed_result() {
	let directory = Arc::new(support::beijing_directory());
	let service = support::service(directory.clone());
	let result = service
		.search(&SearchRequest::text("Atlantis"), &support::restricted())
		.await
		.expect("Search failed.");

	assert_eq!(result, SearchResult::default());
	assert_eq!(MemoryDirectory::count(&directory.detail_calls), 0);
}

#[tokio::test]
async fn caller_without_ownership_finds_nothing() {
	let directory = Arc::new(support::beijing_directory());
	let service = support::service(directory.clone());
	let ctx = inst_service::CallerContext::new("stranger", CallerRole::Restricted);
	let result = service.search(&beijing_request(), &ctx).await.expect("Search failed.");

	assert!(result.ids.is_empty());
	assert_eq!(result.total, 0);
	assert_eq!(directory.recorded_searches()[0].allowed_ids, Some(Vec::new()));
}

#[tokio::test]
async fn repeated_searches_are_identical() {
	let service = support::service(Arc::new(support::beijing_directory()));
	let ctx = support::restricted();
	let first = service.search(&beijing_request(), &ctx).await.expect("Search failed.");
	let second = service.search(&beijing_request(), &ctx).await.expect("Search failed.");

	assert_eq!(first, second);
}

#[tokio::test]
async fn paging_reports_the_whole_match_set() {
	let service = support::service(Arc::new(support::beijing_directory()));
	let request = SearchRequest { offset: json!(1), limit: json!(1), ..beijing_request() };
	let result = service.search(&request, &support::full_access()).await.expect("Search failed.");

	assert_eq!(result.ids, vec![61]);
	assert_eq!(result.total, 2);
}

#[tokio::test]
async fn inactive_institutions_need_an_explicit_opt_in() {
	let directory = support::beijing_directory().with_inactive_institution(
		63,
		"Beijing Annex",
		"China",
		Some(60),
	);
	let service = support::service(Arc::new(directory));
	let mut request = SearchRequest {
		criteria: json!({ "name": "annex" }),
		fields: json!(["name", "active"]),
		..Default::default()
	};
	let hidden = service.search(&request, &support::restricted()).await.expect("Search failed.");

	assert!(hidden.ids.is_empty());

	request.include_inactive = true;

	let shown = service.search(&request, &support::restricted()).await.expect("Search failed.");

	assert_eq!(shown.ids, vec![63]);
	assert_eq!(
		shown.institution_info[&63],
		Institution {
			id: 63,
			name: "Beijing Annex".to_string(),
			country: "China".to_string(),
			parent_id: Some(60),
			active: Some(false),
		}
	);
}

#[tokio::test]
async fn validation_fails_before_any_lookup() {
	let directory = Arc::new(support::beijing_directory());
	let service = support::service(directory.clone());
	let request = SearchRequest { limit: json!(0), ..beijing_request() };
	let result = service.search(&request, &support::restricted()).await;

	assert!(matches!(result, Err(Error::Validation(ValidationError::InvalidLimit))), "Got {result:?}");
	assert_eq!(MemoryDirectory::count(&directory.owned_calls), 0);
	assert_eq!(MemoryDirectory::count(&directory.search_calls), 0);

	let result = service.search(&SearchRequest::default(), &support::restricted()).await;

	assert!(matches!(result, Err(Error::Validation(ValidationError::MissingCriteria))));
}

#[tokio::test]
async fn scope_failure_never_reaches_the_backend() {
	let directory = Arc::new(MemoryDirectory { fail_owned: true, ..support::beijing_directory() });
	let service = support::service(directory.clone());
	let ctx = support::restricted();
	let result = service.search(&beijing_request(), &ctx).await;

	match result {
		Err(err @ Error::ScopeResolution { .. }) => {
			assert_eq!(err.request_id(), Some(ctx.request_id));
		},
		other => panic!("Expected ScopeResolution, got {other:?}"),
	}

	assert_eq!(MemoryDirectory::count(&directory.search_calls), 0);
}

#[tokio::test]
async fn backend_failure_is_opaque() {
	let directory = Arc::new(MemoryDirectory { fail_search: true, ..support::beijing_directory() });
	let service = support::service(directory);
	let result = service.search(&beijing_request(), &support::full_access()).await;

	match result {
		Err(err @ Error::SearchBackend { .. }) => {
			assert!(!err.to_string().contains("relation"), "Leaked detail: {err}");
		},
		other => panic!("Expected SearchBackend, got {other:?}"),
	}
}

#[tokio::test]
async fn backend_pages_breaking_invariants_are_rejected() {
	for page in [
		IdPage { ids: vec![60, 99], total: 2 },
		IdPage { ids: vec![60, 60], total: 2 },
		IdPage { ids: vec![60, 61], total: 1 },
	] {
		let directory =
			Arc::new(MemoryDirectory { search_override: Some(page), ..support::beijing_directory() });
		let service = support::service(directory);
		let result = service.search(&beijing_request(), &support::restricted()).await;

		assert!(matches!(result, Err(Error::SearchBackend { .. })), "Got {result:?}");
	}

	let directory = Arc::new(MemoryDirectory {
		search_override: Some(IdPage { ids: vec![60, 61, 62], total: 3 }),
		..support::beijing_directory()
	});
	let service = support::service(directory);
	let request = SearchRequest { limit: json!(2), ..beijing_request() };
	let result = service.search(&request, &support::full_access()).await;

	assert!(matches!(result, Err(Error::SearchBackend { .. })), "Got {result:?}");
}

#[tokio::test]
async fn missing_details_are_a_backend_failure() {
	let directory =
		Arc::new(MemoryDirectory { drop_details_for: Some(61), ..support::beijing_directory() });
	let service = support::service(directory);
	let result = service.search(&beijing_request(), &support::restricted()).await;

	assert!(matches!(result, Err(Error::SearchBackend { .. })), "Got {result:?}");
}
