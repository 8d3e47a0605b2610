use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::institution_search::support::{self, MemoryDirectory};
use inst_service::{CancelReason, Error, SearchRequest};

#[tokio::test]
async fn cancelled_request_makes_no_lookups() {
	let directory = Arc::new(support::beijing_directory());
	let service = support::service(directory.clone());
	let token = CancellationToken::new();

	token.cancel();

	let ctx = support::restricted().with_cancellation(token);
	let result = service.search(&SearchRequest::text("Beijing"), &ctx).await;

	assert!(
		matches!(result, Err(Error::Cancelled { reason: CancelReason::Cancelled, .. })),
		"Got {result:?}"
	);
	assert_eq!(MemoryDirectory::count(&directory.owned_calls), 0);
	assert_eq!(MemoryDirectory::count(&directory.search_calls), 0);
}

#[tokio::test]
async fn slow_expansion_is_cut_off_at_the_deadline() {
	let directory = Arc::new(MemoryDirectory {
		children_delay: Some(Duration::from_secs(5)),
		..support::beijing_directory()
	});
	let service = support::service(directory.clone());
	let ctx = support::restricted().with_timeout(Duration::from_millis(20));
	let result = service.search(&SearchRequest::text("Beijing"), &ctx).await;

	assert!(
		matches!(result, Err(Error::Cancelled { reason: CancelReason::DeadlineElapsed, .. })),
		"Got {result:?}"
	);
	assert_eq!(MemoryDirectory::count(&directory.search_calls), 0);
}

#[tokio::test]
async fn cancellation_during_expansion_stops_the_search() {
	let directory = Arc::new(MemoryDirectory {
		children_delay: Some(Duration::from_secs(5)),
		..support::beijing_directory()
	});
	let service = support::service(directory.clone());
	let token = CancellationToken::new();
	let ctx = support::restricted().with_cancellation(token.clone());
	let canceller = tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(20)).await;
		token.cancel();
	});
	let result = service.search(&SearchRequest::text("Beijing"), &ctx).await;

	canceller.await.expect("Canceller task panicked.");

	assert!(
		matches!(result, Err(Error::Cancelled { reason: CancelReason::Cancelled, .. })),
		"Got {result:?}"
	);
	assert!(MemoryDirectory::count(&directory.children_calls) >= 1);
	assert_eq!(MemoryDirectory::count(&directory.search_calls), 0);
}
