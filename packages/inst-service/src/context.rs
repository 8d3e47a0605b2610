use std::{fmt, future::Future, time::Duration};

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use inst_domain::CallerRole;

/// Who is searching, plus the signals that bound the request's lifetime.
///
/// Every collaborator call made on behalf of a request receives this context and is raced against
/// its cancellation token and deadline.
#[derive(Debug, Clone)]
pub struct CallerContext {
	pub caller_id: String,
	pub role: CallerRole,
	pub request_id: Uuid,
	cancel: CancellationToken,
	deadline: Option<Instant>,
}
impl CallerContext {
	pub fn new(caller_id: impl Into<String>, role: CallerRole) -> Self {
		Self {
			caller_id: caller_id.into(),
			role,
			request_id: Uuid::new_v4(),
			cancel: CancellationToken::new(),
			deadline: None,
		}
	}

	pub fn with_request_id(mut self, request_id: Uuid) -> Self {
		self.request_id = request_id;

		self
	}

	pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
		self.cancel = cancel;

		self
	}

	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(deadline);

		self
	}

	pub fn with_timeout(self, timeout: Duration) -> Self {
		self.with_deadline(Instant::now() + timeout)
	}

	pub fn cancellation(&self) -> &CancellationToken {
		&self.cancel
	}

	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Runs `fut` unless the request is cancelled or its deadline passes first.
	pub(crate) async fn guard<F>(&self, fut: F) -> Result<F::Output, CancelReason>
	where
		F: Future,
	{
		if self.cancel.is_cancelled() {
			return Err(CancelReason::Cancelled);
		}

		let deadline = async {
			match self.deadline {
				Some(deadline) => time::sleep_until(deadline).await,
				None => std::future::pending::<()>().await,
			}
		};

		tokio::select! {
			biased;
			_ = self.cancel.cancelled() => Err(CancelReason::Cancelled),
			_ = deadline => Err(CancelReason::DeadlineElapsed),
			output = fut => Ok(output),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
	Cancelled,
	DeadlineElapsed,
}
impl fmt::Display for CancelReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Cancelled => f.write_str("cancelled"),
			Self::DeadlineElapsed => f.write_str("past its deadline"),
		}
	}
}
