use uuid::Uuid;

use crate::{CallerContext, CancelReason};
use inst_domain::ValidationError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures reported by [`crate::InstitutionService::search`].
///
/// Only validation errors describe the input. The others display an opaque message with the request
/// id; `message` keeps the collaborator detail for logs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	Validation(#[from] ValidationError),
	#[error("Failed to resolve the authorization scope for request {request_id}.")]
	ScopeResolution { request_id: Uuid, message: String },
	#[error("Institution search failed for request {request_id}.")]
	SearchBackend { request_id: Uuid, message: String },
	#[error("Request {request_id} was {reason}.")]
	Cancelled { request_id: Uuid, reason: CancelReason },
}
impl Error {
	pub fn request_id(&self) -> Option<Uuid> {
		match self {
			Self::Validation(_) => None,
			Self::ScopeResolution { request_id, .. }
			| Self::SearchBackend { request_id, .. }
			| Self::Cancelled { request_id, .. } => Some(*request_id),
		}
	}

	pub(crate) fn scope(ctx: &CallerContext, message: impl Into<String>) -> Self {
		Self::ScopeResolution { request_id: ctx.request_id, message: message.into() }
	}

	pub(crate) fn backend(ctx: &CallerContext, message: impl Into<String>) -> Self {
		Self::SearchBackend { request_id: ctx.request_id, message: message.into() }
	}

	pub(crate) fn cancelled(ctx: &CallerContext, reason: CancelReason) -> Self {
		Self::Cancelled { request_id: ctx.request_id, reason }
	}
}
