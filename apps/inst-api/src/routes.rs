use std::time::Duration;

use axum::{
	Json, Router,
	extract::{State, rejection::JsonRejection},
	http::{HeaderMap, HeaderValue, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;
use uuid::Uuid;

use crate::state::AppState;
use inst_service::{CallerContext, CallerRole, Error, SearchRequest, SearchResult};

pub const HEADER_CALLER_ID: &str = "x-caller-id";
pub const HEADER_CALLER_ROLE: &str = "x-caller-role";
pub const HEADER_REQUEST_ID: &str = "x-request-id";

const HEADER_AUTHORIZATION: &str = "authorization";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/institutions/search", post(search))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Response {
	let (request_id, request_id_error) = match read_request_id(&headers) {
		Ok(request_id) => (request_id, None),
		Err(err) => (Uuid::new_v4(), Some(err)),
	};
	let outcome = match request_id_error {
		Some(err) => Err(err),
		None => handle_search(&state, &headers, payload, request_id).await,
	};
	let mut response = match outcome {
		Ok(result) => Json(result).into_response(),
		Err(err) => err.into_response(),
	};

	if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
		response.headers_mut().insert(HEADER_REQUEST_ID, value);
	}

	response
}

async fn handle_search(
	state: &AppState,
	headers: &HeaderMap,
	payload: Result<Json<SearchRequest>, JsonRejection>,
	request_id: Uuid,
) -> Result<SearchResult, ApiError> {
	let cfg = &state.service.cfg;
	let authenticated = match cfg.security.api_auth_token.as_deref() {
		Some(token) if read_bearer_token(headers) == Some(token) => true,
		Some(_) =>
			return Err(ApiError::new(
				StatusCode::UNAUTHORIZED,
				"UNAUTHORIZED",
				"A valid bearer token is required.",
			)),
		None => false,
	};

	let caller_id = required_header(headers, HEADER_CALLER_ID)?;
	let role = match optional_header(headers, HEADER_CALLER_ROLE)? {
		Some(raw) => raw.parse::<CallerRole>().map_err(|_| {
			ApiError::invalid_header(HEADER_CALLER_ROLE, "must be full_access or restricted")
		})?,
		None => CallerRole::Restricted,
	};

	// Without a configured token nothing vouches for the role header.
	if !role.is_restricted() && !authenticated {
		return Err(ApiError {
			fields: Some(vec![HEADER_CALLER_ROLE.to_string()]),
			..ApiError::new(
				StatusCode::FORBIDDEN,
				"FORBIDDEN",
				"full_access requires an authenticated request.",
			)
		});
	}

	let Json(request) = payload.map_err(|rejection| {
		ApiError::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", rejection.body_text())
	})?;
	let ctx = CallerContext::new(caller_id, role)
		.with_request_id(request_id)
		.with_timeout(Duration::from_millis(cfg.search.request_timeout_ms));

	Ok(state.service.search(&request, &ctx).await?)
}

fn read_request_id(headers: &HeaderMap) -> Result<Uuid, ApiError> {
	match optional_header(headers, HEADER_REQUEST_ID)? {
		Some(raw) => Uuid::parse_str(raw)
			.map_err(|_| ApiError::invalid_header(HEADER_REQUEST_ID, "must be a UUID")),
		None => Ok(Uuid::new_v4()),
	}
}

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
	optional_header(headers, name)?.ok_or_else(|| ApiError::invalid_header(name, "is required"))
}

fn optional_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
	let Some(raw) = headers.get(name) else {
		return Ok(None);
	};
	let value = raw
		.to_str()
		.map_err(|_| ApiError::invalid_header(name, "must be visible ASCII"))?
		.trim();

	if value.is_empty() { Ok(None) } else { Ok(Some(value)) }
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(HEADER_AUTHORIZATION)?;
	let value = raw.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	fields: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	code: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	request_id: Option<Uuid>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
	code: Option<u32>,
	request_id: Option<Uuid>,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			status,
			error_code: error_code.into(),
			message: message.into(),
			fields: None,
			code: None,
			request_id: None,
		}
	}

	fn invalid_header(name: &str, reason: &str) -> Self {
		Self {
			fields: Some(vec![name.to_string()]),
			..Self::new(StatusCode::BAD_REQUEST, "INVALID_HEADER", format!("Header {name} {reason}."))
		}
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let request_id = err.request_id();
		let message = err.to_string();

		match err {
			Error::Validation(validation) => Self {
				fields: Some(vec![validation.field().to_string()]),
				code: Some(validation.code()),
				..Self::new(StatusCode::BAD_REQUEST, validation.error_code(), message)
			},
			Error::ScopeResolution { .. } => Self {
				request_id,
				..Self::new(StatusCode::BAD_GATEWAY, "SCOPE_RESOLUTION_FAILED", message)
			},
			Error::SearchBackend { .. } => Self {
				request_id,
				..Self::new(StatusCode::BAD_GATEWAY, "SEARCH_BACKEND_FAILED", message)
			},
			Error::Cancelled { .. } => Self {
				request_id,
				..Self::new(StatusCode::GATEWAY_TIMEOUT, "REQUEST_CANCELLED", message)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			error_code: self.error_code,
			message: self.message,
			fields: self.fields,
			code: self.code,
			request_id: self.request_id,
		};

		(self.status, Json(body)).into_response()
	}
}
