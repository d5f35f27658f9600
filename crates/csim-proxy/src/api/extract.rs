//! Extractors answering malformed input with a `bad_request` envelope.

use crate::domain::{ApiError, ResponseEnvelope};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::FromRequest;
use axum::extract::FromRequestParts;
use axum::Json;
use serde::Serialize;

/// JSON body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path parameters
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Query string
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(format!("invalid path parameter: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(format!("invalid query parameter: {}", rejection.body_text()))
    }
}

/// Handler result
pub type ApiResponse = Result<Json<ResponseEnvelope>, ApiError>;

/// Wrap `data` in a success envelope
pub fn respond<T: Serialize>(data: T) -> ApiResponse {
    let value = serde_json::to_value(data).map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(ResponseEnvelope::success(value)))
}

/// `{}` success envelope
pub fn respond_empty() -> ApiResponse {
    Ok(Json(ResponseEnvelope::empty()))
}
