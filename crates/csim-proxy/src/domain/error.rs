//! Proxy error types and their mapping onto the `{data, error, code}`
//! envelope.
//!
//! Internal errors carry shard, observer and operation context for logs.
//! `ApiError` is the only thing a client ever sees.

use crate::domain::config::ConfigError;
use crate::domain::types::{ResponseEnvelope, ReturnCode};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use csim_sharding::{shard_display, ShardError, ShardId};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Result alias for dispatch and processor operations
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Failure of a single observer call. Always eligible for fallback.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("connection to {url} failed: {reason}")]
    Connection { url: String, reason: String },

    #[error("unreadable response from {url}: {reason}")]
    Body { url: String, reason: String },
}

/// Observer registry construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObserverError {
    #[error("empty observers list for shard {}", shard_display(*shard))]
    EmptyObserversList { shard: ShardId },

    #[error("node {address} is configured for unknown shard {shard}")]
    UnknownShard { address: String, shard: ShardId },
}

/// Dispatch, aggregation, cache and client-input errors
#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("unknown shard {0}")]
    UnknownShard(ShardId),

    #[error("no observers for shard {}", shard_display(*.0))]
    NoObservers(ShardId),

    #[error(
        "all {attempts} observers of shard {} failed, last error: {last_error}",
        shard_display(*shard)
    )]
    AllObserversFailed {
        shard: ShardId,
        attempts: usize,
        last_error: String,
    },

    /// The observer answered with a non-2xx status. Authoritative, not retried.
    #[error("observer {observer} answered {status}: {message}")]
    ObserverResponded {
        observer: String,
        status: u16,
        message: String,
    },

    #[error("invalid response from {observer}: {reason}")]
    InvalidResponse { observer: String, reason: String },

    #[error("{operation} aggregation failed: {reason}")]
    Aggregation {
        operation: &'static str,
        reason: String,
    },

    #[error("{0} cache not yet populated")]
    CacheNotPopulated(&'static str),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0} is disabled")]
    FeatureDisabled(&'static str),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("simulator error: {0}")]
    Simulator(String),
}

impl ProxyError {
    pub fn aggregation(operation: &'static str, reason: impl ToString) -> Self {
        Self::Aggregation {
            operation,
            reason: reason.to_string(),
        }
    }

    pub fn invalid_response(observer: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidResponse {
            observer: observer.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::InvalidAddress(_)
            | Self::UnknownShard(_)
            | Self::BadRequest(_)
            | Self::FeatureDisabled(_)
            | Self::NotFound(_) => true,
            Self::ObserverResponded { status, .. } => *status == 400,
            _ => false,
        }
    }
}

impl From<ShardError> for ProxyError {
    fn from(err: ShardError) -> Self {
        match err {
            ShardError::UnknownShard(shard) => Self::UnknownShard(shard),
            ShardError::InvalidAddress(address) => Self::InvalidAddress(address),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

/// Errors reported by the simulator handle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulatorError {
    #[error("account was not found: {0}")]
    AccountNotFound(String),

    #[error("{0}")]
    Failed(String),
}

/// Simulator facade errors
#[derive(Debug, Clone, Error)]
pub enum FacadeError {
    #[error("invalid number of blocks to generate: {0}")]
    InvalidBlockCount(i64),

    #[error("cannot base64 decode key index={index}, error={reason}")]
    Base64Decode { index: usize, reason: String },

    #[error("cannot hex decode key index={index}, error={reason}")]
    HexDecode { index: usize, reason: String },

    #[error("cannot extract port for shard ID={shard}")]
    PortExtraction { shard: ShardId },

    #[error("cannot cast port string to int for shard ID={shard}")]
    PortParse { shard: ShardId },

    #[error(transparent)]
    Simulator(#[from] SimulatorError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

/// Error reported by a closable component
#[derive(Debug, Clone, Error)]
#[error("{component}: {reason}")]
pub struct CloseError {
    pub component: String,
    pub reason: String,
}

impl CloseError {
    pub fn new(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            reason: reason.into(),
        }
    }
}

/// Proxy construction and startup errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot create observer registry: {0}")]
    Observers(#[from] ObserverError),

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("proxy already started on {0}")]
    AlreadyStarted(SocketAddr),
}

/// Client-facing error with envelope code and HTTP status
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status
    pub status: StatusCode,
    /// Envelope code
    pub code: ReturnCode,
    /// Error message
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ReturnCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Malformed client input
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ReturnCode::BadRequest, message)
    }

    /// Internal failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ReturnCode::InternalIssue,
            message,
        )
    }

    /// Unknown route or disabled endpoint group
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ReturnCode::BadRequest, message)
    }

    /// Rate limited
    pub fn too_many_requests() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            ReturnCode::BadRequest,
            "too many requests",
        )
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        match &err {
            ProxyError::AllObserversFailed {
                shard, attempts, ..
            } => Self::internal(format!(
                "all {} observers of shard {} failed",
                attempts,
                shard_display(*shard)
            )),
            ProxyError::NoObservers(shard) => Self::internal(format!(
                "no observers for shard {}",
                shard_display(*shard)
            )),
            ProxyError::ObserverResponded {
                status, message, ..
            } => {
                if *status == 400 {
                    Self::bad_request(message.clone())
                } else {
                    Self::internal(message.clone())
                }
            }
            ProxyError::InvalidResponse { .. } => {
                Self::internal("invalid response from observer")
            }
            ProxyError::NotFound(_) => Self::not_found(err.to_string()),
            _ if err.is_client_error() => Self::bad_request(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl From<FacadeError> for ApiError {
    fn from(err: FacadeError) -> Self {
        match err {
            FacadeError::Proxy(inner) => inner.into(),
            FacadeError::InvalidBlockCount(_)
            | FacadeError::Base64Decode { .. }
            | FacadeError::HexDecode { .. } => Self::bad_request(err.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ResponseEnvelope::failure(self.message, self.code);
        (self.status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use csim_sharding::METACHAIN_SHARD_ID;

    #[test]
    fn test_exhaustion_hides_transport_detail() {
        let err = ProxyError::AllObserversFailed {
            shard: 1,
            attempts: 3,
            last_error: "connection refused by 10.0.0.7".into(),
        };
        assert!(err.to_string().contains("10.0.0.7"));

        let api: ApiError = err.into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.code, ReturnCode::InternalIssue);
        assert!(api.message.contains("shard 1"));
        assert!(!api.message.contains("10.0.0.7"));
    }

    #[test]
    fn test_metachain_display() {
        let err = ProxyError::NoObservers(METACHAIN_SHARD_ID);
        assert_eq!(err.to_string(), "no observers for shard metachain");
    }

    #[test]
    fn test_observer_bad_request_maps_to_bad_request() {
        let api: ApiError = ProxyError::ObserverResponded {
            observer: "http://127.0.0.1:1".into(),
            status: 400,
            message: "invalid tx".into(),
        }
        .into();
        assert_eq!(api.code, ReturnCode::BadRequest);
        assert_eq!(api.message, "invalid tx");
    }

    #[test]
    fn test_client_errors() {
        assert!(ProxyError::BadRequest("x".into()).is_client_error());
        assert!(ProxyError::FeatureDisabled("faucet").is_client_error());
        assert!(!ProxyError::CacheNotPopulated("heartbeat").is_client_error());
        assert!(!ProxyError::aggregation("esdt supply", "shard 0 failed").is_client_error());
    }

    #[test]
    fn test_facade_errors() {
        let api: ApiError = FacadeError::InvalidBlockCount(0).into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);

        let api: ApiError = FacadeError::Simulator(SimulatorError::Failed("boom".into())).into();
        assert_eq!(api.code, ReturnCode::InternalIssue);

        let err = FacadeError::HexDecode {
            index: 2,
            reason: "odd length".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot hex decode key index=2, error=odd length"
        );
    }
}
