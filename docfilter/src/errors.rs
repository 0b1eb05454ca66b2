//! # Error Handling
//!
//! [`ApiError`] is the boundary type returned by the resource operations. It maps
//! compile and storage failures onto HTTP status codes and sanitized messages:
//!
//! - filter, sort and page problems become `422` and echo the offending input
//! - operations that match nothing become `404`
//! - storage failures become `500`; their details are logged, never sent
//!
//! ```rust,ignore
//! async fn list(State(store): State<Arc<MemoryStore>>, Json(params): Json<QueryParams>)
//!     -> Result<Json<ListResponse>, ApiError>
//! {
//!     let response = Restaurants::get_list(store.as_ref(), &compiler, &params).await?;
//!     Ok(Json(response))
//! }
//! ```
//!
//! Logging goes through `tracing`; nothing is emitted unless the application
//! installs a subscriber.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::filtering::FilterError;
use crate::store::StoreError;

#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found - nothing matched
    NotFound {
        /// Resource type (e.g. "Restaurant")
        resource: String,
        /// Key that was looked up, when there is one
        key: Option<String>,
    },

    /// 400 Bad Request
    BadRequest { message: String },

    /// 422 Unprocessable Entity - the filter, sort or page payload was rejected
    InvalidFilter { error: FilterError },

    /// 500 Internal Server Error - storage failure (details logged, not exposed)
    Storage {
        message: String,
        internal: StoreError,
    },

    /// 500 Internal Server Error
    Internal {
        message: String,
        internal: Option<String>,
    },
}

impl ApiError {
    pub fn not_found(resource: impl Into<String>, key: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            key,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn invalid_filter(error: FilterError) -> Self {
        Self::InvalidFilter { error }
    }

    /// Storage failure; the cause is logged but not sent to the user.
    #[must_use]
    pub fn storage(err: StoreError) -> Self {
        Self::Storage {
            message: "A storage error occurred".to_string(),
            internal: err,
        }
    }

    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidFilter { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Storage { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Sanitized message for the response body
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, key } => match key {
                Some(key) => format!("{resource} '{key}' not found"),
                None => format!("No {resource} matched"),
            },
            Self::InvalidFilter { error } => error.to_string(),
            Self::BadRequest { message }
            | Self::Storage { message, .. }
            | Self::Internal { message, .. } => message.clone(),
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Storage { internal, .. } => {
                tracing::error!(error = %internal, "Storage error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let response = ErrorResponse {
            error: self.user_message(),
            details: match &self {
                Self::InvalidFilter { error } => Some(error.details()),
                _ => None,
            },
        };

        (status, Json(response)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

impl From<FilterError> for ApiError {
    fn from(error: FilterError) -> Self {
        Self::InvalidFilter { error }
    }
}

/// An invalid pattern reaching the store came from the caller's filter, so it
/// is a 400; everything else is a 500.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidPattern { pattern, reason } => Self::BadRequest {
                message: format!("Invalid pattern '{pattern}': {reason}"),
            },
            other => Self::storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_not_found_with_key() {
        let err = ApiError::not_found("Restaurant", Some("40356018".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "Restaurant '40356018' not found");
    }

    #[test]
    fn test_not_found_without_key() {
        let err = ApiError::not_found("Neighborhood", None);
        assert_eq!(err.user_message(), "No Neighborhood matched");
    }

    #[test]
    fn test_filter_errors_are_unprocessable() {
        let err: ApiError = FilterError::UnknownOperator("$where".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.user_message().contains("$where"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_shape_error_details_echo_input() {
        let error = FilterError::InvalidValueShape {
            field: "cuisine".to_string(),
            operator: "$in",
            value: json!("Bakery"),
            expected: "an array",
        };
        let details = error.details();
        assert_eq!(details["field"], "cuisine");
        assert_eq!(details["value"], "Bakery");
    }

    #[test]
    fn test_storage_error_is_sanitized() {
        let err: ApiError = StoreError::Backend("connection reset by peer".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "A storage error occurred");
        assert!(!err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_invalid_pattern_is_bad_request() {
        let err: ApiError = StoreError::InvalidPattern {
            pattern: "(".to_string(),
            reason: "unclosed group".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_all_status_codes() {
        let cases = vec![
            (ApiError::not_found("Borough", None), StatusCode::NOT_FOUND),
            (ApiError::bad_request("x"), StatusCode::BAD_REQUEST),
            (
                ApiError::invalid_filter(FilterError::AnchorNotAllowed),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::storage(StoreError::Backend("x".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::internal("x", None),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
