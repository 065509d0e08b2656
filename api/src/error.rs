use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use trendscope_core::{CoreError, RedditApiError, StorageError};

/// Response-side wrapper mapping domain errors onto HTTP statuses. Bodies
/// carry a single "detail" field.
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            CoreError::InvalidInput { .. }
            | CoreError::Storage(StorageError::InvalidFileName { .. }) => StatusCode::BAD_REQUEST,
            CoreError::RedditApi(RedditApiError::RateLimitExceeded { .. }) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        } else {
            warn!(error = %self.0, status = %status, "request rejected");
        }

        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = ApiError(CoreError::NotFound {
            resource: "x".to_string(),
        });
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let bad_name = ApiError(CoreError::Storage(StorageError::InvalidFileName {
            name: "../x".to_string(),
        }));
        assert_eq!(bad_name.into_response().status(), StatusCode::BAD_REQUEST);

        let throttled = ApiError(CoreError::RedditApi(RedditApiError::RateLimitExceeded {
            retry_after: 60,
        }));
        assert_eq!(
            throttled.into_response().status(),
            StatusCode::TOO_MANY_REQUESTS
        );

        let internal = ApiError(CoreError::Internal {
            message: "boom".to_string(),
        });
        assert_eq!(
            internal.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
