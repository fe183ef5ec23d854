//! Public API types

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;

use crate::upstream::UpstreamError;

// Errors

#[derive(Serialize, Debug, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

pub struct ApiError(anyhow::Error);

impl ApiError {
    fn parts(&self) -> (StatusCode, ErrorBody) {
        if let Some(rejection) = self.0.downcast_ref::<JsonRejection>() {
            return (
                rejection.status(),
                ErrorBody {
                    error: "Invalid request body".to_string(),
                    details: Some(rejection.body_text()),
                },
            );
        }
        match self.0.downcast_ref::<UpstreamError>() {
            Some(upstream) => (
                upstream.status(),
                ErrorBody {
                    error: upstream.summary().to_string(),
                    details: Some(upstream.body().to_string()),
                },
            ),
            None => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Something went wrong".to_string(),
                    details: Some(self.0.to_string()),
                },
            ),
        }
    }
}

/// Convert `ApiError` into an Axum compatible response. Upstream and
/// request body rejections keep their status code, anything else is a
/// 500.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Always log the error
        tracing::error!("{}", self.0);

        let (status, body) = self.parts();
        (status, Json(body)).into_response()
    }
}

/// Enables using `?` on functions that return `Result<_,
/// anyhow::Error>` to turn them into `Result<_, ApiError>`
impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// Re-export public types from each route

pub mod chat {
    pub use crate::api::routes::chat::public::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_keeps_status() {
        let err = ApiError::from(UpstreamError::TokenExchange {
            status: StatusCode::UNAUTHORIZED,
            body: "bad key".to_string(),
        });
        let (status, body) = err.parts();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            ErrorBody {
                error: "Failed to obtain access token".to_string(),
                details: Some("bad key".to_string()),
            }
        );
    }

    #[test]
    fn test_other_errors_are_internal() {
        let err = ApiError::from(anyhow::anyhow!("boom"));
        let (status, body) = err.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.details.as_deref(), Some("boom"));
    }
}
