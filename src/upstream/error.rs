use http::StatusCode;
use thiserror::Error;

/// Rejections from the identity service or the agent API. Both keep
/// the upstream status so the relay can pass it on unchanged.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Token exchange failed: {status} ({body})")]
    TokenExchange { status: StatusCode, body: String },

    #[error("Chat request rejected: {status} ({body})")]
    ChatRequest { status: StatusCode, body: String },
}

impl UpstreamError {
    pub fn status(&self) -> StatusCode {
        match self {
            UpstreamError::TokenExchange { status, .. } | UpstreamError::ChatRequest { status, .. } => {
                *status
            }
        }
    }

    pub fn body(&self) -> &str {
        match self {
            UpstreamError::TokenExchange { body, .. } | UpstreamError::ChatRequest { body, .. } => {
                body
            }
        }
    }

    /// Short description without the body, used as the `error` field of
    /// relay error responses.
    pub fn summary(&self) -> &'static str {
        match self {
            UpstreamError::TokenExchange { .. } => "Failed to obtain access token",
            UpstreamError::ChatRequest { .. } => "Upstream chat request failed",
        }
    }
}
