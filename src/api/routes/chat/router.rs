//! Router for the chat API

use std::sync::{Arc, RwLock};

use axum::{
    Router,
    body::{Body, Bytes},
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::post,
};
use futures::{Stream, StreamExt};
use http::{HeaderName, HeaderValue, StatusCode, header};

use super::public;
use crate::api::state::AppState;

type SharedState = Arc<RwLock<AppState>>;

/// Forward every upstream chunk as soon as it's read. An upstream read
/// error ends the downstream body with that error; nothing is retried.
pub fn relay<S, E>(upstream: S) -> impl Stream<Item = Result<Bytes, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    async_stream::stream! {
        futures::pin_mut!(upstream);
        let mut relayed = 0usize;
        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    relayed += bytes.len();
                    yield Ok(bytes);
                }
                Err(e) => {
                    tracing::error!("Upstream stream failed after {} bytes: {}", relayed, e);
                    yield Err(e);
                    return;
                }
            }
        }
        tracing::debug!("Relay finished after {} bytes", relayed);
    }
}

/// Relay a chat message to the agent and stream its response back
async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<public::ChatRequest>, JsonRejection>,
) -> Result<Response, crate::api::public::ApiError> {
    let Json(payload) = payload?;
    let (tokens, agent) = {
        let shared_state = state.read().expect("Unable to read share state");
        (Arc::clone(&shared_state.tokens), shared_state.agent.clone())
    };

    let token = tokens.token().await?;
    let upstream = agent
        .stream_completion(&token, &payload.message, payload.thread_id.as_deref())
        .await?;

    let body = Body::from_stream(relay(upstream.bytes_stream()));
    let mut resp = (StatusCode::OK, body).into_response();
    let headers = resp.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-transform"),
    );
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );

    Ok(resp)
}

/// Create the chat router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", post(chat_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_relay_preserves_chunks_in_order() {
        let chunks = vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"data: {\"con")),
            Ok(Bytes::from_static(b"tent\":\"a\"}\n")),
            Ok(Bytes::from_static(b"data: [DONE]\n")),
        ];
        let out: Vec<_> = relay(stream::iter(chunks)).collect().await;
        let out: Vec<Bytes> = out.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            out,
            vec![
                Bytes::from_static(b"data: {\"con"),
                Bytes::from_static(b"tent\":\"a\"}\n"),
                Bytes::from_static(b"data: [DONE]\n"),
            ]
        );
    }

    #[tokio::test]
    async fn test_relay_stops_after_error() {
        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::other("reset")),
            Ok(Bytes::from_static(b"never sent")),
        ];
        let out: Vec<_> = relay(stream::iter(chunks)).collect().await;
        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        assert!(out[1].is_err());
    }
}
