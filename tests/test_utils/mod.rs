//! Test utilities for integration tests
#![allow(dead_code)]
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use axum::{
    Router,
    body::{Body, Bytes},
    routing::post,
};
use futures::stream::{self, BoxStream, StreamExt};
use http::header;

use sensor_chat::api::AppState;
use sensor_chat::api::app;
use sensor_chat::core::AppConfig;

pub const AGENT_ID: &str = "agent-test";
pub const COMPLETIONS_PATH: &str = "/v1/orchestrate/agent-test/chat/completions";
pub const TOKEN_PATH: &str = "/identity/token";

/// Config pointing both the identity service and the agent API at
/// the given mock server.
pub fn test_config(upstream_url: &str) -> AppConfig {
    AppConfig {
        static_path: std::env::temp_dir().display().to_string(),
        agent_api_url: upstream_url.to_string(),
        agent_id: String::from(AGENT_ID),
        api_key: String::from("test-api-key"),
        token_url: format!("{}{}", upstream_url, TOKEN_PATH),
        thread_header: String::from("X-IBM-THREAD-ID"),
    }
}

/// Creates a test application router backed by the given upstream.
pub fn test_app(upstream_url: &str) -> Router {
    let app_state = AppState::new(test_config(upstream_url));
    app(Arc::new(RwLock::new(app_state)))
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

/// Mock a successful token exchange.
pub async fn mock_token(server: &mut mockito::ServerGuard) -> mockito::Mock {
    server
        .mock("POST", TOKEN_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"test-token","expires_in":3600}"#)
        .create_async()
        .await
}

/// Serve a router on an ephemeral port for the rest of the test.
pub async fn serve_router(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Run the real relay against the given upstream and return the URL
/// of its chat endpoint.
pub async fn spawn_relay(upstream_url: &str) -> String {
    let addr = serve_router(test_app(upstream_url)).await;
    format!("http://{}/api/chat", addr)
}

/// A stand-in relay that streams fixed chunks. `Err` items abort the
/// body. With `hang` set the stream stays open after the last chunk.
pub async fn spawn_stream_server(
    chunks: Vec<Result<&'static str, &'static str>>,
    hang: bool,
) -> String {
    let router = Router::new().route(
        "/",
        post(move || {
            let chunks = chunks.clone();
            async move {
                let base = stream::iter(chunks.into_iter().map(|c| {
                    c.map(|s| Bytes::from_static(s.as_bytes()))
                        .map_err(io::Error::other)
                }));
                let body: BoxStream<'static, Result<Bytes, io::Error>> = if hang {
                    base.chain(stream::pending()).boxed()
                } else {
                    base.boxed()
                };
                (
                    [(header::CONTENT_TYPE, "text/event-stream")],
                    Body::from_stream(body),
                )
            }
        }),
    );
    let addr = serve_router(router).await;
    format!("http://{}/", addr)
}
