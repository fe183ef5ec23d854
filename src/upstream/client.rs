use anyhow::{Error, Result};
use serde::Serialize;

use super::error::UpstreamError;
use crate::chat::Role;

#[derive(Serialize, Debug)]
pub struct UpstreamMessage<'a> {
    pub role: Role,
    pub content: &'a str,
}

#[derive(Serialize, Debug)]
pub struct CompletionRequest<'a> {
    pub messages: Vec<UpstreamMessage<'a>>,
    pub stream: bool,
}

/// Client for the agent's streaming chat-completions endpoint.
#[derive(Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    api_url: String,
    agent_id: String,
    thread_header: String,
}

impl AgentClient {
    pub fn new(http: reqwest::Client, api_url: &str, agent_id: &str, thread_header: &str) -> Self {
        Self {
            http,
            api_url: api_url.to_string(),
            agent_id: agent_id.to_string(),
            thread_header: thread_header.to_string(),
        }
    }

    pub fn completions_url(&self) -> String {
        format!(
            "{}/v1/orchestrate/{}/chat/completions",
            self.api_url.trim_end_matches('/'),
            self.agent_id
        )
    }

    /// Start a streaming completion for a single user message. The
    /// response is returned as soon as the headers arrive so the body
    /// can be read chunk by chunk. A non-success status is turned into
    /// an `UpstreamError` carrying the status and body.
    pub async fn stream_completion(
        &self,
        token: &str,
        message: &str,
        thread_id: Option<&str>,
    ) -> Result<reqwest::Response, Error> {
        let payload = CompletionRequest {
            messages: vec![UpstreamMessage {
                role: Role::User,
                content: message,
            }],
            stream: true,
        };

        let mut request = self
            .http
            .post(self.completions_url())
            .bearer_auth(token)
            .header("Accept", "text/event-stream")
            .json(&payload);
        if let Some(thread_id) = thread_id {
            request = request.header(self.thread_header.as_str(), thread_id);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Agent rejected chat request: {} ({})", status, body);
            return Err(UpstreamError::ChatRequest { status, body }.into());
        }

        tracing::debug!("Agent stream opened with {}", status);
        Ok(response)
    }
}
