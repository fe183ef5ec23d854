use std::sync::Arc;

use crate::core::AppConfig;
use crate::upstream::{AgentClient, TokenProvider};

pub struct AppState {
    pub config: AppConfig,
    // Shared so the cached bearer token outlives a single request
    pub tokens: Arc<TokenProvider>,
    pub agent: AgentClient,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let http = reqwest::Client::new();
        let tokens = Arc::new(TokenProvider::new(
            http.clone(),
            &config.token_url,
            &config.api_key,
        ));
        let agent = AgentClient::new(
            http,
            &config.agent_api_url,
            &config.agent_id,
            &config.thread_header,
        );
        Self {
            config,
            tokens,
            agent,
        }
    }
}
