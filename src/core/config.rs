use std::env;

pub const DEFAULT_TOKEN_URL: &str = "https://iam.cloud.ibm.com/identity/token";
pub const DEFAULT_THREAD_HEADER: &str = "X-IBM-THREAD-ID";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub static_path: String,
    pub agent_api_url: String,
    pub agent_id: String,
    pub api_key: String,
    pub token_url: String,
    pub thread_header: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let static_path =
            env::var("SENSOR_CHAT_STATIC_PATH").unwrap_or_else(|_| "./web-ui".to_string());
        let agent_api_url = env::var("SENSOR_CHAT_AGENT_API_URL")
            .expect("Missing env var SENSOR_CHAT_AGENT_API_URL");
        let agent_id =
            env::var("SENSOR_CHAT_AGENT_ID").expect("Missing env var SENSOR_CHAT_AGENT_ID");
        let api_key =
            env::var("SENSOR_CHAT_API_KEY").expect("Missing env var SENSOR_CHAT_API_KEY");
        let token_url =
            env::var("SENSOR_CHAT_TOKEN_URL").unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string());
        let thread_header = env::var("SENSOR_CHAT_THREAD_HEADER")
            .unwrap_or_else(|_| DEFAULT_THREAD_HEADER.to_string());

        Self {
            static_path,
            agent_api_url,
            agent_id,
            api_key,
            token_url,
            thread_header,
        }
    }
}
