mod config;
pub use config::{AppConfig, DEFAULT_THREAD_HEADER, DEFAULT_TOKEN_URL};
