//! Clients for the hosted conversational-AI service.
pub mod client;
pub mod error;
pub mod token;

pub use client::AgentClient;
pub use error::UpstreamError;
pub use token::TokenProvider;
