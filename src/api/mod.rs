// ABOUTME: Chat backend API: the ChatBackend trait, its HTTP implementation, and response decoding.
// ABOUTME: The conversation worker depends only on the trait so tests can substitute a fake.

pub mod chat;
pub mod envelope;
pub mod format;
pub mod types;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};

use crate::config::ApiConfig;
use crate::error::{ClientError, Result};

pub use chat::ChatApi;
pub use envelope::{Envelope, ResponseKind, StructuredReply};
pub use types::{ChatMessage, ChatSession, NewChat, Sender, TokenStats};

/// Operations the chat screen needs from the backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn list_chats(&self) -> Result<Vec<ChatSession>>;

    async fn create_chat(&self) -> Result<NewChat>;

    /// Send `input` to the structured agent. `step` selects the roadmap stage.
    async fn send_structured(
        &self,
        chat_id: &str,
        input: &str,
        step: Option<&str>,
    ) -> Result<StructuredReply>;

    async fn chat_history(&self, chat_id: &str) -> Result<Vec<ChatMessage>>;

    async fn token_stats(&self) -> Result<TokenStats>;

    /// Download a template into `dir`, returning the written path.
    async fn download_template(&self, name: &str, dir: &Path) -> Result<PathBuf>;
}

/// Build the shared HTTP client from config.
pub fn http_client(config: &ApiConfig) -> Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .user_agent(format!("cofounder/{}", env!("CARGO_PKG_VERSION")))
        .use_rustls_tls()
        .build()
        .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {e}")))
}
