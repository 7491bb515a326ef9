//! Chat-completion gateway client and persona.
//!
//! This module holds everything needed to turn a widget transcript into a
//! single non-streaming call against an `OpenAI`-compatible Chat Completions
//! endpoint (`/v1/chat/completions`).
//!
//! # Overview
//!
//! - [`ChatMessage`]: one transcript entry, shared with the widget
//! - [`GatewaySettings`]: base URL, model and credentials
//! - [`GatewayClient`]: performs the upstream call and maps its failures
//! - [`persona`]: the fixed system prompt prepended to every request
//!
//! # Example
//!
//! ```rust,ignore
//! use bujji::llm::{ChatMessage, GatewayClient, GatewaySettings};
//!
//! let client = GatewayClient::new(GatewaySettings {
//!     base_url: "https://ai.gateway.lovable.dev".to_string(),
//!     api_key: Some("sk-...".to_string()),
//!     model: "google/gemini-2.5-flash".to_string(),
//! });
//! let reply = client.complete(&[ChatMessage::user("Hey Bujji")]).await?;
//! ```

pub mod gateway;
pub mod persona;

pub use gateway::{GatewayClient, GatewayError};

use serde::{Deserialize, Serialize};

/// Default gateway base URL.
pub const DEFAULT_BASE_URL: &str = "https://ai.gateway.lovable.dev";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

/// Gateway connection and model settings.
#[derive(Clone)]
pub struct GatewaySettings {
    /// Base URL for the gateway (e.g., `https://ai.gateway.lovable.dev`).
    pub base_url: String,
    /// API key sent as a bearer token. Requests fail while this is unset.
    pub api_key: Option<String>,
    /// Model identifier (e.g., `google/gemini-2.5-flash`).
    pub model: String,
}

impl std::fmt::Debug for GatewaySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl GatewaySettings {
    /// Build the chat completions URL.
    #[must_use]
    pub fn chat_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }
}

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Persona prompt. Only ever added server-side.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message author.
    pub role: MessageRole,
    /// Plain text content.
    pub content: String,
}

impl ChatMessage {
    /// Create a message with the given role.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Whether this message was authored by the assistant.
    #[must_use]
    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}
