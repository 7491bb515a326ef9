//! How the widget reaches the chat handler.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::{ChatMessage, GatewayClient, GatewayError};

/// Failure of one widget round-trip. `Display` is the user-facing text.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The handler reported a rate limit.
    #[error("{0}")]
    RateLimited(String),

    /// The handler reported exhausted credits.
    #[error("{0}")]
    CreditsExhausted(String),

    /// Any other handler failure.
    #[error("{0}")]
    Server(String),

    /// No reply arrived before the request deadline.
    #[error("Bujji took too long to answer. Please try again.")]
    TimedOut,

    /// The handler could not be reached.
    #[error("Could not reach Bujji: {0}")]
    Transport(#[from] reqwest::Error),
}

impl From<GatewayError> for ChatError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::RateLimited => Self::RateLimited(e.to_string()),
            GatewayError::CreditsExhausted => Self::CreditsExhausted(e.to_string()),
            other => Self::Server(other.to_string()),
        }
    }
}

/// Something that turns a transcript into an assistant reply.
#[async_trait::async_trait]
pub trait ChatClient: Send + Sync {
    /// Send the full transcript and return the reply text.
    async fn send(&self, messages: &[ChatMessage]) -> Result<String, ChatError>;
}

/// Calls the gateway in-process.
#[derive(Debug, Clone)]
pub struct GatewayChatClient {
    gateway: GatewayClient,
}

impl GatewayChatClient {
    /// Wrap a gateway client.
    #[must_use]
    pub fn new(gateway: GatewayClient) -> Self {
        Self { gateway }
    }
}

#[async_trait::async_trait]
impl ChatClient for GatewayChatClient {
    async fn send(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        Ok(self.gateway.complete(messages).await?)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ReplyBody {
    reply: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Calls a remote chat handler over HTTP.
#[derive(Clone)]
pub struct HttpChatClient {
    http: reqwest::Client,
    url: String,
    bearer: Option<String>,
}

impl std::fmt::Debug for HttpChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatClient")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl HttpChatClient {
    /// Client for the handler at `url` (e.g. `https://host/bujji-chat`).
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            bearer: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

#[async_trait::async_trait]
impl ChatClient for HttpChatClient {
    async fn send(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let mut rb = self.http.post(&self.url).json(&ChatRequest { messages });
        if let Some(token) = &self.bearer {
            rb = rb.bearer_auth(token);
        }

        let resp = rb.send().await?;
        let status = resp.status();
        if status.is_success() {
            let body: ReplyBody = resp.json().await?;
            return Ok(body.reply);
        }

        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("Bujji chat failed with status {status}"),
        };
        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => ChatError::RateLimited(message),
            StatusCode::PAYMENT_REQUIRED => ChatError::CreditsExhausted(message),
            _ => ChatError::Server(message),
        })
    }
}
