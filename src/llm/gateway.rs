//! Non-streaming Chat Completions client.
//!
//! Sends the persona prompt plus the caller's transcript to
//! `/v1/chat/completions` and returns the first choice's text.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::persona::{self, SYSTEM_PROMPT};
use super::{ChatMessage, GatewaySettings};

/// Failures of a single gateway call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No API key configured.
    #[error("LLM_API_KEY is not configured")]
    MissingApiKey,

    /// Upstream answered 429.
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    /// Upstream answered 402.
    #[error("AI credits exhausted. Please add credits to continue.")]
    CreditsExhausted,

    /// Upstream answered any other non-success status.
    #[error("AI gateway error")]
    Upstream {
        /// HTTP status returned by the gateway.
        status: u16,
        /// Raw response body, kept for logs.
        body: String,
    },

    /// Upstream answered 2xx without `choices[0].message.content`.
    #[error("AI gateway returned an unexpected response")]
    MalformedResponse,

    /// Transport or decoding failure.
    #[error("AI gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for the hosted chat-completion gateway.
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections.
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    settings: GatewaySettings,
    system_prompt: String,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Create a client using the built-in persona.
    #[must_use]
    pub fn new(settings: GatewaySettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    /// Replace the persona prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Settings this client was built with.
    #[must_use]
    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Send `messages` (without persona) upstream and return the reply text.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, GatewayError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(GatewayError::MissingApiKey)?;

        let messages = persona::with_persona(&self.system_prompt, messages);
        let body = CompletionRequest {
            model: &self.settings.model,
            messages: &messages,
            stream: false,
        };

        tracing::debug!(
            name: "gateway.request",
            model = %self.settings.model,
            messages = messages.len(),
            "Sending chat completion request"
        );

        let resp = self
            .http
            .post(self.settings.chat_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited,
                StatusCode::PAYMENT_REQUIRED => GatewayError::CreditsExhausted,
                _ => {
                    let body = resp.text().await.unwrap_or_default();
                    tracing::error!(
                        name: "gateway.error",
                        status = status.as_u16(),
                        body = %body,
                        "AI gateway error"
                    );
                    GatewayError::Upstream {
                        status: status.as_u16(),
                        body,
                    }
                }
            });
        }

        let data: CompletionResponse = resp.json().await?;
        data.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or(GatewayError::MalformedResponse)
    }
}
