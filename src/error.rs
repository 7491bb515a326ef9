//! Handler error type and its HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::llm::GatewayError;

/// Errors surfaced by the chat handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Request body was not `{ messages: [...] }`.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Gateway call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// JSON error body: `{ "error": "..." }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// User-facing message.
    pub error: String,
}

impl HandlerError {
    /// Status code sent to the caller.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Gateway(GatewayError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            Self::Gateway(GatewayError::CreditsExhausted) => StatusCode::PAYMENT_REQUIRED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(name: "chat.error", error = %self, "Bujji chat error");
        } else {
            tracing::warn!(name: "chat.rejected", status = status.as_u16(), error = %self, "Bujji chat rejected upstream");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
