//! Bujji
//!
//! A floating assistant widget and the chat handler behind it. The handler
//! prepends the Bujji persona to the caller's transcript, forwards it to a
//! hosted chat-completion gateway and relays the reply.
//!
//! # Architecture
//!
//! - **Server**: Axum router with the CORS-open chat handler and HTMX widget routes
//! - **Gateway**: non-streaming Chat Completions client with status mapping
//! - **Widget**: synchronous state machine; speech APIs driven through voice commands
//! - **UI**: Leptos SSR components swapped in by HTMX
//!
//! # Modules
//!
//! - [`llm`]: gateway client, message model and persona
//! - [`widget`]: widget state, chat clients and the per-page-load store
//! - [`ui`]: widget and page rendering
//! - [`server`]: router and handlers
//! - [`config`]: layered configuration

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]
#![allow(clippy::needless_pass_by_value)]

pub mod config;
pub mod error;
pub mod llm;
pub mod server;
pub mod ui;
pub mod widget;

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::llm::GatewayClient;
use crate::widget::WidgetStore;
use crate::widget::client::{ChatClient, GatewayChatClient};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Gateway used by the chat handler.
    pub gateway: GatewayClient,
    /// Client used by server-driven widgets.
    pub chat: Arc<dyn ChatClient>,
    /// Live widgets, one per page load.
    pub widgets: WidgetStore,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("gateway", &self.gateway)
            .field("widgets", &self.widgets.len())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build state from configuration.
    #[must_use]
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let mut gateway = GatewayClient::new(config.gateway.settings());
        if let Some(prompt) = &config.gateway.system_prompt {
            gateway = gateway.with_system_prompt(prompt.clone());
        }
        Self::new(config, gateway)
    }

    /// Build state around an existing gateway client.
    #[must_use]
    pub fn new(config: Arc<AppConfig>, gateway: GatewayClient) -> Self {
        let widgets = WidgetStore::new(
            Duration::from_secs(config.widget.idle_timeout_secs),
            Duration::from_secs(config.widget.auto_close_secs),
        );
        Self {
            chat: Arc::new(GatewayChatClient::new(gateway.clone())),
            gateway,
            widgets,
            config,
        }
    }

    /// Replace the client used by widgets (e.g. to call a remote handler).
    #[must_use]
    pub fn with_chat_client(mut self, chat: Arc<dyn ChatClient>) -> Self {
        self.chat = chat;
        self
    }
}
