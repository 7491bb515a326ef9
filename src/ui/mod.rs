//! Server-rendered widget markup.
//!
//! Leptos components render to HTML strings on the server; HTMX swaps them
//! in the browser.
//!
//! # Structure
//!
//! - [`widget`]: orb, panel, transcript, toasts and voice markers
//! - [`page`]: the host page that embeds the widget
//! - [`components`]: reusable ShadCN-style building blocks

pub mod components;
pub mod page;
pub mod widget;

use std::time::{Duration, Instant};

use leptos::prelude::*;

use crate::llm::ChatMessage;
use crate::widget::{Toast, VoiceCapabilities, VoiceCommand, Widget};

pub use page::render_page;
pub use widget::BujjiWidget;

/// Everything needed to render one widget, detached from its lock.
#[derive(Debug, Clone)]
pub struct WidgetView {
    /// Widget identifier used in route URLs.
    pub id: String,
    /// Panel shown.
    pub open: bool,
    /// Voice input active.
    pub listening: bool,
    /// Reply pending.
    pub loading: bool,
    /// Replies are read aloud.
    pub speak_replies: bool,
    /// Browser speech support.
    pub capabilities: VoiceCapabilities,
    /// Current text input.
    pub draft: String,
    /// Transcript.
    pub messages: Vec<ChatMessage>,
    /// Toasts to show once.
    pub toasts: Vec<Toast>,
    /// Speech API instructions to run once.
    pub voice: Vec<VoiceCommand>,
    /// Ask the browser to re-fetch the widget after this delay.
    pub refresh_in: Option<Duration>,
}

impl WidgetView {
    /// Snapshot `widget`, draining its toasts and voice commands.
    pub fn capture(id: &str, widget: &mut Widget, now: Instant) -> Self {
        Self {
            id: id.to_string(),
            open: widget.is_open(),
            listening: widget.is_listening(),
            loading: widget.is_loading(),
            speak_replies: widget.speaks_replies(),
            capabilities: widget.capabilities(),
            draft: widget.draft().to_string(),
            messages: widget.messages().to_vec(),
            toasts: widget.take_toasts(),
            voice: widget.take_voice_commands(),
            refresh_in: widget
                .auto_close_at()
                .map(|at| at.saturating_duration_since(now)),
        }
    }
}

/// Render the widget fragment swapped in by HTMX.
#[must_use]
pub fn render_widget(state: WidgetView) -> String {
    view! { <BujjiWidget state=state /> }.to_html()
}
