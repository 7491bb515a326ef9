//! Floating assistant widget state.
//!
//! The widget is a small synchronous state machine. It never touches the
//! network or the browser directly: sending goes through a
//! [`client::ChatClient`], and browser speech APIs are driven by the
//! [`VoiceCommand`]s it queues. That keeps every transition testable without a
//! browser.
//!
//! # Architecture
//!
//! - [`Widget`]: open/closed, draft, transcript, listening and loading flags
//! - [`client`]: how a transcript reaches the chat handler
//! - [`store`]: per-page-load widgets held by the server

pub mod client;
pub mod store;

use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::llm::ChatMessage;
use client::{ChatClient, ChatError};

pub use store::WidgetStore;

/// Shown in place of a reply whenever a request fails.
pub const APOLOGY: &str =
    "Sorry, I couldn't reach my brain right now. Please try again in a moment.";

/// How long the greeting stays open after sign-in.
pub const DEFAULT_AUTO_CLOSE: Duration = Duration::from_secs(5);

/// Severity of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    /// Informational.
    Info,
    /// Something failed.
    Error,
}

/// A transient notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Short title.
    pub title: String,
    /// One-line description.
    pub description: String,
    /// Severity.
    pub kind: ToastKind,
}

impl Toast {
    fn info(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            kind: ToastKind::Info,
        }
    }

    fn error(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            kind: ToastKind::Error,
        }
    }
}

/// Instruction for the browser's speech APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceCommand {
    /// Start speech recognition.
    StartRecognition,
    /// Stop speech recognition.
    StopRecognition,
    /// Speak the given text.
    Speak(String),
    /// Stop any utterance in progress.
    CancelSpeech,
}

/// Speech APIs the current browser exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct VoiceCapabilities {
    /// `SpeechRecognition` (or the webkit-prefixed variant) exists.
    #[serde(default)]
    pub recognition: bool,
    /// `speechSynthesis` exists.
    #[serde(default)]
    pub synthesis: bool,
}

/// Auth state change reported by the host application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// A user signed in.
    #[serde(rename = "SIGNED_IN")]
    SignedIn {
        /// Account email, when the provider shares it.
        #[serde(default)]
        email: Option<String>,
    },
    /// The user signed out.
    #[serde(rename = "SIGNED_OUT")]
    SignedOut,
}

/// Name used in the sign-in greeting: the email's local part, or "there".
#[must_use]
pub fn display_name(email: Option<&str>) -> &str {
    email
        .and_then(|e| e.split('@').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("there")
}

/// A send started by [`Widget::begin_send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    ticket: u64,
    /// Full transcript to send, ending with the new user message.
    pub messages: Vec<ChatMessage>,
}

impl Outgoing {
    /// Identifies this send to [`Widget::finish_send`].
    #[must_use]
    pub fn ticket(&self) -> u64 {
        self.ticket
    }
}

/// The assistant widget.
#[derive(Debug, Clone)]
pub struct Widget {
    open: bool,
    draft: String,
    listening: bool,
    in_flight: Option<u64>,
    next_ticket: u64,
    speak_replies: bool,
    messages: Vec<ChatMessage>,
    capabilities: VoiceCapabilities,
    toasts: Vec<Toast>,
    voice: Vec<VoiceCommand>,
    auto_close_after: Duration,
    auto_close_at: Option<Instant>,
}

impl Default for Widget {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget {
    /// A closed widget with an empty transcript and no speech support.
    #[must_use]
    pub fn new() -> Self {
        Self {
            open: false,
            draft: String::new(),
            listening: false,
            in_flight: None,
            next_ticket: 0,
            speak_replies: false,
            messages: Vec::new(),
            capabilities: VoiceCapabilities::default(),
            toasts: Vec::new(),
            voice: Vec::new(),
            auto_close_after: DEFAULT_AUTO_CLOSE,
            auto_close_at: None,
        }
    }

    /// Override the post-sign-in auto-close delay.
    #[must_use]
    pub fn with_auto_close(mut self, after: Duration) -> Self {
        self.auto_close_after = after;
        self
    }

    /// Whether the panel is shown.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Current text input.
    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Whether speech recognition is active.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Whether a request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether assistant replies are read aloud.
    #[must_use]
    pub fn speaks_replies(&self) -> bool {
        self.speak_replies
    }

    /// Transcript in insertion order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Speech APIs known to be available.
    #[must_use]
    pub fn capabilities(&self) -> VoiceCapabilities {
        self.capabilities
    }

    /// Record which speech APIs the browser exposes.
    ///
    /// Losing recognition while listening ends the listening state.
    pub fn set_capabilities(&mut self, capabilities: VoiceCapabilities) {
        self.capabilities = capabilities;
        if !capabilities.recognition {
            self.listening = false;
        }
        if !capabilities.synthesis {
            self.speak_replies = false;
        }
    }

    /// Open or close the panel.
    pub fn toggle(&mut self) {
        self.open = !self.open;
        self.auto_close_at = None;
    }

    /// Close the panel.
    pub fn close(&mut self) {
        self.open = false;
        self.auto_close_at = None;
    }

    /// Replace the text input.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Start or stop voice input. No-op when recognition is unavailable.
    pub fn toggle_listening(&mut self) {
        if !self.capabilities.recognition {
            return;
        }
        if self.listening {
            self.listening = false;
            self.voice.push(VoiceCommand::StopRecognition);
            self.toasts
                .push(Toast::info("Stopped listening", "Voice input disabled"));
        } else {
            self.listening = true;
            self.voice.push(VoiceCommand::StartRecognition);
            self.toasts.push(Toast::info("Listening...", "Speak now!"));
        }
    }

    /// Recognition ended; non-empty speech becomes the draft.
    pub fn apply_transcript(&mut self, text: &str) {
        self.listening = false;
        let text = text.trim();
        if !text.is_empty() {
            self.draft = text.to_string();
        }
    }

    /// Turn spoken replies on or off. No-op when synthesis is unavailable.
    pub fn toggle_speech_output(&mut self) {
        if !self.capabilities.synthesis {
            return;
        }
        self.speak_replies = !self.speak_replies;
        if !self.speak_replies {
            self.voice.push(VoiceCommand::CancelSpeech);
        }
    }

    /// Move the draft into the transcript and return what should be sent.
    ///
    /// Returns `None` for a blank draft or while a request is in flight.
    pub fn begin_send(&mut self) -> Option<Outgoing> {
        if self.in_flight.is_some() || self.draft.trim().is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.draft);
        self.messages.push(ChatMessage::user(text));

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        Some(Outgoing {
            ticket,
            messages: self.messages.clone(),
        })
    }

    /// Record the outcome of the send identified by `ticket`.
    ///
    /// Outcomes of sends abandoned by an auth reset are dropped; returns
    /// whether `result` was applied.
    pub fn finish_send(&mut self, ticket: u64, result: Result<String, ChatError>) -> bool {
        if self.in_flight != Some(ticket) {
            tracing::debug!(name: "widget.send.stale", ticket, "Dropping reply to an abandoned send");
            return false;
        }
        self.in_flight = None;
        match result {
            Ok(reply) => {
                if self.speak_replies && self.capabilities.synthesis {
                    self.voice.push(VoiceCommand::Speak(reply.clone()));
                }
                self.messages.push(ChatMessage::assistant(reply));
            }
            Err(e) => {
                tracing::warn!(name: "widget.send.failed", error = %e, "Chat request failed");
                self.toasts
                    .push(Toast::error("Bujji is unavailable", e.to_string()));
                self.messages.push(ChatMessage::assistant(APOLOGY));
            }
        }
        true
    }

    /// Send the draft through `client`. Returns whether anything was sent.
    pub async fn submit<C>(&mut self, client: &C) -> bool
    where
        C: ChatClient + ?Sized,
    {
        let Some(outgoing) = self.begin_send() else {
            return false;
        };
        let result = client.send(&outgoing.messages).await;
        self.finish_send(outgoing.ticket, result);
        true
    }

    /// React to an auth state change. Any send in flight is abandoned.
    pub fn on_auth(&mut self, event: &AuthEvent, now: Instant) {
        self.in_flight = None;
        match event {
            AuthEvent::SignedIn { email } => {
                let name = display_name(email.as_deref());
                self.messages = vec![ChatMessage::assistant(format!(
                    "Welcome back, {name}! I'm Bujji, your AI assistant. How can I help you today?"
                ))];
                self.open = true;
                self.auto_close_at = Some(now + self.auto_close_after);
            }
            AuthEvent::SignedOut => {
                self.messages.clear();
                self.draft.clear();
                self.close();
            }
        }
    }

    /// When the greeting panel closes itself, if scheduled.
    #[must_use]
    pub fn auto_close_at(&self) -> Option<Instant> {
        self.auto_close_at
    }

    /// Apply time-based transitions.
    pub fn tick(&mut self, now: Instant) {
        if self.auto_close_at.is_some_and(|at| now >= at) {
            self.close();
        }
    }

    /// Drain pending toasts.
    pub fn take_toasts(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }

    /// Drain pending voice commands.
    pub fn take_voice_commands(&mut self) -> Vec<VoiceCommand> {
        std::mem::take(&mut self.voice)
    }
}
