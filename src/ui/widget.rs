//! The Bujji orb and chat panel.
//!
//! Every interactive element posts to `/widget/{id}/...` through HTMX and the
//! server answers with the whole re-rendered widget, which replaces the
//! `#bujji` container.

use leptos::prelude::*;

use crate::llm::ChatMessage;
use crate::widget::{Toast, ToastKind, VoiceCapabilities, VoiceCommand};

use super::WidgetView;
use super::components::{
    Button, ButtonSize, ButtonVariant, LoaderIcon, MicIcon, SendIcon, VolumeIcon, XIcon,
};

/// Root widget component.
#[component]
pub fn BujjiWidget(
    /// Snapshot to render.
    state: WidgetView,
) -> impl IntoView {
    let WidgetView {
        id,
        open,
        listening,
        loading,
        speak_replies,
        capabilities,
        draft,
        messages,
        toasts,
        voice,
        refresh_in,
    } = state;
    let base = format!("/widget/{id}");

    let refresh = refresh_in.map(|delay| {
        let trigger = format!("load delay:{}ms", delay.as_millis());
        view! { <div hidden hx-get=base.clone() hx-trigger=trigger></div> }
    });

    let panel = open.then(|| {
        view! {
            <BujjiPanel
                base=base.clone()
                listening=listening
                loading=loading
                speak_replies=speak_replies
                capabilities=capabilities
                draft=draft
                messages=messages
            />
        }
    });

    view! {
        <div
            id="bujji"
            class="bujji"
            data-widget-id=id
            data-listening=listening.to_string()
            hx-target="this"
            hx-swap="outerHTML"
        >
            <VoiceCommands commands=voice />
            <ToastList toasts=toasts />
            {refresh}
            <BujjiOrb action=format!("{base}/toggle") listening=listening />
            {panel}
        </div>
    }
}

/// Floating orb that opens and closes the panel.
#[component]
pub fn BujjiOrb(
    /// Toggle URL.
    action: String,
    /// Pulse while voice input is active.
    listening: bool,
) -> impl IntoView {
    let classes = format!(
        "w-16 h-16 rounded-full bg-gradient-cosmic shadow-glow-primary \
         hover:shadow-glow-secondary transition-all duration-300 flex items-center \
         justify-center {}",
        if listening { "animate-pulse" } else { "" }
    );

    view! {
        <div class="fixed bottom-8 right-8 z-50">
            <button type="button" class=classes hx-post=action aria-label="Toggle Bujji">
                <MicIcon class="w-8 h-8 text-primary-foreground" />
            </button>
        </div>
    }
}

/// Chat panel: header, transcript and input row.
#[component]
pub fn BujjiPanel(
    /// `/widget/{id}`.
    base: String,
    /// Voice input active.
    listening: bool,
    /// Reply pending.
    loading: bool,
    /// Replies are read aloud.
    speak_replies: bool,
    /// Browser speech support.
    capabilities: VoiceCapabilities,
    /// Current text input.
    draft: String,
    /// Transcript.
    messages: Vec<ChatMessage>,
) -> impl IntoView {
    let speech_toggle = capabilities.synthesis.then(|| {
        let label = if speak_replies {
            "Stop reading replies aloud"
        } else {
            "Read replies aloud"
        };
        view! {
            <Button
                variant=ButtonVariant::Ghost
                size=ButtonSize::Icon
                action=format!("{base}/speech")
                label=label
            >
                <VolumeIcon muted=!speak_replies />
            </Button>
        }
    });

    let pending = loading.then(|| {
        view! {
            <div class="rounded-lg p-3 text-sm bg-muted/30 text-muted-foreground flex items-center gap-2">
                <LoaderIcon />
                <span>"Bujji is thinking..."</span>
            </div>
        }
    });

    let mic_variant = if listening {
        ButtonVariant::Active
    } else {
        ButtonVariant::Outline
    };
    let mic_class = if listening { "text-accent-foreground" } else { "" };

    view! {
        <div
            class="fixed bottom-28 right-8 w-80 h-96 bg-card border border-border/30 rounded-lg \
                   shadow-glow-primary backdrop-blur-lg z-50 flex flex-col"
            role="dialog"
            aria-label="Bujji AI Assistant"
        >
            <div class="p-4 border-b border-border/30 flex items-center justify-between">
                <h3 class="font-semibold text-foreground flex items-center gap-2">
                    <span class="w-2 h-2 bg-accent rounded-full animate-pulse"></span>
                    "Bujji AI Assistant"
                </h3>
                <div class="flex items-center gap-1">
                    {speech_toggle}
                    <Button
                        variant=ButtonVariant::Ghost
                        size=ButtonSize::Icon
                        action=format!("{base}/close")
                        label="Close"
                    >
                        <XIcon />
                    </Button>
                </div>
            </div>

            <div class="flex-1 p-4 overflow-y-auto">
                <div class="space-y-3">
                    {messages
                        .into_iter()
                        .map(|message| view! { <MessageBubble message=message /> })
                        .collect_view()}
                    {pending}
                </div>
            </div>

            <form class="p-4 border-t border-border/30" hx-post=format!("{base}/messages")>
                <div class="flex gap-2">
                    <Button
                        variant=mic_variant
                        size=ButtonSize::Icon
                        disabled=!capabilities.recognition
                        action=format!("{base}/listen")
                        label="Voice input"
                    >
                        <MicIcon class=mic_class />
                    </Button>
                    <input
                        type="text"
                        name="message"
                        placeholder="Type your message..."
                        autocomplete="off"
                        value=draft
                        class="flex h-10 w-full rounded-md border border-border bg-background px-3 py-2 text-sm"
                    />
                    <Button button_type="submit" size=ButtonSize::Icon disabled=loading label="Send">
                        <SendIcon />
                    </Button>
                </div>
            </form>
        </div>
    }
}

/// One transcript entry.
#[component]
pub fn MessageBubble(
    /// Message to show.
    message: ChatMessage,
) -> impl IntoView {
    let classes = if message.is_assistant() {
        "rounded-lg p-3 text-sm bg-muted/30 text-muted-foreground"
    } else {
        "rounded-lg p-3 text-sm bg-primary/10 text-foreground ml-8"
    };
    let role = if message.is_assistant() {
        "assistant"
    } else {
        "user"
    };

    view! {
        <div class=classes data-role=role>
            <p>{message.content}</p>
        </div>
    }
}

/// Pending toasts.
#[component]
pub fn ToastList(
    /// Toasts drained from the widget.
    toasts: Vec<Toast>,
) -> impl IntoView {
    view! {
        <ol class="bujji-toasts fixed top-4 right-4 z-50 space-y-2" role="status" aria-live="polite">
            {toasts
                .into_iter()
                .map(|toast| {
                    let classes = match toast.kind {
                        ToastKind::Info => "rounded-lg border border-border bg-card p-3 shadow",
                        ToastKind::Error => "rounded-lg border border-destructive bg-destructive/10 p-3 shadow",
                    };
                    view! {
                        <li class=classes>
                            <p class="font-semibold text-sm">{toast.title}</p>
                            <p class="text-xs text-muted-foreground">{toast.description}</p>
                        </li>
                    }
                })
                .collect_view()}
        </ol>
    }
}

/// Hidden markers the page script turns into speech API calls.
#[component]
pub fn VoiceCommands(
    /// Commands drained from the widget.
    commands: Vec<VoiceCommand>,
) -> impl IntoView {
    view! {
        <div hidden class="bujji-voice">
            {commands
                .into_iter()
                .map(|command| {
                    let (kind, text) = match command {
                        VoiceCommand::StartRecognition => ("start-recognition", None),
                        VoiceCommand::StopRecognition => ("stop-recognition", None),
                        VoiceCommand::Speak(text) => ("speak", Some(text)),
                        VoiceCommand::CancelSpeech => ("cancel-speech", None),
                    };
                    view! { <span data-voice=kind data-text=text></span> }
                })
                .collect_view()}
        </div>
    }
}
