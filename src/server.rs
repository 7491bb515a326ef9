use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{Path, Request, State},
    http::{HeaderName, Method, StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::error::HandlerError;
use crate::llm::{ChatMessage, MessageRole};
use crate::ui::{self, WidgetView};
use crate::widget::store::WidgetHandle;
use crate::widget::client::ChatError;
use crate::widget::{AuthEvent, VoiceCapabilities, Widget};

/// Page title of the host page.
const PAGE_TITLE: &str = "Bujji";

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let state = AppState::from_config(Arc::clone(&config));

    info!(
        name: "gateway.config.loaded",
        base_url = %config.gateway.base_url,
        model = %config.gateway.model,
        api_key_set = state.gateway.settings().api_key.is_some(),
        "Gateway configuration loaded"
    );
    if state.gateway.settings().api_key.is_none() {
        tracing::warn!(
            name: "gateway.config.no_api_key",
            "No gateway API key configured; chat requests will fail until one is set"
        );
    }

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let timeout_duration = if state.config.resilience.timeout_disabled {
        Duration::from_secs(365 * 24 * 60 * 60) // effectively off
    } else {
        Duration::from_secs(state.config.resilience.request_timeout_secs)
    };

    let chat = Router::new()
        .route("/bujji-chat", post(bujji_chat))
        .route("/functions/v1/bujji-chat", post(bujji_chat))
        .layer(chat_cors());

    let widget = Router::new()
        .route("/widget/{id}", get(widget_get))
        .route("/widget/{id}/toggle", post(widget_toggle))
        .route("/widget/{id}/close", post(widget_close))
        .route("/widget/{id}/listen", post(widget_listen))
        .route("/widget/{id}/speech", post(widget_speech))
        .route("/widget/{id}/transcript", post(widget_transcript))
        .route("/widget/{id}/capabilities", post(widget_capabilities))
        .route("/widget/{id}/messages", post(widget_messages))
        .route("/widget/{id}/auth", post(widget_auth));

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health))
        .merge(chat)
        .merge(widget)
        .nest_service("/static", ServeDir::new(&state.config.server.static_dir))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| {
                let duration = timeout_duration;
                async move {
                    match tokio::time::timeout(duration, next.run(req)).await {
                        Ok(res) => res,
                        Err(_) => {
                            (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response()
                        }
                    }
                }
            },
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wide-open CORS for the chat endpoint, preflight included.
fn chat_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat Handler
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for the chat handler.
#[derive(Debug, Deserialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
}

/// Successful chat reply.
#[derive(Debug, Serialize)]
struct ChatReply {
    reply: String,
}

/// POST /bujji-chat - Forward the transcript to the gateway.
///
/// The body is parsed by hand so malformed JSON gets the same `{ error }`
/// shape as every other failure.
async fn bujji_chat(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatReply>, HandlerError> {
    let req: ChatRequest =
        serde_json::from_slice(&body).map_err(|e| HandlerError::InvalidBody(e.to_string()))?;

    if req.messages.iter().any(|m| m.role == MessageRole::System) {
        return Err(HandlerError::InvalidBody(
            "system messages are not accepted".to_string(),
        ));
    }

    tracing::info!(
        name: "chat.request",
        messages = req.messages.len(),
        "Received chat request"
    );

    let reply = state.gateway.complete(&req.messages).await?;
    Ok(Json(ChatReply { reply }))
}

/// GET /health - Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Widget Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Form posted by controls inside the panel form.
#[derive(Debug, Deserialize)]
struct DraftForm {
    #[serde(default)]
    message: Option<String>,
}

/// Recognized speech posted by the page script.
#[derive(Debug, Deserialize)]
struct TranscriptForm {
    #[serde(default)]
    transcript: String,
}

/// GET / - Host page with a fresh widget.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let handle = state.widgets.create();
    let view = handle.with(|w| WidgetView::capture(handle.id(), w, Instant::now()));
    Html(ui::render_page(PAGE_TITLE, view))
}

fn lookup(state: &AppState, id: &str) -> Result<WidgetHandle, StatusCode> {
    state.widgets.get(id).ok_or(StatusCode::NOT_FOUND)
}

/// Apply `f`, then time-based transitions, and render the fragment.
fn fragment(handle: &WidgetHandle, f: impl FnOnce(&mut Widget)) -> Html<String> {
    let now = Instant::now();
    let view = handle.with(|w| {
        f(w);
        w.tick(now);
        WidgetView::capture(handle.id(), w, now)
    });
    Html(ui::render_widget(view))
}

/// GET /widget/:id - Re-render (used for the auto-close refresh).
async fn widget_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, StatusCode> {
    let handle = lookup(&state, &id)?;
    Ok(fragment(&handle, |_| {}))
}

/// POST /widget/:id/toggle
async fn widget_toggle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, StatusCode> {
    let handle = lookup(&state, &id)?;
    Ok(fragment(&handle, Widget::toggle))
}

/// POST /widget/:id/close
async fn widget_close(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, StatusCode> {
    let handle = lookup(&state, &id)?;
    Ok(fragment(&handle, Widget::close))
}

/// POST /widget/:id/listen - Toggle voice input, keeping what was typed.
async fn widget_listen(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<DraftForm>,
) -> Result<Html<String>, StatusCode> {
    let handle = lookup(&state, &id)?;
    Ok(fragment(&handle, |w| {
        if let Some(message) = form.message {
            w.set_draft(message);
        }
        w.toggle_listening();
    }))
}

/// POST /widget/:id/speech - Toggle spoken replies.
async fn widget_speech(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<DraftForm>,
) -> Result<Html<String>, StatusCode> {
    let handle = lookup(&state, &id)?;
    Ok(fragment(&handle, |w| {
        if let Some(message) = form.message {
            w.set_draft(message);
        }
        w.toggle_speech_output();
    }))
}

/// POST /widget/:id/transcript - Recognition finished.
async fn widget_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<TranscriptForm>,
) -> Result<Html<String>, StatusCode> {
    let handle = lookup(&state, &id)?;
    Ok(fragment(&handle, |w| w.apply_transcript(&form.transcript)))
}

/// POST /widget/:id/capabilities - Browser speech support.
async fn widget_capabilities(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(capabilities): Form<VoiceCapabilities>,
) -> Result<Html<String>, StatusCode> {
    let handle = lookup(&state, &id)?;
    Ok(fragment(&handle, |w| w.set_capabilities(capabilities)))
}

/// POST /widget/:id/auth - Auth state change from the host application.
async fn widget_auth(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(event): Json<AuthEvent>,
) -> Result<Html<String>, StatusCode> {
    let handle = lookup(&state, &id)?;
    let now = Instant::now();
    Ok(fragment(&handle, |w| w.on_auth(&event, now)))
}

/// Headroom left between the reply deadline and the request timeout, so the
/// widget can still render the failure.
const REPLY_HEADROOM: Duration = Duration::from_millis(500);

/// Settles a send when the handler is dropped before the reply arrives
/// (request timeout, client disconnect).
#[derive(Debug)]
struct PendingReply {
    handle: WidgetHandle,
    ticket: u64,
    settled: bool,
}

impl PendingReply {
    fn settle(mut self, result: Result<String, ChatError>) {
        self.settled = true;
        let ticket = self.ticket;
        self.handle.with(|w| w.finish_send(ticket, result));
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::warn!(
            name: "widget.send.abandoned",
            widget_id = %self.handle.id(),
            "Widget request dropped before the reply arrived"
        );
        let ticket = self.ticket;
        self.handle
            .with(|w| w.finish_send(ticket, Err(ChatError::TimedOut)));
    }
}

/// How long a widget send may wait for its reply.
fn reply_deadline(config: &AppConfig) -> Option<Duration> {
    if config.resilience.timeout_disabled {
        return None;
    }
    let timeout = Duration::from_secs(config.resilience.request_timeout_secs);
    Some(timeout.saturating_sub(REPLY_HEADROOM).max(timeout / 2))
}

/// POST /widget/:id/messages - Send the draft and wait for the reply.
///
/// The widget lock is released while the gateway call is in flight; the
/// `loading` flag rejects concurrent submits. Every started send is settled,
/// even when the reply is late or the request is dropped.
async fn widget_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<DraftForm>,
) -> Result<Html<String>, StatusCode> {
    let handle = lookup(&state, &id)?;

    let outgoing = handle.with(|w| {
        if let Some(message) = form.message {
            w.set_draft(message);
        }
        w.begin_send()
    });

    if let Some(outgoing) = outgoing {
        let pending = PendingReply {
            handle: handle.clone(),
            ticket: outgoing.ticket(),
            settled: false,
        };
        let send = state.chat.send(&outgoing.messages);
        let result = match reply_deadline(&state.config) {
            Some(deadline) => tokio::time::timeout(deadline, send)
                .await
                .unwrap_or(Err(ChatError::TimedOut)),
            None => send.await,
        };
        pending.settle(result);
    }

    Ok(fragment(&handle, |_| {}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        GatewayConfig, LogFormat, LoggingConfig, ResilienceConfig, ServerConfig, WidgetConfig,
    };

    fn config(timeout_disabled: bool, request_timeout_secs: u64) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                port: 0,
                host: "127.0.0.1".to_string(),
                static_dir: "static".to_string(),
            },
            gateway: GatewayConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                model: "m".to_string(),
                api_key: None,
                system_prompt: None,
            },
            resilience: ResilienceConfig {
                timeout_disabled,
                request_timeout_secs,
            },
            widget: WidgetConfig {
                idle_timeout_secs: 60,
                auto_close_secs: 5,
            },
            logging: LoggingConfig {
                format: LogFormat::Pretty,
            },
        }
    }

    #[test]
    fn test_reply_deadline_precedes_request_timeout() {
        assert_eq!(
            reply_deadline(&config(false, 30)),
            Some(Duration::from_millis(29_500))
        );
        assert_eq!(
            reply_deadline(&config(false, 1)),
            Some(Duration::from_millis(500))
        );
        assert_eq!(reply_deadline(&config(false, 0)), Some(Duration::ZERO));
        assert_eq!(reply_deadline(&config(true, 30)), None);
    }

    #[test]
    fn test_dropped_reply_clears_loading() {
        let store = crate::widget::WidgetStore::default();
        let handle = store.create();
        let outgoing = handle
            .with(|w| {
                w.set_draft("hello");
                w.begin_send()
            })
            .unwrap();

        drop(PendingReply {
            handle: handle.clone(),
            ticket: outgoing.ticket(),
            settled: false,
        });

        assert!(!handle.with(|w| w.is_loading()));
        assert_eq!(
            handle.with(|w| w.messages().last().unwrap().content.clone()),
            crate::widget::APOLOGY
        );
    }
}
