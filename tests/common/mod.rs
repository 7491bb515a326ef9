//! Shared helpers: a fake chat-completion gateway and request utilities.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
    response::Response,
    routing::post,
};
use bujji::AppState;
use bujji::config::{
    AppConfig, GatewayConfig, LogFormat, LoggingConfig, ResilienceConfig, ServerConfig,
    WidgetConfig,
};
use bujji::llm::{GatewayClient, GatewaySettings};
use serde_json::{Value, json};
use tower::ServiceExt;

/// One request seen by the fake gateway.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub authorization: Option<String>,
    pub body: Value,
}

/// A running fake gateway.
pub struct FakeGateway {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeGateway {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

/// Serve `/v1/chat/completions` answering every request with `status` and `body`.
pub async fn spawn_gateway(status: StatusCode, body: Value) -> FakeGateway {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);

    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |headers: HeaderMap, Json(payload): Json<Value>| {
            let recorded = Arc::clone(&recorded);
            let body = body.clone();
            async move {
                recorded.lock().unwrap().push(Recorded {
                    authorization: headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(ToString::to_string),
                    body: payload,
                });
                (status, Json(body))
            }
        }),
    );

    let base_url = serve(app).await;
    FakeGateway { base_url, requests }
}

/// Upstream success body carrying `reply`.
pub fn completion(reply: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": reply },
            "finish_reason": "stop"
        }]
    })
}

/// Serve `app` on an ephemeral port and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Configuration independent of the process environment.
pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
            static_dir: "static".to_string(),
        },
        gateway: GatewayConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            model: "google/gemini-2.5-flash".to_string(),
            api_key: None,
            system_prompt: None,
        },
        resilience: ResilienceConfig {
            timeout_disabled: false,
            request_timeout_secs: 30,
        },
        widget: WidgetConfig {
            idle_timeout_secs: 1800,
            auto_close_secs: 5,
        },
        logging: LoggingConfig {
            format: LogFormat::Pretty,
        },
    }
}

/// App state whose gateway points at `base_url` with the given key.
pub fn state_for(base_url: &str, api_key: Option<&str>) -> AppState {
    state_with(test_config(), base_url, api_key)
}

/// Like [`state_for`], with a custom configuration.
pub fn state_with(config: AppConfig, base_url: &str, api_key: Option<&str>) -> AppState {
    let gateway = GatewayClient::new(GatewaySettings {
        base_url: base_url.to_string(),
        api_key: api_key.map(ToString::to_string),
        model: "google/gemini-2.5-flash".to_string(),
    });
    AppState::new(Arc::new(config), gateway)
}

/// Send a request through the router.
pub async fn send(app: Router, req: Request<Body>) -> Response {
    app.oneshot(req).await.unwrap()
}

/// POST a JSON body.
pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// POST a urlencoded form body.
pub fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// GET a path.
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Collect a response body as a string.
pub async fn body_string(res: Response) -> String {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(res: Response) -> Value {
    serde_json::from_str(&body_string(res).await).unwrap()
}
