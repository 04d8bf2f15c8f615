//! Mock Telegram Bot API for adapter tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicI64, AtomicUsize, Ordering},
};

use {
    axum::{
        Json, Router,
        body::Bytes,
        extract::State,
        http::{StatusCode, Uri},
        routing::post,
    },
    serde_json::{Value, json},
    tokio::{sync::oneshot, task::JoinHandle},
};

#[derive(Default)]
struct MockState {
    requests: Mutex<Vec<(String, Value)>>,
    next_message_id: AtomicI64,
    rate_limited_sends: AtomicUsize,
}

/// Local HTTP server answering Bot API calls and recording their bodies.
pub struct MockTelegramApi {
    state: Arc<MockState>,
    base_url: String,
    shutdown: oneshot::Sender<()>,
    server: JoinHandle<()>,
}

async fn telegram_api_handler(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let method = uri.path().rsplit('/').next().unwrap_or_default().to_string();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state
        .requests
        .lock()
        .unwrap()
        .push((method.clone(), body.clone()));

    let ok = |result: Value| (StatusCode::OK, Json(json!({"ok": true, "result": result})));

    match method.as_str() {
        "SendMessage" => {
            let limited = state
                .rate_limited_sends
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if limited {
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({
                        "ok": false,
                        "error_code": 429,
                        "description": "Too Many Requests: retry after 1",
                        "parameters": {"retry_after": 1}
                    })),
                );
            }
            let chat_id = body["chat_id"].as_i64().unwrap_or_default();
            let chat = if chat_id < 0 {
                json!({"id": chat_id, "type": "group", "title": "Test group"})
            } else {
                json!({"id": chat_id, "type": "private", "first_name": "Alice"})
            };
            ok(json!({
                "message_id": 100 + state.next_message_id.fetch_add(1, Ordering::SeqCst),
                "date": 1_700_000_100,
                "chat": chat,
                "text": body["text"],
            }))
        },
        "GetFile" => {
            let file_id = body["file_id"].as_str().unwrap_or_default();
            ok(json!({
                "file_id": file_id,
                "file_unique_id": format!("{file_id}-unique"),
                "file_size": 1024,
                "file_path": format!("photos/{file_id}.jpg"),
            }))
        },
        "GetMe" => ok(json!({
            "id": 4242,
            "is_bot": true,
            "first_name": "Mrs Beauty",
            "username": "mrsbeautybot",
            "can_join_groups": true,
            "can_read_all_group_messages": false,
            "supports_inline_queries": false
        })),
        "GetUpdates" => ok(json!([])),
        _ => ok(json!(true)),
    }
}

impl MockTelegramApi {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/{*path}", post(telegram_api_handler))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("serve mock telegram api");
        });

        Self {
            state,
            base_url: format!("http://{addr}/"),
            shutdown,
            server,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn bot(&self) -> teloxide::Bot {
        let url = reqwest::Url::parse(&self.base_url).expect("parse api url");
        teloxide::Bot::new("test-token").set_api_url(url)
    }

    /// Answer the next `n` sendMessage calls with a 429.
    pub fn rate_limit_next_sends(&self, n: usize) {
        self.state.rate_limited_sends.store(n, Ordering::SeqCst);
    }

    /// Bodies of every call to `method`, e.g. `SendMessage`.
    pub fn requests(&self, method: &str) -> Vec<Value> {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn send_message_requests(&self) -> Vec<Value> {
        self.requests("SendMessage")
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        self.server.await.expect("server join");
    }
}
