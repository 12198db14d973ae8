//! A minimal in-process Trino coordinator speaking just enough HTTP/1.1 for
//! the client protocol tests.
//!
//! Statements are routed by their text:
//! - containing `missing`: the first page carries a TABLE_NOT_FOUND error
//! - containing `slow`: the second page never arrives
//! - containing `delayed`: the POST is answered only after
//!   [`FakeCoordinator::release_delayed_post`]
//! - anything else: two pages of `(n bigint, seen timestamp(3))` rows

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify};

/// One request as seen by the fake coordinator.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub user: Option<String>,
    pub catalog: Option<String>,
    pub body: String,
}

#[derive(Default)]
struct State {
    requests: Mutex<Vec<RecordedRequest>>,
    slow_page_requested: Notify,
    delayed_post_received: Notify,
    delayed_post_released: Notify,
}

/// Handle to a running fake coordinator.
pub struct FakeCoordinator {
    addr: SocketAddr,
    state: Arc<State>,
}

impl FakeCoordinator {
    /// Binds to an ephemeral local port and starts serving.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(State::default());

        let accept_state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_connection(stream, addr, Arc::clone(&accept_state)));
            }
        });

        Self { addr, state }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().await.clone()
    }

    /// Requests with the given method, in arrival order.
    pub async fn requests_with_method(&self, method: &str) -> Vec<RecordedRequest> {
        self.requests()
            .await
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    /// Waits until a client is blocked on the page that never arrives.
    pub async fn wait_for_slow_page(&self) {
        self.state.slow_page_requested.notified().await;
    }

    /// Waits until a `delayed` statement has been posted.
    pub async fn wait_for_delayed_post(&self) {
        self.state.delayed_post_received.notified().await;
    }

    /// Lets the coordinator answer the pending `delayed` POST.
    pub fn release_delayed_post(&self) {
        self.state.delayed_post_released.notify_one();
    }

    /// Polls until a DELETE has arrived, for cancels released in the background.
    pub async fn wait_for_delete(&self) -> Vec<RecordedRequest> {
        let wait = async {
            loop {
                let deletes = self.requests_with_method("DELETE").await;
                if !deletes.is_empty() {
                    return deletes;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .unwrap_or_default()
    }
}

async fn serve_connection(stream: TcpStream, addr: SocketAddr, state: Arc<State>) {
    let mut reader = BufReader::new(stream);

    loop {
        let mut request_line = String::new();
        match reader.read_line(&mut request_line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or_default().to_string();

        let mut content_length = 0usize;
        let mut user = None;
        let mut catalog = None;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                return;
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                let value = value.trim().to_string();
                match name.trim().to_ascii_lowercase().as_str() {
                    "content-length" => content_length = value.parse().unwrap_or(0),
                    "x-trino-user" => user = Some(value),
                    "x-trino-catalog" => catalog = Some(value),
                    _ => {}
                }
            }
        }

        let mut body = vec![0u8; content_length];
        if reader.read_exact(&mut body).await.is_err() {
            return;
        }
        let body = String::from_utf8_lossy(&body).to_string();

        state.requests.lock().await.push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            user,
            catalog,
            body: body.clone(),
        });

        let response = route(&method, &path, &body, addr, &state).await;
        if reader.get_mut().write_all(response.as_bytes()).await.is_err() {
            return;
        }
    }
}

async fn route(method: &str, path: &str, body: &str, addr: SocketAddr, state: &State) -> String {
    let base = format!("http://{addr}");
    match (method, path) {
        ("GET", "/v1/info") => ok(json!({
            "nodeVersion": {"version": "438"},
            "environment": "test",
            "coordinator": true,
            "starting": false
        })),
        ("POST", "/v1/statement") if body.contains("missing") => ok(json!({
            "id": "q_missing",
            "stats": {"state": "FAILED"},
            "error": {
                "message": "line 1:15: Table 'memory.default.missing' does not exist",
                "errorCode": 46,
                "errorName": "TABLE_NOT_FOUND",
                "errorType": "USER_ERROR"
            }
        })),
        ("POST", "/v1/statement") if body.contains("delayed") => {
            state.delayed_post_received.notify_one();
            state.delayed_post_released.notified().await;
            ok(json!({
                "id": "q_delayed",
                "nextUri": format!("{base}/v1/statement/queued/q_delayed/1"),
                "stats": {"state": "QUEUED"}
            }))
        }
        ("POST", "/v1/statement") if body.contains("slow") => ok(json!({
            "id": "q_slow",
            "nextUri": format!("{base}/v1/statement/executing/q_slow/1"),
            "stats": {"state": "QUEUED"}
        })),
        ("POST", "/v1/statement") => ok(json!({
            "id": "q_rows",
            "nextUri": format!("{base}/v1/statement/executing/q_rows/1"),
            "columns": [
                {"name": "n", "type": "bigint"},
                {"name": "seen", "type": "timestamp(3)"}
            ],
            "data": [[1, "2024-01-01 00:00:00.000"]],
            "stats": {"state": "RUNNING"}
        })),
        ("GET", "/v1/statement/executing/q_rows/1") => ok(json!({
            "id": "q_rows",
            "columns": [
                {"name": "n", "type": "bigint"},
                {"name": "seen", "type": "timestamp(3)"}
            ],
            "data": [[2, null], [3, "not a timestamp"]],
            "stats": {"state": "FINISHED"}
        })),
        ("GET", "/v1/statement/executing/q_slow/1") => {
            state.slow_page_requested.notify_one();
            std::future::pending::<String>().await
        }
        ("DELETE", _) => "HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n".to_string(),
        _ => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n".to_string(),
    }
}

fn ok(body: serde_json::Value) -> String {
    let body = body.to_string();
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
}
