//! Mock vendor API for integration tests
//!
//! Serves `/v1/chat/completions` and `/v1/messages` from a script of canned
//! replies, one per request; the last reply repeats once the script runs
//! out. Every request body and its auth headers are captured.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use futures_util::{StreamExt, stream};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

/// One canned reply
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with a JSON body
    Json(Value),
    /// Arbitrary status with a raw body
    Status(u16, String),
    /// 200 event stream, one `data:` line per payload
    Sse(Vec<String>),
    /// 200 event stream that sends these payloads, then drops the connection
    DropAfter(Vec<String>),
    /// 200 event stream sending one payload per interval
    Paced(Vec<String>, Duration),
    /// 200 event stream that sends these payloads, then goes silent without
    /// closing the connection
    Stall(Vec<String>),
}

impl Reply {
    /// Event stream of JSON payloads terminated by `[DONE]`
    pub fn sse_done(payloads: &[Value]) -> Self {
        let mut lines: Vec<String> = payloads.iter().map(Value::to_string).collect();
        lines.push("[DONE]".to_owned());
        Self::Sse(lines)
    }

    /// Event stream of JSON payloads without a terminator
    pub fn sse(payloads: &[Value]) -> Self {
        Self::Sse(payloads.iter().map(Value::to_string).collect())
    }
}

/// Headers the adapters are expected to set
#[derive(Debug, Clone, Default)]
pub struct CapturedHeaders {
    pub authorization: Option<String>,
    pub api_key: Option<String>,
    pub anthropic_version: Option<String>,
}

struct MockState {
    script: Mutex<VecDeque<Reply>>,
    requests: AtomicU32,
    arrivals: Mutex<Vec<Instant>>,
    last_body: Mutex<Option<Value>>,
    last_path: Mutex<Option<String>>,
    last_headers: Mutex<CapturedHeaders>,
}

/// Running mock vendor, stopped on drop
pub struct MockVendor {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

impl MockVendor {
    /// Start a vendor answering with `replies` in order
    pub async fn start(replies: Vec<Reply>) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            script: Mutex::new(replies.into()),
            requests: AtomicU32::new(0),
            arrivals: Mutex::new(Vec::new()),
            last_body: Mutex::new(None),
            last_path: Mutex::new(None),
            last_headers: Mutex::new(CapturedHeaders::default()),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle))
            .route("/v1/messages", routing::post(handle))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL including `/v1`; adapters append their own paths
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/v1", self.addr)).unwrap()
    }

    /// Number of requests received
    pub fn requests(&self) -> u32 {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Arrival time of every request, in order
    pub fn arrivals(&self) -> Vec<Instant> {
        self.state.arrivals.lock().unwrap().clone()
    }

    /// Body of the most recent request
    pub fn last_body(&self) -> Value {
        self.state.last_body.lock().unwrap().clone().unwrap_or(Value::Null)
    }

    /// Path of the most recent request
    pub fn last_path(&self) -> Option<String> {
        self.state.last_path.lock().unwrap().clone()
    }

    pub fn last_headers(&self) -> CapturedHeaders {
        self.state.last_headers.lock().unwrap().clone()
    }
}

impl Drop for MockVendor {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    state.arrivals.lock().unwrap().push(Instant::now());
    *state.last_body.lock().unwrap() = Some(body);
    *state.last_path.lock().unwrap() = Some(uri.path().to_owned());

    let captured = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
    *state.last_headers.lock().unwrap() = CapturedHeaders {
        authorization: captured("authorization"),
        api_key: captured("x-api-key"),
        anthropic_version: captured("anthropic-version"),
    };

    let reply = {
        let mut script = state.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    };

    match reply {
        Some(Reply::Json(value)) => Json(value).into_response(),
        Some(Reply::Status(status, body)) => (StatusCode::from_u16(status).unwrap(), body).into_response(),
        Some(Reply::Sse(lines)) => event_stream(sse_body(&lines)),
        Some(Reply::DropAfter(lines)) => dropped_stream(sse_body(&lines)),
        Some(Reply::Paced(lines, interval)) => paced_stream(lines, interval),
        Some(Reply::Stall(lines)) => stalled_stream(sse_body(&lines)),
        None => (StatusCode::NOT_FOUND, "no reply scripted").into_response(),
    }
}

fn sse_body(lines: &[String]) -> String {
    lines.iter().map(|line| format!("data: {line}\n\n")).collect()
}

fn event_stream(body: String) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

/// Send `body`, pause so it reaches the client, then abort the connection
fn dropped_stream(body: String) -> Response {
    let chunks = stream::unfold(0u8, move |step| {
        let body = body.clone();
        async move {
            match step {
                0 => Some((Ok::<_, std::io::Error>(Bytes::from(body)), 1)),
                1 => {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Some((Err(std::io::Error::other("connection dropped")), 2))
                }
                _ => None,
            }
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(Body::from_stream(chunks))
        .unwrap()
}

/// One `data:` frame every `interval`, the first one sent immediately
fn paced_stream(lines: Vec<String>, interval: Duration) -> Response {
    let chunks = stream::unfold((lines.into_iter(), true), move |(mut lines, first)| async move {
        let line = lines.next()?;
        if !first {
            tokio::time::sleep(interval).await;
        }
        Some((Ok::<_, std::io::Error>(Bytes::from(format!("data: {line}\n\n"))), (lines, false)))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(Body::from_stream(chunks))
        .unwrap()
}

/// Send `body`, then keep the connection open without sending anything
fn stalled_stream(body: String) -> Response {
    let chunks = stream::once(async move { Ok::<_, std::io::Error>(Bytes::from(body)) })
        .chain(stream::pending());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(Body::from_stream(chunks))
        .unwrap()
}
