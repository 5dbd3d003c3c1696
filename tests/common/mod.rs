//! Scripted upstream server shared by the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde_json::{json, Value};

/// What the upstream does on a given attempt.
#[derive(Debug, Clone)]
pub enum Behavior {
    Json(Value),
    Status(u16),
    Hang(Duration),
    NotJson,
}

/// A request as the upstream saw it.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub struct Upstream {
    pub addr: SocketAddr,
    script: Arc<Script>,
}

struct Script {
    plan: Vec<Behavior>,
    hits: AtomicUsize,
    seen: Mutex<Vec<Seen>>,
}

impl Upstream {
    /// Serves `plan[n]` for the n-th request; the last behavior repeats.
    pub async fn spawn(plan: Vec<Behavior>) -> Self {
        assert!(!plan.is_empty());
        let script = Arc::new(Script {
            plan,
            hits: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        });

        let router = Router::new()
            .route("/*path", any(scripted))
            .with_state(Arc::clone(&script));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, script }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.script.hits.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.script.seen.lock().unwrap().clone()
    }
}

/// Base URL of a port nothing listens on.
pub async fn refused_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/v1", addr)
}

async fn scripted(
    State(script): State<Arc<Script>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let n = script.hits.fetch_add(1, Ordering::SeqCst);
    script.seen.lock().unwrap().push(Seen {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    });

    let behavior = script
        .plan
        .get(n)
        .or_else(|| script.plan.last())
        .cloned()
        .unwrap();

    match behavior {
        Behavior::Json(value) => Json(value).into_response(),
        Behavior::Status(code) => (
            StatusCode::from_u16(code).unwrap(),
            Json(json!({"error": "upstream unhappy"})),
        )
            .into_response(),
        Behavior::Hang(duration) => {
            tokio::time::sleep(duration).await;
            Json(json!({"late": true})).into_response()
        }
        Behavior::NotJson => (StatusCode::OK, "<html>maintenance</html>").into_response(),
    }
}
