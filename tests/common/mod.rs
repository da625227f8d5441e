//! In-process mock registry and token servers for integration tests
#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use docker_tag_finder::{FinderConfig, ImageReference, RegistryClient};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral localhost port and return its base URL
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock server");
    let addr = listener.local_addr().expect("mock server has no address");

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("mock server crashed");
    });

    format!("http://{}", addr)
}

pub fn client() -> Arc<RegistryClient> {
    Arc::new(RegistryClient::new(&FinderConfig::default()).expect("client builds"))
}

pub fn reference(base_url: &str, repository: &str) -> ImageReference {
    ImageReference::new(base_url, repository).expect("valid reference")
}

pub fn tag_names(start: usize, count: usize) -> Vec<String> {
    (start..start + count).map(|i| format!("tag{}", i)).collect()
}

/// Deterministic fake digest for tag number `i`
pub fn digest_for(i: usize) -> String {
    format!("sha256:{:064x}", i + 1)
}

/// Token endpoint that counts requests and remembers their query strings
pub struct TokenServer {
    pub token: String,
    pub field: &'static str,
    pub status: StatusCode,
    pub hits: AtomicUsize,
    pub queries: Mutex<Vec<HashMap<String, String>>>,
}

impl TokenServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> HashMap<String, String> {
        self.queries
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("token endpoint was never called")
    }
}

async fn issue_token(
    State(server): State<Arc<TokenServer>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    server.hits.fetch_add(1, Ordering::SeqCst);
    server.queries.lock().unwrap().push(params);

    if server.status != StatusCode::OK {
        return server.status.into_response();
    }

    let mut body = serde_json::Map::new();
    body.insert(
        server.field.to_string(),
        serde_json::Value::String(server.token.clone()),
    );
    Json(serde_json::Value::Object(body)).into_response()
}

/// Start a token endpoint answering `{"<field>": "<token>"}`; returns its realm URL
pub async fn spawn_token_server(
    token: &str,
    field: &'static str,
    status: StatusCode,
) -> (String, Arc<TokenServer>) {
    let server = Arc::new(TokenServer {
        token: token.to_string(),
        field,
        status,
        hits: AtomicUsize::new(0),
        queries: Mutex::new(Vec::new()),
    });

    let router = Router::new()
        .route("/token", get(issue_token))
        .with_state(Arc::clone(&server));
    let base = spawn_server(router).await;

    (format!("{}/token", base), server)
}
