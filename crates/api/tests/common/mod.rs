#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use roster_api::config::ServerConfig;
use roster_api::extract::SESSION_HEADER;
use roster_api::router::build_app_router;
use roster_api::state::AppState;
use roster_core::memory::{InMemoryRosterStore, InMemoryWorkQueue};
use roster_core::types::SessionId;
use tower::ServiceExt;

const BOUNDARY: &str = "roster-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..ServerConfig::default()
    }
}

/// The application router plus handles on its in-memory adapters.
pub struct TestApp {
    pub router: Router,
    pub queue: Arc<InMemoryWorkQueue>,
    pub store: Arc<InMemoryRosterStore>,
    pub state: AppState,
}

impl TestApp {
    /// A fresh router sharing this app's state.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build the full application router, with every middleware layer that
/// production uses, over in-memory adapters.
pub fn build_test_app() -> TestApp {
    let queue = Arc::new(InMemoryWorkQueue::new());
    let store = Arc::new(InMemoryRosterStore::new());
    let state = AppState::new(queue.clone(), store.clone(), test_config());
    TestApp {
        router: build_app_router(state.clone()),
        queue,
        store,
        state,
    }
}

pub fn new_session() -> SessionId {
    SessionId::new_v4()
}

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_with_session(app: Router, uri: &str, session: SessionId) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header(SESSION_HEADER, session.to_string())
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_with_session(app: Router, uri: &str, session: SessionId) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(SESSION_HEADER, session.to_string())
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete_with_session(app: Router, uri: &str, session: SessionId) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header(SESSION_HEADER, session.to_string())
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Multipart body with a single `file` part.
pub fn multipart_body(file_name: &str, contents: &str) -> Body {
    Body::from(format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/csv\r\n\
         \r\n\
         {contents}\r\n\
         --{BOUNDARY}--\r\n"
    ))
}

/// POST a CSV to the preview endpoint, optionally under a session.
pub async fn upload_csv(
    app: Router,
    session: Option<SessionId>,
    file_name: &str,
    contents: &str,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/imports/preview")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(session) = session {
        builder = builder.header(SESSION_HEADER, session.to_string());
    }
    send(app, builder.body(multipart_body(file_name, contents)).unwrap()).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// A well-formed CSV with `n` rows.
pub fn csv_with_rows(n: usize) -> String {
    let mut csv = String::from("name,email,role,employmentType\n");
    for i in 0..n {
        csv.push_str(&format!("Member {i},member{i}@example.com,Engineer,FullTime\n"));
    }
    csv
}
