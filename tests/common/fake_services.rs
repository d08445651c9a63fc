//! In-process stand-ins for the Heroku and GitHub REST APIs.
//!
//! The fake binds `127.0.0.1:0`, records every request it sees, and answers
//! with canned bodies keyed off the app or account name in the path.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// App name the fake reports as missing.
pub const MISSING_APP: &str = "arslan-botz-missing";
/// App name the fake refuses to create.
pub const TAKEN_APP: &str = "arslan-botz-taken";
/// App name whose creation stalls for [`STALL`].
pub const SLOW_APP: &str = "arslan-botz-slow";
/// Account whose repository lookup stalls for [`STALL`].
pub const SLOW_ACCOUNT: &str = "slowpoke";
/// How long stalled handlers wait before answering.
pub const STALL: Duration = Duration::from_secs(30);
/// `Next-Range` value handed out with the first page of apps.
pub const SECOND_PAGE_RANGE: &str = "id ]arslan-botz-1..; max=1";

/// One request as the fake saw it.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Recorded {
    /// Header value as text, if present.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    }
}

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<Recorded>>>);

impl Journal {
    fn push(&self, method: Method, uri: &Uri, headers: HeaderMap, body: Value) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Recorded {
                method,
                path: uri.path().to_owned(),
                headers,
                body,
            });
    }

    fn snapshot(&self) -> Vec<Recorded> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Running fake server. Aborted on drop.
pub struct FakeServices {
    addr: SocketAddr,
    journal: Journal,
    task: JoinHandle<()>,
}

impl FakeServices {
    /// Starts the fake on an ephemeral port.
    pub async fn start() -> Self {
        let journal = Journal::default();
        let router = Router::new()
            .route("/apps", post(create_app).get(list_apps))
            .route("/apps/:name", delete(delete_app))
            .route("/apps/:name/config-vars", patch(set_config))
            .route("/apps/:name/builds", post(create_build))
            .route("/repos/:owner/:repo", get(repository))
            .with_state(journal.clone());
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("fake services should bind");
        let addr = listener.local_addr().expect("local address");
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("fake services should run");
        });
        Self {
            addr,
            journal,
            task,
        }
    }

    /// Base URL, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<Recorded> {
        self.journal.snapshot()
    }
}

impl Drop for FakeServices {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn app_json(name: &str, created_at: &str) -> Value {
    json!({
        "id": format!("id-{name}"),
        "name": name,
        "created_at": created_at,
        "updated_at": created_at,
        "region": {"name": "eu"},
        "web_url": format!("https://{name}.herokuapp.com/"),
    })
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"id": "not_found", "message": "Couldn't find that app."})),
    )
        .into_response()
}

async fn create_app(
    State(journal): State<Journal>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    journal.push(method, &uri, headers, body.clone());
    let name = body["name"].as_str().unwrap_or_default().to_owned();
    if name == SLOW_APP {
        tokio::time::sleep(STALL).await;
    }
    if name == TAKEN_APP {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"id": "invalid_params", "message": "Name is already taken"})),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(app_json(&name, "2026-03-01T12:00:00Z")),
    )
        .into_response()
}

async fn list_apps(
    State(journal): State<Journal>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    journal.push(method, &uri, headers, Value::Null);
    if range.as_deref() == Some(SECOND_PAGE_RANGE) {
        return Json(json!([app_json("someone-elses-app", "2026-02-01T00:00:00Z")]))
            .into_response();
    }
    (
        StatusCode::PARTIAL_CONTENT,
        [("Next-Range", SECOND_PAGE_RANGE)],
        Json(json!([app_json("arslan-botz-1", "2026-02-28T08:30:00Z")])),
    )
        .into_response()
}

async fn set_config(
    State(journal): State<Journal>,
    Path(name): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    journal.push(method, &uri, headers, body.clone());
    if name == MISSING_APP {
        return not_found();
    }
    Json(body).into_response()
}

async fn create_build(
    State(journal): State<Journal>,
    Path(name): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    journal.push(method, &uri, headers, body);
    if name == MISSING_APP {
        return not_found();
    }
    (
        StatusCode::CREATED,
        Json(json!({"id": "build-1", "status": "pending"})),
    )
        .into_response()
}

async fn delete_app(
    State(journal): State<Journal>,
    Path(name): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    journal.push(method, &uri, headers, Value::Null);
    if name == MISSING_APP {
        return not_found();
    }
    Json(app_json(&name, "2026-02-28T08:30:00Z")).into_response()
}

async fn repository(
    State(journal): State<Journal>,
    Path((owner, repo)): Path<(String, String)>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    journal.push(method, &uri, headers, Value::Null);
    if owner == SLOW_ACCOUNT {
        tokio::time::sleep(STALL).await;
    }
    match owner.as_str() {
        "alice" => Json(json!({
            "full_name": format!("alice/{repo}"),
            "fork": true,
            "parent": {"full_name": "Arslan-MD/Arslan-Botz"},
        }))
        .into_response(),
        "mallory" => Json(json!({
            "full_name": format!("mallory/{repo}"),
            "fork": true,
            "parent": {"full_name": "someone/Arslan-Botz"},
        }))
        .into_response(),
        "bob" => Json(json!({"full_name": format!("bob/{repo}"), "fork": false})).into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))).into_response(),
    }
}
