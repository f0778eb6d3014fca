//! Shared test utilities: a mock REST API store served over HTTP.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use apigw_swagger::ApiGatewayClient;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

/// State of the mock store.
#[derive(Default)]
pub struct MockState {
    pub apis: HashMap<String, Vec<u8>>,
    pub warnings: Vec<String>,
    /// Number of upcoming deletes answered with 429.
    pub delete_throttles: u32,
    /// Answer fetches of existing APIs with a body that has no `id`.
    pub bare_fetch: bool,
    /// Query string of every request, in order.
    pub queries: Vec<(String, HashMap<String, String>)>,
    next_id: u32,
}

type Shared = Arc<Mutex<MockState>>;

fn not_found(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        [("x-amzn-errortype", "NotFoundException:http://internal.amazon.com/coral/com.amazonaws.backplane.controlplane/")],
        Json(json!({ "message": format!("Invalid API identifier specified 123456789012:{id}") })),
    )
        .into_response()
}

fn rest_api(id: &str, warnings: &[String]) -> Json<serde_json::Value> {
    Json(json!({ "id": id, "name": "PetStore", "warnings": warnings }))
}

async fn import_rest_api(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let mut s = state.lock().unwrap();
    s.queries.push(("import".to_string(), query));

    if body.as_ref() == b"invalid" {
        return (
            StatusCode::BAD_REQUEST,
            [("x-amzn-errortype", "BadRequestException")],
            Json(json!({ "message": "Invalid OpenAPI input." })),
        )
            .into_response();
    }

    s.next_id += 1;
    let id = format!("api{:07}", s.next_id);
    s.apis.insert(id.clone(), body.to_vec());
    (StatusCode::CREATED, rest_api(&id, &s.warnings)).into_response()
}

async fn put_rest_api(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let mut s = state.lock().unwrap();
    s.queries.push(("put".to_string(), query));

    match s.apis.get_mut(&id) {
        Some(existing) => *existing = body.to_vec(),
        None => return not_found(&id),
    }
    rest_api(&id, &s.warnings).into_response()
}

async fn get_rest_api(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let s = state.lock().unwrap();
    if s.apis.contains_key(&id) && s.bare_fetch {
        Json(json!({ "name": "PetStore" })).into_response()
    } else if s.apis.contains_key(&id) {
        rest_api(&id, &[]).into_response()
    } else {
        not_found(&id)
    }
}

async fn delete_rest_api(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut s = state.lock().unwrap();
    if s.delete_throttles > 0 {
        s.delete_throttles -= 1;
        return (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response();
    }

    if s.apis.remove(&id).is_some() {
        StatusCode::ACCEPTED.into_response()
    } else {
        // No error header here: the code has to come from the body.
        (
            StatusCode::NOT_FOUND,
            Json(json!({
                "__type": "com.amazonaws.apigateway#NotFoundException",
                "Message": "Invalid API identifier specified"
            })),
        )
            .into_response()
    }
}

/// Mock store bound to an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Shared,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));

        let router = Router::new()
            .route("/restapis", post(import_rest_api))
            .route(
                "/restapis/{id}",
                get(get_rest_api).put(put_rest_api).delete(delete_rest_api),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Server error");
        });

        Self {
            addr,
            state,
            shutdown_tx,
        }
    }

    pub fn client_at(&self, path: &str) -> ApiGatewayClient {
        ApiGatewayClient::new(format!("http://{}{}", self.addr, path).parse().unwrap())
    }

    pub fn client(&self) -> ApiGatewayClient {
        ApiGatewayClient::new(format!("http://{}", self.addr).parse().unwrap())
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}
