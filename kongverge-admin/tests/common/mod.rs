//! Shared test utilities for kongverge-admin integration tests.
//!
//! `MockKong` serves the subset of the Admin API the client uses, backed by
//! in-memory collections.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use kongverge_admin::{AdminConfig, KongAdminClient};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// A request as the mock saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<Value>>,
    seen: Vec<SeenRequest>,
    conflict_status: Option<StatusCode>,
    fail_next: Option<StatusCode>,
}

#[derive(Clone, Default)]
struct MockState {
    inner: Arc<RwLock<Inner>>,
}

/// Test server wrapper around the mock Admin API.
pub struct MockKong {
    pub addr: SocketAddr,
    state: MockState,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl MockKong {
    pub async fn spawn() -> Self {
        let state = MockState::default();
        let router = Router::new()
            .route("/{collection}", get(list_entities).post(create_entity))
            .route(
                "/{collection}/{key}",
                get(get_entity).patch(update_entity).delete(delete_entity),
            )
            .with_state(state.clone());

        // Bind to port 0 to let the OS choose
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
        let actual_addr = listener.local_addr().unwrap();

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
            addr: actual_addr,
            state,
            shutdown_tx,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Admin config pointing at this server.
    pub fn config(&self) -> AdminConfig {
        AdminConfig {
            admin_uri: self.base_url(),
            ..Default::default()
        }
    }

    pub fn client(&self) -> KongAdminClient {
        KongAdminClient::new(&self.config()).expect("Failed to build client")
    }

    /// Insert an entity directly. Returns its id.
    pub async fn seed(&self, collection: &str, mut entity: Value) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        entity["id"] = json!(id);
        entity["created_at"] = json!(chrono::Utc::now().timestamp());
        let mut inner = self.state.inner.write().await;
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(entity);
        id
    }

    pub async fn stored(&self, collection: &str, id: &str) -> Option<Value> {
        let inner = self.state.inner.read().await;
        find(&inner, collection, id).cloned()
    }

    pub async fn seen(&self) -> Vec<SeenRequest> {
        self.state.inner.read().await.seen.clone()
    }

    /// Report unique violations with this status instead of 409.
    pub async fn set_conflict_status(&self, status: StatusCode) {
        self.state.inner.write().await.conflict_status = Some(status);
    }

    /// Answer the next request with this status.
    pub async fn fail_next(&self, status: StatusCode) {
        self.state.inner.write().await.fail_next = Some(status);
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

fn find<'a>(inner: &'a Inner, collection: &str, key: &str) -> Option<&'a Value> {
    inner
        .collections
        .get(collection)?
        .iter()
        .find(|e| e["id"] == key || e["name"] == key || e["username"] == key)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn ref_id(entity: &Value, field: &str) -> Value {
    entity[field]["id"].clone()
}

/// Fields the Admin API enforces uniqueness over, per collection.
fn unique_fields(collection: &str, entity: &Value) -> Vec<(String, Value)> {
    match collection {
        "plugins" => vec![
            ("name".to_string(), entity["name"].clone()),
            ("consumer".to_string(), ref_id(entity, "consumer")),
            ("route".to_string(), ref_id(entity, "route")),
            ("service".to_string(), ref_id(entity, "service")),
        ],
        "consumers" => ["username", "custom_id"]
            .iter()
            .filter(|f| !entity[**f].is_null())
            .map(|f| (f.to_string(), entity[*f].clone()))
            .collect(),
        _ if entity["name"].is_null() => Vec::new(),
        _ => vec![("name".to_string(), entity["name"].clone())],
    }
}

fn collides(collection: &str, candidate: &Value, existing: &Value) -> Option<Map<String, Value>> {
    let fields = unique_fields(collection, candidate);
    if fields.is_empty() {
        return None;
    }
    let hit = match collection {
        // Each consumer field is unique on its own.
        "consumers" => fields.iter().any(|(f, v)| &existing[f.as_str()] == v),
        "plugins" => fields.iter().all(|(f, v)| {
            let theirs = if f == "name" {
                existing["name"].clone()
            } else {
                ref_id(existing, f)
            };
            &theirs == v
        }),
        _ => fields.iter().all(|(f, v)| &existing[f.as_str()] == v),
    };
    hit.then(|| fields.into_iter().collect())
}

async fn observe(
    state: &MockState,
    method: Method,
    path: String,
    query: HashMap<String, String>,
    headers: HeaderMap,
) -> Option<Response> {
    let mut inner = state.inner.write().await;
    inner.seen.push(SeenRequest {
        method,
        path,
        query,
        headers,
    });
    inner
        .fail_next
        .take()
        .map(|status| error(status, "injected failure"))
}

async fn list_entities(
    State(state): State<MockState>,
    Path(collection): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let path = format!("/{}", collection);
    if let Some(failure) = observe(&state, Method::GET, path, query.clone(), headers).await {
        return failure;
    }

    let size: usize = query
        .get("size")
        .and_then(|s| s.parse().ok())
        .unwrap_or(100);
    if size == 0 || size > 1000 {
        return error(StatusCode::BAD_REQUEST, "size must be between 1 and 1000");
    }
    let start: usize = match query.get("offset").map(|o| o.parse()) {
        None => 0,
        Some(Ok(start)) => start,
        Some(Err(_)) => return error(StatusCode::BAD_REQUEST, "invalid offset"),
    };

    let inner = state.inner.read().await;
    let entities = inner.collections.get(&collection).cloned().unwrap_or_default();
    let end = (start + size).min(entities.len());
    let data = entities[start.min(end)..end].to_vec();

    let mut body = json!({ "data": data, "next": null });
    if end < entities.len() {
        body["offset"] = json!(end.to_string());
        body["next"] = json!(format!("/{}?offset={}&size={}", collection, end, size));
    }
    Json(body).into_response()
}

async fn create_entity(
    State(state): State<MockState>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    Json(mut entity): Json<Value>,
) -> Response {
    let path = format!("/{}", collection);
    if let Some(failure) = observe(&state, Method::POST, path, HashMap::new(), headers).await {
        return failure;
    }

    let mut inner = state.inner.write().await;
    let existing = inner.collections.get(&collection).cloned().unwrap_or_default();
    for other in &existing {
        if let Some(fields) = collides(&collection, &entity, other) {
            let status = inner.conflict_status.unwrap_or(StatusCode::CONFLICT);
            let body = json!({
                "code": 5,
                "name": "unique constraint violation",
                "message": format!("UNIQUE violation detected on '{}'", Value::Object(fields.clone())),
                "fields": fields,
            });
            return (status, Json(body)).into_response();
        }
    }

    entity["id"] = json!(uuid::Uuid::new_v4().to_string());
    entity["created_at"] = json!(chrono::Utc::now().timestamp());
    inner
        .collections
        .entry(collection)
        .or_default()
        .push(entity.clone());
    (StatusCode::CREATED, Json(entity)).into_response()
}

async fn get_entity(
    State(state): State<MockState>,
    Path((collection, key)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let path = format!("/{}/{}", collection, key);
    if let Some(failure) = observe(&state, Method::GET, path, HashMap::new(), headers).await {
        return failure;
    }

    let inner = state.inner.read().await;
    match find(&inner, &collection, &key) {
        Some(entity) => Json(entity.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Not found"),
    }
}

async fn update_entity(
    State(state): State<MockState>,
    Path((collection, key)): Path<(String, String)>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Response {
    let path = format!("/{}/{}", collection, key);
    if let Some(failure) = observe(&state, Method::PATCH, path, HashMap::new(), headers).await {
        return failure;
    }

    let mut inner = state.inner.write().await;
    let entity = inner
        .collections
        .get_mut(&collection)
        .and_then(|entities| entities.iter_mut().find(|e| e["id"] == key.as_str()));
    let Some(entity) = entity else {
        return error(StatusCode::NOT_FOUND, "Not found");
    };
    if let (Some(entity), Some(patch)) = (entity.as_object_mut(), patch.as_object()) {
        for (field, value) in patch {
            entity.insert(field.clone(), value.clone());
        }
    }
    Json(entity.clone()).into_response()
}

async fn delete_entity(
    State(state): State<MockState>,
    Path((collection, key)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let path = format!("/{}/{}", collection, key);
    if let Some(failure) = observe(&state, Method::DELETE, path, HashMap::new(), headers).await {
        return failure;
    }

    let mut inner = state.inner.write().await;
    let entities = inner.collections.entry(collection).or_default();
    let before = entities.len();
    entities.retain(|e| e["id"] != key.as_str());
    if entities.len() == before {
        return error(StatusCode::NOT_FOUND, "Not found");
    }
    StatusCode::NO_CONTENT.into_response()
}
