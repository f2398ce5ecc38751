//! In-process catalog API used by the async tests.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use shared::domain::{Product, ProductDraft, ProductId};
use tokio::{net::TcpListener, sync::Mutex};

use crate::config::ClientSettings;

pub const SESSION_COOKIE: &str = "session_id=test-session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub body: String,
    pub had_cookie: bool,
}

#[derive(Default)]
pub struct MockCatalogInner {
    pub products: Vec<Product>,
    pub next_id: u64,
    pub requests: Vec<RecordedRequest>,
    /// Every catalog route answers 401 while set.
    pub reject_session: bool,
    /// Catalog routes answer 401 unless the login cookie is presented.
    pub require_cookie: bool,
    pub list_failure: Option<(u16, String)>,
    pub mutation_failure: Option<(u16, String)>,
    pub login_reply: Option<(u16, String)>,
    pub register_reply: Option<(u16, String)>,
    /// Delays applied to successive list responses, after the snapshot is taken.
    pub list_delays: VecDeque<Duration>,
    pub login_delay: Option<Duration>,
    /// Held before a create is recorded or applied.
    pub create_delay: Option<Duration>,
}

#[derive(Clone, Default)]
pub struct MockCatalog {
    pub inner: Arc<Mutex<MockCatalogInner>>,
}

impl MockCatalog {
    pub fn with_products(products: Vec<Product>) -> Self {
        let next_id = products.len() as u64;
        Self {
            inner: Arc::new(Mutex::new(MockCatalogInner {
                products,
                next_id,
                ..MockCatalogInner::default()
            })),
        }
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().await.requests.clone()
    }

    pub async fn count(&self, method: &str, path: &str) -> usize {
        self.inner
            .lock()
            .await
            .requests
            .iter()
            .filter(|req| req.method == method && req.path == path)
            .count()
    }

    pub async fn products(&self) -> Vec<Product> {
        self.inner.lock().await.products.clone()
    }

    pub async fn update(&self, f: impl FnOnce(&mut MockCatalogInner)) {
        f(&mut *self.inner.lock().await);
    }
}

pub fn product(id: &str, name: &str, price: f64) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        description: format!("{name} description"),
        price,
        stock: 1,
    }
}

pub fn settings_for(base_url: &str) -> ClientSettings {
    ClientSettings {
        base_url: base_url.to_string(),
        request_timeout: Duration::from_secs(5),
        ..ClientSettings::default()
    }
}

/// Binds on an ephemeral port and returns the base URL (with a `/shop/` deployment prefix).
pub async fn spawn_catalog(state: MockCatalog) -> anyhow::Result<String> {
    let api = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/logout", post(logout))
        .route("/api/v1/productos", get(list_products).post(create_product))
        .route(
            "/api/v1/productos/:id",
            put(update_product).delete(delete_product),
        )
        .with_state(state);
    let app = Router::new().nest("/shop", api);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/shop"))
}

/// Waits until `cond` holds for the watched value, failing the test after two seconds.
pub async fn wait_for<T>(
    rx: &mut tokio::sync::watch::Receiver<T>,
    cond: impl FnMut(&T) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(cond))
        .await
        .expect("condition not reached in time")
        .expect("watch sender dropped");
}

fn has_cookie(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains(SESSION_COOKIE))
}

fn record(
    inner: &mut MockCatalogInner,
    method: &'static str,
    path: String,
    headers: &HeaderMap,
    body: &str,
) {
    inner.requests.push(RecordedRequest {
        method,
        path,
        body: body.to_string(),
        had_cookie: has_cookie(headers),
    });
}

fn reply(status: u16, body: String) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, body).into_response()
}

fn catalog_gate(inner: &MockCatalogInner, headers: &HeaderMap) -> Option<Response> {
    if inner.reject_session || (inner.require_cookie && !has_cookie(headers)) {
        return Some(reply(
            401,
            "Autenticación requerida. No se encontró cookie de sesión.".to_string(),
        ));
    }
    None
}

async fn login(State(state): State<MockCatalog>, headers: HeaderMap, body: String) -> Response {
    let (configured, delay) = {
        let mut inner = state.inner.lock().await;
        record(&mut inner, "POST", "/api/auth/login".into(), &headers, &body);
        (inner.login_reply.clone(), inner.login_delay)
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if let Some((status, body)) = configured {
        return reply(status, body);
    }

    let creds: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    if creds["username"] == "alice" && creds["password"] == "pw" {
        (
            StatusCode::OK,
            [(header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/; HttpOnly"))],
            Json(json!({"message": "welcome alice", "username": "alice", "id": 1, "role": "admin"})),
        )
            .into_response()
    } else {
        reply(401, "Credenciales inválidas.".to_string())
    }
}

async fn register(
    State(state): State<MockCatalog>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let mut inner = state.inner.lock().await;
    record(&mut inner, "POST", "/api/auth/register".into(), &headers, &body);
    match inner.register_reply.clone() {
        Some((status, body)) => reply(status, body),
        None => (StatusCode::CREATED, Json(json!({"message": "registered"}))).into_response(),
    }
}

async fn logout(State(state): State<MockCatalog>, headers: HeaderMap) -> Response {
    let mut inner = state.inner.lock().await;
    record(&mut inner, "POST", "/api/auth/logout".into(), &headers, "");
    StatusCode::NO_CONTENT.into_response()
}

async fn list_products(State(state): State<MockCatalog>, headers: HeaderMap) -> Response {
    let (snapshot, delay) = {
        let mut inner = state.inner.lock().await;
        record(&mut inner, "GET", "/api/v1/productos".into(), &headers, "");
        if let Some(rejection) = catalog_gate(&inner, &headers) {
            return rejection;
        }
        if let Some((status, body)) = inner.list_failure.clone() {
            return reply(status, body);
        }
        (inner.products.clone(), inner.list_delays.pop_front())
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    Json(json!({ "items": snapshot })).into_response()
}

async fn create_product(
    State(state): State<MockCatalog>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let delay = state.inner.lock().await.create_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let mut inner = state.inner.lock().await;
    record(&mut inner, "POST", "/api/v1/productos".into(), &headers, &body);
    if let Some(rejection) = catalog_gate(&inner, &headers) {
        return rejection;
    }
    if let Some((status, body)) = inner.mutation_failure.clone() {
        return reply(status, body);
    }
    let Ok(draft) = serde_json::from_str::<ProductDraft>(&body) else {
        return reply(400, "invalid product json".to_string());
    };
    inner.next_id += 1;
    let created = draft.into_product(ProductId::new(inner.next_id.to_string()));
    inner.products.push(created.clone());
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn update_product(
    State(state): State<MockCatalog>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let mut inner = state.inner.lock().await;
    record(&mut inner, "PUT", format!("/api/v1/productos/{id}"), &headers, &body);
    if let Some(rejection) = catalog_gate(&inner, &headers) {
        return rejection;
    }
    if let Some((status, body)) = inner.mutation_failure.clone() {
        return reply(status, body);
    }
    let Ok(mut updated) = serde_json::from_str::<Product>(&body) else {
        return reply(400, "invalid product json".to_string());
    };
    updated.id = ProductId::new(id.clone());
    match inner.products.iter_mut().find(|p| p.id.as_str() == id) {
        Some(existing) => {
            *existing = updated.clone();
            Json(updated).into_response()
        }
        None => reply(404, "Producto no encontrado para actualizar".to_string()),
    }
}

async fn delete_product(
    State(state): State<MockCatalog>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut inner = state.inner.lock().await;
    record(&mut inner, "DELETE", format!("/api/v1/productos/{id}"), &headers, "");
    if let Some(rejection) = catalog_gate(&inner, &headers) {
        return rejection;
    }
    if let Some((status, body)) = inner.mutation_failure.clone() {
        return reply(status, body);
    }
    let before = inner.products.len();
    inner.products.retain(|p| p.id.as_str() != id);
    if inner.products.len() == before {
        reply(404, "Producto no encontrado para eliminar".to_string())
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}
