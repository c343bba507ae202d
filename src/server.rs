use std::future::Future;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::auth::Authorized;
use crate::config::ServerConfig;
use crate::errors::{CrudError, CrudResult};
use crate::item::Item;
use crate::services::store::split_member_path;
use crate::services::ResourceStore;

#[derive(Clone, Default)]
pub struct AppState {
    pub store: ResourceStore,
    pub api_token: Option<String>,
}

impl AppState {
    pub fn new(store: ResourceStore, api_token: Option<String>) -> Self {
        Self { store, api_token }
    }
}

/// Generic resource API: any path under `/api` is a collection, and its last
/// segment addresses a member for `PUT`/`DELETE`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/*path",
            get(list_items)
                .post(create_item)
                .put(update_item)
                .delete(delete_item),
        )
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "service": "ok",
        "timestamp": Utc::now()
    }))
}

async fn list_items(
    _: Authorized,
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Json<Vec<Item>> {
    Json(state.store.list(&path))
}

async fn create_item(
    _: Authorized,
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(item): Json<Item>,
) -> Result<(StatusCode, Json<Item>), CrudError> {
    let created = state.store.create(&path, item)?;
    info!(resource = %path, id = ?created.id(), "item created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_item(
    _: Authorized,
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(item): Json<Item>,
) -> Result<Json<Item>, CrudError> {
    let (resource, id) = split_member_path(&path)?;
    let updated = state.store.update(&resource, &id, item)?;
    info!(%resource, %id, "item updated");
    Ok(Json(updated))
}

async fn delete_item(
    _: Authorized,
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<StatusCode, CrudError> {
    let (resource, id) = split_member_path(&path)?;
    state.store.delete(&resource, &id)?;
    info!(%resource, %id, "item deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Serves the API on an already bound listener until `shutdown` resolves.
pub async fn serve_on<F>(listener: TcpListener, state: AppState, shutdown: F) -> CrudResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| CrudError::Transport(format!("server crashed: {e}")))
}

pub async fn serve(config: ServerConfig, store: ResourceStore) -> CrudResult<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| CrudError::Transport(format!("failed to bind {}: {e}", config.bind_addr)))?;
    info!(
        addr = %config.bind_addr,
        auth = config.api_token.is_some(),
        "API listening"
    );
    serve_on(
        listener,
        AppState::new(store, config.api_token),
        shutdown_signal(),
    )
    .await
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
