//! Router assembly and server startup.

use std::sync::Arc;

use {
    axum::{
        Router,
        routing::{get, post},
    },
    tokio::{net::TcpListener, sync::RwLock},
    tracing::info,
};

use {elector_config::ElectorConfig, elector_session::Registry};

use crate::{config_routes, session_routes};

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<ElectorConfig>>,
    pub registry: Arc<Registry>,
}

impl AppState {
    pub fn new(config: ElectorConfig, registry: Arc<Registry>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            registry,
        }
    }
}

/// Build the control API router (shared between production startup and
/// tests).
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route(
            "/config",
            get(config_routes::config_get).post(config_routes::config_set),
        )
        .route("/start", post(config_routes::browser_start))
        .route("/stop", post(config_routes::browser_stop))
        .route(
            "/session",
            get(session_routes::session_list).post(session_routes::session_create),
        )
        .route(
            "/session/{id}",
            get(session_routes::session_get).delete(session_routes::session_delete),
        )
        .route("/session/{id}/login", post(session_routes::login))
        .route("/session/{id}/loadList", post(session_routes::load_list))
        .route(
            "/session/{id}/refreshLimit",
            post(session_routes::refresh_limit),
        )
        .route(
            "/session/{id}/loadCaptcha",
            post(session_routes::load_captcha),
        )
        .route("/session/{id}/elect", post(session_routes::elect))
        .with_state(state)
}

/// Serve the control API until ctrl-c, then stop the browser.
pub async fn serve(state: AppState, listener: TcpListener) -> anyhow::Result<()> {
    let registry = Arc::clone(&state.registry);
    let app = build_app(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await?;
    Ok(())
}

async fn shutdown_signal(registry: Arc<Registry>) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    info!("shutting down");
    registry.shutdown().await;
}
