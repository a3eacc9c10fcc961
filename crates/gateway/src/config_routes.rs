//! Config and browser-lifecycle routes.

use {
    axum::{
        Json,
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    serde_json::json,
    tracing::debug,
};

use {elector_config::ElectorConfig, elector_session::LaunchOptions};

use crate::{server::AppState, session_routes::error_response};

/// Current configuration.
pub async fn config_get(State(state): State<AppState>) -> Response {
    Json(state.config.read().await.clone()).into_response()
}

/// Replace the configuration and persist it to disk.
pub async fn config_set(
    State(state): State<AppState>,
    Json(new_config): Json<ElectorConfig>,
) -> Response {
    match elector_config::save_config(&new_config) {
        Ok(path) => {
            debug!(path = %path.display(), "config updated");
            *state.config.write().await = new_config;
            Json(json!({ "ok": true })).into_response()
        },
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Start the shared browser with the configured launch settings.
pub async fn browser_start(State(state): State<AppState>) -> Response {
    let options = LaunchOptions::from(&state.config.read().await.browser);
    match state.registry.start(&options).await {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(e) => error_response(e),
    }
}

/// Stop the shared browser, invalidating any remaining sessions.
pub async fn browser_stop(State(state): State<AppState>) -> Response {
    match state.registry.stop().await {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(e) => error_response(e),
    }
}
