//! Per-session routes: create/list/get/delete plus the workflow operations.

use {
    axum::{
        Json,
        extract::{Path, State},
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    serde::Deserialize,
    serde_json::json,
};

use elector_session::SessionError;

use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub user: String,
    pub pass: String,
    /// Accepted for API compatibility; the engine ignores it today.
    #[serde(default)]
    pub secondary: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshLimitPayload {
    pub index: String,
    pub seq_no: String,
    pub xh: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectPayload {
    pub elec_url: String,
    pub xh: String,
    pub code: String,
}

/// Map an error onto the status taxonomy: unknown id → 404, lifecycle
/// preconditions → 409, domain/parse failures → 422, remote-interaction
/// failures → 502.
fn status_for(err: &SessionError) -> StatusCode {
    match err {
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionError::AlreadyStarted
        | SessionError::NotStarted
        | SessionError::NotInitialized
        | SessionError::AlreadyInitialized
        | SessionError::SessionGone => StatusCode::CONFLICT,
        SessionError::Expired(_)
        | SessionError::WrongCaptcha
        | SessionError::InvalidElectUrl(_)
        | SessionError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::Launch(_)
        | SessionError::Navigation(_)
        | SessionError::Evaluation(_)
        | SessionError::WaitTimeout(_)
        | SessionError::Cdp(_) => StatusCode::BAD_GATEWAY,
    }
}

pub(crate) fn error_response(err: SessionError) -> Response {
    (status_for(&err), Json(json!({ "error": err.to_string() }))).into_response()
}

pub async fn session_list(State(state): State<AppState>) -> Response {
    Json(json!({ "sessions": state.registry.list().await })).into_response()
}

pub async fn session_create(State(state): State<AppState>) -> Response {
    match state.registry.create_session().await {
        Ok(id) => Json(json!({ "id": id })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn session_get(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.registry.get(&id).await {
        Ok(session) => Json(json!({ "id": session.name() })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn session_delete(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.registry.remove(&id).await {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn login(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<LoginPayload>,
) -> Response {
    let session = match state.registry.get(&id).await {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };
    let _ = payload.secondary;
    match session.login(&payload.user, &payload.pass).await {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn load_list(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let session = match state.registry.get(&id).await {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };
    match session.load_list().await {
        Ok(rows) => Json(json!({ "rows": rows })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn refresh_limit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<RefreshLimitPayload>,
) -> Response {
    let session = match state.registry.get(&id).await {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };
    match session
        .refresh_limit(&payload.index, &payload.seq_no, &payload.xh)
        .await
    {
        // The upstream JSON body passes through untouched.
        Ok(value) => Json(value).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn load_captcha(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let session = match state.registry.get(&id).await {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };
    match session.load_captcha().await {
        Ok(image) => Json(json!({ "image": image })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn elect(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ElectPayload>,
) -> Response {
    let session = match state.registry.get(&id).await {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };
    match session
        .elect(&payload.elec_url, &payload.xh, &payload.code)
        .await
    {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e),
    }
}
