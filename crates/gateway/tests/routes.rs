#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for the control API routes, over a real listener.
//!
//! Nothing here needs a browser: these exercise route wiring, the uniform
//! not-found mapping, lifecycle precondition codes, and config persistence.

use std::{net::SocketAddr, sync::Arc};

use {
    elector_config::ElectorConfig,
    elector_gateway::{AppState, build_app},
    elector_session::Registry,
    tokio::net::TcpListener,
};

async fn spawn_app() -> SocketAddr {
    spawn_app_with_config(ElectorConfig::default()).await
}

async fn spawn_app_with_config(config: ElectorConfig) -> SocketAddr {
    let state = AppState::new(config, Arc::new(Registry::new()));
    let app = build_app(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn session_list_starts_empty() {
    let addr = spawn_app().await;
    let body: serde_json::Value = reqwest::get(format!("http://{addr}/session"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["sessions"], serde_json::json!([]));
}

#[tokio::test]
async fn unknown_session_is_404_everywhere() {
    let addr = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("http://{addr}/session/nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("nope"));

    let resp = client
        .delete(format!("http://{addr}/session/nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .post(format!("http://{addr}/session/nope/login"))
        .json(&serde_json::json!({ "user": "u", "pass": "p" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .post(format!("http://{addr}/session/nope/elect"))
        .json(&serde_json::json!({
            "elecUrl": "https://elective.pku.edu.cn/x.do",
            "xh": "1",
            "code": "abcd"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn lifecycle_preconditions_are_409() {
    let addr = spawn_app().await;
    let client = reqwest::Client::new();

    // No browser running: stop and create-session are precondition errors.
    let resp = client
        .post(format!("http://{addr}/stop"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "browser not started");

    let resp = client
        .post(format!("http://{addr}/session"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn config_get_returns_current_values() {
    let mut config = ElectorConfig::default();
    config.browser.headless = false;
    let addr = spawn_app_with_config(config).await;

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/config"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["browser"]["headless"], false);
    assert_eq!(body["server"]["bind"], "127.0.0.1");
}

#[tokio::test]
async fn config_post_persists_and_applies() {
    // The config dir override is process-global, so the whole persistence
    // flow lives in this one test.
    let dir = tempfile::tempdir().unwrap();
    elector_config::set_config_dir(dir.path().to_path_buf());

    let addr = spawn_app().await;
    let client = reqwest::Client::new();

    let mut updated = ElectorConfig::default();
    updated.browser.browser_path = Some("/opt/chromium/chrome".into());
    let resp = client
        .post(format!("http://{addr}/config"))
        .json(&updated)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Applied in memory.
    let body: serde_json::Value = client
        .get(format!("http://{addr}/config"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["browser"]["browser_path"], "/opt/chromium/chrome");

    // And persisted to disk.
    let written = std::fs::read_to_string(dir.path().join("elector.toml")).unwrap();
    assert!(written.contains("/opt/chromium/chrome"));

    elector_config::clear_config_dir();
}
