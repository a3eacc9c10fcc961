//! HTTP control surface over the session registry.
//!
//! Thin plumbing by design: every route resolves a session (or the registry)
//! and delegates; the workflow logic lives in `elector-session`.

pub mod config_routes;
pub mod server;
pub mod session_routes;

pub use server::{AppState, build_app, serve};
