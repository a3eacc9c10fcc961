//! Browser-driven automation of the course-election portal.
//!
//! One shared Chromium instance (CDP via `chromiumoxide`) hosts any number of
//! isolated browsing contexts. Each [`Session`] owns one context and one page
//! within it, and drives login, paginated list extraction, capacity refresh,
//! captcha retrieval, and election attempts against the portal. The
//! [`Registry`] owns the browser handle and the id → session map, and guards
//! the browser's start/stop transitions.
//!
//! The portal's selectors and endpoints are a fixed external contract,
//! collected as constants in [`site`]; nothing here tries to generalize to
//! other websites.

pub mod detect;
pub mod error;
pub mod host;
pub mod parse;
pub mod registry;
pub mod session;
pub mod site;
pub mod types;

pub use {
    error::SessionError,
    host::BrowserHost,
    registry::Registry,
    session::Session,
    types::{CourseInfo, CourseRow, ElectionOutcome, LaunchOptions},
};
