//! Error taxonomy for the browser host, registry, and session workflow.

use thiserror::Error;

/// Errors surfaced by session operations.
///
/// Election rejection by the portal is deliberately absent: it is an expected
/// business outcome reported through
/// [`ElectionOutcome`](crate::types::ElectionOutcome), not an error.
#[derive(Debug, Error)]
pub enum SessionError {
    // Lifecycle preconditions. Surfaced immediately, never retried.
    #[error("browser already started")]
    AlreadyStarted,

    #[error("browser not started")]
    NotStarted,

    #[error("session not initialized")]
    NotInitialized,

    #[error("session already initialized")]
    AlreadyInitialized,

    #[error("session is gone")]
    SessionGone,

    #[error("no such session: {0}")]
    NotFound(String),

    // Remote interaction failures. Propagated as-is; nothing retries.
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("JavaScript evaluation failed: {0}")]
    Evaluation(String),

    #[error("timed out waiting for {0}")]
    WaitTimeout(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    // Domain failures detected mid-operation.
    #[error("session expired: {0}")]
    Expired(String),

    #[error("wrong captcha")]
    WrongCaptcha,

    #[error("invalid election url: {0}")]
    InvalidElectUrl(String),

    // Malformed data from the portal.
    #[error("malformed action script: {0}")]
    Parse(String),
}

impl From<chromiumoxide::error::CdpError> for SessionError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::Cdp(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
