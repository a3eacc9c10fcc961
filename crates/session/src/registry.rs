//! Session registry and guarded lifecycle of the shared browser.

use std::{collections::HashMap, sync::Arc};

use {
    rand::Rng,
    tokio::sync::{Mutex, RwLock},
    tracing::{info, warn},
};

use crate::{
    error::{Result, SessionError},
    host::BrowserHost,
    session::Session,
    types::LaunchOptions,
};

/// Owns the shared browser handle and the id → session map.
///
/// The browser handle is explicit state with guarded transitions: `start`
/// rejects a second start, `stop` rejects a stop without a start and
/// invalidates any sessions still attached before the browser goes away, so
/// no dangling session handles survive a stop.
pub struct Registry {
    host: Mutex<Option<Arc<BrowserHost>>>,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            host: Mutex::new(None),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Launch the shared browser. Errors if one is already running.
    pub async fn start(&self, options: &LaunchOptions) -> Result<()> {
        let mut host = self.host.lock().await;
        if host.is_some() {
            return Err(SessionError::AlreadyStarted);
        }
        let launched = BrowserHost::launch(options).await?;
        *host = Some(Arc::new(launched));
        Ok(())
    }

    /// Stop the shared browser, destroying every session still attached.
    pub async fn stop(&self) -> Result<()> {
        let mut host = self.host.lock().await;
        let Some(running) = host.take() else {
            return Err(SessionError::NotStarted);
        };

        let drained: Vec<(String, Arc<Session>)> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().collect()
        };
        for (id, session) in drained {
            if let Err(e) = session.destroy().await {
                warn!(session = id, error = %e, "failed to destroy session during stop");
            }
        }

        running.shutdown().await;
        info!("browser stopped");
        Ok(())
    }

    pub async fn started(&self) -> bool {
        self.host.lock().await.is_some()
    }

    /// Construct a session, run its `init`, and register it under a fresh
    /// token. Requires a started browser.
    pub async fn create_session(&self) -> Result<String> {
        let host = self
            .host
            .lock()
            .await
            .clone()
            .ok_or(SessionError::NotStarted)?;

        let name = generate_session_name();
        let session = Arc::new(Session::new(name.clone(), host));
        session.init().await?;

        self.sessions
            .write()
            .await
            .insert(name.clone(), Arc::clone(&session));
        info!(session = name, "created session");
        Ok(name)
    }

    /// Look up a session; unknown ids get the uniform not-found error.
    pub async fn get(&self, id: &str) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    pub async fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Destroy a session, then unregister it. A failed destroy leaves the
    /// session registered, mirroring the destroy-then-remove contract.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let session = self.get(id).await?;
        session.destroy().await?;
        self.sessions.write().await.remove(id);
        info!(session = id, "removed session");
        Ok(())
    }

    /// Process-shutdown hook: stop the browser if it is running.
    pub async fn shutdown(&self) {
        match self.stop().await {
            Ok(()) | Err(SessionError::NotStarted) => {},
            Err(e) => warn!(error = %e, "browser shutdown failed"),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_session_name() -> String {
    let mut rng = rand::rng();
    let id: u64 = rng.random();
    format!("sess-{id:016x}")
}
