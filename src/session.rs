use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::watch;

use crate::error::Result;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Anonymous,
    Pending,
    Authenticated,
}

/// Authentication state for the single interactive user
///
/// Created `Anonymous` at process start; the auth controller drives every
/// transition. Persisted between CLI invocations as a convenience cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub access_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn anonymous() -> Self {
        Self {
            status: SessionStatus::Anonymous,
            access_token: None,
            expires_at: None,
        }
    }

    /// Whether the token lifetime has run out at `now`
    ///
    /// A session without an expiry timestamp does not expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// Route guard: may protected views render for this session?
///
/// Pure predicate, re-evaluated at every protected entry point. A session
/// whose token has expired is treated as anonymous even though its status
/// was last set to `Authenticated`.
pub fn can_access(session: &SessionState) -> bool {
    can_access_at(session, Utc::now())
}

/// Route guard with an explicit clock, for deterministic checks
pub fn can_access_at(session: &SessionState, now: DateTime<Utc>) -> bool {
    session.status == SessionStatus::Authenticated && !session.is_expired_at(now)
}

/// Holds the current session and publishes a change notification on every
/// transition so consumers re-render instead of polling
pub struct SessionStore {
    state: SessionState,
    revision: watch::Sender<u64>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_state(SessionState::anonymous())
    }

    pub fn with_state(state: SessionState) -> Self {
        let (revision, _) = watch::channel(0);
        Self { state, revision }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    /// Replace the session state and notify subscribers
    pub fn set(&mut self, state: SessionState) {
        tracing::debug!("Session transition to {:?}", state.status);
        self.state = state;
        self.revision.send_modify(|rev| *rev += 1);
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Load a persisted session, starting anonymous when none exists
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No session cache found, starting anonymous");
            return Ok(Self::new());
        }

        let json = tokio::fs::read_to_string(path).await?;
        let state: SessionState = serde_json::from_str(&json)?;
        tracing::info!("Loaded session cache: status={:?}", state.status);
        Ok(Self::with_state(state))
    }

    /// Persist the session for the next invocation
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&self.state)?;
        tokio::fs::write(path, json).await?;
        secure_session_file(path).await?;
        tracing::debug!("Saved session cache to {:?}", path);
        Ok(())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Restrict the session cache to the owning user on Unix
///
/// The cache holds a bearer token; 0600 keeps other local users out.
#[cfg(unix)]
async fn secure_session_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn secure_session_file(_path: &Path) -> Result<()> {
    Ok(())
}
