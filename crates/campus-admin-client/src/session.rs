use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use campus_types::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Credentials of the signed-in admin. Owned by whoever manages sign-in;
/// the client only reads it to build the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token_type: String,
    pub token: String,
    /// The admin's own user id, when the sign-in response provided one.
    #[serde(default)]
    pub user_id: Option<UserId>,
}

impl AuthSession {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token_type: "Bearer".to_string(),
            token: token.into(),
            user_id: None,
        }
    }

    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file format: {0}")]
    Format(#[from] serde_json::Error),
    #[error("session lock poisoned")]
    Poisoned,
}

/// Narrow read/write/clear access to the current session.
pub trait SessionStore: Send + Sync {
    fn read(&self) -> Option<AuthSession>;
    fn write(&self, session: AuthSession) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    current: RwLock<Option<AuthSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: AuthSession) -> Self {
        Self {
            current: RwLock::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn read(&self) -> Option<AuthSession> {
        self.current.read().ok().and_then(|guard| guard.clone())
    }

    fn write(&self, session: AuthSession) -> Result<(), SessionError> {
        *self.current.write().map_err(|_| SessionError::Poisoned)? = Some(session);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.current.write().map_err(|_| SessionError::Poisoned)? = None;
        Ok(())
    }
}

/// Session mirrored to a JSON file so it survives restarts of the CLI.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    cached: RwLock<Option<AuthSession>>,
}

impl FileSessionStore {
    /// Open the store, loading an existing session file if there is one.
    /// An unreadable file is logged and treated as signed out.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = match load(&path) {
            Ok(session) => session,
            Err(e) => {
                warn!("Ignoring unreadable session file {}: {}", path.display(), e);
                None
            }
        };
        Self {
            path,
            cached: RwLock::new(cached),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load(path: &Path) -> Result<Option<AuthSession>, SessionError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl SessionStore for FileSessionStore {
    fn read(&self) -> Option<AuthSession> {
        self.cached.read().ok().and_then(|guard| guard.clone())
    }

    fn write(&self, session: AuthSession) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&session)?)?;
        info!("Session saved to {}", self.path.display());
        *self.cached.write().map_err(|_| SessionError::Poisoned)? = Some(session);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *self.cached.write().map_err(|_| SessionError::Poisoned)? = None;
        Ok(())
    }
}
