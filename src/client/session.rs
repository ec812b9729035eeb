use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::auth::{AuthResponse, UserResponse};
use crate::client::{api::ClientError, feed::FeedCursor};

/// Client state for one signed-in user.
///
/// Only `user` and `token` survive a reload; the feed cursor and the profile
/// being viewed are per-run state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: Option<UserResponse>,
    pub token: Option<String>,
    #[serde(skip)]
    pub feed: FeedCursor,
    #[serde(skip)]
    pub viewing_profile: Option<i64>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn sign_in(&mut self, auth: AuthResponse) {
        self.user = Some(auth.user);
        self.token = Some(auth.token);
        self.feed = FeedCursor::default();
        self.viewing_profile = None;
    }

    /// Forgets everything, as on logout or account deletion.
    pub fn clear(&mut self) {
        *self = Session::default();
    }
}

/// Persists a [`Session`] as JSON on disk.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means a signed-out session.
    pub async fn load(&self) -> Result<Session, ClientError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Session::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, session: &Session) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_vec_pretty(session)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), ClientError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
