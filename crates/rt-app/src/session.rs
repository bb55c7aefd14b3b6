//! The signed-in session and its cached profile.
//!
//! Created at sign-in or registration, cleared at sign-out. The cached
//! profile lives in the local cache so the last user's name and avatar are
//! available before the store answers; it never contains a password.

use crate::state::Observable;
use rt_core::error::{AppError, Result};
use rt_core::models::{CachedProfile, Session, User};
use rt_core::traits::LocalCache;
use std::sync::Arc;
use tokio::sync::watch;

/// Cache key of the signed-in user's profile.
pub const PROFILE_KEY: &str = "session.profile";

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    cache: Arc<dyn LocalCache>,
    current: Observable<Option<Session>>,
}

impl SessionStore {
    pub fn new(cache: Arc<dyn LocalCache>, current: Option<Session>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                current: Observable::new(current),
            }),
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.current.get()
    }

    /// The current session, or `NotAuthenticated`.
    pub fn require(&self) -> Result<Session> {
        self.current().ok_or(AppError::NotAuthenticated)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.current.subscribe()
    }

    /// Starts `session`, caching `profile` (or forgetting a previous user's).
    pub async fn begin(&self, session: Session, profile: Option<&User>) -> Result<()> {
        match profile {
            Some(user) => {
                let raw = serde_json::to_string(&CachedProfile::from(user))
                    .map_err(|e| AppError::Internal(e.to_string()))?;
                self.inner.cache.put(PROFILE_KEY, raw).await?;
            }
            None => self.inner.cache.remove(PROFILE_KEY).await?,
        }
        tracing::debug!(user_id = %session.user_id, "session started");
        self.inner.current.set(Some(session));
        Ok(())
    }

    /// Ends the session and drops the cached profile.
    pub async fn end(&self) -> Result<()> {
        self.inner.current.set(None);
        self.inner.cache.remove(PROFILE_KEY).await
    }

    pub async fn cached_profile(&self) -> Result<Option<CachedProfile>> {
        let Some(raw) = self.inner.cache.get(PROFILE_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable cached profile");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rt_cache_file::FileCache;

    #[tokio::test]
    async fn begin_and_end_manage_the_cached_profile() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(FileCache::open(dir.path().join("cache.json")).await.unwrap());
        let sessions = SessionStore::new(cache.clone(), None);
        let session = Session {
            user_id: "u1".into(),
            email: "a@b.c".into(),
        };
        let user = User {
            id: "u1".into(),
            username: "alice".into(),
            email: "a@b.c".into(),
            profile_image_url: "/u/a.png".into(),
        };

        sessions.begin(session.clone(), Some(&user)).await.unwrap();
        assert_eq!(sessions.current(), Some(session.clone()));
        let profile = sessions.cached_profile().await.unwrap().unwrap();
        assert_eq!(profile.username, "alice");
        let raw = cache.get(PROFILE_KEY).await.unwrap().unwrap();
        assert!(!raw.contains("password"));

        sessions.begin(session, None).await.unwrap();
        assert!(sessions.cached_profile().await.unwrap().is_none());

        sessions.end().await.unwrap();
        assert!(sessions.current().is_none());
        assert_eq!(sessions.require(), Err(AppError::NotAuthenticated));
    }
}
