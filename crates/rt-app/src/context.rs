//! Ports shared by every view-model.

use crate::session::SessionStore;
use rt_core::traits::{AuthProvider, LocalCache, MediaUploader, NotificationSource, RemoteStore};
use std::sync::Arc;

/// The adapters a running client was assembled with, plus its session.
/// Cheap to clone; every screen holds its own copy.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn RemoteStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub media: Arc<dyn MediaUploader>,
    pub cache: Arc<dyn LocalCache>,
    pub notifications: Arc<dyn NotificationSource>,
    pub session: SessionStore,
}

impl AppContext {
    /// Wires the adapters together. The session starts from whatever the
    /// auth provider still has signed in.
    pub fn new(
        store: Arc<dyn RemoteStore>,
        auth: Arc<dyn AuthProvider>,
        media: Arc<dyn MediaUploader>,
        cache: Arc<dyn LocalCache>,
        notifications: Arc<dyn NotificationSource>,
    ) -> Self {
        let session = SessionStore::new(cache.clone(), auth.current_session());
        Self {
            store,
            auth,
            media,
            cache,
            notifications,
            session,
        }
    }
}
