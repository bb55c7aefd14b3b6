//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.
//! With the `testing` feature, mockall generates a `MockXxx` for each.

use crate::edit::ArrayEdit;
use crate::error::{AppError, Result};
use crate::models::{Collection, Notification, Session};
use crate::subscription::Subscription;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::path::Path;

/// Document persistence contract: point reads, full-document writes and
/// whole-collection change subscriptions.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Point read. `Ok(None)` when no document exists under `id`.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>>;

    /// Point write; overwrites any existing document.
    async fn set(&self, collection: Collection, id: &str, doc: Value) -> Result<()>;

    /// Applies `edit` to the array `field` of one document as a single
    /// atomic step, creating the document if needed. Concurrent edits of the
    /// same document never overwrite each other. Returns whether the array
    /// changed.
    async fn edit_array(&self, collection: Collection, id: &str, field: &str, edit: ArrayEdit) -> Result<bool>;

    /// Opens a change subscription. The first delivery is the collection as
    /// it is now; every later mutation re-delivers the whole collection.
    async fn watch(&self, collection: Collection) -> Result<Subscription>;
}

impl<'s> dyn RemoteStore + 's {
    /// Point read decoded as `T`.
    pub async fn get_doc<T: DeserializeOwned>(&self, collection: Collection, id: &str) -> Result<Option<T>> {
        match self.get(collection, id).await? {
            Some(doc) => serde_json::from_value(doc)
                .map(Some)
                .map_err(|e| AppError::StoreReadCancelled(format!("malformed {collection}/{id}: {e}"))),
            None => Ok(None),
        }
    }

    /// Point write of any serializable document.
    pub async fn set_doc<T: Serialize + Sync>(&self, collection: Collection, id: &str, doc: &T) -> Result<()> {
        let value = serde_json::to_value(doc).map_err(|e| AppError::StoreWriteFailed(e.to_string()))?;
        self.set(collection, id, value).await
    }
}

/// Media upload contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Uploads the local file at `source` under `public_id` (e.g.
    /// `threads/{user}/{thread}`) and returns its public URL.
    ///
    /// Failures are `AppError::UploadFailed` carrying a readable reason.
    async fn upload(&self, source: &Path, public_id: &str) -> Result<String>;
}

/// Identity contract. Passwords cross this boundary only as `SecretString`
/// and are never handed back.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Creates an identity and signs it in.
    async fn sign_up(&self, email: &str, password: &SecretString) -> Result<Session>;

    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Session>;

    /// Removes an identity. Used to roll back a registration that failed
    /// after the identity was created.
    async fn delete_identity(&self, user_id: &str) -> Result<()>;

    async fn sign_out(&self) -> Result<()>;

    /// The signed-in session, if any.
    fn current_session(&self) -> Option<Session>;
}

/// Device-local key-value storage.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: String) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Source of the notifications screen's entries.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait NotificationSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Notification>>;
}
