//! # Domain Models
//!
//! These structs represent the documents kept in the remote store and the
//! values the view-models hand to a front end.
//! Timestamps are epoch milliseconds, matching the stored documents.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level collections of the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Users,
    Threads,
    /// Follower lists, keyed by the followed user's id.
    Followers,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Threads => "threads",
            Collection::Followers => "followers",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fresh document id: a random 128-bit (v4) UUID.
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A registered account's public profile.
///
/// Holds no password: credentials live only inside the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store key. Older documents may omit it, so it is filled from the key on read.
    #[serde(default)]
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub profile_image_url: String,
}

impl User {
    /// Returns the user with `id` set to the store key it was read from.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// A single post. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    /// Store key; filled from the key on read.
    #[serde(default)]
    pub id: String,
    /// Id of the authoring `User`.
    pub author_id: String,
    pub text: String,
    pub image_url: Option<String>,
    /// Creation time in epoch milliseconds.
    pub created_at: i64,
}

impl Thread {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.created_at).single()
    }
}

/// One row of the feed: a thread joined with its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub thread: Thread,
    pub author: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Follow,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub from_user_id: String,
    pub from_username: String,
    pub from_profile_image_url: Option<String>,
    /// Set for likes and comments.
    pub thread_id: Option<String>,
    /// Set for comments.
    pub message: Option<String>,
    pub timestamp: i64,
}

/// The follower list of one user, stored under `followers/{user_id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Followers {
    #[serde(default)]
    pub follower_ids: Vec<String>,
}

impl Followers {
    pub fn contains(&self, id: &str) -> bool {
        self.follower_ids.iter().any(|f| f == id)
    }
}

/// An authenticated session as issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
}

/// Last-known profile of the signed-in user, kept in the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedProfile {
    pub username: String,
    pub email: String,
    pub profile_image_url: String,
}

impl From<&User> for CachedProfile {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            profile_image_url: user.profile_image_url.clone(),
        }
    }
}
