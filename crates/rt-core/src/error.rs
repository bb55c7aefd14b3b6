//! # AppError
//!
//! Centralized error handling for the rusty-threads client.
//! Every port and view-model reports failures through this one type.

use thiserror::Error;

/// The primary error type for all rt-core operations.
///
/// `Clone` because errors also travel through watch channels
/// (a cancelled subscription is delivered to every observer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// No signed-in session exists.
    #[error("user not logged in")]
    NotAuthenticated,

    /// The media service rejected or failed the upload.
    #[error("image upload failed: {0}")]
    UploadFailed(String),

    /// A point write to the remote store did not complete.
    #[error("store write failed: {0}")]
    StoreWriteFailed(String),

    /// A point read or subscription was cancelled by the store.
    #[error("store read cancelled: {0}")]
    StoreReadCancelled(String),

    /// Local input validation (nothing was sent anywhere).
    #[error("{0}")]
    Validation(String),

    /// The auth provider refused the credentials or the identity.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Resource not found (e.g., a user document)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Infrastructure failure that fits no other variant.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for rusty-threads logic.
pub type Result<T> = std::result::Result<T, AppError>;
