//! rusty-threads/crates/rt-core/src/lib.rs
//!
//! Domain models, port definitions and the pure client logic
//! (feed join, search filter, search history) for rusty-threads.

pub mod edit;
pub mod error;
pub mod feed;
pub mod history;
pub mod models;
pub mod search;
pub mod subscription;
pub mod traits;

// Re-exporting for easier access in other crates
pub use edit::ArrayEdit;
pub use error::*;
pub use models::*;
pub use subscription::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;

    #[test]
    fn test_thread_round_trips_through_store_json() {
        let thread = Thread {
            id: uuid::Uuid::new_v4().to_string(),
            author_id: "user1".to_string(),
            text: "Hello Rust!".to_string(),
            image_url: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        let doc = serde_json::to_value(&thread).unwrap();
        assert!(doc["image_url"].is_null());
        let back: Thread = serde_json::from_value(doc).unwrap();
        assert_eq!(back, thread);
        assert!(back.created_at_utc().is_some());
    }

    #[test]
    fn test_followers_decode_from_edited_document() {
        let (doc, _) = crate::edit::ArrayEdit::Add(serde_json::json!("a"))
            .apply(None, "follower_ids")
            .unwrap();
        let followers: Followers = serde_json::from_value(doc).unwrap();
        assert!(followers.contains("a"));
        assert!(!followers.contains("b"));

        let empty: Followers = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(empty.follower_ids.is_empty());
    }
}
