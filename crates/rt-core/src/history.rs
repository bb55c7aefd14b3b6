//! Recently viewed users, as shown on an empty search.

use crate::models::User;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of remembered users.
pub const MAX_HISTORY: usize = 5;

/// Most-recent-first list of users, unique by id, capped at `MAX_HISTORY`.
///
/// Serializes as a plain JSON array so the local cache holds a readable list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchHistory {
    entries: VecDeque<User>,
}

impl SearchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `user` at the front. An entry with the same id is moved rather
    /// than duplicated; the oldest entry falls off past capacity.
    pub fn record(&mut self, user: User) {
        self.entries.retain(|u| u.id != user.id);
        self.entries.push_front(user);
        self.entries.truncate(MAX_HISTORY);
    }

    pub fn entries(&self) -> impl Iterator<Item = &User> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses the cached form. A corrupt value yields an empty history.
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str::<SearchHistory>(raw) {
            Ok(mut history) => {
                // Re-apply the invariants in case an older build wrote a longer list.
                let entries = std::mem::take(&mut history.entries);
                for user in entries.into_iter().rev() {
                    history.record(user);
                }
                history
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable search history");
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> String {
        // A list of plain structs always serializes.
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            username: format!("user_{id}"),
            email: format!("{id}@example.com"),
            profile_image_url: String::new(),
        }
    }

    fn ids(history: &SearchHistory) -> Vec<&str> {
        history.entries().map(|u| u.id.as_str()).collect()
    }

    #[test]
    fn keeps_the_five_most_recent() {
        let mut history = SearchHistory::new();
        for id in ["1", "2", "3", "4", "5", "6"] {
            history.record(user(id));
        }
        assert_eq!(ids(&history), vec!["6", "5", "4", "3", "2"]);
    }

    #[test]
    fn re_recording_moves_to_front_without_growing() {
        let mut history = SearchHistory::new();
        for id in ["1", "2", "3"] {
            history.record(user(id));
        }
        history.record(user("1"));
        assert_eq!(ids(&history), vec!["1", "3", "2"]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn json_form_is_a_plain_array() {
        let mut history = SearchHistory::new();
        history.record(user("a"));
        let raw = history.to_json();
        assert!(raw.starts_with('['));
        assert_eq!(SearchHistory::from_json(&raw), history);
    }

    #[test]
    fn oversized_cached_list_is_trimmed_on_load() {
        let users: Vec<User> = (1..=7).map(|i| user(&i.to_string())).collect();
        let raw = serde_json::to_string(&users).unwrap();
        let history = SearchHistory::from_json(&raw);
        assert_eq!(ids(&history), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn garbage_becomes_empty() {
        assert!(SearchHistory::from_json("not json").is_empty());
    }
}
