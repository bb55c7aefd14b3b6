//! User search over an in-memory copy of the `users` collection.

use crate::history::SearchHistory;
use crate::models::User;
use std::collections::HashSet;

/// Computes the list shown for `query`.
///
/// An empty (or all-whitespace) query shows the history alone. Otherwise
/// history entries come first, then every user whose username contains the
/// query case-insensitively, keeping only the first entry per user id.
pub fn visible_users(all_users: &[User], history: &SearchHistory, query: &str) -> Vec<User> {
    let query = query.trim();
    if query.is_empty() {
        return history.entries().cloned().collect();
    }

    let needle = query.to_lowercase();
    let matches = all_users
        .iter()
        .filter(|u| u.username.to_lowercase().contains(&needle));

    let mut seen = HashSet::new();
    history
        .entries()
        .chain(matches)
        .filter(|u| seen.insert(u.id.clone()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, name: &str) -> User {
        User {
            id: id.to_string(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            profile_image_url: String::new(),
        }
    }

    fn names(users: &[User]) -> Vec<&str> {
        users.iter().map(|u| u.username.as_str()).collect()
    }

    #[test]
    fn substring_match_ignores_case() {
        let all = vec![user("1", "alice"), user("2", "bob"), user("3", "Albert")];
        let result = visible_users(&all, &SearchHistory::new(), "AL");
        assert_eq!(names(&result), vec!["alice", "Albert"]);
    }

    #[test]
    fn empty_query_shows_history_only() {
        let all = vec![user("1", "alice"), user("2", "bob")];
        let mut history = SearchHistory::new();
        history.record(user("2", "bob"));
        let result = visible_users(&all, &history, "   ");
        assert_eq!(names(&result), vec!["bob"]);
    }

    #[test]
    fn history_leads_and_matches_are_not_repeated() {
        let all = vec![user("1", "alice"), user("2", "bob"), user("3", "albert")];
        let mut history = SearchHistory::new();
        history.record(user("3", "albert"));
        history.record(user("2", "bob"));

        let result = visible_users(&all, &history, "al");
        assert_eq!(names(&result), vec!["bob", "albert", "alice"]);
    }
}
