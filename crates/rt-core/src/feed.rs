//! # Feed aggregation
//!
//! Joins a snapshot of the `threads` collection with the authors' `users`
//! documents. Author reads are issued concurrently and complete in any
//! order; completion is tracked per thread id, so a missing or failed
//! author only removes its own thread from the result.

use crate::error::AppError;
use crate::models::{Collection, FeedItem, Thread, User};
use crate::subscription::CollectionSnapshot;
use crate::traits::RemoteStore;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;

/// Terminal state of one thread's author lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Author(User),
    /// The author id does not reference an existing user.
    MissingAuthor,
    Failed(AppError),
}

/// Completion tracker for one snapshot's author lookups.
#[derive(Debug, Default)]
pub struct FeedBatch {
    threads: HashMap<String, Thread>,
    outcomes: HashMap<String, Resolution>,
}

impl FeedBatch {
    pub fn new(threads: impl IntoIterator<Item = Thread>) -> Self {
        Self {
            threads: threads.into_iter().map(|t| (t.id.clone(), t)).collect(),
            outcomes: HashMap::new(),
        }
    }

    /// Records the outcome for `thread_id`.
    ///
    /// Returns `false` (and changes nothing) for an id outside the batch or
    /// one that already has an outcome.
    pub fn record(&mut self, thread_id: &str, resolution: Resolution) -> bool {
        if !self.threads.contains_key(thread_id) || self.outcomes.contains_key(thread_id) {
            return false;
        }
        self.outcomes.insert(thread_id.to_string(), resolution);
        true
    }

    /// Every thread in the batch has a terminal outcome.
    pub fn is_complete(&self) -> bool {
        self.threads.keys().all(|id| self.outcomes.contains_key(id))
    }

    pub fn pending(&self) -> usize {
        self.threads.len() - self.outcomes.len()
    }

    /// Builds the outcome from whatever has resolved so far. Items are
    /// newest first; equal timestamps fall back to thread id.
    pub fn finish(mut self) -> FeedOutcome {
        let mut outcome = FeedOutcome::default();
        for (thread_id, resolution) in self.outcomes {
            let Some(thread) = self.threads.remove(&thread_id) else {
                continue;
            };
            match resolution {
                Resolution::Author(author) => outcome.items.push(FeedItem { thread, author }),
                Resolution::MissingAuthor => outcome.missing_authors.push(thread_id),
                Resolution::Failed(e) => outcome.failures.push((thread_id, e)),
            }
        }
        outcome.items.sort_by(|a, b| {
            b.thread
                .created_at
                .cmp(&a.thread.created_at)
                .then_with(|| a.thread.id.cmp(&b.thread.id))
        });
        outcome.missing_authors.sort();
        outcome.failures.sort_by(|a, b| a.0.cmp(&b.0));
        outcome
    }
}

/// Result of joining one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedOutcome {
    pub items: Vec<FeedItem>,
    /// Thread ids dropped because their author does not exist.
    pub missing_authors: Vec<String>,
    /// Thread ids dropped because the author read failed.
    pub failures: Vec<(String, AppError)>,
}

impl FeedOutcome {
    pub fn first_error(&self) -> Option<&AppError> {
        self.failures.first().map(|(_, e)| e)
    }
}

/// Decodes the threads in `snapshot`, taking each document's key as its id.
pub fn threads_in(snapshot: &CollectionSnapshot) -> Vec<Thread> {
    snapshot
        .decode::<Thread>()
        .into_iter()
        .map(|(id, mut thread)| {
            thread.id = id;
            thread
        })
        .collect()
}

/// Resolves the author of every thread in `snapshot`, one point read per
/// thread, and returns the joined feed.
pub async fn assemble(store: &dyn RemoteStore, snapshot: &CollectionSnapshot) -> FeedOutcome {
    let threads = threads_in(snapshot);
    let lookups: Vec<(String, String)> = threads
        .iter()
        .map(|t| (t.id.clone(), t.author_id.clone()))
        .collect();
    let mut batch = FeedBatch::new(threads);

    let mut in_flight: FuturesUnordered<_> = lookups
        .into_iter()
        .map(|(thread_id, author_id)| async move {
            let result = store.get_doc::<User>(Collection::Users, &author_id).await;
            (thread_id, author_id, result)
        })
        .collect();

    while let Some((thread_id, author_id, result)) = in_flight.next().await {
        let resolution = match result {
            Ok(Some(user)) => Resolution::Author(user.with_id(author_id)),
            Ok(None) => {
                tracing::warn!(%thread_id, %author_id, "thread author not found, dropping from feed");
                Resolution::MissingAuthor
            }
            Err(e) => {
                tracing::warn!(%thread_id, %author_id, error = %e, "author lookup failed");
                Resolution::Failed(e)
            }
        };
        batch.record(&thread_id, resolution);
    }

    debug_assert!(batch.is_complete());
    let outcome = batch.finish();
    tracing::debug!(
        items = outcome.items.len(),
        dropped = outcome.missing_authors.len() + outcome.failures.len(),
        "feed batch assembled"
    );
    outcome
}

/// The feed entries written by `user_id`, in feed order.
pub fn authored_by(items: &[FeedItem], user_id: &str) -> Vec<FeedItem> {
    items
        .iter()
        .filter(|item| item.thread.author_id == user_id)
        .cloned()
        .collect()
}
