//! # Change subscriptions
//!
//! A store watch re-delivers the whole collection on every mutation.
//! Deliveries go through a `tokio::sync::watch` channel, so a slow
//! observer only ever sees the latest snapshot. Dropping the
//! `Subscription` is what releases the watch.

use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Every document of one collection at one instant, keyed by document id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionSnapshot {
    docs: BTreeMap<String, Value>,
}

impl CollectionSnapshot {
    pub fn new(docs: BTreeMap<String, Value>) -> Self {
        Self { docs }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.docs.get(id)
    }

    /// Decodes every document as `T`, paired with its key.
    ///
    /// Documents that do not match `T` are skipped with a warning; a
    /// malformed record never poisons the rest of the collection.
    pub fn decode<T: DeserializeOwned>(&self) -> Vec<(String, T)> {
        self.docs
            .iter()
            .filter_map(|(id, doc)| match serde_json::from_value::<T>(doc.clone()) {
                Ok(value) => Some((id.clone(), value)),
                Err(e) => {
                    tracing::warn!(doc_id = %id, error = %e, "skipping undecodable document");
                    None
                }
            })
            .collect()
    }
}

impl FromIterator<(String, Value)> for CollectionSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// What a watch channel carries: the latest snapshot, or the reason the
/// store cancelled the subscription.
pub type Delivery = std::result::Result<Arc<CollectionSnapshot>, AppError>;

/// Receiving half of a collection watch.
#[derive(Debug)]
pub struct Subscription {
    rx: watch::Receiver<Delivery>,
    primed: bool,
}

impl Subscription {
    pub fn new(rx: watch::Receiver<Delivery>) -> Self {
        Self { rx, primed: false }
    }

    /// Waits for the next delivery.
    ///
    /// The first call yields the snapshot that was current when the
    /// subscription was opened. Returns `None` once the store side is gone.
    pub async fn next(&mut self) -> Option<Delivery> {
        if self.primed {
            self.rx.changed().await.ok()?;
        }
        self.primed = true;
        Some(self.rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn first_delivery_is_the_current_snapshot() {
        let snapshot: CollectionSnapshot = [("a".to_string(), json!({"n": 1}))].into_iter().collect();
        let (tx, rx) = watch::channel::<Delivery>(Ok(Arc::new(snapshot.clone())));
        let mut sub = Subscription::new(rx);

        let first = sub.next().await.unwrap().unwrap();
        assert_eq!(*first, snapshot);

        tx.send_replace(Err(AppError::StoreReadCancelled("permission denied".into())));
        let second = sub.next().await.unwrap();
        assert!(matches!(second, Err(AppError::StoreReadCancelled(_))));

        drop(tx);
        assert!(sub.next().await.is_none());
    }

    #[test]
    fn decode_skips_mismatched_documents() {
        #[derive(serde::Deserialize)]
        struct Named {
            name: String,
        }

        let snapshot: CollectionSnapshot = [
            ("ok".to_string(), json!({"name": "alice"})),
            ("bad".to_string(), json!({"other": true})),
        ]
        .into_iter()
        .collect();

        let decoded = snapshot.decode::<Named>();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].0, "ok");
        assert_eq!(decoded[0].1.name, "alice");
    }
}
