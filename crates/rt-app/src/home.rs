//! Home screen: the live feed.

use crate::context::AppContext;
use crate::state::{Observable, ScreenStatus, WatchTask};
use rt_core::error::Result;
use rt_core::feed;
use rt_core::models::{Collection, FeedItem};
use rt_core::subscription::Subscription;
use rt_core::traits::RemoteStore;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct FeedState {
    pub status: Observable<ScreenStatus>,
    pub items: Observable<Vec<FeedItem>>,
}

pub struct HomeViewModel {
    ctx: AppContext,
    state: Arc<FeedState>,
    watch: WatchTask,
}

impl HomeViewModel {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            state: Arc::new(FeedState::default()),
            watch: WatchTask::default(),
        }
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    /// Subscribes to `threads`. Calling it again while the feed is live is
    /// a no-op, so a screen never holds two subscriptions.
    pub async fn start(&self) -> Result<()> {
        self.watch
            .ensure(|| async {
                self.state.status.begin();
                let subscription = match self.ctx.store.watch(Collection::Threads).await {
                    Ok(subscription) => subscription,
                    Err(e) => {
                        self.state.status.fail(&e);
                        return Err(e);
                    }
                };
                let store = self.ctx.store.clone();
                let state = self.state.clone();
                Ok(tokio::spawn(follow_threads(store, subscription, state)))
            })
            .await
    }

    /// Releases the subscription.
    pub async fn close(&self) {
        self.watch.stop().await;
    }

    pub async fn is_live(&self) -> bool {
        self.watch.is_running().await
    }

    /// Current feed entries written by `user_id`.
    pub fn threads_by(&self, user_id: &str) -> Vec<FeedItem> {
        self.state.items.with(|items| feed::authored_by(items, user_id))
    }
}

async fn follow_threads(store: Arc<dyn RemoteStore>, mut subscription: Subscription, state: Arc<FeedState>) {
    while let Some(delivery) = subscription.next().await {
        match delivery {
            Ok(snapshot) => {
                state.status.update(|s| s.is_loading = true);
                let outcome = feed::assemble(store.as_ref(), &snapshot).await;
                match outcome.first_error() {
                    Some(e) => state.status.fail(e),
                    None => state.status.set(ScreenStatus::default()),
                }
                tracing::debug!(threads = snapshot.len(), shown = outcome.items.len(), "feed updated");
                state.items.set(outcome.items);
            }
            Err(e) => {
                tracing::warn!(error = %e, "threads subscription cancelled");
                state.status.fail(&e);
            }
        }
    }
    tracing::debug!("threads subscription closed");
}
