//! Search screen: user lookup plus recently viewed users.

use crate::context::AppContext;
use crate::state::{Observable, ScreenStatus, WatchTask};
use rt_core::error::Result;
use rt_core::history::SearchHistory;
use rt_core::models::{Collection, User};
use rt_core::search::visible_users;
use rt_core::subscription::Subscription;
use rt_core::traits::LocalCache;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cache key of the persisted search history.
pub const HISTORY_KEY: &str = "search_history";

#[derive(Debug, Default)]
pub struct SearchState {
    pub status: Observable<ScreenStatus>,
    pub query: Observable<String>,
    pub all_users: Observable<Vec<User>>,
    pub history: Observable<SearchHistory>,
    /// What the screen lists for the current query.
    pub results: Observable<Vec<User>>,
}

impl SearchState {
    fn refresh(&self) {
        let query = self.query.get();
        let results = self
            .all_users
            .with(|all| self.history.with(|history| visible_users(all, history, &query)));
        self.results.set(results);
    }
}

pub struct SearchViewModel {
    ctx: AppContext,
    state: Arc<SearchState>,
    watch: WatchTask,
    /// Held from a history change until it is persisted, so the cache
    /// always ends up with the latest list.
    persist: Mutex<()>,
}

impl SearchViewModel {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            state: Arc::new(SearchState::default()),
            watch: WatchTask::default(),
            persist: Mutex::new(()),
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Loads the persisted history, then follows the `users` collection.
    pub async fn start(&self) -> Result<()> {
        self.watch
            .ensure(|| async {
                self.state.status.begin();
                let history = load_history(self.ctx.cache.as_ref()).await;
                self.state.history.set(history);
                self.state.refresh();

                let subscription = match self.ctx.store.watch(Collection::Users).await {
                    Ok(subscription) => subscription,
                    Err(e) => {
                        self.state.status.fail(&e);
                        return Err(e);
                    }
                };
                Ok(tokio::spawn(follow_users(subscription, self.state.clone())))
            })
            .await
    }

    pub async fn close(&self) {
        self.watch.stop().await;
    }

    pub fn on_query_changed(&self, query: &str) {
        self.state.query.set(query.to_string());
        self.state.refresh();
    }

    /// Remembers `user` as recently viewed and persists the history.
    pub async fn add_to_history(&self, user: User) -> Result<()> {
        if user.id.is_empty() {
            tracing::debug!(username = %user.username, "not recording a user without an id");
            return Ok(());
        }
        let _persist = self.persist.lock().await;
        let mut raw = String::new();
        self.state.history.update(|history| {
            history.record(user);
            raw = history.to_json();
        });
        self.state.refresh();

        let result = self.ctx.cache.put(HISTORY_KEY, raw).await;
        if let Err(e) = &result {
            self.state.status.fail(e);
        }
        result
    }
}

async fn load_history(cache: &dyn LocalCache) -> SearchHistory {
    match cache.get(HISTORY_KEY).await {
        Ok(Some(raw)) => SearchHistory::from_json(&raw),
        Ok(None) => SearchHistory::new(),
        Err(e) => {
            tracing::warn!(error = %e, "search history unavailable");
            SearchHistory::new()
        }
    }
}

async fn follow_users(mut subscription: Subscription, state: Arc<SearchState>) {
    while let Some(delivery) = subscription.next().await {
        match delivery {
            Ok(snapshot) => {
                let users: Vec<User> = snapshot
                    .decode::<User>()
                    .into_iter()
                    .map(|(id, user)| user.with_id(id))
                    .collect();
                tracing::debug!(users = users.len(), "user directory updated");
                state.all_users.set(users);
                state.refresh();
                state.status.succeed();
            }
            Err(e) => {
                tracing::warn!(error = %e, "users subscription cancelled");
                state.status.fail(&e);
            }
        }
    }
}
