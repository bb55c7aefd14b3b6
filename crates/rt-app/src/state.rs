//! Observable screen state and the background watch task shared by the
//! subscription-driven screens.

use rt_core::error::{AppError, Result};
use std::future::Future;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// A value a front end can read now or subscribe to. Writes never fail,
/// even with nobody listening; subscribers only see the latest value.
#[derive(Debug)]
pub struct Observable<T> {
    tx: watch::Sender<T>,
}

impl<T> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.tx.borrow().clone()
    }

    /// Reads the current value in place.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Loading flag and last error of one screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenStatus {
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Observable<ScreenStatus> {
    /// An operation began: loading, previous error cleared.
    pub fn begin(&self) {
        self.set(ScreenStatus {
            is_loading: true,
            error: None,
        });
    }

    pub fn succeed(&self) {
        self.update(|s| s.is_loading = false);
    }

    pub fn fail(&self, error: &AppError) {
        self.set(ScreenStatus {
            is_loading: false,
            error: Some(error.to_string()),
        });
    }

    /// Records the outcome of `result` and hands it back unchanged.
    pub fn settle<T>(&self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.succeed(),
            Err(e) => self.fail(e),
        }
        result
    }
}

/// Holds at most one running subscription task. Stopping or dropping it
/// aborts the task, which drops the store subscription it owns.
#[derive(Debug, Default)]
pub(crate) struct WatchTask {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WatchTask {
    /// Starts the task via `open` unless one is already running.
    pub(crate) async fn ensure<F, Fut>(&self, open: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<JoinHandle<()>>>,
    {
        let mut handle = self.handle.lock().await;
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return Ok(());
        }
        *handle = Some(open().await?);
        Ok(())
    }

    /// Aborts the task and waits until it is gone.
    pub(crate) async fn stop(&self) {
        if let Some(task) = self.handle.lock().await.take() {
            task.abort();
            let _ = task.await;
        }
    }

    pub(crate) async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for WatchTask {
    fn drop(&mut self) {
        if let Some(task) = self.handle.get_mut().take() {
            task.abort();
        }
    }
}
