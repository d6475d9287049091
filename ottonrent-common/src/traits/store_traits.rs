// File: ottonrent-common/src/traits/store_traits.rs

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::models::path::StorePath;

/// One push delivery: the full value at the watched path, or `None` when the
/// path is empty.
pub type Snapshot = Option<Value>;

/// Contract of a tenant's realtime document store.
///
/// All writes are independently atomic per call; nothing here spans several
/// calls. Implementations must surface every failure as `Err` and must not
/// touch caller-side state.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Point read. Initial load only; panels that must stay current use
    /// [`RemoteStore::subscribe`].
    async fn fetch(&self, path: &StorePath) -> Result<Snapshot, Error>;

    /// Overwrites the whole subtree at `path`.
    async fn set(&self, path: &StorePath, value: Value) -> Result<(), Error>;

    /// Object patches merge one level deep, leaving siblings alone and
    /// deleting members set to `null`. Any other patch replaces the leaf at
    /// `path`.
    async fn update(&self, path: &StorePath, patch: Value) -> Result<(), Error>;

    async fn remove(&self, path: &StorePath) -> Result<(), Error>;

    /// Registers a push listener. The first delivery is the current value;
    /// after that one delivery per mutation at or below `path`.
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, Error>;
}

type Disposer = Box<dyn FnOnce() + Send + Sync>;

/// Handle to a live push listener.
///
/// The listener is released exactly once: by [`Subscription::unsubscribe`],
/// or when the handle is dropped on any other exit path.
pub struct Subscription {
    path: StorePath,
    rx: mpsc::UnboundedReceiver<Result<Snapshot, Error>>,
    disposer: Option<Disposer>,
}

impl Subscription {
    pub fn new(
        path: StorePath,
        rx: mpsc::UnboundedReceiver<Result<Snapshot, Error>>,
        disposer: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            path,
            rx,
            disposer: Some(Box::new(disposer)),
        }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Waits for the next delivery. `None` means the store closed the channel.
    pub async fn next(&mut self) -> Option<Result<Snapshot, Error>> {
        self.rx.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(dispose) = self.disposer.take() {
            dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path)
            .field("active", &self.disposer.is_some())
            .finish()
    }
}
