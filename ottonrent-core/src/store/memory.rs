//! ottonrent-core/src/store/memory.rs
//!
//! A process-local document store with the same observable behavior as the
//! hosted realtime database: path writes, parent pruning and push listeners
//! that fire once on registration and again on every change below their path.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use ottonrent_common::Error;
use ottonrent_common::models::StorePath;
use ottonrent_common::traits::{RemoteStore, Snapshot, Subscription};

use super::tree;

struct Listener {
    id: u64,
    path: StorePath,
    tx: mpsc::UnboundedSender<Result<Snapshot, Error>>,
    last: Snapshot,
}

#[derive(Default)]
struct Inner {
    root: Value,
    listeners: Vec<Listener>,
    next_id: u64,
}

impl Inner {
    /// Pushes the new value to every listener whose view changed. Listeners
    /// whose receiver is gone are dropped.
    fn broadcast(&mut self, changed: &StorePath) {
        let root = &self.root;
        self.listeners.retain_mut(|listener| {
            if !listener.path.overlaps(changed) {
                return true;
            }
            let current = tree::get_at(root, &listener.path).cloned();
            if current == listener.last {
                return true;
            }
            listener.last = current.clone();
            listener.tx.send(Ok(current)).is_ok()
        });
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: Value) -> Self {
        let store = Self::new();
        store.inner.lock().root = tree::normalize(data);
        store
    }

    /// Copy of the whole document tree.
    pub fn dump(&self) -> Value {
        self.inner.lock().root.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Fails every live listener with `reason` and forgets them, as a dropped
    /// realtime channel would.
    pub fn disconnect_listeners(&self, reason: &str) {
        let mut inner = self.inner.lock();
        for listener in inner.listeners.drain(..) {
            let _ = listener.tx.send(Err(Error::Subscription(reason.to_string())));
        }
    }

    fn mutate(&self, path: &StorePath, op: impl FnOnce(&mut Value)) {
        let mut inner = self.inner.lock();
        op(&mut inner.root);
        inner.broadcast(path);
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn fetch(&self, path: &StorePath) -> Result<Snapshot, Error> {
        Ok(tree::get_at(&self.inner.lock().root, path).cloned())
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), Error> {
        trace!("memory set {}", path);
        self.mutate(path, |root| tree::set_at(root, path, value));
        Ok(())
    }

    async fn update(&self, path: &StorePath, patch: Value) -> Result<(), Error> {
        trace!("memory update {}", path);
        self.mutate(path, |root| tree::update_at(root, path, patch));
        Ok(())
    }

    async fn remove(&self, path: &StorePath) -> Result<(), Error> {
        trace!("memory remove {}", path);
        self.mutate(path, |root| tree::remove_at(root, path));
        Ok(())
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, Error> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            let current = tree::get_at(&inner.root, path).cloned();
            let _ = tx.send(Ok(current.clone()));
            inner.listeners.push(Listener {
                id,
                path: path.clone(),
                tx,
                last: current,
            });
            id
        };
        debug!("memory listener {} registered on {}", id, path);

        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(path.clone(), rx, move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().listeners.retain(|l| l.id != id);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn subscription_fires_immediately_then_on_change() {
        let store = InMemoryStore::with_data(json!({"users": {"u1": true}}));
        let mut sub = store.subscribe(&StorePath::parse("/users")).await.unwrap();

        let first = sub.next().await.unwrap().unwrap();
        assert_eq!(first, Some(json!({"u1": true})));

        store.set(&StorePath::parse("/users/u2"), json!(false)).await.unwrap();
        let second = sub.next().await.unwrap().unwrap();
        assert_eq!(second, Some(json!({"u1": true, "u2": false})));
    }

    #[tokio::test]
    async fn unrelated_writes_do_not_fire() {
        let store = InMemoryStore::new();
        let mut sub = store.subscribe(&StorePath::parse("/users")).await.unwrap();
        assert_eq!(sub.next().await.unwrap().unwrap(), None);

        store.set(&StorePath::parse("/slots/s1"), json!({"title": "x"})).await.unwrap();
        store.set(&StorePath::parse("/users/u1"), json!(true)).await.unwrap();
        assert_eq!(sub.next().await.unwrap().unwrap(), Some(json!({"u1": true})));
    }

    #[tokio::test]
    async fn dropping_the_subscription_releases_the_listener() {
        let store = InMemoryStore::new();
        let sub = store.subscribe(&StorePath::root()).await.unwrap();
        assert_eq!(store.listener_count(), 1);
        drop(sub);
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn disconnect_delivers_an_error() {
        let store = InMemoryStore::new();
        let mut sub = store.subscribe(&StorePath::root()).await.unwrap();
        let _ = sub.next().await;
        store.disconnect_listeners("network down");
        assert!(matches!(sub.next().await, Some(Err(Error::Subscription(_)))));
        assert_eq!(sub.next().await.map(|r| r.is_ok()), None);
    }
}
