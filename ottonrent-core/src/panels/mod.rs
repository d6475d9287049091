//! src/panels/mod.rs
//!
//! A panel binds one store subtree to an optimistic mirror and an edit
//! session. Mounting spawns a pump task that keeps the mirror in step with
//! the store; every write goes through the session, lands in the mirror
//! before the store is asked, and is confirmed or rolled back once the store
//! answers.

pub mod admins;
pub mod credentials;
pub mod orders;
pub mod referrals;
pub mod slots;
pub mod transactions;
pub mod ui_config;
pub mod users;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use ottonrent_common::models::StorePath;
use ottonrent_common::traits::{Entity, RemoteStore, Snapshot};
use ottonrent_common::{Error, ValidationError};

use crate::eventbus::{DashboardEvent, EventBus};
use crate::mirror::OptimisticMirror;
use crate::notify::{Notice, Notifier};
use crate::patch::{Patch, diff};
use crate::retry::RetryPolicy;
use crate::session::{DestructiveAction, EditSession, EditState};
use crate::store::tree;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelStatus {
    Loading,
    Loaded,
    /// The subscription failed for good; the message is user facing.
    Error(String),
}

/// How the watched subtree maps onto mirror entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelLayout {
    /// Every child of the root is one entity, keyed by its name.
    Collection,
    /// The root itself is one entity, mirrored under the panel name.
    Singleton,
}

/// Shared flag that tells in-flight work whether its panel still exists.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Default for Liveness {
    fn default() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }
}

impl Liveness {
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn kill(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Tears a panel down from outside its owner, e.g. when navigation moves on
/// while a write is still awaiting the store.
#[derive(Debug, Clone)]
pub struct TeardownHandle {
    alive: Liveness,
    pump: AbortHandle,
}

impl TeardownHandle {
    pub fn teardown(&self) {
        self.alive.kill();
        self.pump.abort();
    }
}

/// A field that may only change through a confirmed destructive action,
/// never through a plain save.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldGuard {
    /// Location inside the entity; empty for the entity value itself.
    pub field: Vec<String>,
    /// Only changes to this value are guarded. `None` guards every change.
    pub towards: Option<Value>,
}

impl FieldGuard {
    /// True when going from `before` to `after` trips this guard.
    fn trips(&self, before: &Value, after: &Value) -> bool {
        let at = StorePath::root().join(&self.field);
        let old = tree::get_at(before, &at);
        let new = tree::get_at(after, &at);
        old != new && self.towards.as_ref().is_none_or(|t| new == Some(t))
    }

    fn describe(&self) -> String {
        if self.field.is_empty() {
            "value".to_string()
        } else {
            self.field.join("/")
        }
    }
}

#[derive(Clone)]
pub struct PanelOptions {
    pub name: &'static str,
    pub root: StorePath,
    pub layout: PanelLayout,
    pub retry: RetryPolicy,
    pub bus: Option<EventBus>,
    /// Collection children whose key lacks this prefix are not entities of
    /// this panel and are left alone.
    pub key_prefix: Option<&'static str>,
    pub guards: Vec<FieldGuard>,
}

impl PanelOptions {
    pub fn collection(name: &'static str, root: StorePath) -> Self {
        Self {
            name,
            root,
            layout: PanelLayout::Collection,
            retry: RetryPolicy::default(),
            bus: None,
            key_prefix: None,
            guards: Vec::new(),
        }
    }

    pub fn singleton(name: &'static str, root: StorePath) -> Self {
        Self {
            layout: PanelLayout::Singleton,
            ..Self::collection(name, root)
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_key_prefix(mut self, prefix: &'static str) -> Self {
        self.key_prefix = Some(prefix);
        self
    }

    /// Changes to `field` (towards `towards`, or any change when `None`) are
    /// refused by `save` and must go through `request_destroy`.
    pub fn with_guard(mut self, field: &[&str], towards: Option<Value>) -> Self {
        let guard = FieldGuard {
            field: field.iter().map(|f| f.to_string()).collect(),
            towards,
        };
        if !self.guards.contains(&guard) {
            self.guards.push(guard);
        }
        self
    }
}

#[derive(Clone)]
pub struct PanelReader<V: Entity> {
    mirror: Arc<Mutex<OptimisticMirror<V>>>,
}

impl<V: Entity> PanelReader<V> {
    pub fn get(&self, key: &str) -> Option<V> {
        self.mirror.lock().get(key).cloned()
    }

    pub fn entries(&self) -> BTreeMap<String, V> {
        self.mirror.lock().entries().clone()
    }

    pub fn is_unsynced(&self, key: &str) -> bool {
        self.mirror.lock().is_unsynced(key)
    }
}

pub struct Panel<V: Entity> {
    name: &'static str,
    root: StorePath,
    layout: PanelLayout,
    key_prefix: Option<&'static str>,
    guards: Vec<FieldGuard>,
    store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
    mirror: Arc<Mutex<OptimisticMirror<V>>>,
    session: EditSession<V>,
    alive: Liveness,
    pump: JoinHandle<()>,
    status: watch::Receiver<PanelStatus>,
    generation: watch::Receiver<u64>,
}

impl<V: Entity> Panel<V> {
    /// Subscribes to `options.root` and starts the pump. Must be called from
    /// within a tokio runtime.
    pub fn mount(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>, options: PanelOptions) -> Self {
        let mirror = Arc::new(Mutex::new(OptimisticMirror::new()));
        let alive = Liveness::default();
        let (status_tx, status) = watch::channel(PanelStatus::Loading);
        let (generation_tx, generation) = watch::channel(0u64);

        let pump = Pump {
            name: options.name,
            root: options.root.clone(),
            layout: options.layout,
            key_prefix: options.key_prefix,
            retry: options.retry,
            bus: options.bus,
            store: store.clone(),
            notifier: notifier.clone(),
            mirror: mirror.clone(),
            alive: alive.clone(),
            status: status_tx,
            generation: generation_tx,
        };
        debug!("mounting panel '{}' at {}", options.name, options.root);
        let pump = tokio::spawn(pump.run());

        Self {
            name: options.name,
            root: options.root,
            layout: options.layout,
            key_prefix: options.key_prefix,
            guards: options.guards,
            store,
            notifier,
            mirror,
            session: EditSession::new(),
            alive,
            pump,
            status,
            generation,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn root(&self) -> &StorePath {
        &self.root
    }

    pub fn status(&self) -> PanelStatus {
        self.status.borrow().clone()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.is_alive()
    }

    /// Resolves once the first snapshot arrived, or with the terminal error.
    pub async fn wait_until_loaded(&self) -> Result<(), Error> {
        let mut rx = self.status.clone();
        let status = rx
            .wait_for(|s| *s != PanelStatus::Loading)
            .await
            .map_err(|_| Error::Subscription(format!("panel '{}' stopped before loading", self.name)))?;
        match &*status {
            PanelStatus::Error(reason) => Err(Error::Subscription(reason.clone())),
            _ => Ok(()),
        }
    }

    /// Number of snapshots applied so far.
    pub fn snapshot_generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Waits until at least `generation` snapshots were applied.
    pub async fn wait_for_generation(&self, generation: u64) -> Result<(), Error> {
        let mut rx = self.generation.clone();
        rx.wait_for(|g| *g >= generation)
            .await
            .map(|_| ())
            .map_err(|_| Error::Subscription(format!("panel '{}' stopped", self.name)))
    }

    /// A receiver that ticks on every applied snapshot.
    pub fn generations(&self) -> watch::Receiver<u64> {
        self.generation.clone()
    }

    pub fn teardown_handle(&self) -> TeardownHandle {
        TeardownHandle {
            alive: self.alive.clone(),
            pump: self.pump.abort_handle(),
        }
    }

    /// Stops the pump and releases the subscription. Writes already sent
    /// still reach the store but no longer touch the mirror.
    pub fn teardown(&self) {
        if self.alive.is_alive() {
            debug!("tearing down panel '{}'", self.name);
        }
        self.alive.kill();
        self.pump.abort();
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    pub fn entries(&self) -> BTreeMap<String, V> {
        self.mirror.lock().entries().clone()
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.mirror.lock().get(key).cloned()
    }

    /// The single mirrored value of a singleton panel.
    pub fn value(&self) -> Option<V> {
        self.get(self.name)
    }

    pub fn is_unsynced(&self, key: &str) -> bool {
        self.mirror.lock().is_unsynced(key)
    }

    /// Read-only handle on the mirror that stays usable while a write on
    /// this panel is in flight.
    pub fn reader(&self) -> PanelReader<V> {
        PanelReader {
            mirror: self.mirror.clone(),
        }
    }

    pub fn unsynced_keys(&self) -> Vec<String> {
        self.mirror.lock().unsynced_keys()
    }

    pub fn session(&self) -> &EditState<V> {
        self.session.state()
    }

    pub fn scratch(&self) -> Option<&V> {
        self.session.scratch()
    }

    pub fn pending_confirmation(&self) -> Option<(&str, &DestructiveAction)> {
        self.session.pending_confirmation()
    }

    /// Store location of the entity mirrored under `key`.
    pub fn entity_path(&self, key: &str) -> StorePath {
        match self.layout {
            PanelLayout::Collection => self.root.child(key),
            PanelLayout::Singleton => self.root.clone(),
        }
    }

    fn key_or_name<'a>(&'a self, key: &'a str) -> &'a str {
        match self.layout {
            PanelLayout::Collection => key,
            PanelLayout::Singleton => self.name,
        }
    }

    /// The mirror key for `key`, refusing keys outside this panel's prefix.
    fn entity_key(&self, key: &str) -> Result<String, Error> {
        let key = self.key_or_name(key);
        match self.key_prefix {
            Some(prefix) if self.layout == PanelLayout::Collection && !key.starts_with(prefix) => {
                Err(Error::Validation(ValidationError::Invalid {
                    field: "key",
                    reason: format!("'{key}' is not a {} key", self.name),
                }))
            }
            _ => Ok(key.to_string()),
        }
    }

    /// Refuses to start a new entity over a stored value that did not decode.
    fn ensure_readable(&self, key: &str) -> Result<(), Error> {
        if self.mirror.lock().is_unreadable(key) {
            return Err(Error::decode(
                self.entity_path(key),
                "the stored value could not be read; refusing to overwrite it",
            ));
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Edit session
    // ---------------------------------------------------------------

    pub fn begin_edit(&mut self, key: &str) -> Result<(), Error> {
        let key = self.entity_key(key)?;
        let current = self
            .get(&key)
            .ok_or_else(|| Error::NotFound(format!("{} has no entry '{key}'", self.name)))?;
        self.session.begin_edit(&key, current)
    }

    /// Like [`Panel::begin_edit`], but starts from `default` as a new entity
    /// when nothing is stored under `key` yet.
    pub fn begin_edit_or(&mut self, key: &str, default: V) -> Result<(), Error> {
        let key = self.entity_key(key)?;
        match self.get(&key) {
            Some(current) => self.session.begin_edit(&key, current),
            None => {
                self.ensure_readable(&key)?;
                self.session.begin_create(&key, default)
            }
        }
    }

    pub fn begin_create(&mut self, key: &str, initial: V) -> Result<(), Error> {
        let key = self.entity_key(key)?;
        self.ensure_readable(&key)?;
        if self.mirror.lock().contains(&key) {
            return Err(Error::Validation(ValidationError::Invalid {
                field: "key",
                reason: format!("'{key}' already exists"),
            }));
        }
        self.session.begin_create(&key, initial)
    }

    /// Mutable access to the scratch buffer. Nothing is sent until `save`.
    pub fn edit(&mut self) -> Result<&mut V, Error> {
        self.session.scratch_mut()
    }

    /// Drops the scratch buffer. Never talks to the store.
    pub fn cancel(&mut self) -> Result<(), Error> {
        self.session.cancel().map(|_| ())
    }

    /// Sends the scratch buffer: a full `set` for a new entity, otherwise an
    /// `update` carrying only the fields that differ from what was loaded
    /// into the session.
    pub async fn save(&mut self) -> Result<(), Error> {
        let request = self.session.begin_save()?;
        let key = request.key.clone();
        let path = self.entity_path(&key);

        let write = match self.prepare_save(&request.original, &request.value) {
            Ok(write) => write,
            Err(e) => {
                self.session.finish_save(false)?;
                return Err(e);
            }
        };
        let write = match write {
            Some(write) => write,
            None => {
                debug!("{}: nothing changed in '{key}'", self.name);
                self.session.finish_save(true)?;
                return Ok(());
            }
        };

        {
            let mut mirror = self.mirror.lock();
            match &write {
                SaveWrite::Update(Value::Object(fields)) if mirror.contains(&key) => {
                    if mirror.apply_local_edit(&key, fields).is_err() {
                        mirror.apply_local_value(&key, request.value.clone());
                    }
                }
                _ => mirror.apply_local_value(&key, request.value.clone()),
            }
        }

        let result = match write {
            SaveWrite::Set(value) => self.store.set(&path, value).await,
            SaveWrite::Update(patch) => self.store.update(&path, patch).await,
        };

        if !self.alive.is_alive() {
            debug!("{}: panel gone before save of '{key}' resolved", self.name);
            return result;
        }

        match result {
            Ok(()) => {
                self.mirror.lock().confirm(&key);
                self.session.finish_save(true)?;
                info!("{}: saved '{key}'", self.name);
                self.notifier.notify(Notice::success(format!("Saved {key}"))).await;
                Ok(())
            }
            Err(e) => {
                self.mirror.lock().rollback(&key);
                self.session.finish_save(false)?;
                warn!("{}: save of '{key}' failed: {e}", self.name);
                self.notifier
                    .notify(Notice::failure(format!("Failed to save {key}: {e}")))
                    .await;
                Err(e)
            }
        }
    }

    fn prepare_save(&self, original: &Option<V>, value: &V) -> Result<Option<SaveWrite>, Error> {
        let after = serde_json::to_value(value)?;
        let Some(original) = original else {
            return Ok(Some(SaveWrite::Set(after)));
        };
        let before = serde_json::to_value(original)?;
        if let Some(guard) = self.guards.iter().find(|g| g.trips(&before, &after)) {
            return Err(ValidationError::ConfirmationRequired(guard.describe()).into());
        }
        Ok(match diff(&before, &after) {
            Patch::Unchanged => None,
            patch => patch.into_update().map(SaveWrite::Update),
        })
    }

    /// Begins a create and saves it in one go.
    pub async fn create(&mut self, key: &str, value: V) -> Result<(), Error> {
        self.begin_create(key, value)?;
        self.save_or_cancel().await
    }

    /// Loads `key` into the session, lets `change` modify the scratch buffer
    /// and saves. A rejected change never reaches the store.
    pub async fn modify<F>(&mut self, key: &str, change: F) -> Result<(), Error>
    where
        F: FnOnce(&mut V) -> Result<(), ValidationError>,
    {
        self.begin_edit(key)?;
        self.apply_and_save(change).await
    }

    /// [`Panel::modify`] starting from `default` when `key` is absent.
    pub async fn modify_or<F>(&mut self, key: &str, default: V, change: F) -> Result<(), Error>
    where
        F: FnOnce(&mut V) -> Result<(), ValidationError>,
    {
        self.begin_edit_or(key, default)?;
        self.apply_and_save(change).await
    }

    async fn apply_and_save<F>(&mut self, change: F) -> Result<(), Error>
    where
        F: FnOnce(&mut V) -> Result<(), ValidationError>,
    {
        if let Err(e) = change(self.session.scratch_mut()?) {
            self.session.cancel()?;
            return Err(e.into());
        }
        self.save_or_cancel().await
    }

    /// One-shot writes leave the session in `Viewing` whatever happens.
    async fn save_or_cancel(&mut self) -> Result<(), Error> {
        let result = self.save().await;
        if result.is_err() && matches!(self.session.state(), EditState::Editing { .. }) {
            self.session.cancel()?;
        }
        result
    }

    // ---------------------------------------------------------------
    // Destructive actions
    // ---------------------------------------------------------------

    /// Arms `action` against `key`. Nothing is sent until [`Panel::confirm`].
    pub fn request_destroy(&mut self, key: &str, action: DestructiveAction) -> Result<(), Error> {
        let key = self.entity_key(key)?;
        if !self.mirror.lock().contains(&key) {
            return Err(Error::NotFound(format!("{} has no entry '{key}'", self.name)));
        }
        self.session.request_destroy(&key, action)
    }

    pub fn decline(&mut self) -> Result<(), Error> {
        self.session.decline()
    }

    /// Executes the armed action. When the target vanished in the meantime
    /// nothing is sent and the action counts as done.
    pub async fn confirm(&mut self) -> Result<(), Error> {
        let (key, action) = self.session.confirm()?;

        let Some(write) = self.plan_destroy(&key, &action) else {
            self.session.finish_destroy()?;
            info!("{}: '{key}' already gone, nothing to {action}", self.name);
            self.notifier
                .notify(Notice::success(format!("{key}: nothing left to {action}")))
                .await;
            return Ok(());
        };

        let result = match write {
            DestroyWrite::Remove(path) => self.store.remove(&path).await,
            DestroyWrite::Set(path, value) => self.store.set(&path, value).await,
            DestroyWrite::Update(path, value) => self.store.update(&path, value).await,
        };

        if !self.alive.is_alive() {
            debug!("{}: panel gone before '{action}' on '{key}' resolved", self.name);
            return result;
        }
        self.session.finish_destroy()?;

        match result {
            Ok(()) => {
                self.mirror.lock().confirm(&key);
                info!("{}: {action} on '{key}' done", self.name);
                self.notifier
                    .notify(Notice::success(format!("{key}: {action} done")))
                    .await;
                Ok(())
            }
            Err(e) => {
                self.mirror.lock().rollback(&key);
                warn!("{}: {action} on '{key}' failed: {e}", self.name);
                self.notifier
                    .notify(Notice::failure(format!("Failed to {action} {key}: {e}")))
                    .await;
                Err(e)
            }
        }
    }

    /// Under one mirror lock: checks the target still exists, applies the
    /// change optimistically and returns the write to send. `None` means the
    /// target is gone.
    fn plan_destroy(&self, key: &str, action: &DestructiveAction) -> Option<DestroyWrite> {
        let entity_path = self.entity_path(key);
        let mut mirror = self.mirror.lock();
        let current = mirror.get(key)?;

        if let DestructiveAction::Remove = action {
            mirror.apply_local_removal(key);
            return Some(DestroyWrite::Remove(entity_path));
        }

        let mut rendered = serde_json::to_value(current).unwrap_or(Value::Null);
        let write = match action {
            DestructiveAction::Remove => DestroyWrite::Remove(entity_path),
            DestructiveAction::RemoveAt(field) => {
                let sub = StorePath::root().join(field);
                tree::get_at(&rendered, &sub)?;
                tree::remove_at(&mut rendered, &sub);
                DestroyWrite::Remove(entity_path.join(field))
            }
            DestructiveAction::SetAt { field, value } => {
                tree::set_at(&mut rendered, &StorePath::root().join(field), value.clone());
                if value.is_object() {
                    DestroyWrite::Set(entity_path.join(field), value.clone())
                } else {
                    DestroyWrite::Update(entity_path.join(field), value.clone())
                }
            }
            DestructiveAction::RemoveItem { field, item } => {
                let sub = StorePath::root().join(field);
                let items = tree::get_at(&rendered, &sub)?.as_array()?;
                if !items.contains(item) {
                    return None;
                }
                let rest: Vec<Value> = items.iter().filter(|v| *v != item).cloned().collect();
                tree::set_at(&mut rendered, &sub, Value::Array(rest.clone()));
                DestroyWrite::Update(entity_path.join(field), Value::Array(rest))
            }
        };

        match serde_json::from_value::<V>(rendered) {
            Ok(next) => mirror.apply_local_value(key, next),
            // the push will bring the real value
            Err(e) => debug!("{}: no optimistic view of {action} on '{key}': {e}", self.name),
        }
        Some(write)
    }
}

impl<V: Entity> Drop for Panel<V> {
    fn drop(&mut self) {
        self.alive.kill();
        self.pump.abort();
    }
}

enum SaveWrite {
    Set(Value),
    Update(Value),
}

enum DestroyWrite {
    Remove(StorePath),
    Set(StorePath, Value),
    Update(StorePath, Value),
}

/// One delivery split into mirror entries and the keys that were present
/// but did not decode.
#[derive(Debug)]
pub struct DecodedSnapshot<V> {
    pub entries: BTreeMap<String, V>,
    pub unreadable: Vec<String>,
}

/// Decodes one delivery into mirror entries. Children that do not decode are
/// skipped with a warning instead of failing the whole snapshot, and
/// reported in `unreadable`. Collection children outside `key_prefix` are
/// ignored.
pub fn decode_snapshot<V: Entity>(
    name: &str,
    layout: PanelLayout,
    key_prefix: Option<&str>,
    snapshot: Snapshot,
) -> DecodedSnapshot<V> {
    let mut out = DecodedSnapshot {
        entries: BTreeMap::new(),
        unreadable: Vec::new(),
    };
    let Some(value) = snapshot else {
        return out;
    };
    match layout {
        PanelLayout::Singleton => match serde_json::from_value::<V>(value) {
            Ok(v) => {
                out.entries.insert(name.to_string(), v);
            }
            Err(e) => {
                warn!("{name}: stored value is unreadable, edits are blocked until it is fixed: {e}");
                out.unreadable.push(name.to_string());
            }
        },
        PanelLayout::Collection => match value {
            Value::Object(children) => {
                for (key, raw) in children {
                    if key_prefix.is_some_and(|p| !key.starts_with(p)) {
                        continue;
                    }
                    match serde_json::from_value::<V>(raw) {
                        Ok(v) => {
                            out.entries.insert(key, v);
                        }
                        Err(e) => {
                            warn!("{name}: skipping '{key}': {e}");
                            out.unreadable.push(key);
                        }
                    }
                }
            }
            other => warn!("{name}: expected an object of entries, got {other}"),
        },
    }
    out
}

struct Pump<V: Entity> {
    name: &'static str,
    root: StorePath,
    layout: PanelLayout,
    key_prefix: Option<&'static str>,
    retry: RetryPolicy,
    bus: Option<EventBus>,
    store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
    mirror: Arc<Mutex<OptimisticMirror<V>>>,
    alive: Liveness,
    status: watch::Sender<PanelStatus>,
    generation: watch::Sender<u64>,
}

impl<V: Entity> Pump<V> {
    async fn run(self) {
        let mut failures = 0u32;
        loop {
            if !self.alive.is_alive() {
                return;
            }
            let failure = match self.store.subscribe(&self.root).await {
                Ok(mut subscription) => loop {
                    match subscription.next().await {
                        Some(Ok(snapshot)) => {
                            if !self.alive.is_alive() {
                                return;
                            }
                            failures = 0;
                            let decoded = decode_snapshot::<V>(self.name, self.layout, self.key_prefix, snapshot);
                            {
                                let mut mirror = self.mirror.lock();
                                mirror.apply_remote_snapshot(decoded.entries);
                                mirror.mark_unreadable(decoded.unreadable);
                            }
                            self.generation.send_modify(|g| *g += 1);
                            self.set_status(PanelStatus::Loaded).await;
                        }
                        Some(Err(e)) => break e,
                        None => break Error::Subscription(format!("{} stream closed", self.root)),
                    }
                },
                Err(e) => e,
            };
            if !self.alive.is_alive() {
                return;
            }

            failures += 1;
            match self.retry.delay_after(failures) {
                Some(delay) => {
                    warn!(
                        "{}: subscription failed (attempt {failures}/{}): {failure}; retrying in {:?}",
                        self.name, self.retry.max_attempts, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    error!("{}: giving up on subscription after {failures} attempts: {failure}", self.name);
                    let reason = format!("Could not load {}: {failure}", self.name);
                    self.notifier.notify(Notice::failure(reason.clone())).await;
                    self.set_status(PanelStatus::Error(reason)).await;
                    return;
                }
            }
        }
    }

    async fn set_status(&self, next: PanelStatus) {
        let changed = self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
        if let (true, Some(bus)) = (changed, &self.bus) {
            bus.publish(DashboardEvent::PanelStatusChanged {
                panel: self.name,
                status: next,
            })
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ottonrent_common::models::Credential;
    use serde_json::json;

    #[test]
    fn collection_snapshot_skips_bad_children() {
        let snapshot = Some(json!({
            "cred1": {"slot_ref": "s", "email": "e", "secret": "p", "locked": 0, "max_usage": 2, "usage_count": 0},
            "junk": 42
        }));
        let out = decode_snapshot::<Credential>("credentials", PanelLayout::Collection, None, snapshot);
        assert_eq!(out.entries.len(), 1);
        assert!(out.entries.contains_key("cred1"));
        assert_eq!(out.unreadable, vec!["junk".to_string()]);
    }

    #[test]
    fn key_prefix_ignores_foreign_children() {
        let snapshot = Some(json!({
            "cred1": {"slot_ref": "s", "email": "e", "secret": "p", "locked": 0, "max_usage": 2, "usage_count": 0},
            "users": {"u1": true},
            "admin_config": {"superior_admins": [1]}
        }));
        let out = decode_snapshot::<Credential>("credentials", PanelLayout::Collection, Some("cred"), snapshot);
        assert_eq!(out.entries.keys().collect::<Vec<_>>(), vec!["cred1"]);
        assert!(out.unreadable.is_empty());
    }

    #[test]
    fn unreadable_singleton_is_reported() {
        let out = decode_snapshot::<bool>("flag", PanelLayout::Singleton, None, Some(json!({"not": "a bool"})));
        assert!(out.entries.is_empty());
        assert_eq!(out.unreadable, vec!["flag".to_string()]);
    }

    #[test]
    fn guards_trip_only_on_the_guarded_change() {
        let lock = FieldGuard { field: vec!["locked".into()], towards: None };
        assert!(lock.trips(&json!({"locked": 0, "n": 1}), &json!({"locked": 1, "n": 1})));
        assert!(!lock.trips(&json!({"locked": 0, "n": 1}), &json!({"locked": 0, "n": 2})));

        let deactivate = FieldGuard { field: vec![], towards: Some(json!(false)) };
        assert!(deactivate.trips(&json!(true), &json!(false)));
        assert!(!deactivate.trips(&json!(false), &json!(true)));
    }

    #[test]
    fn empty_snapshot_is_an_empty_mirror() {
        let out = decode_snapshot::<bool>("users", PanelLayout::Collection, None, None);
        assert!(out.entries.is_empty());
        assert!(out.unreadable.is_empty());
    }

    #[tokio::test]
    async fn failed_create_notifies_once() {
        use crate::notify::MockNotifier;
        use crate::test_utils::RecordingStore;

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|n: &Notice| n.is_failure())
            .times(1)
            .return_const(());

        let store = RecordingStore::new();
        let mut panel: Panel<bool> = Panel::mount(
            Arc::new(store.clone()),
            Arc::new(notifier),
            PanelOptions::collection("users", StorePath::parse("users")),
        );
        panel.wait_until_loaded().await.unwrap();

        store.fail_next_writes(1);
        assert!(panel.create("u9", true).await.is_err());
        assert!(panel.get("u9").is_none());
    }

    #[test]
    fn liveness_is_shared() {
        let alive = Liveness::default();
        let other = alive.clone();
        other.kill();
        assert!(!alive.is_alive());
    }
}
