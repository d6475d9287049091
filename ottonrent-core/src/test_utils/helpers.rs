// File: ottonrent-core/src/test_utils/helpers.rs
//
// Doubles for the collaborator seams, shared by unit and integration tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{Notify, watch};
use uuid::Uuid;

use ottonrent_common::Error;
use ottonrent_common::models::{StorePath, Tenant};
use ottonrent_common::traits::{AuthProvider, AuthSession, RemoteStore, Snapshot, Subscription};

use crate::notify::{Notice, NoticeLevel, Notifier};
use crate::store::InMemoryStore;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Fetch(StorePath),
    Set(StorePath, Value),
    Update(StorePath, Value),
    Remove(StorePath),
    Subscribe(StorePath),
}

impl StoreCall {
    pub fn is_write(&self) -> bool {
        matches!(self, StoreCall::Set(..) | StoreCall::Update(..) | StoreCall::Remove(..))
    }
}

/// An [`InMemoryStore`] that logs every call and can be told to fail or to
/// hold writes until released.
#[derive(Clone, Default)]
pub struct RecordingStore {
    inner: InMemoryStore,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    failing_writes: Arc<AtomicUsize>,
    failing_subscribes: Arc<AtomicUsize>,
    hold: Arc<Mutex<Option<watch::Sender<bool>>>>,
    arrived: Arc<Notify>,
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: Value) -> Self {
        Self {
            inner: InMemoryStore::with_data(data),
            ..Self::default()
        }
    }

    pub fn memory(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn dump(&self) -> Value {
        self.inner.dump()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn writes(&self) -> Vec<StoreCall> {
        self.calls.lock().iter().filter(|c| c.is_write()).cloned().collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// The next `n` writes are rejected without touching the data.
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// The next `n` subscribe calls are rejected.
    pub fn fail_next_subscribes(&self, n: usize) {
        self.failing_subscribes.store(n, Ordering::SeqCst);
    }

    /// Writes are logged on arrival but wait for [`RecordingStore::release`].
    pub fn hold_writes(&self) {
        let (tx, _rx) = watch::channel(true);
        *self.hold.lock() = Some(tx);
    }

    pub fn release(&self) {
        if let Some(tx) = self.hold.lock().take() {
            tx.send_replace(false);
        }
    }

    /// Resolves once a write reached the store since the last call.
    pub async fn write_arrived(&self) {
        self.arrived.notified().await;
    }

    async fn admit(&self, call: StoreCall) -> Result<(), Error> {
        let path = match &call {
            StoreCall::Set(p, _) | StoreCall::Update(p, _) | StoreCall::Remove(p) => p.clone(),
            StoreCall::Fetch(p) | StoreCall::Subscribe(p) => p.clone(),
        };
        self.calls.lock().push(call);
        self.arrived.notify_one();

        let gate = self.hold.lock().as_ref().map(|tx| tx.subscribe());
        if let Some(mut rx) = gate {
            let _ = rx.wait_for(|held| !*held).await;
        }
        if take_one(&self.failing_writes) {
            return Err(Error::write(path, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for RecordingStore {
    async fn fetch(&self, path: &StorePath) -> Result<Snapshot, Error> {
        self.calls.lock().push(StoreCall::Fetch(path.clone()));
        self.inner.fetch(path).await
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), Error> {
        self.admit(StoreCall::Set(path.clone(), value.clone())).await?;
        self.inner.set(path, value).await
    }

    async fn update(&self, path: &StorePath, patch: Value) -> Result<(), Error> {
        self.admit(StoreCall::Update(path.clone(), patch.clone())).await?;
        self.inner.update(path, patch).await
    }

    async fn remove(&self, path: &StorePath) -> Result<(), Error> {
        self.admit(StoreCall::Remove(path.clone())).await?;
        self.inner.remove(path).await
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, Error> {
        self.calls.lock().push(StoreCall::Subscribe(path.clone()));
        if take_one(&self.failing_subscribes) {
            return Err(Error::Subscription(format!("injected failure on {path}")));
        }
        self.inner.subscribe(path).await
    }
}

/// Keeps every notice for later inspection.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn successes(&self) -> usize {
        self.count(NoticeLevel::Success)
    }

    pub fn failures(&self) -> usize {
        self.count(NoticeLevel::Failure)
    }

    fn count(&self, level: NoticeLevel) -> usize {
        self.notices.lock().iter().filter(|n| n.level == level).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

struct Account {
    secret: String,
    tenants: Vec<Tenant>,
    is_admin: bool,
}

/// In-process [`AuthProvider`] with fixed accounts and invitation tokens.
#[derive(Default)]
pub struct StaticAuthProvider {
    accounts: Mutex<HashMap<String, Account>>,
    tokens: Mutex<HashMap<String, Tenant>>,
    consumed: Mutex<HashSet<String>>,
    sign_outs: AtomicUsize,
}

impl StaticAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, identity: &str, secret: &str, tenants: &[Tenant], is_admin: bool) -> Self {
        self.accounts.lock().insert(
            identity.to_string(),
            Account {
                secret: secret.to_string(),
                tenants: tenants.to_vec(),
                is_admin,
            },
        );
        self
    }

    pub fn with_token(self, token: &str, tenant: Tenant) -> Self {
        self.tokens.lock().insert(token.to_string(), tenant);
        self
    }

    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }

    pub fn is_consumed(&self, token: &str) -> bool {
        self.consumed.lock().contains(token)
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn sign_in(&self, identity: &str, secret: &str, tenant: Tenant) -> Result<AuthSession, Error> {
        let accounts = self.accounts.lock();
        let account = accounts
            .get(identity)
            .filter(|a| a.secret == secret)
            .ok_or_else(|| Error::Auth("invalid credentials".to_string()))?;
        if !account.tenants.contains(&tenant) {
            return Err(Error::Auth(format!("account has no access to {tenant}")));
        }
        Ok(AuthSession {
            identity: identity.to_string(),
            tenant,
            is_admin_tier: account.is_admin,
            access_token: format!("token-{identity}-{tenant}"),
        })
    }

    async fn sign_out(&self, _session: &AuthSession) -> Result<(), Error> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn validate_token(&self, token: &str, tenant: Tenant) -> Result<bool, Error> {
        let known = self.tokens.lock().get(token) == Some(&tenant);
        Ok(known && !self.consumed.lock().contains(token))
    }

    async fn consume_token(&self, token: &str) -> Result<(), Error> {
        if !self.tokens.lock().contains_key(token) {
            return Err(Error::NotFound(format!("unknown token '{token}'")));
        }
        self.consumed.lock().insert(token.to_string());
        Ok(())
    }

    async fn issue_token(&self, session: &AuthSession) -> Result<String, Error> {
        let token = Uuid::new_v4().to_string();
        self.tokens.lock().insert(token.clone(), session.tenant);
        Ok(token)
    }
}
