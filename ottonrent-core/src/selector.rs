// File: ottonrent-core/src/selector.rs
//
// Tenant -> store client. Panels never pick a backend themselves; they are
// handed whatever the selector returns for the signed-in tenant.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use ottonrent_common::Error;
use ottonrent_common::models::Tenant;
use ottonrent_common::traits::{AuthSession, RemoteStore};

use crate::config::DashboardConfig;
use crate::store::FirebaseRestStore;

type StoreFactory = Box<dyn Fn(Tenant) -> Result<Arc<dyn RemoteStore>, Error> + Send + Sync>;

pub struct ServiceSelector {
    clients: DashMap<Tenant, Arc<dyn RemoteStore>>,
    factory: Option<StoreFactory>,
}

impl ServiceSelector {
    /// Builds one Firebase client per tenant on first use, from `config`.
    pub fn firebase(config: &DashboardConfig) -> Self {
        let config = config.clone();
        Self::with_factory(move |tenant| {
            let tenant_config = config.tenant(tenant)?;
            info!("connecting {tenant} store at {}", tenant_config.database_url);
            Ok(Arc::new(FirebaseRestStore::new(tenant, tenant_config)) as Arc<dyn RemoteStore>)
        })
    }

    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(Tenant) -> Result<Arc<dyn RemoteStore>, Error> + Send + Sync + 'static,
    {
        Self {
            clients: DashMap::new(),
            factory: Some(Box::new(factory)),
        }
    }

    /// A fixed set of clients; tenants not listed are unavailable.
    pub fn with_stores<I>(stores: I) -> Self
    where
        I: IntoIterator<Item = (Tenant, Arc<dyn RemoteStore>)>,
    {
        Self {
            clients: stores.into_iter().collect(),
            factory: None,
        }
    }

    /// The client bound to `tenant`'s backend. Repeated calls return the
    /// same instance.
    pub fn client_for(&self, tenant: Tenant) -> Result<Arc<dyn RemoteStore>, Error> {
        if let Some(client) = self.clients.get(&tenant) {
            return Ok(client.clone());
        }
        let factory = self
            .factory
            .as_ref()
            .ok_or_else(|| Error::Config(format!("no store available for tenant '{tenant}'")))?;
        let client = factory(tenant)?;
        debug!("caching store client for {tenant}");
        Ok(self.clients.entry(tenant).or_insert(client).clone())
    }

    /// Like [`ServiceSelector::client_for`], but only for the tenant the
    /// session was issued for.
    pub fn client_for_session(&self, session: &AuthSession, tenant: Tenant) -> Result<Arc<dyn RemoteStore>, Error> {
        if session.tenant != tenant {
            return Err(Error::Auth(format!(
                "{} is signed in to {}, not {tenant}",
                session.identity, session.tenant
            )));
        }
        self.client_for(tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn session(tenant: Tenant) -> AuthSession {
        AuthSession {
            identity: "ops@ottonrent.io".into(),
            tenant,
            is_admin_tier: true,
            access_token: "t".into(),
        }
    }

    #[test]
    fn factory_runs_once_per_tenant() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let selector = ServiceSelector::with_factory(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(InMemoryStore::new()) as Arc<dyn RemoteStore>)
        });

        let a = selector.client_for(Tenant::Netflix).unwrap();
        let b = selector.client_for(Tenant::Netflix).unwrap();
        selector.client_for(Tenant::Prime).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn session_tenant_gates_selection() {
        let store: Arc<dyn RemoteStore> = Arc::new(InMemoryStore::new());
        let selector = ServiceSelector::with_stores([(Tenant::Crunchyroll, store)]);

        assert!(selector.client_for_session(&session(Tenant::Crunchyroll), Tenant::Crunchyroll).is_ok());
        assert!(matches!(
            selector.client_for_session(&session(Tenant::Crunchyroll), Tenant::Prime),
            Err(Error::Auth(_))
        ));
        assert!(matches!(selector.client_for(Tenant::Prime), Err(Error::Config(_))));
    }
}
