// File: ottonrent-core/src/auth/session_manager.rs

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use ottonrent_common::Error;
use ottonrent_common::models::Tenant;
use ottonrent_common::traits::{AuthProvider, AuthSession, RemoteStore};

use crate::eventbus::{DashboardEvent, EventBus};
use crate::selector::ServiceSelector;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    SignedOut,
    SignedIn(AuthSession),
}

impl SessionState {
    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            SessionState::SignedIn(s) => Some(s),
            SessionState::SignedOut => None,
        }
    }

    pub fn tenant(&self) -> Option<Tenant> {
        self.session().map(|s| s.tenant)
    }
}

/// The one place that knows who is signed in. Handed to whatever needs the
/// current session instead of being reachable globally.
pub struct SessionManager {
    provider: Arc<dyn AuthProvider>,
    state: RwLock<SessionState>,
    bus: Option<EventBus>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self {
            provider,
            state: RwLock::new(SessionState::SignedOut),
            bus: None,
        }
    }

    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn current(&self) -> Option<AuthSession> {
        self.state.read().await.session().cloned()
    }

    /// SignedOut -> SignedIn. Signing in while already signed in is refused;
    /// sign out first.
    pub async fn sign_in(&self, identity: &str, secret: &str, tenant: Tenant) -> Result<AuthSession, Error> {
        if let SessionState::SignedIn(existing) = &*self.state.read().await {
            return Err(Error::Auth(format!(
                "already signed in as {} for {}",
                existing.identity, existing.tenant
            )));
        }
        let session = self.provider.sign_in(identity, secret, tenant).await?;
        if !session.is_admin_tier {
            warn!("{identity} signed in to {tenant} without admin rights");
            let _ = self.provider.sign_out(&session).await;
            return Err(Error::Auth(format!("{identity} is not an admin for {tenant}")));
        }

        *self.state.write().await = SessionState::SignedIn(session.clone());
        info!("{identity} signed in to {tenant}");
        self.publish(Some(tenant)).await;
        Ok(session)
    }

    /// SignedIn -> SignedOut. The local state is cleared even when the
    /// provider call fails.
    pub async fn sign_out(&self) -> Result<(), Error> {
        let previous = std::mem::take(&mut *self.state.write().await);
        let SessionState::SignedIn(session) = previous else {
            return Ok(());
        };
        let result = self.provider.sign_out(&session).await;
        info!("{} signed out of {}", session.identity, session.tenant);
        self.publish(None).await;
        result
    }

    /// Checks an invitation token for `tenant` and burns it when valid.
    pub async fn redeem_invitation(&self, token: &str, tenant: Tenant) -> Result<bool, Error> {
        let token = token.trim();
        if token.is_empty() || !self.provider.validate_token(token, tenant).await? {
            return Ok(false);
        }
        self.provider.consume_token(token).await?;
        info!("invitation token redeemed for {tenant}");
        Ok(true)
    }

    /// Issues an invitation for the signed-in tenant.
    pub async fn issue_invitation(&self) -> Result<String, Error> {
        let session = self
            .current()
            .await
            .ok_or_else(|| Error::Auth("not signed in".to_string()))?;
        let token = self.provider.issue_token(&session).await?;
        info!("{} issued an invitation for {}", session.identity, session.tenant);
        Ok(token)
    }

    /// The store for `tenant`, provided the current session is for it.
    pub async fn store_for(&self, selector: &ServiceSelector, tenant: Tenant) -> Result<Arc<dyn RemoteStore>, Error> {
        let state = self.state.read().await;
        let session = state
            .session()
            .ok_or_else(|| Error::Auth("not signed in".to_string()))?;
        selector.client_for_session(session, tenant)
    }

    async fn publish(&self, tenant: Option<Tenant>) {
        if let Some(bus) = &self.bus {
            bus.publish(DashboardEvent::SessionChanged { tenant }).await;
        }
    }
}
