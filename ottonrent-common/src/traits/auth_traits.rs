// File: ottonrent-common/src/traits/auth_traits.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::tenant::Tenant;

/// What a successful sign-in hands back. The tenant gates which store a
/// panel may be bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub identity: String,
    pub tenant: Tenant,
    pub is_admin_tier: bool,
    pub access_token: String,
}

/// External authentication and invitation-token service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, identity: &str, secret: &str, tenant: Tenant) -> Result<AuthSession, Error>;
    async fn sign_out(&self, session: &AuthSession) -> Result<(), Error>;

    /// True when `token` is an unused invitation for `tenant`.
    async fn validate_token(&self, token: &str, tenant: Tenant) -> Result<bool, Error>;
    async fn consume_token(&self, token: &str) -> Result<(), Error>;

    /// Creates a fresh single-use invitation for the session's tenant.
    async fn issue_token(&self, session: &AuthSession) -> Result<String, Error>;
}
