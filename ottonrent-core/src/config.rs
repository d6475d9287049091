//! ottonrent-core/src/config.rs
//!
//! Runtime configuration, read from the process environment (and a `.env`
//! file when present).
//!
//! | variable                              | meaning                           |
//! |---------------------------------------|-----------------------------------|
//! | `OTTONRENT_<TENANT>_DATABASE_URL`     | realtime database base URL        |
//! | `OTTONRENT_<TENANT>_DATABASE_SECRET`  | optional database auth secret     |
//! | `OTTONRENT_SUPABASE_URL`              | auth service base URL             |
//! | `OTTONRENT_SUPABASE_ANON_KEY`         | auth service public key           |
//! | `OTTONRENT_SUBSCRIBE_MAX_ATTEMPTS`    | subscription attempts per mount   |
//! | `OTTONRENT_SUBSCRIBE_BACKOFF_MS`      | first retry delay                 |
//! | `OTTONRENT_PATH_<PANEL>`              | subtree a panel is mounted on     |
//!
//! `<TENANT>` is one of `CRUNCHYROLL`, `NETFLIX`, `PRIME`. Tenants without a
//! database URL are simply not configured. `<PANEL>` is a [`PanelPaths`]
//! field name in upper case, e.g. `OTTONRENT_PATH_CREDENTIALS=/pool`.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use ottonrent_common::Error;
use ottonrent_common::models::{StorePath, Tenant};

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantConfig {
    pub database_url: Url,
    pub database_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub base_url: Url,
    pub anon_key: String,
}

/// Where each panel's subtree lives inside a tenant's document. Credentials
/// sit directly under the tenant root as `cred1`, `cred2`, ... next to the
/// other top-level nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelPaths {
    pub credentials: StorePath,
    pub slots: StorePath,
    pub admins: StorePath,
    pub referrals: StorePath,
    pub referral_settings: StorePath,
    pub transactions: StorePath,
    pub used_order_ids: StorePath,
    pub users: StorePath,
    pub ui_config: StorePath,
}

impl Default for PanelPaths {
    fn default() -> Self {
        Self {
            credentials: StorePath::root(),
            slots: StorePath::parse("/slots"),
            admins: StorePath::parse("/admin_config"),
            referrals: StorePath::parse("/referrals"),
            referral_settings: StorePath::parse("/referral_settings"),
            transactions: StorePath::parse("/transactions"),
            used_order_ids: StorePath::parse("/used_order_ids"),
            users: StorePath::parse("/users"),
            ui_config: StorePath::parse("/ui_config"),
        }
    }
}

impl PanelPaths {
    pub const NAMES: [&'static str; 9] = [
        "credentials",
        "slots",
        "admins",
        "referrals",
        "referral_settings",
        "transactions",
        "used_order_ids",
        "users",
        "ui_config",
    ];

    pub fn get(&self, name: &str) -> Option<&StorePath> {
        match name {
            "credentials" => Some(&self.credentials),
            "slots" => Some(&self.slots),
            "admins" | "admin_config" => Some(&self.admins),
            "referrals" => Some(&self.referrals),
            "referral_settings" => Some(&self.referral_settings),
            "transactions" => Some(&self.transactions),
            "used_order_ids" => Some(&self.used_order_ids),
            "users" => Some(&self.users),
            "ui_config" => Some(&self.ui_config),
            _ => None,
        }
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut StorePath> {
        match name {
            "credentials" => Some(&mut self.credentials),
            "slots" => Some(&mut self.slots),
            "admins" => Some(&mut self.admins),
            "referrals" => Some(&mut self.referrals),
            "referral_settings" => Some(&mut self.referral_settings),
            "transactions" => Some(&mut self.transactions),
            "used_order_ids" => Some(&mut self.used_order_ids),
            "users" => Some(&mut self.users),
            "ui_config" => Some(&mut self.ui_config),
            _ => None,
        }
    }

    /// Applies `OTTONRENT_PATH_<PANEL>` overrides on top of the defaults.
    fn with_overrides<F>(mut self, lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for name in Self::NAMES {
            let key = format!("OTTONRENT_PATH_{}", name.to_ascii_uppercase());
            let Some(raw) = lookup(&key) else {
                continue;
            };
            if let Some(slot) = self.get_mut(name) {
                *slot = StorePath::parse(raw.trim());
                debug!("{name} mounted at {slot}");
            }
        }
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DashboardConfig {
    pub tenants: HashMap<Tenant, TenantConfig>,
    pub auth: Option<AuthConfig>,
    pub paths: PanelPaths,
    pub subscribe_retry: RetryPolicy,
}

impl DashboardConfig {
    /// Loads `.env` (if any) and then reads the process environment.
    pub fn from_env() -> Result<Self, Error> {
        if dotenv::dotenv().is_ok() {
            debug!("loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut tenants = HashMap::new();
        for tenant in Tenant::ALL {
            let url_key = format!("OTTONRENT_{}_DATABASE_URL", tenant.env_key());
            let Some(raw_url) = lookup(&url_key) else {
                continue;
            };
            let database_url = Url::parse(raw_url.trim())
                .map_err(|e| Error::Config(format!("{url_key}: {e}")))?;
            let database_secret = lookup(&format!("OTTONRENT_{}_DATABASE_SECRET", tenant.env_key()))
                .filter(|s| !s.trim().is_empty());
            tenants.insert(tenant, TenantConfig { database_url, database_secret });
        }
        if tenants.is_empty() {
            warn!("no tenant database configured");
        }

        let auth = match (lookup("OTTONRENT_SUPABASE_URL"), lookup("OTTONRENT_SUPABASE_ANON_KEY")) {
            (Some(url), Some(key)) => Some(AuthConfig {
                base_url: Url::parse(url.trim())
                    .map_err(|e| Error::Config(format!("OTTONRENT_SUPABASE_URL: {e}")))?,
                anon_key: key,
            }),
            (Some(_), None) => {
                return Err(Error::Config("OTTONRENT_SUPABASE_URL is set but OTTONRENT_SUPABASE_ANON_KEY is not".into()));
            }
            _ => None,
        };

        let mut subscribe_retry = RetryPolicy::default();
        if let Some(raw) = lookup("OTTONRENT_SUBSCRIBE_MAX_ATTEMPTS") {
            subscribe_retry.max_attempts = parse_number(&raw, "OTTONRENT_SUBSCRIBE_MAX_ATTEMPTS")?;
        }
        if let Some(raw) = lookup("OTTONRENT_SUBSCRIBE_BACKOFF_MS") {
            let ms: u64 = parse_number(&raw, "OTTONRENT_SUBSCRIBE_BACKOFF_MS")?;
            subscribe_retry.initial_backoff = Duration::from_millis(ms);
        }

        Ok(Self {
            tenants,
            auth,
            paths: PanelPaths::default().with_overrides(&lookup),
            subscribe_retry,
        })
    }

    pub fn tenant(&self, tenant: Tenant) -> Result<&TenantConfig, Error> {
        self.tenants
            .get(&tenant)
            .ok_or_else(|| Error::Config(format!("tenant '{tenant}' has no database configured")))
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, key: &str) -> Result<T, Error> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key}: '{raw}' is not a number")))
}
