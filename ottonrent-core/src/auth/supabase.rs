// File: ottonrent-core/src/auth/supabase.rs
//
// AuthProvider over the Supabase REST surface: GoTrue for password sign-in,
// PostgREST for the `invite_tokens` table.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use ottonrent_common::Error;
use ottonrent_common::models::Tenant;
use ottonrent_common::traits::{AuthProvider, AuthSession};

use crate::config::AuthConfig;

const INVITE_TABLE: &str = "invite_tokens";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: GoTrueUser,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    app_metadata: Value,
}

pub struct SupabaseAuth {
    client: Client,
    base_url: Url,
    anon_key: String,
}

impl SupabaseAuth {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
            anon_key: config.anon_key.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    async fn check(resp: Response, what: &str) -> Result<Response, Error> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Auth(format!("{what} returned HTTP {status}: {body}")))
    }
}

/// Reads the tenant list and role the project stores in `app_metadata`. A
/// user with no tenant list may sign in to any tenant.
fn authorize(user: &GoTrueUser, tenant: Tenant) -> Result<bool, Error> {
    if let Some(tenants) = user.app_metadata.get("tenants").and_then(Value::as_array) {
        let allowed = tenants
            .iter()
            .filter_map(Value::as_str)
            .any(|t| t.parse::<Tenant>().is_ok_and(|t| t == tenant));
        if !allowed {
            return Err(Error::Auth(format!("account has no access to {tenant}")));
        }
    }
    let is_admin = matches!(
        user.app_metadata.get("role").and_then(Value::as_str),
        Some("admin") | Some("superior") | Some("inferior")
    );
    Ok(is_admin)
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn sign_in(&self, identity: &str, secret: &str, tenant: Tenant) -> Result<AuthSession, Error> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let resp = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&json!({"email": identity, "password": secret}))
            .send()
            .await
            .map_err(|e| Error::Auth(format!("sign-in request failed: {e}")))?;
        let body: TokenResponse = Self::check(resp, "sign-in")
            .await?
            .json()
            .await
            .map_err(|e| Error::Auth(format!("could not parse sign-in response: {e}")))?;

        let is_admin_tier = authorize(&body.user, tenant)?;
        debug!("supabase sign-in ok for {identity}");
        Ok(AuthSession {
            identity: body.user.email.unwrap_or_else(|| identity.to_string()),
            tenant,
            is_admin_tier,
            access_token: body.access_token,
        })
    }

    async fn sign_out(&self, session: &AuthSession) -> Result<(), Error> {
        let url = self.endpoint("auth/v1/logout")?;
        let resp = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        if let Err(e) = Self::check(resp, "sign-out").await {
            warn!("{e}");
            return Err(e);
        }
        Ok(())
    }

    async fn issue_token(&self, session: &AuthSession) -> Result<String, Error> {
        let token = Uuid::new_v4().to_string();
        let url = self.endpoint(&format!("rest/v1/{INVITE_TABLE}"))?;
        let resp = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .json(&json!({"token": token, "tenant": session.tenant.as_str(), "used": false}))
            .send()
            .await?;
        Self::check(resp, "issue invite").await?;
        Ok(token)
    }

    async fn validate_token(&self, token: &str, tenant: Tenant) -> Result<bool, Error> {
        let mut url = self.endpoint(&format!("rest/v1/{INVITE_TABLE}"))?;
        url.query_pairs_mut()
            .append_pair("select", "token")
            .append_pair("token", &format!("eq.{token}"))
            .append_pair("tenant", &format!("eq.{}", tenant.as_str()))
            .append_pair("used", "eq.false");
        let resp = self
            .client
            .get(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .send()
            .await?;
        let rows: Vec<Value> = Self::check(resp, "token lookup").await?.json().await?;
        Ok(!rows.is_empty())
    }

    async fn consume_token(&self, token: &str) -> Result<(), Error> {
        let mut url = self.endpoint(&format!("rest/v1/{INVITE_TABLE}"))?;
        url.query_pairs_mut().append_pair("token", &format!("eq.{token}"));
        let resp = self
            .client
            .patch(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&json!({"used": true, "used_at": Utc::now().to_rfc3339()}))
            .send()
            .await?;
        Self::check(resp, "token consume").await?;
        Ok(())
    }
}
