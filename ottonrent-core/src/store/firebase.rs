//! ottonrent-core/src/store/firebase.rs
//!
//! Realtime Database over its REST interface. Reads and writes map onto
//! `GET/PUT/PATCH/DELETE <base>/<path>.json`; subscriptions use the streaming
//! variant of `GET`, which answers with server-sent events carrying `put` and
//! `patch` deltas relative to the watched path.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client as ReqwestClient;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use ottonrent_common::Error;
use ottonrent_common::models::{StorePath, Tenant};
use ottonrent_common::traits::{RemoteStore, Snapshot, Subscription};

use super::sse::SseParser;
use super::tree;
use crate::config::TenantConfig;

/// Payload of `put` and `patch` stream events.
#[derive(Debug, Deserialize)]
struct StreamDelta {
    path: String,
    data: Value,
}

#[derive(Clone)]
pub struct FirebaseRestStore {
    tenant: Tenant,
    client: ReqwestClient,
    base_url: Url,
    secret: Option<String>,
}

impl FirebaseRestStore {
    pub fn new(tenant: Tenant, config: &TenantConfig) -> Self {
        Self {
            tenant,
            client: ReqwestClient::new(),
            base_url: config.database_url.clone(),
            secret: config.database_secret.clone(),
        }
    }

    pub fn tenant(&self) -> Tenant {
        self.tenant
    }

    fn url_for(&self, path: &StorePath) -> Result<Url, Error> {
        let relative = if path.is_root() {
            ".json".to_string()
        } else {
            format!("{}.json", path.segments().join("/"))
        };
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let p = format!("{}/", base.path());
            base.set_path(&p);
        }
        let mut url = base.join(&relative)?;
        if let Some(secret) = &self.secret {
            url.query_pairs_mut().append_pair("auth", secret);
        }
        Ok(url)
    }

    async fn write(&self, method: reqwest::Method, path: &StorePath, body: Option<&Value>) -> Result<(), Error> {
        let url = self.url_for(path)?;
        let mut req = self.client.request(method.clone(), url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await.map_err(|e| Error::write(path, e))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::write(path, format!("{method} returned {status}: {text}")));
        }
        debug!("[{}] {} {} ok", self.tenant, method, path);
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FirebaseRestStore {
    async fn fetch(&self, path: &StorePath) -> Result<Snapshot, Error> {
        let url = self.url_for(path)?;
        let value: Value = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), Error> {
        self.write(reqwest::Method::PUT, path, Some(&value)).await
    }

    async fn update(&self, path: &StorePath, patch: Value) -> Result<(), Error> {
        if patch.is_object() {
            self.write(reqwest::Method::PATCH, path, Some(&patch)).await
        } else {
            self.write(reqwest::Method::PUT, path, Some(&patch)).await
        }
    }

    async fn remove(&self, path: &StorePath) -> Result<(), Error> {
        self.write(reqwest::Method::DELETE, path, None).await
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, Error> {
        let url = self.url_for(path)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let tenant = self.tenant;
        let watched = path.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = stream_events(client, url, &tx).await {
                warn!("[{}] stream on {} ended: {}", tenant, watched, e);
                let _ = tx.send(Err(e));
            }
        });
        info!("[{}] streaming {}", self.tenant, path);

        Ok(Subscription::new(path.clone(), rx, move || handle.abort()))
    }
}

async fn stream_events(
    client: ReqwestClient,
    url: Url,
    tx: &mpsc::UnboundedSender<Result<Snapshot, Error>>,
) -> Result<(), Error> {
    let resp = client
        .get(url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|e| Error::Subscription(e.to_string()))?
        .error_for_status()
        .map_err(|e| Error::Subscription(e.to_string()))?;

    let mut body = resp.bytes_stream();
    let mut parser = SseParser::new();
    let mut cache = Value::Null;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| Error::Subscription(e.to_string()))?;
        for event in parser.feed(&chunk) {
            match event.event.as_str() {
                "put" | "patch" => {
                    let delta: StreamDelta = serde_json::from_str(&event.data)?;
                    let at = StorePath::parse(&delta.path);
                    if event.event == "put" {
                        tree::set_at(&mut cache, &at, delta.data);
                    } else {
                        tree::update_at(&mut cache, &at, delta.data);
                    }
                    let snapshot = if cache.is_null() { None } else { Some(cache.clone()) };
                    if tx.send(Ok(snapshot)).is_err() {
                        return Ok(());
                    }
                }
                "keep-alive" => {}
                "cancel" => return Err(Error::Subscription("stream cancelled by the server".into())),
                "auth_revoked" => return Err(Error::Auth("stream credential revoked".into())),
                other => debug!("ignoring stream event '{}'", other),
            }
        }
    }
    Err(Error::Subscription("stream closed".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(url: &str, secret: Option<&str>) -> FirebaseRestStore {
        let cfg = TenantConfig {
            database_url: Url::parse(url).unwrap(),
            database_secret: secret.map(str::to_string),
        };
        FirebaseRestStore::new(Tenant::Netflix, &cfg)
    }

    #[test]
    fn builds_json_urls() {
        let s = store("https://nf-default-rtdb.example.com", None);
        assert_eq!(
            s.url_for(&StorePath::parse("/cred1/locked")).unwrap().as_str(),
            "https://nf-default-rtdb.example.com/cred1/locked.json"
        );
        assert_eq!(
            s.url_for(&StorePath::root()).unwrap().as_str(),
            "https://nf-default-rtdb.example.com/.json"
        );
    }

    #[test]
    fn appends_auth_secret_and_keeps_base_path() {
        let s = store("https://db.example.com/tenant", Some("s3cret"));
        assert_eq!(
            s.url_for(&StorePath::parse("users")).unwrap().as_str(),
            "https://db.example.com/tenant/users.json?auth=s3cret"
        );
    }
}
