//! Nacos backend over the v1 Open API.
//!
//! Config documents use `/nacos/v1/cs/configs`. Watching is done by polling
//! the document and comparing a SHA-256 fingerprint of its content, so a
//! listener only fires when the stored content actually changes. Instance
//! registration uses `/nacos/v1/ns/instance` and keeps the ephemeral instance
//! alive with periodic client beats.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use serde_json::json;
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    ConfigListener, ConfigStore, NamingDirectory, RegistryResult, ServiceInstance, WatchHandle,
};
use crate::{lib::errors::RegistryError, server::config::RegistrySection};

const CONFIG_PATH: &str = "/nacos/v1/cs/configs";
const INSTANCE_PATH: &str = "/nacos/v1/ns/instance";
const BEAT_PATH: &str = "/nacos/v1/ns/instance/beat";
const DEFAULT_CLUSTER: &str = "DEFAULT";
/// Beat response code telling the client the instance is unknown to the server.
const RESOURCE_NOT_FOUND: i64 = 20404;

/// Shared HTTP client honoring the configured request timeout.
pub fn build_http_client(section: &RegistrySection) -> RegistryResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(section.request_timeout_secs))
        .build()
        .map_err(|err| RegistryError::unavailable("build_http_client", err))
}

/// Normalize `host:port` or a full URL into a base URL without trailing slash.
pub fn base_url(server_addr: &str) -> String {
    let trimmed = server_addr.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Fingerprint the watch starts from, and whether `current` is a write the
/// caller has not seen yet.
fn seed_fingerprint(baseline: Option<&str>, current: Option<&str>) -> (Option<String>, bool) {
    let Some(current) = current.map(fingerprint) else {
        return (baseline.map(fingerprint), false);
    };
    match baseline.map(fingerprint) {
        Some(seen) if seen != current => (Some(current), true),
        _ => (Some(current), false),
    }
}

fn status_error(operation: &'static str, status: StatusCode, body: &str) -> RegistryError {
    if status.is_server_error() {
        RegistryError::unavailable(operation, format!("status {status}: {body}"))
    } else {
        RegistryError::rejected(operation, Some(status.as_u16()), body.trim())
    }
}

/// Config document client bound to one config namespace (tenant).
#[derive(Clone)]
pub struct NacosConfigClient {
    http: Client,
    base_url: String,
    tenant: String,
    access_token: Option<String>,
    watch_interval: Duration,
}

impl NacosConfigClient {
    pub fn new(http: Client, section: &RegistrySection) -> Self {
        Self {
            http,
            base_url: base_url(&section.server_addr),
            tenant: section.config_namespace.clone(),
            access_token: section.access_token.clone(),
            watch_interval: Duration::from_secs(section.watch_interval_secs),
        }
    }

    fn auth_query(&self) -> Vec<(&'static str, String)> {
        self.access_token
            .iter()
            .map(|token| ("accessToken", token.clone()))
            .collect()
    }

    async fn fetch(&self, data_id: &str, group: &str) -> RegistryResult<Option<String>> {
        let url = format!("{}{CONFIG_PATH}", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("dataId", data_id),
                ("group", group),
                ("tenant", self.tenant.as_str()),
            ])
            .query(&self.auth_query())
            .send()
            .await
            .map_err(|err| RegistryError::unavailable("get_config", err))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response
            .text()
            .await
            .map_err(|err| RegistryError::unavailable("get_config", err))?;
        if !status.is_success() {
            return Err(status_error("get_config", status, &body));
        }
        Ok(Some(body))
    }
}

#[async_trait]
impl ConfigStore for NacosConfigClient {
    async fn get_config(&self, data_id: &str, group: &str) -> RegistryResult<Option<String>> {
        self.fetch(data_id, group).await
    }

    async fn publish_config(
        &self,
        data_id: &str,
        group: &str,
        content: &str,
    ) -> RegistryResult<()> {
        let url = format!("{}{CONFIG_PATH}", self.base_url);
        let response = self
            .http
            .post(&url)
            .query(&self.auth_query())
            .form(&[
                ("dataId", data_id),
                ("group", group),
                ("tenant", self.tenant.as_str()),
                ("content", content),
                ("type", "json"),
            ])
            .send()
            .await
            .map_err(|err| RegistryError::unavailable("publish_config", err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| RegistryError::unavailable("publish_config", err))?;
        if !status.is_success() {
            return Err(status_error("publish_config", status, &body));
        }
        if body.trim() != "true" {
            return Err(RegistryError::rejected(
                "publish_config",
                Some(status.as_u16()),
                body.trim(),
            ));
        }
        Ok(())
    }

    async fn watch_config(
        &self,
        data_id: &str,
        group: &str,
        baseline: Option<&str>,
        listener: ConfigListener,
    ) -> RegistryResult<WatchHandle> {
        // The first fetch doubles as a reachability check for the subscription.
        let current = self.fetch(data_id, group).await?;
        let (mut last_seen, missed) = seed_fingerprint(baseline, current.as_deref());
        if missed {
            if let Some(content) = current {
                debug!(
                    target: "nacos_mcp::registry",
                    data_id,
                    group,
                    "Config changed before the watch started"
                );
                listener(content);
            }
        }
        let client = self.clone();
        let owned_data_id = data_id.to_string();
        let owned_group = group.to_string();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(client.watch_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match client.fetch(&owned_data_id, &owned_group).await {
                    Ok(Some(content)) => {
                        let current = fingerprint(&content);
                        if last_seen.as_deref() != Some(current.as_str()) {
                            last_seen = Some(current);
                            debug!(
                                target: "nacos_mcp::registry",
                                data_id = %owned_data_id,
                                group = %owned_group,
                                "Config change observed"
                            );
                            listener(content);
                        }
                    }
                    Ok(None) => last_seen = None,
                    Err(err) => warn!(
                        target: "nacos_mcp::registry",
                        data_id = %owned_data_id,
                        kind = err.kind(),
                        error = %err,
                        "Config watch poll failed; retrying on next tick"
                    ),
                }
            }
        });

        Ok(WatchHandle::new(data_id, task))
    }
}

/// Naming client bound to one service namespace.
pub struct NacosNamingClient {
    endpoint: NamingEndpoint,
    heartbeat_interval: Duration,
    beats: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl NacosNamingClient {
    pub fn new(http: Client, section: &RegistrySection) -> Self {
        Self {
            endpoint: NamingEndpoint {
                http,
                base_url: base_url(&section.server_addr),
                namespace: section.namespace.clone(),
                access_token: section.access_token.clone(),
            },
            heartbeat_interval: Duration::from_secs(section.heartbeat_interval_secs),
            beats: Mutex::new(HashMap::new()),
        }
    }

    fn beat_key(instance: &ServiceInstance) -> String {
        format!(
            "{}#{}#{}",
            NamingEndpoint::grouped_service(instance),
            instance.ip,
            instance.port
        )
    }

    fn spawn_beat(&self, instance: ServiceInstance) -> JoinHandle<()> {
        let endpoint = self.endpoint.clone();
        let interval = self.heartbeat_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match endpoint.beat(&instance).await {
                    Ok(Some(RESOURCE_NOT_FOUND)) => {
                        info!(
                            target: "nacos_mcp::registry",
                            service = %instance.service_name,
                            "Instance unknown to Nacos; registering again"
                        );
                        if let Err(err) = endpoint.register(&instance).await {
                            warn!(
                                target: "nacos_mcp::registry",
                                service = %instance.service_name,
                                error = %err,
                                "Re-registration after beat failed"
                            );
                        }
                    }
                    Ok(_) => {}
                    Err(err) => warn!(
                        target: "nacos_mcp::registry",
                        service = %instance.service_name,
                        kind = err.kind(),
                        error = %err,
                        "Instance beat failed"
                    ),
                }
            }
        })
    }
}

#[async_trait]
impl NamingDirectory for NacosNamingClient {
    async fn register_instance(&self, instance: &ServiceInstance) -> RegistryResult<()> {
        self.endpoint.register(instance).await?;

        let handle = self.spawn_beat(instance.clone());
        if let Some(previous) = self.beats.lock().insert(Self::beat_key(instance), handle) {
            previous.abort();
        }
        Ok(())
    }
}

/// Naming requests shared by registration and the beat task.
#[derive(Clone)]
struct NamingEndpoint {
    http: Client,
    base_url: String,
    namespace: String,
    access_token: Option<String>,
}

impl NamingEndpoint {
    fn grouped_service(instance: &ServiceInstance) -> String {
        format!("{}@@{}", instance.group, instance.service_name)
    }

    async fn register(&self, instance: &ServiceInstance) -> RegistryResult<()> {
        let url = format!("{}{INSTANCE_PATH}", self.base_url);
        let ip = instance.ip.to_string();
        let port = instance.port.to_string();
        let mut params = vec![
            ("serviceName", instance.service_name.as_str()),
            ("groupName", instance.group.as_str()),
            ("namespaceId", self.namespace.as_str()),
            ("ip", ip.as_str()),
            ("port", port.as_str()),
            ("clusterName", DEFAULT_CLUSTER),
            ("ephemeral", "true"),
            ("enabled", "true"),
            ("healthy", "true"),
            ("weight", "1.0"),
        ];
        if let Some(token) = self.access_token.as_deref() {
            params.push(("accessToken", token));
        }

        let response = self
            .http
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|err| RegistryError::unavailable("register_instance", err))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| RegistryError::unavailable("register_instance", err))?;
        if !status.is_success() {
            return Err(status_error("register_instance", status, &body));
        }
        Ok(())
    }

    /// Send one beat and return the `code` field of the response, if any.
    async fn beat(&self, instance: &ServiceInstance) -> RegistryResult<Option<i64>> {
        let url = format!("{}{BEAT_PATH}", self.base_url);
        let grouped = Self::grouped_service(instance);
        let beat = json!({
            "serviceName": grouped,
            "ip": instance.ip.to_string(),
            "port": instance.port,
            "cluster": DEFAULT_CLUSTER,
            "weight": 1.0,
            "scheduled": true,
            "metadata": {},
        })
        .to_string();
        let mut params = vec![
            ("serviceName", grouped.as_str()),
            ("groupName", instance.group.as_str()),
            ("namespaceId", self.namespace.as_str()),
            ("beat", beat.as_str()),
        ];
        if let Some(token) = self.access_token.as_deref() {
            params.push(("accessToken", token));
        }

        let response = self
            .http
            .put(&url)
            .query(&params)
            .send()
            .await
            .map_err(|err| RegistryError::unavailable("instance_beat", err))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| RegistryError::unavailable("instance_beat", err))?;
        if !status.is_success() {
            return Err(status_error("instance_beat", status, &body));
        }
        let code = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| value.get("code").and_then(serde_json::Value::as_i64));
        Ok(code)
    }
}
