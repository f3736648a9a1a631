use std::{net::IpAddr, path::Path};

use serde::Deserialize;

use crate::lib::errors::ConfigError;

pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8848";
pub const DEFAULT_NAMESPACE: &str = "public";
pub const DEFAULT_CONFIG_NAMESPACE: &str = "nacos-default-mcp";
pub const DEFAULT_SERVICE_GROUP: &str = "DEFAULT_GROUP";
pub const DEFAULT_EXPORT_PATH: &str = "/sse";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 3;
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 5;

/// Registry implementation selected by `registry.backend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    #[default]
    Nacos,
    Memory,
}

/// Registry connection and publication settings.
#[derive(Debug, Clone)]
pub struct RegistrySection {
    pub enabled: bool,
    pub backend: RegistryBackend,
    pub server_addr: String,
    /// Namespace for service instances.
    pub namespace: String,
    /// Namespace (tenant) holding the tools and descriptor documents.
    pub config_namespace: String,
    pub service_group: String,
    pub service_ip: Option<IpAddr>,
    pub service_port: Option<u16>,
    pub service_register: bool,
    pub export_path: String,
    pub access_token: Option<String>,
    pub request_timeout_secs: u64,
    pub watch_interval_secs: u64,
    pub heartbeat_interval_secs: u64,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: RegistryBackend::default(),
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            config_namespace: DEFAULT_CONFIG_NAMESPACE.to_string(),
            service_group: DEFAULT_SERVICE_GROUP.to_string(),
            service_ip: None,
            service_port: None,
            service_register: true,
            export_path: DEFAULT_EXPORT_PATH.to_string(),
            access_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            watch_interval_secs: DEFAULT_WATCH_INTERVAL_SECS,
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawRegistrySection {
    pub enabled: Option<bool>,
    pub backend: Option<RegistryBackend>,
    pub server_addr: Option<String>,
    pub namespace: Option<String>,
    pub config_namespace: Option<String>,
    pub service_group: Option<String>,
    pub service_ip: Option<String>,
    pub service_port: Option<u16>,
    pub service_register: Option<bool>,
    pub export_path: Option<String>,
    pub access_token: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub watch_interval_secs: Option<u64>,
    pub heartbeat_interval_secs: Option<u64>,
}

/// A missing `[registry]` table disables registry synchronization.
pub fn parse_registry_section(
    raw: Option<RawRegistrySection>,
    path: &Path,
) -> Result<Option<RegistrySection>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let defaults = RegistrySection::default();

    let service_ip = raw
        .service_ip
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            value
                .trim()
                .parse::<IpAddr>()
                .map_err(|err| ConfigError::InvalidField {
                    path: path.to_path_buf(),
                    field: "registry.service_ip",
                    message: format!("`{value}` is not an IP address: {err}"),
                })
        })
        .transpose()?;

    let export_path = raw.export_path.unwrap_or(defaults.export_path);
    if !export_path.starts_with('/') {
        return Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "registry.export_path",
            message: "Export path must start with '/'".into(),
        });
    }

    let section = RegistrySection {
        enabled: raw.enabled.unwrap_or(defaults.enabled),
        backend: raw.backend.unwrap_or(defaults.backend),
        server_addr: non_empty(raw.server_addr).unwrap_or(defaults.server_addr),
        namespace: non_empty(raw.namespace).unwrap_or(defaults.namespace),
        config_namespace: non_empty(raw.config_namespace).unwrap_or(defaults.config_namespace),
        service_group: non_empty(raw.service_group).unwrap_or(defaults.service_group),
        service_ip,
        service_port: raw.service_port,
        service_register: raw.service_register.unwrap_or(defaults.service_register),
        export_path,
        access_token: non_empty(raw.access_token),
        request_timeout_secs: positive_secs(
            raw.request_timeout_secs,
            defaults.request_timeout_secs,
            "registry.request_timeout_secs",
            path,
        )?,
        watch_interval_secs: positive_secs(
            raw.watch_interval_secs,
            defaults.watch_interval_secs,
            "registry.watch_interval_secs",
            path,
        )?,
        heartbeat_interval_secs: positive_secs(
            raw.heartbeat_interval_secs,
            defaults.heartbeat_interval_secs,
            "registry.heartbeat_interval_secs",
            path,
        )?,
    };

    Ok(Some(section))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn positive_secs(
    value: Option<u64>,
    default: u64,
    field: &'static str,
    path: &Path,
) -> Result<u64, ConfigError> {
    match value {
        Some(0) => Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field,
            message: "Must be at least 1 second".into(),
        }),
        Some(secs) => Ok(secs),
        None => Ok(default),
    }
}
