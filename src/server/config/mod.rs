//! Load and validate server configuration.
use std::{env, path::PathBuf};

use serde::Deserialize;
use tracing::{error, info};

use crate::lib::errors::ConfigError;

pub mod registry;
pub mod server;
pub mod telemetry;

pub use registry::{
    parse_registry_section, RawRegistrySection, RegistryBackend, RegistrySection,
    DEFAULT_CONFIG_NAMESPACE, DEFAULT_EXPORT_PATH, DEFAULT_NAMESPACE, DEFAULT_SERVER_ADDR,
    DEFAULT_SERVICE_GROUP,
};
pub use server::{parse_server_section, RawServerSection, ServerSection, DEFAULT_HOST, DEFAULT_PORT};

const CONFIG_ENV_KEY: &str = "MCP_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level configuration container.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub registry: Option<RegistrySection>,
    pub source_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawServerConfig {
    server: Option<RawServerSection>,
    registry: Option<RawRegistrySection>,
}

impl ServerConfig {
    /// Prefer `MCP_CONFIG_PATH` if set; otherwise read `config.toml`.
    pub fn load_from_env_or_default() -> Result<Self, ConfigError> {
        let (path, from_env) = match env::var(CONFIG_ENV_KEY) {
            Ok(value) if !value.trim().is_empty() => (PathBuf::from(value), true),
            _ => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        telemetry::log_env_source(&path, from_env);
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        info!(
            target: "nacos_mcp::config",
            path = %path.display(),
            "Starting configuration load"
        );

        let builder = config::Config::builder().add_source(config::File::from(path.clone()));
        let document = builder.build().map_err(|err| {
            let error = ConfigError::from_read_error(path.clone(), err);
            error!(
                target: "nacos_mcp::config",
                path = %path.display(),
                reason = %error,
                "Failed to read configuration file"
            );
            error
        })?;

        let raw: RawServerConfig = document.try_deserialize().map_err(|err| {
            let error = ConfigError::from_parse_error(path.clone(), err);
            error!(
                target: "nacos_mcp::config",
                path = %path.display(),
                reason = %error,
                "Failed to parse configuration file"
            );
            error
        })?;

        let config = Self::from_raw(raw, path.clone()).map_err(|err| {
            error!(
                target: "nacos_mcp::config",
                path = %path.display(),
                reason = %err,
                "Failed to validate configuration file"
            );
            err
        })?;

        telemetry::log_loaded(&config);
        Ok(config)
    }

    fn from_raw(raw: RawServerConfig, path: PathBuf) -> Result<Self, ConfigError> {
        let server = parse_server_section(raw.server, &path)?;
        let registry = parse_registry_section(raw.registry, &path)?;

        Ok(Self {
            server,
            registry,
            source_path: path,
        })
    }

    /// Registry settings when a `[registry]` table exists and is enabled.
    pub fn active_registry(&self) -> Option<&RegistrySection> {
        self.registry.as_ref().filter(|registry| registry.enabled)
    }

    /// Apply the command-line overrides for the registry address and listening port.
    pub fn apply_overrides(&mut self, server_addr: Option<String>, port: Option<u16>) {
        if let Some(port) = port {
            self.server.port = port;
        }
        if let Some(addr) = server_addr.filter(|value| !value.trim().is_empty()) {
            self.registry
                .get_or_insert_with(RegistrySection::default)
                .server_addr = addr;
        }
    }
}
