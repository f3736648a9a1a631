use std::path::Path;

use tracing::{debug, info};

use super::{ServerConfig, CONFIG_ENV_KEY, DEFAULT_CONFIG_PATH};

/// Record where the configuration path came from.
pub fn log_env_source(path: &Path, from_env: bool) {
    let source = if from_env { CONFIG_ENV_KEY } else { "default" };
    debug!(
        target: "nacos_mcp::config",
        path = %path.display(),
        source,
        default = DEFAULT_CONFIG_PATH,
        "Resolved configuration path"
    );
}

pub fn log_loaded(config: &ServerConfig) {
    match &config.registry {
        Some(registry) => info!(
            target: "nacos_mcp::config",
            path = %config.source_path.display(),
            name = %config.server.name,
            host = %config.server.host,
            port = config.server.port,
            registry_enabled = registry.enabled,
            registry_backend = ?registry.backend,
            registry_addr = %registry.server_addr,
            service_register = registry.service_register,
            "Configuration file loaded successfully"
        ),
        None => info!(
            target: "nacos_mcp::config",
            path = %config.source_path.display(),
            name = %config.server.name,
            host = %config.server.host,
            port = config.server.port,
            "Configuration file loaded successfully; no [registry] section, sync disabled"
        ),
    }
}
