use crate::{cli::LaunchProfile, server::config::ServerConfig};

/// Build the `ServerInfo.instructions` string shown to MCP clients.
///
/// Configured instructions win; otherwise describe where the server is running.
pub fn build_instructions(profile: &LaunchProfile, config: &ServerConfig) -> String {
    if let Some(instructions) = config
        .server
        .instructions
        .as_deref()
        .filter(|value| !value.trim().is_empty())
    {
        return instructions.to_string();
    }

    let registry = match config.active_registry() {
        Some(registry) => format!("syncing tools with {}", registry.server_addr),
        None => "registry sync disabled".to_string(),
    };
    format!(
        "{name} {version}: loaded config {path}; waiting in {transport} mode (host={host}, port={port}); {registry}.",
        name = config.server.name,
        version = config.server.version,
        path = config.source_path.display(),
        transport = profile.transport.as_str(),
        host = config.server.host,
        port = config.server.port,
    )
}
