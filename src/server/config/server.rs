use std::path::Path;

use serde::Deserialize;

use crate::lib::errors::ConfigError;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8787;

/// Server identity and socket settings.
#[derive(Debug, Clone)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Forms the registry document ids, so it is restricted to id-safe characters.
    pub name: String,
    pub version: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub instructions: Option<String>,
}

pub fn parse_server_section(
    raw: Option<RawServerSection>,
    path: &Path,
) -> Result<ServerSection, ConfigError> {
    let server_raw = raw.ok_or(ConfigError::MissingField {
        path: path.to_path_buf(),
        field: "server",
    })?;
    let host = server_raw.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server_raw.port.unwrap_or(DEFAULT_PORT);
    validate_port(port, path)?;

    let name = server_raw
        .name
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingField {
            path: path.to_path_buf(),
            field: "server.name",
        })?;
    validate_name(&name, path)?;

    let version = server_raw
        .version
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    let instructions = server_raw
        .instructions
        .filter(|value| !value.trim().is_empty());

    Ok(ServerSection {
        host,
        port,
        name,
        version,
        instructions,
    })
}

fn validate_port(port: u16, path: &Path) -> Result<(), ConfigError> {
    if (1024..=65535).contains(&port) {
        return Ok(());
    }

    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "server.port",
        message: "Use a port in the range 1024-65535".into(),
    })
}

fn validate_name(name: &str, path: &Path) -> Result<(), ConfigError> {
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
    if valid {
        return Ok(());
    }

    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "server.name",
        message: format!("`{name}` may only contain ASCII letters, digits, '-', '_', '.', ':'"),
    })
}
