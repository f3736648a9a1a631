//! LaunchProfile and transport/config resolution.
use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};

use crate::lib::errors::UnknownTransport;

const DEFAULT_CONFIG: &str = "config.toml";
const MCP_CONFIG_ENV: &str = "MCP_CONFIG_PATH";

/// MCP transport mode.
///
/// `stdio` is advertised to the registry as a local server, `tcp` as a
/// networked one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Stdio,
    Tcp,
}

impl TransportMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Stdio => "stdio",
            TransportMode::Tcp => "tcp",
        }
    }
}

impl FromStr for TransportMode {
    type Err = UnknownTransport;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(TransportMode::Stdio),
            "tcp" => Ok(TransportMode::Tcp),
            _ => Err(UnknownTransport {
                requested: value.to_string(),
            }),
        }
    }
}

/// Resolved launch profile.
#[derive(Debug, Clone)]
pub struct LaunchProfile {
    pub config_path: PathBuf,
    pub transport: TransportMode,
    pub server_addr: Option<String>,
    pub port: Option<u16>,
    pub launch_args: Vec<String>,
}

/// Resolve config path in the order: CLI override → env var → default.
pub fn resolve_config_path(override_path: Option<PathBuf>) -> Result<PathBuf> {
    let path = override_path
        .or_else(|| env::var_os(MCP_CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    if path.is_absolute() {
        return Ok(path);
    }

    let cwd = env::current_dir().context("failed to obtain current directory")?;
    Ok(cwd.join(path))
}

/// Build launch arguments suitable for reproduction/logging.
pub fn build_launch_args(
    transport: TransportMode,
    config: &Path,
    server_addr: Option<&str>,
    port: Option<u16>,
) -> Vec<String> {
    let mut args = vec![
        format!("--transport={}", transport.as_str()),
        format!("--config={}", config.display()),
    ];
    if let Some(addr) = server_addr {
        args.push(format!("--server-addr={addr}"));
    }
    if let Some(port) = port {
        args.push(format!("--port={port}"));
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_names_parse_case_insensitively() {
        assert_eq!("stdio".parse::<TransportMode>().ok(), Some(TransportMode::Stdio));
        assert_eq!(" TCP ".parse::<TransportMode>().ok(), Some(TransportMode::Tcp));
    }

    #[test]
    fn unknown_transport_is_rejected_with_its_name() {
        let err = "sse".parse::<TransportMode>().expect_err("sse is not served");
        assert_eq!(err.requested, "sse");
        assert!(err.to_string().contains("stdio, tcp"));
    }

    #[test]
    fn launch_args_include_overrides() {
        let args = build_launch_args(
            TransportMode::Tcp,
            Path::new("/etc/mcp.toml"),
            Some("10.0.0.2:8848"),
            Some(18002),
        );
        assert_eq!(
            args,
            vec![
                "--transport=tcp",
                "--config=/etc/mcp.toml",
                "--server-addr=10.0.0.2:8848",
                "--port=18002",
            ]
        );
    }
}
