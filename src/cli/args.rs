//! CLI argument definitions and `LaunchProfile` construction.
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use super::{build_launch_args, resolve_config_path, LaunchProfile, TransportMode};

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version,
    about = "MCP server that publishes its tool catalog to a Nacos registry",
    long_about = None
)]
pub struct LaunchProfileArgs {
    /// Select stdio (default) or tcp.
    #[arg(long, default_value = "stdio")]
    pub transport: String,
    /// Path to config.toml (overrides MCP_CONFIG_PATH).
    #[arg(long = "config")]
    pub config_override: Option<PathBuf>,
    /// Registry address, overriding `registry.server_addr`.
    #[arg(long = "server-addr")]
    pub server_addr: Option<String>,
    /// Listening port, overriding `server.port`.
    #[arg(long)]
    pub port: Option<u16>,
}

impl LaunchProfileArgs {
    /// Build a `LaunchProfile` from CLI args and environment variables.
    pub fn build(self) -> Result<LaunchProfile> {
        let transport: TransportMode = self.transport.parse()?;
        let config_path = resolve_config_path(self.config_override)?;
        let launch_args = build_launch_args(
            transport,
            &config_path,
            self.server_addr.as_deref(),
            self.port,
        );

        Ok(LaunchProfile {
            config_path,
            transport,
            server_addr: self.server_addr,
            port: self.port,
            launch_args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_stdio() {
        let profile = LaunchProfileArgs::parse_from(["nacos-mcp-sync", "--config", "/tmp/c.toml"])
            .build()
            .expect("profile builds");
        assert_eq!(profile.transport, TransportMode::Stdio);
        assert_eq!(profile.config_path, PathBuf::from("/tmp/c.toml"));
        assert!(profile.server_addr.is_none());
    }

    #[test]
    fn unknown_transport_fails_build() {
        let err = LaunchProfileArgs::parse_from(["nacos-mcp-sync", "--transport", "sse"])
            .build()
            .expect_err("sse is rejected");
        assert!(err.to_string().contains("Unknown transport: sse"));
    }

    #[test]
    fn overrides_are_carried_into_profile() {
        let profile = LaunchProfileArgs::parse_from([
            "nacos-mcp-sync",
            "--transport",
            "tcp",
            "--config",
            "/tmp/c.toml",
            "--server-addr",
            "10.0.0.2:8848",
            "--port",
            "18002",
        ])
        .build()
        .expect("profile builds");
        assert_eq!(profile.transport, TransportMode::Tcp);
        assert_eq!(profile.server_addr.as_deref(), Some("10.0.0.2:8848"));
        assert_eq!(profile.port, Some(18002));
    }
}
