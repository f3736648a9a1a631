//! Telemetry initialization and registration span helpers.

use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, info_span, warn, Span};
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize `tracing` and format developer logs.
///
/// Logs go to stderr so that stdout stays reserved for the stdio transport.
pub fn init_tracing() -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialize tracing: {err}"))
}

/// Span covering one background registration of a server with the registry.
pub struct RegistrationSpan {
    span: Span,
    started_at: Instant,
    server_name: String,
}

impl RegistrationSpan {
    pub fn start(server_name: &str, protocol: &'static str) -> Self {
        let span = info_span!(
            target: "nacos_mcp::sync",
            "registry_registration",
            server = server_name,
            protocol
        );
        Self {
            span,
            started_at: Instant::now(),
            server_name: server_name.to_string(),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Close the span. `catalog_synced` and `descriptor_published` report each phase.
    pub fn finish(self, catalog_synced: bool, descriptor_published: bool) {
        let elapsed_ms = self.started_at.elapsed().as_millis();
        let _entered = self.span.enter();
        if catalog_synced && descriptor_published {
            info!(
                target: "nacos_mcp::sync",
                server = %self.server_name,
                elapsed_ms = elapsed_ms,
                "Completed registry registration"
            );
        } else {
            warn!(
                target: "nacos_mcp::sync",
                server = %self.server_name,
                catalog_synced,
                descriptor_published,
                elapsed_ms = elapsed_ms,
                "Registry registration finished degraded; serving local catalog"
            );
        }
    }
}

/// Payload for logging MCP runtime state as structured telemetry.
#[derive(Debug, Serialize)]
pub struct RuntimeModeTelemetry<'a> {
    pub transport: &'a str,
    pub host: Option<&'a str>,
    pub port: Option<u16>,
    pub config_path: &'a str,
    pub registry: Option<&'a str>,
    pub instructions: &'a str,
    pub launch_args: &'a [String],
}

/// Emit runtime mode to `tracing`.
pub fn emit_runtime_mode(telemetry: &RuntimeModeTelemetry<'_>) {
    info!(
        target: "nacos_mcp::runtime",
        transport = telemetry.transport,
        host = telemetry.host.unwrap_or(""),
        port = telemetry.port.unwrap_or_default(),
        config_path = telemetry.config_path,
        registry = telemetry.registry.unwrap_or("disabled"),
        instructions = telemetry.instructions,
        launch_args = ?telemetry.launch_args,
        "Started MCP server"
    );
}
