//! Entry point for the registry-synchronized MCP server.
use std::process::ExitCode;

use anyhow::Error;
use clap::Parser;
use nacos_mcp_sync::{
    cli::{LaunchProfile, LaunchProfileArgs},
    lib::telemetry,
    server::{
        config::ServerConfig,
        runtime::{self, RuntimeExit},
    },
};

#[tokio::main]
async fn main() -> ExitCode {
    match bootstrap().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(exit) => exit.report(),
    }
}

async fn bootstrap() -> Result<(), RuntimeExit> {
    telemetry::init_tracing().map_err(RuntimeExit::from_error)?;
    let profile = LaunchProfileArgs::parse()
        .build()
        .map_err(RuntimeExit::from_error)?;
    run_server(profile).await
}

async fn run_server(profile: LaunchProfile) -> Result<(), RuntimeExit> {
    let mut config = ServerConfig::load_from_path(profile.config_path.clone())
        .map_err(|err| RuntimeExit::from_error(Error::new(err)))?;
    config.apply_overrides(profile.server_addr.clone(), profile.port);
    runtime::run_server(profile, config).await
}
