use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Error};
use rmcp::ServiceExt;
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{error, info, warn};

use crate::{
    cli::{LaunchProfile, TransportMode},
    lib::{
        net,
        telemetry::{self, RuntimeModeTelemetry},
    },
    registry::RegistryClient,
    server::{
        config::{RegistrySection, ServerConfig},
        runtime::{build_instructions, RegistryMcpServer},
    },
    sync::{self, NetworkedEndpoint, PublishTarget, RegistrationOutcome, ServerIdentity},
};

/// Bundles a runtime error message with an exit code.
#[derive(Debug)]
pub struct RuntimeExit {
    message: String,
    exit_code: ExitCode,
}

impl RuntimeExit {
    pub fn from_error(err: impl Into<Error>) -> Self {
        let err = err.into();
        Self {
            message: format!("{err:?}"),
            exit_code: ExitCode::FAILURE,
        }
    }

    pub fn report(self) -> ExitCode {
        eprintln!("{}", self.message);
        self.exit_code
    }

    pub fn exit_code(&self) -> ExitCode {
        self.exit_code
    }
}

/// Start the MCP server and select stdio/TCP based on the launch profile.
///
/// Registry registration runs in the background; serving never waits for it.
pub async fn run_server(profile: LaunchProfile, config: ServerConfig) -> Result<(), RuntimeExit> {
    let instructions = build_instructions(&profile, &config);
    let server = RegistryMcpServer::new(config.clone(), instructions.clone());

    telemetry::emit_runtime_mode(&RuntimeModeTelemetry {
        transport: profile.transport.as_str(),
        host: Some(config.server.host.as_str()),
        port: Some(config.server.port),
        config_path: config.source_path.to_string_lossy().as_ref(),
        registry: config
            .active_registry()
            .map(|registry| registry.server_addr.as_str()),
        instructions: &instructions,
        launch_args: &profile.launch_args,
    });

    let _registration = start_registration(&server, profile.transport, &config).await;

    match profile.transport {
        TransportMode::Stdio => run_stdio(server).await,
        TransportMode::Tcp => run_tcp(server, &config).await,
    }
}

/// Spawn background registration when a registry is configured.
pub async fn start_registration(
    server: &RegistryMcpServer,
    transport: TransportMode,
    config: &ServerConfig,
) -> Option<JoinHandle<RegistrationOutcome>> {
    let Some(section) = config.active_registry() else {
        info!(
            target: "nacos_mcp::runtime",
            "No active [registry] section; serving local catalog only"
        );
        return None;
    };

    let registry = match RegistryClient::from_section(section) {
        Ok(registry) => registry,
        Err(err) => {
            error!(
                target: "nacos_mcp::runtime",
                server_addr = %section.server_addr,
                error = %err,
                "Failed to create registry client; serving local catalog only"
            );
            return None;
        }
    };

    let identity = ServerIdentity {
        name: config.server.name.clone(),
        description: config.server.instructions.clone(),
        version: config.server.version.clone(),
    };
    let target = publish_target(transport, config, section).await;

    Some(sync::spawn_registration(
        Arc::new(server.clone()),
        registry,
        identity,
        target,
    ))
}

/// Map the serving transport to the descriptor target.
pub async fn publish_target(
    transport: TransportMode,
    config: &ServerConfig,
    section: &RegistrySection,
) -> PublishTarget {
    match transport {
        TransportMode::Stdio => PublishTarget::Local,
        TransportMode::Tcp => PublishTarget::Networked(NetworkedEndpoint {
            namespace: section.namespace.clone(),
            group: section.service_group.clone(),
            export_path: section.export_path.clone(),
            ip: net::resolve_advertised_ip(section.service_ip).await,
            port: section.service_port.unwrap_or(config.server.port),
            register_instance: section.service_register,
        }),
    }
}

async fn run_stdio(server: RegistryMcpServer) -> Result<(), RuntimeExit> {
    let running = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(RuntimeExit::from_error)?;
    running.waiting().await.map_err(RuntimeExit::from_error)?;
    Ok(())
}

async fn run_tcp(server: RegistryMcpServer, config: &ServerConfig) -> Result<(), RuntimeExit> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind TCP port {addr}"))
        .map_err(RuntimeExit::from_error)?;
    info!(
        target: "nacos_mcp::runtime",
        transport = "tcp",
        bind_addr = %addr,
        "Started listening in TCP mode"
    );

    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .with_context(|| format!("failed to accept TCP connection ({addr})"))
            .map_err(RuntimeExit::from_error)?;
        info!(
            target: "nacos_mcp::runtime",
            peer = %peer,
            "Accepted connection from MCP client"
        );
        let connection = server.clone();
        tokio::spawn(async move {
            match connection.serve(stream).await {
                Ok(running) => {
                    if let Err(err) = running.waiting().await {
                        warn!(
                            target: "nacos_mcp::runtime",
                            peer = %peer,
                            error = %err,
                            "MCP session ended with an error"
                        );
                    }
                }
                Err(err) => warn!(
                    target: "nacos_mcp::runtime",
                    peer = %peer,
                    error = %err,
                    "MCP handshake failed"
                ),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::{net::IpAddr, path::PathBuf};

    use super::*;
    use crate::server::config::{RegistryBackend, ServerSection};

    fn config(registry: Option<RegistrySection>) -> ServerConfig {
        ServerConfig {
            server: ServerSection {
                host: "127.0.0.1".into(),
                port: 18002,
                name: "calc".into(),
                version: "1.0.0".into(),
                instructions: Some("Arithmetic helpers".into()),
            },
            registry,
            source_path: PathBuf::from("config.toml"),
        }
    }

    #[tokio::test]
    async fn stdio_publishes_local_descriptor() {
        let section = RegistrySection::default();
        let target = publish_target(TransportMode::Stdio, &config(None), &section).await;
        assert!(matches!(target, PublishTarget::Local));
    }

    #[tokio::test]
    async fn tcp_publishes_networked_endpoint_with_configured_ip() {
        let section = RegistrySection {
            service_ip: Some("10.0.0.5".parse::<IpAddr>().expect("ip")),
            service_register: false,
            ..RegistrySection::default()
        };

        let target = publish_target(TransportMode::Tcp, &config(None), &section).await;

        match target {
            PublishTarget::Networked(endpoint) => {
                assert_eq!(endpoint.ip, "10.0.0.5".parse::<IpAddr>().expect("ip"));
                assert_eq!(endpoint.port, 18002);
                assert_eq!(endpoint.namespace, "public");
                assert_eq!(endpoint.group, "DEFAULT_GROUP");
                assert_eq!(endpoint.export_path, "/sse");
                assert!(!endpoint.register_instance);
            }
            PublishTarget::Local => panic!("tcp must publish a networked descriptor"),
        }
    }

    #[tokio::test]
    async fn service_port_overrides_listening_port() {
        let section = RegistrySection {
            service_ip: Some("10.0.0.5".parse::<IpAddr>().expect("ip")),
            service_port: Some(28002),
            ..RegistrySection::default()
        };

        let target = publish_target(TransportMode::Tcp, &config(None), &section).await;

        match target {
            PublishTarget::Networked(endpoint) => assert_eq!(endpoint.port, 28002),
            PublishTarget::Local => panic!("tcp must publish a networked descriptor"),
        }
    }

    #[tokio::test]
    async fn registration_is_skipped_without_registry() {
        let config = config(None);
        let server = RegistryMcpServer::new(config.clone(), "test".into());
        assert!(start_registration(&server, TransportMode::Stdio, &config)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn memory_backend_registration_completes() {
        let section = RegistrySection {
            backend: RegistryBackend::Memory,
            ..RegistrySection::default()
        };
        let config = config(Some(section));
        let server = RegistryMcpServer::new(config.clone(), "test".into());

        let handle = start_registration(&server, TransportMode::Stdio, &config)
            .await
            .expect("registration spawned");

        match handle.await.expect("supervisor joins") {
            RegistrationOutcome::Completed(report) => {
                assert!(report.is_complete());
                let descriptor = report.descriptor.expect("descriptor");
                assert_eq!(descriptor.description.as_deref(), Some("Arithmetic helpers"));
            }
            RegistrationOutcome::Panicked(reason) => panic!("Unexpected panic: {reason}"),
        }
        assert_eq!(server.listed_tools().len(), 3);
    }
}
