//! Server descriptor document and service instance registration.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    lib::errors::RegistryError,
    registry::{self, RegistryClient, ServiceInstance, SERVER_GROUP},
};

/// Transport family advertised in the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerProtocol {
    Local,
    Networked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRef {
    pub namespace_id: String,
    pub service_name: String,
    pub group_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteServerConfig {
    pub service_ref: ServiceRef,
    pub export_path: String,
}

/// Document published under `<name>-mcp-server.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDescriptor {
    pub protocol: ServerProtocol,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_server_config: Option<RemoteServerConfig>,
    /// Naming-convention id of the tools document; not verified to exist.
    pub tools_description_ref: String,
}

/// Identity fields copied into every descriptor.
#[derive(Debug, Clone)]
pub struct ServerIdentity {
    pub name: String,
    pub description: Option<String>,
    pub version: String,
}

/// Where a networked server can be reached.
#[derive(Debug, Clone)]
pub struct NetworkedEndpoint {
    pub namespace: String,
    pub group: String,
    pub export_path: String,
    pub ip: IpAddr,
    pub port: u16,
    /// When false the descriptor is still published but no instance is registered.
    pub register_instance: bool,
}

#[derive(Debug, Clone)]
pub enum PublishTarget {
    Local,
    Networked(NetworkedEndpoint),
}

pub struct DescriptorPublisher {
    registry: RegistryClient,
    identity: ServerIdentity,
}

impl DescriptorPublisher {
    pub fn new(registry: RegistryClient, identity: ServerIdentity) -> Self {
        Self { registry, identity }
    }

    pub fn descriptor(&self, target: &PublishTarget) -> ServerDescriptor {
        let (protocol, remote_server_config) = match target {
            PublishTarget::Local => (ServerProtocol::Local, None),
            PublishTarget::Networked(endpoint) => (
                ServerProtocol::Networked,
                Some(RemoteServerConfig {
                    service_ref: ServiceRef {
                        namespace_id: endpoint.namespace.clone(),
                        service_name: registry::service_name(&self.identity.name),
                        group_name: endpoint.group.clone(),
                    },
                    export_path: endpoint.export_path.clone(),
                }),
            ),
        };

        ServerDescriptor {
            protocol,
            name: self.identity.name.clone(),
            description: self.identity.description.clone(),
            version: self.identity.version.clone(),
            remote_server_config,
            tools_description_ref: registry::tools_data_id(&self.identity.name),
        }
    }

    /// Register the instance (networked only) and publish the descriptor.
    pub async fn publish(&self, target: &PublishTarget) -> Result<ServerDescriptor, RegistryError> {
        if let PublishTarget::Networked(endpoint) = target {
            if endpoint.register_instance {
                let instance = ServiceInstance {
                    group: endpoint.group.clone(),
                    service_name: registry::service_name(&self.identity.name),
                    ip: endpoint.ip,
                    port: endpoint.port,
                };
                self.registry.register_instance(&instance).await?;
                info!(
                    target: "nacos_mcp::sync",
                    service = %instance.service_name,
                    group = %instance.group,
                    ip = %instance.ip,
                    port = instance.port,
                    "Registered service instance"
                );
            }
        }

        let descriptor = self.descriptor(target);
        let data_id = registry::server_data_id(&self.identity.name);
        let content = serde_json::to_string_pretty(&descriptor)
            .map_err(|err| RegistryError::malformed(&data_id, err))?;
        self.registry
            .put_document(&data_id, SERVER_GROUP, &content)
            .await?;
        info!(
            target: "nacos_mcp::sync",
            data_id = %data_id,
            protocol = ?descriptor.protocol,
            "Published server descriptor"
        );
        Ok(descriptor)
    }
}
