//! Registry client facade: config documents (get/put/watch) and the service
//! instance directory (register).

pub mod memory;
pub mod nacos;

use std::{net::IpAddr, sync::Arc};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::{
    lib::errors::RegistryError,
    server::config::{RegistryBackend, RegistrySection},
};

pub use memory::InMemoryRegistry;
pub use nacos::{NacosConfigClient, NacosNamingClient};

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Group holding tool catalog documents.
pub const TOOLS_GROUP: &str = "mcp-tools";
/// Group holding server descriptor documents.
pub const SERVER_GROUP: &str = "mcp-server";
const TOOLS_SUFFIX: &str = "-mcp-tools.json";
const SERVER_SUFFIX: &str = "-mcp-server.json";
const SERVICE_SUFFIX: &str = "-mcp-service";

pub fn tools_data_id(server_name: &str) -> String {
    format!("{server_name}{TOOLS_SUFFIX}")
}

pub fn server_data_id(server_name: &str) -> String {
    format!("{server_name}{SERVER_SUFFIX}")
}

pub fn service_name(server_name: &str) -> String {
    format!("{server_name}{SERVICE_SUFFIX}")
}

/// Callback invoked with the raw content of every observed write.
pub type ConfigListener = Arc<dyn Fn(String) + Send + Sync>;

/// Handle to a running watch subscription.
///
/// Dropping the handle detaches the subscription; it keeps running for the
/// lifetime of the process.
#[derive(Debug)]
pub struct WatchHandle {
    data_id: String,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn new(data_id: impl Into<String>, task: JoinHandle<()>) -> Self {
        Self {
            data_id: data_id.into(),
            task,
        }
    }

    pub fn data_id(&self) -> &str {
        &self.data_id
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn cancel(self) {
        self.task.abort();
    }
}

/// Service endpoint recorded in the instance directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    pub group: String,
    pub service_name: String,
    pub ip: IpAddr,
    pub port: u16,
}

/// Key-value document store with change subscription.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// `Ok(None)` when the document does not exist.
    async fn get_config(&self, data_id: &str, group: &str) -> RegistryResult<Option<String>>;

    async fn publish_config(&self, data_id: &str, group: &str, content: &str)
        -> RegistryResult<()>;

    /// Subscribe to writes of one document.
    ///
    /// `baseline` is the content the caller last saw. When the stored content
    /// already differs from it at subscription time, the listener fires once
    /// immediately so a write racing the subscription is not lost.
    async fn watch_config(
        &self,
        data_id: &str,
        group: &str,
        baseline: Option<&str>,
        listener: ConfigListener,
    ) -> RegistryResult<WatchHandle>;
}

/// Service discovery directory.
#[async_trait]
pub trait NamingDirectory: Send + Sync {
    async fn register_instance(&self, instance: &ServiceInstance) -> RegistryResult<()>;
}

/// Single registry connection shared by the synchronizer and the publisher.
#[derive(Clone)]
pub struct RegistryClient {
    config: Arc<dyn ConfigStore>,
    naming: Arc<dyn NamingDirectory>,
}

impl RegistryClient {
    pub fn new(config: Arc<dyn ConfigStore>, naming: Arc<dyn NamingDirectory>) -> Self {
        Self { config, naming }
    }

    /// Build the client for the configured backend.
    pub fn from_section(section: &RegistrySection) -> RegistryResult<Self> {
        match section.backend {
            RegistryBackend::Nacos => {
                let http = nacos::build_http_client(section)?;
                let config = NacosConfigClient::new(http.clone(), section);
                let naming = NacosNamingClient::new(http, section);
                Ok(Self::new(Arc::new(config), Arc::new(naming)))
            }
            RegistryBackend::Memory => {
                let registry = Arc::new(InMemoryRegistry::new());
                Ok(Self::new(registry.clone(), registry))
            }
        }
    }

    pub async fn get_document(&self, data_id: &str, group: &str) -> RegistryResult<Option<String>> {
        let content = self.config.get_config(data_id, group).await?;
        debug!(
            target: "nacos_mcp::registry",
            data_id,
            group,
            found = content.is_some(),
            "Fetched registry document"
        );
        Ok(content.filter(|value| !value.is_empty()))
    }

    pub async fn put_document(&self, data_id: &str, group: &str, content: &str) -> RegistryResult<()> {
        self.config.publish_config(data_id, group, content).await?;
        debug!(
            target: "nacos_mcp::registry",
            data_id,
            group,
            bytes = content.len(),
            "Published registry document"
        );
        Ok(())
    }

    pub async fn watch(
        &self,
        data_id: &str,
        group: &str,
        baseline: Option<&str>,
        listener: ConfigListener,
    ) -> RegistryResult<WatchHandle> {
        self.config
            .watch_config(data_id, group, baseline, listener)
            .await
    }

    pub async fn register_instance(&self, instance: &ServiceInstance) -> RegistryResult<()> {
        self.naming.register_instance(instance).await
    }
}
