//! Catalog synchronization against the registry.
//!
//! `start` fetches the stored overlay, merges it with the host's local tools,
//! publishes the result, subscribes to changes, and finally routes the host's
//! tool listing through the resulting [`LiveCatalog`]. Nothing is installed on
//! the host until every registry call has succeeded, so a failed start leaves
//! the server listing its local catalog untouched.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use super::{host::ToolHost, SyncError};
use crate::{
    catalog::{merge, LiveCatalog, PublishedDocument},
    lib::errors::RegistryError,
    registry::{self, ConfigListener, RegistryClient, WatchHandle, TOOLS_GROUP},
};

/// Progress of one synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Unsynced,
    Publishing,
    Synced,
}

/// A catalog under live synchronization.
#[derive(Debug)]
pub struct SyncedCatalog {
    pub catalog: Arc<LiveCatalog>,
    pub watch: WatchHandle,
}

pub struct CatalogSynchronizer {
    registry: RegistryClient,
    data_id: String,
    state: Mutex<SyncState>,
}

impl CatalogSynchronizer {
    pub fn new(registry: RegistryClient, server_name: &str) -> Self {
        Self {
            registry,
            data_id: registry::tools_data_id(server_name),
            state: Mutex::new(SyncState::Unsynced),
        }
    }

    /// Id of the tools document this synchronizer owns.
    pub fn data_id(&self) -> &str {
        &self.data_id
    }

    pub fn state(&self) -> SyncState {
        *self.state.lock()
    }

    /// Run the startup sequence. `Ok(None)` when the host lists no tools.
    pub async fn start(&self, host: &dyn ToolHost) -> Result<Option<SyncedCatalog>, SyncError> {
        if !host.has_tool_listing() {
            info!(
                target: "nacos_mcp::sync",
                data_id = %self.data_id,
                "Host registers no tool listing; skipping catalog sync"
            );
            return Ok(None);
        }

        *self.state.lock() = SyncState::Publishing;
        match self.publish_and_watch(host).await {
            Ok(synced) => {
                *self.state.lock() = SyncState::Synced;
                info!(
                    target: "nacos_mcp::sync",
                    data_id = %self.data_id,
                    listed = synced.catalog.list_entries().len(),
                    "Tool catalog synchronized with registry"
                );
                Ok(Some(synced))
            }
            Err(err) => {
                *self.state.lock() = SyncState::Unsynced;
                Err(err)
            }
        }
    }

    async fn publish_and_watch(&self, host: &dyn ToolHost) -> Result<SyncedCatalog, SyncError> {
        let local = host.registered_entries();
        let remote = self
            .registry
            .get_document(&self.data_id, TOOLS_GROUP)
            .await?
            .map(|content| PublishedDocument::parse(&self.data_id, &content))
            .transpose()?;

        let outcome = merge(&local, remote.as_ref());
        let content = outcome
            .document
            .to_pretty_json()
            .map_err(|err| RegistryError::malformed(&self.data_id, err))?;
        self.registry
            .put_document(&self.data_id, TOOLS_GROUP, &content)
            .await?;

        let catalog = Arc::new(LiveCatalog::new(&self.data_id, local, outcome.state));
        let watched = Arc::clone(&catalog);
        let listener: ConfigListener = Arc::new(move |content| watched.on_remote_change(&content));
        let watch = self
            .registry
            .watch(&self.data_id, TOOLS_GROUP, Some(&content), listener)
            .await?;

        if let Err(err) = host.override_listing(Arc::clone(&catalog)) {
            warn!(
                target: "nacos_mcp::sync",
                data_id = %self.data_id,
                error = %err,
                "Listing override refused; dropping watch"
            );
            watch.cancel();
            return Err(err);
        }

        Ok(SyncedCatalog { catalog, watch })
    }
}
