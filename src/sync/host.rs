//! Seam between the synchronizer and the MCP server that owns the tools.

use std::sync::{Arc, OnceLock};

use super::SyncError;
use crate::catalog::{CatalogEntry, LiveCatalog};

/// Capabilities the synchronizer needs from a tool-hosting server.
pub trait ToolHost: Send + Sync {
    /// Whether the server answers `tools/list` at all.
    fn has_tool_listing(&self) -> bool;

    /// Tools as registered locally, before any overlay.
    fn registered_entries(&self) -> Vec<CatalogEntry>;

    /// Route every later `tools/list` through `catalog`. Succeeds at most once.
    fn override_listing(&self, catalog: Arc<LiveCatalog>) -> Result<(), SyncError>;
}

/// Write-once slot a server embeds to hold its listing override.
///
/// Clones share the slot, so every per-connection clone of a server sees the
/// override as soon as it is installed.
#[derive(Debug, Clone, Default)]
pub struct ListingOverride {
    slot: Arc<OnceLock<Arc<LiveCatalog>>>,
}

impl ListingOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, catalog: Arc<LiveCatalog>) -> Result<(), SyncError> {
        self.slot
            .set(catalog)
            .map_err(|_| SyncError::ListingAlreadyOverridden)
    }

    pub fn current(&self) -> Option<Arc<LiveCatalog>> {
        self.slot.get().cloned()
    }

    pub fn is_installed(&self) -> bool {
        self.slot.get().is_some()
    }
}

/// Host double with a fixed catalog, shared by the sync tests.
#[cfg(test)]
pub(crate) struct StaticHost {
    pub entries: Vec<CatalogEntry>,
    pub lists_tools: bool,
    pub listing: ListingOverride,
}

#[cfg(test)]
impl StaticHost {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            lists_tools: true,
            listing: ListingOverride::new(),
        }
    }

    /// What a `tools/list` request would return right now.
    pub fn listed(&self) -> Vec<CatalogEntry> {
        match self.listing.current() {
            Some(catalog) => catalog.list_entries(),
            None => self.entries.clone(),
        }
    }
}

#[cfg(test)]
impl ToolHost for StaticHost {
    fn has_tool_listing(&self) -> bool {
        self.lists_tools
    }

    fn registered_entries(&self) -> Vec<CatalogEntry> {
        self.entries.clone()
    }

    fn override_listing(&self, catalog: Arc<LiveCatalog>) -> Result<(), SyncError> {
        self.listing.install(catalog)
    }
}
