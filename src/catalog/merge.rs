//! Reconciles the local tool catalog with the overlay stored in the registry.

use std::collections::BTreeMap;

use super::{
    live::LiveCatalogState,
    model::{CatalogEntry, OverlayMeta, PublishedDocument},
};

/// Result of [`merge`]: the document to publish and the initial live state.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub document: PublishedDocument,
    pub state: LiveCatalogState,
}

/// Merge `local` with an optional `remote` document.
///
/// The local catalog decides which entries exist; the remote document decides
/// their descriptions and carries the enablement overlay. Names match exactly.
pub fn merge(local: &[CatalogEntry], remote: Option<&PublishedDocument>) -> MergeOutcome {
    let Some(remote) = remote else {
        return MergeOutcome {
            document: PublishedDocument {
                tools: local.to_vec(),
                tools_meta: OverlayMeta::new(),
            },
            state: LiveCatalogState::default(),
        };
    };

    let mut tools = Vec::with_capacity(local.len());
    let mut tools_meta = OverlayMeta::new();
    let mut descriptions = BTreeMap::new();

    for entry in local {
        let mut merged = entry.clone();
        if let Some(remote_entry) = remote.entry(&entry.name) {
            merged.description = remote_entry.description.clone();
            descriptions.insert(entry.name.clone(), remote_entry.description.clone());
        }
        if let Some(meta) = remote.tools_meta.get(&entry.name) {
            tools_meta.insert(entry.name.clone(), meta.clone());
        }
        tools.push(merged);
    }

    MergeOutcome {
        state: LiveCatalogState {
            tools_meta: tools_meta.clone(),
            descriptions,
        },
        document: PublishedDocument { tools, tools_meta },
    }
}
