use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::model::{CatalogEntry, OverlayMeta, PublishedDocument};
use crate::lib::errors::RegistryError;

/// Overlay currently applied to the local catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveCatalogState {
    pub tools_meta: OverlayMeta,
    /// Description overrides keyed by entry name.
    pub descriptions: BTreeMap<String, String>,
}

impl LiveCatalogState {
    pub fn is_tool_enabled(&self, name: &str) -> bool {
        self.tools_meta.get(name).map_or(true, |meta| meta.is_enabled())
    }
}

/// Local catalog plus the overlay state shared between the change listener
/// and every listing request. One per running server.
#[derive(Debug)]
pub struct LiveCatalog {
    data_id: String,
    entries: Vec<CatalogEntry>,
    state: RwLock<LiveCatalogState>,
}

impl LiveCatalog {
    pub fn new(
        data_id: impl Into<String>,
        entries: Vec<CatalogEntry>,
        state: LiveCatalogState,
    ) -> Self {
        Self {
            data_id: data_id.into(),
            entries,
            state: RwLock::new(state),
        }
    }

    pub fn data_id(&self) -> &str {
        &self.data_id
    }

    pub fn is_tool_enabled(&self, name: &str) -> bool {
        self.state.read().is_tool_enabled(name)
    }

    /// Copy of the current overlay state.
    pub fn snapshot(&self) -> LiveCatalogState {
        self.state.read().clone()
    }

    /// Enabled entries with their current descriptions, in local catalog order.
    pub fn list_entries(&self) -> Vec<CatalogEntry> {
        let state = self.snapshot();
        self.entries
            .iter()
            .filter(|entry| state.is_tool_enabled(&entry.name))
            .map(|entry| {
                let mut listed = entry.clone();
                if let Some(description) = state.descriptions.get(&entry.name) {
                    listed.description.clone_from(description);
                }
                listed
            })
            .collect()
    }

    /// Apply a document delivered by the registry watch.
    ///
    /// `toolsMeta` is replaced wholesale; descriptions are patched only for
    /// local entries named in the delivery. On parse failure the previous
    /// state is kept.
    pub fn apply_update(&self, content: &str) -> Result<(), RegistryError> {
        let document = PublishedDocument::parse(&self.data_id, content)?;
        let mut state = self.state.write();
        state.tools_meta = document.tools_meta;
        for remote in document.tools {
            if self.entries.iter().any(|entry| entry.name == remote.name) {
                state.descriptions.insert(remote.name, remote.description);
            }
        }
        debug!(
            target: "nacos_mcp::catalog",
            data_id = %self.data_id,
            overlay_entries = state.tools_meta.len(),
            "Applied catalog update from registry"
        );
        Ok(())
    }

    /// Listener body: apply the update, log and drop it when malformed.
    pub fn on_remote_change(&self, content: &str) {
        if let Err(err) = self.apply_update(content) {
            warn!(
                target: "nacos_mcp::catalog",
                data_id = %self.data_id,
                kind = err.kind(),
                error = %err,
                "Discarded catalog update from registry"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalog::model::{JsonObject, ToolMeta};

    fn catalog(state: LiveCatalogState) -> LiveCatalog {
        LiveCatalog::new(
            "demo-mcp-tools.json",
            vec![
                CatalogEntry::new("add", "Add", JsonObject::new()),
                CatalogEntry::new("minus", "Minus", JsonObject::new()),
            ],
            state,
        )
    }

    fn names(entries: &[CatalogEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    #[test]
    fn entries_without_meta_are_enabled() {
        let live = catalog(LiveCatalogState::default());

        assert!(live.is_tool_enabled("add"));
        assert!(live.is_tool_enabled("not-in-catalog"));
        assert_eq!(names(&live.list_entries()), vec!["add", "minus"]);
    }

    #[test]
    fn explicit_true_and_false_flags() {
        let mut state = LiveCatalogState::default();
        state.tools_meta.insert("add".into(), ToolMeta::disabled());
        state.tools_meta.insert(
            "minus".into(),
            ToolMeta {
                enabled: Some(true),
                ..ToolMeta::default()
            },
        );
        state.descriptions.insert("add".into(), "Sum".into());
        let live = catalog(state);

        assert!(!live.is_tool_enabled("add"));
        assert!(live.is_tool_enabled("minus"));
        assert_eq!(names(&live.list_entries()), vec!["minus"]);
    }

    #[test]
    fn update_replaces_meta_and_patches_descriptions() {
        let mut state = LiveCatalogState::default();
        state.tools_meta.insert("add".into(), ToolMeta::disabled());
        state.descriptions.insert("minus".into(), "Old minus".into());
        let live = catalog(state);

        let update = json!({
            "tools": [
                {"name": "add", "description": "Sum two numbers"},
                {"name": "unknown", "description": "Ignored"}
            ],
            "toolsMeta": {"minus": {"enabled": false}}
        });
        live.apply_update(&update.to_string())
            .expect("update should apply");

        let listed = live.list_entries();
        assert_eq!(names(&listed), vec!["add"]);
        assert_eq!(listed[0].description, "Sum two numbers");
        let snapshot = live.snapshot();
        assert_eq!(
            snapshot.descriptions.get("minus").map(String::as_str),
            Some("Old minus")
        );
        assert!(!snapshot.descriptions.contains_key("unknown"));
    }

    #[test]
    fn update_with_undescribed_entry_is_discarded() {
        let mut state = LiveCatalogState::default();
        state.descriptions.insert("add".into(), "Sum".into());
        let live = catalog(state.clone());

        let update = json!({"tools": [{"name": "add"}], "toolsMeta": {"minus": {"enabled": false}}});
        let err = live
            .apply_update(&update.to_string())
            .expect_err("entry without description is rejected");

        assert_eq!(err.kind(), "malformed_document");
        assert_eq!(live.snapshot(), state);
        let listed = live.list_entries();
        assert_eq!(names(&listed), vec!["add", "minus"]);
        assert_eq!(listed[0].description, "Sum");
    }

    #[test]
    fn malformed_update_keeps_previous_state() {
        let mut state = LiveCatalogState::default();
        state.tools_meta.insert("add".into(), ToolMeta::disabled());
        let live = catalog(state.clone());

        live.on_remote_change("not json at all");
        assert!(live.apply_update(r#"{"toolsMeta": []}"#).is_err());

        assert_eq!(live.snapshot(), state);
        assert!(!live.is_tool_enabled("add"));
    }
}
