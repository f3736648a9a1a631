use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::lib::errors::RegistryError;

/// JSON object holding a tool's input schema.
pub type JsonObject = Map<String, Value>;

/// One tool as advertised by the host server.
///
/// `description` is required when read back from the registry: a stored entry
/// without one is a malformed document, never an empty override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub input_schema: JsonObject,
}

impl CatalogEntry {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: JsonObject,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Remotely editable record layered on top of one catalog entry.
///
/// Keys other than `enabled` and `description` are kept verbatim so that
/// records written by other tools survive a republish.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl ToolMeta {
    pub fn disabled() -> Self {
        Self {
            enabled: Some(false),
            ..Self::default()
        }
    }

    /// Only an explicit `false` disables an entry.
    pub fn is_enabled(&self) -> bool {
        self.enabled != Some(false)
    }
}

/// Overlay keyed by entry name.
pub type OverlayMeta = BTreeMap<String, ToolMeta>;

/// The tools document stored in the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedDocument {
    #[serde(alias = "entries", default)]
    pub tools: Vec<CatalogEntry>,
    #[serde(default)]
    pub tools_meta: OverlayMeta,
}

impl PublishedDocument {
    /// Parse stored content. `data_id` is only used for error context.
    pub fn parse(data_id: &str, content: &str) -> Result<Self, RegistryError> {
        serde_json::from_str(content).map_err(|err| RegistryError::malformed(data_id, err))
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn entry(&self, name: &str) -> Option<&CatalogEntry> {
        self.tools.iter().find(|entry| entry.name == name)
    }
}
