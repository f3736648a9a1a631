//! Tool catalog model, merge rules, and the live overlay state.

pub mod live;
pub mod merge;
pub mod model;

pub use live::{LiveCatalog, LiveCatalogState};
pub use merge::{merge, MergeOutcome};
pub use model::{CatalogEntry, JsonObject, OverlayMeta, PublishedDocument, ToolMeta};
