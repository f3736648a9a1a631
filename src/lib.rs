//! Library crate root re-exporting the catalog, registry, sync, and server modules.

#[path = "lib/mod.rs"]
pub mod lib_mod;
pub use lib_mod as lib;
pub mod catalog;
pub mod cli;
pub mod registry;
pub mod server;
pub mod sync;
pub mod tools;
