#[path = "integration/common.rs"]
mod common;

#[path = "integration/runtime_spawn.rs"]
mod runtime_spawn;

#[path = "integration/registry_sync.rs"]
mod registry_sync;
