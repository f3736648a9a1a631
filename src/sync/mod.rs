//! Registry synchronization: catalog sync, descriptor publication, and the
//! supervised background task tying them together.

pub mod host;
pub mod publisher;
pub mod supervisor;
pub mod synchronizer;

use thiserror::Error;

use crate::lib::errors::RegistryError;

pub use host::{ListingOverride, ToolHost};
pub use publisher::{
    DescriptorPublisher, NetworkedEndpoint, PublishTarget, RemoteServerConfig, ServerDescriptor,
    ServerIdentity, ServerProtocol, ServiceRef,
};
pub use supervisor::{
    register_server, spawn_registration, RegistrationOutcome, RegistrationReport,
};
pub use synchronizer::{CatalogSynchronizer, SyncState, SyncedCatalog};

/// Failures of the catalog synchronization sequence.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Tool listing was already overridden")]
    ListingAlreadyOverridden,
}
