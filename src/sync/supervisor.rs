//! Background registration with the registry.
//!
//! Registration never blocks serving. The task runs catalog sync first and
//! publishes the descriptor afterwards, regardless of the sync result. Every
//! failure is logged and reported; a panic inside the task is caught and
//! reported as [`RegistrationOutcome::Panicked`].

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, Instrument};

use super::{
    host::ToolHost,
    publisher::{DescriptorPublisher, PublishTarget, ServerDescriptor, ServerIdentity},
    synchronizer::{CatalogSynchronizer, SyncedCatalog},
    SyncError,
};
use crate::{
    lib::{errors::RegistryError, telemetry::RegistrationSpan},
    registry::RegistryClient,
};

/// Result of each registration phase.
#[derive(Debug)]
pub struct RegistrationReport {
    pub sync: Result<Option<SyncedCatalog>, SyncError>,
    pub descriptor: Result<ServerDescriptor, RegistryError>,
}

impl RegistrationReport {
    pub fn is_complete(&self) -> bool {
        self.sync.is_ok() && self.descriptor.is_ok()
    }
}

#[derive(Debug)]
pub enum RegistrationOutcome {
    Completed(RegistrationReport),
    Panicked(String),
}

/// Sync the catalog, then publish the descriptor.
pub async fn register_server(
    host: Arc<dyn ToolHost>,
    registry: RegistryClient,
    identity: ServerIdentity,
    target: PublishTarget,
) -> RegistrationReport {
    let synchronizer = CatalogSynchronizer::new(registry.clone(), &identity.name);
    let sync = synchronizer.start(host.as_ref()).await;
    if let Err(err) = &sync {
        error!(
            target: "nacos_mcp::sync",
            data_id = synchronizer.data_id(),
            error = %err,
            "Failed to sync MCP tools with Nacos"
        );
    }

    let publisher = DescriptorPublisher::new(registry, identity);
    let descriptor = publisher.publish(&target).await;
    if let Err(err) = &descriptor {
        error!(
            target: "nacos_mcp::sync",
            kind = err.kind(),
            error = %err,
            "Failed to register MCP server to Nacos"
        );
    }

    RegistrationReport { sync, descriptor }
}

/// Run [`register_server`] on its own task and report how it ended.
///
/// The returned handle never resolves to a `JoinError` for panics inside the
/// registration itself; those are turned into [`RegistrationOutcome::Panicked`].
pub fn spawn_registration(
    host: Arc<dyn ToolHost>,
    registry: RegistryClient,
    identity: ServerIdentity,
    target: PublishTarget,
) -> JoinHandle<RegistrationOutcome> {
    let protocol = match target {
        PublishTarget::Local => "local",
        PublishTarget::Networked(_) => "networked",
    };
    let span = RegistrationSpan::start(&identity.name, protocol);
    let instrument = span.span().clone();

    tokio::spawn(async move {
        let inner = tokio::spawn(
            register_server(host, registry, identity, target).instrument(instrument),
        );
        match inner.await {
            Ok(report) => {
                span.finish(report.sync.is_ok(), report.descriptor.is_ok());
                RegistrationOutcome::Completed(report)
            }
            Err(join_error) => {
                let reason = if join_error.is_panic() {
                    panic_message(join_error.into_panic())
                } else {
                    join_error.to_string()
                };
                error!(
                    target: "nacos_mcp::sync",
                    reason = %reason,
                    "Registry registration task aborted"
                );
                span.finish(false, false);
                RegistrationOutcome::Panicked(reason)
            }
        }
    })
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "registration task panicked".to_string()
    }
}
