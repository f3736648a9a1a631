//! In-process registry used for local runs and tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use super::{
    ConfigListener, ConfigStore, NamingDirectory, RegistryResult, ServiceInstance, WatchHandle,
};
use crate::lib::errors::RegistryError;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

type DocumentKey = (String, String);

#[derive(Debug, Clone)]
struct DocumentChange {
    key: DocumentKey,
    content: String,
}

/// Registry backed by process memory, with fault injection.
#[derive(Debug)]
pub struct InMemoryRegistry {
    documents: Arc<Mutex<HashMap<DocumentKey, String>>>,
    instances: Mutex<Vec<ServiceInstance>>,
    changes: broadcast::Sender<DocumentChange>,
    unavailable: AtomicBool,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            documents: Arc::new(Mutex::new(HashMap::new())),
            instances: Mutex::new(Vec::new()),
            changes,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with `RegistryError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Current content of a document, bypassing fault injection.
    pub fn document(&self, data_id: &str, group: &str) -> Option<String> {
        self.documents
            .lock()
            .get(&(data_id.to_string(), group.to_string()))
            .cloned()
    }

    /// Instances registered so far.
    pub fn instances(&self) -> Vec<ServiceInstance> {
        self.instances.lock().clone()
    }

    fn ensure_available(&self, operation: &'static str) -> RegistryResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RegistryError::unavailable(
                operation,
                "in-memory registry marked unavailable",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for InMemoryRegistry {
    async fn get_config(&self, data_id: &str, group: &str) -> RegistryResult<Option<String>> {
        self.ensure_available("get_config")?;
        Ok(self.document(data_id, group))
    }

    async fn publish_config(
        &self,
        data_id: &str,
        group: &str,
        content: &str,
    ) -> RegistryResult<()> {
        self.ensure_available("publish_config")?;
        if data_id.trim().is_empty() || group.trim().is_empty() {
            return Err(RegistryError::rejected(
                "publish_config",
                None,
                "data id and group must not be empty",
            ));
        }
        let key = (data_id.to_string(), group.to_string());
        self.documents.lock().insert(key.clone(), content.to_string());
        // No receivers simply means nobody is watching yet.
        let _ = self.changes.send(DocumentChange {
            key,
            content: content.to_string(),
        });
        Ok(())
    }

    async fn watch_config(
        &self,
        data_id: &str,
        group: &str,
        baseline: Option<&str>,
        listener: ConfigListener,
    ) -> RegistryResult<WatchHandle> {
        self.ensure_available("watch_config")?;
        let key = (data_id.to_string(), group.to_string());
        let mut receiver = self.changes.subscribe();
        let documents = Arc::clone(&self.documents);

        if let Some(baseline) = baseline {
            let current = documents.lock().get(&key).cloned();
            if let Some(content) = current.filter(|content| content != baseline) {
                listener(content);
            }
        }

        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(change) if change.key == key => listener(change.content),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(
                            target: "nacos_mcp::registry",
                            data_id = %key.0,
                            skipped,
                            "Watcher lagged; delivering latest content"
                        );
                        let latest = documents.lock().get(&key).cloned();
                        if let Some(content) = latest {
                            listener(content);
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Ok(WatchHandle::new(data_id, task))
    }
}

#[async_trait]
impl NamingDirectory for InMemoryRegistry {
    async fn register_instance(&self, instance: &ServiceInstance) -> RegistryResult<()> {
        self.ensure_available("register_instance")?;
        let mut instances = self.instances.lock();
        instances.retain(|existing| {
            !(existing.service_name == instance.service_name
                && existing.group == instance.group
                && existing.ip == instance.ip
                && existing.port == instance.port)
        });
        instances.push(instance.clone());
        Ok(())
    }
}
