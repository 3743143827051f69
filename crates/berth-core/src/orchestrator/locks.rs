//! Per-plugin serialization of container-affecting operations

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per plugin id.
///
/// Activation and deactivation of different tenants share one container, so
/// they must not interleave their start/stop calls for the same plugin.
/// Different plugins never contend.
#[derive(Debug, Default)]
pub struct PluginLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PluginLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the plugin
    pub async fn acquire(&self, plugin_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(plugin_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Number of plugins that have been locked at least once
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
