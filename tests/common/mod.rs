//! Shared fixtures for workspace integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use berth::{
    BerthResult, ContainerAdapter, ContainerConfig, Database, EventBus, HealthPolicy,
    HealthStatus, LifecycleStatus, Orchestrator,
};
use parking_lot::Mutex;
use serde_json::json;

/// Container adapter that records calls and reports a configurable health
pub struct RecordingContainer {
    calls: Mutex<Vec<(&'static str, String)>>,
    health: Mutex<HealthStatus>,
}

impl RecordingContainer {
    pub fn with_health(health: HealthStatus) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            health: Mutex::new(health),
        })
    }

    pub fn healthy() -> Arc<Self> {
        Self::with_health(HealthStatus::Healthy)
    }

    /// Number of `operation` calls for any plugin
    pub fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(op, _)| *op == operation)
            .count()
    }

    fn record(&self, operation: &'static str, plugin_id: &str) {
        self.calls.lock().push((operation, plugin_id.to_string()));
    }
}

#[async_trait]
impl ContainerAdapter for RecordingContainer {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn start(&self, plugin_id: &str, _config: &ContainerConfig) -> BerthResult<()> {
        self.record("start", plugin_id);
        Ok(())
    }

    async fn stop(&self, plugin_id: &str) -> BerthResult<()> {
        self.record("stop", plugin_id);
        Ok(())
    }

    async fn remove(&self, plugin_id: &str) -> BerthResult<()> {
        self.record("remove", plugin_id);
        Ok(())
    }

    async fn health(&self, plugin_id: &str) -> HealthStatus {
        self.record("health", plugin_id);
        *self.health.lock()
    }
}

pub struct Fixture {
    pub db: Arc<Database>,
    pub orchestrator: Arc<Orchestrator>,
    pub events: EventBus,
}

/// Orchestrator over an in-memory database with fast health polling
pub fn fixture(container: Arc<dyn ContainerAdapter>) -> Fixture {
    let db = Arc::new(Database::open_in_memory().expect("in-memory database"));
    let events = EventBus::new(128);
    let orchestrator = Orchestrator::builder(db.clone())
        .container(container)
        .health_policy(HealthPolicy::new(
            Duration::from_millis(2),
            Duration::from_millis(60),
        ))
        .events(Arc::new(events.clone()))
        .build()
        .expect("orchestrator");

    Fixture {
        db,
        orchestrator: Arc::new(orchestrator),
        events,
    }
}

/// Register and publish a plugin without dependencies or permissions
pub async fn publish(orchestrator: &Orchestrator, plugin_id: &str) {
    publish_manifest(orchestrator, json!({"id": plugin_id, "version": "1.0.0"})).await;
}

pub async fn publish_manifest(orchestrator: &Orchestrator, manifest: serde_json::Value) {
    let plugin = orchestrator
        .register_plugin(&manifest)
        .await
        .expect("register plugin");
    orchestrator
        .publish_plugin(&plugin.id)
        .expect("publish plugin");
}

pub fn status(orchestrator: &Orchestrator, plugin_id: &str) -> LifecycleStatus {
    orchestrator
        .get_plugin(plugin_id)
        .expect("plugin")
        .lifecycle_status
}

/// Check the status/ledger agreement for every plugin
pub fn assert_lifecycle_invariants(orchestrator: &Orchestrator) {
    for plugin in orchestrator.list_plugins().expect("list plugins") {
        let enabled = orchestrator
            .ledger()
            .count_enabled(&plugin.id)
            .expect("count enabled");
        let installations = orchestrator
            .ledger()
            .count_installations(&plugin.id)
            .expect("count installations");

        if plugin.lifecycle_status.is_dormant() {
            assert_eq!(enabled, 0, "{} is {} with enabled tenants", plugin.id, plugin.lifecycle_status);
        }
        if plugin.lifecycle_status == LifecycleStatus::Active {
            assert!(enabled > 0, "{} is ACTIVE without enabled tenants", plugin.id);
        }
        if installations > 0 {
            assert!(
                plugin.lifecycle_status.permits_installations(),
                "{} has ledger rows while {}",
                plugin.id,
                plugin.lifecycle_status
            );
        }
    }
}
