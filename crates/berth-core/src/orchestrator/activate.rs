use super::Orchestrator;
use crate::container::{ContainerConfig, wait_until_healthy};
use crate::error::{BerthError, BerthResult};
use crate::events::LifecycleEvent;
use crate::ledger::TenantInstallation;
use crate::plugins::LifecycleStatus;

impl Orchestrator {
    /// Activate an installed plugin for a tenant.
    ///
    /// The first tenant to activate starts the shared container and waits for
    /// it to report healthy before the plugin becomes ACTIVE. When the plugin
    /// is already ACTIVE only the tenant flag changes.
    pub async fn activate(&self, tenant_id: &str, plugin_id: &str) -> BerthResult<TenantInstallation> {
        let _guard = self.locks.acquire(plugin_id).await;
        self.activate_inner(tenant_id, plugin_id)
            .await
            .map_err(|e| e.in_operation("activate", plugin_id))
    }

    async fn activate_inner(&self, tenant_id: &str, plugin_id: &str) -> BerthResult<TenantInstallation> {
        match self.ledger.find(tenant_id, plugin_id)? {
            None => return Err(BerthError::not_installed(tenant_id, plugin_id)),
            Some(row) if row.enabled => return Err(BerthError::already_active(tenant_id, plugin_id)),
            Some(_) => {}
        }

        let plugin = self.store.get(plugin_id)?;
        let started = if plugin.lifecycle_status == LifecycleStatus::Active {
            false
        } else {
            // Refuse before touching the runtime.
            if !plugin.lifecycle_status.can_transition_to(LifecycleStatus::Active) {
                return Err(BerthError::InvalidTransition {
                    plugin_id: plugin_id.to_string(),
                    from: plugin.lifecycle_status,
                    to: LifecycleStatus::Active,
                });
            }

            let config = ContainerConfig::from_manifest(&plugin.manifest, &self.container_settings);
            tracing::info!(
                tenant_id,
                plugin_id,
                operation = "activate",
                image = %config.image,
                backend = self.container.name(),
                "Starting plugin container"
            );

            if let Err(e) = self.container.start(plugin_id, &config).await {
                self.stop_quietly(plugin_id, "activate").await;
                return Err(e);
            }
            if let Err(e) = wait_until_healthy(self.container.as_ref(), plugin_id, &self.health).await {
                self.stop_quietly(plugin_id, "activate").await;
                return Err(e);
            }
            true
        };

        let change = match self.ledger.activate(tenant_id, plugin_id) {
            Ok(change) => change,
            Err(e) => {
                if started {
                    self.stop_quietly(plugin_id, "activate").await;
                }
                return Err(e);
            }
        };

        self.publish_changes(plugin_id, &change.changes);
        self.events.notify(LifecycleEvent::Activated {
            tenant_id: tenant_id.to_string(),
            plugin_id: plugin_id.to_string(),
        });

        tracing::info!(tenant_id, plugin_id, operation = "activate", "Plugin activated");
        Ok(change.installation)
    }
}
