use super::Orchestrator;
use crate::error::{BerthError, BerthResult};
use crate::events::LifecycleEvent;
use crate::ledger::TenantInstallation;

impl Orchestrator {
    /// Deactivate a plugin for a tenant.
    ///
    /// Only the last enabled tenant moves the plugin to DISABLED and stops the
    /// container. A failed stop is logged; the committed state stands.
    pub async fn deactivate(&self, tenant_id: &str, plugin_id: &str) -> BerthResult<TenantInstallation> {
        let _guard = self.locks.acquire(plugin_id).await;
        self.deactivate_inner(tenant_id, plugin_id)
            .await
            .map_err(|e| e.in_operation("deactivate", plugin_id))
    }

    async fn deactivate_inner(&self, tenant_id: &str, plugin_id: &str) -> BerthResult<TenantInstallation> {
        match self.ledger.find(tenant_id, plugin_id)? {
            None => return Err(BerthError::not_installed(tenant_id, plugin_id)),
            Some(row) if !row.enabled => {
                return Err(BerthError::already_inactive(tenant_id, plugin_id));
            }
            Some(_) => {}
        }

        let outcome = self.ledger.deactivate(tenant_id, plugin_id)?;

        let container_stopped = if outcome.last_enabled {
            tracing::info!(
                tenant_id,
                plugin_id,
                operation = "deactivate",
                "Last enabled tenant left, stopping plugin container"
            );
            self.stop_quietly(plugin_id, "deactivate").await
        } else {
            false
        };

        self.publish_changes(plugin_id, &outcome.changes);
        self.events.notify(LifecycleEvent::Deactivated {
            tenant_id: tenant_id.to_string(),
            plugin_id: plugin_id.to_string(),
            container_stopped,
        });

        tracing::info!(tenant_id, plugin_id, operation = "deactivate", "Plugin deactivated");
        Ok(outcome.installation)
    }
}
