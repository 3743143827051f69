use super::Orchestrator;
use crate::error::{BerthError, BerthResult};
use crate::events::LifecycleEvent;
use crate::ledger::TenantInstallation;

impl Orchestrator {
    /// Remove a tenant's installation, returning the deleted row.
    ///
    /// Refused while other plugins installed for the tenant require this one.
    /// The last installation overall returns the plugin to REGISTERED and
    /// removes its container. Runtime and permission cleanup failures are
    /// logged only.
    pub async fn uninstall(&self, tenant_id: &str, plugin_id: &str) -> BerthResult<TenantInstallation> {
        let _guard = self.locks.acquire(plugin_id).await;
        self.uninstall_inner(tenant_id, plugin_id)
            .await
            .map_err(|e| e.in_operation("uninstall", plugin_id))
    }

    async fn uninstall_inner(&self, tenant_id: &str, plugin_id: &str) -> BerthResult<TenantInstallation> {
        if self.ledger.find(tenant_id, plugin_id)?.is_none() {
            return Err(BerthError::not_installed(tenant_id, plugin_id));
        }

        let check = self.dependencies.can_uninstall(plugin_id, tenant_id).await?;
        if !check.can_uninstall {
            return Err(BerthError::DependencyBlocked {
                plugin_id: plugin_id.to_string(),
                blocked_by: check.blocked_by,
            });
        }

        let outcome = self.ledger.uninstall(tenant_id, plugin_id)?;

        if outcome.last_installation {
            if let Err(e) = self.container.remove(plugin_id).await {
                tracing::warn!(
                    tenant_id,
                    plugin_id,
                    operation = "uninstall",
                    error = %e,
                    "Failed to remove plugin container"
                );
            }
        } else if outcome.last_enabled {
            self.stop_quietly(plugin_id, "uninstall").await;
        }

        match self.tenants.resolve(tenant_id).await {
            Ok(Some(tenant)) => {
                if let Err(e) = self.permissions.remove_plugin_permissions(&tenant, plugin_id).await {
                    tracing::warn!(
                        tenant_id,
                        plugin_id,
                        error = %e,
                        "Failed to remove plugin permissions"
                    );
                }
            }
            Ok(None) => {
                tracing::debug!(tenant_id, plugin_id, "Tenant not resolvable, skipping permission cleanup");
            }
            Err(e) => {
                tracing::warn!(tenant_id, plugin_id, error = %e, "Tenant lookup failed, skipping permission cleanup");
            }
        }

        self.publish_changes(plugin_id, &outcome.changes);
        self.events.notify(LifecycleEvent::Uninstalled {
            tenant_id: tenant_id.to_string(),
            plugin_id: plugin_id.to_string(),
        });

        tracing::info!(
            tenant_id,
            plugin_id,
            operation = "uninstall",
            last_installation = outcome.last_installation,
            "Plugin uninstalled"
        );
        Ok(outcome.removed)
    }
}
