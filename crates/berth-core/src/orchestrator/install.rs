use serde_json::Value;

use super::Orchestrator;
use crate::error::{BerthError, BerthResult};
use crate::events::LifecycleEvent;
use crate::ledger::TenantInstallation;
use crate::plugins::LifecycleStatus;

impl Orchestrator {
    /// Install a published plugin for a tenant.
    ///
    /// The ledger row commits first; permission registration and migrations
    /// run afterwards. A rejected permission set removes the row again and
    /// returns the plugin to REGISTERED if no other tenant has it. A migration
    /// failure is reported as [`BerthError::InstallationFailedDuringMigrations`].
    pub async fn install(
        &self,
        tenant_id: &str,
        plugin_id: &str,
        configuration: Value,
    ) -> BerthResult<TenantInstallation> {
        self.install_inner(tenant_id, plugin_id, configuration)
            .await
            .map_err(|e| e.in_operation("install", plugin_id))
    }

    async fn install_inner(
        &self,
        tenant_id: &str,
        plugin_id: &str,
        configuration: Value,
    ) -> BerthResult<TenantInstallation> {
        let configuration = match configuration {
            Value::Null => Value::Object(Default::default()),
            Value::Object(_) => configuration,
            _ => {
                return Err(BerthError::InvalidConfiguration(
                    "plugin configuration must be a JSON object".to_string(),
                ));
            }
        };

        let plugin = self.store.get(plugin_id)?;
        if !plugin.marketplace_status.allows_installation() {
            return Err(BerthError::NotPublished {
                plugin_id: plugin_id.to_string(),
                status: plugin.marketplace_status,
            });
        }
        if self.ledger.find(tenant_id, plugin_id)?.is_some() {
            return Err(BerthError::already_installed(tenant_id, plugin_id));
        }

        let tenant = self.resolve_tenant(tenant_id).await?;

        let missing = self
            .dependencies
            .missing_dependencies(plugin_id, tenant_id)
            .await?;
        if !missing.is_empty() {
            return Err(BerthError::DependencyUnsatisfied {
                plugin_id: plugin_id.to_string(),
                missing,
            });
        }

        let outcome = self.ledger.install(tenant_id, plugin_id, configuration)?;
        let manifest = &outcome.plugin.manifest;

        if let Err(e) = self
            .permissions
            .register_plugin_permissions(&tenant, plugin_id, &manifest.permissions)
            .await
        {
            tracing::warn!(
                tenant_id,
                plugin_id,
                operation = "install",
                error = %e,
                "Permission registration failed, reverting installation"
            );
            match self.ledger.revert_install(tenant_id, plugin_id) {
                Ok(changes) => {
                    tracing::info!(tenant_id, plugin_id, reverted = changes.len(), "Installation reverted");
                }
                Err(revert) => {
                    tracing::warn!(
                        tenant_id,
                        plugin_id,
                        error = %revert,
                        "Failed to revert installation"
                    );
                }
            }
            return Err(e);
        }

        if let Err(e) = self.migrations.run_plugin_migrations(&tenant, manifest).await {
            // The ledger row and its status edges stay committed.
            self.publish_changes(plugin_id, &outcome.changes);
            // Once the plugin is INSTALLED this edge is invalid and the reset
            // is a no-op; the migration error is what the caller sees.
            if let Err(reset) = self.ledger.reset_status(plugin_id, LifecycleStatus::Registered) {
                tracing::warn!(
                    tenant_id,
                    plugin_id,
                    error = %reset,
                    "Could not reset plugin status after migration failure"
                );
            }
            return Err(BerthError::InstallationFailedDuringMigrations {
                plugin_id: plugin_id.to_string(),
                source: Box::new(e),
            });
        }

        self.publish_changes(plugin_id, &outcome.changes);
        self.events.notify(LifecycleEvent::Installed {
            tenant_id: tenant_id.to_string(),
            plugin_id: plugin_id.to_string(),
        });

        tracing::info!(tenant_id, plugin_id, operation = "install", "Plugin installed");
        Ok(outcome.installation)
    }
}
