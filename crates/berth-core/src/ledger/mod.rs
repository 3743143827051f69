//! Tenant installation ledger
//!
//! One row per (tenant, plugin) recording whether the tenant installed and
//! enabled the plugin, plus its configuration. The ledger owns the
//! "first tenant to install / last tenant to leave" decisions that drive the
//! global lifecycle status.
//!
//! Each operation runs in a single transaction and re-reads both the row and
//! the tenant counts inside it, so the decision is always based on committed
//! state and never on a cached counter. Callers may do an optimistic read
//! first to fail fast; the transaction repeats the check authoritatively.

mod queries;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{BerthError, BerthResult};
use crate::plugins::{
    LifecycleStatus, Plugin, StatusChange, fetch_plugin, find_plugin, transition,
};
use crate::storage::Database;

/// Per-tenant installation row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantInstallation {
    pub tenant_id: String,
    pub plugin_id: String,
    /// Whether the tenant currently has access to the running plugin
    pub enabled: bool,
    /// Tenant-specific configuration document
    pub configuration: serde_json::Value,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A ledger row joined with its plugin's global state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstalledPlugin {
    #[serde(flatten)]
    pub installation: TenantInstallation,
    pub version: String,
    pub lifecycle_status: LifecycleStatus,
}

/// Result of [`Ledger::install`]
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub installation: TenantInstallation,
    /// Plugin as of commit
    pub plugin: Plugin,
    /// No other tenant had the plugin installed
    pub first_installation: bool,
    pub changes: Vec<StatusChange>,
}

/// Result of ledger writes that keep the row
#[derive(Debug, Clone)]
pub struct LedgerChange {
    pub installation: TenantInstallation,
    pub changes: Vec<StatusChange>,
}

/// Result of [`Ledger::deactivate`]
#[derive(Debug, Clone)]
pub struct DeactivateOutcome {
    pub installation: TenantInstallation,
    /// No other tenant remains enabled; the shared container must stop
    pub last_enabled: bool,
    pub changes: Vec<StatusChange>,
}

/// Result of [`Ledger::uninstall`]
#[derive(Debug, Clone)]
pub struct UninstallOutcome {
    /// The deleted row
    pub removed: TenantInstallation,
    /// No installation remains; the container must be removed
    pub last_installation: bool,
    /// The removed row was the last enabled one; the container must stop
    pub last_enabled: bool,
    pub changes: Vec<StatusChange>,
}

/// Transactional access to the installation ledger
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Arc<Database>,
}

impl Ledger {
    /// Create a ledger over the shared database
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Optimistic read outside any transaction
    pub fn find(&self, tenant_id: &str, plugin_id: &str) -> BerthResult<Option<TenantInstallation>> {
        self.db.read(|conn| queries::find(conn, tenant_id, plugin_id))
    }

    /// Rows with `enabled = true` for a plugin
    pub fn count_enabled(&self, plugin_id: &str) -> BerthResult<u64> {
        self.db.read(|conn| queries::count_enabled(conn, plugin_id))
    }

    /// Rows for a plugin across all tenants
    pub fn count_installations(&self, plugin_id: &str) -> BerthResult<u64> {
        self.db.read(|conn| queries::count_for_plugin(conn, plugin_id))
    }

    /// Ledger rows of a tenant joined with plugin state
    pub fn installed_plugins(&self, tenant_id: &str) -> BerthResult<Vec<InstalledPlugin>> {
        self.db.read(|conn| queries::list_for_tenant(conn, tenant_id))
    }

    /// Create the tenant's row (disabled).
    ///
    /// The first installation across all tenants drives
    /// REGISTERED → INSTALLING → INSTALLED before the row is inserted.
    pub fn install(
        &self,
        tenant_id: &str,
        plugin_id: &str,
        configuration: serde_json::Value,
    ) -> BerthResult<InstallOutcome> {
        self.db.transaction(|tx| {
            let plugin = fetch_plugin(tx, plugin_id)?;
            if !plugin.marketplace_status.allows_installation() {
                return Err(BerthError::NotPublished {
                    plugin_id: plugin_id.to_string(),
                    status: plugin.marketplace_status,
                });
            }

            if queries::find(tx, tenant_id, plugin_id)?.is_some() {
                return Err(BerthError::already_installed(tenant_id, plugin_id));
            }

            let existing = queries::count_for_plugin(tx, plugin_id)?;
            let mut changes = Vec::new();
            let plugin = if existing == 0 {
                let installing = transition(tx, plugin_id, LifecycleStatus::Installing)?;
                changes.push(installing.change());
                let installed = transition(tx, plugin_id, LifecycleStatus::Installed)?;
                changes.push(installed.change());
                installed.plugin
            } else if plugin.lifecycle_status.permits_installations() {
                plugin
            } else {
                return Err(BerthError::InvalidTransition {
                    plugin_id: plugin_id.to_string(),
                    from: plugin.lifecycle_status,
                    to: LifecycleStatus::Installed,
                });
            };

            let now = Utc::now();
            let installation = TenantInstallation {
                tenant_id: tenant_id.to_string(),
                plugin_id: plugin_id.to_string(),
                enabled: false,
                configuration,
                installed_at: now,
                updated_at: now,
            };
            queries::insert(tx, &installation)?;

            tracing::info!(
                tenant_id,
                plugin_id,
                first_installation = existing == 0,
                "Ledger row created"
            );

            Ok(InstallOutcome {
                installation,
                plugin,
                first_installation: existing == 0,
                changes,
            })
        })
    }

    /// Enable the tenant after its container passed the health check.
    ///
    /// Moves the global status to ACTIVE unless another tenant already did.
    pub fn activate(&self, tenant_id: &str, plugin_id: &str) -> BerthResult<LedgerChange> {
        self.db.transaction(|tx| {
            let installation = require_row(tx, tenant_id, plugin_id)?;
            if installation.enabled {
                return Err(BerthError::already_active(tenant_id, plugin_id));
            }

            let mut changes = Vec::new();
            let plugin = fetch_plugin(tx, plugin_id)?;
            if plugin.lifecycle_status != LifecycleStatus::Active {
                changes.push(transition(tx, plugin_id, LifecycleStatus::Active)?.change());
            }

            let now = Utc::now();
            queries::set_enabled(tx, tenant_id, plugin_id, true, now)?;
            Ok(LedgerChange {
                installation: TenantInstallation {
                    enabled: true,
                    updated_at: now,
                    ..installation
                },
                changes,
            })
        })
    }

    /// Disable the tenant; the last enabled tenant also moves ACTIVE → DISABLED.
    pub fn deactivate(&self, tenant_id: &str, plugin_id: &str) -> BerthResult<DeactivateOutcome> {
        self.db.transaction(|tx| {
            let installation = require_row(tx, tenant_id, plugin_id)?;
            // A concurrent caller may have disabled the row after our optimistic read.
            if !installation.enabled {
                return Err(BerthError::already_inactive(tenant_id, plugin_id));
            }

            let others = queries::count_enabled_excluding(tx, plugin_id, tenant_id)?;
            let mut changes = Vec::new();
            if others == 0 {
                changes.push(transition(tx, plugin_id, LifecycleStatus::Disabled)?.change());
            }

            let now = Utc::now();
            queries::set_enabled(tx, tenant_id, plugin_id, false, now)?;
            Ok(DeactivateOutcome {
                installation: TenantInstallation {
                    enabled: false,
                    updated_at: now,
                    ..installation
                },
                last_enabled: others == 0,
                changes,
            })
        })
    }

    /// Flip the tenant flag on without touching the global status.
    ///
    /// The plugin must already be ACTIVE (running for another tenant).
    pub fn enable_for_tenant(&self, tenant_id: &str, plugin_id: &str) -> BerthResult<TenantInstallation> {
        self.db.transaction(|tx| {
            let installation = require_row(tx, tenant_id, plugin_id)?;
            if installation.enabled {
                return Err(BerthError::already_active(tenant_id, plugin_id));
            }

            let plugin = fetch_plugin(tx, plugin_id)?;
            if plugin.lifecycle_status != LifecycleStatus::Active {
                return Err(BerthError::PluginNotActive {
                    plugin_id: plugin_id.to_string(),
                    status: plugin.lifecycle_status,
                });
            }

            let now = Utc::now();
            queries::set_enabled(tx, tenant_id, plugin_id, true, now)?;
            Ok(TenantInstallation {
                enabled: true,
                updated_at: now,
                ..installation
            })
        })
    }

    /// Flip the tenant flag off without touching the global status.
    ///
    /// Refused for the last enabled tenant: an ACTIVE plugin must keep at least
    /// one enabled tenant, and stopping it is [`Ledger::deactivate`]'s job.
    pub fn disable_for_tenant(&self, tenant_id: &str, plugin_id: &str) -> BerthResult<TenantInstallation> {
        self.db.transaction(|tx| {
            let installation = require_row(tx, tenant_id, plugin_id)?;
            if !installation.enabled {
                return Err(BerthError::already_inactive(tenant_id, plugin_id));
            }

            if queries::count_enabled_excluding(tx, plugin_id, tenant_id)? == 0 {
                return Err(BerthError::LastEnabledTenant {
                    tenant_id: tenant_id.to_string(),
                    plugin_id: plugin_id.to_string(),
                });
            }

            let now = Utc::now();
            queries::set_enabled(tx, tenant_id, plugin_id, false, now)?;
            Ok(TenantInstallation {
                enabled: false,
                updated_at: now,
                ..installation
            })
        })
    }

    /// Delete the tenant's row.
    ///
    /// An enabled row that is the last enabled one first moves ACTIVE → DISABLED.
    /// The last row overall moves the plugin through UNINSTALLING back to
    /// REGISTERED so it is immediately reinstallable.
    pub fn uninstall(&self, tenant_id: &str, plugin_id: &str) -> BerthResult<UninstallOutcome> {
        self.db.transaction(|tx| {
            let removed = require_row(tx, tenant_id, plugin_id)?;
            let mut changes = Vec::new();

            let last_enabled =
                removed.enabled && queries::count_enabled_excluding(tx, plugin_id, tenant_id)? == 0;
            if last_enabled {
                changes.push(transition(tx, plugin_id, LifecycleStatus::Disabled)?.change());
            }

            queries::delete(tx, tenant_id, plugin_id)?;

            let remaining = queries::count_for_plugin(tx, plugin_id)?;
            if remaining == 0 {
                changes.push(transition(tx, plugin_id, LifecycleStatus::Uninstalling)?.change());
                changes.push(transition(tx, plugin_id, LifecycleStatus::Registered)?.change());
            }

            tracing::info!(
                tenant_id,
                plugin_id,
                remaining,
                "Ledger row deleted"
            );

            Ok(UninstallOutcome {
                removed,
                last_installation: remaining == 0,
                last_enabled,
                changes,
            })
        })
    }

    /// Compensation for a rejected install: delete the row and, if no other
    /// tenant has the plugin, walk it back to REGISTERED.
    pub fn revert_install(&self, tenant_id: &str, plugin_id: &str) -> BerthResult<Vec<StatusChange>> {
        self.db.transaction(|tx| {
            queries::delete(tx, tenant_id, plugin_id)?;

            let mut changes = Vec::new();
            if queries::count_for_plugin(tx, plugin_id)? == 0 {
                let plugin = fetch_plugin(tx, plugin_id)?;
                if plugin.lifecycle_status != LifecycleStatus::Registered {
                    if plugin.lifecycle_status != LifecycleStatus::Uninstalling {
                        changes.push(transition(tx, plugin_id, LifecycleStatus::Uninstalling)?.change());
                    }
                    changes.push(transition(tx, plugin_id, LifecycleStatus::Registered)?.change());
                }
            }
            Ok(changes)
        })
    }

    /// Attempt a single direct transition; used for best-effort rollbacks.
    pub fn reset_status(&self, plugin_id: &str, target: LifecycleStatus) -> BerthResult<StatusChange> {
        self.db
            .transaction(|tx| Ok(transition(tx, plugin_id, target)?.change()))
    }

    /// Replace the tenant's configuration document (must be an object)
    pub fn update_configuration(
        &self,
        tenant_id: &str,
        plugin_id: &str,
        configuration: serde_json::Value,
    ) -> BerthResult<TenantInstallation> {
        if !configuration.is_object() {
            return Err(BerthError::InvalidConfiguration(
                "plugin configuration must be a JSON object".to_string(),
            ));
        }

        self.db.transaction(|tx| {
            let installation = require_row(tx, tenant_id, plugin_id)?;
            let now = Utc::now();
            queries::set_configuration(tx, tenant_id, plugin_id, &configuration, now)?;
            Ok(TenantInstallation {
                configuration,
                updated_at: now,
                ..installation
            })
        })
    }

    /// Return a plugin stuck in UNINSTALLED, or in UNINSTALLING with no rows left, to REGISTERED
    pub fn recover(&self, plugin_id: &str) -> BerthResult<Vec<StatusChange>> {
        self.db.transaction(|tx| {
            let plugin = find_plugin(tx, plugin_id)?
                .ok_or_else(|| BerthError::PluginNotFound(plugin_id.to_string()))?;

            let orphaned_uninstall = plugin.lifecycle_status == LifecycleStatus::Uninstalling
                && queries::count_for_plugin(tx, plugin_id)? == 0;
            if plugin.lifecycle_status != LifecycleStatus::Uninstalled && !orphaned_uninstall {
                return Err(BerthError::InvalidTransition {
                    plugin_id: plugin_id.to_string(),
                    from: plugin.lifecycle_status,
                    to: LifecycleStatus::Registered,
                });
            }

            Ok(vec![transition(tx, plugin_id, LifecycleStatus::Registered)?.change()])
        })
    }
}

fn require_row(
    conn: &rusqlite::Connection,
    tenant_id: &str,
    plugin_id: &str,
) -> BerthResult<TenantInstallation> {
    queries::find(conn, tenant_id, plugin_id)?
        .ok_or_else(|| BerthError::not_installed(tenant_id, plugin_id))
}
