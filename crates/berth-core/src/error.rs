//! Error types for Berth

use std::time::Duration;

use thiserror::Error;

use crate::plugins::{LifecycleStatus, MarketplaceStatus};
use crate::storage::StorageError;

/// Result type alias for Berth operations
pub type BerthResult<T> = Result<T, BerthError>;

/// Main error type for Berth
///
/// Ledger and state machine violations are reported before any container or
/// gatekeeper side effect is attempted, so a caller that receives one of the
/// "precondition" variants can assume nothing was started or registered.
#[derive(Error, Debug)]
pub enum BerthError {
    /// No ledger row exists for the tenant/plugin pair
    #[error("Plugin '{plugin_id}' is not installed for tenant '{tenant_id}'")]
    NotInstalled { tenant_id: String, plugin_id: String },

    /// A ledger row already exists for the tenant/plugin pair
    #[error("Plugin '{plugin_id}' is already installed for tenant '{tenant_id}'")]
    AlreadyInstalled { tenant_id: String, plugin_id: String },

    /// The tenant already has the plugin enabled
    #[error("Plugin '{plugin_id}' is already active for tenant '{tenant_id}'")]
    AlreadyActive { tenant_id: String, plugin_id: String },

    /// The tenant already has the plugin disabled
    #[error("Plugin '{plugin_id}' is already inactive for tenant '{tenant_id}'")]
    AlreadyInactive { tenant_id: String, plugin_id: String },

    /// Marketplace status does not allow installation
    #[error("Plugin '{plugin_id}' is not published (marketplace status: {status})")]
    NotPublished {
        plugin_id: String,
        status: MarketplaceStatus,
    },

    /// Plugin must be globally active for the requested tenant toggle
    #[error("Plugin '{plugin_id}' is not active (lifecycle status: {status})")]
    PluginNotActive {
        plugin_id: String,
        status: LifecycleStatus,
    },

    /// Unknown plugin id
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    /// Tenant record could not be resolved
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    /// Lifecycle edge outside the valid set
    #[error("Invalid lifecycle transition for plugin '{plugin_id}': {from} -> {to}")]
    InvalidTransition {
        plugin_id: String,
        from: LifecycleStatus,
        to: LifecycleStatus,
    },

    /// Container never reported healthy within the activation timeout
    #[error("Plugin '{plugin_id}' did not become healthy within {}ms", .waited.as_millis())]
    HealthCheckTimeout { plugin_id: String, waited: Duration },

    /// A declared permission key is owned by another actor
    #[error("Permission key '{key}' is already owned by '{owner}'")]
    PermissionKeyConflict { key: String, owner: String },

    /// Migrations failed after the ledger row was committed
    #[error("Installation of plugin '{plugin_id}' failed during migrations: {source}")]
    InstallationFailedDuringMigrations {
        plugin_id: String,
        #[source]
        source: Box<BerthError>,
    },

    /// A single plugin migration failed
    #[error("Migration {version} of plugin '{plugin_id}' failed: {message}")]
    MigrationFailed {
        plugin_id: String,
        version: u32,
        message: String,
    },

    /// Other installed plugins still require this one
    #[error("Plugin '{plugin_id}' is required by: {}", .blocked_by.join(", "))]
    DependencyBlocked {
        plugin_id: String,
        blocked_by: Vec<String>,
    },

    /// Required dependencies are not installed for the tenant
    #[error("Plugin '{plugin_id}' has unsatisfied dependencies: {}", .missing.join(", "))]
    DependencyUnsatisfied {
        plugin_id: String,
        missing: Vec<String>,
    },

    /// Disabling would leave an active plugin without any enabled tenant
    #[error(
        "Tenant '{tenant_id}' is the last enabled tenant of plugin '{plugin_id}'; deactivate it instead"
    )]
    LastEnabledTenant { tenant_id: String, plugin_id: String },

    /// Container runtime failure, scoped to the plugin
    #[error("Container {operation} failed for plugin '{plugin_id}': {message}")]
    ContainerRuntime {
        operation: &'static str,
        plugin_id: String,
        message: String,
    },

    /// Manifest document failed validation
    #[error("Invalid plugin manifest: {0}")]
    InvalidManifest(String),

    /// Tenant configuration document is not acceptable
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Orchestrator configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage failure without operation context
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Storage failure with the operation and plugin attached
    #[error("{operation} failed for plugin '{plugin_id}': {source}")]
    Operation {
        operation: &'static str,
        plugin_id: String,
        #[source]
        source: StorageError,
    },
}

impl BerthError {
    /// Create a not-installed error
    pub fn not_installed(tenant_id: impl Into<String>, plugin_id: impl Into<String>) -> Self {
        Self::NotInstalled {
            tenant_id: tenant_id.into(),
            plugin_id: plugin_id.into(),
        }
    }

    /// Create an already-installed error
    pub fn already_installed(tenant_id: impl Into<String>, plugin_id: impl Into<String>) -> Self {
        Self::AlreadyInstalled {
            tenant_id: tenant_id.into(),
            plugin_id: plugin_id.into(),
        }
    }

    /// Create an already-active error
    pub fn already_active(tenant_id: impl Into<String>, plugin_id: impl Into<String>) -> Self {
        Self::AlreadyActive {
            tenant_id: tenant_id.into(),
            plugin_id: plugin_id.into(),
        }
    }

    /// Create an already-inactive error
    pub fn already_inactive(tenant_id: impl Into<String>, plugin_id: impl Into<String>) -> Self {
        Self::AlreadyInactive {
            tenant_id: tenant_id.into(),
            plugin_id: plugin_id.into(),
        }
    }

    /// Create a container runtime error
    pub fn container(
        operation: &'static str,
        plugin_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ContainerRuntime {
            operation,
            plugin_id: plugin_id.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Attach operation context to storage failures.
    ///
    /// Typed lifecycle errors pass through unchanged.
    pub fn in_operation(self, operation: &'static str, plugin_id: &str) -> Self {
        match self {
            Self::Storage(source) => Self::Operation {
                operation,
                plugin_id: plugin_id.to_string(),
                source,
            },
            other => other,
        }
    }

    /// Whether this is a lifecycle edge violation
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    /// Whether this error was raised by the container runtime layer
    pub fn is_container_error(&self) -> bool {
        matches!(self, Self::ContainerRuntime { .. })
    }
}

impl From<rusqlite::Error> for BerthError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Storage(StorageError::from(error))
    }
}

impl From<serde_json::Error> for BerthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Storage(StorageError::from(error))
    }
}
