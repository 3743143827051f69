//! Collaborators consulted or invoked during install and uninstall
//!
//! The orchestrator depends only on the traits here. SQLite-backed
//! implementations sharing the ledger database are provided so the
//! orchestrator can run end to end without external services.

mod dependencies;
mod migrations;
mod permissions;
mod tenants;

pub use dependencies::{SqliteDependencyResolver, version_satisfies};
pub use migrations::SqliteMigrationRunner;
pub use permissions::{SqlitePermissionRegistrar, plugin_owner};
pub use tenants::ConventionalTenantDirectory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::BerthResult;
use crate::plugins::{DependencySpec, PermissionDeclaration, PluginManifest};

/// A resolved tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tenant {
    pub id: String,
    /// Database schema holding the tenant's plugin tables
    pub schema_name: String,
}

/// A plugin migration applied for a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedMigration {
    pub version: u32,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// Dependency edge `plugin_id -> depends_on`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
    pub plugin_id: String,
    pub depends_on: String,
    pub version_range: String,
    pub required: bool,
}

impl DependencyEdge {
    /// Edge declared in a manifest
    pub fn from_spec(plugin_id: &str, spec: &DependencySpec) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            depends_on: spec.plugin_id.clone(),
            version_range: spec.version_range.clone(),
            required: spec.required,
        }
    }

    /// All edges declared by a manifest
    pub fn from_manifest(manifest: &PluginManifest) -> Vec<Self> {
        manifest
            .dependencies
            .iter()
            .map(|spec| Self::from_spec(&manifest.id, spec))
            .collect()
    }
}

/// Answer to [`DependencyResolver::can_uninstall`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UninstallCheck {
    pub can_uninstall: bool,
    /// Plugins installed for the tenant that require this one
    pub blocked_by: Vec<String>,
}

/// Registers per-tenant permission keys declared by a plugin
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionRegistrar: Send + Sync {
    /// Register the keys, failing `PermissionKeyConflict` if any key is owned
    /// by someone else. Nothing is written on conflict.
    async fn register_plugin_permissions(
        &self,
        tenant: &Tenant,
        plugin_id: &str,
        permissions: &[PermissionDeclaration],
    ) -> BerthResult<()>;

    /// Remove every key the plugin owns for the tenant, returning how many
    async fn remove_plugin_permissions(&self, tenant: &Tenant, plugin_id: &str) -> BerthResult<usize>;
}

/// Applies a plugin's schema migrations in a tenant schema
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MigrationRunner: Send + Sync {
    async fn run_plugin_migrations(
        &self,
        tenant: &Tenant,
        manifest: &PluginManifest,
    ) -> BerthResult<Vec<AppliedMigration>>;
}

/// Dependency-graph bookkeeping consumed as gate checks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// Replace the plugin's outgoing edges
    async fn register_dependencies(&self, plugin_id: &str, edges: &[DependencyEdge]) -> BerthResult<()>;

    /// Required dependencies not satisfied for the tenant
    async fn missing_dependencies(&self, plugin_id: &str, tenant_id: &str) -> BerthResult<Vec<String>>;

    /// Whether the tenant can drop the plugin without stranding dependents
    async fn can_uninstall(&self, plugin_id: &str, tenant_id: &str) -> BerthResult<UninstallCheck>;
}

/// Resolves tenant records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn resolve(&self, tenant_id: &str) -> BerthResult<Option<Tenant>>;
}
