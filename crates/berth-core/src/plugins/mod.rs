//! Plugins, their global lifecycle, and the manifest they are installed from
//!
//! Provides:
//! - [`LifecycleStatus`] and the [`transition`] state machine
//! - [`PluginManifest`], the validated typed view of the manifest document
//! - [`PluginStore`], the local plugin registry

mod lifecycle;
mod manifest;
mod store;

pub use lifecycle::{LifecycleStatus, MarketplaceStatus, StatusChange, Transition, transition};
pub use manifest::{
    DependencySpec, HealthCheckSpec, MigrationSpec, PermissionDeclaration, PluginManifest,
    ResourceLimits, RuntimeSpec,
};
pub use store::PluginStore;

pub(crate) use store::{fetch as fetch_plugin, find as find_plugin};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A plugin known to the platform
///
/// One row per plugin id. `lifecycle_status` is global: it says whether any
/// tenant currently has the plugin installed or running.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plugin {
    /// Plugin id
    pub id: String,
    /// Registered version
    pub version: String,
    /// Validated manifest
    pub manifest: PluginManifest,
    /// Marketplace review status
    pub marketplace_status: MarketplaceStatus,
    /// Global lifecycle status
    pub lifecycle_status: LifecycleStatus,
    /// Registration time
    pub created_at: DateTime<Utc>,
    /// Last lifecycle or registry update
    pub updated_at: DateTime<Utc>,
}
