//! Berth Core Library
//!
//! This crate provides the plugin lifecycle orchestrator for a multi-tenant
//! platform where every plugin runs as one long-lived container shared by all
//! tenants that installed it.
//!
//! The main pieces are:
//! - [`plugins`]: the global lifecycle state machine and the manifest typed view
//! - [`ledger`]: per-tenant installation rows and the first/last tenant counting
//! - [`container`]: the container adapter (docker and no-op backends) and health polling
//! - [`gatekeepers`]: permission registrar, migration runner, dependency resolver
//! - [`orchestrator`]: the façade driving install/activate/deactivate/uninstall

pub mod config;
pub mod container;
pub mod error;
pub mod events;
pub mod gatekeepers;
pub mod ledger;
pub mod orchestrator;
pub mod plugins;
pub mod storage;

// Re-export commonly used types
pub use config::{BerthConfig, ContainerBackend, load_config};
pub use container::{
    ContainerAdapter, ContainerConfig, DockerContainerAdapter, HealthPolicy, HealthStatus,
    NoopContainerAdapter,
};
pub use error::{BerthError, BerthResult};
pub use events::{EventBus, EventNotifier, LifecycleEvent};
pub use gatekeepers::{
    DependencyResolver, MigrationRunner, PermissionRegistrar, Tenant, TenantDirectory,
};
pub use ledger::{InstalledPlugin, Ledger, TenantInstallation};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use plugins::{LifecycleStatus, MarketplaceStatus, Plugin, PluginManifest, PluginStore};
pub use storage::{Database, StorageError};
