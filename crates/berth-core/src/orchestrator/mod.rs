//! Plugin lifecycle orchestrator
//!
//! Coordinates the ledger, the lifecycle state machine, the container adapter
//! and the gatekeepers. Every operation follows the same shape:
//!
//! 1. optimistic precondition read (fail fast, nothing touched)
//! 2. one ledger transaction that re-checks and writes
//! 3. container and gatekeeper side effects outside the transaction
//! 4. compensating writes or logged warnings when a side effect fails
//! 5. lifecycle events for what committed

mod activate;
mod deactivate;
mod install;
mod locks;
mod registry;
mod tenant;
mod uninstall;


pub use locks::PluginLocks;

use std::sync::Arc;

use crate::config::{BerthConfig, ContainerBackend, ContainerSettings};
use crate::container::{
    ContainerAdapter, DockerContainerAdapter, HealthPolicy, NoopContainerAdapter,
};
use crate::error::{BerthError, BerthResult};
use crate::events::{EventBus, EventNotifier, LifecycleEvent};
use crate::gatekeepers::{
    ConventionalTenantDirectory, DependencyResolver, MigrationRunner, PermissionRegistrar,
    SqliteDependencyResolver, SqliteMigrationRunner, SqlitePermissionRegistrar, Tenant,
    TenantDirectory,
};
use crate::ledger::Ledger;
use crate::plugins::{PluginStore, StatusChange};
use crate::storage::Database;

/// Façade over the plugin lifecycle
pub struct Orchestrator {
    store: PluginStore,
    ledger: Ledger,
    container: Arc<dyn ContainerAdapter>,
    permissions: Arc<dyn PermissionRegistrar>,
    migrations: Arc<dyn MigrationRunner>,
    dependencies: Arc<dyn DependencyResolver>,
    tenants: Arc<dyn TenantDirectory>,
    events: Arc<dyn EventNotifier>,
    health: HealthPolicy,
    container_settings: ContainerSettings,
    locks: PluginLocks,
}

impl Orchestrator {
    /// Start building an orchestrator over a database
    pub fn builder(db: Arc<Database>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(db)
    }

    /// Open the configured database and container backend
    pub fn from_config(config: &BerthConfig) -> BerthResult<Self> {
        let db = Arc::new(Database::open(&config.database)?);
        let container: Arc<dyn ContainerAdapter> = match config.container.backend {
            ContainerBackend::Docker => Arc::new(DockerContainerAdapter::new(&config.container)),
            ContainerBackend::Noop => Arc::new(NoopContainerAdapter::new()),
        };

        Self::builder(db)
            .container(container)
            .container_settings(config.container.clone())
            .health_policy(HealthPolicy::from(&config.health))
            .events(Arc::new(EventBus::new(config.events.capacity)))
            .build()
    }

    /// The plugin registry
    pub fn store(&self) -> &PluginStore {
        &self.store
    }

    /// The installation ledger
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Name of the container backend in use
    pub fn container_backend(&self) -> &'static str {
        self.container.name()
    }

    async fn resolve_tenant(&self, tenant_id: &str) -> BerthResult<Tenant> {
        self.tenants
            .resolve(tenant_id)
            .await?
            .ok_or_else(|| BerthError::TenantNotFound(tenant_id.to_string()))
    }

    fn publish_changes(&self, plugin_id: &str, changes: &[StatusChange]) {
        for change in changes {
            self.events
                .notify(LifecycleEvent::status_changed(plugin_id, *change));
        }
    }

    /// Stop the container, logging instead of failing
    async fn stop_quietly(&self, plugin_id: &str, operation: &'static str) -> bool {
        match self.container.stop(plugin_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(plugin_id, operation, error = %e, "Failed to stop plugin container");
                false
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("container", &self.container.name())
            .field("health", &self.health)
            .field("network", &self.container_settings.network)
            .finish()
    }
}

/// Builder for [`Orchestrator`]
///
/// Only the container adapter is mandatory. Gatekeepers default to the SQLite
/// implementations over the same database, events to an [`EventBus`].
pub struct OrchestratorBuilder {
    db: Arc<Database>,
    container: Option<Arc<dyn ContainerAdapter>>,
    permissions: Option<Arc<dyn PermissionRegistrar>>,
    migrations: Option<Arc<dyn MigrationRunner>>,
    dependencies: Option<Arc<dyn DependencyResolver>>,
    tenants: Option<Arc<dyn TenantDirectory>>,
    events: Option<Arc<dyn EventNotifier>>,
    health: HealthPolicy,
    container_settings: ContainerSettings,
}

impl OrchestratorBuilder {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            container: None,
            permissions: None,
            migrations: None,
            dependencies: None,
            tenants: None,
            events: None,
            health: HealthPolicy::default(),
            container_settings: ContainerSettings::default(),
        }
    }

    /// Set the container adapter
    pub fn container(mut self, container: Arc<dyn ContainerAdapter>) -> Self {
        self.container = Some(container);
        self
    }

    /// Set the permission registrar
    pub fn permissions(mut self, permissions: Arc<dyn PermissionRegistrar>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Set the migration runner
    pub fn migrations(mut self, migrations: Arc<dyn MigrationRunner>) -> Self {
        self.migrations = Some(migrations);
        self
    }

    /// Set the dependency resolver
    pub fn dependencies(mut self, dependencies: Arc<dyn DependencyResolver>) -> Self {
        self.dependencies = Some(dependencies);
        self
    }

    /// Set the tenant directory
    pub fn tenants(mut self, tenants: Arc<dyn TenantDirectory>) -> Self {
        self.tenants = Some(tenants);
        self
    }

    /// Set the event notifier
    pub fn events(mut self, events: Arc<dyn EventNotifier>) -> Self {
        self.events = Some(events);
        self
    }

    /// Set health polling during activation
    pub fn health_policy(mut self, health: HealthPolicy) -> Self {
        self.health = health;
        self
    }

    /// Set network and default resource limits for plugin containers
    pub fn container_settings(mut self, settings: ContainerSettings) -> Self {
        self.container_settings = settings;
        self
    }

    /// Build the orchestrator
    pub fn build(self) -> BerthResult<Orchestrator> {
        let container = self
            .container
            .ok_or_else(|| BerthError::config("a container adapter is required"))?;
        if self.health.poll_interval.is_zero() {
            return Err(BerthError::config("health poll interval must be positive"));
        }

        let db = self.db;
        Ok(Orchestrator {
            store: PluginStore::new(db.clone()),
            ledger: Ledger::new(db.clone()),
            container,
            permissions: self
                .permissions
                .unwrap_or_else(|| Arc::new(SqlitePermissionRegistrar::new(db.clone()))),
            migrations: self
                .migrations
                .unwrap_or_else(|| Arc::new(SqliteMigrationRunner::new(db.clone()))),
            dependencies: self
                .dependencies
                .unwrap_or_else(|| Arc::new(SqliteDependencyResolver::new(db.clone()))),
            tenants: self
                .tenants
                .unwrap_or_else(|| Arc::new(ConventionalTenantDirectory::new())),
            events: self.events.unwrap_or_else(|| Arc::new(EventBus::default())),
            health: self.health,
            container_settings: self.container_settings,
            locks: PluginLocks::new(),
        })
    }
}
