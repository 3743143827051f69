//! Plugin registry backed by the `plugins` table

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{LifecycleStatus, MarketplaceStatus, Plugin, PluginManifest};
use crate::error::{BerthError, BerthResult};
use crate::storage::{Database, StorageError};

const PLUGIN_COLUMNS: &str =
    "id, version, manifest, marketplace_status, lifecycle_status, created_at, updated_at";

struct PluginRow {
    id: String,
    version: String,
    manifest: String,
    marketplace_status: String,
    lifecycle_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PluginRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            version: row.get(1)?,
            manifest: row.get(2)?,
            marketplace_status: row.get(3)?,
            lifecycle_status: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_plugin(self) -> BerthResult<Plugin> {
        let document: serde_json::Value = serde_json::from_str(&self.manifest)?;
        let manifest = PluginManifest::from_value(&document)?;
        let marketplace_status = self
            .marketplace_status
            .parse::<MarketplaceStatus>()
            .map_err(|_| StorageError::InvalidValue {
                column: "plugins.marketplace_status",
                value: self.marketplace_status.clone(),
            })?;
        let lifecycle_status = self
            .lifecycle_status
            .parse::<LifecycleStatus>()
            .map_err(|_| StorageError::InvalidValue {
                column: "plugins.lifecycle_status",
                value: self.lifecycle_status.clone(),
            })?;

        Ok(Plugin {
            id: self.id,
            version: self.version,
            manifest,
            marketplace_status,
            lifecycle_status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Look up a plugin on an open connection or transaction
pub(crate) fn find(conn: &Connection, plugin_id: &str) -> BerthResult<Option<Plugin>> {
    let row = conn
        .query_row(
            &format!("SELECT {PLUGIN_COLUMNS} FROM plugins WHERE id = ?1"),
            params![plugin_id],
            PluginRow::from_row,
        )
        .optional()?;

    row.map(PluginRow::into_plugin).transpose()
}

/// Like [`find`], failing with `PluginNotFound`
pub(crate) fn fetch(conn: &Connection, plugin_id: &str) -> BerthResult<Plugin> {
    find(conn, plugin_id)?.ok_or_else(|| BerthError::PluginNotFound(plugin_id.to_string()))
}

/// Local implementation of the plugin registry contract
#[derive(Debug, Clone)]
pub struct PluginStore {
    db: Arc<Database>,
}

impl PluginStore {
    /// Create a store over the shared database
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Register a plugin from its manifest document.
    ///
    /// New plugins start REGISTERED with marketplace status `draft`. An existing
    /// plugin may only be re-registered (new version/manifest) while REGISTERED.
    pub fn register(&self, document: &serde_json::Value) -> BerthResult<Plugin> {
        let manifest = PluginManifest::from_value(document)?;
        let stored = serde_json::to_string(document)?;

        self.db.transaction(|tx| {
            let now = Utc::now();
            match find(tx, &manifest.id)? {
                Some(existing) if existing.lifecycle_status != LifecycleStatus::Registered => {
                    Err(BerthError::InvalidTransition {
                        plugin_id: manifest.id.clone(),
                        from: existing.lifecycle_status,
                        to: LifecycleStatus::Registered,
                    })
                }
                Some(_) => {
                    tx.execute(
                        "UPDATE plugins SET version = ?1, manifest = ?2, updated_at = ?3 WHERE id = ?4",
                        params![manifest.version, stored, now, manifest.id],
                    )?;
                    tracing::info!(
                        "Updated registration of plugin {} to {}",
                        manifest.id,
                        manifest.version
                    );
                    fetch(tx, &manifest.id)
                }
                None => {
                    tx.execute(
                        "INSERT INTO plugins (id, version, manifest, marketplace_status, lifecycle_status, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                        params![
                            manifest.id,
                            manifest.version,
                            stored,
                            MarketplaceStatus::Draft.as_str(),
                            LifecycleStatus::Registered.as_str(),
                            now
                        ],
                    )?;
                    tracing::info!("Registered plugin {} {}", manifest.id, manifest.version);
                    fetch(tx, &manifest.id)
                }
            }
        })
    }

    /// Get a plugin
    pub fn get(&self, plugin_id: &str) -> BerthResult<Plugin> {
        self.db.read(|conn| fetch(conn, plugin_id))
    }

    /// List all plugins ordered by id
    pub fn list(&self) -> BerthResult<Vec<Plugin>> {
        self.db.read(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {PLUGIN_COLUMNS} FROM plugins ORDER BY id"))?;
            let rows = stmt
                .query_map([], PluginRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(PluginRow::into_plugin).collect()
        })
    }

    /// Record a marketplace review decision
    pub fn set_marketplace_status(
        &self,
        plugin_id: &str,
        status: MarketplaceStatus,
    ) -> BerthResult<Plugin> {
        self.db.transaction(|tx| {
            let updated = tx.execute(
                "UPDATE plugins SET marketplace_status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), Utc::now(), plugin_id],
            )?;
            if updated == 0 {
                return Err(BerthError::PluginNotFound(plugin_id.to_string()));
            }
            tracing::info!("Plugin {} marketplace status set to {}", plugin_id, status);
            fetch(tx, plugin_id)
        })
    }
}
