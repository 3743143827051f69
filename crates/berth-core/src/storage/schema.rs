//! Database schema and migration management

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use super::StorageError;

/// Schema version identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaVersion(pub u32);

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A schema migration
#[derive(Debug, Clone, Copy)]
pub struct SchemaMigration {
    /// Version this migration upgrades to
    pub version: SchemaVersion,
    /// Migration description
    pub name: &'static str,
    /// SQL for upgrading
    pub up_sql: &'static str,
}

/// Ordered schema migrations
pub const SCHEMA_MIGRATIONS: &[SchemaMigration] = &[
    SchemaMigration {
        version: SchemaVersion(1),
        name: "plugins and tenant installations",
        up_sql: r#"
CREATE TABLE plugins (
    id TEXT PRIMARY KEY,
    version TEXT NOT NULL,
    manifest TEXT NOT NULL,
    marketplace_status TEXT NOT NULL DEFAULT 'draft',
    lifecycle_status TEXT NOT NULL DEFAULT 'REGISTERED',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE tenant_installations (
    tenant_id TEXT NOT NULL,
    plugin_id TEXT NOT NULL REFERENCES plugins(id) ON DELETE CASCADE,
    enabled INTEGER NOT NULL DEFAULT 0,
    configuration TEXT NOT NULL DEFAULT '{}',
    installed_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (tenant_id, plugin_id)
);

CREATE INDEX idx_tenant_installations_plugin
    ON tenant_installations (plugin_id, enabled);
"#,
    },
    SchemaMigration {
        version: SchemaVersion(2),
        name: "gatekeeper bookkeeping",
        up_sql: r#"
CREATE TABLE plugin_dependencies (
    plugin_id TEXT NOT NULL REFERENCES plugins(id) ON DELETE CASCADE,
    depends_on TEXT NOT NULL,
    version_range TEXT NOT NULL DEFAULT '*',
    required INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (plugin_id, depends_on)
);

CREATE INDEX idx_plugin_dependencies_target
    ON plugin_dependencies (depends_on);

CREATE TABLE tenant_permissions (
    tenant_id TEXT NOT NULL,
    permission_key TEXT NOT NULL,
    owner TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    PRIMARY KEY (tenant_id, permission_key)
);

CREATE TABLE plugin_migrations (
    tenant_id TEXT NOT NULL,
    plugin_id TEXT NOT NULL,
    version INTEGER NOT NULL,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL,
    PRIMARY KEY (tenant_id, plugin_id, version)
);
"#,
    },
];

fn ensure_version_table(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )?;
    Ok(())
}

/// Latest applied schema version (0 for a fresh database)
pub(crate) fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    ensure_version_table(conn)?;
    let version: Option<i64> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get(0)
        })
        .optional()?
        .flatten();

    match version {
        None => Ok(0),
        Some(v) => u32::try_from(v).map_err(|_| StorageError::InvalidValue {
            column: "schema_version.version",
            value: v.to_string(),
        }),
    }
}

/// Apply pending migrations, each in its own transaction
pub(crate) fn migrate(conn: &mut Connection) -> Result<usize, StorageError> {
    let current = current_version(conn)?;
    let mut applied = 0usize;

    for migration in SCHEMA_MIGRATIONS {
        if migration.version.0 <= current {
            continue;
        }

        tracing::info!(
            "Running schema migration {} ({})",
            migration.version,
            migration.name
        );

        let tx = conn.transaction()?;
        tx.execute_batch(migration.up_sql).map_err(|e| {
            StorageError::Migration(format!("{} ({}): {}", migration.version, migration.name, e))
        })?;
        tx.execute(
            "INSERT INTO schema_version (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version.0, migration.name, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        applied += 1;
    }

    Ok(applied)
}
