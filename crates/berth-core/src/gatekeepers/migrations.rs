//! Migration runner backed by `plugin_migrations`
//!
//! Plugin migration SQL may use the `{schema}` placeholder, replaced by the
//! tenant's schema name, to keep per-tenant objects apart.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::params;

use super::{AppliedMigration, MigrationRunner, Tenant};
use crate::error::{BerthError, BerthResult};
use crate::plugins::PluginManifest;
use crate::storage::Database;

const SCHEMA_PLACEHOLDER: &str = "{schema}";

#[derive(Debug, Clone)]
pub struct SqliteMigrationRunner {
    db: Arc<Database>,
}

impl SqliteMigrationRunner {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Versions already applied for the tenant
    pub fn applied_versions(&self, tenant_id: &str, plugin_id: &str) -> BerthResult<HashSet<u32>> {
        self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT version FROM plugin_migrations WHERE tenant_id = ?1 AND plugin_id = ?2",
            )?;
            let versions = stmt
                .query_map(params![tenant_id, plugin_id], |row| row.get::<_, u32>(0))?
                .collect::<Result<HashSet<_>, _>>()?;
            Ok(versions)
        })
    }
}

#[async_trait]
impl MigrationRunner for SqliteMigrationRunner {
    async fn run_plugin_migrations(
        &self,
        tenant: &Tenant,
        manifest: &PluginManifest,
    ) -> BerthResult<Vec<AppliedMigration>> {
        let done = self.applied_versions(&tenant.id, &manifest.id)?;
        let mut applied = Vec::new();

        for migration in manifest.migrations.iter().filter(|m| !done.contains(&m.version)) {
            let sql = migration.up.replace(SCHEMA_PLACEHOLDER, &tenant.schema_name);
            let applied_at = Utc::now();

            self.db.transaction(|tx| {
                tx.execute_batch(&sql).map_err(|e| BerthError::MigrationFailed {
                    plugin_id: manifest.id.clone(),
                    version: migration.version,
                    message: e.to_string(),
                })?;
                tx.execute(
                    "INSERT INTO plugin_migrations (tenant_id, plugin_id, version, name, applied_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![tenant.id, manifest.id, migration.version, migration.name, applied_at],
                )?;
                Ok::<_, BerthError>(())
            })?;

            tracing::info!(
                tenant_id = %tenant.id,
                plugin_id = %manifest.id,
                version = migration.version,
                "Applied plugin migration {}",
                migration.name
            );
            applied.push(AppliedMigration {
                version: migration.version,
                name: migration.name.clone(),
                applied_at,
            });
        }

        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> Tenant {
        Tenant {
            id: "acme".to_string(),
            schema_name: "tenant_acme".to_string(),
        }
    }

    #[tokio::test]
    async fn test_applies_pending_migrations_once() {
        let runner = SqliteMigrationRunner::new(Arc::new(Database::open_in_memory().unwrap()));
        let manifest = PluginManifest::new("crm", "1.0.0")
            .migration(1, "contacts", "CREATE TABLE {schema}_crm_contacts (id TEXT)")
            .migration(2, "notes", "CREATE TABLE {schema}_crm_notes (id TEXT)");

        let first = runner.run_plugin_migrations(&tenant(), &manifest).await.unwrap();
        assert_eq!(first.iter().map(|m| m.version).collect::<Vec<_>>(), vec![1, 2]);

        let second = runner.run_plugin_migrations(&tenant(), &manifest).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(
            runner.applied_versions("acme", "crm").unwrap(),
            HashSet::from([1, 2])
        );
    }

    #[tokio::test]
    async fn test_failed_migration_keeps_earlier_ones() {
        let runner = SqliteMigrationRunner::new(Arc::new(Database::open_in_memory().unwrap()));
        let manifest = PluginManifest::new("crm", "1.0.0")
            .migration(1, "contacts", "CREATE TABLE {schema}_crm_contacts (id TEXT)")
            .migration(2, "broken", "CREATE TABLE oops (");

        let err = runner
            .run_plugin_migrations(&tenant(), &manifest)
            .await
            .unwrap_err();
        assert!(matches!(err, BerthError::MigrationFailed { version: 2, .. }));
        assert_eq!(
            runner.applied_versions("acme", "crm").unwrap(),
            HashSet::from([1])
        );
    }
}
