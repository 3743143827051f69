//! Permission registrar backed by `tenant_permissions`

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{OptionalExtension, params};

use super::{PermissionRegistrar, Tenant};
use crate::error::{BerthError, BerthResult};
use crate::plugins::PermissionDeclaration;
use crate::storage::Database;

/// Owner recorded for keys registered by a plugin
pub fn plugin_owner(plugin_id: &str) -> String {
    format!("plugin:{}", plugin_id)
}

#[derive(Debug, Clone)]
pub struct SqlitePermissionRegistrar {
    db: Arc<Database>,
}

impl SqlitePermissionRegistrar {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Claim a key for a non-plugin owner (core features, other services)
    pub fn reserve(&self, tenant_id: &str, key: &str, owner: &str, name: &str) -> BerthResult<()> {
        self.db.transaction(|tx| {
            tx.execute(
                "INSERT INTO tenant_permissions (tenant_id, permission_key, owner, name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (tenant_id, permission_key) DO UPDATE SET owner = ?3, name = ?4",
                params![tenant_id, key, owner, name, Utc::now()],
            )?;
            Ok(())
        })
    }

    /// Current owner of a key
    pub fn owner_of(&self, tenant_id: &str, key: &str) -> BerthResult<Option<String>> {
        self.db.read(|conn| {
            Ok(conn
                .query_row(
                    "SELECT owner FROM tenant_permissions WHERE tenant_id = ?1 AND permission_key = ?2",
                    params![tenant_id, key],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }
}

#[async_trait]
impl PermissionRegistrar for SqlitePermissionRegistrar {
    async fn register_plugin_permissions(
        &self,
        tenant: &Tenant,
        plugin_id: &str,
        permissions: &[PermissionDeclaration],
    ) -> BerthResult<()> {
        let owner = plugin_owner(plugin_id);

        self.db.transaction(|tx| {
            for permission in permissions {
                let existing: Option<String> = tx
                    .query_row(
                        "SELECT owner FROM tenant_permissions WHERE tenant_id = ?1 AND permission_key = ?2",
                        params![tenant.id, permission.key],
                        |row| row.get(0),
                    )
                    .optional()?;

                match existing {
                    Some(current) if current != owner => {
                        return Err(BerthError::PermissionKeyConflict {
                            key: permission.key.clone(),
                            owner: current,
                        });
                    }
                    Some(_) => {
                        tx.execute(
                            "UPDATE tenant_permissions SET name = ?1, description = ?2
                             WHERE tenant_id = ?3 AND permission_key = ?4",
                            params![permission.name, permission.description, tenant.id, permission.key],
                        )?;
                    }
                    None => {
                        tx.execute(
                            "INSERT INTO tenant_permissions
                                (tenant_id, permission_key, owner, name, description, created_at)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                            params![
                                tenant.id,
                                permission.key,
                                owner,
                                permission.name,
                                permission.description,
                                Utc::now()
                            ],
                        )?;
                    }
                }
            }
            Ok(())
        })?;

        tracing::debug!(
            tenant_id = %tenant.id,
            plugin_id,
            count = permissions.len(),
            "Registered plugin permissions"
        );
        Ok(())
    }

    async fn remove_plugin_permissions(&self, tenant: &Tenant, plugin_id: &str) -> BerthResult<usize> {
        let owner = plugin_owner(plugin_id);
        self.db.transaction(|tx| {
            Ok(tx.execute(
                "DELETE FROM tenant_permissions WHERE tenant_id = ?1 AND owner = ?2",
                params![tenant.id, owner],
            )?)
        })
    }
}
