//! SQL helpers for `tenant_installations`
//!
//! Every helper takes a connection so it can run inside the caller's
//! transaction; none of them caches anything.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{InstalledPlugin, TenantInstallation};
use crate::error::BerthResult;
use crate::plugins::LifecycleStatus;
use crate::storage::StorageError;

const INSTALLATION_COLUMNS: &str =
    "tenant_id, plugin_id, enabled, configuration, installed_at, updated_at";

fn installation_from_row(row: &Row<'_>) -> rusqlite::Result<(TenantInstallation, String)> {
    let configuration: String = row.get(3)?;
    Ok((
        TenantInstallation {
            tenant_id: row.get(0)?,
            plugin_id: row.get(1)?,
            enabled: row.get(2)?,
            configuration: serde_json::Value::Null,
            installed_at: row.get(4)?,
            updated_at: row.get(5)?,
        },
        configuration,
    ))
}

fn with_configuration(
    (mut installation, raw): (TenantInstallation, String),
) -> BerthResult<TenantInstallation> {
    installation.configuration = serde_json::from_str(&raw)?;
    Ok(installation)
}

pub(super) fn find(
    conn: &Connection,
    tenant_id: &str,
    plugin_id: &str,
) -> BerthResult<Option<TenantInstallation>> {
    conn.query_row(
        &format!(
            "SELECT {INSTALLATION_COLUMNS} FROM tenant_installations
             WHERE tenant_id = ?1 AND plugin_id = ?2"
        ),
        params![tenant_id, plugin_id],
        installation_from_row,
    )
    .optional()?
    .map(with_configuration)
    .transpose()
}

pub(super) fn count_for_plugin(conn: &Connection, plugin_id: &str) -> BerthResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tenant_installations WHERE plugin_id = ?1",
        params![plugin_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

pub(super) fn count_enabled(conn: &Connection, plugin_id: &str) -> BerthResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tenant_installations WHERE plugin_id = ?1 AND enabled = 1",
        params![plugin_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Enabled tenants other than `tenant_id`
pub(super) fn count_enabled_excluding(
    conn: &Connection,
    plugin_id: &str,
    tenant_id: &str,
) -> BerthResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tenant_installations
         WHERE plugin_id = ?1 AND enabled = 1 AND tenant_id != ?2",
        params![plugin_id, tenant_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

pub(super) fn insert(conn: &Connection, installation: &TenantInstallation) -> BerthResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO tenant_installations ({INSTALLATION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        ),
        params![
            installation.tenant_id,
            installation.plugin_id,
            installation.enabled,
            serde_json::to_string(&installation.configuration)?,
            installation.installed_at,
            installation.updated_at,
        ],
    )?;
    Ok(())
}

pub(super) fn delete(conn: &Connection, tenant_id: &str, plugin_id: &str) -> BerthResult<bool> {
    let deleted = conn.execute(
        "DELETE FROM tenant_installations WHERE tenant_id = ?1 AND plugin_id = ?2",
        params![tenant_id, plugin_id],
    )?;
    Ok(deleted > 0)
}

pub(super) fn set_enabled(
    conn: &Connection,
    tenant_id: &str,
    plugin_id: &str,
    enabled: bool,
    now: DateTime<Utc>,
) -> BerthResult<()> {
    conn.execute(
        "UPDATE tenant_installations SET enabled = ?1, updated_at = ?2
         WHERE tenant_id = ?3 AND plugin_id = ?4",
        params![enabled, now, tenant_id, plugin_id],
    )?;
    Ok(())
}

pub(super) fn set_configuration(
    conn: &Connection,
    tenant_id: &str,
    plugin_id: &str,
    configuration: &serde_json::Value,
    now: DateTime<Utc>,
) -> BerthResult<()> {
    conn.execute(
        "UPDATE tenant_installations SET configuration = ?1, updated_at = ?2
         WHERE tenant_id = ?3 AND plugin_id = ?4",
        params![serde_json::to_string(configuration)?, now, tenant_id, plugin_id],
    )?;
    Ok(())
}

pub(super) fn list_for_tenant(conn: &Connection, tenant_id: &str) -> BerthResult<Vec<InstalledPlugin>> {
    let mut stmt = conn.prepare(
        "SELECT i.tenant_id, i.plugin_id, i.enabled, i.configuration, i.installed_at, i.updated_at,
                p.version, p.lifecycle_status
         FROM tenant_installations i
         JOIN plugins p ON p.id = i.plugin_id
         WHERE i.tenant_id = ?1
         ORDER BY i.installed_at, i.plugin_id",
    )?;

    let rows = stmt
        .query_map(params![tenant_id], |row| {
            let installation = installation_from_row(row)?;
            let version: String = row.get(6)?;
            let status: String = row.get(7)?;
            Ok((installation, version, status))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(installation, version, status)| {
            let lifecycle_status = status.parse::<LifecycleStatus>().map_err(|_| {
                StorageError::InvalidValue {
                    column: "plugins.lifecycle_status",
                    value: status.clone(),
                }
            })?;
            Ok(InstalledPlugin {
                installation: with_configuration(installation)?,
                version,
                lifecycle_status,
            })
        })
        .collect()
}
