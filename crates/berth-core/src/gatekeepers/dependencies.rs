//! Dependency resolver backed by `plugin_dependencies`

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::params;
use semver::{Version, VersionReq};

use super::{DependencyEdge, DependencyResolver, UninstallCheck};
use crate::error::BerthResult;
use crate::storage::Database;

#[derive(Debug, Clone)]
pub struct SqliteDependencyResolver {
    db: Arc<Database>,
}

impl SqliteDependencyResolver {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

/// Check an installed version against a cargo-style requirement
/// (`*`, `=1.2.3`, `>=1.5`, `^0.3`, `~1.2`, `>=1.0, <2.0`).
///
/// A bare version means `^version`. Unparseable versions or ranges never match.
pub fn version_satisfies(version: &str, range: &str) -> bool {
    let range = range.trim();
    if range.is_empty() {
        return true;
    }

    let Ok(req) = VersionReq::parse(range) else {
        tracing::debug!(range, "Unparseable dependency version range");
        return false;
    };
    Version::parse(version.trim())
        .map(|version| req.matches(&version))
        .unwrap_or(false)
}

#[async_trait]
impl DependencyResolver for SqliteDependencyResolver {
    async fn register_dependencies(&self, plugin_id: &str, edges: &[DependencyEdge]) -> BerthResult<()> {
        self.db.transaction(|tx| {
            tx.execute(
                "DELETE FROM plugin_dependencies WHERE plugin_id = ?1",
                params![plugin_id],
            )?;
            for edge in edges {
                tx.execute(
                    "INSERT INTO plugin_dependencies (plugin_id, depends_on, version_range, required)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![plugin_id, edge.depends_on, edge.version_range, edge.required],
                )?;
            }
            Ok(())
        })
    }

    async fn missing_dependencies(&self, plugin_id: &str, tenant_id: &str) -> BerthResult<Vec<String>> {
        let rows: Vec<(String, String, Option<String>)> = self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT d.depends_on, d.version_range, p.version
                 FROM plugin_dependencies d
                 LEFT JOIN tenant_installations i
                    ON i.plugin_id = d.depends_on AND i.tenant_id = ?2
                 LEFT JOIN plugins p
                    ON p.id = i.plugin_id
                 WHERE d.plugin_id = ?1 AND d.required = 1
                 ORDER BY d.depends_on",
            )?;
            let rows = stmt
                .query_map(params![plugin_id, tenant_id], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok::<_, crate::error::BerthError>(rows)
        })?;

        Ok(rows
            .into_iter()
            .filter(|(_, range, installed)| match installed {
                Some(version) => !version_satisfies(version, range),
                None => true,
            })
            .map(|(depends_on, range, _)| {
                if range == "*" {
                    depends_on
                } else {
                    format!("{} {}", depends_on, range)
                }
            })
            .collect())
    }

    async fn can_uninstall(&self, plugin_id: &str, tenant_id: &str) -> BerthResult<UninstallCheck> {
        let blocked_by: Vec<String> = self.db.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT d.plugin_id
                 FROM plugin_dependencies d
                 JOIN tenant_installations i
                    ON i.plugin_id = d.plugin_id AND i.tenant_id = ?2
                 WHERE d.depends_on = ?1 AND d.required = 1
                 ORDER BY d.plugin_id",
            )?;
            let ids = stmt
                .query_map(params![plugin_id, tenant_id], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok::<_, crate::error::BerthError>(ids)
        })?;

        Ok(UninstallCheck {
            can_uninstall: blocked_by.is_empty(),
            blocked_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::plugins::{MarketplaceStatus, PluginStore};
    use serde_json::json;

    #[test]
    fn test_version_ranges() {
        assert!(version_satisfies("1.2.3", "*"));
        assert!(version_satisfies("1.2.3", "=1.2.3"));
        assert!(!version_satisfies("1.2.4", "=1.2.3"));
        assert!(version_satisfies("2.0.0", ">=1.5"));
        assert!(!version_satisfies("1.4.9", ">=1.5"));
        assert!(version_satisfies("1.9.0", "^1.2"));
        assert!(!version_satisfies("2.0.0", "^1.2"));
        assert!(version_satisfies("0.3.5", "^0.3.1"));
        assert!(!version_satisfies("0.4.0", "^0.3.1"));
        // bare versions are caret requirements
        assert!(version_satisfies("1.4.0", "1.2.3"));
        assert!(!version_satisfies("2.0.0", "1.2.3"));
    }

    #[test]
    fn test_caret_on_patch_zero_line_is_exact() {
        assert!(version_satisfies("0.0.3", "^0.0.3"));
        assert!(!version_satisfies("0.0.5", "^0.0.3"));
    }

    #[test]
    fn test_tilde_and_compound_ranges() {
        assert!(version_satisfies("1.2.7", "~1.2"));
        assert!(!version_satisfies("1.3.0", "~1.2"));
        assert!(version_satisfies("1.5.0", ">=1.0, <2.0"));
        assert!(!version_satisfies("2.0.0", ">=1.0, <2.0"));
    }

    #[test]
    fn test_unparseable_never_matches() {
        assert!(!version_satisfies("latest", ">=1.0"));
        assert!(!version_satisfies("1.2.3", "not a range"));
        assert!(!version_satisfies("1.2.3-beta.1", "^1.2"));
    }

    struct Fixture {
        resolver: SqliteDependencyResolver,
        ledger: Ledger,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let store = PluginStore::new(db.clone());
        for (id, version) in [("auth", "2.1.0"), ("crm", "1.0.0")] {
            store.register(&json!({"id": id, "version": version})).unwrap();
            store
                .set_marketplace_status(id, MarketplaceStatus::Published)
                .unwrap();
        }

        let resolver = SqliteDependencyResolver::new(db.clone());
        resolver
            .register_dependencies(
                "crm",
                &[DependencyEdge {
                    plugin_id: "crm".into(),
                    depends_on: "auth".into(),
                    version_range: ">=2.0".into(),
                    required: true,
                }],
            )
            .await
            .unwrap();

        Fixture {
            resolver,
            ledger: Ledger::new(db),
        }
    }

    #[tokio::test]
    async fn test_missing_until_dependency_installed() {
        let f = fixture().await;
        assert_eq!(
            f.resolver.missing_dependencies("crm", "t1").await.unwrap(),
            vec!["auth >=2.0".to_string()]
        );

        f.ledger.install("t1", "auth", json!({})).unwrap();
        assert!(f
            .resolver
            .missing_dependencies("crm", "t1")
            .await
            .unwrap()
            .is_empty());
        // other tenants are unaffected
        assert_eq!(
            f.resolver.missing_dependencies("crm", "t2").await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_dependents_block_uninstall() {
        let f = fixture().await;
        f.ledger.install("t1", "auth", json!({})).unwrap();
        assert!(f.resolver.can_uninstall("auth", "t1").await.unwrap().can_uninstall);

        f.ledger.install("t1", "crm", json!({})).unwrap();
        let check = f.resolver.can_uninstall("auth", "t1").await.unwrap();
        assert!(!check.can_uninstall);
        assert_eq!(check.blocked_by, vec!["crm".to_string()]);

        assert!(f.resolver.can_uninstall("auth", "t2").await.unwrap().can_uninstall);
    }
}
