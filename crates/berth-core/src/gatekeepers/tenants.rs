//! Tenant directory using the `tenant_<id>` schema convention

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::{Tenant, TenantDirectory};
use crate::error::BerthResult;

/// Tenant ids usable as schema name suffixes
static TENANT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,63}$").expect("tenant id pattern"));

/// Resolves any well-formed tenant id to schema `tenant_<id>`
#[derive(Debug, Clone, Copy, Default)]
pub struct ConventionalTenantDirectory;

impl ConventionalTenantDirectory {
    pub fn new() -> Self {
        Self
    }

    /// Schema name for a tenant id
    pub fn schema_name(tenant_id: &str) -> String {
        format!("tenant_{}", tenant_id.replace('-', "_").to_lowercase())
    }
}

#[async_trait]
impl TenantDirectory for ConventionalTenantDirectory {
    async fn resolve(&self, tenant_id: &str) -> BerthResult<Option<Tenant>> {
        if !TENANT_ID.is_match(tenant_id) {
            return Ok(None);
        }
        Ok(Some(Tenant {
            id: tenant_id.to_string(),
            schema_name: Self::schema_name(tenant_id),
        }))
    }
}
