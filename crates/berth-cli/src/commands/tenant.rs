//! Tenant-scoped ledger commands

use anyhow::{Context, Result, bail};
use berth_core::{InstalledPlugin, Orchestrator, TenantInstallation};

use crate::args::Target;

/// Parse the `--config-json` argument
pub fn parse_configuration(raw: Option<&str>) -> Result<serde_json::Value> {
    let Some(raw) = raw else {
        return Ok(serde_json::json!({}));
    };
    let value: serde_json::Value =
        serde_json::from_str(raw).context("Plugin configuration is not valid JSON")?;
    if !value.is_object() {
        bail!("Plugin configuration must be a JSON object");
    }
    Ok(value)
}

pub async fn install(
    orchestrator: &Orchestrator,
    target: &Target,
    configuration: Option<&str>,
) -> Result<TenantInstallation> {
    let configuration = parse_configuration(configuration)?;
    Ok(orchestrator
        .install(&target.tenant, &target.plugin, configuration)
        .await?)
}

pub async fn activate(orchestrator: &Orchestrator, target: &Target) -> Result<TenantInstallation> {
    Ok(orchestrator.activate(&target.tenant, &target.plugin).await?)
}

pub async fn deactivate(orchestrator: &Orchestrator, target: &Target) -> Result<TenantInstallation> {
    Ok(orchestrator.deactivate(&target.tenant, &target.plugin).await?)
}

pub async fn uninstall(orchestrator: &Orchestrator, target: &Target) -> Result<TenantInstallation> {
    Ok(orchestrator.uninstall(&target.tenant, &target.plugin).await?)
}

pub async fn enable(orchestrator: &Orchestrator, target: &Target) -> Result<TenantInstallation> {
    Ok(orchestrator
        .enable_for_tenant(&target.tenant, &target.plugin)
        .await?)
}

pub async fn disable(orchestrator: &Orchestrator, target: &Target) -> Result<TenantInstallation> {
    Ok(orchestrator
        .disable_for_tenant(&target.tenant, &target.plugin)
        .await?)
}

pub fn list(orchestrator: &Orchestrator, tenant_id: &str) -> Result<Vec<InstalledPlugin>> {
    Ok(orchestrator.get_installed_plugins(tenant_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_defaults_to_empty_object() {
        assert_eq!(parse_configuration(None).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_configuration_must_be_object() {
        assert!(parse_configuration(Some("[1, 2]")).is_err());
        assert!(parse_configuration(Some("{oops")).is_err());
        assert_eq!(
            parse_configuration(Some(r#"{"region": "eu"}"#)).unwrap()["region"],
            "eu"
        );
    }
}
