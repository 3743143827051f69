//! Plugin manifest typed view
//!
//! The registry stores the manifest as an opaque JSON document. It is parsed and
//! validated here once; the rest of the crate only sees [`PluginManifest`].

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BerthError, BerthResult};

/// Pattern for plugin ids
static PLUGIN_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9_-]{0,62}$").expect("plugin id pattern")
});

/// Plugin manifest describing runtime, permissions, dependencies and migrations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin id (unique across the platform)
    pub id: String,

    /// Plugin version
    pub version: String,

    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,

    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Container runtime declaration
    #[serde(default)]
    pub runtime: RuntimeSpec,

    /// Permission keys the plugin registers for each tenant
    #[serde(default)]
    pub permissions: Vec<PermissionDeclaration>,

    /// Other plugins this one depends on
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,

    /// Tenant schema migrations, applied in version order
    #[serde(default)]
    pub migrations: Vec<MigrationSpec>,
}

/// Container runtime section of the manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeSpec {
    /// Explicit image; defaults to `plugin-<id>:<version>`
    #[serde(default)]
    pub image: Option<String>,

    /// Environment variables
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Ports exposed on the plugin network
    #[serde(default)]
    pub ports: Vec<u16>,

    /// Resource limits
    #[serde(default)]
    pub resources: Option<ResourceLimits>,

    /// Container health check
    #[serde(default)]
    pub health_check: Option<HealthCheckSpec>,
}

/// Container resource limits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Memory limit in docker notation ("512m", "1g")
    #[serde(default)]
    pub memory: Option<String>,

    /// CPU share ("0.5" = half a core)
    #[serde(default)]
    pub cpu: Option<f64>,
}

/// Health check executed inside the container by the runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckSpec {
    /// Shell command; exit 0 means healthy
    pub command: String,

    /// Seconds between checks
    #[serde(default = "default_health_interval")]
    pub interval_secs: u64,

    /// Consecutive failures before unhealthy
    #[serde(default = "default_health_retries")]
    pub retries: u32,
}

fn default_health_interval() -> u64 {
    5
}

fn default_health_retries() -> u32 {
    3
}

/// A permission declared by the plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDeclaration {
    /// Globally meaningful key, e.g. `crm.contacts.read`
    pub key: String,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
}

/// Dependency on another plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Id of the plugin depended on
    pub plugin_id: String,

    /// Accepted versions as a semver requirement (`*`, `=1.2.0`, `^1.2`, `~1.2`, `>=1.0, <2.0`)
    #[serde(default = "default_version_range")]
    pub version_range: String,

    /// Optional dependencies never block install or uninstall
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_version_range() -> String {
    "*".to_string()
}

fn default_required() -> bool {
    true
}

/// A tenant schema migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSpec {
    /// Strictly increasing version
    pub version: u32,
    /// Description
    pub name: String,
    /// SQL applied in the tenant schema
    pub up: String,
}

impl PluginManifest {
    /// Create a minimal manifest
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            name: None,
            description: None,
            runtime: RuntimeSpec::default(),
            permissions: Vec::new(),
            dependencies: Vec::new(),
            migrations: Vec::new(),
        }
    }

    /// Parse and validate a manifest document
    pub fn from_value(document: &serde_json::Value) -> BerthResult<Self> {
        let manifest: Self = serde_json::from_value(document.clone())
            .map_err(|e| BerthError::InvalidManifest(e.to_string()))?;
        manifest
            .validate()
            .map_err(|errors| BerthError::InvalidManifest(errors.join("; ")))?;
        Ok(manifest)
    }

    /// Set the runtime image
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.runtime.image = Some(image.into());
        self
    }

    /// Add a permission declaration
    pub fn permission(mut self, key: impl Into<String>, name: impl Into<String>) -> Self {
        self.permissions.push(PermissionDeclaration {
            key: key.into(),
            name: name.into(),
            description: None,
        });
        self
    }

    /// Add a required dependency
    pub fn dependency(mut self, plugin_id: impl Into<String>, version_range: impl Into<String>) -> Self {
        self.dependencies.push(DependencySpec {
            plugin_id: plugin_id.into(),
            version_range: version_range.into(),
            required: true,
        });
        self
    }

    /// Add a migration
    pub fn migration(mut self, version: u32, name: impl Into<String>, up: impl Into<String>) -> Self {
        self.migrations.push(MigrationSpec {
            version,
            name: name.into(),
            up: up.into(),
        });
        self
    }

    /// Conventional image name used when the manifest declares none
    pub fn default_image(&self) -> String {
        format!("plugin-{}:{}", self.id, self.version)
    }

    /// Image to run: explicit `runtime.image` wins over the convention
    pub fn runtime_image(&self) -> String {
        match &self.runtime.image {
            Some(image) => image.clone(),
            None => self.default_image(),
        }
    }

    /// Validate the manifest
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !PLUGIN_ID.is_match(&self.id) {
            errors.push(format!(
                "Plugin id '{}' must be 1-63 lowercase alphanumerics, hyphens or underscores",
                self.id
            ));
        }

        if self.version.trim().is_empty() {
            errors.push("Plugin version cannot be empty".to_string());
        }

        if let Some(image) = &self.runtime.image {
            if image.trim().is_empty() || image.chars().any(char::is_whitespace) {
                errors.push(format!("Runtime image '{}' is not a valid image reference", image));
            }
        }

        if let Some(resources) = &self.runtime.resources {
            if matches!(resources.cpu, Some(cpu) if cpu <= 0.0) {
                errors.push("Runtime cpu limit must be positive".to_string());
            }
        }

        let mut keys = HashSet::new();
        for permission in &self.permissions {
            if permission.key.trim().is_empty() {
                errors.push("Permission key cannot be empty".to_string());
            } else if !keys.insert(permission.key.as_str()) {
                errors.push(format!("Duplicate permission key '{}'", permission.key));
            }
        }

        for dependency in &self.dependencies {
            if dependency.plugin_id == self.id {
                errors.push("Plugin cannot depend on itself".to_string());
            }
        }

        let mut last_version = 0;
        for migration in &self.migrations {
            if migration.version <= last_version {
                errors.push(format!(
                    "Migration versions must be strictly increasing (found {} after {})",
                    migration.version, last_version
                ));
            }
            last_version = migration.version;
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
