//! Plugin lifecycle state machine
//!
//! A plugin has exactly one global lifecycle status regardless of how many
//! tenants installed it. [`transition`] is the only writer of that status and
//! always reads the authoritative value inside the caller's transaction.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use rusqlite::{Transaction, params};
use serde::{Deserialize, Serialize};

use super::Plugin;
use super::store;
use crate::error::{BerthError, BerthResult};

/// Global plugin lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    /// Known to the platform, no tenant has it installed
    Registered,

    /// First installation in progress
    Installing,

    /// At least one tenant installed it, container not running
    Installed,

    /// Container running, at least one tenant enabled
    Active,

    /// Was active, the last enabled tenant deactivated it
    Disabled,

    /// Last installation being removed
    Uninstalling,

    /// Fully retired; requires manual recovery to reinstall
    Uninstalled,
}

impl LifecycleStatus {
    /// All statuses in declaration order
    pub const ALL: [LifecycleStatus; 7] = [
        Self::Registered,
        Self::Installing,
        Self::Installed,
        Self::Active,
        Self::Disabled,
        Self::Uninstalling,
        Self::Uninstalled,
    ];

    /// Stored representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::Installing => "INSTALLING",
            Self::Installed => "INSTALLED",
            Self::Active => "ACTIVE",
            Self::Disabled => "DISABLED",
            Self::Uninstalling => "UNINSTALLING",
            Self::Uninstalled => "UNINSTALLED",
        }
    }

    /// Check whether `self -> target` is a valid edge
    pub fn can_transition_to(self, target: LifecycleStatus) -> bool {
        use LifecycleStatus::*;

        matches!(
            (self, target),
            (Registered, Installing)
                | (Installing, Installed)
                | (Installed, Active)
                | (Installed, Uninstalling)
                | (Active, Disabled)
                | (Disabled, Active)
                | (Disabled, Uninstalling)
                // last installation removed, immediately reinstallable
                | (Uninstalling, Registered)
                | (Uninstalling, Uninstalled)
                // manual recovery
                | (Uninstalled, Registered)
        )
    }

    /// Whether tenant installation rows may exist in this status
    pub fn permits_installations(self) -> bool {
        matches!(self, Self::Installed | Self::Active | Self::Disabled)
    }

    /// Whether no tenant may have the plugin enabled in this status
    pub fn is_dormant(self) -> bool {
        matches!(self, Self::Registered | Self::Uninstalled)
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown lifecycle status: {}", s))
    }
}

/// Marketplace review status, owned by the marketplace workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketplaceStatus {
    Draft,
    PendingReview,
    Published,
    Rejected,
    Deprecated,
}

impl MarketplaceStatus {
    /// Stored representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingReview => "pending_review",
            Self::Published => "published",
            Self::Rejected => "rejected",
            Self::Deprecated => "deprecated",
        }
    }

    /// Only published plugins may be installed
    pub fn allows_installation(self) -> bool {
        matches!(self, Self::Published)
    }
}

impl fmt::Display for MarketplaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketplaceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "pending_review" => Ok(Self::PendingReview),
            "published" => Ok(Self::Published),
            "rejected" => Ok(Self::Rejected),
            "deprecated" => Ok(Self::Deprecated),
            other => Err(format!("unknown marketplace status: {}", other)),
        }
    }
}

/// A committed lifecycle edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: LifecycleStatus,
    pub to: LifecycleStatus,
}

/// Result of [`transition`]
#[derive(Debug, Clone)]
pub struct Transition {
    /// Plugin with its new status
    pub plugin: Plugin,
    /// Status read inside the transaction before the write
    pub from: LifecycleStatus,
}

impl Transition {
    /// The edge that was applied
    pub fn change(&self) -> StatusChange {
        StatusChange {
            from: self.from,
            to: self.plugin.lifecycle_status,
        }
    }
}

/// Validate and apply a lifecycle transition inside an open transaction.
///
/// Invalid edges fail with [`BerthError::InvalidTransition`] and write nothing.
pub fn transition(
    tx: &Transaction<'_>,
    plugin_id: &str,
    target: LifecycleStatus,
) -> BerthResult<Transition> {
    let mut plugin = store::fetch(tx, plugin_id)?;
    let from = plugin.lifecycle_status;

    if !from.can_transition_to(target) {
        return Err(BerthError::InvalidTransition {
            plugin_id: plugin_id.to_string(),
            from,
            to: target,
        });
    }

    let now = Utc::now();
    tx.execute(
        "UPDATE plugins SET lifecycle_status = ?1, updated_at = ?2 WHERE id = ?3",
        params![target.as_str(), now, plugin_id],
    )?;

    tracing::info!(plugin_id, %from, to = %target, "Plugin lifecycle transition");

    plugin.lifecycle_status = target;
    plugin.updated_at = now;
    Ok(Transition { plugin, from })
}
