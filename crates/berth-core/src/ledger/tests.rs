use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::plugins::{MarketplaceStatus, PluginStore};

fn setup() -> (Ledger, PluginStore) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let store = PluginStore::new(db.clone());
    store
        .register(&json!({"id": "crm", "version": "1.0.0"}))
        .unwrap();
    store
        .set_marketplace_status("crm", MarketplaceStatus::Published)
        .unwrap();
    (Ledger::new(db), store)
}

fn status(store: &PluginStore) -> LifecycleStatus {
    store.get("crm").unwrap().lifecycle_status
}

#[test]
fn test_first_install_walks_to_installed() {
    let (ledger, store) = setup();

    let outcome = ledger.install("t1", "crm", json!({})).unwrap();
    assert!(outcome.first_installation);
    assert!(!outcome.installation.enabled);
    assert_eq!(
        outcome.changes,
        vec![
            StatusChange {
                from: LifecycleStatus::Registered,
                to: LifecycleStatus::Installing
            },
            StatusChange {
                from: LifecycleStatus::Installing,
                to: LifecycleStatus::Installed
            },
        ]
    );
    assert_eq!(status(&store), LifecycleStatus::Installed);

    let second = ledger.install("t2", "crm", json!({})).unwrap();
    assert!(!second.first_installation);
    assert!(second.changes.is_empty());
    assert_eq!(ledger.count_installations("crm").unwrap(), 2);
}

#[test]
fn test_install_twice_is_rejected() {
    let (ledger, _store) = setup();
    ledger.install("t1", "crm", json!({})).unwrap();

    let err = ledger.install("t1", "crm", json!({})).unwrap_err();
    assert!(matches!(err, BerthError::AlreadyInstalled { .. }));
    assert_eq!(ledger.count_installations("crm").unwrap(), 1);
}

#[test]
fn test_install_requires_published_plugin() {
    let (ledger, store) = setup();
    store
        .set_marketplace_status("crm", MarketplaceStatus::PendingReview)
        .unwrap();

    let err = ledger.install("t1", "crm", json!({})).unwrap_err();
    assert!(matches!(
        err,
        BerthError::NotPublished {
            status: MarketplaceStatus::PendingReview,
            ..
        }
    ));
    assert_eq!(status(&store), LifecycleStatus::Registered);
}

#[test]
fn test_activate_then_second_tenant_keeps_active() {
    let (ledger, store) = setup();
    ledger.install("t1", "crm", json!({})).unwrap();
    ledger.install("t2", "crm", json!({})).unwrap();

    let first = ledger.activate("t1", "crm").unwrap();
    assert!(first.installation.enabled);
    assert_eq!(first.changes.len(), 1);
    assert_eq!(status(&store), LifecycleStatus::Active);

    let second = ledger.activate("t2", "crm").unwrap();
    assert!(second.changes.is_empty());
    assert_eq!(ledger.count_enabled("crm").unwrap(), 2);

    let err = ledger.activate("t2", "crm").unwrap_err();
    assert!(matches!(err, BerthError::AlreadyActive { .. }));
}

#[test]
fn test_deactivate_last_tenant_disables_plugin() {
    let (ledger, store) = setup();
    ledger.install("t1", "crm", json!({})).unwrap();
    ledger.install("t2", "crm", json!({})).unwrap();
    ledger.activate("t1", "crm").unwrap();
    ledger.activate("t2", "crm").unwrap();

    let first = ledger.deactivate("t1", "crm").unwrap();
    assert!(!first.last_enabled);
    assert_eq!(status(&store), LifecycleStatus::Active);

    let last = ledger.deactivate("t2", "crm").unwrap();
    assert!(last.last_enabled);
    assert_eq!(status(&store), LifecycleStatus::Disabled);

    let err = ledger.deactivate("t2", "crm").unwrap_err();
    assert!(matches!(err, BerthError::AlreadyInactive { .. }));
}

#[test]
fn test_reactivation_from_disabled() {
    let (ledger, store) = setup();
    ledger.install("t1", "crm", json!({})).unwrap();
    ledger.activate("t1", "crm").unwrap();
    ledger.deactivate("t1", "crm").unwrap();

    let change = ledger.activate("t1", "crm").unwrap();
    assert_eq!(
        change.changes,
        vec![StatusChange {
            from: LifecycleStatus::Disabled,
            to: LifecycleStatus::Active
        }]
    );
    assert_eq!(status(&store), LifecycleStatus::Active);
}

#[test]
fn test_enable_for_tenant_requires_active_plugin() {
    let (ledger, _store) = setup();
    ledger.install("t1", "crm", json!({})).unwrap();
    ledger.install("t2", "crm", json!({})).unwrap();

    let err = ledger.enable_for_tenant("t2", "crm").unwrap_err();
    assert!(matches!(
        err,
        BerthError::PluginNotActive {
            status: LifecycleStatus::Installed,
            ..
        }
    ));

    ledger.activate("t1", "crm").unwrap();
    let installation = ledger.enable_for_tenant("t2", "crm").unwrap();
    assert!(installation.enabled);
    assert_eq!(ledger.count_enabled("crm").unwrap(), 2);
}

#[test]
fn test_disable_for_tenant_refuses_last_enabled() {
    let (ledger, store) = setup();
    ledger.install("t1", "crm", json!({})).unwrap();
    ledger.install("t2", "crm", json!({})).unwrap();
    ledger.activate("t1", "crm").unwrap();
    ledger.activate("t2", "crm").unwrap();

    let installation = ledger.disable_for_tenant("t1", "crm").unwrap();
    assert!(!installation.enabled);

    let err = ledger.disable_for_tenant("t2", "crm").unwrap_err();
    assert!(matches!(err, BerthError::LastEnabledTenant { .. }));
    assert_eq!(status(&store), LifecycleStatus::Active);
    assert_eq!(ledger.count_enabled("crm").unwrap(), 1);
}

#[test]
fn test_uninstall_last_installation_returns_to_registered() {
    let (ledger, store) = setup();
    ledger.install("t1", "crm", json!({})).unwrap();
    ledger.install("t2", "crm", json!({})).unwrap();

    let first = ledger.uninstall("t1", "crm").unwrap();
    assert!(!first.last_installation);
    assert_eq!(status(&store), LifecycleStatus::Installed);

    let last = ledger.uninstall("t2", "crm").unwrap();
    assert!(last.last_installation);
    assert!(!last.last_enabled);
    assert_eq!(status(&store), LifecycleStatus::Registered);
    assert!(ledger.find("t2", "crm").unwrap().is_none());

    // immediately reinstallable
    ledger.install("t1", "crm", json!({})).unwrap();
}

#[test]
fn test_uninstall_of_last_enabled_tenant_disables_first() {
    let (ledger, store) = setup();
    ledger.install("t1", "crm", json!({})).unwrap();
    ledger.install("t2", "crm", json!({})).unwrap();
    ledger.activate("t1", "crm").unwrap();

    let outcome = ledger.uninstall("t1", "crm").unwrap();
    assert!(outcome.last_enabled);
    assert!(!outcome.last_installation);
    assert_eq!(
        outcome.changes,
        vec![StatusChange {
            from: LifecycleStatus::Active,
            to: LifecycleStatus::Disabled
        }]
    );
    assert_eq!(status(&store), LifecycleStatus::Disabled);
}

#[test]
fn test_uninstall_missing_row() {
    let (ledger, _store) = setup();
    let err = ledger.uninstall("t1", "crm").unwrap_err();
    assert!(matches!(err, BerthError::NotInstalled { .. }));
}

#[test]
fn test_revert_install_restores_registered() {
    let (ledger, store) = setup();
    ledger.install("t1", "crm", json!({})).unwrap();

    let changes = ledger.revert_install("t1", "crm").unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(status(&store), LifecycleStatus::Registered);
    assert!(ledger.find("t1", "crm").unwrap().is_none());
}

#[test]
fn test_reset_from_installed_is_invalid_and_writes_nothing() {
    let (ledger, store) = setup();
    ledger.install("t1", "crm", json!({})).unwrap();

    let err = ledger
        .reset_status("crm", LifecycleStatus::Registered)
        .unwrap_err();
    assert!(err.is_invalid_transition());
    assert_eq!(status(&store), LifecycleStatus::Installed);
    assert!(ledger.find("t1", "crm").unwrap().is_some());
}

#[test]
fn test_update_configuration_requires_object() {
    let (ledger, _store) = setup();
    ledger.install("t1", "crm", json!({"region": "eu"})).unwrap();

    let err = ledger
        .update_configuration("t1", "crm", json!(["not", "an", "object"]))
        .unwrap_err();
    assert!(matches!(err, BerthError::InvalidConfiguration(_)));

    let updated = ledger
        .update_configuration("t1", "crm", json!({"region": "us"}))
        .unwrap();
    assert_eq!(updated.configuration["region"], "us");
    let stored = ledger.find("t1", "crm").unwrap().unwrap();
    assert_eq!(stored.configuration, json!({"region": "us"}));
}

#[test]
fn test_installed_plugins_joins_plugin_state() {
    let (ledger, store) = setup();
    store
        .register(&json!({"id": "billing", "version": "2.0.0"}))
        .unwrap();
    store
        .set_marketplace_status("billing", MarketplaceStatus::Published)
        .unwrap();

    ledger.install("t1", "crm", json!({})).unwrap();
    ledger.install("t1", "billing", json!({})).unwrap();
    ledger.install("t2", "crm", json!({})).unwrap();

    let installed = ledger.installed_plugins("t1").unwrap();
    let ids: Vec<_> = installed
        .iter()
        .map(|p| p.installation.plugin_id.as_str())
        .collect();
    assert_eq!(ids, vec!["crm", "billing"]);
    assert_eq!(installed[1].version, "2.0.0");
    assert_eq!(installed[1].lifecycle_status, LifecycleStatus::Installed);
}

#[test]
fn test_recover_only_from_retired_states() {
    let (ledger, _store) = setup();
    let err = ledger.recover("crm").unwrap_err();
    assert!(matches!(
        err,
        BerthError::InvalidTransition {
            from: LifecycleStatus::Registered,
            ..
        }
    ));

    let err = ledger.recover("missing").unwrap_err();
    assert!(matches!(err, BerthError::PluginNotFound(_)));
}
