//! Lifecycle event publication
//!
//! The orchestrator reports committed lifecycle changes through an
//! [`EventNotifier`]. Publication is fire-and-forget: a notifier never fails
//! the operation that produced the event.

use tokio::sync::broadcast;

use serde::Serialize;

use crate::plugins::{LifecycleStatus, StatusChange};

/// Events emitted after the corresponding change committed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Ledger row created for a tenant
    Installed { tenant_id: String, plugin_id: String },

    /// Tenant activated the plugin
    Activated { tenant_id: String, plugin_id: String },

    /// Tenant deactivated the plugin
    Deactivated {
        tenant_id: String,
        plugin_id: String,
        /// The shared container was stopped
        container_stopped: bool,
    },

    /// Ledger row removed for a tenant
    Uninstalled { tenant_id: String, plugin_id: String },

    /// Tenant flag enabled without touching the global status
    TenantEnabled { tenant_id: String, plugin_id: String },

    /// Tenant flag disabled without touching the global status
    TenantDisabled { tenant_id: String, plugin_id: String },

    /// Global lifecycle status changed
    StatusChanged {
        plugin_id: String,
        from: LifecycleStatus,
        to: LifecycleStatus,
    },
}

impl LifecycleEvent {
    /// Event for a committed status change
    pub fn status_changed(plugin_id: impl Into<String>, change: StatusChange) -> Self {
        Self::StatusChanged {
            plugin_id: plugin_id.into(),
            from: change.from,
            to: change.to,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Installed { .. } => "installed",
            Self::Activated { .. } => "activated",
            Self::Deactivated { .. } => "deactivated",
            Self::Uninstalled { .. } => "uninstalled",
            Self::TenantEnabled { .. } => "tenant_enabled",
            Self::TenantDisabled { .. } => "tenant_disabled",
            Self::StatusChanged { .. } => "status_changed",
        }
    }

    /// Plugin the event is about
    pub fn plugin_id(&self) -> &str {
        match self {
            Self::Installed { plugin_id, .. }
            | Self::Activated { plugin_id, .. }
            | Self::Deactivated { plugin_id, .. }
            | Self::Uninstalled { plugin_id, .. }
            | Self::TenantEnabled { plugin_id, .. }
            | Self::TenantDisabled { plugin_id, .. }
            | Self::StatusChanged { plugin_id, .. } => plugin_id,
        }
    }
}

/// Receives lifecycle events; must not block
pub trait EventNotifier: Send + Sync {
    fn notify(&self, event: LifecycleEvent);
}

/// Broadcast-based event bus
///
/// Each subscriber receives a copy of every event published after it
/// subscribed. Slow subscribers lose events once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LifecycleEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, capacity }
    }

    /// Publish an event, returning how many subscribers will receive it
    pub fn publish(&self, event: LifecycleEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to future events
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::config::defaults::EVENT_CAPACITY)
    }
}

impl EventNotifier for EventBus {
    fn notify(&self, event: LifecycleEvent) {
        let event_type = event.event_type();
        if self.publish(event) == 0 {
            tracing::debug!(event_type, "No subscribers for lifecycle event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::new(16);
        let mut subscriber = bus.subscribe();

        let sent = bus.publish(LifecycleEvent::Installed {
            tenant_id: "t1".into(),
            plugin_id: "crm".into(),
        });
        assert_eq!(sent, 1);

        let event = subscriber.recv().await.unwrap();
        assert_eq!(event.event_type(), "installed");
        assert_eq!(event.plugin_id(), "crm");
    }

    #[test]
    fn test_notify_without_subscribers_is_silent() {
        let bus = EventBus::default();
        bus.notify(LifecycleEvent::status_changed(
            "crm",
            StatusChange {
                from: LifecycleStatus::Installed,
                to: LifecycleStatus::Active,
            },
        ));
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.capacity(), 256);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let value = serde_json::to_value(LifecycleEvent::status_changed(
            "crm",
            StatusChange {
                from: LifecycleStatus::Active,
                to: LifecycleStatus::Disabled,
            },
        ))
        .unwrap();
        assert_eq!(value["event"], "status_changed");
        assert_eq!(value["from"], "ACTIVE");
        assert_eq!(value["to"], "DISABLED");
    }
}
