//! Internal event system for audit logging
//!
//! The EventBus uses `tokio::sync::broadcast` to decouple mutations (CRUD
//! handlers, billing, inventory) from whoever wants to observe them. The
//! service ships one subscriber, [`spawn_audit_logger`], which writes every
//! event to the `audit` tracing target.
//!
//! ```text
//! CRUD handlers ───┐
//! BillingService ──┼──▶ EventBus::publish() ──▶ broadcast channel ──▶ audit logger
//! InventoryService ┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Events related to generic record mutations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EntityEvent {
    Created {
        entity_type: String,
        entity_id: Uuid,
    },
    Updated {
        entity_type: String,
        entity_id: Uuid,
    },
    Deleted {
        entity_type: String,
        entity_id: Uuid,
    },
}

/// Money movement events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BillingEvent {
    InvoiceIssued {
        invoice_id: Uuid,
        client_id: Uuid,
        number: String,
        total: Decimal,
    },
    PaymentRecorded {
        payment_id: Uuid,
        client_id: Uuid,
        invoice_id: Option<Uuid>,
        method: String,
        amount: Decimal,
    },
    PaymentVoided {
        payment_id: Uuid,
        amount: Decimal,
    },
    CardDeclined {
        client_id: Uuid,
        amount: Decimal,
        reason: String,
    },
}

/// Device custody events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InventoryEvent {
    DeviceAssigned {
        device_id: Uuid,
        vehicle_id: Uuid,
        client_id: Uuid,
    },
    DeviceReleased {
        device_id: Uuid,
        vehicle_id: Option<Uuid>,
    },
    StatusChanged {
        device_id: Uuid,
        from: String,
        to: String,
    },
}

/// Top-level event published on the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    Entity(EntityEvent),
    Billing(BillingEvent),
    Inventory(InventoryEvent),
}

impl DomainEvent {
    pub fn event_kind(&self) -> &str {
        match self {
            DomainEvent::Entity(_) => "entity",
            DomainEvent::Billing(_) => "billing",
            DomainEvent::Inventory(_) => "inventory",
        }
    }

    /// Get the action name (created, invoice_issued, device_assigned, ...)
    pub fn action(&self) -> &str {
        match self {
            DomainEvent::Entity(e) => match e {
                EntityEvent::Created { .. } => "created",
                EntityEvent::Updated { .. } => "updated",
                EntityEvent::Deleted { .. } => "deleted",
            },
            DomainEvent::Billing(b) => match b {
                BillingEvent::InvoiceIssued { .. } => "invoice_issued",
                BillingEvent::PaymentRecorded { .. } => "payment_recorded",
                BillingEvent::PaymentVoided { .. } => "payment_voided",
                BillingEvent::CardDeclined { .. } => "card_declined",
            },
            DomainEvent::Inventory(i) => match i {
                InventoryEvent::DeviceAssigned { .. } => "device_assigned",
                InventoryEvent::DeviceReleased { .. } => "device_released",
                InventoryEvent::StatusChanged { .. } => "status_changed",
            },
        }
    }
}

/// Envelope wrapping an event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: DomainEvent,
}

impl EventEnvelope {
    pub fn new(event: DomainEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Broadcast-based event bus
///
/// The bus is cheap to clone and can be shared across threads.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    ///
    /// The capacity determines how many events can be buffered before
    /// slow receivers start losing events (lagged).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of receivers that will receive the event.
    pub fn publish(&self, event: DomainEvent) -> usize {
        let envelope = EventEnvelope::new(event);
        // send() returns Err only if there are no receivers, which is fine
        self.sender.send(envelope).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Spawn a task that writes every published event to the `audit` log target.
///
/// The task ends when the bus (all senders) is dropped.
pub fn spawn_audit_logger(bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(envelope) => {
                    let payload = serde_json::to_string(&envelope.event).unwrap_or_default();
                    tracing::info!(
                        target: "audit",
                        event_id = %envelope.id,
                        kind = envelope.event.event_kind(),
                        action = envelope.event.action(),
                        %payload,
                        "domain event"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(target: "audit", skipped, "audit logger lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_event_serialization() {
        let event = DomainEvent::Entity(EntityEvent::Created {
            entity_type: "client".to_string(),
            entity_id: Uuid::new_v4(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "entity");
        assert_eq!(json["action"], "created");
        assert_eq!(json["entity_type"], "client");
    }

    #[test]
    fn test_billing_event_action() {
        let event = DomainEvent::Billing(BillingEvent::CardDeclined {
            client_id: Uuid::new_v4(),
            amount: Decimal::new(9800, 2),
            reason: "insufficient funds".to_string(),
        });
        assert_eq!(event.event_kind(), "billing");
        assert_eq!(event.action(), "card_declined");
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let device_id = Uuid::new_v4();
        let receivers = bus.publish(DomainEvent::Inventory(InventoryEvent::DeviceReleased {
            device_id,
            vehicle_id: None,
        }));
        assert_eq!(receivers, 1);

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event.action(), "device_released");
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::default();
        let receivers = bus.publish(DomainEvent::Entity(EntityEvent::Deleted {
            entity_type: "lead".to_string(),
            entity_id: Uuid::new_v4(),
        }));
        assert_eq!(receivers, 0);
        assert_eq!(bus.receiver_count(), 0);
    }
}
