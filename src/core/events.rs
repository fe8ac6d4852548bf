//! Domain events emitted after state changes commit.
//!
//! Delivery to clients (server-sent events, polling) is the subscriber's concern. A
//! publish with nobody listening is not an error.

use crate::entities::OrderStatus;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 1024;

/// A committed change other parts of the system may react to
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderCreated {
        order_id: i64,
        user_id: i64,
        table_id: Option<i64>,
        total_amount: f64,
        status: OrderStatus,
    },
    OrderCancelled {
        order_id: i64,
        user_id: i64,
        /// Amount credited back to the balance, if any
        refunded: Option<f64>,
    },
    OrderStatusChanged {
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    },
    BalanceUpdated {
        user_id: i64,
        balance: f64,
    },
    TableSessionUpdated {
        table_id: i64,
        session_id: i64,
        total_spent: f64,
    },
    PaymentApproved {
        transaction_id: i64,
        order_id: Option<i64>,
    },
    GiftRedeemed {
        gift_id: i64,
        user_id: i64,
    },
}

impl DomainEvent {
    /// Event name used as the SSE event type
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "order_created",
            Self::OrderCancelled { .. } => "order_cancelled",
            Self::OrderStatusChanged { .. } => "order_status_changed",
            Self::BalanceUpdated { .. } => "balance_updated",
            Self::TableSessionUpdated { .. } => "table_session_updated",
            Self::PaymentApproved { .. } => "payment_approved",
            Self::GiftRedeemed { .. } => "gift_redeemed",
        }
    }
}

/// Broadcast channel carrying [`DomainEvent`]s
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to every current subscriber.
    pub fn publish(&self, event: DomainEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => trace!(event = name, receivers, "Published domain event"),
            Err(_) => trace!(event = name, "No subscribers for domain event"),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
