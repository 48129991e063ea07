//! # Domain Events
//!
//! One event per state-changing operation, carrying the order id and
//! the financially relevant deltas. Events are informational: the
//! engine appends them to an outbox and external observers (indexers,
//! notification services, the reconciliation job) drain it. Nothing in
//! the engine reads its own events back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::order::{Amount, OrderId};

/// An observable fact about an escrow order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowEvent {
    /// A new order was created in `Created` status.
    OrderCreated {
        order_id: OrderId,
        buyer: String,
        seller: String,
        amount: Amount,
        timeout_at: DateTime<Utc>,
    },
    /// The buyer's deposit entered custody.
    OrderFunded { order_id: OrderId, amount: Amount },
    /// Custody was released to the seller; the fee went to the admin wallet.
    OrderReleased {
        order_id: OrderId,
        seller_amount: Amount,
        fee: Amount,
    },
    /// The order was cancelled. `refunded` is 0 for pre-funding cancels.
    OrderCancelled {
        order_id: OrderId,
        refunded: Amount,
    },
    /// A participant raised a dispute.
    DisputeRaised {
        order_id: OrderId,
        raised_by: String,
        resolution_deadline: DateTime<Utc>,
    },
    /// The administrator split custody between the parties.
    DisputeResolved {
        order_id: OrderId,
        buyer_amount: Amount,
        seller_amount: Amount,
        fee: Amount,
    },
    /// The order timed out and the deposit was refunded.
    OrderExpired {
        order_id: OrderId,
        refunded: Amount,
    },
}

impl EscrowEvent {
    /// The order this event pertains to.
    pub fn order_id(&self) -> OrderId {
        match self {
            EscrowEvent::OrderCreated { order_id, .. }
            | EscrowEvent::OrderFunded { order_id, .. }
            | EscrowEvent::OrderReleased { order_id, .. }
            | EscrowEvent::OrderCancelled { order_id, .. }
            | EscrowEvent::DisputeRaised { order_id, .. }
            | EscrowEvent::DisputeResolved { order_id, .. }
            | EscrowEvent::OrderExpired { order_id, .. } => *order_id,
        }
    }
}
