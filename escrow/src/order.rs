//! # Escrow Order Data Model
//!
//! An [`EscrowOrder`] is one custodial agreement: a buyer's deposit held
//! for a seller against an off-chain property transfer. The order's
//! [`OrderStatus`] is the single source of truth for its lifecycle —
//! nothing is ever inferred from flag combinations. Confirmation flags
//! are monotone (set once, never cleared) and dispute fields are written
//! exactly once, when the dispute is raised.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token amount in smallest units (18 decimals). Property-scale orders
/// run to 10^22 and beyond, which is why this is `u128`, not `u64`.
pub type Amount = u128;

/// Sequential order identifier, assigned by the store starting at 1.
pub type OrderId = u64;

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// The lifecycle status of an escrow order. Exactly one holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Agreed but not yet funded by the buyer.
    Created,
    /// Buyer's deposit is in custody.
    Funded,
    /// Both parties have confirmed; eligible for participant release.
    InProgress,
    /// Funds released to the seller (minus fee). Terminal.
    Completed,
    /// Cancelled by the buyer (pre-funding) or the owner. Terminal.
    Cancelled,
    /// A participant has raised a dispute; awaiting the administrator.
    Disputed,
    /// Dispute settled by an administrator split. Terminal.
    Resolved,
    /// Timed out; deposit refunded to the buyer. Terminal.
    Expired,
}

impl OrderStatus {
    /// Returns `true` for statuses that accept no further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed
                | OrderStatus::Cancelled
                | OrderStatus::Resolved
                | OrderStatus::Expired
        )
    }

    /// Returns `true` while the buyer's deposit is in contract custody.
    pub fn holds_custody(&self) -> bool {
        matches!(
            self,
            OrderStatus::Funded | OrderStatus::InProgress | OrderStatus::Disputed
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Created => write!(f, "Created"),
            OrderStatus::Funded => write!(f, "Funded"),
            OrderStatus::InProgress => write!(f, "InProgress"),
            OrderStatus::Completed => write!(f, "Completed"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
            OrderStatus::Disputed => write!(f, "Disputed"),
            OrderStatus::Resolved => write!(f, "Resolved"),
            OrderStatus::Expired => write!(f, "Expired"),
        }
    }
}

// ---------------------------------------------------------------------------
// EscrowOrder
// ---------------------------------------------------------------------------

/// One escrow agreement between a buyer and a seller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowOrder {
    /// Unique identifier, immutable after creation.
    pub id: OrderId,
    /// Address of the depositing party. Distinct from `seller`.
    pub buyer: String,
    /// Address of the receiving party.
    pub seller: String,
    /// Custodied value, fixed at creation.
    pub amount: Amount,
    /// Opaque reference to the property being transacted (e.g. a deed
    /// registry key). Informational only — the engine never interprets it.
    pub property_ref: String,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Timestamp when the order was created.
    pub created_at: DateTime<Utc>,
    /// Deadline for funding, confirmation, and release. Past this
    /// instant the order is only eligible for expiry.
    pub timeout_at: DateTime<Utc>,
    /// Buyer's confirmation flag. Monotone: set once, never reset.
    pub buyer_confirmed: bool,
    /// Seller's confirmation flag. Monotone: set once, never reset.
    pub seller_confirmed: bool,
    /// Whether a dispute has been raised on this order.
    pub dispute_raised: bool,
    /// Address that raised the dispute, if any.
    pub dispute_raised_by: Option<String>,
    /// Target deadline for the administrator's resolution, if disputed.
    pub resolution_deadline: Option<DateTime<Utc>>,
}

impl EscrowOrder {
    /// Returns `true` if `addr` is the buyer or the seller.
    pub fn is_participant(&self, addr: &str) -> bool {
        addr == self.buyer || addr == self.seller
    }

    /// Returns `true` once both parties have confirmed.
    pub fn both_confirmed(&self) -> bool {
        self.buyer_confirmed && self.seller_confirmed
    }
}
