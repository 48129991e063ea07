//! # Error Types
//!
//! Every failure mode of the escrow engine, as one `thiserror` enum.
//! Each operation validates all of its preconditions before touching
//! the ledger or the order store, so any error here means the operation
//! had no effect — there are no partial mutations to roll back.

use thiserror::Error;

use crate::order::{Amount, OrderId, OrderStatus};

/// Errors that can occur during escrow operations.
#[derive(Debug, Error)]
pub enum EscrowError {
    /// Buyer and seller must be distinct parties.
    #[error("invalid participants: buyer and seller are the same address")]
    InvalidParticipants,

    /// The escrow amount falls outside the configured limits.
    #[error("amount out of range: {amount} not in [{min}, {max}]")]
    AmountOutOfRange {
        /// The amount that was requested.
        amount: Amount,
        /// Configured minimum escrow amount.
        min: Amount,
        /// Configured maximum escrow amount.
        max: Amount,
    },

    /// No order exists with the given id.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The operation is not valid for the order's current status.
    #[error("wrong state: order {order_id} is {current}, expected {expected}")]
    WrongState {
        /// The order in question.
        order_id: OrderId,
        /// The order's current status.
        current: OrderStatus,
        /// The status (or statuses) required for this operation.
        expected: &'static str,
    },

    /// The caller does not hold the role this operation requires.
    #[error("unauthorized: {caller} may not perform this operation on order {order_id}")]
    Unauthorized {
        /// The address that attempted the operation.
        caller: String,
        /// The order in question.
        order_id: OrderId,
    },

    /// The order's deadline has passed where freshness was required.
    #[error("order {0} has passed its timeout deadline")]
    OrderExpired(OrderId),

    /// A dispute has already been raised on this order.
    #[error("order {0} already has an active dispute")]
    DisputeAlreadyActive(OrderId),

    /// A dispute split percentage was outside [0, 10000] bps.
    #[error("invalid percentage: {0} bps (must be within [0, 10000])")]
    InvalidPercentage(u32),

    /// The caller is not the contract owner.
    #[error("not owner: {0}")]
    NotOwner(String),

    /// The token ledger refused a debit.
    #[error("insufficient funds: {actor} cannot cover {required}")]
    InsufficientFunds {
        /// The account that was being debited.
        actor: String,
        /// The amount that could not be covered.
        required: Amount,
    },
}
