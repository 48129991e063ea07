//! # Homebase Escrow
//!
//! Multi-party escrow for tokenized property transactions: a buyer
//! deposits funds to be held in custody for a seller, with release by
//! mutual confirmation, administrative intervention, deadline expiry,
//! or dispute arbitration.
//!
//! The crate is a library around one central type,
//! [`engine::EscrowEngine`], generic over its value-transfer layer
//! ([`ledger::TokenLedger`]) and time source ([`clock::Clock`]) so the
//! same state machine runs against a real token backend in production
//! and against in-memory fakes in tests and simulations.
//!
//! ## Design Principles
//!
//! 1. All monetary movement is all-or-nothing: every guard runs before
//!    the first ledger transfer or order mutation, so a failed call
//!    leaves no partial state behind.
//! 2. State transitions are explicit enum variants, not boolean flags;
//!    [`order::OrderStatus`] is the single source of lifecycle truth.
//! 3. Fee arithmetic is exact integer basis points with floor division.
//!    Splits assign the rounding remainder to the seller, so payouts
//!    always sum to the custodied amount.
//! 4. Timeouts are evaluated lazily against an injected clock. There
//!    are no background tasks; an expired order changes state only when
//!    an operation observes the deadline.
//! 5. Every public type is serializable (serde) for wire transport and
//!    persistent storage.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod order;
pub mod params;
pub mod store;
