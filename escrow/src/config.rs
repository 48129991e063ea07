//! # Escrow Constants & Defaults
//!
//! Every magic number in the escrow engine lives here. Runtime-tunable
//! knobs (fee rate, amount limits, timeouts) start from these defaults
//! and are adjusted through [`crate::params::ParameterStore`]; the
//! denominators and caps below are protocol-level and never change at
//! runtime.

use crate::order::Amount;

// ---------------------------------------------------------------------------
// Basis Points
// ---------------------------------------------------------------------------

/// Denominator for all basis-point arithmetic. 10_000 bps = 100%.
///
/// Fees and dispute splits are computed with integer floor division
/// against this denominator. The remainder-assignment rules in
/// [`crate::engine`] guarantee no unit is ever lost to rounding.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Hard cap on the escrow fee rate: 1_000 bps = 10%.
///
/// The owner can tune the fee below this, never above. A platform
/// taking more than 10% of a property transaction is a rug, not a fee.
pub const MAX_FEE_RATE_BPS: u32 = 1_000;

// ---------------------------------------------------------------------------
// Default Parameters
// ---------------------------------------------------------------------------

/// Default escrow fee rate: 250 bps = 2.5%.
pub const DEFAULT_FEE_RATE_BPS: u32 = 250;

/// Default order timeout: 30 days. Property closings are slow; anything
/// shorter generates spurious expirations.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30 * 86_400;

/// Default dispute-resolution window: 7 days from the moment a dispute
/// is raised. Informational deadline for the administrator — resolution
/// after the window is still accepted.
pub const DEFAULT_DISPUTE_WINDOW_SECS: u64 = 7 * 86_400;

/// HNXZ uses 18 decimal places; one whole token in smallest units.
pub const TOKEN_UNIT: Amount = 1_000_000_000_000_000_000;

/// Default minimum escrow amount: 100 HNXZ. Below this the fixed costs
/// of a custodial order outweigh the fee income.
pub const DEFAULT_MIN_ESCROW_AMOUNT: Amount = 100 * TOKEN_UNIT;

/// Default maximum escrow amount: 1,000,000 HNXZ per order.
pub const DEFAULT_MAX_ESCROW_AMOUNT: Amount = 1_000_000 * TOKEN_UNIT;
