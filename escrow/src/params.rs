//! # Tunable Parameters & Owner Capability
//!
//! Runtime configuration for the escrow engine, plus the one place
//! owner-only access is decided. Every privileged operation — parameter
//! setters and the engine's administrative paths (forced release,
//! custodial cancel, dispute resolution) — goes through
//! [`OwnerGate::require`]. There is no second owner check anywhere else.
//!
//! Parameter changes are not retroactive: amount limits apply at order
//! creation, and the fee rate is read at release/resolution time.

use serde::{Deserialize, Serialize};

use crate::config::{
    DEFAULT_DISPUTE_WINDOW_SECS, DEFAULT_FEE_RATE_BPS, DEFAULT_MAX_ESCROW_AMOUNT,
    DEFAULT_MIN_ESCROW_AMOUNT, DEFAULT_TIMEOUT_SECS, MAX_FEE_RATE_BPS,
};
use crate::error::EscrowError;
use crate::order::Amount;

// ---------------------------------------------------------------------------
// OwnerGate
// ---------------------------------------------------------------------------

/// Capability check for owner-only operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerGate {
    owner: String,
}

impl OwnerGate {
    /// Creates a gate held by `owner`.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
        }
    }

    /// Returns `true` if `caller` is the owner.
    pub fn is_owner(&self, caller: &str) -> bool {
        caller == self.owner
    }

    /// Rejects any caller that is not the owner.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::NotOwner`] otherwise.
    pub fn require(&self, caller: &str) -> Result<(), EscrowError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(EscrowError::NotOwner(caller.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// ParameterStore
// ---------------------------------------------------------------------------

/// Admin-tunable engine parameters.
///
/// Setters perform the owner check and then overwrite the value —
/// nothing else. Existing orders are never revalidated against new
/// limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterStore {
    gate: OwnerGate,
    fee_rate_bps: u32,
    admin_wallet: String,
    min_escrow_amount: Amount,
    max_escrow_amount: Amount,
    default_timeout_secs: u64,
    dispute_window_secs: u64,
}

impl ParameterStore {
    /// Creates a parameter store with protocol defaults. `owner` holds
    /// the administrative capability; `admin_wallet` receives fees.
    pub fn new(owner: impl Into<String>, admin_wallet: impl Into<String>) -> Self {
        Self {
            gate: OwnerGate::new(owner),
            fee_rate_bps: DEFAULT_FEE_RATE_BPS,
            admin_wallet: admin_wallet.into(),
            min_escrow_amount: DEFAULT_MIN_ESCROW_AMOUNT,
            max_escrow_amount: DEFAULT_MAX_ESCROW_AMOUNT,
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            dispute_window_secs: DEFAULT_DISPUTE_WINDOW_SECS,
        }
    }

    /// The owner capability, shared with the engine's admin paths.
    pub fn gate(&self) -> &OwnerGate {
        &self.gate
    }

    // -- getters ------------------------------------------------------------

    /// Current escrow fee rate in basis points.
    pub fn fee_rate_bps(&self) -> u32 {
        self.fee_rate_bps
    }

    /// Address that receives collected fees.
    pub fn admin_wallet(&self) -> &str {
        &self.admin_wallet
    }

    /// Minimum amount accepted at order creation.
    pub fn min_escrow_amount(&self) -> Amount {
        self.min_escrow_amount
    }

    /// Maximum amount accepted at order creation.
    pub fn max_escrow_amount(&self) -> Amount {
        self.max_escrow_amount
    }

    /// Timeout applied when an order supplies no duration.
    pub fn default_timeout_secs(&self) -> u64 {
        self.default_timeout_secs
    }

    /// Length of the dispute-resolution window.
    pub fn dispute_window_secs(&self) -> u64 {
        self.dispute_window_secs
    }

    // -- owner-only setters -------------------------------------------------

    /// Sets the fee rate, capped at [`MAX_FEE_RATE_BPS`].
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::NotOwner`] for non-owner callers and
    /// [`EscrowError::InvalidPercentage`] above the cap.
    pub fn set_fee_rate(&mut self, caller: &str, rate_bps: u32) -> Result<(), EscrowError> {
        self.gate.require(caller)?;
        if rate_bps > MAX_FEE_RATE_BPS {
            return Err(EscrowError::InvalidPercentage(rate_bps));
        }
        self.fee_rate_bps = rate_bps;
        Ok(())
    }

    /// Redirects fee payouts to a new wallet.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::NotOwner`] for non-owner callers.
    pub fn set_admin_wallet(
        &mut self,
        caller: &str,
        wallet: impl Into<String>,
    ) -> Result<(), EscrowError> {
        self.gate.require(caller)?;
        self.admin_wallet = wallet.into();
        Ok(())
    }

    /// Sets both amount limits. `min` must stay strictly below `max`.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::NotOwner`] for non-owner callers and
    /// [`EscrowError::AmountOutOfRange`] when `min >= max`.
    pub fn set_amount_limits(
        &mut self,
        caller: &str,
        min: Amount,
        max: Amount,
    ) -> Result<(), EscrowError> {
        self.gate.require(caller)?;
        if min >= max {
            return Err(EscrowError::AmountOutOfRange {
                amount: min,
                min,
                max,
            });
        }
        self.min_escrow_amount = min;
        self.max_escrow_amount = max;
        Ok(())
    }
}
