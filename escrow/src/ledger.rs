//! # Token Ledger Seam
//!
//! The escrow engine moves value but does not own the token ledger.
//! [`TokenLedger`] is the seam: `debit` pulls a deposit into contract
//! custody (and is the only transfer that can fail), `credit` pays out
//! of custody and is assumed infallible — custody always covers it,
//! because every credit is backed by an earlier debit of the same order.
//!
//! [`InMemoryLedger`] is the reference implementation used by tests and
//! simulations. Production wires the engine to the HNXZ token contract
//! adapter instead.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::order::Amount;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by a token ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The account cannot cover the requested debit.
    #[error("insufficient funds: {actor} has {available}, requested {requested}")]
    InsufficientFunds {
        /// The account being debited.
        actor: String,
        /// Its current balance.
        available: Amount,
        /// The amount that was requested.
        requested: Amount,
    },
}

// ---------------------------------------------------------------------------
// TokenLedger
// ---------------------------------------------------------------------------

/// Debit/credit surface the engine requires from the value-transfer layer.
pub trait TokenLedger {
    /// Moves `amount` from `actor` into contract custody.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientFunds`] if `actor` cannot
    /// cover the amount. The engine propagates this without mutating
    /// any order state.
    fn debit(&mut self, actor: &str, amount: Amount) -> Result<(), LedgerError>;

    /// Pays `amount` out of contract custody to `actor`.
    ///
    /// Custodial payouts cannot fail: the engine only credits what it
    /// previously debited for the same order.
    fn credit(&mut self, actor: &str, amount: Amount);
}

// ---------------------------------------------------------------------------
// InMemoryLedger
// ---------------------------------------------------------------------------

/// HashMap-backed ledger with overflow-checked balances.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balances: HashMap<String, Amount>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger pre-funded with the given opening balances.
    pub fn with_balances<I>(balances: I) -> Self
    where
        I: IntoIterator<Item = (String, Amount)>,
    {
        Self {
            balances: balances.into_iter().collect(),
        }
    }

    /// Returns the balance of `actor`, or 0 for unknown accounts.
    pub fn balance_of(&self, actor: &str) -> Amount {
        self.balances.get(actor).copied().unwrap_or(0)
    }
}

impl TokenLedger for InMemoryLedger {
    fn debit(&mut self, actor: &str, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.balances.entry(actor.to_string()).or_insert(0);
        if *balance < amount {
            return Err(LedgerError::InsufficientFunds {
                actor: actor.to_string(),
                available: *balance,
                requested: amount,
            });
        }
        *balance -= amount;
        debug!(actor, amount, remaining = *balance, "ledger debit");
        Ok(())
    }

    fn credit(&mut self, actor: &str, amount: Amount) {
        let balance = self.balances.entry(actor.to_string()).or_insert(0);
        // Saturating: a u128 token balance cannot overflow in practice,
        // and a custodial payout must not panic.
        *balance = balance.saturating_add(amount);
        debug!(actor, amount, balance = *balance, "ledger credit");
    }
}
