//! # Escrow Engine
//!
//! Stateless orchestration over the order store: every operation loads
//! the order, validates authorization, state, and timing against the
//! current parameters, performs any required ledger transfer, persists
//! the updated order, and adjusts the aggregate counters — atomically,
//! in that sequence. All guards run before the first write, so a failed
//! operation leaves no partial mutation behind.
//!
//! ## Custody Accounting
//!
//! `total_escrowed` is the sum of amounts currently held for
//! non-terminal funded orders. It increases exactly once per order (at
//! `fund_escrow`) and decreases exactly once, at the single operation
//! that finalizes the order: release, custodial cancel, dispute
//! resolution, or expiry. [`EscrowEngine::check_custody_invariant`]
//! re-derives the figure by scanning the store, for reconciliation
//! harnesses.
//!
//! ## Fee Arithmetic
//!
//! Integer basis points with floor division. `fee + net == amount`
//! always, and dispute splits assign the rounding remainder to the
//! seller (`seller_gets = net - buyer_gets`), so no unit is ever minted
//! or lost.

use chrono::Duration;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::BPS_DENOMINATOR;
use crate::error::EscrowError;
use crate::events::EscrowEvent;
use crate::ledger::{LedgerError, TokenLedger};
use crate::order::{Amount, EscrowOrder, OrderId, OrderStatus};
use crate::params::ParameterStore;
use crate::store::OrderStore;

// ---------------------------------------------------------------------------
// Fee helpers
// ---------------------------------------------------------------------------

/// Floor of `amount * rate_bps / 10_000`, overflow-free for any
/// `rate_bps <= 10_000`: the quotient and remainder of `amount` are
/// scaled separately, and each partial product stays below `amount`.
fn bps_share(amount: Amount, rate_bps: u32) -> Amount {
    let rate = rate_bps as u128;
    (amount / BPS_DENOMINATOR) * rate + (amount % BPS_DENOMINATOR) * rate / BPS_DENOMINATOR
}

// ---------------------------------------------------------------------------
// EscrowEngine
// ---------------------------------------------------------------------------

/// The escrow order lifecycle and dispute-resolution state machine.
///
/// Generic over the value-transfer layer and the time source. The
/// engine assumes the host serializes invocations (single writer); it
/// holds no interior locks and never awaits.
pub struct EscrowEngine<L: TokenLedger, C: Clock> {
    ledger: L,
    clock: C,
    store: OrderStore,
    params: ParameterStore,
    total_escrowed: Amount,
    total_fees_collected: Amount,
    events: Vec<EscrowEvent>,
}

impl<L: TokenLedger, C: Clock> EscrowEngine<L, C> {
    /// Creates an engine with an empty order store.
    pub fn new(ledger: L, clock: C, params: ParameterStore) -> Self {
        Self {
            ledger,
            clock,
            store: OrderStore::new(),
            params,
            total_escrowed: 0,
            total_fees_collected: 0,
            events: Vec::new(),
        }
    }

    // -- operations ---------------------------------------------------------

    /// Creates a new escrow order in `Created` status and returns its id.
    ///
    /// `timeout_secs == 0` selects the configured default timeout. The
    /// amount limits are checked at creation only; later limit changes
    /// never invalidate existing orders.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidParticipants`] if `buyer == seller`
    /// and [`EscrowError::AmountOutOfRange`] outside the limits.
    pub fn create_escrow(
        &mut self,
        buyer: &str,
        seller: &str,
        amount: Amount,
        property_ref: &str,
        timeout_secs: u64,
    ) -> Result<OrderId, EscrowError> {
        if buyer == seller {
            return Err(EscrowError::InvalidParticipants);
        }

        let min = self.params.min_escrow_amount();
        let max = self.params.max_escrow_amount();
        if amount < min || amount > max {
            return Err(EscrowError::AmountOutOfRange { amount, min, max });
        }

        let duration = if timeout_secs == 0 {
            self.params.default_timeout_secs()
        } else {
            timeout_secs
        };

        let created_at = self.clock.now();
        let timeout_at = created_at + Duration::seconds(duration as i64);
        let id = self.store.allocate_id();

        self.store.insert(EscrowOrder {
            id,
            buyer: buyer.to_string(),
            seller: seller.to_string(),
            amount,
            property_ref: property_ref.to_string(),
            status: OrderStatus::Created,
            created_at,
            timeout_at,
            buyer_confirmed: false,
            seller_confirmed: false,
            dispute_raised: false,
            dispute_raised_by: None,
            resolution_deadline: None,
        });

        info!(order_id = id, buyer, seller, amount, property_ref, "escrow order created");
        self.events.push(EscrowEvent::OrderCreated {
            order_id: id,
            buyer: buyer.to_string(),
            seller: seller.to_string(),
            amount,
            timeout_at,
        });

        Ok(id)
    }

    /// Buyer deposits the order amount into custody.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::WrongState`] unless the order is
    /// `Created`, [`EscrowError::Unauthorized`] for non-buyer callers,
    /// [`EscrowError::OrderExpired`] past the funding deadline, and
    /// [`EscrowError::InsufficientFunds`] if the ledger refuses the
    /// debit (order state is untouched in that case).
    pub fn fund_escrow(&mut self, caller: &str, order_id: OrderId) -> Result<(), EscrowError> {
        let now = self.clock.now();
        let order = self.store.get(order_id)?;

        if order.status != OrderStatus::Created {
            return Err(EscrowError::WrongState {
                order_id,
                current: order.status,
                expected: "Created",
            });
        }
        if caller != order.buyer {
            return Err(EscrowError::Unauthorized {
                caller: caller.to_string(),
                order_id,
            });
        }
        if now > order.timeout_at {
            return Err(EscrowError::OrderExpired(order_id));
        }

        let amount = order.amount;
        self.ledger.debit(caller, amount).map_err(|err| match err {
            LedgerError::InsufficientFunds {
                actor, requested, ..
            } => EscrowError::InsufficientFunds {
                actor,
                required: requested,
            },
        })?;

        let order = self.store.get_mut(order_id)?;
        order.status = OrderStatus::Funded;
        self.total_escrowed = self.total_escrowed.saturating_add(amount);

        info!(order_id, amount, total_escrowed = self.total_escrowed, "escrow order funded");
        self.events.push(EscrowEvent::OrderFunded { order_id, amount });

        Ok(())
    }

    /// Records the caller's confirmation. Idempotent per caller: a
    /// repeated confirmation is a no-op, not an error. Once both
    /// parties have confirmed the order moves to `InProgress`.
    ///
    /// Returns the order's status after the call.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::WrongState`] unless the order is `Funded`
    /// or `InProgress`, [`EscrowError::Unauthorized`] for
    /// non-participants, and [`EscrowError::OrderExpired`] past the
    /// deadline.
    pub fn confirm_escrow(
        &mut self,
        caller: &str,
        order_id: OrderId,
    ) -> Result<OrderStatus, EscrowError> {
        let now = self.clock.now();
        let order = self.store.get_mut(order_id)?;

        if order.status != OrderStatus::Funded && order.status != OrderStatus::InProgress {
            return Err(EscrowError::WrongState {
                order_id,
                current: order.status,
                expected: "Funded or InProgress",
            });
        }
        if !order.is_participant(caller) {
            return Err(EscrowError::Unauthorized {
                caller: caller.to_string(),
                order_id,
            });
        }
        if now > order.timeout_at {
            return Err(EscrowError::OrderExpired(order_id));
        }

        if caller == order.buyer {
            order.buyer_confirmed = true;
        } else {
            order.seller_confirmed = true;
        }

        if order.both_confirmed() && order.status == OrderStatus::Funded {
            order.status = OrderStatus::InProgress;
            info!(order_id, "both parties confirmed, order in progress");
        }

        Ok(order.status)
    }

    /// Opens a dispute, freezing the order until the administrator
    /// resolves it.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::DisputeAlreadyActive`] if the order is
    /// already disputed, [`EscrowError::WrongState`] outside
    /// `Funded`/`InProgress`, [`EscrowError::Unauthorized`] for
    /// non-participants, and [`EscrowError::OrderExpired`] past the
    /// deadline.
    pub fn raise_dispute(&mut self, caller: &str, order_id: OrderId) -> Result<(), EscrowError> {
        let now = self.clock.now();
        let window = self.params.dispute_window_secs();
        let order = self.store.get_mut(order_id)?;

        if order.status == OrderStatus::Disputed {
            return Err(EscrowError::DisputeAlreadyActive(order_id));
        }
        if order.status != OrderStatus::Funded && order.status != OrderStatus::InProgress {
            return Err(EscrowError::WrongState {
                order_id,
                current: order.status,
                expected: "Funded or InProgress",
            });
        }
        if !order.is_participant(caller) {
            return Err(EscrowError::Unauthorized {
                caller: caller.to_string(),
                order_id,
            });
        }
        if now > order.timeout_at {
            return Err(EscrowError::OrderExpired(order_id));
        }

        let resolution_deadline = now + Duration::seconds(window as i64);
        order.status = OrderStatus::Disputed;
        order.dispute_raised = true;
        order.dispute_raised_by = Some(caller.to_string());
        order.resolution_deadline = Some(resolution_deadline);

        warn!(order_id, raised_by = caller, "dispute raised");
        self.events.push(EscrowEvent::DisputeRaised {
            order_id,
            raised_by: caller.to_string(),
            resolution_deadline,
        });

        Ok(())
    }

    /// Releases custody to the seller, completing the order. The fee
    /// (`amount * fee_rate_bps / 10000`, floored) goes to the admin
    /// wallet; the seller receives the remainder, so the two payouts
    /// sum exactly to the custodied amount.
    ///
    /// The owner may release from `Funded` or `InProgress` at any time
    /// before the deadline; a participant may release only once both
    /// confirmations are in (`InProgress`).
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::WrongState`] for disputed or unfunded
    /// orders, [`EscrowError::Unauthorized`] when the caller's guard
    /// fails, and [`EscrowError::OrderExpired`] past the deadline.
    pub fn release_escrow(&mut self, caller: &str, order_id: OrderId) -> Result<(), EscrowError> {
        let now = self.clock.now();
        let fee_rate = self.params.fee_rate_bps();
        let admin_wallet = self.params.admin_wallet().to_string();
        let is_owner = self.params.gate().is_owner(caller);
        let order = self.store.get(order_id)?;

        if order.status != OrderStatus::Funded && order.status != OrderStatus::InProgress {
            return Err(EscrowError::WrongState {
                order_id,
                current: order.status,
                expected: "Funded or InProgress",
            });
        }
        let participant_release =
            order.is_participant(caller) && order.status == OrderStatus::InProgress;
        if !is_owner && !participant_release {
            return Err(EscrowError::Unauthorized {
                caller: caller.to_string(),
                order_id,
            });
        }
        if now > order.timeout_at {
            return Err(EscrowError::OrderExpired(order_id));
        }

        let amount = order.amount;
        let seller = order.seller.clone();
        let fee = bps_share(amount, fee_rate);
        let net = amount - fee;

        self.ledger.credit(&seller, net);
        if fee > 0 {
            self.ledger.credit(&admin_wallet, fee);
        }

        let order = self.store.get_mut(order_id)?;
        order.status = OrderStatus::Completed;
        self.total_escrowed -= amount;
        self.total_fees_collected = self.total_fees_collected.saturating_add(fee);

        info!(order_id, seller_amount = net, fee, "escrow released to seller");
        self.events.push(EscrowEvent::OrderReleased {
            order_id,
            seller_amount: net,
            fee,
        });

        Ok(())
    }

    /// Resolves a dispute by splitting the net amount between buyer and
    /// seller. `buyer_pct` is in basis points of the net (after-fee)
    /// amount; the seller receives the remainder by subtraction, so the
    /// split sums exactly to the net.
    ///
    /// Resolution is accepted after the advisory `resolution_deadline`
    /// — a late ruling beats frozen funds.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::NotOwner`] for non-owner callers,
    /// [`EscrowError::InvalidPercentage`] above 10_000 bps, and
    /// [`EscrowError::WrongState`] unless the order is `Disputed`.
    pub fn resolve_dispute(
        &mut self,
        caller: &str,
        order_id: OrderId,
        buyer_pct: u32,
    ) -> Result<(), EscrowError> {
        self.params.gate().require(caller)?;
        if buyer_pct as u128 > BPS_DENOMINATOR {
            return Err(EscrowError::InvalidPercentage(buyer_pct));
        }

        let fee_rate = self.params.fee_rate_bps();
        let admin_wallet = self.params.admin_wallet().to_string();
        let order = self.store.get(order_id)?;

        if order.status != OrderStatus::Disputed {
            return Err(EscrowError::WrongState {
                order_id,
                current: order.status,
                expected: "Disputed",
            });
        }

        let amount = order.amount;
        let buyer = order.buyer.clone();
        let seller = order.seller.clone();

        let fee = bps_share(amount, fee_rate);
        let net = amount - fee;
        let buyer_gets = bps_share(net, buyer_pct);
        let seller_gets = net - buyer_gets;

        if buyer_gets > 0 {
            self.ledger.credit(&buyer, buyer_gets);
        }
        if seller_gets > 0 {
            self.ledger.credit(&seller, seller_gets);
        }
        if fee > 0 {
            self.ledger.credit(&admin_wallet, fee);
        }

        let order = self.store.get_mut(order_id)?;
        order.status = OrderStatus::Resolved;
        self.total_escrowed -= amount;
        self.total_fees_collected = self.total_fees_collected.saturating_add(fee);

        info!(
            order_id,
            buyer_amount = buyer_gets,
            seller_amount = seller_gets,
            fee,
            "dispute resolved"
        );
        self.events.push(EscrowEvent::DisputeResolved {
            order_id,
            buyer_amount: buyer_gets,
            seller_amount: seller_gets,
            fee,
        });

        Ok(())
    }

    /// Cancels an order. Before funding, the buyer (or the owner) may
    /// cancel freely; once custody exists, only the owner may cancel,
    /// and the full deposit is refunded to the buyer.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Unauthorized`] when the caller's guard
    /// fails and [`EscrowError::WrongState`] for disputed or terminal
    /// orders.
    pub fn cancel_escrow(&mut self, caller: &str, order_id: OrderId) -> Result<(), EscrowError> {
        let is_owner = self.params.gate().is_owner(caller);
        let order = self.store.get(order_id)?;

        let refunded = match order.status {
            OrderStatus::Created => {
                if caller != order.buyer && !is_owner {
                    return Err(EscrowError::Unauthorized {
                        caller: caller.to_string(),
                        order_id,
                    });
                }
                0
            }
            OrderStatus::Funded | OrderStatus::InProgress => {
                if !is_owner {
                    return Err(EscrowError::Unauthorized {
                        caller: caller.to_string(),
                        order_id,
                    });
                }
                order.amount
            }
            current => {
                return Err(EscrowError::WrongState {
                    order_id,
                    current,
                    expected: "Created, Funded, or InProgress",
                });
            }
        };

        let buyer = order.buyer.clone();
        if refunded > 0 {
            self.ledger.credit(&buyer, refunded);
            self.total_escrowed -= refunded;
        }

        let order = self.store.get_mut(order_id)?;
        order.status = OrderStatus::Cancelled;

        warn!(order_id, refunded, "escrow order cancelled");
        self.events
            .push(EscrowEvent::OrderCancelled { order_id, refunded });

        Ok(())
    }

    /// Expires a timed-out order and refunds the full deposit to the
    /// buyer. Callable by anyone — the external watcher has no special
    /// identity — but only strictly after `timeout_at`.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::WrongState`] unless the order is `Funded`
    /// or `InProgress` with its deadline passed.
    pub fn handle_expired(&mut self, order_id: OrderId) -> Result<(), EscrowError> {
        let now = self.clock.now();
        let order = self.store.get(order_id)?;

        if order.status != OrderStatus::Funded && order.status != OrderStatus::InProgress {
            return Err(EscrowError::WrongState {
                order_id,
                current: order.status,
                expected: "Funded or InProgress",
            });
        }
        if now <= order.timeout_at {
            return Err(EscrowError::WrongState {
                order_id,
                current: order.status,
                expected: "Funded or InProgress past timeout_at",
            });
        }

        let amount = order.amount;
        let buyer = order.buyer.clone();

        self.ledger.credit(&buyer, amount);

        let order = self.store.get_mut(order_id)?;
        order.status = OrderStatus::Expired;
        self.total_escrowed -= amount;

        warn!(order_id, refunded = amount, "escrow order expired, buyer refunded");
        self.events.push(EscrowEvent::OrderExpired {
            order_id,
            refunded: amount,
        });

        Ok(())
    }

    // -- administration -----------------------------------------------------

    /// Owner-only: sets the escrow fee rate (capped at 10%).
    pub fn set_fee_rate(&mut self, caller: &str, rate_bps: u32) -> Result<(), EscrowError> {
        self.params.set_fee_rate(caller, rate_bps)
    }

    /// Owner-only: redirects fee payouts to a new wallet.
    pub fn set_admin_wallet(&mut self, caller: &str, wallet: &str) -> Result<(), EscrowError> {
        self.params.set_admin_wallet(caller, wallet)
    }

    /// Owner-only: sets the creation-time amount limits (`min < max`).
    pub fn set_amount_limits(
        &mut self,
        caller: &str,
        min: Amount,
        max: Amount,
    ) -> Result<(), EscrowError> {
        self.params.set_amount_limits(caller, min, max)
    }

    // -- queries ------------------------------------------------------------

    /// Returns the order record.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::OrderNotFound`] if no such order exists.
    pub fn get_order(&self, order_id: OrderId) -> Result<&EscrowOrder, EscrowError> {
        self.store.get(order_id)
    }

    /// Returns the order's current status.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::OrderNotFound`] if no such order exists.
    pub fn get_status(&self, order_id: OrderId) -> Result<OrderStatus, EscrowError> {
        Ok(self.store.get(order_id)?.status)
    }

    /// Sum of amounts currently held in custody.
    pub fn total_escrowed(&self) -> Amount {
        self.total_escrowed
    }

    /// Lifetime total of fees collected. Monotonically increasing.
    pub fn total_fees_collected(&self) -> Amount {
        self.total_fees_collected
    }

    /// Current fee rate in basis points.
    pub fn fee_rate_bps(&self) -> u32 {
        self.params.fee_rate_bps()
    }

    /// Current `(min, max)` escrow amount limits.
    pub fn amount_limits(&self) -> (Amount, Amount) {
        (
            self.params.min_escrow_amount(),
            self.params.max_escrow_amount(),
        )
    }

    /// Number of orders ever created.
    pub fn order_count(&self) -> usize {
        self.store.len()
    }

    /// The parameter store, for read access.
    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    /// The underlying ledger, for read access.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Mutable access to the clock. Lets a simulation host advance a
    /// [`crate::clock::ManualClock`] between invocations.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Drains the pending event outbox in emission order.
    pub fn drain_events(&mut self) -> Vec<EscrowEvent> {
        std::mem::take(&mut self.events)
    }

    /// Recomputes custody by scanning the store and compares it with
    /// the running `total_escrowed` counter. Reconciliation harnesses
    /// call this after every operation batch.
    pub fn check_custody_invariant(&self) -> bool {
        let scanned: Amount = self
            .store
            .iter()
            .filter(|o| o.status.holds_custody())
            .map(|o| o.amount)
            .sum();
        scanned == self.total_escrowed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::ledger::InMemoryLedger;
    use chrono::Utc;

    const OWNER: &str = "owner";
    const ADMIN_WALLET: &str = "admin_wallet";
    const BUYER: &str = "buyer";
    const SELLER: &str = "seller";

    fn engine_with_buyer_balance(
        balance: Amount,
    ) -> EscrowEngine<InMemoryLedger, ManualClock> {
        let ledger = InMemoryLedger::with_balances([(BUYER.to_string(), balance)]);
        let clock = ManualClock::new(Utc::now());
        let mut params = ParameterStore::new(OWNER, ADMIN_WALLET);
        // Small limits so tests can use small round numbers.
        params.set_amount_limits(OWNER, 100, 1_000_000_000).unwrap();
        EscrowEngine::new(ledger, clock, params)
    }

    fn funded_order(engine: &mut EscrowEngine<InMemoryLedger, ManualClock>) -> OrderId {
        let id = engine
            .create_escrow(BUYER, SELLER, 10_000, "PROP001", 3_600)
            .unwrap();
        engine.fund_escrow(BUYER, id).unwrap();
        id
    }

    // -- bps_share ----------------------------------------------------------

    #[test]
    fn bps_share_matches_naive_division() {
        for (amount, rate) in [
            (10_000u128, 250u32),
            (12_345, 999),
            (1, 10_000),
            (0, 500),
            (99_999, 1),
        ] {
            assert_eq!(bps_share(amount, rate), amount * rate as u128 / 10_000);
        }
    }

    #[test]
    fn bps_share_is_overflow_free_at_extremes() {
        // Naive `amount * rate` would overflow here; the split form must not.
        let amount = u128::MAX - 12_345;
        let fee = bps_share(amount, 10_000);
        assert_eq!(fee, amount);
        assert!(bps_share(amount, 1_000) < amount);
    }

    #[test]
    fn fee_plus_net_equals_amount_for_all_rates() {
        let amount: Amount = 1_234_567_891;
        for rate in [0u32, 1, 250, 333, 999, 1_000] {
            let fee = bps_share(amount, rate);
            let net = amount - fee;
            assert_eq!(fee + net, amount);
        }
    }

    // -- create -------------------------------------------------------------

    #[test]
    fn create_assigns_sequential_ids() {
        let mut engine = engine_with_buyer_balance(0);
        let a = engine.create_escrow(BUYER, SELLER, 500, "P1", 0).unwrap();
        let b = engine.create_escrow(BUYER, SELLER, 500, "P2", 0).unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(engine.order_count(), 2);
    }

    #[test]
    fn create_rejects_self_dealing() {
        let mut engine = engine_with_buyer_balance(0);
        let result = engine.create_escrow(BUYER, BUYER, 500, "P", 0);
        assert!(matches!(
            result.unwrap_err(),
            EscrowError::InvalidParticipants
        ));
    }

    #[test]
    fn create_amount_boundaries() {
        let mut engine = engine_with_buyer_balance(0);
        // min exactly: accepted.
        assert!(engine.create_escrow(BUYER, SELLER, 100, "P", 0).is_ok());
        // one below min: rejected.
        let result = engine.create_escrow(BUYER, SELLER, 99, "P", 0);
        assert!(matches!(
            result.unwrap_err(),
            EscrowError::AmountOutOfRange { amount: 99, .. }
        ));
        // max exactly: accepted.
        assert!(engine
            .create_escrow(BUYER, SELLER, 1_000_000_000, "P", 0)
            .is_ok());
        // one above max: rejected.
        assert!(engine
            .create_escrow(BUYER, SELLER, 1_000_000_001, "P", 0)
            .is_err());
    }

    #[test]
    fn create_zero_timeout_uses_default() {
        let mut engine = engine_with_buyer_balance(0);
        let id = engine.create_escrow(BUYER, SELLER, 500, "P", 0).unwrap();
        let order = engine.get_order(id).unwrap();
        let expected = order.created_at
            + Duration::seconds(engine.params().default_timeout_secs() as i64);
        assert_eq!(order.timeout_at, expected);
    }

    // -- fund ---------------------------------------------------------------

    #[test]
    fn fund_moves_deposit_into_custody() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = engine
            .create_escrow(BUYER, SELLER, 10_000, "P", 3_600)
            .unwrap();
        engine.fund_escrow(BUYER, id).unwrap();

        assert_eq!(engine.get_status(id).unwrap(), OrderStatus::Funded);
        assert_eq!(engine.total_escrowed(), 10_000);
        assert_eq!(engine.ledger().balance_of(BUYER), 40_000);
        assert!(engine.check_custody_invariant());
    }

    #[test]
    fn fund_by_non_buyer_rejected() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = engine
            .create_escrow(BUYER, SELLER, 10_000, "P", 3_600)
            .unwrap();
        let result = engine.fund_escrow(SELLER, id);
        assert!(matches!(result.unwrap_err(), EscrowError::Unauthorized { .. }));
    }

    #[test]
    fn fund_with_insufficient_funds_leaves_order_untouched() {
        let mut engine = engine_with_buyer_balance(5_000);
        let id = engine
            .create_escrow(BUYER, SELLER, 10_000, "P", 3_600)
            .unwrap();
        let result = engine.fund_escrow(BUYER, id);
        assert!(matches!(
            result.unwrap_err(),
            EscrowError::InsufficientFunds { .. }
        ));
        assert_eq!(engine.get_status(id).unwrap(), OrderStatus::Created);
        assert_eq!(engine.total_escrowed(), 0);
        assert_eq!(engine.ledger().balance_of(BUYER), 5_000);
    }

    #[test]
    fn fund_after_deadline_rejected() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = engine
            .create_escrow(BUYER, SELLER, 10_000, "P", 3_600)
            .unwrap();
        engine.clock_mut().advance_secs(3_601);
        let result = engine.fund_escrow(BUYER, id);
        assert!(matches!(result.unwrap_err(), EscrowError::OrderExpired(_)));
    }

    #[test]
    fn double_fund_rejected() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        let result = engine.fund_escrow(BUYER, id);
        assert!(matches!(result.unwrap_err(), EscrowError::WrongState { .. }));
        assert_eq!(engine.total_escrowed(), 10_000);
    }

    // -- confirm ------------------------------------------------------------

    #[test]
    fn both_confirmations_reach_in_progress() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);

        assert_eq!(
            engine.confirm_escrow(BUYER, id).unwrap(),
            OrderStatus::Funded
        );
        assert_eq!(
            engine.confirm_escrow(SELLER, id).unwrap(),
            OrderStatus::InProgress
        );
    }

    #[test]
    fn confirm_is_idempotent_per_caller() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);

        engine.confirm_escrow(BUYER, id).unwrap();
        let snapshot = engine.get_order(id).unwrap().clone();

        // Second confirmation by the same party: no error, no change.
        engine.confirm_escrow(BUYER, id).unwrap();
        let after = engine.get_order(id).unwrap();
        assert_eq!(snapshot.status, after.status);
        assert_eq!(snapshot.buyer_confirmed, after.buyer_confirmed);
        assert_eq!(snapshot.seller_confirmed, after.seller_confirmed);
    }

    #[test]
    fn confirm_by_stranger_rejected() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        let result = engine.confirm_escrow("stranger", id);
        assert!(matches!(result.unwrap_err(), EscrowError::Unauthorized { .. }));
    }

    #[test]
    fn confirm_before_funding_rejected() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = engine
            .create_escrow(BUYER, SELLER, 10_000, "P", 3_600)
            .unwrap();
        let result = engine.confirm_escrow(BUYER, id);
        assert!(matches!(result.unwrap_err(), EscrowError::WrongState { .. }));
    }

    #[test]
    fn confirm_after_deadline_rejected() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        engine.clock_mut().advance_secs(3_601);
        let result = engine.confirm_escrow(BUYER, id);
        assert!(matches!(result.unwrap_err(), EscrowError::OrderExpired(_)));
    }

    // -- release ------------------------------------------------------------

    #[test]
    fn participant_release_requires_both_confirmations() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);

        // Only one confirmation: participants cannot release yet.
        engine.confirm_escrow(BUYER, id).unwrap();
        assert!(matches!(
            engine.release_escrow(BUYER, id).unwrap_err(),
            EscrowError::Unauthorized { .. }
        ));

        engine.confirm_escrow(SELLER, id).unwrap();
        engine.release_escrow(BUYER, id).unwrap();
        assert_eq!(engine.get_status(id).unwrap(), OrderStatus::Completed);
    }

    #[test]
    fn release_pays_seller_net_and_admin_fee() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine); // amount 10_000, fee rate 250 bps
        engine.confirm_escrow(BUYER, id).unwrap();
        engine.confirm_escrow(SELLER, id).unwrap();
        engine.release_escrow(SELLER, id).unwrap();

        // fee = 10_000 * 250 / 10_000 = 250
        assert_eq!(engine.ledger().balance_of(SELLER), 9_750);
        assert_eq!(engine.ledger().balance_of(ADMIN_WALLET), 250);
        assert_eq!(engine.total_escrowed(), 0);
        assert_eq!(engine.total_fees_collected(), 250);
        assert!(engine.check_custody_invariant());
    }

    #[test]
    fn owner_can_force_release_from_funded() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        engine.release_escrow(OWNER, id).unwrap();
        assert_eq!(engine.get_status(id).unwrap(), OrderStatus::Completed);
    }

    #[test]
    fn release_of_disputed_order_rejected() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        engine.raise_dispute(BUYER, id).unwrap();
        let result = engine.release_escrow(OWNER, id);
        assert!(matches!(result.unwrap_err(), EscrowError::WrongState { .. }));
    }

    #[test]
    fn release_after_deadline_rejected() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        engine.clock_mut().advance_secs(3_601);
        let result = engine.release_escrow(OWNER, id);
        assert!(matches!(result.unwrap_err(), EscrowError::OrderExpired(_)));
    }

    #[test]
    fn zero_fee_release_pays_seller_everything() {
        let mut engine = engine_with_buyer_balance(50_000);
        engine.set_fee_rate(OWNER, 0).unwrap();
        let id = funded_order(&mut engine);
        engine.release_escrow(OWNER, id).unwrap();
        assert_eq!(engine.ledger().balance_of(SELLER), 10_000);
        assert_eq!(engine.ledger().balance_of(ADMIN_WALLET), 0);
        assert_eq!(engine.total_fees_collected(), 0);
    }

    // -- disputes -----------------------------------------------------------

    #[test]
    fn raise_dispute_freezes_order() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        engine.raise_dispute(BUYER, id).unwrap();

        let order = engine.get_order(id).unwrap();
        assert_eq!(order.status, OrderStatus::Disputed);
        assert!(order.dispute_raised);
        assert_eq!(order.dispute_raised_by.as_deref(), Some(BUYER));
        assert!(order.resolution_deadline.is_some());

        // Frozen: confirm and release both refused.
        assert!(engine.confirm_escrow(SELLER, id).is_err());
        assert!(engine.release_escrow(OWNER, id).is_err());
    }

    #[test]
    fn double_dispute_rejected() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        engine.raise_dispute(BUYER, id).unwrap();
        let result = engine.raise_dispute(SELLER, id);
        assert!(matches!(
            result.unwrap_err(),
            EscrowError::DisputeAlreadyActive(_)
        ));
    }

    #[test]
    fn resolve_splits_net_with_remainder_to_seller() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine); // amount 10_000, fee 250
        engine.raise_dispute(SELLER, id).unwrap();
        // 3333 bps of net 9_750 = 3_249 (floored); seller takes 6_501.
        engine.resolve_dispute(OWNER, id, 3_333).unwrap();

        let buyer_got = engine.ledger().balance_of(BUYER) - 40_000;
        let seller_got = engine.ledger().balance_of(SELLER);
        assert_eq!(buyer_got, 3_249);
        assert_eq!(seller_got, 6_501);
        assert_eq!(buyer_got + seller_got, 9_750);
        assert_eq!(engine.ledger().balance_of(ADMIN_WALLET), 250);
        assert_eq!(engine.get_status(id).unwrap(), OrderStatus::Resolved);
        assert_eq!(engine.total_escrowed(), 0);
        assert!(engine.check_custody_invariant());
    }

    #[test]
    fn resolve_extreme_percentages() {
        // 0%: everything (net) to the seller.
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        engine.raise_dispute(BUYER, id).unwrap();
        engine.resolve_dispute(OWNER, id, 0).unwrap();
        assert_eq!(engine.ledger().balance_of(SELLER), 9_750);

        // 100%: everything (net) to the buyer.
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        engine.raise_dispute(BUYER, id).unwrap();
        engine.resolve_dispute(OWNER, id, 10_000).unwrap();
        assert_eq!(engine.ledger().balance_of(BUYER), 40_000 + 9_750);
        assert_eq!(engine.ledger().balance_of(SELLER), 0);
    }

    #[test]
    fn resolve_by_non_owner_rejected() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        engine.raise_dispute(BUYER, id).unwrap();
        let result = engine.resolve_dispute(BUYER, id, 5_000);
        assert!(matches!(result.unwrap_err(), EscrowError::NotOwner(_)));
    }

    #[test]
    fn resolve_percentage_out_of_range_rejected() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        engine.raise_dispute(BUYER, id).unwrap();
        let result = engine.resolve_dispute(OWNER, id, 10_001);
        assert!(matches!(
            result.unwrap_err(),
            EscrowError::InvalidPercentage(10_001)
        ));
    }

    #[test]
    fn resolve_undisputed_order_rejected() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        let result = engine.resolve_dispute(OWNER, id, 5_000);
        assert!(matches!(result.unwrap_err(), EscrowError::WrongState { .. }));
    }

    // -- cancel -------------------------------------------------------------

    #[test]
    fn buyer_cancels_unfunded_order() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = engine
            .create_escrow(BUYER, SELLER, 10_000, "P", 3_600)
            .unwrap();
        engine.cancel_escrow(BUYER, id).unwrap();
        assert_eq!(engine.get_status(id).unwrap(), OrderStatus::Cancelled);
        assert_eq!(engine.ledger().balance_of(BUYER), 50_000);
    }

    #[test]
    fn seller_cannot_cancel_unfunded_order() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = engine
            .create_escrow(BUYER, SELLER, 10_000, "P", 3_600)
            .unwrap();
        let result = engine.cancel_escrow(SELLER, id);
        assert!(matches!(result.unwrap_err(), EscrowError::Unauthorized { .. }));
    }

    #[test]
    fn owner_cancel_of_funded_order_refunds_buyer() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        engine.cancel_escrow(OWNER, id).unwrap();

        assert_eq!(engine.get_status(id).unwrap(), OrderStatus::Cancelled);
        assert_eq!(engine.ledger().balance_of(BUYER), 50_000);
        assert_eq!(engine.total_escrowed(), 0);
        assert!(engine.check_custody_invariant());
    }

    #[test]
    fn buyer_cannot_cancel_funded_order() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        let result = engine.cancel_escrow(BUYER, id);
        assert!(matches!(result.unwrap_err(), EscrowError::Unauthorized { .. }));
    }

    #[test]
    fn cancel_of_disputed_order_rejected() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        engine.raise_dispute(BUYER, id).unwrap();
        let result = engine.cancel_escrow(OWNER, id);
        assert!(matches!(result.unwrap_err(), EscrowError::WrongState { .. }));
    }

    // -- expiry -------------------------------------------------------------

    #[test]
    fn handle_expired_refunds_buyer() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        engine.clock_mut().advance_secs(3_601);
        engine.handle_expired(id).unwrap();

        assert_eq!(engine.get_status(id).unwrap(), OrderStatus::Expired);
        assert_eq!(engine.ledger().balance_of(BUYER), 50_000);
        assert_eq!(engine.total_escrowed(), 0);
        assert!(engine.check_custody_invariant());
    }

    #[test]
    fn handle_expired_before_deadline_rejected() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        let result = engine.handle_expired(id);
        assert!(matches!(result.unwrap_err(), EscrowError::WrongState { .. }));
        assert_eq!(engine.get_status(id).unwrap(), OrderStatus::Funded);
    }

    #[test]
    fn handle_expired_at_exact_deadline_rejected() {
        // now == timeout_at is still fresh; expiry requires strictly past.
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        engine.clock_mut().advance_secs(3_600);
        assert!(engine.handle_expired(id).is_err());
    }

    #[test]
    fn handle_expired_twice_rejected() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        engine.clock_mut().advance_secs(3_601);
        engine.handle_expired(id).unwrap();

        // Second expiry must not double-refund.
        assert!(engine.handle_expired(id).is_err());
        assert_eq!(engine.ledger().balance_of(BUYER), 50_000);
        assert_eq!(engine.total_escrowed(), 0);
    }

    #[test]
    fn unfunded_order_cannot_expire() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = engine
            .create_escrow(BUYER, SELLER, 10_000, "P", 3_600)
            .unwrap();
        engine.clock_mut().advance_secs(3_601);
        assert!(engine.handle_expired(id).is_err());
    }

    // -- events -------------------------------------------------------------

    #[test]
    fn events_emitted_in_order() {
        let mut engine = engine_with_buyer_balance(50_000);
        let id = funded_order(&mut engine);
        engine.confirm_escrow(BUYER, id).unwrap();
        engine.confirm_escrow(SELLER, id).unwrap();
        engine.release_escrow(BUYER, id).unwrap();

        let events = engine.drain_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], EscrowEvent::OrderCreated { .. }));
        assert!(matches!(events[1], EscrowEvent::OrderFunded { .. }));
        assert!(matches!(
            events[2],
            EscrowEvent::OrderReleased {
                seller_amount: 9_750,
                fee: 250,
                ..
            }
        ));

        // Outbox is drained.
        assert!(engine.drain_events().is_empty());
    }

    // -- queries ------------------------------------------------------------

    #[test]
    fn get_order_missing_is_not_found() {
        let engine = engine_with_buyer_balance(0);
        assert!(matches!(
            engine.get_order(99).unwrap_err(),
            EscrowError::OrderNotFound(99)
        ));
        assert!(matches!(
            engine.get_status(99).unwrap_err(),
            EscrowError::OrderNotFound(99)
        ));
    }

    #[test]
    fn amount_limit_query_reflects_updates() {
        let mut engine = engine_with_buyer_balance(0);
        engine.set_amount_limits(OWNER, 1_000, 2_000).unwrap();
        assert_eq!(engine.amount_limits(), (1_000, 2_000));
    }
}
