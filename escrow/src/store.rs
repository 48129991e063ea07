//! # Order Store
//!
//! Durable mapping from [`OrderId`] to [`EscrowOrder`], exclusively
//! owned by the engine. Ids are assigned sequentially starting at 1 —
//! matching the on-chain contract's counter — so external systems can
//! reference orders by small integers.
//!
//! This initial version keeps the map in memory; a persistence backend
//! replaces the `HashMap` once the engine moves behind a durable
//! service boundary. Decision of record: there is no per-user secondary
//! index. If buyer/seller lookups are ever needed, they get an explicit
//! index, not an incidental field.

use std::collections::HashMap;

use crate::error::EscrowError;
use crate::order::{EscrowOrder, OrderId};

/// Engine-owned collection of all escrow orders.
#[derive(Debug, Clone, Default)]
pub struct OrderStore {
    orders: HashMap<OrderId, EscrowOrder>,
    next_id: OrderId,
}

impl OrderStore {
    /// Creates an empty store. The first assigned id is 1.
    pub fn new() -> Self {
        Self {
            orders: HashMap::new(),
            next_id: 1,
        }
    }

    /// Reserves and returns the next sequential order id.
    pub fn allocate_id(&mut self) -> OrderId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Inserts a newly created order. The id must have been allocated
    /// by this store.
    pub fn insert(&mut self, order: EscrowOrder) {
        self.orders.insert(order.id, order);
    }

    /// Looks up an order by id.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::OrderNotFound`] if no such order exists.
    pub fn get(&self, id: OrderId) -> Result<&EscrowOrder, EscrowError> {
        self.orders.get(&id).ok_or(EscrowError::OrderNotFound(id))
    }

    /// Looks up an order for mutation.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::OrderNotFound`] if no such order exists.
    pub fn get_mut(&mut self, id: OrderId) -> Result<&mut EscrowOrder, EscrowError> {
        self.orders
            .get_mut(&id)
            .ok_or(EscrowError::OrderNotFound(id))
    }

    /// Number of orders ever created.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Returns `true` if no order has been created yet.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Iterates over all orders. Used by invariant checks that rescan
    /// custody from first principles.
    pub fn iter(&self) -> impl Iterator<Item = &EscrowOrder> {
        self.orders.values()
    }
}
