//! Read-only entity snapshots.
//!
//! The engine never talks to a store mid-computation. It captures every
//! collection once through `EntityStore`, then works on that immutable
//! snapshot for the whole run.

use crate::{
    error::SettleResult,
    model::{Booth, CartLine, Customer, Item, Sale, ShoppingCart},
};
use serde::{Deserialize, Serialize};

/// The read side of whatever holds the market's records.
/// Each accessor returns every current record of its kind.
pub trait EntityStore {
    fn booths(&self) -> SettleResult<Vec<Booth>>;
    fn customers(&self) -> SettleResult<Vec<Customer>>;
    fn items(&self) -> SettleResult<Vec<Item>>;
    fn cart_lines(&self) -> SettleResult<Vec<CartLine>>;
    fn carts(&self) -> SettleResult<Vec<ShoppingCart>>;
    fn sales(&self) -> SettleResult<Vec<Sale>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EntitySnapshot {
    pub booths:     Vec<Booth>,
    pub customers:  Vec<Customer>,
    pub items:      Vec<Item>,
    pub cart_lines: Vec<CartLine>,
    pub carts:      Vec<ShoppingCart>,
    pub sales:      Vec<Sale>,
}

impl EntitySnapshot {
    /// Read every collection from `store`. Any store failure aborts the
    /// capture; nothing partial is returned.
    pub fn capture(store: &dyn EntityStore) -> SettleResult<Self> {
        let snapshot = Self {
            booths:     store.booths()?,
            customers:  store.customers()?,
            items:      store.items()?,
            cart_lines: store.cart_lines()?,
            carts:      store.carts()?,
            sales:      store.sales()?,
        };
        log::debug!(
            "snapshot: {} booths, {} customers, {} items, {} cart lines, {} carts, {} sales",
            snapshot.booths.len(),
            snapshot.customers.len(),
            snapshot.items.len(),
            snapshot.cart_lines.len(),
            snapshot.carts.len(),
            snapshot.sales.len(),
        );
        Ok(snapshot)
    }
}

/// An in-memory snapshot is itself a store. Lets callers and tests drive
/// the engine without a database.
impl EntityStore for EntitySnapshot {
    fn booths(&self) -> SettleResult<Vec<Booth>> { Ok(self.booths.clone()) }
    fn customers(&self) -> SettleResult<Vec<Customer>> { Ok(self.customers.clone()) }
    fn items(&self) -> SettleResult<Vec<Item>> { Ok(self.items.clone()) }
    fn cart_lines(&self) -> SettleResult<Vec<CartLine>> { Ok(self.cart_lines.clone()) }
    fn carts(&self) -> SettleResult<Vec<ShoppingCart>> { Ok(self.carts.clone()) }
    fn sales(&self) -> SettleResult<Vec<Sale>> { Ok(self.sales.clone()) }
}
