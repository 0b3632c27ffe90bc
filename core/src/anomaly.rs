//! Data-integrity anomalies found while resolving the entity graph.
//!
//! RULE: an anomaly never aborts a settlement run. The offending record is
//! left out of the relational chain, the anomaly is logged and handed back
//! to the caller with the report.

use crate::types::{BoothId, CartId, CustomerId, ItemId, SaleId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataAnomaly {
    ItemWithUnknownBooth {
        item_id:  ItemId,
        booth_id: BoothId,
    },
    CartLineWithUnknownItem {
        item_id: ItemId,
        cart_id: CartId,
    },
    CartLineWithUnknownCart {
        item_id: ItemId,
        cart_id: CartId,
    },
    SaleWithUnknownCart {
        sale_id: SaleId,
        cart_id: CartId,
    },
    BoothWithUnknownCustomer {
        booth_id:    BoothId,
        customer_id: CustomerId,
    },
    RentedBoothWithoutCustomer {
        booth_id:     BoothId,
        booth_number: i32,
    },
    DuplicateKey {
        entity: String,
        key:    String,
    },
}

impl DataAnomaly {
    /// Stable name, handy for grouping in summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            DataAnomaly::ItemWithUnknownBooth { .. }       => "item_with_unknown_booth",
            DataAnomaly::CartLineWithUnknownItem { .. }    => "cart_line_with_unknown_item",
            DataAnomaly::CartLineWithUnknownCart { .. }    => "cart_line_with_unknown_cart",
            DataAnomaly::SaleWithUnknownCart { .. }        => "sale_with_unknown_cart",
            DataAnomaly::BoothWithUnknownCustomer { .. }   => "booth_with_unknown_customer",
            DataAnomaly::RentedBoothWithoutCustomer { .. } => "rented_booth_without_customer",
            DataAnomaly::DuplicateKey { .. }               => "duplicate_key",
        }
    }
}

impl fmt::Display for DataAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataAnomaly::ItemWithUnknownBooth { item_id, booth_id } => {
                write!(f, "item {item_id} references unknown booth {booth_id}")
            }
            DataAnomaly::CartLineWithUnknownItem { item_id, cart_id } => {
                write!(f, "cart line in cart {cart_id} references unknown item {item_id}")
            }
            DataAnomaly::CartLineWithUnknownCart { item_id, cart_id } => {
                write!(f, "cart line for item {item_id} references unknown cart {cart_id}")
            }
            DataAnomaly::SaleWithUnknownCart { sale_id, cart_id } => {
                write!(f, "sale {sale_id} references unknown cart {cart_id}")
            }
            DataAnomaly::BoothWithUnknownCustomer { booth_id, customer_id } => {
                write!(f, "booth {booth_id} is rented to unknown customer {customer_id}")
            }
            DataAnomaly::RentedBoothWithoutCustomer { booth_id, booth_number } => {
                write!(f, "booth #{booth_number} ({booth_id}) is marked rented but has no customer")
            }
            DataAnomaly::DuplicateKey { entity, key } => {
                write!(f, "duplicate {entity} key {key}")
            }
        }
    }
}
