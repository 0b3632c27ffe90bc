//! Market entities as the store hands them out.
//!
//! These are plain records. The settlement engine only ever reads them;
//! creating and editing them belongs to the store.

use crate::types::{BoothId, CartId, CustomerId, ItemId, Money, PaymentId, SaleId};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BoothStatus {
    Free,
    Occupied,
    Reserved,
    OutOfService,
}

impl BoothStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoothStatus::Free         => "free",
            BoothStatus::Occupied     => "occupied",
            BoothStatus::Reserved     => "reserved",
            BoothStatus::OutOfService => "out_of_service",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free"           => Some(BoothStatus::Free),
            "occupied"       => Some(BoothStatus::Occupied),
            "reserved"       => Some(BoothStatus::Reserved),
            "out_of_service" => Some(BoothStatus::OutOfService),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booth {
    pub booth_id:          BoothId,
    pub booth_number:      i32,
    pub number_of_shelves: i32,
    pub has_hanger_bar:    bool,
    pub is_rented:         bool,
    pub status:            BoothStatus,
    pub customer_id:       Option<CustomerId>,
    pub start_date:        Option<NaiveDate>,
    pub end_date:          Option<NaiveDate>,
}

impl Booth {
    /// A fresh, unrented booth with the default shelf layout.
    pub fn new(booth_number: i32) -> Self {
        Self {
            booth_id:          uuid::Uuid::new_v4(),
            booth_number,
            number_of_shelves: 6,
            has_hanger_bar:    false,
            is_rented:         false,
            status:            BoothStatus::Free,
            customer_id:       None,
            start_date:        None,
            end_date:          None,
        }
    }

    /// Lease this booth to `customer_id` from `start`.
    pub fn rented_to(mut self, customer_id: CustomerId, start: NaiveDate) -> Self {
        self.is_rented = true;
        self.status = BoothStatus::Occupied;
        self.customer_id = Some(customer_id);
        self.start_date = Some(start);
        self
    }

    pub fn ending(mut self, end: NaiveDate) -> Self {
        self.end_date = Some(end);
        self
    }

    /// Rented according to either flag. Says nothing about whether a
    /// customer is actually attached; see `tenant`.
    pub fn is_marked_rented(&self) -> bool {
        self.is_rented || self.status == BoothStatus::Occupied
    }

    /// The customer this booth counts against for settlement, if any.
    /// A booth marked rented without a customer id has no tenant.
    pub fn tenant(&self) -> Option<CustomerId> {
        if self.is_marked_rented() {
            self.customer_id
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub customer_id: CustomerId,
    pub name:        String,
    pub email:       String,
    pub phone:       String,
    pub address:     String,
    pub postal_code: String,
}

impl Customer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            customer_id: uuid::Uuid::new_v4(),
            name:        name.into(),
            email:       String::new(),
            phone:       String::new(),
            address:     String::new(),
            postal_code: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub item_id:  ItemId,
    pub name:     String,
    pub price:    Money,
    pub booth_id: BoothId,
}

impl Item {
    pub fn new(name: impl Into<String>, price: Money, booth_id: BoothId) -> Self {
        Self {
            item_id: uuid::Uuid::new_v4(),
            name: name.into(),
            price,
            booth_id,
        }
    }
}

/// Cached totals only. Sales and cart lines are authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShoppingCart {
    pub cart_id:     CartId,
    pub quantity:    i32,
    pub total_price: Money,
}

impl ShoppingCart {
    pub fn new() -> Self {
        Self {
            cart_id:     uuid::Uuid::new_v4(),
            quantity:    0,
            total_price: Decimal::ZERO,
        }
    }
}

impl Default for ShoppingCart {
    fn default() -> Self {
        Self::new()
    }
}

/// One item sold in one cart. Keyed by `(item_id, cart_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub item_id:    ItemId,
    pub cart_id:    CartId,
    pub quantity:   i32,
    pub unit_price: Money,
}

impl CartLine {
    pub fn key(&self) -> (ItemId, CartId) {
        (self.item_id, self.cart_id)
    }

    pub fn line_total(&self) -> Money {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sale {
    pub sale_id:     SaleId,
    pub sale_date:   NaiveDateTime,
    pub cart_id:     CartId,
    pub payment_id:  PaymentId,
    pub total_price: Money,
}
