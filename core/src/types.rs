//! Shared primitive types used across the whole settlement engine.

use rust_decimal::Decimal;
use uuid::Uuid;

/// All monetary amounts. Never f64: settlements must be exact to the cent.
pub type Money = Decimal;

pub type BoothId = Uuid;
pub type CustomerId = Uuid;
pub type ItemId = Uuid;
pub type CartId = Uuid;
pub type SaleId = Uuid;
pub type PaymentId = Uuid;
