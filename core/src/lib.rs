//! Booth-market settlement engine.
//!
//! Computes, for a reporting period, each renting customer's tiered rent,
//! the commission owed on their sales and their outstanding balance, plus
//! market-wide totals.

pub mod anomaly;
pub mod commission;
pub mod config;
pub mod demo;
pub mod engine;
pub mod error;
pub mod model;
pub mod period;
pub mod pricing;
pub mod resolver;
pub mod rng;
pub mod settlement;
pub mod snapshot;
pub mod store;
pub mod types;

pub use engine::SettlementEngine;
pub use error::{SettleError, SettleResult};
pub use period::Period;
pub use settlement::{compute_settlements, AggregateFigures, CustomerSettlement, SettlementReport};
pub use snapshot::{EntitySnapshot, EntityStore};
