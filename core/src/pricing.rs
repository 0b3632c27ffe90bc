//! Tiered booth rent.
//!
//! The more booths a customer rents at once, the cheaper each booth gets.
//! The tier is picked by the customer's total active booth count and then
//! applies to every one of their booths.

use crate::{config::RentTier, types::Money};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct RentSchedule {
    tiers: Vec<RentTier>,
}

impl RentSchedule {
    /// `tiers` must be ascending by `min_booths`; `SettlementConfig::validate`
    /// enforces that for loaded configs.
    pub fn new(tiers: Vec<RentTier>) -> Self {
        Self { tiers }
    }

    pub fn rent_per_booth(&self, active_booths: u32) -> Money {
        if active_booths == 0 {
            return Decimal::ZERO;
        }
        self.tiers
            .iter()
            .rev()
            .find(|t| t.min_booths <= active_booths)
            .map(|t| t.price_per_booth)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total_rent(&self, active_booths: u32) -> Money {
        Decimal::from(active_booths) * self.rent_per_booth(active_booths)
    }
}

impl Default for RentSchedule {
    fn default() -> Self {
        Self::new(crate::config::SettlementConfig::default().rent_tiers)
    }
}
