//! Commission the market keeps on a customer's sales.

use crate::{config::RoundingMode, types::Money};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy)]
pub struct CommissionRule {
    pub percent:  Money,
    pub rounding: RoundingMode,
}

impl CommissionRule {
    pub fn new(percent: Money, rounding: RoundingMode) -> Self {
        Self { percent, rounding }
    }

    /// `sales_total × percent / 100`, rounded to cents.
    pub fn commission(&self, sales_total: Money) -> Money {
        self.rounding
            .round(sales_total * self.percent / Decimal::ONE_HUNDRED)
    }
}

impl Default for CommissionRule {
    fn default() -> Self {
        Self::new(Decimal::TEN, RoundingMode::HalfAwayFromZero)
    }
}
