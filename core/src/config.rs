//! Settlement configuration: rent tiers, commission and fixed expenses.
//!
//! `SettlementConfig::default()` is the market's standing business rule.
//! Load a JSON file only to run alternate schedules.

use crate::{
    error::{SettleError, SettleResult},
    types::Money,
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Price per booth for customers renting at least `min_booths` booths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentTier {
    pub min_booths:      u32,
    pub price_per_booth: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// 0.025 -> 0.03
    HalfAwayFromZero,
    /// 0.025 -> 0.02 (banker's rounding)
    HalfEven,
}

impl RoundingMode {
    pub fn strategy(&self) -> RoundingStrategy {
        match self {
            RoundingMode::HalfAwayFromZero => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfEven         => RoundingStrategy::MidpointNearestEven,
        }
    }

    /// Round to whole cents.
    pub fn round(&self, amount: Money) -> Money {
        amount.round_dp_with_strategy(2, self.strategy())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyStaff {
    pub hourly_rate:  Money,
    pub weekly_hours: Money,
}

/// Fixed monthly running costs of the market itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyExpenses {
    pub premises_rent:   Money,
    pub electricity:     Money,
    pub water:           Money,
    pub heating:         Money,
    pub internet:        Money,
    pub fixed_salaries:  Vec<Money>,
    pub hourly_staff:    Vec<HourlyStaff>,
    /// Average weeks in a month, used to turn weekly hours into a salary.
    pub weeks_per_month: Money,
}

impl MonthlyExpenses {
    pub fn hourly_salaries(&self) -> Money {
        self.hourly_staff
            .iter()
            .map(|s| s.hourly_rate * s.weekly_hours * self.weeks_per_month)
            .sum()
    }

    pub fn total(&self) -> Money {
        self.premises_rent
            + self.electricity
            + self.water
            + self.heating
            + self.internet
            + self.fixed_salaries.iter().copied().sum::<Money>()
            + self.hourly_salaries()
    }
}

impl Default for MonthlyExpenses {
    fn default() -> Self {
        Self {
            premises_rent:   Decimal::new(7500, 0),
            electricity:     Decimal::new(1500, 0),
            water:           Decimal::new(500, 0),
            heating:         Decimal::new(100, 0),
            internet:        Decimal::new(300, 0),
            fixed_salaries:  vec![Decimal::new(25000, 0), Decimal::new(25000, 0)],
            hourly_staff:    vec![HourlyStaff {
                hourly_rate:  Decimal::new(155, 0),
                weekly_hours: Decimal::new(25, 0),
            }],
            weeks_per_month: Decimal::new(433, 2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Ascending by `min_booths`. Zero booths always rent for zero.
    pub rent_tiers:         Vec<RentTier>,
    pub commission_percent: Money,
    pub rounding:           RoundingMode,
    #[serde(default)]
    pub expenses:           MonthlyExpenses,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            rent_tiers: vec![
                RentTier { min_booths: 1, price_per_booth: Decimal::new(850, 0) },
                RentTier { min_booths: 2, price_per_booth: Decimal::new(825, 0) },
                RentTier { min_booths: 4, price_per_booth: Decimal::new(800, 0) },
            ],
            commission_percent: Decimal::new(10, 0),
            rounding:           RoundingMode::HalfAwayFromZero,
            expenses:           MonthlyExpenses::default(),
        }
    }
}

impl SettlementConfig {
    /// Load and validate a config file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SettlementConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SettleResult<()> {
        if self.rent_tiers.is_empty() {
            return Err(SettleError::invalid_config("at least one rent tier is required"));
        }
        let mut previous: Option<u32> = None;
        for tier in &self.rent_tiers {
            if tier.min_booths == 0 {
                return Err(SettleError::invalid_config(
                    "rent tiers start at 1 booth; 0 booths always rent for 0",
                ));
            }
            if previous.is_some_and(|p| tier.min_booths <= p) {
                return Err(SettleError::invalid_config(format!(
                    "rent tiers must be strictly ascending, {} follows {}",
                    tier.min_booths,
                    previous.unwrap_or_default()
                )));
            }
            if tier.price_per_booth.is_sign_negative() {
                return Err(SettleError::invalid_config(format!(
                    "tier from {} booths has a negative price",
                    tier.min_booths
                )));
            }
            previous = Some(tier.min_booths);
        }
        if self.commission_percent < Decimal::ZERO || self.commission_percent > Decimal::ONE_HUNDRED {
            return Err(SettleError::invalid_config(format!(
                "commission must be between 0 and 100 percent, got {}",
                self.commission_percent
            )));
        }
        if self.expenses.total().is_sign_negative() {
            return Err(SettleError::invalid_config("monthly expenses cannot be negative"));
        }
        Ok(())
    }
}
