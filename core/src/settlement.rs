//! Settlement aggregator: per-customer balances and market totals for one
//! reporting period.
//!
//! Pipeline, in order:
//!   1. resolve the entity graph (anomalies collected, never fatal)
//!   2. pick customers with at least one active booth
//!   3. tiered rent from the active booth count
//!   4. attributable sales inside the period, then commission
//!   5. outstanding = sales − commission − rent
//!   6. market-wide aggregate figures
//!
//! Pure function of (period, snapshot, config). Nothing is cached between
//! calls, so repeated runs on the same inputs give identical reports.

use crate::{
    anomaly::DataAnomaly,
    commission::CommissionRule,
    config::SettlementConfig,
    error::SettleResult,
    model::BoothStatus,
    period::Period,
    pricing::RentSchedule,
    resolver::RelationshipResolver,
    snapshot::EntitySnapshot,
    types::{CustomerId, Money},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSettlement {
    pub customer_id:        CustomerId,
    pub customer_name:      String,
    pub booth_count:        u32,
    pub booth_numbers:      Vec<i32>,
    pub rent_per_booth:     Money,
    pub total_rent:         Money,
    pub sales_count:        u32,
    pub sales_total:        Money,
    pub commission_percent: Money,
    pub commission:         Money,
    /// Positive: the market owes the customer. Negative: the customer owes
    /// the market.
    pub outstanding:        Money,
}

impl CustomerSettlement {
    pub fn is_negative(&self) -> bool {
        self.outstanding < Decimal::ZERO
    }

    /// Zero counts as positive: nothing is owed to the market.
    pub fn is_positive(&self) -> bool {
        !self.is_negative()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateFigures {
    pub active_booths:      u32,
    pub available_booths:   u32,
    pub booths_by_status:   BTreeMap<String, u32>,
    pub total_rent_income:  Money,
    pub total_commission:   Money,
    /// Every sale in the period, attributable or not.
    pub sales_count:        u32,
    pub sales_value:        Money,
    /// Sum of every customer's outstanding balance.
    pub total_outstanding:  Money,
    pub monthly_income:     Money,
    pub monthly_expenses:   Money,
    pub monthly_difference: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub period:       Period,
    pub per_customer: Vec<CustomerSettlement>,
    pub aggregate:    AggregateFigures,
    pub anomalies:    Vec<DataAnomaly>,
}

impl SettlementReport {
    pub fn customer(&self, customer_id: &CustomerId) -> Option<&CustomerSettlement> {
        self.per_customer.iter().find(|s| &s.customer_id == customer_id)
    }
}

/// The rules one run settles with, built from a config.
struct Rules {
    rent:       RentSchedule,
    commission: CommissionRule,
}

impl Rules {
    fn from_config(config: &SettlementConfig) -> Self {
        Self {
            rent:       RentSchedule::new(config.rent_tiers.clone()),
            commission: CommissionRule::new(config.commission_percent, config.rounding),
        }
    }
}

/// Settle every renting customer for `period`.
///
/// Fails only for an invalid period or config; data anomalies are
/// reported in the result.
pub fn compute_settlements(
    period: &Period,
    snapshot: &EntitySnapshot,
    config: &SettlementConfig,
) -> SettleResult<SettlementReport> {
    period.validate()?;
    config.validate()?;

    let rules = Rules::from_config(config);
    let resolver = RelationshipResolver::new(snapshot);

    let renting: BTreeSet<CustomerId> = resolver
        .booths()
        .iter()
        .filter(|b| resolver.is_active(b, period))
        .filter_map(|b| b.tenant())
        .collect();

    let mut per_customer: Vec<CustomerSettlement> = renting
        .iter()
        .filter_map(|id| settle_one(&resolver, &rules, id, period))
        .collect();
    per_customer.sort_by(|a, b| {
        a.customer_name
            .cmp(&b.customer_name)
            .then(a.customer_id.cmp(&b.customer_id))
    });

    let aggregate = aggregate(&resolver, snapshot, config, &per_customer, period);

    log::info!(
        "settlement {period}: {} customers, rent {} + commission {} = income {}, outstanding {}",
        per_customer.len(),
        aggregate.total_rent_income,
        aggregate.total_commission,
        aggregate.monthly_income,
        aggregate.total_outstanding,
    );

    Ok(SettlementReport {
        period: *period,
        per_customer,
        aggregate,
        anomalies: resolver.anomalies().to_vec(),
    })
}

/// Settle one customer. `Ok(None)` when they have no active booth in
/// `period` (or are unknown): such customers owe and are owed nothing.
pub fn settle_customer(
    customer_id: &CustomerId,
    period: &Period,
    snapshot: &EntitySnapshot,
    config: &SettlementConfig,
) -> SettleResult<Option<CustomerSettlement>> {
    period.validate()?;
    config.validate()?;
    let rules = Rules::from_config(config);
    let resolver = RelationshipResolver::new(snapshot);
    Ok(settle_one(&resolver, &rules, customer_id, period))
}

fn settle_one(
    resolver: &RelationshipResolver<'_>,
    rules: &Rules,
    customer_id: &CustomerId,
    period: &Period,
) -> Option<CustomerSettlement> {
    let customer = resolver.customer(customer_id)?;
    let booths = resolver.active_booths_of(customer_id, period);
    if booths.is_empty() {
        return None;
    }

    let booth_count = booths.len() as u32;
    let mut booth_numbers: Vec<i32> = booths.iter().map(|b| b.booth_number).collect();
    booth_numbers.sort_unstable();

    let rent_per_booth = rules.rent.rent_per_booth(booth_count);
    let total_rent = rules.rent.total_rent(booth_count);

    let sales = resolver.attributable_sales(customer_id, Some(period));
    let sales_total: Money = sales.iter().map(|s| s.share).sum();
    let commission = rules.commission.commission(sales_total);
    let outstanding = sales_total - commission - total_rent;

    log::debug!(
        "settle {}: {booth_count} booths x {rent_per_booth}, {} sales = {sales_total}, commission {commission}, outstanding {outstanding}",
        customer.name,
        sales.len(),
    );

    Some(CustomerSettlement {
        customer_id: *customer_id,
        customer_name: customer.name.clone(),
        booth_count,
        booth_numbers,
        rent_per_booth,
        total_rent,
        sales_count: sales.len() as u32,
        sales_total,
        commission_percent: rules.commission.percent,
        commission,
        outstanding,
    })
}

fn aggregate(
    resolver: &RelationshipResolver<'_>,
    snapshot: &EntitySnapshot,
    config: &SettlementConfig,
    per_customer: &[CustomerSettlement],
    period: &Period,
) -> AggregateFigures {
    let booths = resolver.booths();
    let active_booths = booths.iter().filter(|b| resolver.is_active(b, period)).count() as u32;
    let available_booths = booths.len() as u32 - active_booths;

    let mut booths_by_status: BTreeMap<String, u32> = BTreeMap::new();
    for status in [
        BoothStatus::Free,
        BoothStatus::Occupied,
        BoothStatus::Reserved,
        BoothStatus::OutOfService,
    ] {
        booths_by_status.insert(status.as_str().to_string(), 0);
    }
    for b in booths {
        *booths_by_status.entry(b.status.as_str().to_string()).or_default() += 1;
    }

    let total_rent_income: Money = per_customer.iter().map(|s| s.total_rent).sum();
    let total_commission: Money = per_customer.iter().map(|s| s.commission).sum();
    let total_outstanding: Money = per_customer.iter().map(|s| s.outstanding).sum();

    // Market-wide: every sale dated inside the period, by id so a
    // duplicated sale record is counted once.
    let mut seen = BTreeSet::new();
    let mut sales_count = 0u32;
    let mut sales_value = Decimal::ZERO;
    for sale in &snapshot.sales {
        if period.contains(sale.sale_date) && seen.insert(sale.sale_id) {
            sales_count += 1;
            sales_value += sale.total_price;
        }
    }

    let monthly_income = total_rent_income + total_commission;
    let monthly_expenses = config.expenses.total();

    AggregateFigures {
        active_booths,
        available_booths,
        booths_by_status,
        total_rent_income,
        total_commission,
        sales_count,
        sales_value,
        total_outstanding,
        monthly_income,
        monthly_expenses,
        monthly_difference: monthly_income - monthly_expenses,
    }
}
