//! The settlement engine: entry point for callers holding a store.
//!
//! ORDER OF A RUN (fixed):
//!   1. Validate period and config. Nothing is read before this passes.
//!   2. Capture an immutable snapshot through `EntityStore`.
//!   3. Compute the report from the snapshot alone.
//!
//! RULES:
//!   - The engine never writes market records.
//!   - Store failures propagate unchanged; there is no retry here.
//!   - Each run starts from a fresh snapshot; nothing carries over.

use crate::{
    config::SettlementConfig,
    error::SettleResult,
    period::Period,
    resolver::{RelationshipResolver, SalesRow},
    settlement::{self, CustomerSettlement, SettlementReport},
    snapshot::{EntitySnapshot, EntityStore},
    store::MarketStore,
    types::CustomerId,
};

pub struct SettlementEngine {
    config: SettlementConfig,
}

impl SettlementEngine {
    /// Engine with an explicit config. Rejects invalid schedules up front.
    pub fn new(config: SettlementConfig) -> SettleResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Settle every renting customer for `period`.
    pub fn run(&self, store: &dyn EntityStore, period: &Period) -> SettleResult<SettlementReport> {
        period.validate()?;
        let snapshot = EntitySnapshot::capture(store)?;
        settlement::compute_settlements(period, &snapshot, &self.config)
    }

    /// Run and persist the report in the same store.
    pub fn run_and_save(
        &self,
        store: &MarketStore,
        period: &Period,
    ) -> SettleResult<(i64, SettlementReport)> {
        let report = self.run(store, period)?;
        let id = store.save_settlement_report(&report)?;
        log::info!("settlement {period}: saved report #{id}");
        Ok((id, report))
    }

    /// Settlement for one renter, `None` if they have no active booth.
    pub fn settle_customer(
        &self,
        store: &dyn EntityStore,
        customer_id: &CustomerId,
        period: &Period,
    ) -> SettleResult<Option<CustomerSettlement>> {
        period.validate()?;
        let snapshot = EntitySnapshot::capture(store)?;
        settlement::settle_customer(customer_id, period, &snapshot, &self.config)
    }

    /// Left-join sales overview, optionally restricted to a period.
    pub fn sales_rows(
        &self,
        store: &dyn EntityStore,
        window: Option<&Period>,
    ) -> SettleResult<Vec<SalesRow>> {
        if let Some(w) = window {
            w.validate()?;
        }
        let snapshot = EntitySnapshot::capture(store)?;
        let resolver = RelationshipResolver::new(&snapshot);
        Ok(resolver.sales_rows(window))
    }
}

impl Default for SettlementEngine {
    fn default() -> Self {
        Self {
            config: SettlementConfig::default(),
        }
    }
}
