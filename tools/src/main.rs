//! settle-runner: headless settlement runner for the booth market.
//!
//! Usage:
//!   settle-runner --db market.db --year 2025 --month 3
//!   settle-runner --db market.db --start 2025-03-01 --end 2025-03-15 --json
//!   settle-runner --demo --seed 7 --year 2025 --month 3 --save
//!   settle-runner --db market.db --customer <uuid> --year 2025 --month 3
//!   settle-runner --db market.db --rows --year 2025 --month 3

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use reolmarket_core::{
    config::SettlementConfig,
    demo::seed_demo_market,
    period::Period,
    settlement::SettlementReport,
    store::MarketStore,
    SettlementEngine,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let demo = has_flag(&args, "--demo");
    let seed = parse_arg(&args, "--seed", 42u64);
    let json = has_flag(&args, "--json");
    let save = has_flag(&args, "--save");
    let rows = has_flag(&args, "--rows");

    let period = parse_period(&args)?;

    let config = match arg_value(&args, "--config") {
        Some(path) => SettlementConfig::load(path)?,
        None => SettlementConfig::default(),
    };
    let engine = SettlementEngine::new(config)?;

    let store = MarketStore::open(db)?;
    store.migrate()?;

    if demo {
        let summary = seed_demo_market(&store, seed, &period)?;
        if !json {
            println!(
                "seeded demo market: {} customers, {} booths, {} items, {} sales",
                summary.customers, summary.booths, summary.items, summary.sales
            );
            println!();
        }
    }

    if let Some(raw) = arg_value(&args, "--customer") {
        let customer_id = uuid::Uuid::parse_str(raw)
            .with_context(|| format!("--customer expects a UUID, got '{raw}'"))?;
        match engine.settle_customer(&store, &customer_id, &period)? {
            Some(s) if json => println!("{}", serde_json::to_string_pretty(&s)?),
            Some(s) => {
                println!("{} ({period})", s.customer_name);
                println!("  booths:       {} {:?}", s.booth_count, s.booth_numbers);
                println!("  rent:         {} x {} = {}", s.booth_count, s.rent_per_booth, s.total_rent);
                println!("  sales:        {} ({} sales)", s.sales_total, s.sales_count);
                println!("  commission:   {} ({}%)", s.commission, s.commission_percent);
                println!("  outstanding:  {}", s.outstanding);
            }
            None => println!("customer {customer_id} has no active booth in {period}"),
        }
        return Ok(());
    }

    if rows {
        let rows = engine.sales_rows(&store, Some(&period))?;
        if json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        } else {
            for r in &rows {
                println!(
                    "{:<24} #{:<4} {:<20} {:>10} {}",
                    r.customer_name,
                    r.booth_number,
                    r.item_name.as_deref().unwrap_or("-"),
                    r.sale_total.map(|t| t.to_string()).unwrap_or_else(|| "-".into()),
                    r.sale_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                );
            }
        }
        return Ok(());
    }

    let report = if save {
        let (id, report) = engine.run_and_save(&store, &period)?;
        log::info!("report saved as #{id}");
        report
    } else {
        engine.run(&store, &period)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn parse_period(args: &[String]) -> Result<Period> {
    match (arg_value(args, "--start"), arg_value(args, "--end")) {
        (Some(start), Some(end)) => {
            let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
                .with_context(|| format!("--start expects YYYY-MM-DD, got '{start}'"))?;
            let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
                .with_context(|| format!("--end expects YYYY-MM-DD, got '{end}'"))?;
            Ok(Period::range(start, end)?)
        }
        (None, None) => {
            let today = chrono::Local::now().date_naive();
            let year = parse_arg(args, "--year", today.year());
            let month = parse_arg(args, "--month", today.month());
            Ok(Period::month(year, month)?)
        }
        _ => bail!("--start and --end must be given together"),
    }
}

fn print_report(report: &SettlementReport) {
    println!("=== SETTLEMENT {} ===", report.period);
    if report.per_customer.is_empty() {
        println!("  (No renting customers in this period)");
    } else {
        println!(
            "  {:<24} {:>6} {:>10} {:>10} {:>10} {:>10} {:>12}",
            "customer", "booths", "rent/booth", "rent", "sales", "commission", "outstanding"
        );
        for s in &report.per_customer {
            println!(
                "  {:<24} {:>6} {:>10} {:>10} {:>10} {:>10} {:>12}",
                s.customer_name,
                s.booth_count,
                s.rent_per_booth,
                s.total_rent,
                s.sales_total,
                s.commission,
                s.outstanding,
            );
        }
    }

    let a = &report.aggregate;
    println!();
    println!("=== MARKET ===");
    println!("  active booths:     {}", a.active_booths);
    println!("  available booths:  {}", a.available_booths);
    println!("  sales:             {} ({} sales)", a.sales_value, a.sales_count);
    println!("  rent income:       {}", a.total_rent_income);
    println!("  commission:        {}", a.total_commission);
    println!("  income:            {}", a.monthly_income);
    println!("  expenses:          {}", a.monthly_expenses);
    println!("  difference:        {}", a.monthly_difference);

    if !report.anomalies.is_empty() {
        println!();
        println!("=== DATA ANOMALIES ({}) ===", report.anomalies.len());
        for anomaly in &report.anomalies {
            println!("  {anomaly}");
        }
    }
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
