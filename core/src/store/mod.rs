//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! The settlement engine reads through `EntityStore`; it never executes
//! SQL and never writes market records.

use crate::{
    error::{SettleError, SettleResult},
    model::{Booth, CartLine, Customer, Item, Sale, ShoppingCart},
    settlement::SettlementReport,
    snapshot::EntityStore,
    types::Money,
};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use std::str::FromStr;
use uuid::Uuid;

mod booth;
mod sales;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub struct MarketStore {
    conn: Connection,
}

impl MarketStore {
    /// Open (or create) the market database at `path`.
    pub fn open(path: &str) -> SettleResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(|e| SettleError::StoreUnavailable {
            reason: format!("cannot open {path}: {e}"),
        })?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SettleResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SettleResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_market.sql"))?;
        Ok(())
    }

    // ── Settlement reports ─────────────────────────────────────

    /// Persist a finished report as JSON. Returns the row id.
    pub fn save_settlement_report(&self, report: &SettlementReport) -> SettleResult<i64> {
        let json = serde_json::to_string(report)?;
        self.conn.execute(
            "INSERT INTO settlement_report (period, first_day, last_day, report_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                report.period.to_string(),
                report.period.first_day().to_string(),
                report.period.last_day().to_string(),
                json,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recently saved report for a period label such as `2025-03`.
    pub fn latest_settlement_report(&self, period: &str) -> SettleResult<Option<SettlementReport>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT report_json FROM settlement_report
                 WHERE period = ?1
                 ORDER BY id DESC LIMIT 1",
                params![period],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(j) => Ok(Some(serde_json::from_str(&j)?)),
            None => Ok(None),
        }
    }

    pub fn settlement_report_count(&self) -> SettleResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM settlement_report", [], |row| row.get(0))?;
        Ok(n)
    }
}

impl EntityStore for MarketStore {
    fn booths(&self) -> SettleResult<Vec<Booth>> {
        self.all_booths()
    }

    fn customers(&self) -> SettleResult<Vec<Customer>> {
        self.all_customers()
    }

    fn items(&self) -> SettleResult<Vec<Item>> {
        self.all_items()
    }

    fn cart_lines(&self) -> SettleResult<Vec<CartLine>> {
        self.all_cart_lines()
    }

    fn carts(&self) -> SettleResult<Vec<ShoppingCart>> {
        self.all_carts()
    }

    fn sales(&self) -> SettleResult<Vec<Sale>> {
        self.all_sales()
    }
}

// ── Column codecs ──────────────────────────────────────────────

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))
}

fn opt_uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn money_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Money> {
    let s: String = row.get(idx)?;
    Money::from_str(&s).map_err(|e| conversion_error(idx, e))
}

fn opt_date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| NaiveDate::from_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn datetime_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let s: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn format_datetime(at: &NaiveDateTime) -> String {
    at.format(DATETIME_FORMAT).to_string()
}
