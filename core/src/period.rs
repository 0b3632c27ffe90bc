//! Reporting periods and the booth occupancy rule.
//!
//! A period is either a calendar month or an explicit inclusive date
//! range. Both collapse to a `[first_day, last_day]` window; every filter
//! in the engine works on that window.

use crate::{
    error::{SettleError, SettleResult},
    model::Booth,
};
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Period {
    Month { year: i32, month: u32 },
    Range { start: NaiveDate, end: NaiveDate },
}

impl Period {
    /// A calendar month. Rejects months outside 1..=12 and years chrono
    /// cannot represent.
    pub fn month(year: i32, month: u32) -> SettleResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(SettleError::invalid_period(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            SettleError::invalid_period(format!("{year}-{month:02} is not a representable month"))
        })?;
        // The following month must exist too, otherwise last_day() has nothing to step back from.
        first.checked_add_months(Months::new(1)).ok_or_else(|| {
            SettleError::invalid_period(format!("{year}-{month:02} is not a representable month"))
        })?;
        Ok(Period::Month { year, month })
    }

    /// An inclusive date range. `end` may equal `start`.
    pub fn range(start: NaiveDate, end: NaiveDate) -> SettleResult<Self> {
        if end < start {
            return Err(SettleError::invalid_period(format!(
                "end {end} is before start {start}"
            )));
        }
        Ok(Period::Range { start, end })
    }

    /// The month containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Period::Month { year: date.year(), month: date.month() }
    }

    /// Re-check a period that did not come through a constructor
    /// (deserialized, or built literally).
    pub fn validate(&self) -> SettleResult<()> {
        match *self {
            Period::Month { year, month } => Period::month(year, month).map(|_| ()),
            Period::Range { start, end } => Period::range(start, end).map(|_| ()),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        match *self {
            Period::Month { year, month } => {
                NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
            }
            Period::Range { start, .. } => start,
        }
    }

    pub fn last_day(&self) -> NaiveDate {
        match *self {
            Period::Month { .. } => self
                .first_day()
                .checked_add_months(Months::new(1))
                .and_then(|next| next.pred_opt())
                .unwrap_or(NaiveDate::MAX),
            Period::Range { end, .. } => end,
        }
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.first_day() <= date && date <= self.last_day()
    }

    /// Sale timestamps are compared by calendar day, so anything on the
    /// last day counts regardless of time.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.contains_date(at.date())
    }

    /// The month after this one. For a range, the month after its end.
    pub fn next_month(&self) -> Period {
        let next = self
            .last_day()
            .succ_opt()
            .unwrap_or(NaiveDate::MAX);
        Period::containing(next)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Month { year, month } => write!(f, "{year}-{month:02}"),
            Period::Range { start, end } => write!(f, "{start}..{end}"),
        }
    }
}

/// Active for settlement: the booth has a tenant and its lease overlaps
/// the period. A lease ending on any day inside the period still counts
/// for that period.
pub fn is_booth_active(booth: &Booth, period: &Period) -> bool {
    if booth.tenant().is_none() {
        return false;
    }
    let ended_before = booth.end_date.is_some_and(|end| end < period.first_day());
    let starts_after = booth.start_date.is_some_and(|start| start > period.last_day());
    !ended_before && !starts_after
}

/// Exact complement of `is_booth_active`.
pub fn is_booth_available(booth: &Booth, period: &Period) -> bool {
    !is_booth_active(booth, period)
}
