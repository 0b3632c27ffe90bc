use super::{opt_date_at, opt_uuid_at, uuid_at, MarketStore};
use crate::{
    error::{SettleError, SettleResult},
    model::{Booth, BoothStatus, Customer},
    types::BoothId,
};
use chrono::NaiveDate;
use rusqlite::{params, types::Type};

impl MarketStore {
    // ── Customer ──────────────────────────────────────────────────

    pub fn insert_customer(&self, c: &Customer) -> SettleResult<()> {
        self.conn.execute(
            "INSERT INTO customer (customer_id, name, email, phone, address, postal_code)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                c.customer_id.to_string(),
                &c.name,
                &c.email,
                &c.phone,
                &c.address,
                &c.postal_code,
            ],
        )?;
        Ok(())
    }

    pub fn all_customers(&self) -> SettleResult<Vec<Customer>> {
        let mut stmt = self.conn.prepare(
            "SELECT customer_id, name, email, phone, address, postal_code
             FROM customer ORDER BY name, customer_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Customer {
                customer_id: uuid_at(row, 0)?,
                name:        row.get(1)?,
                email:       row.get(2)?,
                phone:       row.get(3)?,
                address:     row.get(4)?,
                postal_code: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Booth ─────────────────────────────────────────────────────

    pub fn insert_booth(&self, b: &Booth) -> SettleResult<()> {
        self.conn.execute(
            "INSERT INTO booth (
                booth_id, booth_number, number_of_shelves, has_hanger_bar,
                is_rented, status, customer_id, start_date, end_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                b.booth_id.to_string(),
                b.booth_number,
                b.number_of_shelves,
                if b.has_hanger_bar { 1 } else { 0 },
                if b.is_rented { 1 } else { 0 },
                b.status.as_str(),
                b.customer_id.map(|id| id.to_string()),
                b.start_date.map(|d| d.to_string()),
                b.end_date.map(|d| d.to_string()),
            ],
        )?;
        Ok(())
    }

    pub fn all_booths(&self) -> SettleResult<Vec<Booth>> {
        let mut stmt = self.conn.prepare(
            "SELECT booth_id, booth_number, number_of_shelves, has_hanger_bar,
                    is_rented, status, customer_id, start_date, end_date
             FROM booth ORDER BY booth_number",
        )?;
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(5)?;
            let status = BoothStatus::parse(&status).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    Type::Text,
                    format!("unknown booth status '{status}'").into(),
                )
            })?;
            Ok(Booth {
                booth_id:          uuid_at(row, 0)?,
                booth_number:      row.get(1)?,
                number_of_shelves: row.get(2)?,
                has_hanger_bar:    row.get::<_, i32>(3)? != 0,
                is_rented:         row.get::<_, i32>(4)? != 0,
                status,
                customer_id:       opt_uuid_at(row, 6)?,
                start_date:        opt_date_at(row, 7)?,
                end_date:          opt_date_at(row, 8)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Close a lease. The booth keeps its customer until the period
    /// containing `end` has been settled; the occupancy rule handles the rest.
    pub fn end_lease(&self, booth_id: &BoothId, end: NaiveDate) -> SettleResult<()> {
        let changed = self.conn.execute(
            "UPDATE booth SET end_date = ?1 WHERE booth_id = ?2",
            params![end.to_string(), booth_id.to_string()],
        )?;
        if changed == 0 {
            return Err(SettleError::NotFound {
                entity: "booth",
                id:     booth_id.to_string(),
            });
        }
        Ok(())
    }

    /// Hand a booth back to the market: no customer, free, no dates.
    pub fn release_booth(&self, booth_id: &BoothId) -> SettleResult<()> {
        let changed = self.conn.execute(
            "UPDATE booth
             SET customer_id = NULL, is_rented = 0, status = 'free',
                 start_date = NULL, end_date = NULL
             WHERE booth_id = ?1",
            params![booth_id.to_string()],
        )?;
        if changed == 0 {
            return Err(SettleError::NotFound {
                entity: "booth",
                id:     booth_id.to_string(),
            });
        }
        Ok(())
    }
}
