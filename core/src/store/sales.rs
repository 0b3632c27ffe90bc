use super::{datetime_at, format_datetime, money_at, uuid_at, MarketStore};
use crate::{
    error::SettleResult,
    model::{CartLine, Item, Sale, ShoppingCart},
};
use rusqlite::params;

impl MarketStore {
    // ── Item ──────────────────────────────────────────────────────

    pub fn insert_item(&self, i: &Item) -> SettleResult<()> {
        self.conn.execute(
            "INSERT INTO item (item_id, name, price, booth_id) VALUES (?1, ?2, ?3, ?4)",
            params![
                i.item_id.to_string(),
                &i.name,
                i.price.to_string(),
                i.booth_id.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn all_items(&self) -> SettleResult<Vec<Item>> {
        let mut stmt = self
            .conn
            .prepare("SELECT item_id, name, price, booth_id FROM item ORDER BY name, item_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Item {
                item_id:  uuid_at(row, 0)?,
                name:     row.get(1)?,
                price:    money_at(row, 2)?,
                booth_id: uuid_at(row, 3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Shopping cart ─────────────────────────────────────────────

    pub fn insert_cart(&self, c: &ShoppingCart) -> SettleResult<()> {
        self.conn.execute(
            "INSERT INTO shopping_cart (cart_id, quantity, total_price) VALUES (?1, ?2, ?3)",
            params![c.cart_id.to_string(), c.quantity, c.total_price.to_string()],
        )?;
        Ok(())
    }

    pub fn all_carts(&self) -> SettleResult<Vec<ShoppingCart>> {
        let mut stmt = self
            .conn
            .prepare("SELECT cart_id, quantity, total_price FROM shopping_cart ORDER BY cart_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(ShoppingCart {
                cart_id:     uuid_at(row, 0)?,
                quantity:    row.get(1)?,
                total_price: money_at(row, 2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Cart line ─────────────────────────────────────────────────

    pub fn insert_cart_line(&self, l: &CartLine) -> SettleResult<()> {
        self.conn.execute(
            "INSERT INTO cart_line (item_id, cart_id, quantity, unit_price) VALUES (?1, ?2, ?3, ?4)",
            params![
                l.item_id.to_string(),
                l.cart_id.to_string(),
                l.quantity,
                l.unit_price.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn all_cart_lines(&self) -> SettleResult<Vec<CartLine>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, cart_id, quantity, unit_price
             FROM cart_line ORDER BY cart_id, item_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CartLine {
                item_id:    uuid_at(row, 0)?,
                cart_id:    uuid_at(row, 1)?,
                quantity:   row.get(2)?,
                unit_price: money_at(row, 3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Sale ──────────────────────────────────────────────────────

    pub fn insert_sale(&self, s: &Sale) -> SettleResult<()> {
        self.conn.execute(
            "INSERT INTO sale (sale_id, sale_date, cart_id, payment_id, total_price)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                s.sale_id.to_string(),
                format_datetime(&s.sale_date),
                s.cart_id.to_string(),
                s.payment_id.to_string(),
                s.total_price.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn all_sales(&self) -> SettleResult<Vec<Sale>> {
        let mut stmt = self.conn.prepare(
            "SELECT sale_id, sale_date, cart_id, payment_id, total_price
             FROM sale ORDER BY sale_date, sale_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Sale {
                sale_id:     uuid_at(row, 0)?,
                sale_date:   datetime_at(row, 1)?,
                cart_id:     uuid_at(row, 2)?,
                payment_id:  uuid_at(row, 3)?,
                total_price: money_at(row, 4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn sale_count(&self) -> SettleResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM sale", [], |row| row.get(0))?;
        Ok(n)
    }
}
