//! Demo market seeding.
//!
//! Fills an empty store with a small, plausible market: renters on one to
//! five booths, a few free booths, one lease ending inside the period,
//! items on the shelves and a month of sales. Deterministic per seed.

use crate::{
    error::SettleResult,
    model::{Booth, CartLine, Customer, Item, Sale, ShoppingCart},
    period::Period,
    rng::DemoRng,
    store::MarketStore,
    types::Money,
};
use chrono::{Duration, NaiveTime};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemoSummary {
    pub customers: usize,
    pub booths:    usize,
    pub items:     usize,
    pub sales:     usize,
}

const FIRST_NAMES: &[&str] = &[
    "Anna", "Bo", "Camilla", "Dennis", "Eva", "Frederik", "Gitte", "Henrik",
    "Ida", "Jens", "Karen", "Lars", "Mette", "Niels", "Oda", "Peter",
];

const LAST_NAMES: &[&str] = &[
    "Andersen", "Berg", "Christensen", "Dahl", "Eriksen", "Frost", "Holm",
    "Jensen", "Kristiansen", "Larsen", "Madsen", "Nielsen", "Poulsen",
];

const ITEM_NAMES: &[&str] = &[
    "Teapot", "Vinyl record", "Wool sweater", "Lamp", "Board game", "Vase",
    "Picture frame", "Children's jacket", "Cookbook", "Candle holder",
    "Handbag", "Toy car", "Winter boots", "Serving bowl",
];

/// Seed `store` with a demo market whose sales all fall inside `period`.
/// The store must be migrated and empty.
pub fn seed_demo_market(store: &MarketStore, seed: u64, period: &Period) -> SettleResult<DemoSummary> {
    period.validate()?;
    let mut rng = DemoRng::new(seed);
    let mut summary = DemoSummary::default();

    let first = period.first_day();
    let span_days = (period.last_day() - first).num_days().max(0) as u64 + 1;
    let lease_start = first - Duration::days(90);

    let customer_count = rng.between(6, 12);
    let mut next_booth_number = 1;
    let mut rented_items: Vec<Item> = Vec::new();
    let mut lease_ended = false;

    for _ in 0..customer_count {
        let mut customer = Customer::new(format!(
            "{} {}",
            rng.pick(FIRST_NAMES),
            rng.pick(LAST_NAMES)
        ));
        customer.customer_id = rng.uuid();
        customer.email = format!("{}@example.com", customer.name.to_lowercase().replace(' ', "."));
        store.insert_customer(&customer)?;
        summary.customers += 1;

        let booth_count = rng.between(1, 5);
        for _ in 0..booth_count {
            let mut booth = Booth::new(next_booth_number).rented_to(customer.customer_id, lease_start);
            booth.booth_id = rng.uuid();
            booth.has_hanger_bar = rng.chance(0.3);
            if !lease_ended && rng.chance(0.15) {
                booth = booth.ending(period.last_day());
                lease_ended = true;
            }
            next_booth_number += 1;
            store.insert_booth(&booth)?;
            summary.booths += 1;

            for _ in 0..rng.between(0, 6) {
                let price = Decimal::new(i64::from(rng.between(10, 500)) * 100 + 95, 2);
                let mut item = Item::new(*rng.pick(ITEM_NAMES), price, booth.booth_id);
                item.item_id = rng.uuid();
                store.insert_item(&item)?;
                summary.items += 1;
                rented_items.push(item);
            }
        }
    }

    for _ in 0..rng.between(3, 8) {
        let mut booth = Booth::new(next_booth_number);
        booth.booth_id = rng.uuid();
        next_booth_number += 1;
        store.insert_booth(&booth)?;
        summary.booths += 1;
    }

    if rented_items.is_empty() {
        log::info!("demo: seeded {summary:?} (no items, no sales)");
        return Ok(summary);
    }

    // Each item sells at most once; carts hold one to three items.
    let mut unsold: Vec<usize> = (0..rented_items.len()).collect();
    let sale_count = rng.between(5, 30) as usize;
    for _ in 0..sale_count {
        if unsold.is_empty() {
            break;
        }
        let mut cart = ShoppingCart::new();
        cart.cart_id = rng.uuid();
        let mut lines = Vec::new();
        for _ in 0..rng.between(1, 3) {
            if unsold.is_empty() {
                break;
            }
            let pick = rng.next_u64_below(unsold.len() as u64) as usize;
            let item = &rented_items[unsold.swap_remove(pick)];
            lines.push(CartLine {
                item_id:    item.item_id,
                cart_id:    cart.cart_id,
                quantity:   1,
                unit_price: item.price,
            });
        }
        let total: Money = lines.iter().map(|l| l.line_total()).sum();
        cart.quantity = lines.len() as i32;
        cart.total_price = total;
        store.insert_cart(&cart)?;
        for line in &lines {
            store.insert_cart_line(line)?;
        }

        let day = first + Duration::days(rng.next_u64_below(span_days) as i64);
        let time = NaiveTime::from_hms_opt(10 + rng.between(0, 7), rng.between(0, 59), 0)
            .unwrap_or_default();
        let sale = Sale {
            sale_id:     rng.uuid(),
            sale_date:   day.and_time(time),
            cart_id:     cart.cart_id,
            payment_id:  rng.uuid(),
            total_price: total,
        };
        store.insert_sale(&sale)?;
        summary.sales += 1;
    }

    log::info!("demo: seeded {summary:?} for {period}");
    Ok(summary)
}
