//! Settlement aggregator tests against in-memory snapshots.

use chrono::{NaiveDate, NaiveDateTime};
use reolmarket_core::{
    anomaly::DataAnomaly,
    compute_settlements,
    config::{RoundingMode, SettlementConfig},
    model::{Booth, BoothStatus, CartLine, Customer, Item, Sale, ShoppingCart},
    period::Period,
    resolver::RelationshipResolver,
    settlement::settle_customer,
    EntitySnapshot, SettleError,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(12, 0, 0).unwrap()
}

fn march() -> Period {
    Period::month(2025, 3).unwrap()
}

/// Small builder so each test only states what it cares about.
#[derive(Default)]
struct Market {
    snapshot: EntitySnapshot,
    next_booth: i32,
}

impl Market {
    fn customer(&mut self, name: &str) -> Uuid {
        let c = Customer::new(name);
        let id = c.customer_id;
        self.snapshot.customers.push(c);
        id
    }

    fn booth_for(&mut self, customer_id: Uuid) -> Uuid {
        self.next_booth += 1;
        let b = Booth::new(self.next_booth).rented_to(customer_id, date(2025, 1, 1));
        let id = b.booth_id;
        self.snapshot.booths.push(b);
        id
    }

    fn free_booth(&mut self) -> Uuid {
        self.next_booth += 1;
        let b = Booth::new(self.next_booth);
        let id = b.booth_id;
        self.snapshot.booths.push(b);
        id
    }

    fn item(&mut self, booth_id: Uuid, price: Decimal) -> Uuid {
        let i = Item::new("item", price, booth_id);
        let id = i.item_id;
        self.snapshot.items.push(i);
        id
    }

    /// One cart holding `lines` (item, quantity, unit price), settled by
    /// one sale of `total` at `when`.
    fn sale(&mut self, lines: &[(Uuid, i32, Decimal)], total: Decimal, when: NaiveDateTime) -> Uuid {
        let cart = ShoppingCart::new();
        for (item_id, quantity, unit_price) in lines {
            self.snapshot.cart_lines.push(CartLine {
                item_id:    *item_id,
                cart_id:    cart.cart_id,
                quantity:   *quantity,
                unit_price: *unit_price,
            });
        }
        let sale = Sale {
            sale_id:     Uuid::new_v4(),
            sale_date:   when,
            cart_id:     cart.cart_id,
            payment_id:  Uuid::new_v4(),
            total_price: total,
        };
        let id = sale.sale_id;
        self.snapshot.carts.push(cart);
        self.snapshot.sales.push(sale);
        id
    }
}

#[test]
fn two_booths_one_sale_end_to_end() {
    let mut m = Market::default();
    let c = m.customer("C");
    let b1 = m.booth_for(c);
    let _b2 = m.booth_for(c);
    let i1 = m.item(b1, dec!(50));
    m.sale(&[(i1, 2, dec!(50))], dec!(100.00), at(2025, 3, 10));

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();
    let s = report.customer(&c).expect("C must be settled");

    assert_eq!(s.booth_count, 2);
    assert_eq!(s.rent_per_booth, dec!(825));
    assert_eq!(s.total_rent, dec!(1650));
    assert_eq!(s.sales_total, dec!(100.00));
    assert_eq!(s.commission, dec!(10.00));
    assert_eq!(s.outstanding, dec!(-1560.00));
    assert!(s.is_negative());
    assert!(report.anomalies.is_empty());
}

#[test]
fn booth_without_items_owes_full_rent() {
    let mut m = Market::default();
    let d = m.customer("D");
    m.booth_for(d);

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();
    let s = report.customer(&d).expect("D must be settled");

    assert_eq!(s.sales_total, dec!(0));
    assert_eq!(s.commission, dec!(0));
    assert_eq!(s.outstanding, dec!(-850.00));
}

#[test]
fn strong_seller_is_owed_money() {
    let mut m = Market::default();
    let e = m.customer("E");
    let b = m.booth_for(e);
    let i = m.item(b, dec!(2000));
    m.sale(&[(i, 1, dec!(2000))], dec!(2000), at(2025, 3, 2));

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();
    let s = report.customer(&e).unwrap();

    // 2000 - 200 - 850
    assert_eq!(s.outstanding, dec!(950));
    assert!(s.is_positive());
}

#[test]
fn customers_without_booths_are_excluded() {
    let mut m = Market::default();
    let renter = m.customer("Renter");
    m.booth_for(renter);
    let browser = m.customer("Browser");
    m.free_booth();

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();

    assert_eq!(report.per_customer.len(), 1);
    assert!(report.customer(&browser).is_none());
    assert!(settle_customer(&browser, &march(), &m.snapshot, &SettlementConfig::default())
        .unwrap()
        .is_none());
}

#[test]
fn sale_without_a_line_for_the_customers_items_is_not_attributed() {
    let mut m = Market::default();
    let a = m.customer("A");
    let b = m.customer("B");
    let booth_a = m.booth_for(a);
    let booth_b = m.booth_for(b);
    m.item(booth_a, dec!(40));
    let item_b = m.item(booth_b, dec!(60));
    // Same day, but the cart only holds B's item.
    m.sale(&[(item_b, 1, dec!(60))], dec!(60), at(2025, 3, 5));

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();

    assert_eq!(report.customer(&a).unwrap().sales_total, dec!(0));
    assert_eq!(report.customer(&b).unwrap().sales_total, dec!(60));
}

#[test]
fn sales_outside_the_period_are_ignored() {
    let mut m = Market::default();
    let c = m.customer("C");
    let b = m.booth_for(c);
    let i1 = m.item(b, dec!(10));
    let i2 = m.item(b, dec!(20));
    let i3 = m.item(b, dec!(30));
    m.sale(&[(i1, 1, dec!(10))], dec!(10), at(2025, 2, 28));
    m.sale(&[(i2, 1, dec!(20))], dec!(20), at(2025, 3, 31));
    m.sale(&[(i3, 1, dec!(30))], dec!(30), at(2025, 4, 1));

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();
    let s = report.customer(&c).unwrap();

    assert_eq!(s.sales_count, 1);
    assert_eq!(s.sales_total, dec!(20));
    assert_eq!(report.aggregate.sales_count, 1);
    assert_eq!(report.aggregate.sales_value, dec!(20));
}

#[test]
fn cart_with_several_of_one_customers_items_counts_its_sale_once() {
    let mut m = Market::default();
    let c = m.customer("C");
    let b1 = m.booth_for(c);
    let b2 = m.booth_for(c);
    let i1 = m.item(b1, dec!(15));
    let i2 = m.item(b2, dec!(25));
    m.sale(&[(i1, 1, dec!(15)), (i2, 1, dec!(25))], dec!(40), at(2025, 3, 8));

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();
    let s = report.customer(&c).unwrap();

    assert_eq!(s.sales_count, 1);
    assert_eq!(s.sales_total, dec!(40));
}

#[test]
fn mixed_cart_is_split_by_line_value() {
    let mut m = Market::default();
    let a = m.customer("A");
    let b = m.customer("B");
    let booth_a = m.booth_for(a);
    let booth_b = m.booth_for(b);
    let item_a = m.item(booth_a, dec!(30));
    let item_b = m.item(booth_b, dec!(10));
    m.sale(&[(item_a, 1, dec!(30)), (item_b, 1, dec!(10))], dec!(40), at(2025, 3, 12));

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();

    assert_eq!(report.customer(&a).unwrap().sales_total, dec!(30));
    assert_eq!(report.customer(&b).unwrap().sales_total, dec!(10));
    assert_eq!(report.aggregate.sales_value, dec!(40));
}

#[test]
fn mixed_cart_shares_add_up_to_the_sale_total() {
    let mut m = Market::default();
    let a = m.customer("A");
    let b = m.customer("B");
    let c = m.customer("C");
    let items: Vec<Uuid> = [a, b, c]
        .iter()
        .map(|&cust| {
            let booth = m.booth_for(cust);
            m.item(booth, dec!(1))
        })
        .collect();
    let lines: Vec<(Uuid, i32, Decimal)> = items.iter().map(|&i| (i, 1, dec!(1))).collect();
    m.sale(&lines, dec!(10), at(2025, 3, 3));

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();
    let shares: Vec<Decimal> = [a, b, c]
        .iter()
        .map(|cust| report.customer(cust).unwrap().sales_total)
        .collect();

    assert_eq!(shares.iter().copied().sum::<Decimal>(), dec!(10));
    assert_eq!(report.aggregate.sales_value, dec!(10));
    assert_eq!(shares.iter().filter(|s| **s == dec!(3.34)).count(), 1);
    assert_eq!(shares.iter().filter(|s| **s == dec!(3.33)).count(), 2);

    // The extra cent goes to the lowest customer id on a tie.
    let lowest = *[a, b, c].iter().min().unwrap();
    assert_eq!(report.customer(&lowest).unwrap().sales_total, dec!(3.34));
}

#[test]
fn mixed_cart_split_keeps_sub_cent_totals() {
    let mut m = Market::default();
    let a = m.customer("A");
    let b = m.customer("B");
    let booth_a = m.booth_for(a);
    let booth_b = m.booth_for(b);
    let item_a = m.item(booth_a, dec!(1));
    let item_b = m.item(booth_b, dec!(2));
    m.sale(&[(item_a, 1, dec!(1)), (item_b, 1, dec!(2))], dec!(10.005), at(2025, 3, 3));

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();
    let share_a = report.customer(&a).unwrap().sales_total;
    let share_b = report.customer(&b).unwrap().sales_total;

    assert_eq!(share_a + share_b, dec!(10.005));
    assert_eq!(share_b, dec!(6.67));
    // The half cent stays with the largest remainder.
    assert_eq!(share_a, dec!(3.335));
}

#[test]
fn item_in_a_free_booth_keeps_its_part_of_a_mixed_cart() {
    let mut m = Market::default();
    let a = m.customer("A");
    let booth_a = m.booth_for(a);
    let free = m.free_booth();
    let item_a = m.item(booth_a, dec!(30));
    let stray = m.item(free, dec!(10));
    m.sale(&[(item_a, 1, dec!(30)), (stray, 1, dec!(10))], dec!(40), at(2025, 3, 12));

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();

    assert_eq!(report.customer(&a).unwrap().sales_total, dec!(30));
    assert_eq!(report.aggregate.sales_value, dec!(40));
}

#[test]
fn duplicated_booth_and_sale_records_count_once() {
    let mut m = Market::default();
    let c = m.customer("C");
    let b = m.booth_for(c);
    let i = m.item(b, dec!(100));
    let sale = m.sale(&[(i, 1, dec!(100))], dec!(100), at(2025, 3, 14));

    let booth_copy = m.snapshot.booths[0].clone();
    m.snapshot.booths.push(booth_copy);
    let sale_copy = m.snapshot.sales[0].clone();
    m.snapshot.sales.push(sale_copy);

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();
    let s = report.customer(&c).unwrap();

    assert!(report.anomalies.contains(&DataAnomaly::DuplicateKey {
        entity: "booth".into(),
        key:    b.to_string(),
    }));
    assert!(report.anomalies.contains(&DataAnomaly::DuplicateKey {
        entity: "sale".into(),
        key:    sale.to_string(),
    }));
    assert_eq!(s.booth_count, 1);
    assert_eq!(s.total_rent, dec!(850));
    assert_eq!(s.sales_count, 1);
    assert_eq!(s.sales_total, dec!(100));
    assert_eq!(s.commission, dec!(10));
    assert_eq!(report.aggregate.active_booths, 1);
    assert_eq!(report.aggregate.available_booths, 0);
    assert_eq!(report.aggregate.sales_count, 1);
    assert_eq!(report.aggregate.sales_value, dec!(100));
}

#[test]
fn booth_count_drives_the_tier_for_every_booth() {
    let mut m = Market::default();
    let big = m.customer("Big");
    for _ in 0..5 {
        m.booth_for(big);
    }

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();
    let s = report.customer(&big).unwrap();

    assert_eq!(s.booth_count, 5);
    assert_eq!(s.booth_numbers, vec![1, 2, 3, 4, 5]);
    assert_eq!(s.rent_per_booth, dec!(800));
    assert_eq!(s.total_rent, dec!(4000));
}

#[test]
fn lease_ended_last_month_drops_out_of_settlement() {
    let mut m = Market::default();
    let c = m.customer("C");
    m.booth_for(c);
    m.booth_for(c);
    m.snapshot.booths[1].end_date = Some(date(2025, 3, 31));

    let config = SettlementConfig::default();
    let in_march = compute_settlements(&march(), &m.snapshot, &config).unwrap();
    let in_april = compute_settlements(&march().next_month(), &m.snapshot, &config).unwrap();

    assert_eq!(in_march.customer(&c).unwrap().booth_count, 2);
    assert_eq!(in_april.customer(&c).unwrap().booth_count, 1);
    assert_eq!(in_april.customer(&c).unwrap().rent_per_booth, dec!(850));
    assert_eq!(in_april.aggregate.available_booths, 1);
}

#[test]
fn per_customer_list_is_sorted_by_name() {
    let mut m = Market::default();
    for name in ["Mette", "Anna", "Zaid", "Bo"] {
        let id = m.customer(name);
        m.booth_for(id);
    }

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();
    let names: Vec<&str> = report.per_customer.iter().map(|s| s.customer_name.as_str()).collect();

    assert_eq!(names, vec!["Anna", "Bo", "Mette", "Zaid"]);
}

#[test]
fn aggregate_figures_add_up() {
    let mut m = Market::default();
    let c = m.customer("C");
    let b1 = m.booth_for(c);
    m.booth_for(c);
    let d = m.customer("D");
    m.booth_for(d);
    m.free_booth();
    m.free_booth();
    let i1 = m.item(b1, dec!(50));
    m.sale(&[(i1, 2, dec!(50))], dec!(100), at(2025, 3, 10));

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();
    let a = &report.aggregate;

    assert_eq!(a.active_booths, 3);
    assert_eq!(a.available_booths, 2);
    assert_eq!(a.booths_by_status["occupied"], 3);
    assert_eq!(a.booths_by_status["free"], 2);
    assert_eq!(a.booths_by_status["reserved"], 0);
    assert_eq!(a.total_rent_income, dec!(2500));
    assert_eq!(a.total_commission, dec!(10));
    assert_eq!(a.sales_count, 1);
    assert_eq!(a.sales_value, dec!(100));
    assert_eq!(a.total_outstanding, dec!(-2410));
    assert_eq!(a.monthly_income, dec!(2510));
    assert_eq!(a.monthly_expenses, dec!(76678.75));
    assert_eq!(a.monthly_difference, dec!(-74168.75));
}

#[test]
fn anomalies_are_reported_and_do_not_abort() {
    let mut m = Market::default();
    let c = m.customer("C");
    let b = m.booth_for(c);
    let good = m.item(b, dec!(20));
    m.sale(&[(good, 1, dec!(20))], dec!(20), at(2025, 3, 4));

    // Item in a booth that does not exist.
    let ghost_booth = Uuid::new_v4();
    let orphan = m.item(ghost_booth, dec!(99));
    m.sale(&[(orphan, 1, dec!(99))], dec!(99), at(2025, 3, 4));

    // Occupied booth with nobody attached.
    let mut broken = Booth::new(99);
    broken.status = BoothStatus::Occupied;
    broken.is_rented = true;
    let broken_id = broken.booth_id;
    m.snapshot.booths.push(broken);

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();

    assert_eq!(report.customer(&c).unwrap().sales_total, dec!(20));
    assert!(report.anomalies.contains(&DataAnomaly::ItemWithUnknownBooth {
        item_id:  orphan,
        booth_id: ghost_booth,
    }));
    assert!(report.anomalies.contains(&DataAnomaly::CartLineWithUnknownItem {
        item_id: orphan,
        cart_id: m.snapshot.cart_lines[1].cart_id,
    }));
    assert!(report.anomalies.contains(&DataAnomaly::RentedBoothWithoutCustomer {
        booth_id:     broken_id,
        booth_number: 99,
    }));
    // The broken booth is available, not active.
    assert_eq!(report.aggregate.active_booths, 1);
    assert_eq!(report.aggregate.available_booths, 1);
}

#[test]
fn booth_rented_to_unknown_customer_is_treated_as_unrented() {
    let mut m = Market::default();
    let stranger = Uuid::new_v4();
    m.booth_for(stranger);

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();

    assert!(report.per_customer.is_empty());
    assert_eq!(report.aggregate.active_booths, 0);
    assert_eq!(report.anomalies[0].kind(), "booth_with_unknown_customer");
}

#[test]
fn sale_for_unknown_cart_is_reported() {
    let mut m = Market::default();
    let c = m.customer("C");
    let b = m.booth_for(c);
    let i = m.item(b, dec!(5));
    m.sale(&[(i, 1, dec!(5))], dec!(5), at(2025, 3, 1));
    m.snapshot.carts.clear();

    let report = compute_settlements(&march(), &m.snapshot, &SettlementConfig::default()).unwrap();
    let kinds: Vec<&str> = report.anomalies.iter().map(|a| a.kind()).collect();

    assert!(kinds.contains(&"cart_line_with_unknown_cart"));
    assert!(kinds.contains(&"sale_with_unknown_cart"));
    assert_eq!(report.customer(&c).unwrap().sales_total, dec!(0));
}

#[test]
fn invalid_period_fails_before_computing() {
    let m = Market::default();
    let bad = Period::Range { start: date(2025, 3, 10), end: date(2025, 3, 1) };

    let result = compute_settlements(&bad, &m.snapshot, &SettlementConfig::default());
    assert!(matches!(result, Err(SettleError::InvalidPeriod { .. })));
}

#[test]
fn custom_range_period_settles_only_its_sales() {
    let mut m = Market::default();
    let c = m.customer("C");
    let b = m.booth_for(c);
    let i1 = m.item(b, dec!(10));
    let i2 = m.item(b, dec!(20));
    m.sale(&[(i1, 1, dec!(10))], dec!(10), at(2025, 3, 3));
    m.sale(&[(i2, 1, dec!(20))], dec!(20), at(2025, 3, 20));

    let first_half = Period::range(date(2025, 3, 1), date(2025, 3, 15)).unwrap();
    let report = compute_settlements(&first_half, &m.snapshot, &SettlementConfig::default()).unwrap();

    assert_eq!(report.customer(&c).unwrap().sales_total, dec!(10));
}

#[test]
fn alternate_config_changes_rent_and_commission() {
    let mut m = Market::default();
    let c = m.customer("C");
    let b = m.booth_for(c);
    let i = m.item(b, dec!(0.25));
    m.sale(&[(i, 1, dec!(0.25))], dec!(0.25), at(2025, 3, 6));

    let config = SettlementConfig {
        rounding: RoundingMode::HalfEven,
        ..SettlementConfig::default()
    };
    let report = compute_settlements(&march(), &m.snapshot, &config).unwrap();

    assert_eq!(report.customer(&c).unwrap().commission, dec!(0.02));
}

#[test]
fn same_snapshot_same_report() {
    let mut m = Market::default();
    let c = m.customer("C");
    let b = m.booth_for(c);
    let i = m.item(b, dec!(33.335));
    m.sale(&[(i, 1, dec!(33.335))], dec!(33.335), at(2025, 3, 9));
    let d = m.customer("D");
    m.booth_for(d);

    let config = SettlementConfig::default();
    let first = compute_settlements(&march(), &m.snapshot, &config).unwrap();
    let second = compute_settlements(&march(), &m.snapshot, &config).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap(),
        "monetary fields must serialize identically"
    );
}

#[test]
fn resolver_walks_the_chain_in_stages() {
    let mut m = Market::default();
    let c = m.customer("C");
    let b = m.booth_for(c);
    let i = m.item(b, dec!(12));
    let s1 = m.sale(&[(i, 1, dec!(12))], dec!(12), at(2025, 3, 9));
    let s2 = m.sale(&[(i, 1, dec!(12))], dec!(12), at(2025, 1, 9));

    let resolver = RelationshipResolver::new(&m.snapshot);

    let all: Vec<Uuid> = resolver
        .attributable_sales(&c, None)
        .iter()
        .map(|a| a.sale.sale_id)
        .collect();
    assert_eq!(all, vec![s2, s1], "ordered by sale date");

    let in_march = resolver.attributable_sales(&c, Some(&march()));
    assert_eq!(in_march.len(), 1);
    assert_eq!(in_march[0].sale.sale_id, s1);
    assert_eq!(resolver.sales_total(&c, None), dec!(24));
    assert!(resolver.attributable_sales(&Uuid::new_v4(), None).is_empty());
}

#[test]
fn sales_rows_left_join_every_rented_booth() {
    let mut m = Market::default();
    let c = m.customer("C");
    let b1 = m.booth_for(c);
    let b2 = m.booth_for(c);
    let sold = m.item(b1, dec!(12));
    let _unsold = m.item(b1, dec!(8));
    let sale = m.sale(&[(sold, 1, dec!(12))], dec!(12), at(2025, 3, 9));
    m.free_booth();

    let resolver = RelationshipResolver::new(&m.snapshot);
    let rows = resolver.sales_rows(Some(&march()));

    assert_eq!(rows.len(), 3, "sold item, unsold item, empty booth");
    assert!(rows.iter().any(|r| r.sale_id == Some(sale) && r.sale_total == Some(dec!(12))));
    assert!(rows
        .iter()
        .any(|r| r.booth_id == b1 && r.item_id.is_some() && r.cart_id.is_none()));
    assert!(rows.iter().any(|r| r.booth_id == b2 && r.item_id.is_none()));
    assert!(rows.iter().all(|r| r.customer_id == c));
}
