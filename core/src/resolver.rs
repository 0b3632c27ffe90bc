//! Relationship resolver. Walks the entity graph
//! customer → booths → items → cart lines → carts → sales.
//!
//! Built once per run from a snapshot. Construction indexes every
//! collection and records integrity anomalies; records that break the
//! chain are dropped from the indexes so later stages never see them.
//!
//! RULE: a sale belongs to a customer only through this exact chain.
//! A missing link means zero contribution, never an error.

use crate::{
    anomaly::DataAnomaly,
    model::{Booth, CartLine, Customer, Item, Sale},
    period::{is_booth_active, Period},
    snapshot::EntitySnapshot,
    types::{BoothId, CartId, CustomerId, ItemId, Money},
};
use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// One sale as seen from one customer: the sale itself and the part of
/// its total that belongs to that customer.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributedSale<'a> {
    pub sale:  &'a Sale,
    pub share: Money,
}

/// Flattened left-join row for the sales overview. Positions after the
/// first missing link are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRow {
    pub customer_id:   CustomerId,
    pub customer_name: String,
    pub booth_id:      BoothId,
    pub booth_number:  i32,
    pub item_id:       Option<ItemId>,
    pub item_name:     Option<String>,
    pub item_price:    Option<Money>,
    pub cart_id:       Option<CartId>,
    pub sale_id:       Option<uuid::Uuid>,
    pub sale_date:     Option<NaiveDateTime>,
    pub sale_total:    Option<Money>,
}

pub struct RelationshipResolver<'a> {
    booths:         Vec<&'a Booth>,
    booth_owner:    HashMap<BoothId, Option<CustomerId>>,
    customers:      HashMap<CustomerId, &'a Customer>,
    items_by_booth: HashMap<BoothId, Vec<&'a Item>>,
    lines_by_item:  HashMap<ItemId, Vec<&'a CartLine>>,
    lines_by_cart:  HashMap<CartId, Vec<&'a CartLine>>,
    item_booth:     HashMap<ItemId, BoothId>,
    sales_by_cart:  HashMap<CartId, Vec<&'a Sale>>,
    anomalies:      Vec<DataAnomaly>,
}

impl<'a> RelationshipResolver<'a> {
    pub fn new(snapshot: &'a EntitySnapshot) -> Self {
        let mut anomalies = Vec::new();

        let mut customers = HashMap::new();
        for c in &snapshot.customers {
            if customers.insert(c.customer_id, c).is_some() {
                anomalies.push(DataAnomaly::DuplicateKey {
                    entity: "customer".into(),
                    key:    c.customer_id.to_string(),
                });
            }
        }

        let mut booth_ids = HashSet::new();
        let mut booth_owner = HashMap::new();
        let mut booths = Vec::with_capacity(snapshot.booths.len());
        for b in &snapshot.booths {
            if !booth_ids.insert(b.booth_id) {
                anomalies.push(DataAnomaly::DuplicateKey {
                    entity: "booth".into(),
                    key:    b.booth_id.to_string(),
                });
                continue;
            }
            if b.is_marked_rented() && b.customer_id.is_none() {
                anomalies.push(DataAnomaly::RentedBoothWithoutCustomer {
                    booth_id:     b.booth_id,
                    booth_number: b.booth_number,
                });
            }
            if let Some(cid) = b.customer_id {
                if !customers.contains_key(&cid) {
                    anomalies.push(DataAnomaly::BoothWithUnknownCustomer {
                        booth_id:    b.booth_id,
                        customer_id: cid,
                    });
                }
            }
            booth_owner.insert(b.booth_id, b.customer_id);
            booths.push(b);
        }

        let mut items_by_booth: HashMap<BoothId, Vec<&Item>> = HashMap::new();
        let mut item_booth = HashMap::new();
        for item in &snapshot.items {
            if !booth_ids.contains(&item.booth_id) {
                anomalies.push(DataAnomaly::ItemWithUnknownBooth {
                    item_id:  item.item_id,
                    booth_id: item.booth_id,
                });
                continue;
            }
            if item_booth.insert(item.item_id, item.booth_id).is_some() {
                anomalies.push(DataAnomaly::DuplicateKey {
                    entity: "item".into(),
                    key:    item.item_id.to_string(),
                });
                continue;
            }
            items_by_booth.entry(item.booth_id).or_default().push(item);
        }

        let cart_ids: HashSet<CartId> = snapshot.carts.iter().map(|c| c.cart_id).collect();
        if cart_ids.len() != snapshot.carts.len() {
            let mut seen = HashSet::new();
            for c in &snapshot.carts {
                if !seen.insert(c.cart_id) {
                    anomalies.push(DataAnomaly::DuplicateKey {
                        entity: "shopping_cart".into(),
                        key:    c.cart_id.to_string(),
                    });
                }
            }
        }

        let mut lines_by_item: HashMap<ItemId, Vec<&CartLine>> = HashMap::new();
        let mut lines_by_cart: HashMap<CartId, Vec<&CartLine>> = HashMap::new();
        let mut line_keys = HashSet::new();
        for line in &snapshot.cart_lines {
            if !item_booth.contains_key(&line.item_id) {
                anomalies.push(DataAnomaly::CartLineWithUnknownItem {
                    item_id: line.item_id,
                    cart_id: line.cart_id,
                });
                continue;
            }
            if !cart_ids.contains(&line.cart_id) {
                anomalies.push(DataAnomaly::CartLineWithUnknownCart {
                    item_id: line.item_id,
                    cart_id: line.cart_id,
                });
                continue;
            }
            if !line_keys.insert(line.key()) {
                anomalies.push(DataAnomaly::DuplicateKey {
                    entity: "cart_line".into(),
                    key:    format!("{}/{}", line.item_id, line.cart_id),
                });
                continue;
            }
            lines_by_item.entry(line.item_id).or_default().push(line);
            lines_by_cart.entry(line.cart_id).or_default().push(line);
        }

        let mut sales_by_cart: HashMap<CartId, Vec<&Sale>> = HashMap::new();
        let mut sale_ids = HashSet::new();
        for sale in &snapshot.sales {
            if !cart_ids.contains(&sale.cart_id) {
                anomalies.push(DataAnomaly::SaleWithUnknownCart {
                    sale_id: sale.sale_id,
                    cart_id: sale.cart_id,
                });
                continue;
            }
            if !sale_ids.insert(sale.sale_id) {
                anomalies.push(DataAnomaly::DuplicateKey {
                    entity: "sale".into(),
                    key:    sale.sale_id.to_string(),
                });
                continue;
            }
            sales_by_cart.entry(sale.cart_id).or_default().push(sale);
        }

        for anomaly in &anomalies {
            log::warn!("resolver: {anomaly}");
        }

        Self {
            booths,
            booth_owner,
            customers,
            items_by_booth,
            lines_by_item,
            lines_by_cart,
            item_booth,
            sales_by_cart,
            anomalies,
        }
    }

    pub fn anomalies(&self) -> &[DataAnomaly] {
        &self.anomalies
    }

    pub fn customer(&self, customer_id: &CustomerId) -> Option<&'a Customer> {
        self.customers.get(customer_id).copied()
    }

    /// Every distinct booth, in snapshot order.
    pub fn booths(&self) -> &[&'a Booth] {
        &self.booths
    }

    /// Active for `period` and rented to a customer the snapshot knows.
    /// A booth pointing at an unknown customer counts as unrented.
    pub fn is_active(&self, booth: &Booth, period: &Period) -> bool {
        is_booth_active(booth, period)
            && booth.tenant().is_some_and(|cid| self.customers.contains_key(&cid))
    }

    pub fn active_booths_of(&self, customer_id: &CustomerId, period: &Period) -> Vec<&'a Booth> {
        self.booths
            .iter()
            .copied()
            .filter(|b| b.customer_id == Some(*customer_id) && self.is_active(b, period))
            .collect()
    }

    /// Stage 1: booths whose customer id is `customer_id`.
    fn booth_ids_of(&self, customer_id: &CustomerId) -> Vec<BoothId> {
        self.booths
            .iter()
            .filter(|b| b.customer_id == Some(*customer_id))
            .map(|b| b.booth_id)
            .collect()
    }

    /// Stage 2: items placed in those booths.
    fn item_ids_in(&self, booth_ids: &[BoothId]) -> HashSet<ItemId> {
        booth_ids
            .iter()
            .filter_map(|id| self.items_by_booth.get(id))
            .flatten()
            .map(|i| i.item_id)
            .collect()
    }

    /// Stage 3: carts holding any of those items, deduplicated.
    fn cart_ids_with(&self, item_ids: &HashSet<ItemId>) -> BTreeSet<CartId> {
        item_ids
            .iter()
            .filter_map(|id| self.lines_by_item.get(id))
            .flatten()
            .map(|l| l.cart_id)
            .collect()
    }

    /// Sales attributable to `customer_id`, optionally limited to a
    /// window, ordered by sale date then id.
    pub fn attributable_sales(
        &self,
        customer_id: &CustomerId,
        window: Option<&Period>,
    ) -> Vec<AttributedSale<'a>> {
        let booth_ids = self.booth_ids_of(customer_id);
        if booth_ids.is_empty() {
            return Vec::new();
        }
        let item_ids = self.item_ids_in(&booth_ids);
        if item_ids.is_empty() {
            return Vec::new();
        }
        let cart_ids = self.cart_ids_with(&item_ids);
        if cart_ids.is_empty() {
            return Vec::new();
        }

        // Stage 4 + 5: sales of those carts inside the window.
        let mut out = Vec::new();
        for cart_id in &cart_ids {
            let Some(sales) = self.sales_by_cart.get(cart_id) else {
                continue;
            };
            for sale in sales.iter().copied() {
                if window.is_some_and(|w| !w.contains(sale.sale_date)) {
                    continue;
                }
                out.push(AttributedSale {
                    sale,
                    share: self.customer_share(sale, cart_id, customer_id),
                });
            }
        }

        out.sort_by(|a, b| {
            a.sale
                .sale_date
                .cmp(&b.sale.sale_date)
                .then(a.sale.sale_id.cmp(&b.sale.sale_id))
        });
        out
    }

    /// Sum of a customer's attributed shares.
    pub fn sales_total(&self, customer_id: &CustomerId, window: Option<&Period>) -> Money {
        self.attributable_sales(customer_id, window)
            .iter()
            .map(|s| s.share)
            .sum()
    }

    /// Customer id of the booth holding `item_id`, if any.
    fn owner_of_item(&self, item_id: &ItemId) -> Option<CustomerId> {
        self.item_booth
            .get(item_id)
            .and_then(|booth_id| self.booth_owner.get(booth_id))
            .copied()
            .flatten()
    }

    /// The sale total is authoritative. A cart holding only this
    /// customer's items gives them all of it; a mixed cart is split
    /// across every owner in the cart, see `split_sale`.
    fn customer_share(&self, sale: &Sale, cart_id: &CartId, customer_id: &CustomerId) -> Money {
        let lines = match self.lines_by_cart.get(cart_id) {
            Some(lines) if !lines.is_empty() => lines,
            _ => return Decimal::ZERO,
        };
        if lines.iter().all(|l| self.owner_of_item(&l.item_id) == Some(*customer_id)) {
            return sale.total_price;
        }
        split_sale(sale.total_price, self.owner_weights(lines))
            .get(&Some(*customer_id))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Line value per owner in one cart (`None` for items in booths with
    /// nobody attached). Falls back to line counts when the values sum
    /// to zero.
    fn owner_weights(&self, lines: &[&CartLine]) -> BTreeMap<Option<CustomerId>, Money> {
        let mut by_value: BTreeMap<Option<CustomerId>, Money> = BTreeMap::new();
        let mut by_count: BTreeMap<Option<CustomerId>, Money> = BTreeMap::new();
        for line in lines {
            let owner = self.owner_of_item(&line.item_id);
            *by_value.entry(owner).or_default() += line.line_total();
            *by_count.entry(owner).or_default() += Decimal::ONE;
        }
        if by_value.values().copied().sum::<Money>().is_zero() {
            by_count
        } else {
            by_value
        }
    }

    /// Left-join overview of every rented booth down to its sales.
    /// Booths without a known customer are skipped (inner join on
    /// customer); every later link is optional. Sorted by customer name,
    /// booth number, then item name.
    pub fn sales_rows(&self, window: Option<&Period>) -> Vec<SalesRow> {
        let mut rows = Vec::new();
        for booth in &self.booths {
            let customer = match booth.customer_id.and_then(|id| self.customer(&id)) {
                Some(c) => c,
                None => continue,
            };
            let base = SalesRow {
                customer_id:   customer.customer_id,
                customer_name: customer.name.clone(),
                booth_id:      booth.booth_id,
                booth_number:  booth.booth_number,
                item_id:       None,
                item_name:     None,
                item_price:    None,
                cart_id:       None,
                sale_id:       None,
                sale_date:     None,
                sale_total:    None,
            };

            let items = self.items_by_booth.get(&booth.booth_id).map(Vec::as_slice).unwrap_or(&[]);
            if items.is_empty() {
                rows.push(base);
                continue;
            }
            for item in items {
                let with_item = SalesRow {
                    item_id:    Some(item.item_id),
                    item_name:  Some(item.name.clone()),
                    item_price: Some(item.price),
                    ..base.clone()
                };
                let lines = self.lines_by_item.get(&item.item_id).map(Vec::as_slice).unwrap_or(&[]);
                if lines.is_empty() {
                    rows.push(with_item);
                    continue;
                }
                for line in lines {
                    let with_cart = SalesRow {
                        cart_id: Some(line.cart_id),
                        ..with_item.clone()
                    };
                    let sales: Vec<&Sale> = self
                        .sales_by_cart
                        .get(&line.cart_id)
                        .into_iter()
                        .flatten()
                        .copied()
                        .filter(|s| window.map_or(true, |w| w.contains(s.sale_date)))
                        .collect();
                    if sales.is_empty() {
                        rows.push(with_cart);
                        continue;
                    }
                    for sale in sales {
                        rows.push(SalesRow {
                            sale_id:    Some(sale.sale_id),
                            sale_date:  Some(sale.sale_date),
                            sale_total: Some(sale.total_price),
                            ..with_cart.clone()
                        });
                    }
                }
            }
        }

        rows.sort_by(|a, b| {
            a.customer_name
                .cmp(&b.customer_name)
                .then(a.booth_number.cmp(&b.booth_number))
                .then(a.item_name.cmp(&b.item_name))
                .then(a.sale_date.cmp(&b.sale_date))
        });
        rows
    }
}

/// Split `total` across owners in proportion to `weights`, in whole cents
/// by largest remainder. The shares always sum to exactly `total`: cents
/// left after truncation go to the largest remainders (ties by owner
/// order) and any sub-cent residue goes to the first of those.
fn split_sale(
    total: Money,
    weights: BTreeMap<Option<CustomerId>, Money>,
) -> BTreeMap<Option<CustomerId>, Money> {
    let weight_sum: Money = weights.values().copied().sum();
    if weights.is_empty() || weight_sum.is_zero() {
        return BTreeMap::new();
    }
    let magnitude = total.abs();
    let cent = Decimal::new(1, 2);

    let mut shares = BTreeMap::new();
    let mut remainders = Vec::with_capacity(weights.len());
    let mut allocated = Decimal::ZERO;
    for (owner, weight) in &weights {
        let exact = magnitude * *weight / weight_sum;
        let truncated = exact.round_dp_with_strategy(2, RoundingStrategy::ToZero);
        allocated += truncated;
        remainders.push((exact - truncated, *owner));
        shares.insert(*owner, truncated);
    }
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let mut leftover = magnitude - allocated;
    for (_, owner) in &remainders {
        if leftover < cent {
            break;
        }
        if let Some(share) = shares.get_mut(owner) {
            *share += cent;
            leftover -= cent;
        }
    }
    if !leftover.is_zero() {
        if let Some((_, owner)) = remainders.first() {
            if let Some(share) = shares.get_mut(owner) {
                *share += leftover;
            }
        }
    }

    if total.is_sign_negative() {
        for share in shares.values_mut() {
            *share = -*share;
        }
    }
    shares
}
