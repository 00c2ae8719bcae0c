//! Joins Grocy collections into the views the dashboard shows.
//!
//! Failure policy differs by view: the stock view is all-or-nothing (`None`
//! when any collection is unavailable) while shopping lists degrade to empty.
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashMap;
use tracing::{instrument, warn};

use crate::inventory::model::{
    EntityId, Location, Product, ShoppingList, ShoppingListRow, StockEntry,
};
use crate::inventory::{self, fetch_collection, InventorySource};
use crate::model::{ShoppingListItem, StockItem, StockView};

pub const UNKNOWN_PRODUCT: &str = "Unknown Product";
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

/// Default width of the "expiring soon" window.
pub const EXPIRING_WINDOW_DAYS: i64 = 7;

/// Fetch stock, products and locations concurrently and classify the stock.
///
/// Returns `None` if any of the three collections could not be fetched.
#[instrument(skip_all)]
pub async fn compute_stock_view(
    source: &dyn InventorySource,
    now: DateTime<Utc>,
    window: Duration,
) -> Option<StockView> {
    let (stock, products, locations) = futures::join!(
        fetch_collection::<StockEntry>(source, inventory::STOCK),
        fetch_collection::<Product>(source, inventory::PRODUCTS),
        fetch_collection::<Location>(source, inventory::LOCATIONS),
    );

    let (Some(stock), Some(products), Some(locations)) = (stock, products, locations) else {
        warn!("grocy data incomplete, stock view unavailable");
        return None;
    };
    Some(classify_stock(&stock, &products, &locations, now, window))
}

/// Join stock entries with their product and location and split them into
/// expired, expiring and low-stock buckets as of `now`.
///
/// An item can appear in an expiry bucket and in `low_stock` at the same time.
/// Entries whose best-before date cannot be parsed are never expired or
/// expiring.
pub fn classify_stock(
    stock: &[StockEntry],
    products: &[Product],
    locations: &[Location],
    now: DateTime<Utc>,
    window: Duration,
) -> StockView {
    let product_map = index_by_id(products, |p| &p.id);
    let location_map = index_by_id(locations, |l| &l.id);
    let horizon = now + window;

    let mut view = StockView::default();
    for entry in stock {
        let product = lookup(&product_map, entry.product_id.as_ref());
        let location = lookup(&location_map, entry.effective_location_id());
        let item = join_stock_entry(entry, product, location);

        if let Some(best_before) = entry.best_before_date.as_deref().and_then(parse_best_before) {
            if best_before < now {
                view.expired.push(item.clone());
            } else if best_before <= horizon {
                view.expiring.push(item.clone());
            }
        }

        let min_stock = product
            .and_then(|p| p.min_stock_amount.as_ref())
            .map(|q| q.as_int())
            .unwrap_or(0);
        if item.amount.as_int() < min_stock {
            view.low_stock.push(item);
        }
    }
    view
}

fn join_stock_entry(
    entry: &StockEntry,
    product: Option<&Product>,
    location: Option<&Location>,
) -> StockItem {
    StockItem {
        product_id: entry.product_id.clone(),
        location_id: entry.effective_location_id().cloned(),
        amount: entry.amount.clone().unwrap_or_default(),
        best_before_date: entry.best_before_date.clone(),
        product_name: display_name(product.map(|p| p.name.as_str()), UNKNOWN_PRODUCT),
        location_name: display_name(location.map(|l| l.name.as_str()), UNKNOWN_LOCATION),
    }
}

/// Items of one shopping list with their product names.
///
/// A missing list id yields an empty list without any request; so does an
/// unavailable collection.
#[instrument(skip(source))]
pub async fn compute_shopping_list_items(
    source: &dyn InventorySource,
    list_id: Option<&str>,
) -> Vec<ShoppingListItem> {
    let Some(list_id) = list_id.map(str::trim).filter(|id| !id.is_empty()) else {
        return Vec::new();
    };

    let endpoint = inventory::shopping_list_items_endpoint(list_id);
    let (rows, products) = futures::join!(
        fetch_collection::<ShoppingListRow>(source, &endpoint),
        fetch_collection::<Product>(source, inventory::PRODUCTS),
    );
    let (Some(rows), Some(products)) = (rows, products) else {
        return Vec::new();
    };
    join_shopping_list(&rows, &products)
}

pub fn join_shopping_list(rows: &[ShoppingListRow], products: &[Product]) -> Vec<ShoppingListItem> {
    let product_map = index_by_id(products, |p| &p.id);
    rows.iter()
        .map(|row| {
            let product = lookup(&product_map, row.product_id.as_ref());
            ShoppingListItem {
                id: row.id.clone(),
                shopping_list_id: row.shopping_list_id.clone(),
                product_id: row.product_id.clone(),
                amount: row.amount.clone().unwrap_or_default(),
                note: row.note.clone(),
                product_name: display_name(product.map(|p| p.name.as_str()), UNKNOWN_PRODUCT),
            }
        })
        .collect()
}

/// All shopping lists, or an empty list if Grocy is unavailable.
#[instrument(skip_all)]
pub async fn list_shopping_lists(source: &dyn InventorySource) -> Vec<ShoppingList> {
    fetch_collection::<ShoppingList>(source, inventory::SHOPPING_LISTS)
        .await
        .unwrap_or_default()
}

fn index_by_id<'a, T>(rows: &'a [T], id: impl Fn(&T) -> &EntityId) -> HashMap<&'a str, &'a T> {
    rows.iter().map(|row| (id(row).as_str(), row)).collect()
}

fn lookup<'a, T>(map: &HashMap<&str, &'a T>, id: Option<&EntityId>) -> Option<&'a T> {
    id.filter(|id| !id.is_blank())
        .and_then(|id| map.get(id.as_str()).copied())
}

fn display_name(name: Option<&str>, fallback: &str) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => fallback.to_string(),
    }
}

/// Parse a Grocy best-before value.
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DD HH:MM:SS` and plain dates; naive
/// values are read as UTC, dates as midnight.
pub fn parse_best_before(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(ts.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::model::Quantity;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn window() -> Duration {
        Duration::days(EXPIRING_WINDOW_DAYS)
    }

    fn entry(product: &str, amount: &str, best_before: &str) -> StockEntry {
        StockEntry {
            product_id: Some(product.into()),
            location_id: Some("1".into()),
            amount: Some(Quantity::Text(amount.into())),
            best_before_date: Some(best_before.into()),
            product: None,
        }
    }

    fn product(id: &str, name: &str, min: &str) -> Product {
        Product {
            id: id.into(),
            name: name.into(),
            min_stock_amount: Some(Quantity::Text(min.into())),
        }
    }

    fn stamp(ts: DateTime<Utc>) -> String {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    #[test]
    fn expiry_buckets_are_exclusive() {
        let stock = vec![
            entry("1", "1", &stamp(now() - Duration::seconds(1))),
            entry("1", "1", &stamp(now() + Duration::days(3))),
            entry("1", "1", &stamp(now() + Duration::days(10))),
        ];
        let view = classify_stock(&stock, &[product("1", "Milk", "0")], &[], now(), window());
        assert_eq!(view.expired.len(), 1);
        assert_eq!(view.expired[0].best_before_date, stock[0].best_before_date);
        assert_eq!(view.expiring.len(), 1);
        assert_eq!(view.expiring[0].best_before_date, stock[1].best_before_date);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let stock = vec![
            entry("1", "1", &stamp(now())),
            entry("1", "1", &stamp(now() + window())),
        ];
        let view = classify_stock(&stock, &[], &[], now(), window());
        assert!(view.expired.is_empty());
        assert_eq!(view.expiring.len(), 2);
    }

    #[test]
    fn unparseable_dates_are_ignored() {
        let stock = vec![entry("1", "1", "someday"), entry("1", "1", "")];
        let view = classify_stock(&stock, &[], &[], now(), window());
        assert!(view.expired.is_empty());
        assert!(view.expiring.is_empty());
    }

    #[test]
    fn low_stock_uses_strict_integer_comparison() {
        let products = vec![product("1", "Eggs", "5"), product("2", "Rice", "5")];
        let stock = vec![entry("1", "2", "2999-12-31"), entry("2", "5", "2999-12-31")];
        let view = classify_stock(&stock, &products, &[], now(), window());
        assert_eq!(view.low_stock.len(), 1);
        assert_eq!(view.low_stock[0].product_name, "Eggs");
    }

    #[test]
    fn low_stock_treats_missing_or_garbage_minimum_as_zero() {
        let products = vec![
            Product {
                id: "1".into(),
                name: "Salt".into(),
                min_stock_amount: None,
            },
            product("2", "Pepper", "lots"),
        ];
        let stock = vec![entry("1", "0", "2999-12-31"), entry("2", "0", "2999-12-31")];
        let view = classify_stock(&stock, &products, &[], now(), window());
        assert!(view.low_stock.is_empty());
    }

    #[test]
    fn dangling_references_get_placeholder_names() {
        let locations = vec![Location {
            id: "1".into(),
            name: "Fridge".into(),
        }];
        let mut orphan = entry("99", "1", "2000-01-01");
        orphan.location_id = Some("42".into());
        let stock = vec![entry("1", "1", "2000-01-01"), orphan];
        let view = classify_stock(&stock, &[product("1", "Milk", "0")], &locations, now(), window());

        assert_eq!(view.expired[0].product_name, "Milk");
        assert_eq!(view.expired[0].location_name, "Fridge");
        assert_eq!(view.expired[1].product_name, UNKNOWN_PRODUCT);
        assert_eq!(view.expired[1].location_name, UNKNOWN_LOCATION);
    }

    #[test]
    fn shopping_list_join_defaults_unknown_products() {
        let rows = vec![
            ShoppingListRow {
                id: Some(1_i64.into()),
                shopping_list_id: Some(1_i64.into()),
                product_id: Some(1_i64.into()),
                amount: Some(Quantity::Number(2.0)),
                note: None,
            },
            ShoppingListRow {
                id: Some(2_i64.into()),
                shopping_list_id: Some(1_i64.into()),
                product_id: None,
                amount: None,
                note: Some("candles".into()),
            },
        ];
        let items = join_shopping_list(&rows, &[product("1", "Butter", "0")]);
        assert_eq!(items[0].product_name, "Butter");
        assert_eq!(items[1].product_name, UNKNOWN_PRODUCT);
        assert_eq!(items[1].amount, Quantity::default());
    }

    #[test]
    fn best_before_formats() {
        assert_eq!(
            parse_best_before("2024-06-01"),
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_best_before("2024-06-01 08:30:00"),
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap())
        );
        assert_eq!(
            parse_best_before("2024-06-01T08:30:00+02:00"),
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 6, 30, 0).unwrap())
        );
        assert_eq!(parse_best_before("31/12/2024"), None);
    }
}
