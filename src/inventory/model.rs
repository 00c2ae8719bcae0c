//! Rows returned by the Grocy REST API.
//!
//! Grocy is loose about JSON types: ids and amounts show up as numbers on some
//! installations and as strings on others. The types here accept both.
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier of a Grocy object, normalised to its textual form so that `3`
/// and `"3"` refer to the same product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty ids are treated as absent.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.trim().to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Float(f64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(i) => EntityId::from(i),
            Raw::Float(f) => EntityId(f.to_string()),
            Raw::Text(s) => EntityId::from(s.as_str()),
        })
    }
}

/// An amount as sent by Grocy, kept in its original form for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(f64),
    Text(String),
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::Number(0.0)
    }
}

impl Quantity {
    /// Integer value used for stock comparisons. Fractions are truncated and
    /// anything non-numeric counts as 0.
    pub fn as_int(&self) -> i64 {
        match self {
            Quantity::Number(n) if n.is_finite() => n.trunc() as i64,
            Quantity::Number(_) => 0,
            Quantity::Text(s) => leading_int(s),
        }
    }
}

/// Parse the leading integer of `s` ("12.5kg" -> 12, "abc" -> 0).
fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<i64>()
        .map(|n| sign * n)
        .unwrap_or(0)
}

/// Reads `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `/api/stock` entry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StockEntry {
    #[serde(default)]
    pub product_id: Option<EntityId>,
    #[serde(default)]
    pub location_id: Option<EntityId>,
    #[serde(default)]
    pub amount: Option<Quantity>,
    #[serde(default)]
    pub best_before_date: Option<String>,
    /// Grocy nests the product (with its default location) in stock rows.
    #[serde(default)]
    pub product: Option<NestedProduct>,
}

impl StockEntry {
    /// Location of the entry, falling back to the product's default location.
    pub fn effective_location_id(&self) -> Option<&EntityId> {
        self.location_id
            .as_ref()
            .or_else(|| self.product.as_ref().and_then(|p| p.location_id.as_ref()))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NestedProduct {
    #[serde(default)]
    pub location_id: Option<EntityId>,
}

/// `/api/objects/products` row.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Product {
    pub id: EntityId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub min_stock_amount: Option<Quantity>,
}

/// `/api/objects/locations` row.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Location {
    pub id: EntityId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// `/api/objects/shopping_lists` row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShoppingList {
    pub id: EntityId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// `/api/objects/shopping_list` row.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ShoppingListRow {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub shopping_list_id: Option<EntityId>,
    #[serde(default)]
    pub product_id: Option<EntityId>,
    #[serde(default)]
    pub amount: Option<Quantity>,
    #[serde(default)]
    pub note: Option<String>,
}
