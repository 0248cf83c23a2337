use rust_decimal::Decimal;
use serde::{ser::Error as _, Deserialize, Serialize, Serializer};

use super::ProductCategory;

/// `quantity × unit_price` does not fit in a `Decimal`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("total_price overflows for quantity {quantity} and unit_price {unit_price}")]
pub struct PriceOverflow {
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// One product as exchanged with the upstream backend and API callers.
///
/// Eq/Hash cover every field, so two records collapse in a set only when they
/// are identical in all respects (including an unset `id`).
/// `total_price` is never stored: it is derived on serialization and any
/// inbound value is ignored. Decoding rejects records whose total overflows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "ProductFields")]
pub struct ProductRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: ProductCategory,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub details_url: Option<String>,
    pub image_url: Option<String>,
}

impl ProductRecord {
    /// `quantity × unit_price`, rounded half-to-even to two decimal places.
    pub fn total_price(&self) -> Result<Decimal, PriceOverflow> {
        Decimal::from(self.quantity)
            .checked_mul(self.unit_price)
            .map(|total| total.round_dp(2))
            .ok_or(PriceOverflow {
                quantity: self.quantity,
                unit_price: self.unit_price,
            })
    }
}

/// Inbound shape before the total is checked.
#[derive(Default, Deserialize)]
#[serde(default)]
struct ProductFields {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    category: ProductCategory,
    quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    unit_price: Decimal,
    details_url: Option<String>,
    image_url: Option<String>,
}

impl TryFrom<ProductFields> for ProductRecord {
    type Error = PriceOverflow;

    fn try_from(fields: ProductFields) -> Result<Self, Self::Error> {
        let record = ProductRecord {
            id: fields.id,
            name: fields.name,
            description: fields.description,
            category: fields.category,
            quantity: fields.quantity,
            unit_price: fields.unit_price,
            details_url: fields.details_url,
            image_url: fields.image_url,
        };
        record.total_price()?;
        Ok(record)
    }
}

/// Wire shape: the record's fields plus the derived total.
#[derive(Serialize)]
struct ProductWire<'a> {
    id: &'a Option<String>,
    name: &'a Option<String>,
    description: &'a Option<String>,
    category: ProductCategory,
    quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    total_price: Decimal,
    details_url: &'a Option<String>,
    image_url: &'a Option<String>,
}

impl Serialize for ProductRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let total_price = self.total_price().map_err(S::Error::custom)?;
        ProductWire {
            id: &self.id,
            name: &self.name,
            description: &self.description,
            category: self.category,
            quantity: self.quantity,
            unit_price: self.unit_price,
            total_price,
            details_url: &self.details_url,
            image_url: &self.image_url,
        }
        .serialize(serializer)
    }
}

// ── Request payloads ─────────────────────────────────────────────────────────

/// Body of `POST /categories/{category}/products`. The category comes from
/// the path, so any `category` or `total_price` in the body is ignored.
#[derive(Debug, Deserialize)]
pub struct ProductPayload {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub details_url: Option<String>,
    pub image_url: Option<String>,
}

/// The record keeps the default category until it is filed under one.
impl From<ProductPayload> for ProductRecord {
    fn from(payload: ProductPayload) -> Self {
        ProductRecord {
            id: payload.id,
            name: payload.name,
            description: payload.description,
            category: ProductCategory::default(),
            quantity: payload.quantity,
            unit_price: payload.unit_price,
            details_url: payload.details_url,
            image_url: payload.image_url,
        }
    }
}
