//! Cart and wishlist line items.
//!
//! Field names follow the REST backend's camelCase JSON so the same types
//! serve for request bodies, responses, and device storage snapshots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use super::kind::CollectionKind;
use super::numeric;

/// Image shown when an item has no image of its own.
pub const DEFAULT_IMAGE: &str = "/images/placeholder-fragrance.jpg";

/// Identity of an item within a collection: product id plus selected size.
///
/// Two items with the same id but different sizes are distinct entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemKey<'a> {
    pub id: &'a str,
    pub selected_size: Option<&'a str>,
}

impl<'a> ItemKey<'a> {
    #[must_use]
    pub const fn new(id: &'a str, selected_size: Option<&'a str>) -> Self {
        Self { id, selected_size }
    }

    /// Whether this key is selected by an `(id, size)` lookup.
    ///
    /// A lookup without a size selects every size of the product.
    #[must_use]
    pub fn selected_by(&self, id: &str, selected_size: Option<&str>) -> bool {
        self.id == id && selected_size.is_none_or(|size| self.selected_size == Some(size))
    }
}

/// Behaviour shared by every item type a collection can hold.
pub trait CollectionItem:
    Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Which collection this item type lives in.
    const KIND: CollectionKind;

    /// Stable product identifier.
    fn id(&self) -> &str;

    /// Selected size variant, if any.
    fn selected_size(&self) -> Option<&str>;

    /// Display name used in shopper notices.
    fn name(&self) -> &str;

    /// How much this entry contributes to the collection count.
    fn weight(&self) -> u32;

    /// Fill in defaults before the item is stored on device.
    fn prepare_for_local(&mut self, now: DateTime<Utc>);

    /// Identity of this item within its collection.
    fn key(&self) -> ItemKey<'_> {
        ItemKey::new(self.id(), self.selected_size())
    }
}

/// A cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub name: String,
    #[serde(with = "numeric::price")]
    pub price: Decimal,
    #[serde(default = "default_image", deserialize_with = "image_or_default")]
    pub image: String,
    /// Missing quantities count as 1.
    #[serde(
        default,
        deserialize_with = "numeric::quantity::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub selected_size: Option<String>,
    #[serde(default)]
    pub personalization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

impl CartItem {
    /// Create a cart line with quantity 1 and no variant details.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            image: default_image(),
            quantity: Some(1),
            selected_size: None,
            personalization: None,
            brand: None,
            sku: None,
        }
    }

    /// Set the quantity.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Set the selected size.
    #[must_use]
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.selected_size = Some(size.into());
        self
    }

    /// Quantity with the missing-means-one default applied.
    #[must_use]
    pub fn effective_quantity(&self) -> u32 {
        self.quantity.unwrap_or(1)
    }

    /// `price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.effective_quantity())
    }
}

impl CollectionItem for CartItem {
    const KIND: CollectionKind = CollectionKind::Cart;

    fn id(&self) -> &str {
        &self.id
    }

    fn selected_size(&self) -> Option<&str> {
        self.selected_size.as_deref()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> u32 {
        self.effective_quantity()
    }

    fn prepare_for_local(&mut self, _now: DateTime<Utc>) {
        self.quantity.get_or_insert(1);
    }
}

/// A saved-for-later product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub id: String,
    pub name: String,
    #[serde(with = "numeric::price")]
    pub price: Decimal,
    #[serde(default = "default_image", deserialize_with = "image_or_default")]
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub selected_size: Option<String>,
    /// Set on device when an anonymous shopper saves the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl WishlistItem {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            image: default_image(),
            description: String::new(),
            category: String::new(),
            selected_size: None,
            added_at: None,
        }
    }

    /// Set the selected size.
    #[must_use]
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.selected_size = Some(size.into());
        self
    }
}

impl CollectionItem for WishlistItem {
    const KIND: CollectionKind = CollectionKind::Wishlist;

    fn id(&self) -> &str {
        &self.id
    }

    fn selected_size(&self) -> Option<&str> {
        self.selected_size.as_deref()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> u32 {
        1
    }

    fn prepare_for_local(&mut self, now: DateTime<Utc>) {
        self.added_at.get_or_insert(now);
    }
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

fn image_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let image = Option::<String>::deserialize(deserializer)?;
    Ok(image
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(default_image))
}
