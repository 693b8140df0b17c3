//! Lenient numeric parsing for prices and quantities.
//!
//! Item payloads come from two places: the REST backend and snapshots written
//! to device storage by earlier sessions. Either may carry numbers as JSON
//! numbers or as numeric strings (`"19.99"`), so both are accepted and
//! coerced. Prices are always written back out as JSON numbers.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

/// Errors that can occur when coercing a value into a price or quantity.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NumericError {
    /// The input is not a number.
    #[error("not a number: {0}")]
    NotANumber(String),
    /// Prices cannot be negative.
    #[error("price must be non-negative (got {0})")]
    NegativePrice(Decimal),
    /// Quantities start at one.
    #[error("quantity must be at least 1 (got {0})")]
    QuantityTooSmall(i64),
    /// Quantities are whole numbers.
    #[error("quantity must be a whole number (got {0})")]
    FractionalQuantity(String),
}

/// Parse a price from its textual form.
///
/// # Errors
///
/// Returns an error if the input is not a decimal number or is negative.
///
/// # Examples
///
/// ```
/// use attar_core::numeric::parse_price;
///
/// assert_eq!(parse_price(" 20.50 ").unwrap().to_string(), "20.50");
/// assert!(parse_price("-1").is_err());
/// assert!(parse_price("twenty").is_err());
/// ```
pub fn parse_price(raw: &str) -> Result<Decimal, NumericError> {
    let trimmed = raw.trim();
    let value = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| NumericError::NotANumber(raw.to_string()))?;
    check_price(value)
}

/// Parse a quantity from its textual form.
///
/// # Errors
///
/// Returns an error if the input is not a whole number of at least 1.
pub fn parse_quantity(raw: &str) -> Result<u32, NumericError> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return check_quantity(value);
    }
    let value = trimmed
        .parse::<f64>()
        .map_err(|_| NumericError::NotANumber(raw.to_string()))?;
    quantity_from_f64(value)
}

fn check_price(value: Decimal) -> Result<Decimal, NumericError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(NumericError::NegativePrice(value));
    }
    Ok(value)
}

fn check_quantity(value: i64) -> Result<u32, NumericError> {
    if value < 1 {
        return Err(NumericError::QuantityTooSmall(value));
    }
    u32::try_from(value).map_err(|_| NumericError::NotANumber(value.to_string()))
}

fn quantity_from_f64(value: f64) -> Result<u32, NumericError> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(NumericError::FractionalQuantity(value.to_string()));
    }
    #[allow(clippy::cast_possible_truncation)] // whole number checked above
    check_quantity(value as i64)
}

/// Serde adapter for prices: accepts numbers or numeric strings, writes numbers.
pub mod price {
    use super::{Decimal, Deserializer, Serializer, ToPrimitive, Visitor, check_price, de, fmt};

    /// Serialize a price as a JSON number.
    ///
    /// # Errors
    ///
    /// Returns an error if the price cannot be represented as an `f64`.
    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        let number = value
            .to_f64()
            .ok_or_else(|| serde::ser::Error::custom(format!("price out of range: {value}")))?;
        serializer.serialize_f64(number)
    }

    /// Deserialize a price from a JSON number or numeric string.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not numeric or is negative.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        deserializer.deserialize_any(PriceVisitor)
    }

    struct PriceVisitor;

    impl Visitor<'_> for PriceVisitor {
        type Value = Decimal;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative number or numeric string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
            check_price(Decimal::from(v)).map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
            Ok(Decimal::from(v))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
            let value = Decimal::try_from(v).map_err(E::custom)?;
            check_price(value.normalize()).map_err(E::custom)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
            super::parse_price(v).map_err(E::custom)
        }
    }
}

/// Serde adapter for optional quantities.
///
/// Missing and `null` quantities deserialize to `None`; callers treat them as 1.
pub mod quantity {
    use super::{Deserializer, Visitor, check_quantity, de, fmt, quantity_from_f64};

    /// Deserialize an optional quantity from a JSON number, numeric string, or null.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a whole number of at least 1.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        deserializer.deserialize_any(QuantityVisitor)
    }

    struct QuantityVisitor;

    impl<'de> Visitor<'de> for QuantityVisitor {
        type Value = Option<u32>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a whole number of at least 1")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(self)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            check_quantity(v).map(Some).map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            let v = i64::try_from(v).map_err(E::custom)?;
            self.visit_i64(v)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            quantity_from_f64(v).map(Some).map_err(E::custom)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            super::parse_quantity(v).map(Some).map_err(E::custom)
        }
    }
}
