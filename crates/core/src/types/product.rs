//! Catalog product records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// A product in the static catalog.
///
/// Field names follow the catalog JSON (`imageUrl`). The price may be written
/// as a decimal string or a plain JSON number; either way it is read through
/// its text, and it is always written back as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub image_url: String,
    /// Unit price in USD.
    #[serde(with = "price_text")]
    pub price: Decimal,
}

/// Catalog price in either JSON form.
mod price_text {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(f64),
    }

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::str::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let text = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text,
            // Shortest round-trip form, so 12.5 reads as 12.5 and not its binary neighbour
            Raw::Number(number) if number.is_finite() => number.to_string(),
            Raw::Number(number) => return Err(D::Error::custom(format!("invalid price {number}"))),
        };
        Decimal::from_str(text.trim())
            .map_err(|e| D::Error::custom(format!("invalid price '{text}': {e}")))
    }
}

impl Product {
    /// Unit price as a USD [`Price`].
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::usd(self.price)
    }
}
