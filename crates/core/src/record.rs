use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One catalog item as read from an ingestion payload.
///
/// Every attribute is optional: payloads are produced by scrapers that
/// frequently omit fields, and a missing value is persisted as `NULL`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub currency: Option<String>,
    pub source: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
}

impl ProductRecord {
    /// Natural business key `(sku, source)`.
    ///
    /// Returns `None` when either half is missing; such records never
    /// collide with each other, matching `NULL` semantics of a SQL unique
    /// constraint.
    pub fn business_key(&self) -> Option<(&str, &str)> {
        match (&self.sku, &self.source) {
            (Some(sku), Some(source)) => Some((sku.as_str(), source.as_str())),
            _ => None,
        }
    }
}

/// Which record columns a deployment writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordShape {
    WithImage,
    WithoutImage,
}

impl RecordShape {
    pub fn includes_image(self) -> bool {
        matches!(self, RecordShape::WithImage)
    }

    /// Column list used by the writer, in bind order.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            RecordShape::WithImage => &[
                "name", "price", "brand", "sku", "currency", "source", "category", "image",
            ],
            RecordShape::WithoutImage => &[
                "name", "price", "brand", "sku", "currency", "source", "category",
            ],
        }
    }
}

impl fmt::Display for RecordShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordShape::WithImage => write!(f, "with_image"),
            RecordShape::WithoutImage => write!(f, "without_image"),
        }
    }
}

impl FromStr for RecordShape {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "with_image" | "withimage" => Ok(RecordShape::WithImage),
            "without_image" | "withoutimage" => Ok(RecordShape::WithoutImage),
            other => Err(ConfigError::InvalidValue {
                key: "RECORD_SHAPE".to_string(),
                value: other.to_string(),
                reason: "expected with_image or without_image".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_key_requires_both_halves() {
        let mut rec = ProductRecord {
            sku: Some("A1".into()),
            ..Default::default()
        };
        assert_eq!(rec.business_key(), None);
        rec.source = Some("shop".into());
        assert_eq!(rec.business_key(), Some(("A1", "shop")));
    }

    #[test]
    fn shape_columns() {
        assert_eq!(RecordShape::WithImage.columns().len(), 8);
        assert_eq!(RecordShape::WithoutImage.columns().len(), 7);
        assert!(!RecordShape::WithoutImage.columns().contains(&"image"));
    }

    #[test]
    fn shape_parse() {
        assert_eq!("WITH_IMAGE".parse::<RecordShape>().unwrap(), RecordShape::WithImage);
        assert_eq!("without_image".parse::<RecordShape>().unwrap(), RecordShape::WithoutImage);
        assert!("both".parse::<RecordShape>().is_err());
    }
}
