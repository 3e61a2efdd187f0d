//! Parse ingestion payloads into [`ProductRecord`]s.

use serde_json::{Map, Value};

use shelfsync_core::{ProductRecord, RecordShape};

use crate::error::DecodeError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode a payload into records, in payload order.
///
/// Strict at the top level: the payload must be a JSON array whose entries
/// are objects. Permissive per field: a field that is missing, `null`, of the
/// wrong type, or an empty string decodes to `None`. Unknown fields are ignored.
pub fn decode(bytes: &[u8], shape: RecordShape) -> Result<Vec<ProductRecord>, DecodeError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let json: Value = serde_json::from_slice(bytes)?;

    let Value::Array(entries) = json else {
        return Err(DecodeError::NotAnArray);
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            entry
                .as_object()
                .map(|obj| record_from_object(obj, shape))
                .ok_or(DecodeError::NonObjectEntry { index })
        })
        .collect()
}

fn record_from_object(obj: &Map<String, Value>, shape: RecordShape) -> ProductRecord {
    ProductRecord {
        name: text(obj, "name"),
        price: number(obj, "price"),
        brand: text(obj, "brand"),
        sku: text(obj, "sku"),
        currency: text(obj, "currency"),
        source: text(obj, "source"),
        category: text(obj, "category"),
        image: if shape.includes_image() { text(obj, "image") } else { None },
    }
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(Value::as_f64).filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_record() {
        let payload = br#"[{
            "name": "Trail Runner 2",
            "price": 129.9,
            "brand": "Acme",
            "sku": "TR-2",
            "currency": "EUR",
            "source": "shop-a",
            "category": "shoes",
            "image": "https://cdn.example/tr2.jpg"
        }]"#;
        let records = decode(payload, RecordShape::WithImage).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.name.as_deref(), Some("Trail Runner 2"));
        assert_eq!(r.price, Some(129.9));
        assert_eq!(r.sku.as_deref(), Some("TR-2"));
        assert_eq!(r.image.as_deref(), Some("https://cdn.example/tr2.jpg"));
    }

    #[test]
    fn missing_and_wrong_shape_fields_become_none() {
        let payload = br#"[{"name": 42, "price": "12.50", "brand": null, "sku": "", "extra": true}]"#;
        let records = decode(payload, RecordShape::WithImage).unwrap();
        assert_eq!(records[0], ProductRecord::default());
    }

    #[test]
    fn zero_price_is_kept() {
        let records = decode(br#"[{"price": 0}]"#, RecordShape::WithImage).unwrap();
        assert_eq!(records[0].price, Some(0.0));
    }

    #[test]
    fn image_dropped_without_image_shape() {
        let payload = br#"[{"sku": "A", "image": "x.jpg"}]"#;
        let records = decode(payload, RecordShape::WithoutImage).unwrap();
        assert_eq!(records[0].image, None);
        assert_eq!(records[0].sku.as_deref(), Some("A"));
    }

    #[test]
    fn empty_array_is_ok() {
        assert!(decode(b"[]", RecordShape::WithImage).unwrap().is_empty());
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let payload = b"\xEF\xBB\xBF[{\"sku\": \"A\"}]";
        assert_eq!(decode(payload, RecordShape::WithImage).unwrap().len(), 1);
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(
            decode(b"[{", RecordShape::WithImage),
            Err(DecodeError::InvalidJson(_))
        ));
    }

    #[test]
    fn rejects_top_level_object() {
        assert!(matches!(
            decode(br#"{"sku": "A"}"#, RecordShape::WithImage),
            Err(DecodeError::NotAnArray)
        ));
    }

    #[test]
    fn rejects_non_object_entry() {
        let err = decode(br#"[{"sku": "A"}, "B"]"#, RecordShape::WithImage).unwrap_err();
        assert!(matches!(err, DecodeError::NonObjectEntry { index: 1 }));
    }
}
