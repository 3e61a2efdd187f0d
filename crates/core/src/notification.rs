//! Object-storage event notifications.
//!
//! S3 and MinIO deliver bucket notifications as
//! `{"Records": [{"s3": {"bucket": {"name": ..}, "object": {"key": ..}}}]}`
//! with object keys URL-encoded. [`parse_event_batch`] turns such a body into
//! the list of [`IngestionNotification`]s the orchestrator works on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NotificationError;

/// One `(bucket, key)` pointer to a newly available object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionNotification {
    pub bucket: String,
    /// Percent-decoded object key.
    pub key: String,
}

impl IngestionNotification {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for IngestionNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

// ── Wire envelope ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "Records", default)]
    records: Vec<EventRecord>,
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: BucketEntity,
    object: ObjectEntity,
}

#[derive(Debug, Deserialize)]
struct BucketEntity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ObjectEntity {
    key: String,
}

/// Parse an S3/MinIO event body into notifications, in record order.
///
/// A body without a `Records` array is an empty batch. Records lacking a
/// bucket name or object key reject the whole body.
pub fn parse_event_batch(body: &[u8]) -> Result<Vec<IngestionNotification>, NotificationError> {
    let envelope: EventEnvelope = serde_json::from_slice(body)?;

    envelope
        .records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let bucket = record.s3.bucket.name;
            if bucket.is_empty() {
                return Err(NotificationError::EmptyField { index, field: "bucket name" });
            }
            let key = decode_object_key(&record.s3.object.key);
            if key.is_empty() {
                return Err(NotificationError::EmptyField { index, field: "object key" });
            }
            Ok(IngestionNotification { bucket, key })
        })
        .collect()
}

/// Percent-decode an object key; keys that do not decode to UTF-8 are kept as sent.
fn decode_object_key(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|k| k.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minio_event() {
        let body = br#"{
            "EventName": "s3:ObjectCreated:Put",
            "Key": "catalog/feed%202025.json",
            "Records": [{
                "eventVersion": "2.0",
                "s3": {
                    "bucket": {"name": "catalog", "arn": "arn:aws:s3:::catalog"},
                    "object": {"key": "daily%2Ffeed%202025.json", "size": 1024}
                }
            }]
        }"#;
        let batch = parse_event_batch(body).unwrap();
        assert_eq!(batch, vec![IngestionNotification::new("catalog", "daily/feed 2025.json")]);
    }

    #[test]
    fn missing_records_is_empty_batch() {
        assert!(parse_event_batch(b"{}").unwrap().is_empty());
    }

    #[test]
    fn preserves_record_order() {
        let body = br#"{"Records": [
            {"s3": {"bucket": {"name": "b"}, "object": {"key": "one.json"}}},
            {"s3": {"bucket": {"name": "b"}, "object": {"key": "two.json"}}}
        ]}"#;
        let keys: Vec<String> = parse_event_batch(body)
            .unwrap()
            .into_iter()
            .map(|n| n.key)
            .collect();
        assert_eq!(keys, vec!["one.json", "two.json"]);
    }

    #[test]
    fn rejects_record_without_bucket() {
        let body = br#"{"Records": [{"s3": {"object": {"key": "a.json"}}}]}"#;
        assert!(matches!(parse_event_batch(body), Err(NotificationError::Json(_))));
    }

    #[test]
    fn rejects_empty_key() {
        let body = br#"{"Records": [{"s3": {"bucket": {"name": "b"}, "object": {"key": ""}}}]}"#;
        let err = parse_event_batch(body).unwrap_err();
        assert!(err.to_string().contains("object key"));
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_event_batch(b"not json").is_err());
    }
}
