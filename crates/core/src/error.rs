use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("missing required setting: {0}")]
    Missing(String),
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event record {index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },
}
