use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SchemaLoadError {
    #[error("failed to read schema {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed schema JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid declaration for event type `{event_type}`: {reason}")]
    Invalid { event_type: String, reason: String },
    #[error("schema declares no event types")]
    Empty,
}
