#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {field} timestamp '{value}' on {key}: {source}")]
    Timestamp {
        key: String,
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}
