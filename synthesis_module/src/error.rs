use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config parse error in {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("message #{index} has no subject, body or sender")]
    EmptyMessage { index: usize },
}
