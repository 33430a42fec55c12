use thiserror::Error;

/// Failures from the local key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access store file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode or decode JSON for key '{key}': {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
