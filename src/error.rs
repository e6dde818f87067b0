//! Error taxonomy shared by the transcoder core and the format adapters.
//!
//! Every variant is fatal for the table being processed and nothing more: the
//! batch driver logs it, skips that table and moves on.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or conflicting header row.
    #[error("schema error: {0}")]
    Schema(String),

    /// A cell, index or annotation that cannot be represented in the target.
    #[error("value error: {0}")]
    Value(String),

    /// The table source could not be read or the sink could not be written.
    #[error("adapter error for '{path}': {source}")]
    Adapter {
        path: PathBuf,
        #[source]
        source: AdapterError,
    },
}

impl Error {
    pub fn schema(message: impl Into<String>) -> Self {
        Error::Schema(message.into())
    }

    pub fn value(message: impl Into<String>) -> Self {
        Error::Value(message.into())
    }

    pub fn adapter(path: &Path, source: impl Into<AdapterError>) -> Self {
        Error::Adapter {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}

/// Failures raised by a concrete reader or writer.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors from the embedded Lua state, flattened to text.
    #[error("Lua error: {0}")]
    Lua(String),

    #[error("XLSX error: {0}")]
    Xlsx(String),

    /// The file parsed but its content does not have a supported shape.
    #[error("{0}")]
    Format(String),
}
