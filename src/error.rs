//! Error types for fitfacts

use thiserror::Error;

/// Errors from the decoder boundary.
///
/// Every variant is fatal for the file it names and only for that file;
/// batch processing continues past it.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid decoded container: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("decoder reported {count} error(s) for {path}: {first}")]
    Reported {
        path: String,
        count: usize,
        first: String,
    },
}
