//! Error types for inlining.
//!
//! Two severities: [`FetchError`] is scoped to a single reference and is always
//! recovered from by skipping that reference; [`InlineError`] aborts the whole
//! conversion.

use thiserror::Error;

/// A single reference could not be resolved or fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (connect, TLS, timeout)
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    /// Server answered with a non-success status
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Local file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Reference could not be turned into an absolute URL
    #[error("cannot resolve '{reference}' against '{base}'")]
    InvalidUrl { reference: String, base: String },

    /// Body exceeded the configured limit
    #[error("{url} is {size} bytes, limit is {limit}")]
    TooLarge { url: String, size: usize, limit: usize },

    /// Reference is already a data URI
    #[error("reference is already inline")]
    AlreadyInline,

    /// Percent-decoding of a local path failed
    #[error("cannot decode path '{0}'")]
    Decode(String),
}

/// The conversion as a whole failed; no document is produced.
#[derive(Debug, Error)]
pub enum InlineError {
    #[error("input is empty")]
    EmptyInput,

    #[error("failed to fetch document: {0}")]
    DocumentFetch(#[source] FetchError),

    #[error("failed to read document {path}: {source}")]
    DocumentRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} does not look like an HTML document")]
    BinaryInput(String),

    #[error("invalid base location '{0}'")]
    InvalidBase(String),

    #[error("failed to serialize document: {0}")]
    Serialize(#[source] std::io::Error),
}
