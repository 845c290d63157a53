use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading and validating the JSON configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Every issue found by validation, one `field: problem` per entry.
    #[error("Validation error: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// A configured search string has no matching run on the target page.
///
/// This is the only condition recovered per instruction; it is handed to the
/// [`crate::overlay::Reporter`] rather than propagated.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Could not find coordinates for text: \"{search}\".")]
pub struct TextNotFound {
    pub search: String,
}

/// Failures that abort a stamping run.
#[derive(Debug, Error)]
pub enum StampError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("page {page} does not exist (document has {page_count} pages)")]
    PageNotFound { page: u32, page_count: usize },

    #[error("cannot encode {ch:?} in \"{text}\" with WinAnsiEncoding")]
    Unencodable { ch: char, text: String },

    #[error("failed to serialize document: {0}")]
    Save(String),
}

pub type Result<T, E = StampError> = std::result::Result<T, E>;
