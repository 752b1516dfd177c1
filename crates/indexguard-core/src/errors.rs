//! Error types for the indexguard core library.
//!
//! Only construction and the SQLite reference store are fallible. The checked
//! query surface never returns these: it logs through
//! [`crate::oracle::diagnostics::Diagnostics`] and degrades instead.

/// Top-level error enum for the indexguard core library.
#[derive(Debug, thiserror::Error)]
pub enum IndexGuardError {
    #[error("Index error: {0}")]
    Index(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid document URI: {0}")]
    InvalidUri(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type IndexGuardResult<T> = Result<T, IndexGuardError>;
