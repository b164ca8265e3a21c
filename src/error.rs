//! Error type shared by every stage of the flow pipeline.
//!
//! Row-level problems ([`Error::MalformedRow`]) are tolerated by the reader and
//! only counted; everything else propagates to the caller.

use std::io;
use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while parsing, converting or writing flow records.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The token is neither a known placeholder, an anonymized token, nor an
    /// IPv4 literal.
    #[error("invalid address token {token:?}: {reason}")]
    InvalidAddress {
        /// The raw token.
        token: String,
        /// Why the token was rejected.
        reason: String,
    },
    /// No globally routable address was found within the retry bound.
    #[error("could not resolve {token:?} to a global address after {attempts} attempts")]
    AddressResolution {
        /// The raw token.
        token: String,
        /// Number of candidate addresses tried.
        attempts: u32,
    },
    /// A scalar column could not be parsed by any of its accepted forms.
    #[error("malformed {field} value {raw:?}")]
    MalformedField {
        /// Column name.
        field: &'static str,
        /// The offending raw text.
        raw: String,
    },
    /// A row does not fit the 16-column schema.
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow {
        /// 1-based line in the source file.
        line: u64,
        /// Why the row was rejected.
        reason: String,
    },
    /// The output file exists and overwriting was not requested.
    #[error("file '{}' already exists", .0.display())]
    DestinationExists(PathBuf),
    /// The output path exists but is not a regular file.
    #[error("given path '{}' is not a file", .0.display())]
    NotAFile(PathBuf),
    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// See [`csv::Error`].
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// See [`std::io::Error`].
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn field(field: &'static str, raw: impl Into<String>) -> Self {
        Self::MalformedField {
            field,
            raw: raw.into(),
        }
    }

    pub(crate) fn row(line: u64, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            line,
            reason: reason.into(),
        }
    }

    /// Whether the reader tolerates this error by skipping the row.
    #[must_use]
    pub fn is_row_scoped(&self) -> bool {
        matches!(self, Self::MalformedRow { .. })
    }
}
