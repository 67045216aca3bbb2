//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Only run-level failures are errors. Anything that goes wrong with a single
//! staged object is folded into its [`Disposition`](crate::Disposition).

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The set of active downloads could not be fetched. Fatal for the run.
    #[display("could not fetch active downloads")]
    Fetch,
    /// The staging directory could not be listed. Fatal for the run.
    #[display("could not list staging directory {}", _0.display())]
    Listing(#[error(not(source))] PathBuf),
    /// The archive copy of a staged object could not be measured.
    #[display("could not compare {} with its archive copy", _0)]
    Lookup(#[error(not(source))] String),
    /// A configuration value names something the library does not know.
    #[display("unknown value: {_0}")]
    UnknownValue(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch)
    }
}
