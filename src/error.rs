//! CLI Error Types

use derive_more::{Display, Error};

/// A CLI error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Run-level failures, one per exit code.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    #[display("could not set up the run: {_0}")]
    Setup(#[error(not(source))] String),
    #[display("could not fetch active downloads")]
    Fetch,
    #[display("could not list the staging directory")]
    Listing,
}

impl ErrorKind {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config | Self::Setup(_) => 1,
            Self::Fetch => 2,
            Self::Listing => 3,
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch)
    }
}
