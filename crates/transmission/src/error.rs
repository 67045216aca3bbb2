//! Transmission Error Types

use derive_more::{Display, Error};

/// A Transmission client error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for Transmission operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The HTTP client could not be constructed.
    #[display("could not build HTTP client")]
    Client,
    #[display("request to Transmission failed: {_0}")]
    Request(reqwest::Error),
    /// The daemon kept rejecting the session id it handed out.
    #[display("Transmission session handshake failed")]
    Handshake,
    #[display("Transmission rejected the credentials")]
    Unauthorized,
    #[display("Transmission responded with HTTP {_0}")]
    Status(#[error(not(source))] u16),
    /// The RPC call itself reported a failure.
    #[display("Transmission RPC failed: {_0}")]
    Rpc(#[error(not(source))] String),
    #[display("could not decode Transmission response")]
    Decode,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(err) => err.is_timeout() || err.is_connect(),
            Self::Handshake => true,
            Self::Status(code) => *code >= 500,
            _ => false,
        }
    }
}
