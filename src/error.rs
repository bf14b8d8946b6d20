use thiserror::Error;

/// Failures an in-process or custom transport can report.
///
/// The `timeout`, `connection` and `ssl` families in [`crate::exceptions`] recognise
/// these variants alongside the equivalent `std::io` and `reqwest` errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("ssl error: {0}")]
    Ssl(String),
    #[error("{0}")]
    Other(String),
}
