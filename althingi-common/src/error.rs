//! Common error types for the Althingi tools

use thiserror::Error;

/// Common result type for Althingi operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Althingi crates
///
/// Two families: domain errors (`NotFoundUpstream`, `InvalidInput`, `Xml`)
/// abort the current unit of work and are surfaced verbatim to the operator;
/// transient errors (`Transport`) are retried a fixed number of times by the
/// feed client and are fatal to the whole run once retries are exhausted.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The feed has no resource matching the requested identifier
    #[error("Not found upstream: {0}")]
    NotFoundUpstream(String),

    /// Invalid caller input (malformed identifier, parliament out of range)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Remote fetch failed after retry exhaustion
    #[error("Transport error: {0}")]
    Transport(String),

    /// The feed returned a document that could not be parsed or is missing
    /// expected structure
    #[error("Malformed feed document: {0}")]
    Xml(String),
}

impl Error {
    /// Whether this error should abort the entire run rather than just the
    /// current top-level unit of work.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Io(_) | Error::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_is_fatal() {
        assert!(Error::Transport("connection reset".into()).is_fatal());
    }

    #[test]
    fn test_domain_errors_are_not_fatal() {
        assert!(!Error::NotFoundUpstream("person 3".into()).is_fatal());
        assert!(!Error::InvalidInput("parliament 999".into()).is_fatal());
        assert!(!Error::Xml("missing tag".into()).is_fatal());
    }
}
