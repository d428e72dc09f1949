//! Error types shared by the pure transformation functions.

/// Failures raised before anything reaches the network.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed caller input: a missing required field or an invalid batch.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The authentication configuration cannot produce a usable strategy.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// The message without the category prefix.
    pub fn detail(&self) -> &str {
        match self {
            Error::Validation(message) | Error::Configuration(message) => message,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
