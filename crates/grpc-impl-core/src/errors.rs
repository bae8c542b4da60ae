//! Error types for backend selection and selector configuration.

use crate::preference::Preference;
use thiserror::Error;

/// Error raised when no backend can be selected.
///
/// `Unavailable` is the only way resolution fails: both probes came back
/// negative, whatever the preference said.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// Neither the rust nor the cython backend could be loaded
    #[error("Neither implementation available (preference: {preference})")]
    Unavailable { preference: Preference },
}

impl SelectorError {
    /// Creates an unavailable error for the preference in effect.
    pub fn unavailable(preference: Preference) -> Self {
        SelectorError::Unavailable { preference }
    }

    /// Preference that was in effect when resolution failed.
    pub fn preference(&self) -> Preference {
        match self {
            SelectorError::Unavailable { preference } => *preference,
        }
    }

    /// Returns a user-friendly error message with actionable guidance.
    pub fn user_message(&self) -> String {
        match self {
            SelectorError::Unavailable { preference } => {
                format!(
                    "No gRPC implementation is available (preference: {}).\n\
                     → Build the rust backend with GRPC_PYTHON_BUILD_WITH_RUST=1, or\n\
                     → install the cython extension (must export PyInit_cygrpc).\n\
                     → Check the library paths in your selector config.",
                    preference
                )
            }
        }
    }
}

/// Errors raised while loading or validating a [`crate::SelectorConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML was malformed or had the wrong shape
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration parsed but violates a constraint
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Creates a validation error.
    pub fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid(message.into())
    }
}

/// Result type alias for selector operations.
pub type Result<T> = std::result::Result<T, SelectorError>;
