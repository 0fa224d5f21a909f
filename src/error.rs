//! Error types and handling for the `skycast` pipeline

use thiserror::Error;

/// Main error type for the `skycast` pipeline
#[derive(Error, Debug)]
pub enum SkycastError {
    /// Every geolocation backend in the active chain failed or returned no match
    #[error("Location could not be resolved: {message}")]
    LocationUnresolvable { message: String },

    /// The selected weather provider failed and no fallback succeeded
    #[error("Weather provider unavailable: {message}")]
    ProviderUnavailable { message: String },

    /// A provider requiring an API key was selected without one configured
    #[error("Missing credential for provider {provider}")]
    CredentialMissing { provider: String },

    /// Preferences are inconsistent (e.g. manual mode with no static location)
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl SkycastError {
    /// Create a new location-resolution error
    pub fn unresolvable<S: Into<String>>(message: S) -> Self {
        Self::LocationUnresolvable {
            message: message.into(),
        }
    }

    /// Create a new provider error
    pub fn provider<S: Into<String>>(message: S) -> Self {
        Self::ProviderUnavailable {
            message: message.into(),
        }
    }

    /// Create a new missing-credential error
    pub fn credential<S: Into<String>>(provider: S) -> Self {
        Self::CredentialMissing {
            provider: provider.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Get a single short line suitable for display in the launcher result list.
    /// Raw provider payloads and stack traces never reach the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SkycastError::LocationUnresolvable { .. } => "Location failed".to_string(),
            SkycastError::ProviderUnavailable { .. } => "Weather request failed".to_string(),
            SkycastError::CredentialMissing { .. } => {
                "Provider needs an API key. Check your settings.".to_string()
            }
            SkycastError::InvalidConfiguration { message } => {
                format!("Configuration problem: {message}")
            }
            SkycastError::Cache { .. } => "Cache operation failed".to_string(),
            SkycastError::Io { .. } => "File operation failed".to_string(),
        }
    }
}
