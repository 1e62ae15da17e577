//! Service configuration.
//!
//! Two connection strings (the event store and the read model may live in
//! different databases) plus the projector identity. Values should be
//! provided by the application; [`Config::from_env`] covers the common
//! deployment case.

use thiserror::Error;

/// Default projector identity; versioned so a rebuilt projection can run
/// under a fresh checkpoint.
pub const DEFAULT_PROJECTOR_NAME: &str = "account_balance_projector_v1";

/// Error loading configuration from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),
}

/// Connection strings and projector identity.
#[derive(Debug, Clone)]
pub struct Config {
    /// Connection string of the event store database.
    pub event_store_url: String,
    /// Connection string of the read model database.
    pub read_model_url: String,
    /// Stable identity the projector checkpoints under.
    pub projector_name: String,
}

impl Config {
    /// Create a configuration with the default projector name.
    #[must_use]
    pub fn new(event_store_url: impl Into<String>, read_model_url: impl Into<String>) -> Self {
        Self {
            event_store_url: event_store_url.into(),
            read_model_url: read_model_url.into(),
            projector_name: DEFAULT_PROJECTOR_NAME.to_owned(),
        }
    }

    /// Override the projector identity.
    #[must_use]
    pub fn with_projector_name(mut self, name: impl Into<String>) -> Self {
        self.projector_name = name.into();
        self
    }

    /// Read `EVENT_STORE_URL`, `READ_MODEL_URL`, and (optionally)
    /// `PROJECTOR_NAME` from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] when a required variable is
    /// absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        let event_store_url = std::env::var("EVENT_STORE_URL")
            .map_err(|_| ConfigError::MissingVar("EVENT_STORE_URL"))?;
        let read_model_url = std::env::var("READ_MODEL_URL")
            .map_err(|_| ConfigError::MissingVar("READ_MODEL_URL"))?;
        let projector_name =
            std::env::var("PROJECTOR_NAME").unwrap_or_else(|_| DEFAULT_PROJECTOR_NAME.to_owned());

        Ok(Self {
            event_store_url,
            read_model_url,
            projector_name,
        })
    }
}
