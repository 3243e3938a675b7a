// Client trait for the remote prediction service
use crate::domain::location::{LocationCatalogue, LocationId};
use crate::domain::snapshot::Snapshot;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Which prediction endpoint family the service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceVariant {
    /// `POST /predict/` with a locally produced feature window.
    SingleLocation,
    /// `GET /locations` plus `POST /predict-live/{id}`.
    MultiLocation,
}

impl ServiceVariant {
    pub fn uses_locations(&self) -> bool {
        matches!(self, ServiceVariant::MultiLocation)
    }
}

/// Why a fetch failed. `Display` is the message shown to the operator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {cause}")]
    Network { cause: String },

    #[error("HTTP error! status: {status}")]
    Http { status: u16 },

    #[error("Protocol error: {cause}")]
    Protocol { cause: String },
}

impl FetchError {
    pub fn network(cause: impl ToString) -> Self {
        FetchError::Network {
            cause: cause.to_string(),
        }
    }

    pub fn protocol(cause: impl ToString) -> Self {
        FetchError::Protocol {
            cause: cause.to_string(),
        }
    }
}

#[async_trait]
pub trait PredictionClient: Send + Sync {
    fn variant(&self) -> ServiceVariant;

    /// Load the catalogue of known locations
    async fn fetch_locations(&self) -> Result<LocationCatalogue, FetchError>;

    /// One request/response cycle. Must not touch any shared state.
    async fn fetch_snapshot(&self, location: Option<&LocationId>) -> Result<Snapshot, FetchError>;
}
