// Test doubles shared across module tests
use crate::application::prediction_client::{FetchError, PredictionClient, ServiceVariant};
use crate::domain::location::{Location, LocationCatalogue, LocationId};
use crate::domain::snapshot::{AnomalyFlag, FeatureStats, Snapshot};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

pub fn snapshot(forecast: f64) -> Snapshot {
    Snapshot {
        location: None,
        forecast,
        anomaly: AnomalyFlag::Normal,
        alert: None,
        risk_level_override: None,
        stats: FeatureStats::default(),
        weather: None,
        data_source: "Live API".to_string(),
        fetched_at: Utc::now(),
    }
}

pub fn coastal_catalogue() -> LocationCatalogue {
    LocationCatalogue::new(vec![
        Location::new(LocationId::new("new_york"), Some("New York City".to_string())),
        Location::new(LocationId::new("miami"), Some("Miami, FL".to_string())),
        Location::new(LocationId::new("boston"), Some("Boston, MA".to_string())),
    ])
}

/// A fetch the client is blocked on until the test answers it.
pub struct PendingFetch {
    pub location: Option<LocationId>,
    respond: oneshot::Sender<Result<Snapshot, FetchError>>,
}

impl PendingFetch {
    pub fn succeed(self, snapshot: Snapshot) {
        let _ = self.respond.send(Ok(snapshot));
    }

    pub fn fail(self, error: FetchError) {
        let _ = self.respond.send(Err(error));
    }
}

/// Every `fetch_snapshot` call is handed to the test as a [`PendingFetch`],
/// so the test decides when and in which order fetches complete.
pub struct ScriptedClient {
    variant: ServiceVariant,
    catalogue: Mutex<Result<LocationCatalogue, FetchError>>,
    catalogue_delay: Mutex<Duration>,
    calls: mpsc::UnboundedSender<PendingFetch>,
}

impl ScriptedClient {
    pub fn new(
        variant: ServiceVariant,
        catalogue: Result<LocationCatalogue, FetchError>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<PendingFetch>) {
        let (calls, calls_rx) = mpsc::unbounded_channel();
        let client = Arc::new(Self {
            variant,
            catalogue: Mutex::new(catalogue),
            catalogue_delay: Mutex::new(Duration::ZERO),
            calls,
        });
        (client, calls_rx)
    }

    pub fn set_catalogue(&self, catalogue: Result<LocationCatalogue, FetchError>) {
        *self.catalogue.lock().unwrap() = catalogue;
    }

    /// Later catalogue loads take `delay` before answering. The answer is
    /// the catalogue set when the load started.
    pub fn set_catalogue_delay(&self, delay: Duration) {
        *self.catalogue_delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl PredictionClient for ScriptedClient {
    fn variant(&self) -> ServiceVariant {
        self.variant
    }

    async fn fetch_locations(&self) -> Result<LocationCatalogue, FetchError> {
        let catalogue = self.catalogue.lock().unwrap().clone();
        let delay = *self.catalogue_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        catalogue
    }

    async fn fetch_snapshot(&self, location: Option<&LocationId>) -> Result<Snapshot, FetchError> {
        let (respond, response) = oneshot::channel();
        let pending = PendingFetch {
            location: location.cloned(),
            respond,
        };
        if self.calls.send(pending).is_err() {
            return Err(FetchError::network("test harness gone"));
        }
        response
            .await
            .unwrap_or_else(|_| Err(FetchError::network("request dropped")))
    }
}
