// HTTP implementation of the prediction client
use crate::application::prediction_client::{FetchError, PredictionClient, ServiceVariant};
use crate::domain::features::FeatureWindow;
use crate::domain::location::{LocationCatalogue, LocationId};
use crate::domain::snapshot::Snapshot;
use crate::infrastructure::wire::{
    live_to_snapshot, locations_to_catalogue, predict_to_snapshot, LivePredictResponse,
    LocationsResponse, PredictRequest, PredictResponse,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    client: reqwest::Client,
    base_url: String,
    variant: ServiceVariant,
}

impl HttpPredictionClient {
    pub fn new(
        base_url: &str,
        variant: ServiceVariant,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            variant,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the request and decodes a 2xx JSON body. Any other status is a
    /// failure whatever the body says.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, FetchError> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(FetchError::network)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(
                url = %response.url(),
                %status,
                "prediction service returned an error status"
            );
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(FetchError::network)?;
        serde_json::from_str(&body).map_err(FetchError::protocol)
    }

    async fn predict_simulated(&self) -> Result<Snapshot, FetchError> {
        let window = FeatureWindow::synthetic(Utc::now());
        let request = self
            .client
            .post(self.url("/predict/"))
            .json(&PredictRequest {
                features: window.values(),
            });
        let response: PredictResponse = self.execute(request).await?;
        Ok(predict_to_snapshot(response, &window, Utc::now()))
    }

    async fn predict_live(&self, location: Option<&LocationId>) -> Result<Snapshot, FetchError> {
        let location = location
            .filter(|id| !id.is_blank())
            .ok_or_else(|| FetchError::Configuration("no location selected".to_string()))?;

        let path = format!("/predict-live/{}", urlencoding::encode(location.as_str()));
        let request = self.client.post(self.url(&path));
        let response: LivePredictResponse = self.execute(request).await?;
        live_to_snapshot(response, location, Utc::now())
    }
}

#[async_trait]
impl PredictionClient for HttpPredictionClient {
    fn variant(&self) -> ServiceVariant {
        self.variant
    }

    async fn fetch_locations(&self) -> Result<LocationCatalogue, FetchError> {
        if !self.variant.uses_locations() {
            return Ok(LocationCatalogue::default());
        }
        let request = self.client.get(self.url("/locations"));
        let response: LocationsResponse = self.execute(request).await?;
        Ok(locations_to_catalogue(response))
    }

    async fn fetch_snapshot(&self, location: Option<&LocationId>) -> Result<Snapshot, FetchError> {
        match self.variant {
            ServiceVariant::SingleLocation => self.predict_simulated().await,
            ServiceVariant::MultiLocation => self.predict_live(location).await,
        }
    }
}
