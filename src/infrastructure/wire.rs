// Wire DTOs for the prediction service and their mapping to domain types
use crate::application::prediction_client::FetchError;
use crate::domain::features::FeatureWindow;
use crate::domain::location::{Location, LocationCatalogue, LocationId};
use crate::domain::risk::RiskLevel;
use crate::domain::snapshot::{AnomalyFlag, FeatureStats, Snapshot, WeatherContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SIMULATED_SOURCE_LABEL: &str = "Simulated sensor data";
pub const LIVE_SOURCE_LABEL: &str = "Live API";

#[derive(Debug, Serialize)]
pub struct PredictRequest<'a> {
    pub features: &'a [f64],
}

#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    pub forecast: f64,
    pub anomaly: f64,
    #[serde(default)]
    pub alert: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LivePredictResponse {
    pub forecast: f64,
    pub anomaly: f64,
    #[serde(default)]
    pub alert: Option<String>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub current_weather: Option<serde_json::Value>,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default)]
    pub average_feature: Option<f64>,
    #[serde(default)]
    pub min_feature: Option<f64>,
    #[serde(default)]
    pub max_feature: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct LocationEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "latitude")]
    pub lat: Option<f64>,
    #[serde(default, alias = "longitude")]
    pub lon: Option<f64>,
}

pub type LocationsResponse = BTreeMap<String, LocationEntry>;

pub fn locations_to_catalogue(response: LocationsResponse) -> LocationCatalogue {
    LocationCatalogue::new(
        response
            .into_iter()
            .filter(|(id, _)| !id.trim().is_empty())
            .map(|(id, entry)| {
                Location::new(LocationId::new(id), entry.name)
                    .with_coordinates(entry.lat, entry.lon)
            }),
    )
}

pub fn predict_to_snapshot(
    response: PredictResponse,
    window: &FeatureWindow,
    fetched_at: DateTime<Utc>,
) -> Snapshot {
    Snapshot {
        location: None,
        forecast: response.forecast,
        anomaly: AnomalyFlag::from_raw(response.anomaly),
        alert: non_blank(response.alert),
        risk_level_override: None,
        stats: window.stats(),
        weather: None,
        data_source: SIMULATED_SOURCE_LABEL.to_string(),
        fetched_at,
    }
}

pub fn live_to_snapshot(
    response: LivePredictResponse,
    location: &LocationId,
    fetched_at: DateTime<Utc>,
) -> Result<Snapshot, FetchError> {
    let risk_level_override = non_blank(response.risk_level)
        .map(|level| level.parse::<RiskLevel>())
        .transpose()
        .map_err(FetchError::protocol)?;

    Ok(Snapshot {
        location: Some(location.clone()),
        forecast: response.forecast,
        anomaly: AnomalyFlag::from_raw(response.anomaly),
        alert: non_blank(response.alert),
        risk_level_override,
        stats: FeatureStats {
            average: response.average_feature,
            min: response.min_feature,
            max: response.max_feature,
        },
        weather: response.current_weather.as_ref().and_then(weather_from_value),
        data_source: non_blank(response.data_source)
            .unwrap_or_else(|| LIVE_SOURCE_LABEL.to_string()),
        fetched_at,
    })
}

/// `current_weather` is either a bare description or an object; anything
/// else, or an object with none of the known fields, is treated as absent.
fn weather_from_value(value: &serde_json::Value) -> Option<WeatherContext> {
    let weather = match value {
        serde_json::Value::String(description) => WeatherContext {
            description: non_blank(Some(description.clone())),
            ..WeatherContext::default()
        },
        serde_json::Value::Object(fields) => {
            let number = |keys: &[&str]| keys.iter().find_map(|k| fields.get(*k)?.as_f64());
            WeatherContext {
                description: ["description", "conditions", "summary"]
                    .iter()
                    .find_map(|k| fields.get(*k)?.as_str())
                    .and_then(|s| non_blank(Some(s.to_string()))),
                temperature_c: number(&["temperature", "temp"]),
                humidity_pct: number(&["humidity"]),
                pressure_hpa: number(&["pressure"]),
                wind_speed_ms: number(&["wind_speed", "wind"]),
            }
        }
        _ => return None,
    };
    (!weather.is_empty()).then_some(weather)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
