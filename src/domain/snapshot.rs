// Prediction snapshot domain model
use super::location::LocationId;
use super::risk::RiskLevel;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Raw anomaly value the detector emits for an outlier.
pub const ANOMALY_SENTINEL: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyFlag {
    Detected,
    Normal,
}

impl AnomalyFlag {
    pub fn from_raw(value: f64) -> Self {
        if value == ANOMALY_SENTINEL {
            AnomalyFlag::Detected
        } else {
            AnomalyFlag::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyFlag::Detected => "DETECTED",
            AnomalyFlag::Normal => "NORMAL",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureStats {
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherContext {
    pub description: Option<String>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub wind_speed_ms: Option<f64>,
}

impl WeatherContext {
    pub fn is_empty(&self) -> bool {
        self == &WeatherContext::default()
    }
}

/// The latest successfully fetched prediction. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub location: Option<LocationId>,
    pub forecast: f64,
    pub anomaly: AnomalyFlag,
    pub alert: Option<String>,
    pub risk_level_override: Option<RiskLevel>,
    pub stats: FeatureStats,
    pub weather: Option<WeatherContext>,
    pub data_source: String,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn has_alert(&self) -> bool {
        self.alert.is_some()
    }
}
