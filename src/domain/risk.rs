// Risk classification - folds a snapshot into LOW, MEDIUM or HIGH

use super::snapshot::Snapshot;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const MEDIUM_FORECAST_THRESHOLD: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    pub fn color(&self) -> ColorToken {
        match self {
            RiskLevel::Low => ColorToken::Green,
            RiskLevel::Medium => ColorToken::Amber,
            RiskLevel::High => ColorToken::Red,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unrecognised risk level: {0:?}")]
pub struct UnknownRiskLevel(pub String);

impl FromStr for RiskLevel {
    type Err = UnknownRiskLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" | "moderate" => Ok(RiskLevel::Medium),
            "high" | "critical" => Ok(RiskLevel::High),
            _ => Err(UnknownRiskLevel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorToken {
    Green,
    Amber,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub level: RiskLevel,
    pub color: ColorToken,
}

impl From<RiskLevel> for Classification {
    fn from(level: RiskLevel) -> Self {
        Self {
            level,
            color: level.color(),
        }
    }
}

/// An active alert is always `High`, then a server-provided level is used
/// verbatim, then a forecast above [`MEDIUM_FORECAST_THRESHOLD`] is `Medium`.
/// The anomaly flag never changes the tier.
pub fn classify(snapshot: &Snapshot) -> Classification {
    let level = if snapshot.has_alert() {
        RiskLevel::High
    } else if let Some(level) = snapshot.risk_level_override {
        level
    } else if snapshot.forecast > MEDIUM_FORECAST_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    Classification::from(level)
}
