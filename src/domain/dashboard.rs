// Dashboard domain model - configuration, request state and the rendered view
use super::location::{Location, LocationId};
use super::risk::Classification;
use super::snapshot::{AnomalyFlag, Snapshot};
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Operator-adjustable inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub selected_location: Option<LocationId>,
    pub auto_refresh: bool,
    pub refresh_interval: Duration,
}

impl Configuration {
    pub fn new(auto_refresh: bool, refresh_interval: Duration) -> Self {
        Self {
            selected_location: None,
            auto_refresh,
            refresh_interval,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestState {
    pub loading: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Scheduled,
    Stopped,
}

/// Everything the presentation layer needs for one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub selected_location: Option<LocationId>,
    pub auto_refresh: bool,
    pub refresh_interval_ms: u64,
    pub scheduler: SchedulerState,
    pub loading: bool,
    pub last_error: Option<String>,
    pub snapshot: Option<Snapshot>,
    pub classification: Option<Classification>,
    pub anomaly: Option<AnomalyFlag>,
    pub alert_active: bool,
    pub locations: Vec<Location>,
}

impl DashboardView {
    pub fn new(
        configuration: &Configuration,
        scheduler: SchedulerState,
        request: &RequestState,
        snapshot: Option<&Snapshot>,
        classification: Option<Classification>,
        locations: Vec<Location>,
    ) -> Self {
        Self {
            selected_location: configuration.selected_location.clone(),
            auto_refresh: configuration.auto_refresh,
            refresh_interval_ms: configuration.refresh_interval.as_millis() as u64,
            scheduler,
            loading: request.loading,
            last_error: request.last_error.clone(),
            snapshot: snapshot.cloned(),
            classification,
            anomaly: snapshot.map(|s| s.anomaly),
            alert_active: snapshot.is_some_and(|s| s.has_alert()),
            locations,
        }
    }
}
