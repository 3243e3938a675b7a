// HTTP request handlers for the operator surface
use crate::application::session::SessionError;
use crate::domain::dashboard::DashboardView;
use crate::domain::location::{Location, LocationId};
use crate::presentation::app_state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct AutoRefreshBody {
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct LocationBody {
    pub id: String,
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match self {
            SessionError::UnknownLocation(_) => StatusCode::NOT_FOUND,
            SessionError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, self.to_string()).into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current dashboard state, including the derived classification
pub async fn status(State(state): State<Arc<AppState>>) -> Json<DashboardView> {
    Json(state.session.view())
}

pub async fn list_locations(State(state): State<Arc<AppState>>) -> Json<Vec<Location>> {
    Json(state.session.view().locations)
}

/// Manual refresh; also the retry affordance after a failed fetch
pub async fn refresh(State(state): State<Arc<AppState>>) -> Result<StatusCode, SessionError> {
    state.session.refresh().await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn set_auto_refresh(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AutoRefreshBody>,
) -> Result<StatusCode, SessionError> {
    state.session.set_auto_refresh(body.enabled).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn select_location(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LocationBody>,
) -> Result<StatusCode, SessionError> {
    state
        .session
        .select_location(LocationId::new(body.id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reload_locations(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, SessionError> {
    state.session.reload_locations().await?;
    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::prediction_client::ServiceVariant;
    use crate::application::session::{DashboardSession, SessionSettings};
    use crate::domain::dashboard::SchedulerState;
    use crate::domain::risk::RiskLevel;
    use crate::test_support::{coastal_catalogue, snapshot, PendingFetch, ScriptedClient};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn app_state(auto_refresh: bool) -> (Arc<AppState>, UnboundedReceiver<PendingFetch>) {
        let (client, calls) =
            ScriptedClient::new(ServiceVariant::MultiLocation, Ok(coastal_catalogue()));
        let settings = SessionSettings {
            refresh_interval: Duration::from_secs(30),
            auto_refresh,
            default_location: Some(LocationId::new("new_york")),
        };
        let (session, _task) = DashboardSession::spawn(client, settings);
        (Arc::new(AppState { session }), calls)
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_reports_snapshot_and_classification() {
        let (state, mut calls) = app_state(true);
        let call = calls.recv().await.unwrap();
        assert_eq!(call.location, Some(LocationId::new("new_york")));

        let mut fresh = snapshot(4.0);
        fresh.alert = Some("ALERT: Potential flood risk detected.".to_string());
        call.succeed(fresh);
        state
            .session
            .subscribe()
            .wait_for(|v| v.snapshot.is_some())
            .await
            .unwrap();

        let Json(view) = status(State(state.clone())).await;
        assert_eq!(view.classification.map(|c| c.level), Some(RiskLevel::High));
        assert!(view.alert_active);
        assert_eq!(view.scheduler, SchedulerState::Scheduled);

        let body = serde_json::to_value(&view).unwrap();
        assert_eq!(body["classification"]["level"], "HIGH");
        assert_eq!(body["classification"]["color"], "red");
        assert_eq!(body["anomaly"], "NORMAL");
        assert_eq!(body["refresh_interval_ms"], 30000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_control_endpoints() {
        let (state, mut calls) = app_state(false);
        calls.recv().await.unwrap();

        assert_eq!(refresh(State(state.clone())).await.unwrap(), StatusCode::ACCEPTED);
        calls.recv().await.unwrap();

        let result = select_location(
            State(state.clone()),
            Json(LocationBody {
                id: "miami".to_string(),
            }),
        )
        .await;
        assert_eq!(result.unwrap(), StatusCode::NO_CONTENT);
        assert_eq!(calls.recv().await.unwrap().location, Some(LocationId::new("miami")));

        let status = set_auto_refresh(
            State(state.clone()),
            Json(AutoRefreshBody { enabled: true }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.session.view().auto_refresh);

        let Json(locations) = list_locations(State(state.clone())).await;
        assert_eq!(locations.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_statuses() {
        let (state, mut calls) = app_state(false);
        calls.recv().await.unwrap();

        let err = select_location(
            State(state.clone()),
            Json(LocationBody {
                id: "atlantis".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        state.session.shutdown().await.unwrap();
        let err = refresh(State(state.clone())).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, "ok");
    }
}
