// Dashboard session - single task owning configuration, scheduler and store

use super::prediction_client::{FetchError, PredictionClient};
use super::scheduler::{PollScheduler, TimerTick};
use super::store::{ApplyOutcome, FetchTicket, ReconciliationStore};
use crate::domain::dashboard::{Configuration, DashboardView, SchedulerState};
use crate::domain::location::{LocationCatalogue, LocationId};
use crate::domain::snapshot::Snapshot;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};

const COMMAND_BUFFER: usize = 32;
const TICK_BUFFER: usize = 4;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub refresh_interval: Duration,
    pub auto_refresh: bool,
    pub default_location: Option<LocationId>,
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("unknown location: {0}")]
    UnknownLocation(LocationId),

    #[error("dashboard session has shut down")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchTrigger {
    Startup,
    Timer,
    Manual,
    LocationChange,
}

type FetchOutput = (FetchTicket, FetchTrigger, Result<Snapshot, FetchError>);
type CatalogueOutput = (u64, Result<LocationCatalogue, FetchError>);

enum Command {
    SelectLocation {
        id: LocationId,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    SetAutoRefresh {
        enabled: bool,
        reply: oneshot::Sender<()>,
    },
    Refresh {
        reply: oneshot::Sender<()>,
    },
    ReloadLocations {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cheap to clone; every clone talks to the same session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<DashboardView>,
}

impl SessionHandle {
    pub fn view(&self) -> DashboardView {
        self.view.borrow().clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.view.clone()
    }

    pub async fn select_location(&self, id: LocationId) -> Result<(), SessionError> {
        self.request(|reply| Command::SelectLocation { id, reply })
            .await?
    }

    pub async fn set_auto_refresh(&self, enabled: bool) -> Result<(), SessionError> {
        self.request(|reply| Command::SetAutoRefresh { enabled, reply })
            .await
    }

    /// Fetch now. Leaves the auto-refresh timer and its phase alone.
    pub async fn refresh(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Refresh { reply }).await
    }

    pub async fn reload_locations(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::ReloadLocations { reply })
            .await
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)
    }
}

pub struct DashboardSession {
    client: Arc<dyn PredictionClient>,
    configuration: Configuration,
    default_location: Option<LocationId>,
    catalogue: LocationCatalogue,
    awaiting_catalogue: bool,
    catalogue_generation: u64,
    scheduler: PollScheduler,
    store: ReconciliationStore,
    ticks_tx: mpsc::Sender<TimerTick>,
    ticks_rx: mpsc::Receiver<TimerTick>,
    fetches: JoinSet<FetchOutput>,
    catalogue_loads: JoinSet<CatalogueOutput>,
    view: watch::Sender<DashboardView>,
}

impl DashboardSession {
    /// Starts the session task. It runs until [`SessionHandle::shutdown`] is
    /// called or every handle has been dropped.
    pub fn spawn(
        client: Arc<dyn PredictionClient>,
        settings: SessionSettings,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (ticks_tx, ticks_rx) = mpsc::channel(TICK_BUFFER);

        let configuration = Configuration::new(settings.auto_refresh, settings.refresh_interval);
        let scheduler = PollScheduler::new(settings.refresh_interval);
        let store = ReconciliationStore::new();
        let initial_view = DashboardView::new(
            &configuration,
            scheduler.state(),
            store.request(),
            None,
            None,
            Vec::new(),
        );
        let (view_tx, view_rx) = watch::channel(initial_view);

        let session = Self {
            client,
            configuration,
            default_location: settings.default_location,
            catalogue: LocationCatalogue::default(),
            awaiting_catalogue: false,
            catalogue_generation: 0,
            scheduler,
            store,
            ticks_tx,
            ticks_rx,
            fetches: JoinSet::new(),
            catalogue_loads: JoinSet::new(),
            view: view_tx,
        };
        let task = tokio::spawn(session.run(commands_rx));

        let handle = SessionHandle {
            commands: commands_tx,
            view: view_rx,
        };
        (handle, task)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        self.start();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.teardown();
                        let _ = reply.send(());
                        return;
                    }
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(tick) = self.ticks_rx.recv() => self.on_tick(tick),
                Some(joined) = self.fetches.join_next() => match joined {
                    Ok((ticket, trigger, result)) => {
                        self.on_fetch_completed(ticket, trigger, result)
                    }
                    Err(error) => tracing::error!(%error, "fetch task failed"),
                },
                Some(joined) = self.catalogue_loads.join_next() => match joined {
                    Ok((generation, result)) => self.on_catalogue_loaded(generation, result),
                    // Superseded by a newer load.
                    Err(error) if error.is_cancelled() => {}
                    Err(error) => tracing::error!(%error, "location catalogue task failed"),
                },
            }
        }

        self.teardown();
    }

    fn start(&mut self) {
        if self.client.variant().uses_locations() {
            // Polling waits for the catalogue so the first fetch has a target.
            self.awaiting_catalogue = true;
            self.load_catalogue();
        } else {
            self.begin_polling(FetchTrigger::Startup);
        }
        self.publish();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SelectLocation { id, reply } => {
                let _ = reply.send(self.select_location(id));
            }
            Command::SetAutoRefresh { enabled, reply } => {
                self.set_auto_refresh(enabled);
                let _ = reply.send(());
            }
            Command::Refresh { reply } => {
                self.start_fetch(FetchTrigger::Manual);
                let _ = reply.send(());
            }
            Command::ReloadLocations { reply } => {
                self.load_catalogue();
                let _ = reply.send(());
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
        self.publish();
    }

    fn select_location(&mut self, id: LocationId) -> Result<(), SessionError> {
        if !self.catalogue.contains(&id) {
            return Err(SessionError::UnknownLocation(id));
        }
        if self.configuration.selected_location.as_ref() == Some(&id) {
            return Ok(());
        }
        tracing::info!(location = %id, "location selected");
        self.configuration.selected_location = Some(id);
        self.on_location_changed();
        Ok(())
    }

    fn set_auto_refresh(&mut self, enabled: bool) {
        self.configuration.auto_refresh = enabled;
        if enabled {
            if !self.awaiting_catalogue && self.scheduler.enable(&self.ticks_tx) {
                tracing::info!("auto-refresh enabled");
            }
        } else if self.scheduler.disable() {
            tracing::info!("auto-refresh disabled");
        }
    }

    /// Restarting the timer gives the new location its immediate fetch.
    /// Without auto-refresh a single fetch is issued instead.
    fn on_location_changed(&mut self) {
        match self.scheduler.state() {
            SchedulerState::Scheduled => {
                self.scheduler.restart(&self.ticks_tx);
            }
            SchedulerState::Idle | SchedulerState::Stopped => {
                self.begin_polling(FetchTrigger::LocationChange);
            }
        }
    }

    fn begin_polling(&mut self, trigger: FetchTrigger) {
        if self.configuration.auto_refresh {
            self.scheduler.enable(&self.ticks_tx);
        } else {
            self.start_fetch(trigger);
        }
    }

    fn on_tick(&mut self, tick: TimerTick) {
        if !self.scheduler.is_current(tick) {
            tracing::debug!(epoch = tick.epoch, "ignoring tick from cancelled timer");
            return;
        }
        self.start_fetch(FetchTrigger::Timer);
        self.publish();
    }

    fn start_fetch(&mut self, trigger: FetchTrigger) {
        let ticket = self.store.begin_fetch();
        let location = self.configuration.selected_location.clone();
        let client = Arc::clone(&self.client);

        tracing::debug!(
            generation = ticket.generation(),
            ?trigger,
            ?location,
            "fetch started"
        );

        self.fetches.spawn(async move {
            let result = client.fetch_snapshot(location.as_ref()).await;
            (ticket, trigger, result)
        });
    }

    fn on_fetch_completed(
        &mut self,
        ticket: FetchTicket,
        trigger: FetchTrigger,
        result: Result<Snapshot, FetchError>,
    ) {
        let generation = ticket.generation();
        let error = result.as_ref().err().cloned();
        match (self.store.apply(ticket, result), error) {
            (ApplyOutcome::Applied, None) => tracing::info!(
                generation,
                ?trigger,
                forecast = ?self.store.snapshot().map(|s| s.forecast),
                anomaly = ?self.store.snapshot().map(|s| s.anomaly.as_str()),
                level = ?self.store.classification().map(|c| c.level),
                "snapshot applied"
            ),
            (ApplyOutcome::Applied, Some(error)) => {
                tracing::warn!(generation, ?trigger, %error, "fetch failed")
            }
            (ApplyOutcome::Discarded, None) => {
                tracing::debug!(generation, ?trigger, "discarding superseded snapshot")
            }
            (ApplyOutcome::Discarded, Some(error)) => {
                tracing::debug!(generation, ?trigger, %error, "discarding superseded failure")
            }
        }
        self.publish();
    }

    fn load_catalogue(&mut self) {
        if !self.client.variant().uses_locations() {
            return;
        }
        // Only the most recent load may apply.
        self.catalogue_loads.abort_all();
        self.catalogue_generation += 1;
        let generation = self.catalogue_generation;
        let client = Arc::clone(&self.client);
        self.catalogue_loads
            .spawn(async move { (generation, client.fetch_locations().await) });
    }

    fn on_catalogue_loaded(
        &mut self,
        generation: u64,
        result: Result<LocationCatalogue, FetchError>,
    ) {
        if generation != self.catalogue_generation {
            tracing::debug!(generation, "discarding superseded location catalogue");
            return;
        }
        let first_load = self.awaiting_catalogue;
        self.awaiting_catalogue = false;

        match result {
            Ok(catalogue) => {
                if catalogue.is_empty() {
                    tracing::warn!("prediction service reported no locations");
                }
                tracing::info!(count = catalogue.len(), "location catalogue loaded");
                self.catalogue = catalogue;
            }
            Err(error) => {
                tracing::warn!(%error, "failed to load location catalogue");
                if !first_load {
                    self.publish();
                    return;
                }
            }
        }

        let still_valid = self
            .configuration
            .selected_location
            .as_ref()
            .is_some_and(|id| self.catalogue.contains(id));
        let previous = self.configuration.selected_location.clone();
        if !still_valid {
            self.configuration.selected_location =
                self.catalogue.default_selection(self.default_location.as_ref());
        }

        if first_load || self.configuration.selected_location != previous {
            if let Some(id) = &self.configuration.selected_location {
                tracing::info!(location = %id, "location selected");
            }
            self.on_location_changed();
        }
        self.publish();
    }

    fn teardown(&mut self) {
        self.scheduler.shutdown();
        self.fetches.abort_all();
        self.catalogue_loads.abort_all();
        self.publish();
        tracing::info!("dashboard session ended");
    }

    fn publish(&self) {
        let view = DashboardView::new(
            &self.configuration,
            self.scheduler.state(),
            self.store.request(),
            self.store.snapshot(),
            self.store.classification(),
            self.catalogue.iter().cloned().collect(),
        );
        self.view.send_replace(view);
    }
}
