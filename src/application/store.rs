// Reconciliation store - applies only the result of the latest fetch

use super::prediction_client::FetchError;
use crate::domain::dashboard::RequestState;
use crate::domain::risk::{classify, Classification};
use crate::domain::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Discarded,
}

#[derive(Debug, Default)]
pub struct ReconciliationStore {
    snapshot: Option<Snapshot>,
    request: RequestState,
    latest_generation: u64,
}

impl ReconciliationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a fetch as in flight. The previous snapshot and error stay
    /// visible until the attempt resolves.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.latest_generation += 1;
        self.request.loading = true;
        FetchTicket {
            generation: self.latest_generation,
        }
    }

    pub fn apply_success(&mut self, ticket: FetchTicket, snapshot: Snapshot) -> ApplyOutcome {
        if !self.is_latest(ticket) {
            return ApplyOutcome::Discarded;
        }
        self.snapshot = Some(snapshot);
        self.request.last_error = None;
        self.request.loading = false;
        ApplyOutcome::Applied
    }

    pub fn apply_failure(&mut self, ticket: FetchTicket, error: &FetchError) -> ApplyOutcome {
        if !self.is_latest(ticket) {
            return ApplyOutcome::Discarded;
        }
        self.request.last_error = Some(error.to_string());
        self.request.loading = false;
        ApplyOutcome::Applied
    }

    pub fn apply(
        &mut self,
        ticket: FetchTicket,
        result: Result<Snapshot, FetchError>,
    ) -> ApplyOutcome {
        match result {
            Ok(snapshot) => self.apply_success(ticket, snapshot),
            Err(error) => self.apply_failure(ticket, &error),
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn request(&self) -> &RequestState {
        &self.request
    }

    /// Derived from the current snapshot on every call.
    pub fn classification(&self) -> Option<Classification> {
        self.snapshot.as_ref().map(classify)
    }

    fn is_latest(&self, ticket: FetchTicket) -> bool {
        ticket.generation == self.latest_generation
    }
}
