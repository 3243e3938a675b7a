// Poll scheduler - owns the recurring auto-refresh timer
use crate::domain::dashboard::SchedulerState;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Emitted by the timer. `epoch` identifies the arming that produced it so
/// ticks from a cancelled timer can be recognised and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    pub epoch: u64,
}

/// At most one timer task is alive at any time. Every arming bumps the epoch.
#[derive(Debug)]
pub struct PollScheduler {
    period: Duration,
    state: SchedulerState,
    epoch: u64,
    timer: Option<JoinHandle<()>>,
}

impl PollScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            state: SchedulerState::Idle,
            epoch: 0,
            timer: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Whether a tick still belongs to the live timer.
    pub fn is_current(&self, tick: TimerTick) -> bool {
        self.state == SchedulerState::Scheduled && tick.epoch == self.epoch
    }

    #[cfg(test)]
    pub fn live_timers(&self) -> usize {
        self.timer.iter().filter(|timer| !timer.is_finished()).count()
    }

    /// `Idle`/`Stopped` -> `Scheduled`. The first tick fires immediately.
    /// Returns false, leaving the running timer alone, if already scheduled.
    pub fn enable(&mut self, ticks: &mpsc::Sender<TimerTick>) -> bool {
        if self.state == SchedulerState::Scheduled {
            return false;
        }
        self.arm(ticks);
        true
    }

    /// Replaces the live timer with a fresh one (immediate first tick).
    /// Does nothing unless scheduled.
    pub fn restart(&mut self, ticks: &mpsc::Sender<TimerTick>) -> bool {
        if self.state != SchedulerState::Scheduled {
            return false;
        }
        self.arm(ticks);
        true
    }

    /// `Scheduled` -> `Stopped`.
    pub fn disable(&mut self) -> bool {
        if self.state != SchedulerState::Scheduled {
            return false;
        }
        self.cancel();
        self.state = SchedulerState::Stopped;
        tracing::debug!(epoch = self.epoch, "auto-refresh timer stopped");
        true
    }

    pub fn shutdown(&mut self) {
        self.cancel();
        if self.state == SchedulerState::Scheduled {
            self.state = SchedulerState::Stopped;
        }
    }

    fn arm(&mut self, ticks: &mpsc::Sender<TimerTick>) {
        self.cancel();
        self.epoch += 1;
        self.state = SchedulerState::Scheduled;

        let tick = TimerTick { epoch: self.epoch };
        let period = self.period;
        let ticks = ticks.clone();
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if ticks.send(tick).await.is_err() {
                    break;
                }
            }
        }));
        tracing::debug!(
            epoch = self.epoch,
            period_ms = period.as_millis() as u64,
            "auto-refresh timer armed"
        );
    }

    fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
