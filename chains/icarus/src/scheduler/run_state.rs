use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::utils::ActivityLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
    WaitingNextCycle,
}

impl SchedulerState {
    pub fn label(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "Idle",
            SchedulerState::Running => "Running",
            SchedulerState::Stopping => "Stopping",
            SchedulerState::WaitingNextCycle => "Waiting for next cycle",
        }
    }

    /// A cycle is active or scheduled.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SchedulerState::Running | SchedulerState::WaitingNextCycle
        )
    }
}

/// Point-in-time view for the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSnapshot {
    pub state: SchedulerState,
    pub activity_running: bool,
    pub cycle_running: bool,
    pub should_stop: bool,
    pub active_processes: usize,
}

struct Inner {
    state: SchedulerState,
    cancel: CancellationToken,
}

/// Coordination point between a stop request and in-flight work.
///
/// The state only returns to `Idle` after [`RunState::drain`] has observed
/// zero in-flight operations.
pub struct RunState {
    inner: Mutex<Inner>,
    in_flight: Arc<AtomicUsize>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: SchedulerState::Idle,
                cancel: CancellationToken::new(),
            }),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> SchedulerState {
        self.lock().state
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let inner = self.lock();
        RunSnapshot {
            state: inner.state,
            activity_running: inner.state == SchedulerState::Running,
            cycle_running: inner.state != SchedulerState::Idle,
            should_stop: inner.cancel.is_cancelled(),
            active_processes: self.in_flight(),
        }
    }

    /// Idle -> Running with a fresh token. Any other state is returned as the error.
    pub fn begin(&self) -> Result<CancellationToken, SchedulerState> {
        let mut inner = self.lock();
        if inner.state != SchedulerState::Idle {
            return Err(inner.state);
        }
        inner.state = SchedulerState::Running;
        inner.cancel = CancellationToken::new();
        Ok(inner.cancel.clone())
    }

    /// WaitingNextCycle -> Running. No-op once a stop was requested.
    pub fn resume(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            SchedulerState::Running => true,
            SchedulerState::WaitingNextCycle => {
                inner.state = SchedulerState::Running;
                true
            }
            _ => false,
        }
    }

    /// Running -> WaitingNextCycle. No-op once a stop was requested.
    pub fn park(&self) -> bool {
        let mut inner = self.lock();
        if inner.state == SchedulerState::Running {
            inner.state = SchedulerState::WaitingNextCycle;
            true
        } else {
            false
        }
    }

    /// Running/WaitingNextCycle -> Stopping and cancels the current token.
    pub fn request_stop(&self) -> bool {
        let mut inner = self.lock();
        if !inner.state.is_active() {
            return false;
        }
        inner.state = SchedulerState::Stopping;
        inner.cancel.cancel();
        true
    }

    pub fn token(&self) -> CancellationToken {
        self.lock().cancel.clone()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Counts one suspend-capable operation until the guard is dropped.
    pub fn track(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            counter: self.in_flight.clone(),
        }
    }

    /// Polls every `poll` until no operation is in flight, then Stopping -> Idle.
    pub async fn drain(&self, poll: Duration, log: &ActivityLog) {
        loop {
            let outstanding = self.in_flight();
            if outstanding == 0 {
                break;
            }
            log.info(format!(
                "Waiting for {} process to complete...",
                outstanding
            ));
            sleep(poll).await;
        }

        let mut inner = self.lock();
        if inner.state == SchedulerState::Stopping {
            inner.state = SchedulerState::Idle;
        }
    }
}

pub struct InFlightGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Sleeps for `duration` unless `cancel` fires first. Returns whether the full
/// duration elapsed. Counted as in flight while suspended.
pub async fn interruptible_sleep(
    state: &RunState,
    cancel: &CancellationToken,
    duration: Duration,
) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    let _guard = state.track();
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = sleep(duration) => true,
    }
}
