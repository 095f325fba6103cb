//! Debounce state machine.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No timer armed, nothing pending.
    Idle,
    /// Waiting for the quiet period to end.
    Armed { deadline: Instant },
    /// Processing slices until everything is written out.
    Draining,
}

/// Debounce timer plus drain bookkeeping.
///
/// Time is always passed in, so the state machine can be driven by a real
/// event loop or stepped by hand.
#[derive(Debug)]
pub struct Scheduler {
    state: SchedulerState,
    debounce: Duration,
    passes: u64,
}

impl Scheduler {
    /// Create an idle scheduler.
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: SchedulerState::Idle,
            debounce,
            passes: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Number of draining passes started so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Deadline of the armed timer.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::Armed { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Check if a draining pass is in progress.
    pub fn is_draining(&self) -> bool {
        self.state == SchedulerState::Draining
    }

    /// (Re)start the quiet period after new work arrived.
    ///
    /// A running pass picks the new work up on its own, so arming while
    /// draining does nothing.
    pub fn arm(&mut self, now: Instant) {
        match self.state {
            SchedulerState::Draining => {}
            SchedulerState::Idle => {
                self.state = SchedulerState::Armed {
                    deadline: now + self.debounce,
                };
                debug!(target: "collect", "collection manager timer started");
            }
            SchedulerState::Armed { .. } => {
                self.state = SchedulerState::Armed {
                    deadline: now + self.debounce,
                };
            }
        }
    }

    /// Fire the timer if its deadline has passed.
    ///
    /// Returns `true` when a draining pass starts.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            SchedulerState::Armed { deadline } if now >= deadline => {
                debug!(target: "collect", "collection manager timer expired");
                self.begin_drain();
                true
            }
            _ => false,
        }
    }

    /// Disarm the timer without draining.
    pub fn cancel(&mut self) {
        if let SchedulerState::Armed { .. } = self.state {
            self.state = SchedulerState::Idle;
        }
    }

    /// Enter the draining state directly.
    pub fn begin_drain(&mut self) {
        if self.state != SchedulerState::Draining {
            self.state = SchedulerState::Draining;
            self.passes += 1;
        }
    }

    /// Return to idle once all work is done.
    pub fn finish(&mut self) {
        self.state = SchedulerState::Idle;
    }
}
