use std::num::NonZeroUsize;

/// Lifecycle phases of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// No run in progress.
    Idle,
    /// A run is consuming ticks.
    Running,
    /// The stopping rule fired. Terminal until an explicit reset.
    Converged,
    /// The round ceiling was reached first. Terminal until an explicit
    /// reset; not an error.
    MaxedOut,
}

impl RunPhase {
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, RunPhase::Running)
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Converged | RunPhase::MaxedOut)
    }
}

/// Scheduler bookkeeping for one training run: phase, rounds consumed,
/// the round ceiling, and the best (lowest) metric seen so far.
///
/// The owning session is the only writer of the round counter, and
/// `rounds` never exceeds the ceiling.
#[derive(Debug, Clone)]
pub struct TrainRun {
    phase: RunPhase,
    rounds: usize,
    max_rounds: usize,
    best: Option<f64>,
}

impl TrainRun {
    pub fn new(max_rounds: NonZeroUsize) -> Self {
        Self {
            phase: RunPhase::Idle,
            rounds: 0,
            max_rounds: max_rounds.get(),
            best: None,
        }
    }

    #[inline]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    #[inline]
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    #[inline]
    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    #[inline]
    pub fn best(&self) -> Option<f64> {
        self.best
    }

    /// Starts a fresh run, discarding any previous progress.
    pub fn begin(&mut self) {
        self.phase = RunPhase::Running;
        self.rounds = 0;
        self.best = None;
    }

    /// Cooperative halt: a running run returns to idle with its progress
    /// still visible. Terminal phases stay terminal.
    pub fn halt(&mut self) {
        if self.phase == RunPhase::Running {
            self.phase = RunPhase::Idle;
        }
    }

    /// Back to a pristine idle run, as after loading new data.
    pub fn reset(&mut self) {
        self.phase = RunPhase::Idle;
        self.rounds = 0;
        self.best = None;
    }

    /// How many increments the next tick may perform: at most `want`,
    /// never past the ceiling, zero unless running.
    pub fn increments(&self, want: usize) -> usize {
        if self.phase != RunPhase::Running {
            return 0;
        }
        want.min(self.max_rounds - self.rounds)
    }

    /// Counts one completed increment.
    pub fn record_round(&mut self) {
        debug_assert!(self.rounds < self.max_rounds);
        self.rounds += 1;
    }

    /// Folds a freshly evaluated metric into the run and applies the
    /// stopping decision. Convergence wins over the ceiling, so a run
    /// converging on its final permitted round reports `Converged`.
    pub fn observe(&mut self, metric: f64, converged: bool) -> RunPhase {
        if self.best.map_or(true, |b| metric < b) {
            self.best = Some(metric);
        }

        if self.phase == RunPhase::Running {
            if converged {
                self.phase = RunPhase::Converged;
            } else if self.rounds >= self.max_rounds {
                self.phase = RunPhase::MaxedOut;
            }
        }

        self.phase
    }
}
