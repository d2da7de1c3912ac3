//! Presentation seam for deletion runs.

use crate::error::ApiError;
use crate::orchestrator::{RunOutcome, RunPhase, RunState};
use crate::types::RecordType;

/// Everything a run shows to, or asks of, the operator.
pub trait Presenter: Send {
    /// Ask before anything destructive happens. `false` ends the run untouched.
    fn confirm(&mut self, record_type: RecordType) -> Result<bool, ApiError>;

    fn phase_changed(&mut self, record_type: RecordType, phase: RunPhase);

    /// Called after every completed batch.
    fn progress(&mut self, state: &RunState);

    fn finished(&mut self, outcome: &RunOutcome);

    /// Redraw from scratch once the run is over.
    fn refresh(&mut self);
}

/// Non-interactive presenter. Answers the prompt with a fixed value and keeps
/// what it was shown.
#[derive(Debug, Default)]
pub struct HeadlessPresenter {
    assume_yes: bool,
    pub confirmations: usize,
    pub phases: Vec<RunPhase>,
    pub snapshots: Vec<RunState>,
    pub messages: Vec<String>,
    pub refreshes: usize,
}

impl HeadlessPresenter {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            ..Default::default()
        }
    }

    /// Percentages reported so far, one per batch.
    pub fn percentages(&self) -> Vec<u64> {
        self.snapshots.iter().map(RunState::percentage).collect()
    }
}

impl Presenter for HeadlessPresenter {
    fn confirm(&mut self, _record_type: RecordType) -> Result<bool, ApiError> {
        self.confirmations += 1;
        Ok(self.assume_yes)
    }

    fn phase_changed(&mut self, _record_type: RecordType, phase: RunPhase) {
        self.phases.push(phase);
    }

    fn progress(&mut self, state: &RunState) {
        self.snapshots.push(state.clone());
    }

    fn finished(&mut self, outcome: &RunOutcome) {
        self.messages.push(outcome.message());
    }

    fn refresh(&mut self) {
        self.refreshes += 1;
    }
}
