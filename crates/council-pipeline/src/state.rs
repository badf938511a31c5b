//! Run state machine and the events that report its transitions.
//!
//! ```text
//! Idle → Stage1Running → Stage1Done → Stage2Running → Stage2Done → Stage3Running → Complete
//!             │                            │                            │
//!             └──────────────┬─────────────┴──────────────┬─────────────┘
//!                            ▼                            ▼
//!                  Failed { stage, reason }       Cancelled { stage }
//! ```

use std::fmt;
use std::sync::Arc;

use council_core::{LabelMap, ModelResponse, RevealedEvaluation, ScoreboardEntry, Stage};

use crate::error::StageError;

/// Where a run currently is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// No run has started.
    #[default]
    Idle,
    Stage1Running,
    Stage1Done,
    Stage2Running,
    Stage2Done,
    Stage3Running,
    /// All three stages succeeded.
    Complete,
    /// A stage failed; earlier stages' results are kept.
    Failed {
        /// The failing stage.
        stage: Stage,
        /// Human-readable failure.
        reason: String,
    },
    /// The run was cancelled; earlier stages' results are kept.
    Cancelled {
        /// The stage that was running or about to run.
        stage: Stage,
    },
}

impl PipelineState {
    /// The running state for `stage`.
    pub fn running(stage: Stage) -> Self {
        match stage {
            Stage::Collect => Self::Stage1Running,
            Stage::Evaluate => Self::Stage2Running,
            Stage::Scoreboard => Self::Stage3Running,
        }
    }

    /// The state reached when `stage` succeeds.
    pub fn done(stage: Stage) -> Self {
        match stage {
            Stage::Collect => Self::Stage1Done,
            Stage::Evaluate => Self::Stage2Done,
            Stage::Scoreboard => Self::Complete,
        }
    }

    /// Returns true once the run can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }

    /// Returns true while a run is between start and a terminal state.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle) && !self.is_terminal()
    }

    /// The stage currently loading, if any.
    pub fn loading(&self) -> Option<Stage> {
        match self {
            Self::Stage1Running => Some(Stage::Collect),
            Self::Stage2Running => Some(Stage::Evaluate),
            Self::Stage3Running => Some(Stage::Scoreboard),
            _ => None,
        }
    }

    /// The stage named by a failure, if this is one.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Stage1Running => f.write_str("stage 1 running"),
            Self::Stage1Done => f.write_str("stage 1 done"),
            Self::Stage2Running => f.write_str("stage 2 running"),
            Self::Stage2Done => f.write_str("stage 2 done"),
            Self::Stage3Running => f.write_str("stage 3 running"),
            Self::Complete => f.write_str("complete"),
            Self::Failed { stage, reason } => write!(f, "{stage} failed: {reason}"),
            Self::Cancelled { stage } => write!(f, "cancelled during {stage}"),
        }
    }
}

/// Something observable happened to a run.
///
/// For every stage that starts, `StageStarted` and `StageFinished` are both
/// delivered exactly once, in stage order. Data events arrive between them.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The stage's request is being sent.
    StageStarted(Stage),

    /// The stage stopped loading, whether it succeeded or not.
    StageFinished(Stage),

    /// Stage 1 output, every member in backend order.
    Stage1Ready {
        responses: Arc<[ModelResponse]>,
    },

    /// Stage 2 output with identities restored for display.
    Stage2Ready {
        evaluations: Arc<[RevealedEvaluation]>,
        labels: Arc<LabelMap>,
    },

    /// The final scoreboard.
    Stage3Ready {
        scoreboard: Arc<[ScoreboardEntry]>,
    },

    /// The run failed. Sent after the failing stage's `StageFinished`.
    Failed { error: StageError },

    /// The run was cancelled.
    Cancelled { stage: Stage },
}

impl PipelineEvent {
    /// The state this event moves the run into, if it is a transition.
    pub fn state(&self) -> Option<PipelineState> {
        match self {
            Self::StageStarted(stage) => Some(PipelineState::running(*stage)),
            Self::StageFinished(_) => None,
            Self::Stage1Ready { .. } => Some(PipelineState::Stage1Done),
            Self::Stage2Ready { .. } => Some(PipelineState::Stage2Done),
            Self::Stage3Ready { .. } => Some(PipelineState::Complete),
            Self::Failed { error } => Some(PipelineState::Failed {
                stage: error.stage(),
                reason: error.reason().to_string(),
            }),
            Self::Cancelled { stage } => Some(PipelineState::Cancelled { stage: *stage }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_and_done_per_stage() {
        assert_eq!(PipelineState::running(Stage::Evaluate), PipelineState::Stage2Running);
        assert_eq!(PipelineState::done(Stage::Collect), PipelineState::Stage1Done);
        assert_eq!(PipelineState::done(Stage::Scoreboard), PipelineState::Complete);
    }

    #[test]
    fn test_terminal_and_active() {
        assert!(!PipelineState::Idle.is_terminal());
        assert!(!PipelineState::Idle.is_active());
        assert!(PipelineState::Stage2Done.is_active());
        assert!(PipelineState::Complete.is_terminal());
        assert!(PipelineState::Cancelled { stage: Stage::Collect }.is_terminal());

        let failed = PipelineState::Failed {
            stage: Stage::Scoreboard,
            reason: "boom".to_string(),
        };
        assert!(failed.is_terminal());
        assert!(!failed.is_active());
        assert_eq!(failed.failed_stage(), Some(Stage::Scoreboard));
    }

    #[test]
    fn test_loading() {
        assert_eq!(PipelineState::Stage3Running.loading(), Some(Stage::Scoreboard));
        assert_eq!(PipelineState::Stage3Running.failed_stage(), None);
        assert_eq!(PipelineState::Stage1Done.loading(), None);
    }

    #[test]
    fn test_event_state_mapping() {
        assert_eq!(
            PipelineEvent::StageStarted(Stage::Collect).state(),
            Some(PipelineState::Stage1Running)
        );
        assert_eq!(PipelineEvent::StageFinished(Stage::Collect).state(), None);

        let failed = PipelineEvent::Failed {
            error: StageError::transport(Stage::Evaluate, "503"),
        };
        assert_eq!(failed.state().and_then(|s| s.failed_stage()), Some(Stage::Evaluate));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PipelineState::Stage2Running.to_string(), "stage 2 running");
        let failed = PipelineState::Failed {
            stage: Stage::Collect,
            reason: "503".to_string(),
        };
        assert_eq!(failed.to_string(), "stage 1 failed: 503");
    }
}
