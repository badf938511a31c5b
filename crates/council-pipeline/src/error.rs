//! Error types for the evaluation pipeline.
//!
//! [`StageError`] describes why one stage failed and always names the
//! stage. [`PipelineError`] is what callers of the orchestrator see.

use council_core::{CoreError, Stage};
use thiserror::Error;

/// A fatal failure of one stage.
///
/// Both variants end the run. They differ only in where the failure was
/// detected, which matters when reading logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// The call could not complete or the backend answered non-success.
    #[error("{stage} failed: {reason}")]
    Transport {
        /// The failing stage.
        stage: Stage,
        /// What went wrong on the wire.
        reason: String,
    },

    /// The backend answered success with a payload that breaks the contract.
    #[error("{stage} returned an invalid payload: {reason}")]
    Validation {
        /// The failing stage.
        stage: Stage,
        /// Which invariant was broken.
        reason: String,
    },
}

impl StageError {
    /// Creates a transport error.
    pub fn transport(stage: Stage, reason: impl Into<String>) -> Self {
        Self::Transport {
            stage,
            reason: reason.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(stage: Stage, reason: impl Into<String>) -> Self {
        Self::Validation {
            stage,
            reason: reason.into(),
        }
    }

    /// Wraps a core validation failure.
    pub fn from_core(stage: Stage, err: CoreError) -> Self {
        match err {
            CoreError::Validation(reason) => Self::validation(stage, reason),
            other => Self::validation(stage, other.to_string()),
        }
    }

    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Transport { stage, .. } | Self::Validation { stage, .. } => *stage,
        }
    }

    /// The failure description without the stage prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::Transport { reason, .. } | Self::Validation { reason, .. } => reason,
        }
    }

    /// Returns true for transport failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Errors returned by the orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The question was rejected before any stage ran.
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] CoreError),

    /// Another run is still in progress.
    #[error("A run is already in progress; cancel it before starting another")]
    RunInFlight,

    /// A stage failed and the run stopped.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// The run was cancelled before it finished.
    #[error("Run cancelled during {stage}")]
    Cancelled {
        /// The stage that was running or about to run.
        stage: Stage,
    },

    /// The driver task ended abnormally.
    #[error("Pipeline task failed: {0}")]
    Join(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display_names_stage() {
        let err = StageError::transport(Stage::Scoreboard, "connection refused");
        assert_eq!(err.to_string(), "stage 3 failed: connection refused");
        assert_eq!(err.stage(), Stage::Scoreboard);
        assert!(err.is_transport());
    }

    #[test]
    fn test_validation_display_names_stage() {
        let err = StageError::validation(Stage::Evaluate, "unmapped label 'Response C'");
        assert!(err.to_string().starts_with("stage 2 returned an invalid payload"));
        assert_eq!(err.reason(), "unmapped label 'Response C'");
        assert!(!err.is_transport());
    }

    #[test]
    fn test_from_core_keeps_reason() {
        let err = StageError::from_core(
            Stage::Collect,
            CoreError::Validation("empty model".to_string()),
        );
        assert_eq!(err, StageError::validation(Stage::Collect, "empty model"));
    }

    #[test]
    fn test_pipeline_error_from_stage() {
        let err: PipelineError = StageError::transport(Stage::Collect, "503").into();
        assert!(matches!(err, PipelineError::Stage(_)));
        assert_eq!(err.to_string(), "stage 1 failed: 503");
    }

    #[test]
    fn test_pipeline_error_from_core() {
        let err: PipelineError = CoreError::EmptyQuery.into();
        assert!(matches!(err, PipelineError::InvalidQuery(CoreError::EmptyQuery)));
    }

    #[test]
    fn test_cancelled_display() {
        let err = PipelineError::Cancelled {
            stage: Stage::Evaluate,
        };
        assert!(err.to_string().contains("stage 2"));
    }
}
