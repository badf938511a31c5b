//! The aggregate state of one evaluation run.

use std::sync::Arc;

use council_core::{
    LabelMap, ModelResponse, PeerEvaluation, Query, RevealedEvaluation, ScoreboardEntry,
};

use crate::error::StageError;
use crate::state::PipelineState;

/// Everything one run has produced so far.
///
/// Only the orchestrator's driver task writes to a run. Consumers receive
/// complete copies through [`crate::PipelineOrchestrator::snapshot`] or a
/// watch subscription; stage results are behind `Arc`, so a copy is cheap
/// and a stage's data appears all at once.
#[derive(Debug, Clone, Default)]
pub struct PipelineRun {
    pub(crate) generation: u64,
    pub(crate) query: Option<Query>,
    pub(crate) state: PipelineState,
    pub(crate) stage1: Option<Arc<[ModelResponse]>>,
    pub(crate) labels: Option<Arc<LabelMap>>,
    pub(crate) stage2: Option<Arc<[PeerEvaluation]>>,
    pub(crate) revealed: Option<Arc<[RevealedEvaluation]>>,
    pub(crate) scoreboard: Option<Arc<[ScoreboardEntry]>>,
    pub(crate) error: Option<StageError>,
}

impl PipelineRun {
    /// The placeholder shown before any question is submitted.
    pub fn idle() -> Self {
        Self::default()
    }

    pub(crate) fn new(generation: u64, query: Query) -> Self {
        Self {
            generation,
            query: Some(query),
            ..Self::default()
        }
    }

    /// Monotonic run number within one orchestrator. `0` means no run yet.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The question this run answers.
    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    /// Current state.
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Stage 1 responses, in backend order, item errors included.
    pub fn stage1(&self) -> Option<&[ModelResponse]> {
        self.stage1.as_deref()
    }

    /// Label table produced by stage 2.
    pub fn labels(&self) -> Option<&LabelMap> {
        self.labels.as_deref()
    }

    /// Stage 2 evaluations exactly as the backend returned them.
    pub fn stage2(&self) -> Option<&[PeerEvaluation]> {
        self.stage2.as_deref()
    }

    /// Stage 2 evaluations with identities restored.
    pub fn revealed(&self) -> Option<&[RevealedEvaluation]> {
        self.revealed.as_deref()
    }

    /// Final scoreboard.
    pub fn scoreboard(&self) -> Option<&[ScoreboardEntry]> {
        self.scoreboard.as_deref()
    }

    /// The error that ended the run, if it failed.
    pub fn error(&self) -> Option<&StageError> {
        self.error.as_ref()
    }

    /// Returns true if the run finished all three stages.
    pub fn is_complete(&self) -> bool {
        self.state == PipelineState::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_run_is_empty() {
        let run = PipelineRun::idle();
        assert_eq!(run.generation(), 0);
        assert!(run.query().is_none());
        assert_eq!(run.state(), &PipelineState::Idle);
        assert!(run.stage1().is_none());
        assert!(run.scoreboard().is_none());
        assert!(!run.is_complete());
    }

    #[test]
    fn test_new_run_holds_query() {
        let run = PipelineRun::new(3, Query::new("why?").unwrap());
        assert_eq!(run.generation(), 3);
        assert_eq!(run.query().map(Query::as_str), Some("why?"));
    }

    #[test]
    fn test_clone_shares_stage_data() {
        let mut run = PipelineRun::new(1, Query::new("q").unwrap());
        run.stage1 = Some(Arc::from(vec![ModelResponse::answered("org/a", "x")]));

        let copy = run.clone();
        let (a, b) = (run.stage1.unwrap(), copy.stage1.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
    }
}
