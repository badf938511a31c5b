//! The seam between the orchestrator and the evaluation backend.

use async_trait::async_trait;
use council_core::{
    Stage1Request, Stage1Response, Stage2Request, Stage2Response, Stage3Request, Stage3Response,
};

use crate::error::StageError;

/// One request/response round trip per stage.
///
/// Implementations own no run state. Each call either resolves with a
/// decoded payload or fails with a [`StageError`] naming its stage; the
/// orchestrator validates payloads and never retries.
#[async_trait]
pub trait StageClient: Send + Sync {
    /// Stage 1: collect every member's answer.
    async fn collect(&self, request: &Stage1Request) -> Result<Stage1Response, StageError>;

    /// Stage 2: blind peer evaluation.
    async fn evaluate(&self, request: &Stage2Request) -> Result<Stage2Response, StageError>;

    /// Stage 3: final scoreboard.
    async fn scoreboard(&self, request: &Stage3Request) -> Result<Stage3Response, StageError>;
}
