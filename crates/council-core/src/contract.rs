//! Request and response payloads of the three backend stages.
//!
//! | Stage | Endpoint | Request | Response |
//! |-------|----------|---------|----------|
//! | 1 | `/api/evaluate/stage1` | `question` | `stage1` |
//! | 2 | `/api/evaluate/stage2` | `question`, `stage1_results` | `stage2`, `metadata.label_to_model` |
//! | 3 | `/api/evaluate/stage3` | `stage2_results`, `label_to_model` | `stage3` |
//!
//! Field names are part of the wire format and must not be renamed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::label::LabelMap;
use crate::model::{ModelResponse, PeerEvaluation, ScoreboardEntry};

/// One of the three sequential phases of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Stage 1: every member answers the question.
    Collect,
    /// Stage 2: members blindly judge each other.
    Evaluate,
    /// Stage 3: judgments are aggregated into a scoreboard.
    Scoreboard,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 3] = [Stage::Collect, Stage::Evaluate, Stage::Scoreboard];

    /// One-based stage number.
    pub fn index(self) -> u8 {
        match self {
            Stage::Collect => 1,
            Stage::Evaluate => 2,
            Stage::Scoreboard => 3,
        }
    }

    /// Endpoint path relative to the backend base URL.
    pub fn path(self) -> &'static str {
        match self {
            Stage::Collect => "/api/evaluate/stage1",
            Stage::Evaluate => "/api/evaluate/stage2",
            Stage::Scoreboard => "/api/evaluate/stage3",
        }
    }

    /// What the stage is doing, for progress output.
    pub fn activity(self) -> &'static str {
        match self {
            Stage::Collect => "Gathering responses from council models",
            Stage::Evaluate => "Models are evaluating each other",
            Stage::Scoreboard => "Calculating final scores",
        }
    }

    /// The stage that runs after this one.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Collect => Some(Stage::Evaluate),
            Stage::Evaluate => Some(Stage::Scoreboard),
            Stage::Scoreboard => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {}", self.index())
    }
}

/// Stage 1 request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage1Request {
    pub question: String,
}

/// Stage 1 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage1Response {
    pub stage1: Vec<ModelResponse>,
}

/// Stage 2 request, built from the complete stage 1 output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage2Request {
    pub question: String,
    pub stage1_results: Vec<ModelResponse>,
}

/// Stage 2 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage2Response {
    pub stage2: Vec<PeerEvaluation>,
    pub metadata: Stage2Metadata,
}

/// Metadata attached to the stage 2 response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stage2Metadata {
    pub label_to_model: LabelMap,
}

/// Stage 3 request, built from the complete stage 2 output and its labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage3Request {
    pub stage2_results: Vec<PeerEvaluation>,
    pub label_to_model: LabelMap,
}

/// Stage 3 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage3Response {
    pub stage3: Vec<ScoreboardEntry>,
}

/// Backend health check body (`GET /`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: String,
}

impl HealthStatus {
    /// Returns true if the backend reported `ok`.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
