//! In-memory backend for tests and offline demos.
//!
//! [`ScriptedBackend`] behaves like the evaluation service: it answers with a
//! fixed council, labels usable answers the way the service does, and builds
//! the scoreboard with [`council_core::scoreboard::aggregate`]. Stages can be
//! scripted to fail or to stall, and every call is counted.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use council_core::scoreboard::aggregate;
use council_core::{
    LabelMap, Metric, MetricScore, MetricScores, ModelResponse, PeerEvaluation, Stage,
    Stage1Request, Stage1Response, Stage2Metadata, Stage2Request, Stage2Response, Stage3Request,
    Stage3Response,
};

use crate::client::StageClient;
use crate::error::StageError;

/// A scripted [`StageClient`].
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    members: Vec<ModelResponse>,
    scores: BTreeMap<String, MetricScores>,
    self_review: bool,
    label_scoreboard: bool,
    failures: BTreeMap<Stage, StageError>,
    delays: BTreeMap<Stage, Duration>,
    calls: [AtomicUsize; 3],
    last_stage2: Mutex<Option<Stage2Request>>,
    last_stage3: Mutex<Option<Stage3Request>>,
}

impl ScriptedBackend {
    /// A council whose stage 1 answers are `members`, in order.
    pub fn new(members: Vec<ModelResponse>) -> Self {
        Self {
            members,
            ..Self::default()
        }
    }

    /// A one-member council that reviews its own answer.
    pub fn single_member(model: &str) -> Self {
        Self::new(vec![ModelResponse::answered(model, format!("{model} answers."))])
            .with_self_review()
    }

    /// Scores every judge gives `model`. Unlisted models score 0.
    pub fn with_scores(mut self, model: &str, scores: MetricScores) -> Self {
        self.scores.insert(model.to_string(), scores);
        self
    }

    /// Lets members judge their own answer.
    pub fn with_self_review(mut self) -> Self {
        self.self_review = true;
        self
    }

    /// Makes stage 3 name models by label, as a misbehaving service might.
    pub fn with_labelled_scoreboard(mut self) -> Self {
        self.label_scoreboard = true;
        self
    }

    /// Makes `stage` fail with `error`.
    pub fn fail_stage(mut self, stage: Stage, error: StageError) -> Self {
        self.failures.insert(stage, error);
        self
    }

    /// Delays `stage` by `delay` before it answers.
    pub fn with_delay(mut self, stage: Stage, delay: Duration) -> Self {
        self.delays.insert(stage, delay);
        self
    }

    /// Number of calls made to `stage`.
    pub fn calls(&self, stage: Stage) -> usize {
        self.calls[slot(stage)].load(Ordering::SeqCst)
    }

    /// Number of calls made to any stage.
    pub fn total_calls(&self) -> usize {
        Stage::ALL.iter().map(|s| self.calls(*s)).sum()
    }

    /// The last stage 2 request received.
    pub fn last_stage2(&self) -> Option<Stage2Request> {
        self.last_stage2
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The last stage 3 request received.
    pub fn last_stage3(&self) -> Option<Stage3Request> {
        self.last_stage3
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn enter(&self, stage: Stage) -> Result<(), StageError> {
        self.calls[slot(stage)].fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&stage) {
            tokio::time::sleep(*delay).await;
        }
        match self.failures.get(&stage) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn judge(&self, evaluator: &str, labels: &LabelMap) -> PeerEvaluation {
        let mut lines = Vec::new();
        let mut evaluation = PeerEvaluation::new(evaluator, "");

        for (label, target) in labels.iter() {
            if target == evaluator && !self.self_review {
                continue;
            }
            let scores = self.scores.get(target).copied().unwrap_or_default();
            for metric in Metric::ALL {
                let score = scores.get(metric);
                evaluation = evaluation.with_score(
                    label,
                    metric,
                    MetricScore::new(score, format!("{label} rated {score} for {}", metric.title())),
                );
            }
            lines.push(format!("{label} is {}.", verdict(&scores)));
        }

        evaluation.raw_response = lines.join("\n");
        evaluation
    }
}

fn slot(stage: Stage) -> usize {
    usize::from(stage.index()) - 1
}

fn verdict(scores: &MetricScores) -> &'static str {
    let worst = Metric::ALL
        .iter()
        .map(|m| scores.get(*m))
        .fold(0.0_f64, f64::max);
    if worst <= 2.0 {
        "clean"
    } else {
        "questionable"
    }
}

#[async_trait]
impl StageClient for ScriptedBackend {
    async fn collect(&self, _request: &Stage1Request) -> Result<Stage1Response, StageError> {
        self.enter(Stage::Collect).await?;
        Ok(Stage1Response {
            stage1: self.members.clone(),
        })
    }

    async fn evaluate(&self, request: &Stage2Request) -> Result<Stage2Response, StageError> {
        *self
            .last_stage2
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request.clone());
        self.enter(Stage::Evaluate).await?;

        let labels = LabelMap::assign(&request.stage1_results);
        let stage2 = request
            .stage1_results
            .iter()
            .filter(|r| r.is_usable())
            .map(|r| self.judge(&r.model, &labels))
            .collect();

        Ok(Stage2Response {
            stage2,
            metadata: Stage2Metadata {
                label_to_model: labels,
            },
        })
    }

    async fn scoreboard(&self, request: &Stage3Request) -> Result<Stage3Response, StageError> {
        *self
            .last_stage3
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request.clone());
        self.enter(Stage::Scoreboard).await?;

        let mut stage3 = aggregate(&request.stage2_results, &request.label_to_model);
        if self.label_scoreboard {
            for row in &mut stage3 {
                if let Some(label) = request.label_to_model.label_for(&row.model) {
                    row.model = label.to_string();
                }
            }
        }
        Ok(Stage3Response { stage3 })
    }
}
