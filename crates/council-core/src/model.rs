//! Data model shared by the three evaluation stages.
//!
//! These types are the wire shapes exchanged with the evaluation backend.
//! Field names match the backend's JSON exactly, so the types serialize
//! without any renaming layer.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One council member's answer to the question (stage 1).
///
/// Exactly one of `response` / `error` is meaningful. An `error` is an
/// item-level failure: it never fails the stage, it is carried as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Model identifier, e.g. `meta-llama/llama-3.3-70b-instruct`.
    pub model: String,
    /// The answer text, when the member answered.
    #[serde(default)]
    pub response: Option<String>,
    /// Why the member failed to answer, when it failed.
    #[serde(default)]
    pub error: Option<String>,
}

/// Borrowed view of a member's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus<'a> {
    /// The member produced an answer.
    Answered(&'a str),
    /// The member reported an error.
    Failed(&'a str),
    /// Neither an answer nor an error was reported.
    Empty,
}

impl ModelResponse {
    /// Creates a successful response.
    pub fn answered(model: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            response: Some(response.into()),
            error: None,
        }
    }

    /// Creates an errored response.
    pub fn failed(model: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            response: None,
            error: Some(error.into()),
        }
    }

    /// Returns the member's outcome. An error takes precedence over text.
    pub fn status(&self) -> ItemStatus<'_> {
        match (&self.error, &self.response) {
            (Some(err), _) if !err.is_empty() => ItemStatus::Failed(err),
            (_, Some(text)) if !text.is_empty() => ItemStatus::Answered(text),
            _ => ItemStatus::Empty,
        }
    }

    /// Returns true if this member errored.
    pub fn is_error(&self) -> bool {
        matches!(self.status(), ItemStatus::Failed(_))
    }

    /// Returns true if this member can take part in peer review.
    pub fn is_usable(&self) -> bool {
        matches!(self.status(), ItemStatus::Answered(_))
    }
}

/// The judged dimensions of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// 0 = safe, 10 = toxic.
    Toxicity,
    /// 0 = neutral, 10 = biased.
    Bias,
    /// 0 = factual, 10 = hallucinated.
    Hallucination,
    /// 0 = neutral, 5 = moderate, 10 = extreme.
    PoliticalLeaning,
}

impl Metric {
    /// All metrics, in scoreboard column order.
    pub const ALL: [Metric; 4] = [
        Metric::Toxicity,
        Metric::Bias,
        Metric::Hallucination,
        Metric::PoliticalLeaning,
    ];

    /// The key used for this metric in evaluation payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Toxicity => "toxicity",
            Metric::Bias => "bias",
            Metric::Hallucination => "hallucination",
            Metric::PoliticalLeaning => "political_leaning",
        }
    }

    /// Human-readable column title.
    pub fn title(self) -> &'static str {
        match self {
            Metric::Toxicity => "Toxicity",
            Metric::Bias => "Bias",
            Metric::Hallucination => "Hallucination",
            Metric::PoliticalLeaning => "Political",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowest score a metric may take.
pub const MIN_SCORE: f64 = 0.0;

/// Highest score a metric may take.
pub const MAX_SCORE: f64 = 10.0;

/// A judgment on one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    /// Score in `[0, 10]`; lower is better.
    pub score: f64,
    /// The evaluator's short justification.
    #[serde(default)]
    pub reasoning: String,
}

impl MetricScore {
    /// Creates a metric score.
    pub fn new(score: f64, reasoning: impl Into<String>) -> Self {
        Self {
            score,
            reasoning: reasoning.into(),
        }
    }

    /// Returns true if the score is finite and within `[0, 10]`.
    pub fn in_range(&self) -> bool {
        self.score.is_finite() && (MIN_SCORE..=MAX_SCORE).contains(&self.score)
    }
}

/// Metric name to score, for one evaluated response.
pub type MetricCard = BTreeMap<String, MetricScore>;

/// One council member's judgments of the other members' answers (stage 2).
///
/// `evaluation` is keyed by anonymized label, never by model identifier.
/// `raw_response` is the evaluator's unedited output and may embed labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerEvaluation {
    /// The evaluating member.
    pub model: String,
    /// Label to metric card.
    #[serde(default)]
    pub evaluation: BTreeMap<String, MetricCard>,
    /// The evaluator's raw text.
    #[serde(default)]
    pub raw_response: String,
    /// Set when the backend could not interpret this evaluator's judgment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PeerEvaluation {
    /// Creates an evaluation with no judgments yet.
    pub fn new(model: impl Into<String>, raw_response: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            evaluation: BTreeMap::new(),
            raw_response: raw_response.into(),
            error: None,
        }
    }

    /// Adds a judgment of `label` on `metric`.
    pub fn with_score(
        mut self,
        label: impl Into<String>,
        metric: Metric,
        score: MetricScore,
    ) -> Self {
        self.evaluation
            .entry(label.into())
            .or_default()
            .insert(metric.as_str().to_string(), score);
        self
    }

    /// Marks this evaluation as an item-level failure.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Returns the score given to `label` on `metric`, if any.
    pub fn score(&self, label: &str, metric: Metric) -> Option<f64> {
        self.evaluation
            .get(label)
            .and_then(|card| card.get(metric.as_str()))
            .map(|s| s.score)
    }
}

/// Per-metric averages for one model.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricScores {
    pub toxicity: f64,
    pub bias: f64,
    pub hallucination: f64,
    pub political_leaning: f64,
}

impl MetricScores {
    /// Returns the value for `metric`.
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Toxicity => self.toxicity,
            Metric::Bias => self.bias,
            Metric::Hallucination => self.hallucination,
            Metric::PoliticalLeaning => self.political_leaning,
        }
    }

    /// Sets the value for `metric`.
    pub fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::Toxicity => self.toxicity = value,
            Metric::Bias => self.bias = value,
            Metric::Hallucination => self.hallucination = value,
            Metric::PoliticalLeaning => self.political_leaning = value,
        }
    }
}

/// One row of the final scoreboard (stage 3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreboardEntry {
    /// Real model identifier, never a label.
    pub model: String,
    /// Mean across the four metrics; lower is better.
    pub average_score: f64,
    /// Per-metric means.
    pub scores: MetricScores,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_response_status() {
        let ok = ModelResponse::answered("org/a", "yes");
        assert_eq!(ok.status(), ItemStatus::Answered("yes"));
        assert!(ok.is_usable());
        assert!(!ok.is_error());

        let failed = ModelResponse::failed("org/b", "rate limited");
        assert_eq!(failed.status(), ItemStatus::Failed("rate limited"));
        assert!(failed.is_error());
        assert!(!failed.is_usable());
    }

    #[test]
    fn test_model_response_empty_status() {
        let empty = ModelResponse {
            model: "org/c".to_string(),
            response: Some(String::new()),
            error: None,
        };
        assert_eq!(empty.status(), ItemStatus::Empty);
        assert!(!empty.is_usable());
    }

    #[test]
    fn test_model_response_wire_shape() {
        let json = serde_json::to_value(ModelResponse::answered("org/a", "hi")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model": "org/a", "response": "hi", "error": null})
        );
    }

    #[test]
    fn test_model_response_missing_fields_default() {
        let parsed: ModelResponse = serde_json::from_str(r#"{"model": "org/a"}"#).unwrap();
        assert_eq!(parsed.response, None);
        assert_eq!(parsed.error, None);
    }

    #[test]
    fn test_metric_names() {
        let names: Vec<&str> = Metric::ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(
            names,
            vec!["toxicity", "bias", "hallucination", "political_leaning"]
        );
        assert_eq!(
            serde_json::to_string(&Metric::PoliticalLeaning).unwrap(),
            "\"political_leaning\""
        );
    }

    #[test]
    fn test_metric_score_range() {
        assert!(MetricScore::new(0.0, "").in_range());
        assert!(MetricScore::new(10.0, "").in_range());
        assert!(!MetricScore::new(10.5, "").in_range());
        assert!(!MetricScore::new(-1.0, "").in_range());
        assert!(!MetricScore::new(f64::NAN, "").in_range());
    }

    #[test]
    fn test_peer_evaluation_builder() {
        let eval = PeerEvaluation::new("org/a", "raw")
            .with_score("Response B", Metric::Bias, MetricScore::new(3.0, "slight"));
        assert_eq!(eval.score("Response B", Metric::Bias), Some(3.0));
        assert_eq!(eval.score("Response B", Metric::Toxicity), None);
        assert_eq!(eval.score("Response C", Metric::Bias), None);
    }

    #[test]
    fn test_peer_evaluation_error_skipped_when_absent() {
        let json = serde_json::to_value(PeerEvaluation::new("org/a", "raw")).unwrap();
        assert!(json.get("error").is_none());

        let json =
            serde_json::to_value(PeerEvaluation::new("org/a", "raw").with_error("bad json"))
                .unwrap();
        assert_eq!(json["error"], "bad json");
    }

    #[test]
    fn test_peer_evaluation_parses_backend_payload() {
        let parsed: PeerEvaluation = serde_json::from_value(serde_json::json!({
            "model": "org/a",
            "raw_response": "Response B is fine",
            "evaluation": {
                "Response B": {
                    "toxicity": {"score": 1, "reasoning": "clean"},
                    "bias": {"score": 2}
                }
            }
        }))
        .unwrap();
        assert_eq!(parsed.score("Response B", Metric::Toxicity), Some(1.0));
        assert_eq!(parsed.evaluation["Response B"]["bias"].reasoning, "");
    }

    #[test]
    fn test_metric_scores_get_set() {
        let mut scores = MetricScores::default();
        scores.set(Metric::Hallucination, 4.5);
        assert_eq!(scores.get(Metric::Hallucination), 4.5);
        assert_eq!(scores.get(Metric::Bias), 0.0);
    }
}
