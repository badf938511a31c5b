//! Scoreboard aggregation.
//!
//! Turns stage 2 judgments into one row per judged model:
//!
//! 1. Each judgment is attributed to the model behind its label. Labels
//!    missing from the map are ignored.
//! 2. Per metric, the scores a model received are averaged and rounded to
//!    one decimal. A metric nobody scored counts as 0.
//! 3. `average_score` is the sum of the metric means divided by the number
//!    of metrics, rounded to one decimal.
//! 4. Rows are sorted ascending: 0 is the best possible score.

use std::collections::BTreeMap;

use crate::label::LabelMap;
use crate::model::{Metric, MetricScores, PeerEvaluation, ScoreboardEntry};

/// Aggregates peer judgments into a scoreboard.
pub fn aggregate(evaluations: &[PeerEvaluation], labels: &LabelMap) -> Vec<ScoreboardEntry> {
    // model -> metric -> received scores
    let mut received: BTreeMap<&str, BTreeMap<Metric, Vec<f64>>> = BTreeMap::new();

    for eval in evaluations {
        for (label, card) in &eval.evaluation {
            let Some(target) = labels.model_for(label) else {
                continue;
            };
            let per_metric = received.entry(target).or_default();
            for metric in Metric::ALL {
                if let Some(score) = card.get(metric.as_str()) {
                    per_metric.entry(metric).or_default().push(score.score);
                }
            }
        }
    }

    let mut board: Vec<ScoreboardEntry> = received
        .into_iter()
        .map(|(model, per_metric)| {
            let mut scores = MetricScores::default();
            let mut total = 0.0;
            for metric in Metric::ALL {
                if let Some(values) = per_metric.get(&metric).filter(|v| !v.is_empty()) {
                    let mean = values.iter().sum::<f64>() / values.len() as f64;
                    scores.set(metric, round1(mean));
                    total += mean;
                }
            }
            ScoreboardEntry {
                model: model.to_string(),
                average_score: round1(total / Metric::ALL.len() as f64),
                scores,
            }
        })
        .collect();

    board.sort_by(|a, b| a.average_score.total_cmp(&b.average_score));
    board
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
