//! Structural checks on stage payloads.
//!
//! A payload that decodes but breaks an invariant is rejected here with
//! [`CoreError::Validation`]. Item-level errors (`ModelResponse::error`,
//! `PeerEvaluation::error`) are data, not violations, and always pass.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::contract::{Stage1Response, Stage2Response, Stage3Response};
use crate::error::CoreError;
use crate::label::{LabelMap, LABEL_PREFIX};
use crate::model::{Metric, MetricScores, MAX_SCORE, MIN_SCORE};
use crate::Result;

/// Checks a stage 1 payload.
pub fn validate_stage1(payload: &Stage1Response) -> Result<()> {
    for (i, item) in payload.stage1.iter().enumerate() {
        if item.model.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "stage1[{i}] has an empty model identifier"
            )));
        }
    }
    Ok(())
}

/// Checks a stage 2 payload.
///
/// Every evaluation key must be present in `label_to_model`, and every
/// metric score must be a finite number in `[0, 10]`.
pub fn validate_stage2(payload: &Stage2Response) -> Result<()> {
    let labels = &payload.metadata.label_to_model;

    for (label, model) in labels.iter() {
        if model.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "label '{label}' maps to an empty model identifier"
            )));
        }
    }

    for (i, eval) in payload.stage2.iter().enumerate() {
        if eval.model.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "stage2[{i}] has an empty evaluator identifier"
            )));
        }

        for (label, card) in &eval.evaluation {
            if !labels.contains_label(label) {
                return Err(CoreError::Validation(format!(
                    "evaluation by '{}' references unmapped label '{label}'",
                    eval.model
                )));
            }

            for (metric, score) in card {
                if !score.in_range() {
                    return Err(CoreError::Validation(format!(
                        "evaluation by '{}' scores {label}/{metric} as {}, outside [{MIN_SCORE}, {MAX_SCORE}]",
                        eval.model, score.score
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Label-shaped tokens in raw evaluator text that the map does not cover.
///
/// Evaluators sometimes echo the placeholder from their instructions
/// (`Response X`), so these are reported rather than rejected.
pub fn unmapped_raw_labels(payload: &Stage2Response) -> Vec<String> {
    let labels = &payload.metadata.label_to_model;
    let mut found: Vec<String> = payload
        .stage2
        .iter()
        .flat_map(|eval| label_tokens(&eval.raw_response))
        .filter(|token| !labels.contains_label(token))
        .collect();
    found.sort();
    found.dedup();
    found
}

/// Finds `Response <CAPS>` tokens bounded by non-word characters.
fn label_tokens(text: &str) -> Vec<String> {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    let token = TOKEN.get_or_init(|| {
        Regex::new(&format!(r"\b{}[A-Z]+\b", regex::escape(LABEL_PREFIX)))
            .expect("label token pattern is valid")
    });

    token
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Checks a stage 3 payload and restores identity on any row that names a
/// label instead of a model.
pub fn validate_stage3(payload: &mut Stage3Response, labels: &LabelMap) -> Result<()> {
    for (i, entry) in payload.stage3.iter_mut().enumerate() {
        if entry.model.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "stage3[{i}] has an empty model identifier"
            )));
        }

        if let Some(model) = labels.model_for(&entry.model) {
            warn!(label = %entry.model, model, "scoreboard row named a label, restoring identity");
            entry.model = model.to_string();
        }

        if !score_ok(entry.average_score) {
            return Err(CoreError::Validation(format!(
                "average score {} for '{}' is outside [{MIN_SCORE}, {MAX_SCORE}]",
                entry.average_score, entry.model
            )));
        }

        check_metric_scores(&entry.model, &entry.scores)?;
    }
    Ok(())
}

fn check_metric_scores(model: &str, scores: &MetricScores) -> Result<()> {
    for metric in Metric::ALL {
        let value = scores.get(metric);
        if !score_ok(value) {
            return Err(CoreError::Validation(format!(
                "{metric} score {value} for '{model}' is outside [{MIN_SCORE}, {MAX_SCORE}]"
            )));
        }
    }
    Ok(())
}

fn score_ok(value: f64) -> bool {
    value.is_finite() && (MIN_SCORE..=MAX_SCORE).contains(&value)
}
