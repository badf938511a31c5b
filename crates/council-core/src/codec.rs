//! # De-anonymization Codec
//!
//! Restores model identity in peer-review text once review is over.
//!
//! Evaluators see answers under labels (`Response A`, `Response B`, ...).
//! Their raw output therefore talks about labels, and has to be rewritten
//! with the real model names before it is shown.
//!
//! ## Matching Rules
//!
//! - Every literal, non-overlapping occurrence of a label is replaced by
//!   the emphasized short name of its model: `**llama-3.3-70b**`.
//! - At any position the longest label wins, so `Response AA` is never
//!   read as `Response A` followed by a stray `A`.
//! - A label whose first or last character is a word character only
//!   matches when the neighbouring text character is not one. This keeps
//!   `Response A` from matching inside `Response AB` even when
//!   `Response AB` is not itself a label.
//!
//! Reversal is a pure function of its inputs. Running it on text that was
//! already reversed is allowed and never panics, though the result is not
//! meaningful.

use std::collections::BTreeMap;

use regex::{Captures, Regex};
use tracing::warn;

use crate::label::{short_name, LabelMap};
use crate::model::{MetricCard, PeerEvaluation};

/// Precompiled reverse mapping for one [`LabelMap`].
///
/// Build once per run and reuse it for every evaluation of that run.
#[derive(Debug, Clone, Default)]
pub struct AnonymizationCodec {
    /// Alternation of every label, longest first.
    pattern: Option<Regex>,
    /// Label to `**short**` replacement.
    replacements: BTreeMap<String, String>,
}

impl AnonymizationCodec {
    /// Builds a codec for the given label table.
    pub fn new(labels: &LabelMap) -> Self {
        let replacements: BTreeMap<String, String> = labels
            .iter()
            .filter(|(label, _)| !label.is_empty())
            .map(|(label, model)| (label.to_string(), format!("**{}**", short_name(model))))
            .collect();

        let mut ordered: Vec<&str> = replacements.keys().map(String::as_str).collect();
        ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let pattern = if ordered.is_empty() {
            None
        } else {
            let alternation = ordered
                .iter()
                .map(|label| label_pattern(label))
                .collect::<Vec<_>>()
                .join("|");
            match Regex::new(&alternation) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(
                        error = %e,
                        labels = ordered.len(),
                        "label pattern rejected, text left as-is"
                    );
                    None
                }
            }
        };

        Self {
            pattern,
            replacements,
        }
    }

    /// Returns true if no labels are known.
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// Replaces every bounded label occurrence in `text`.
    pub fn reverse(&self, text: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };

        pattern
            .replace_all(text, |caps: &Captures<'_>| {
                let found = &caps[0];
                self.replacements
                    .get(found)
                    .cloned()
                    .unwrap_or_else(|| found.to_string())
            })
            .into_owned()
    }
}

/// Escaped label, with `\b` on each edge that is a word character.
///
/// Alternatives are tried in order, so callers list longer labels first.
fn label_pattern(label: &str) -> String {
    let mut pattern = String::new();
    if label.chars().next().is_some_and(is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern.push_str("(?:");
    pattern.push_str(&regex::escape(label));
    pattern.push(')');
    if label.chars().next_back().is_some_and(is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern
}

/// Replaces labels in `text` with emphasized short model names.
///
/// Returns `text` unchanged when `labels` is empty.
///
/// # Example
///
/// ```rust
/// use council_core::{reverse, LabelMap};
///
/// let labels: LabelMap = [("Response A", "org/modelA"), ("Response AA", "org/modelAA")]
///     .into_iter()
///     .collect();
///
/// assert_eq!(reverse("Response AA is biased", &labels), "**modelAA** is biased");
/// ```
pub fn reverse(text: &str, labels: &LabelMap) -> String {
    AnonymizationCodec::new(labels).reverse(text)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Stage-2 evaluation with identities restored, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealedEvaluation {
    /// Full identifier of the evaluator.
    pub evaluator: String,
    /// Metric cards keyed by the evaluated model's short name. Labels the
    /// map does not know are kept as-is.
    pub cards: BTreeMap<String, MetricCard>,
    /// Raw evaluator text with labels replaced.
    pub raw_response: String,
    /// Item-level failure reported by the backend, if any.
    pub error: Option<String>,
}

impl RevealedEvaluation {
    /// Short name of the evaluator, for tab titles.
    pub fn evaluator_short(&self) -> &str {
        short_name(&self.evaluator)
    }
}

impl AnonymizationCodec {
    /// Produces the display form of one evaluation.
    pub fn reveal(&self, evaluation: &PeerEvaluation, labels: &LabelMap) -> RevealedEvaluation {
        let cards = evaluation
            .evaluation
            .iter()
            .map(|(label, card)| {
                let target = labels.model_for(label).map_or(label.as_str(), short_name);
                (target.to_string(), card.clone())
            })
            .collect();

        RevealedEvaluation {
            evaluator: evaluation.model.clone(),
            cards,
            raw_response: self.reverse(&evaluation.raw_response),
            error: evaluation.error.clone(),
        }
    }
}
