//! Anonymized evaluation labels.
//!
//! During peer review every usable answer is presented under an opaque
//! label such as `Response A`, so evaluators cannot favour a model by name.
//! [`LabelMap`] records which label stands for which model for one run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::ModelResponse;

/// Text placed before the letter code of every assigned label.
pub const LABEL_PREFIX: &str = "Response ";

/// Mapping from evaluation label to model identifier.
///
/// Labels are unique keys. Identifiers are unique in practice because each
/// council member answers once, so the reverse lookup is well defined.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelMap(BTreeMap<String, String>);

impl LabelMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns labels to the members that produced a usable answer.
    ///
    /// Members are labelled in order as `Response A` .. `Response Z`,
    /// then `Response AA`, `Response AB`, and so on. Errored or empty
    /// members receive no label and take no part in review.
    pub fn assign(responses: &[ModelResponse]) -> Self {
        let map = responses
            .iter()
            .filter(|r| r.is_usable())
            .enumerate()
            .map(|(i, r)| (format!("{LABEL_PREFIX}{}", letter_code(i)), r.model.clone()))
            .collect();
        Self(map)
    }

    /// Adds or replaces a mapping.
    pub fn insert(&mut self, label: impl Into<String>, model: impl Into<String>) {
        self.0.insert(label.into(), model.into());
    }

    /// Returns the model a label stands for.
    pub fn model_for(&self, label: &str) -> Option<&str> {
        self.0.get(label).map(String::as_str)
    }

    /// Returns the label assigned to a model.
    pub fn label_for(&self, model: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, m)| m.as_str() == model)
            .map(|(l, _)| l.as_str())
    }

    /// Returns true if `label` is mapped.
    pub fn contains_label(&self, label: &str) -> bool {
        self.0.contains_key(label)
    }

    /// Iterates `(label, model)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(l, m)| (l.as_str(), m.as_str()))
    }

    /// Number of mapped labels.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no labels are mapped.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<L: Into<String>, M: Into<String>> FromIterator<(L, M)> for LabelMap {
    fn from_iter<I: IntoIterator<Item = (L, M)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(l, m)| (l.into(), m.into())).collect())
    }
}

/// Short display form of a model identifier.
///
/// Namespaced identifiers (`org/model`) drop everything up to the first
/// `/`. Identifiers with no namespace, or nothing after it, are returned
/// whole.
pub fn short_name(identifier: &str) -> &str {
    match identifier.split_once('/') {
        Some((_, rest)) if !rest.is_empty() => rest,
        _ => identifier,
    }
}

/// Bijective base-26 letters: 0 -> A, 25 -> Z, 26 -> AA.
fn letter_code(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}
