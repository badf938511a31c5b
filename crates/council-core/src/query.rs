//! The user question that starts a run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::Result;

/// A non-empty question submitted to the council.
///
/// The text is kept exactly as submitted; it is only checked for content.
/// Once a run has started the query is never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Query(String);

impl Query {
    /// Creates a query, rejecting empty or whitespace-only text.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(CoreError::EmptyQuery);
        }
        Ok(Self(text))
    }

    /// Returns the question text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Query {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Query> for String {
    fn from(query: Query) -> Self {
        query.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_accepts_text() {
        let query = Query::new("Is the sky blue?").unwrap();
        assert_eq!(query.as_str(), "Is the sky blue?");
    }

    #[test]
    fn test_query_keeps_surrounding_whitespace() {
        let query = Query::new("  why?\n").unwrap();
        assert_eq!(query.as_str(), "  why?\n");
    }

    #[test]
    fn test_query_rejects_empty() {
        assert!(matches!(Query::new(""), Err(CoreError::EmptyQuery)));
    }

    #[test]
    fn test_query_rejects_whitespace() {
        assert!(matches!(Query::new(" \t\n "), Err(CoreError::EmptyQuery)));
    }

    #[test]
    fn test_query_deserialization_validates() {
        let ok: std::result::Result<Query, _> = serde_json::from_str("\"hello\"");
        assert!(ok.is_ok());

        let bad: std::result::Result<Query, _> = serde_json::from_str("\"   \"");
        assert!(bad.is_err());
    }
}
