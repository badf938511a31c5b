//! # Council Core
//!
//! Data model, wire contracts and de-anonymization codec for anonymized
//! LLM cross-evaluation.
//!
//! ## Overview
//!
//! A run asks several council models the same question, has every model
//! blindly score the others, and ends with a de-anonymized scoreboard.
//! Blindness comes from labels: during review each answer is shown as
//! `Response A`, `Response B`, ... and only the [`LabelMap`] knows which
//! model is behind which label.
//!
//! This crate holds everything about a run that is pure data:
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`model`] | Wire types: responses, evaluations, scoreboard rows |
//! | [`label`] | Label assignment and the label table |
//! | [`codec`] | Label → model reversal inside free text |
//! | [`contract`] | Request/response bodies of the three stages |
//! | [`validate`] | Structural checks on stage payloads |
//! | [`scoreboard`] | Aggregation of judgments into a scoreboard |
//! | [`config`] | TOML + environment configuration |
//!
//! ## Stages
//!
//! ```text
//!   question
//!      │
//!      ▼
//! ┌──────────┐  stage1   ┌──────────┐  stage2 + labels  ┌────────────┐
//! │ Collect  │──────────▶│ Evaluate │──────────────────▶│ Scoreboard │
//! └──────────┘           └──────────┘                   └────────────┘
//!                              │
//!                              ▼
//!                     codec::reverse (display)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use council_core::{reverse, LabelMap, ModelResponse};
//!
//! let stage1 = vec![
//!     ModelResponse::answered("org/alpha", "Yes."),
//!     ModelResponse::failed("org/beta", "rate limited"),
//!     ModelResponse::answered("org/gamma", "Mostly."),
//! ];
//!
//! let labels = LabelMap::assign(&stage1);
//! assert_eq!(labels.model_for("Response B"), Some("org/gamma"));
//!
//! let shown = reverse("Response B hedges more than Response A.", &labels);
//! assert_eq!(shown, "**gamma** hedges more than **alpha**.");
//! ```

pub mod codec;
pub mod config;
pub mod contract;
pub mod error;
pub mod label;
pub mod model;
pub mod query;
pub mod scoreboard;
pub mod validate;

pub use codec::{reverse, AnonymizationCodec, RevealedEvaluation};
pub use config::{BackendConfig, CouncilConfig, LoggingConfig};
pub use contract::{
    HealthStatus, Stage, Stage1Request, Stage1Response, Stage2Metadata, Stage2Request,
    Stage2Response, Stage3Request, Stage3Response,
};
pub use error::CoreError;
pub use label::{short_name, LabelMap};
pub use model::{
    ItemStatus, Metric, MetricCard, MetricScore, MetricScores, ModelResponse, PeerEvaluation,
    ScoreboardEntry,
};
pub use query::Query;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
