//! # Council Pipeline
//!
//! Runs one question through the three evaluation stages and reports
//! every transition.
//!
//! ## Overview
//!
//! A run is strictly sequential: stage 2 needs the complete stage 1 output,
//! and stage 3 needs the complete stage 2 output plus its label table. Each
//! stage is one call through a [`StageClient`]; a failed call ends the run
//! and nothing is retried. Results of stages that already succeeded stay
//! on the run after a failure or a cancellation.
//!
//! ## Architecture
//!
//! ```text
//!                 start(question)
//!                       │
//!                       ▼
//!          ┌──────────────────────────┐   events    ┌───────────┐
//!          │   PipelineOrchestrator   │────────────▶│ RunHandle │
//!          │  (driver task per run)   │             └───────────┘
//!          └────────────┬─────────────┘
//!                       │ snapshots (watch)
//!                       ▼
//!          ┌──────────────────────────┐
//!          │       PipelineRun        │
//!          └──────────────────────────┘
//!                       ▲
//!      collect / evaluate / scoreboard
//!                       │
//!          ┌────────────┴─────────────┐
//!          │       StageClient        │
//!          ├──────────────┬───────────┤
//!          │HttpStageClient│ Scripted │
//!          └──────────────┴───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use council_core::CouncilConfig;
//! use council_pipeline::{HttpStageClient, PipelineOrchestrator};
//!
//! let config = CouncilConfig::load_or_default("council.toml")?;
//! let client = HttpStageClient::new(&config.backend)?;
//! let orchestrator = PipelineOrchestrator::new(Arc::new(client));
//!
//! let run = orchestrator.run("Is the sky blue?").await?;
//! for row in run.scoreboard().unwrap_or_default() {
//!     println!("{} {:.1}", row.model, row.average_score);
//! }
//! ```

pub mod client;
pub mod error;
pub mod fakes;
pub mod http;
pub mod orchestrator;
pub mod run;
pub mod state;

pub use client::StageClient;
pub use error::{PipelineError, StageError};
pub use fakes::ScriptedBackend;
pub use http::HttpStageClient;
pub use orchestrator::{PipelineOrchestrator, RunHandle};
pub use run::PipelineRun;
pub use state::{PipelineEvent, PipelineState};
