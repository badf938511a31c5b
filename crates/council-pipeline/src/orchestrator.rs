//! The pipeline orchestrator.
//!
//! [`PipelineOrchestrator`] runs the three stages of one question strictly
//! in order, each exactly once, and reports progress two ways:
//!
//! - a per-run event stream ([`RunHandle`]) that delivers every transition
//!   exactly once, in stage order;
//! - a watch channel of [`PipelineRun`] snapshots for consumers that poll.
//!
//! ## Run Policy
//!
//! At most one run is in flight. Calling [`PipelineOrchestrator::start`]
//! while a run is active fails with [`PipelineError::RunInFlight`]; cancel
//! the active run first. Starting a new run after the previous one reached
//! a terminal state replaces the previous run's snapshot.
//!
//! Each run carries a generation number, and a driver only publishes while
//! its generation is current, so a late result can never land in a newer
//! run.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use council_core::validate::{unmapped_raw_labels, validate_stage1, validate_stage2, validate_stage3};
use council_core::{
    AnonymizationCodec, Query, Stage, Stage1Request, Stage2Request, Stage3Request,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::StageClient;
use crate::error::{PipelineError, StageError};
use crate::run::PipelineRun;
use crate::state::{PipelineEvent, PipelineState};

/// Drives evaluation runs against a [`StageClient`].
///
/// Cloning is cheap; clones share the same runs and snapshots.
///
/// # Example
///
/// ```rust,ignore
/// let orchestrator = PipelineOrchestrator::new(Arc::new(HttpStageClient::new(&config)?));
///
/// let mut handle = orchestrator.start("Is the sky blue?")?;
/// while let Some(event) = handle.next_event().await {
///     println!("{event:?}");
/// }
/// let run = handle.wait().await?;
/// assert!(run.is_complete());
/// ```
#[derive(Clone)]
pub struct PipelineOrchestrator {
    shared: Arc<Shared>,
}

struct Shared {
    client: Arc<dyn StageClient>,
    snapshot: watch::Sender<Arc<PipelineRun>>,
    generation: AtomicU64,
    active: Mutex<Option<ActiveRun>>,
}

struct ActiveRun {
    generation: u64,
    cancel: CancellationToken,
}

impl Shared {
    fn active(&self) -> std::sync::MutexGuard<'_, Option<ActiveRun>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

impl PipelineOrchestrator {
    /// Creates an orchestrator with no run.
    pub fn new(client: Arc<dyn StageClient>) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(PipelineRun::idle()));
        Self {
            shared: Arc::new(Shared {
                client,
                snapshot,
                generation: AtomicU64::new(0),
                active: Mutex::new(None),
            }),
        }
    }

    /// Starts a run for `question` on the current tokio runtime.
    ///
    /// The question is checked before anything else; an empty or
    /// whitespace-only question fails without contacting the backend.
    pub fn start(&self, question: &str) -> Result<RunHandle, PipelineError> {
        let query = Query::new(question)?;

        let mut active = self.shared.active();
        if active.is_some() && !self.state().is_terminal() {
            return Err(PipelineError::RunInFlight);
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        *active = Some(ActiveRun {
            generation,
            cancel: cancel.clone(),
        });

        let run = PipelineRun::new(generation, query);
        self.shared.snapshot.send_replace(Arc::new(run.clone()));
        drop(active);

        info!(generation, "starting council run");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let driver = Driver {
            shared: Arc::clone(&self.shared),
            run,
            events: events_tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(driver.drive());

        Ok(RunHandle {
            generation,
            events: events_rx,
            cancel,
            task,
        })
    }

    /// Runs `question` to completion.
    ///
    /// Returns the final snapshot on success. On failure or cancellation the
    /// error is returned and the partial results stay available through
    /// [`snapshot`](Self::snapshot).
    pub async fn run(&self, question: &str) -> Result<Arc<PipelineRun>, PipelineError> {
        let run = self.start(question)?.wait().await?;
        match run.state() {
            PipelineState::Complete => Ok(run),
            PipelineState::Cancelled { stage } => Err(PipelineError::Cancelled { stage: *stage }),
            _ => match run.error() {
                Some(err) => Err(PipelineError::Stage(err.clone())),
                None => Err(PipelineError::Join(format!(
                    "run ended in unexpected state: {}",
                    run.state()
                ))),
            },
        }
    }

    /// Cancels the active run. Returns false if nothing was running.
    pub fn cancel(&self) -> bool {
        match self.shared.active().as_ref() {
            Some(active) => {
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<PipelineRun> {
        Arc::clone(&self.shared.snapshot.borrow())
    }

    /// The state of the latest run.
    pub fn state(&self) -> PipelineState {
        self.shared.snapshot.borrow().state().clone()
    }

    /// Subscribes to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<Arc<PipelineRun>> {
        self.shared.snapshot.subscribe()
    }
}

/// Handle to one started run.
pub struct RunHandle {
    generation: u64,
    events: mpsc::UnboundedReceiver<PipelineEvent>,
    cancel: CancellationToken,
    task: JoinHandle<Arc<PipelineRun>>,
}

impl RunHandle {
    /// The run's generation number.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Requests cancellation. Results already resolved are kept.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this run when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for the next event. Returns `None` once the run has ended and
    /// every event was delivered.
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        self.events.recv().await
    }

    /// Waits for the run to end and returns its final snapshot.
    pub async fn wait(self) -> Result<Arc<PipelineRun>, PipelineError> {
        self.task
            .await
            .map_err(|e| PipelineError::Join(e.to_string()))
    }

    /// Waits for the run to end and returns its final snapshot together with
    /// every event not yet received.
    pub async fn finish(mut self) -> Result<(Arc<PipelineRun>, Vec<PipelineEvent>), PipelineError> {
        let run = (&mut self.task)
            .await
            .map_err(|e| PipelineError::Join(e.to_string()))?;

        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        Ok((run, events))
    }
}

/// Owns one run while it executes.
struct Driver {
    shared: Arc<Shared>,
    run: PipelineRun,
    events: mpsc::UnboundedSender<PipelineEvent>,
    cancel: CancellationToken,
}

impl Driver {
    async fn drive(mut self) -> Arc<PipelineRun> {
        self.execute().await;
        self.release();
        Arc::new(self.run)
    }

    async fn execute(&mut self) {
        let client = Arc::clone(&self.shared.client);
        let question = match self.run.query() {
            Some(query) => query.as_str().to_string(),
            None => return,
        };

        // Stage 1
        let request = Stage1Request {
            question: question.clone(),
        };
        let Some(stage1) = self.attempt(Stage::Collect, client.collect(&request)).await else {
            return;
        };
        if let Err(e) = validate_stage1(&stage1) {
            return self.fail(StageError::from_core(Stage::Collect, e));
        }

        let failed = stage1.stage1.iter().filter(|r| r.is_error()).count();
        info!(
            generation = self.run.generation,
            members = stage1.stage1.len(),
            failed,
            "collected council responses"
        );
        let responses: Arc<[_]> = Arc::from(stage1.stage1);
        self.run.stage1 = Some(Arc::clone(&responses));
        self.succeed(
            Stage::Collect,
            PipelineEvent::Stage1Ready {
                responses: Arc::clone(&responses),
            },
        );

        // Stage 2
        let request = Stage2Request {
            question,
            stage1_results: responses.to_vec(),
        };
        let Some(stage2) = self.attempt(Stage::Evaluate, client.evaluate(&request)).await else {
            return;
        };
        if let Err(e) = validate_stage2(&stage2) {
            return self.fail(StageError::from_core(Stage::Evaluate, e));
        }
        let stray = unmapped_raw_labels(&stage2);
        if !stray.is_empty() {
            warn!(labels = ?stray, "raw evaluations mention labels outside the label map");
        }

        let labels = Arc::new(stage2.metadata.label_to_model);
        let codec = AnonymizationCodec::new(&labels);
        let revealed: Arc<[_]> = stage2
            .stage2
            .iter()
            .map(|eval| codec.reveal(eval, &labels))
            .collect();
        info!(
            generation = self.run.generation,
            evaluations = stage2.stage2.len(),
            labels = labels.len(),
            "collected peer evaluations"
        );
        let evaluations: Arc<[_]> = Arc::from(stage2.stage2);
        self.run.labels = Some(Arc::clone(&labels));
        self.run.stage2 = Some(Arc::clone(&evaluations));
        self.run.revealed = Some(Arc::clone(&revealed));
        self.succeed(
            Stage::Evaluate,
            PipelineEvent::Stage2Ready {
                evaluations: revealed,
                labels: Arc::clone(&labels),
            },
        );

        // Stage 3
        let request = Stage3Request {
            stage2_results: evaluations.to_vec(),
            label_to_model: (*labels).clone(),
        };
        let Some(mut stage3) = self.attempt(Stage::Scoreboard, client.scoreboard(&request)).await
        else {
            return;
        };
        if let Err(e) = validate_stage3(&mut stage3, &labels) {
            return self.fail(StageError::from_core(Stage::Scoreboard, e));
        }

        info!(
            generation = self.run.generation,
            rows = stage3.stage3.len(),
            "scoreboard ready"
        );
        let scoreboard: Arc<[_]> = Arc::from(stage3.stage3);
        self.run.scoreboard = Some(Arc::clone(&scoreboard));
        self.succeed(Stage::Scoreboard, PipelineEvent::Stage3Ready { scoreboard });
    }

    /// Starts `stage` and waits for its call, unless the run is cancelled.
    ///
    /// Returns `None` once the run has reached a terminal state.
    async fn attempt<T, F>(&mut self, stage: Stage, call: F) -> Option<T>
    where
        F: Future<Output = Result<T, StageError>>,
    {
        if self.cancel.is_cancelled() {
            self.cancelled(stage, false);
            return None;
        }

        self.transition(PipelineState::running(stage));
        self.emit(PipelineEvent::StageStarted(stage));
        info!(generation = self.run.generation, %stage, "{}", stage.activity());

        let cancel = self.cancel.clone();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = call => Some(result),
        };

        match outcome {
            Some(Ok(payload)) => Some(payload),
            Some(Err(err)) => {
                self.fail(err);
                None
            }
            None => {
                self.cancelled(stage, true);
                None
            }
        }
    }

    fn succeed(&mut self, stage: Stage, data: PipelineEvent) {
        self.transition(PipelineState::done(stage));
        self.emit(data);
        self.emit(PipelineEvent::StageFinished(stage));
    }

    fn fail(&mut self, error: StageError) {
        let stage = error.stage();
        warn!(generation = self.run.generation, %stage, error = %error, "council run failed");

        self.run.error = Some(error.clone());
        self.transition(PipelineState::Failed {
            stage,
            reason: error.reason().to_string(),
        });
        self.emit(PipelineEvent::StageFinished(stage));
        self.emit(PipelineEvent::Failed { error });
    }

    fn cancelled(&mut self, stage: Stage, started: bool) {
        info!(generation = self.run.generation, %stage, "council run cancelled");

        self.transition(PipelineState::Cancelled { stage });
        if started {
            self.emit(PipelineEvent::StageFinished(stage));
        }
        self.emit(PipelineEvent::Cancelled { stage });
    }

    fn transition(&mut self, state: PipelineState) {
        debug!(generation = self.run.generation, %state, "transition");
        self.run.state = state;
        if self.shared.is_current(self.run.generation) {
            self.shared.snapshot.send_replace(Arc::new(self.run.clone()));
        }
    }

    fn emit(&self, event: PipelineEvent) {
        // The receiver may be gone if the caller only polls snapshots.
        let _ = self.events.send(event);
    }

    fn release(&self) {
        let mut active = self.shared.active();
        if active
            .as_ref()
            .is_some_and(|a| a.generation == self.run.generation)
        {
            *active = None;
        }
    }
}
