use futures::StreamExt;
use parking_lot::{Mutex, ReentrantMutex};
use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::events::AnalysisEvent;
use super::transport::RecommendationBackend;
use super::types::{AnalysisResults, AnalysisSnapshot, RunState};
use crate::app::AnalysisConfig;
use crate::cache::{CacheEntry, RecommendationCache};
use crate::constants::{
    INFERENCE_PROGRESS_PER_CHAR, MAX_STREAM_TIMEOUT_SECS, MIN_PROGRESS_CHECKPOINT_INTERVAL_MS,
    MSG_FULL_RESPONSE, MSG_INFERENCE, MSG_PHASE1_START,
    MSG_SEARCH_CHECKPOINTS, MSG_SEARCH_START, PROGRESS_CHECKPOINT_INTERVAL_MS, PROGRESS_DONE,
    PROGRESS_FULL_RESPONSE, PROGRESS_INFERENCE_CAP, PROGRESS_INFERENCE_COMPLETE,
    PROGRESS_KEYWORD_BASE, PROGRESS_PHASE1_CEILING, PROGRESS_PHASE1_START, PROGRESS_PHASE2_START,
    PROGRESS_SEARCH_CHECKPOINTS, PROGRESS_SEARCH_ISSUED, PROGRESS_STATUS, STREAM_TIMEOUT_SECS,
};
use crate::survey::SurveyInput;
use crate::utils::AnalysisError;

/// Observer invoked after every state change of the current run
pub type SnapshotCallback = Arc<dyn Fn(&AnalysisSnapshot) + Send + Sync>;

/// Timing knobs for the client
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Phase 1 must reach a terminal event within this window
    pub stream_timeout: Duration,
    /// Spacing of the cosmetic phase 2 checkpoints
    pub checkpoint_interval: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            stream_timeout: Duration::from_secs(STREAM_TIMEOUT_SECS),
            checkpoint_interval: Duration::from_millis(PROGRESS_CHECKPOINT_INTERVAL_MS),
        }
    }
}

impl ClientSettings {
    /// Phase 1 window, capped so the deadline always fits in an `Instant`
    fn effective_stream_timeout(&self) -> Duration {
        self.stream_timeout
            .min(Duration::from_secs(MAX_STREAM_TIMEOUT_SECS))
    }

    /// Checkpoint spacing; a zero period is not a valid interval
    fn effective_checkpoint_interval(&self) -> Duration {
        self.checkpoint_interval
            .max(Duration::from_millis(MIN_PROGRESS_CHECKPOINT_INTERVAL_MS))
    }
}

impl From<&AnalysisConfig> for ClientSettings {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            stream_timeout: Duration::from_secs(config.stream_timeout_secs),
            checkpoint_interval: Duration::from_millis(config.progress_checkpoint_interval_ms),
        }
    }
}

/// What phase 1 hands to phase 2
struct PhaseOneOutcome {
    analysis: AnalysisResults,
    full_response: String,
}

/// Latest snapshot plus a counter bumped on every mutation
#[derive(Default)]
struct RunSlot {
    snapshot: AnalysisSnapshot,
    version: u64,
}

/// Drives the two-phase recommendation pipeline.
///
/// Each `start` gets a run token. Starting again or calling `cancel` bumps
/// the token; every state mutation checks it first, so events and responses
/// from a superseded run never reach the snapshot or the cache.
pub struct StreamingAnalysisClient {
    backend: Arc<dyn RecommendationBackend>,
    cache: RecommendationCache,
    settings: ClientSettings,
    state: Mutex<RunSlot>,
    run_token: watch::Sender<u64>,
    observer: Option<SnapshotCallback>,
    // Version of the last snapshot handed to the observer
    notified: ReentrantMutex<Cell<u64>>,
}

impl StreamingAnalysisClient {
    pub fn new(
        backend: Arc<dyn RecommendationBackend>,
        cache: RecommendationCache,
        settings: ClientSettings,
    ) -> Self {
        let (run_token, _) = watch::channel(0);
        Self {
            backend,
            cache,
            settings,
            state: Mutex::new(RunSlot::default()),
            run_token,
            observer: None,
            notified: ReentrantMutex::new(Cell::new(0)),
        }
    }

    /// Register the view-layer observer
    pub fn with_observer(mut self, observer: SnapshotCallback) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Current state of the latest run
    pub fn snapshot(&self) -> AnalysisSnapshot {
        self.state.lock().snapshot.clone()
    }

    /// Token of the latest run
    pub fn current_run(&self) -> u64 {
        *self.run_token.borrow()
    }

    /// Run the pipeline for `survey`, superseding any run in flight.
    ///
    /// Resolves with this run's completed snapshot, even if a newer run has
    /// replaced the shared one since. A run superseded or cancelled before it
    /// completes resolves with `AnalysisError::Cancelled` and leaves the
    /// snapshot to its successor.
    pub async fn start(&self, survey: &SurveyInput) -> Result<AnalysisSnapshot, AnalysisError> {
        let token = self.bump_token();
        let cancelled = self.run_token.subscribe();

        if let Some(entry) = self.cache.load(survey) {
            info!(
                run = token,
                "Loaded {} recommendations from cache",
                entry.recommendations.len()
            );
            return self.update(token, |s| {
                *s = AnalysisSnapshot::from_cache(
                    entry.recommendations,
                    entry.analysis_results,
                    entry.full_response,
                );
            });
        }

        info!(run = token, "Starting recommendation run");
        self.update(token, |s| {
            *s = AnalysisSnapshot::default();
            s.state = RunState::Phase1Streaming;
            s.progress.message = MSG_PHASE1_START.to_string();
            s.progress.advance_to(PROGRESS_PHASE1_START);
        })?;

        match self.run_pipeline(token, survey, cancelled).await {
            Ok(snapshot) => Ok(snapshot),
            Err(AnalysisError::Cancelled) => {
                debug!(run = token, "Run superseded");
                Err(AnalysisError::Cancelled)
            }
            Err(e) => {
                error!(run = token, "Recommendation run failed: {}", e);
                let message = e.to_string();
                // A failure racing a newer run must not clobber its state
                let _ = self.update(token, |s| {
                    s.state = RunState::Failed;
                    s.error = Some(message);
                });
                Err(e)
            }
        }
    }

    /// Drop the cached result and run again from a clean state
    pub async fn clear_cache_and_restart(
        &self,
        survey: &SurveyInput,
    ) -> Result<AnalysisSnapshot, AnalysisError> {
        info!("Clearing recommendation cache and restarting");
        self.cache.clear();
        self.start(survey).await
    }

    /// Abandon the run in flight. The snapshot keeps its partial contents.
    pub fn cancel(&self) {
        let token = self.bump_token();
        debug!(run = token, "Cancelled active run");
    }

    fn bump_token(&self) -> u64 {
        // Held so a bump never lands between a run's token check and its mutation
        let _state = self.state.lock();
        let mut token = 0;
        self.run_token.send_modify(|t| {
            *t += 1;
            token = *t;
        });
        token
    }

    fn ensure_current(&self, token: u64) -> Result<(), AnalysisError> {
        if *self.run_token.borrow() == token {
            Ok(())
        } else {
            Err(AnalysisError::Cancelled)
        }
    }

    /// Mutate the snapshot on behalf of run `token`, notify the observer and
    /// return the snapshot as this mutation left it
    fn update<F>(&self, token: u64, mutate: F) -> Result<AnalysisSnapshot, AnalysisError>
    where
        F: FnOnce(&mut AnalysisSnapshot),
    {
        let (snapshot, version) = {
            let mut slot = self.state.lock();
            self.ensure_current(token)?;
            mutate(&mut slot.snapshot);
            slot.version += 1;
            (slot.snapshot.clone(), slot.version)
        };

        self.notify(&snapshot, version);
        Ok(snapshot)
    }

    /// Hand `snapshot` to the observer unless a newer one already went out.
    /// Reentrant so an observer may start another run.
    fn notify(&self, snapshot: &AnalysisSnapshot, version: u64) {
        let Some(observer) = &self.observer else {
            return;
        };

        let notified = self.notified.lock();
        if version <= notified.get() {
            debug!(version, "Dropping stale snapshot notification");
            return;
        }
        notified.set(version);
        observer(snapshot);
    }

    async fn run_pipeline(
        &self,
        token: u64,
        survey: &SurveyInput,
        cancelled: watch::Receiver<u64>,
    ) -> Result<AnalysisSnapshot, AnalysisError> {
        let timeout = self.settings.effective_stream_timeout();
        let deadline = Instant::now() + timeout;

        // Dropping the phase 1 future closes the stream
        let outcome = tokio::select! {
            biased;
            _ = superseded(cancelled.clone(), token) => return Err(AnalysisError::Cancelled),
            result = tokio::time::timeout_at(deadline, self.run_phase_one(token, survey)) => {
                match result {
                    Ok(outcome) => outcome?,
                    Err(_) => {
                        warn!(run = token, "No terminal analysis event within {:?}", timeout);
                        return Err(AnalysisError::StreamTimeout(timeout.as_secs()));
                    }
                }
            }
        };

        self.run_phase_two(token, survey, outcome, cancelled).await
    }

    async fn run_phase_one(
        &self,
        token: u64,
        survey: &SurveyInput,
    ) -> Result<PhaseOneOutcome, AnalysisError> {
        let mut stream = self.backend.open_analysis_stream(survey).await?;
        let mut full_response: Option<String> = None;

        while let Some(event) = stream.next().await {
            let event = event?;
            self.ensure_current(token)?;

            match event {
                AnalysisEvent::Status { message } => {
                    debug!(run = token, "status: {}", message);
                    self.update(token, |s| {
                        s.progress.message = message;
                        s.progress.advance_to(PROGRESS_STATUS);
                    })?;
                }
                AnalysisEvent::Inference { text } => {
                    let target = inference_progress(text.chars().count());
                    self.update(token, |s| {
                        s.progress.message = MSG_INFERENCE.to_string();
                        s.partial_text = text;
                        s.progress.advance_to(target);
                    })?;
                }
                AnalysisEvent::InferenceComplete { message } => {
                    self.update(token, |s| {
                        if !message.is_empty() {
                            s.progress.message = message;
                        }
                        s.progress.advance_to(PROGRESS_INFERENCE_COMPLETE);
                    })?;
                }
                AnalysisEvent::FullResponse { response } => {
                    full_response = Some(response.clone());
                    self.update(token, |s| {
                        s.full_response = Some(response);
                        s.progress.message = MSG_FULL_RESPONSE.to_string();
                        s.progress.advance_to(PROGRESS_FULL_RESPONSE);
                    })?;
                }
                AnalysisEvent::Keyword { keyword, index } => {
                    debug!(run = token, "keyword {}: {}", index, keyword);
                    self.update(token, |s| {
                        s.progress.keywords.push(keyword);
                        s.analysis = Some(AnalysisResults::extracting(&s.progress.keywords));
                        s.progress.advance_to(keyword_progress(index));
                    })?;
                }
                AnalysisEvent::Complete {
                    keywords,
                    full_response: trailing_response,
                } => {
                    let full_response = full_response.or(trailing_response).unwrap_or_default();
                    let analysis = AnalysisResults::complete(keywords.clone());
                    info!(run = token, "Analysis complete with {} keywords", keywords.len());

                    self.update(token, |s| {
                        s.progress.keywords = keywords;
                        s.analysis = Some(analysis.clone());
                        if s.full_response.is_none() {
                            s.full_response = Some(full_response.clone());
                        }
                        s.state = RunState::Phase2Requesting;
                        s.progress.step = 2;
                        s.progress.advance_to(PROGRESS_PHASE2_START);
                    })?;

                    return Ok(PhaseOneOutcome {
                        analysis,
                        full_response,
                    });
                }
                AnalysisEvent::Error { message } => {
                    return Err(AnalysisError::Backend(message));
                }
                AnalysisEvent::Unknown => {
                    debug!(run = token, "Ignoring unrecognized analysis event");
                }
            }
        }

        Err(AnalysisError::StreamConnection(
            "stream closed before the analysis completed".to_string(),
        ))
    }

    async fn run_phase_two(
        &self,
        token: u64,
        survey: &SurveyInput,
        phase_one: PhaseOneOutcome,
        cancelled: watch::Receiver<u64>,
    ) -> Result<AnalysisSnapshot, AnalysisError> {
        self.update(token, |s| {
            s.progress.message = MSG_SEARCH_START.to_string();
            s.progress.advance_to(PROGRESS_SEARCH_ISSUED);
        })?;

        let request = self.backend.similarity_search(survey);
        tokio::pin!(request);

        // Cosmetic checkpoints tick only while the request is outstanding
        let period = self.settings.effective_checkpoint_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut checkpoints = PROGRESS_SEARCH_CHECKPOINTS
            .iter()
            .zip(MSG_SEARCH_CHECKPOINTS.iter());
        let mut checkpoints_left = PROGRESS_SEARCH_CHECKPOINTS.len();

        let response = loop {
            tokio::select! {
                biased;
                _ = superseded(cancelled.clone(), token) => return Err(AnalysisError::Cancelled),
                result = &mut request => break result?,
                _ = ticker.tick(), if checkpoints_left > 0 => {
                    checkpoints_left -= 1;
                    if let Some((&percent, &message)) = checkpoints.next() {
                        self.update(token, |s| {
                            s.progress.message = message.to_string();
                            s.progress.advance_to(percent);
                        })?;
                    }
                }
            }
        };

        self.ensure_current(token)?;
        let recommendations = response.into_ranked();
        if recommendations.is_empty() {
            return Err(AnalysisError::EmptyResult);
        }

        let count = recommendations.len();
        let entry = CacheEntry::new(
            survey,
            recommendations.clone(),
            Some(phase_one.analysis),
            phase_one.full_response,
        );

        // Cached together with the completion so a newer run cannot slip in between
        let snapshot = self.update(token, |s| {
            s.recommendations = recommendations;
            s.state = RunState::Completed;
            s.progress.message = format!("Found {} matching showcases!", count);
            s.progress.advance_to(PROGRESS_DONE);
            self.cache.save(&entry);
        })?;

        info!(run = token, "Recommendation run completed with {} results", count);
        Ok(snapshot)
    }
}

/// Resolves once run `token` is no longer the latest
async fn superseded(mut tokens: watch::Receiver<u64>, token: u64) {
    loop {
        if *tokens.borrow_and_update() != token {
            return;
        }
        if tokens.changed().await.is_err() {
            // Sender gone: nothing can supersede this run any more
            std::future::pending::<()>().await;
        }
    }
}

/// Progress while the model is still writing: 15% plus a little per
/// character, capped at 30%
fn inference_progress(chars: usize) -> u8 {
    let grown = PROGRESS_STATUS as f32 + chars as f32 * INFERENCE_PROGRESS_PER_CHAR;
    grown.min(PROGRESS_INFERENCE_CAP as f32) as u8
}

/// Each keyword nudges progress by one point
fn keyword_progress(index: usize) -> u8 {
    let nudged = (PROGRESS_KEYWORD_BASE as usize).saturating_add(index.saturating_add(1));
    nudged.min(PROGRESS_PHASE1_CEILING as usize) as u8
}
