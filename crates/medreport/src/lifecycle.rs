//! The analysis-request lifecycle.
//!
//! One turn at a time: `submit` spawns a turn task that owns every per-turn
//! timer (elapsed ticker, progress estimator, reveal delays), so aborting the
//! task on `abandon` releases all of them at once. The task reports through
//! an event channel and renders nothing itself; status chrome, toasts and the
//! transcript store subscribe to the events.
//!
//! `Idle → Uploading → Processing → {Succeeded | Failed} → Idle`. Retry
//! re-enters `Uploading` with the stored payload; a fresh submission also
//! re-enters from `Idle`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};
use tracing::{info, warn};

use crate::client::AnalysisClient;
use crate::errors::AnalysisError;
use crate::models::payload::ImagePayload;
use crate::models::turn::TurnEntry;
use crate::progress::DisplayProgress;
use crate::reveal::{RevealController, RevealSink};

pub const ELAPSED_TICK: Duration = Duration::from_secs(1);
pub const ESTIMATOR_TICK: Duration = Duration::from_millis(800);

/// How long the filled bar lingers before the placeholder is cleared.
pub const PLACEHOLDER_GRACE: Duration = Duration::from_millis(300);

/// Pause between the analysis reveal finishing and the recommendations
/// reveal starting.
pub const SECTION_PAUSE: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Analysis,
    Recommendations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Uploading,
    Processing,
    Succeeded,
    Failed,
}

/// Discrete lifecycle events, in emission order within a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    Started,
    Progress { percent: f64 },
    Elapsed { seconds: u64 },
    PlaceholderCleared,
    SectionStarted { section: Section },
    Frame { section: Section, markup: String },
    ScrollToLatest,
    SectionCompleted { section: Section },
    Succeeded { processing_time: Option<f64> },
    Failed { error: AnalysisError },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("an analysis request is already in flight")]
    InFlight,

    #[error("no stored payload to retry")]
    NothingToRetry,
}

#[derive(Default)]
struct TurnShared {
    phase: Phase,
    last_error: Option<AnalysisError>,
    transcript: Vec<TurnEntry>,
}

pub struct AnalysisLifecycle {
    client: Arc<AnalysisClient>,
    events: mpsc::UnboundedSender<TurnEvent>,
    shared: Arc<Mutex<TurnShared>>,
    turn: Option<JoinHandle<()>>,
    last_payload: Option<ImagePayload>,
}

impl AnalysisLifecycle {
    pub fn new(client: AnalysisClient) -> (Self, mpsc::UnboundedReceiver<TurnEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let lifecycle = AnalysisLifecycle {
            client: Arc::new(client),
            events,
            shared: Arc::default(),
            turn: None,
            last_payload: None,
        };
        (lifecycle, rx)
    }

    /// Start a turn with a freshly selected payload. The payload is retained
    /// so a later [`retry`](Self::retry) can replay it without re-selection.
    pub fn submit(&mut self, payload: ImagePayload) -> Result<(), SubmitError> {
        if self.is_busy() {
            return Err(SubmitError::InFlight);
        }
        self.last_payload = Some(payload.clone());
        self.start_turn(payload);
        Ok(())
    }

    /// Replay the exact last payload after a failure.
    pub fn retry(&mut self) -> Result<(), SubmitError> {
        if self.is_busy() {
            return Err(SubmitError::InFlight);
        }
        let payload = self
            .last_payload
            .clone()
            .ok_or(SubmitError::NothingToRetry)?;
        self.start_turn(payload);
        Ok(())
    }

    /// Start-new-chat semantics: abort the in-flight turn task, killing its
    /// timers and any running reveal with it, and return to `Idle`. The
    /// stored payload survives so retry remains possible.
    pub fn abandon(&mut self) {
        if let Some(turn) = self.turn.take() {
            turn.abort();
        }
        let mut shared = self.shared.lock().unwrap();
        shared.phase = Phase::Idle;
        shared.last_error = None;
        shared.transcript.clear();
    }

    pub fn is_busy(&self) -> bool {
        self.turn.as_ref().is_some_and(|turn| !turn.is_finished())
    }

    pub fn phase(&self) -> Phase {
        self.shared.lock().unwrap().phase
    }

    pub fn last_error(&self) -> Option<AnalysisError> {
        self.shared.lock().unwrap().last_error.clone()
    }

    /// The ordered turn entries accumulated so far, handed to the persistence
    /// collaborator at end of turn. Draining resets for the next turn.
    pub fn take_transcript(&mut self) -> Vec<TurnEntry> {
        std::mem::take(&mut self.shared.lock().unwrap().transcript)
    }

    fn start_turn(&mut self, payload: ImagePayload) {
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        let shared = Arc::clone(&self.shared);
        self.turn = Some(tokio::spawn(run_turn(client, payload, events, shared)));
    }
}

impl Drop for AnalysisLifecycle {
    fn drop(&mut self) {
        if let Some(turn) = self.turn.take() {
            turn.abort();
        }
    }
}

/// Adapts reveal frames onto the turn's event channel.
struct EventSink {
    section: Section,
    events: mpsc::UnboundedSender<TurnEvent>,
}

impl RevealSink for EventSink {
    fn display(&mut self, markup: &str) {
        let _ = self.events.send(TurnEvent::Frame {
            section: self.section,
            markup: markup.to_string(),
        });
    }

    fn scroll_to_latest(&mut self) {
        let _ = self.events.send(TurnEvent::ScrollToLatest);
    }
}

async fn run_turn(
    client: Arc<AnalysisClient>,
    payload: ImagePayload,
    events: mpsc::UnboundedSender<TurnEvent>,
    shared: Arc<Mutex<TurnShared>>,
) {
    {
        let mut shared = shared.lock().unwrap();
        shared.phase = Phase::Uploading;
        shared.last_error = None;
        shared.transcript.push(TurnEntry::user_image(&payload));
    }
    let _ = events.send(TurnEvent::Started);

    let (progress_tx, mut progress_rx) = watch::channel(0.0);
    let mut display = DisplayProgress::new();
    let mut upload_open = true;
    let mut seconds = 0u64;

    let start = Instant::now();
    let mut elapsed_ticker = interval_at(start + ELAPSED_TICK, ELAPSED_TICK);
    let mut estimator_ticker = interval_at(start + ESTIMATOR_TICK, ESTIMATOR_TICK);

    let analyze = client.analyze(&payload, progress_tx);
    tokio::pin!(analyze);

    // The transport's own deadline races the terminal response inside
    // `analyze`; the tickers only dress the wait.
    let result = loop {
        tokio::select! {
            result = &mut analyze => break result,
            changed = progress_rx.changed(), if upload_open => {
                match changed {
                    Ok(()) => {
                        let fraction = *progress_rx.borrow_and_update();
                        display.observe_upload(fraction);
                        if display.upload_done() {
                            let mut shared = shared.lock().unwrap();
                            if shared.phase == Phase::Uploading {
                                shared.phase = Phase::Processing;
                            }
                        }
                        let _ = events.send(TurnEvent::Progress { percent: display.percent() });
                    }
                    Err(_) => upload_open = false,
                }
            }
            _ = elapsed_ticker.tick() => {
                seconds += 1;
                let _ = events.send(TurnEvent::Elapsed { seconds });
            }
            _ = estimator_ticker.tick() => {
                let before = display.percent();
                display.estimate_tick(&mut rand::thread_rng());
                if display.percent() > before {
                    let _ = events.send(TurnEvent::Progress { percent: display.percent() });
                }
            }
        }
    };

    match result {
        Ok(report) => {
            info!(processing_time = ?report.processing_time, "analysis received");
            shared.lock().unwrap().phase = Phase::Succeeded;

            display.complete();
            let _ = events.send(TurnEvent::Progress {
                percent: display.percent(),
            });
            sleep(PLACEHOLDER_GRACE).await;
            let _ = events.send(TurnEvent::PlaceholderCleared);

            let mut reveal = RevealController::new();
            reveal_section(&mut reveal, Section::Analysis, &report.analysis_result, &events).await;
            shared
                .lock()
                .unwrap()
                .transcript
                .push(TurnEntry::analysis(report.analysis_result.as_str()));

            sleep(SECTION_PAUSE).await;

            reveal_section(
                &mut reveal,
                Section::Recommendations,
                &report.health_recommendations,
                &events,
            )
            .await;
            shared
                .lock()
                .unwrap()
                .transcript
                .push(TurnEntry::recommendations(
                    report.health_recommendations.as_str(),
                ));

            let _ = events.send(TurnEvent::Succeeded {
                processing_time: report.processing_time,
            });
        }
        Err(error) => {
            warn!(%error, "analysis request failed");
            let _ = events.send(TurnEvent::PlaceholderCleared);
            {
                let mut shared = shared.lock().unwrap();
                shared.phase = Phase::Failed;
                shared.last_error = Some(error.clone());
            }
            let _ = events.send(TurnEvent::Failed { error });
        }
    }
}

async fn reveal_section(
    reveal: &mut RevealController,
    section: Section,
    text: &str,
    events: &mpsc::UnboundedSender<TurnEvent>,
) {
    let _ = events.send(TurnEvent::SectionStarted { section });
    let sink = EventSink {
        section,
        events: events.clone(),
    };
    reveal.begin(text, sink).wait().await;
    let _ = events.send(TurnEvent::SectionCompleted { section });
}
