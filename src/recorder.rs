//! # Recording State Machine
//!
//! Governs session lifecycle and session-id issuance, and gates whether
//! incoming samples reach the local ping store.
//!
//! The controller is the single logical owner of the active session: exactly
//! one session may be RECORDING or PAUSED per controller at a time. It is
//! driven by an interactive UI, so transitions requested from an unsupported
//! state are silent no-ops rather than errors.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::reconcile::{ActivityRepository, SavePipeline};
use crate::source::{PositionFix, SampleSource};
use crate::stats::RouteStats;
use crate::store::PingStore;
use crate::{Activity, GeoSample, Route};

/// Recording lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// No session; recorder not yet opened
    NotStarted,
    /// Recorder open, waiting to start
    Idling,
    /// Actively capturing samples
    Recording,
    /// Capture suspended; session id and stored samples preserved
    Paused,
    /// Sample set finalized, awaiting save or reset
    Stopped,
}

/// Explicitly owned identity of one continuous recording attempt.
///
/// Pause/resume never fragments a capture: the same context is reused when
/// resuming from PAUSED.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Opaque unique id; all samples of this attempt carry it
    pub session_id: String,
    pub started_at: DateTime<Utc>,
}

impl SessionContext {
    fn fresh() -> Self {
        Self {
            session_id: format!("session_{}", Uuid::new_v4()),
            started_at: Utc::now(),
        }
    }
}

/// The recording state machine.
///
/// Owns the local ping store, the sample source subscription, and the active
/// session context. Delivered fixes enter through [`handle_fix`]; everything
/// else is an explicit transition method.
///
/// [`handle_fix`]: RecordingController::handle_fix
pub struct RecordingController<S: SampleSource> {
    state: RecordingState,
    session: Option<SessionContext>,
    store: PingStore,
    source: S,
}

impl<S: SampleSource> RecordingController<S> {
    pub fn new(store: PingStore, source: S) -> Self {
        Self {
            state: RecordingState::NotStarted,
            session: None,
            store,
            source,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// The active session, if one is RECORDING, PAUSED, or STOPPED.
    pub fn session(&self) -> Option<&SessionContext> {
        self.session.as_ref()
    }

    /// The underlying ping store.
    pub fn store(&self) -> &PingStore {
        &self.store
    }

    /// Recorder screen opened: `NOT_STARTED -> IDLING`. No-op elsewhere.
    pub fn prepare(&mut self) {
        if self.state == RecordingState::NotStarted {
            self.state = RecordingState::Idling;
        } else {
            log::debug!("[Recorder] prepare() ignored in state {:?}", self.state);
        }
    }

    /// `NOT_STARTED | IDLING | PAUSED -> RECORDING`.
    ///
    /// Issues a fresh session id unless resuming from PAUSED, which reuses
    /// the existing one. Fails with `SourceUnavailable` when the sample
    /// source cannot be subscribed to; state is unchanged on failure.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            RecordingState::NotStarted | RecordingState::Idling | RecordingState::Paused => {
                self.source.subscribe()?;

                let session = self.session.get_or_insert_with(SessionContext::fresh);
                log::info!(
                    "[Recorder] Recording under session {} (resumed: {})",
                    session.session_id,
                    self.state == RecordingState::Paused
                );
                self.state = RecordingState::Recording;
                Ok(())
            }
            _ => {
                log::debug!("[Recorder] start() ignored in state {:?}", self.state);
                Ok(())
            }
        }
    }

    /// `RECORDING -> PAUSED`. Idempotent if already PAUSED.
    ///
    /// Takes effect before the next sample is processed: any fix delivered
    /// after this call is dropped, not stored.
    pub fn pause(&mut self) {
        match self.state {
            RecordingState::Recording => {
                self.source.unsubscribe();
                self.state = RecordingState::Paused;
                log::info!("[Recorder] Paused");
            }
            RecordingState::Paused => {}
            _ => log::debug!("[Recorder] pause() ignored in state {:?}", self.state),
        }
    }

    /// `RECORDING | PAUSED -> STOPPED`. Finalizes the sample set available
    /// for save; further fixes are rejected.
    pub fn stop(&mut self) {
        match self.state {
            RecordingState::Recording | RecordingState::Paused => {
                self.source.unsubscribe();
                self.state = RecordingState::Stopped;
                log::info!("[Recorder] Stopped");
            }
            _ => log::debug!("[Recorder] stop() ignored in state {:?}", self.state),
        }
    }

    /// Discard: any state `-> NOT_STARTED`. Deletes all samples tagged with
    /// the current session id and clears it.
    pub fn reset(&mut self) -> Result<()> {
        self.source.unsubscribe();
        if let Some(session) = self.session.take() {
            self.store.delete_by_session(&session.session_id)?;
        }
        self.state = RecordingState::NotStarted;
        Ok(())
    }

    /// Leave the recorder without saving.
    ///
    /// If RECORDING or PAUSED, behaves as `stop()` first. Stored samples are
    /// NOT deleted; the returned context identifies the now-orphaned session,
    /// recoverable via [`orphaned_sessions`] until an explicit reset.
    ///
    /// [`orphaned_sessions`]: RecordingController::orphaned_sessions
    pub fn exit(&mut self) -> Option<SessionContext> {
        if matches!(
            self.state,
            RecordingState::Recording | RecordingState::Paused
        ) {
            self.stop();
        }
        self.state = RecordingState::NotStarted;
        let session = self.session.take();
        if let Some(ref s) = session {
            log::info!(
                "[Recorder] Exited; session {} left in local storage",
                s.session_id
            );
        }
        session
    }

    /// Deliver one position fix from the source.
    ///
    /// Stored only while RECORDING (hard cutover on pause/stop: a fix
    /// observed after the transition is dropped). Returns whether the fix
    /// was stored. A storage write failure is surfaced but non-fatal:
    /// sampling continues.
    pub fn handle_fix(&mut self, fix: PositionFix) -> Result<bool> {
        let Some(session) = &self.session else {
            return Ok(false);
        };
        if self.state != RecordingState::Recording {
            return Ok(false);
        }

        let sample = GeoSample {
            session_id: session.session_id.clone(),
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy_meters: fix.accuracy_meters,
            timestamp_ms: fix.timestamp_ms,
            speed_kmh: fix.speed_kmh,
        };

        match self.store.append(&sample) {
            Ok(()) => Ok(true),
            Err(e) => {
                log::warn!("[Recorder] Sample append failed (continuing): {}", e);
                Err(e)
            }
        }
    }

    /// `STOPPED -> NOT_STARTED` via the save pipeline.
    ///
    /// On success the session's local samples are gone and the Activity
    /// gained one Route. On persistence failure state remains STOPPED and
    /// local samples are retained for retry. A no-op (`None`) outside
    /// STOPPED.
    pub fn confirm_save<R: ActivityRepository>(
        &mut self,
        pipeline: &mut SavePipeline<R>,
        activity: &mut Activity,
    ) -> Result<Option<Route>> {
        if self.state != RecordingState::Stopped {
            log::debug!(
                "[Recorder] confirm_save() ignored in state {:?}",
                self.state
            );
            return Ok(None);
        }
        let Some(session) = self.session.clone() else {
            return Ok(None);
        };

        let route = pipeline.save_session(&self.store, &session.session_id, activity)?;

        self.session = None;
        self.state = RecordingState::NotStarted;
        Ok(Some(route))
    }

    /// Session ids holding stored samples that are not the active session.
    ///
    /// These survive crashes and `exit()`; callers can re-attach, save, or
    /// purge them.
    pub fn orphaned_sessions(&self) -> Result<Vec<String>> {
        let active = self.session.as_ref().map(|s| s.session_id.as_str());
        let ids = self
            .store
            .session_ids()?
            .into_iter()
            .filter(|id| Some(id.as_str()) != active)
            .collect();
        Ok(ids)
    }

    /// Statistics over the active session's stored samples so far.
    pub fn live_stats(&self) -> Result<Option<RouteStats>> {
        let Some(session) = &self.session else {
            return Ok(None);
        };
        let samples = self.store.query_by_session(&session.session_id)?;
        Ok(Some(RouteStats::from_samples(&samples)))
    }
}
