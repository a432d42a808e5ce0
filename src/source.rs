//! Geolocation sample source boundary.
//!
//! The source delivers discrete position fixes asynchronously while
//! subscribed. Platform adapters (device GPS, replay files) implement
//! [`SampleSource`]; delivered fixes are pushed into
//! [`RecordingController::handle_fix`](crate::RecordingController::handle_fix),
//! which gates storage on recording state.

use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, Result};

/// A raw position fix as delivered by the source, before it is tagged with
/// a session id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Reported accuracy in meters
    pub accuracy_meters: f64,
    /// Capture time, epoch milliseconds
    pub timestamp_ms: i64,
    /// Device-reported speed in km/h, if available
    pub speed_kmh: Option<f64>,
}

impl PositionFix {
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
            timestamp_ms,
            speed_kmh: None,
        }
    }
}

/// External position source. Fixes are only delivered while subscribed.
///
/// `subscribe` fails with [`RecorderError::SourceUnavailable`] when the
/// platform refuses (permission denied, hardware absent); the recorder
/// leaves its state unchanged in that case.
pub trait SampleSource {
    /// Begin delivering fixes. Idempotent when already subscribed.
    fn subscribe(&mut self) -> Result<()>;

    /// Stop delivering fixes. Idempotent when not subscribed.
    fn unsubscribe(&mut self);

    /// Whether the source is currently delivering fixes.
    fn is_subscribed(&self) -> bool;
}

/// In-process source for tests and replay: fixes are fed manually into the
/// controller, this type only models subscription state and availability.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    subscribed: bool,
    /// When true, `subscribe` fails as if the platform refused.
    pub unavailable: bool,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose `subscribe` always fails.
    pub fn unavailable() -> Self {
        Self {
            subscribed: false,
            unavailable: true,
        }
    }
}

impl SampleSource for ScriptedSource {
    fn subscribe(&mut self) -> Result<()> {
        if self.unavailable {
            return Err(RecorderError::source_unavailable(
                "scripted source marked unavailable",
            ));
        }
        self.subscribed = true;
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.subscribed = false;
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed
    }
}
