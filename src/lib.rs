//! # Route Recorder
//!
//! Local-first GPS route recording for tracked activities (driving, running,
//! open-water swimming).
//!
//! This library provides:
//! - A recording state machine governing session lifecycle (start/pause/stop)
//! - Durable local sample storage that survives process restarts
//! - A pure statistics engine (speed, distance, duration, accuracy)
//! - A save pipeline reconciling captured samples into an Activity's routes
//!
//! ## Quick Start
//!
//! ```rust
//! use route_recorder::{GeoSample, RouteStats};
//!
//! let samples = vec![
//!     GeoSample::new("session-1", 51.5074, -0.1278, 5.0, 1_000),
//!     GeoSample::new("session-1", 51.5080, -0.1290, 5.0, 11_000),
//! ];
//!
//! let stats = RouteStats::from_samples(&samples);
//! assert!(stats.distance_meters > 0.0);
//! assert_eq!(stats.duration_seconds, 10.0);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{RecorderError, Result};

// Durable local ping store (SQLite append log)
pub mod store;
pub use store::PingStore;

// Geolocation sample source boundary
pub mod source;
pub use source::{PositionFix, SampleSource, ScriptedSource};

// Recording state machine
pub mod recorder;
pub use recorder::{RecordingController, RecordingState, SessionContext};

// Pure route statistics engine
pub mod stats;
pub use stats::{decimate_for_display, AggregateStats, RouteStats};

// Activity model (shared recorded slice across activity kinds)
pub mod activity;
pub use activity::{Activity, ActivityKind, ActivityStatus, RecordedActivity};

// Save / reconciliation pipeline against the remote repository
pub mod reconcile;
pub use reconcile::{routes_to_delete, ActivityRepository, SavePipeline};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A single recorded position sample, tagged with the session it belongs to.
///
/// This is also the persisted record shape in the local ping store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoSample {
    /// Session this sample was captured under
    pub session_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Reported fix accuracy in meters
    pub accuracy_meters: f64,
    /// Capture time, epoch milliseconds
    pub timestamp_ms: i64,
    /// Device-reported speed in km/h, if the fix carried one
    pub speed_kmh: Option<f64>,
}

impl GeoSample {
    /// Create a sample without a device-reported speed.
    pub fn new(
        session_id: &str,
        latitude: f64,
        longitude: f64,
        accuracy_meters: f64,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            latitude,
            longitude,
            accuracy_meters,
            timestamp_ms,
            speed_kmh: None,
        }
    }

    /// The sample's coordinate.
    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }

    /// A sample is well-formed when its coordinates are valid and its
    /// timestamp is positive. Malformed samples are skipped by the
    /// statistics engine rather than aborting computation.
    pub fn is_well_formed(&self) -> bool {
        self.point().is_valid() && self.timestamp_ms > 0 && self.accuracy_meters.is_finite()
    }
}

/// A finalized, persisted sequence of samples attached to an Activity.
///
/// Samples are ordered ascending by timestamp. A route is never empty:
/// the save pipeline refuses to build one from an empty session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Unique within the owning Activity's route collection
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub geolocations: Vec<GeoSample>,
}

impl Route {
    /// The route's samples sorted ascending by timestamp.
    ///
    /// Stored order already satisfies this after a save, but consumers may
    /// only rely on the timestamp field, so sort defensively here too.
    pub fn sorted_samples(&self) -> Vec<GeoSample> {
        let mut samples = self.geolocations.clone();
        samples.sort_by_key(|s| s.timestamp_ms);
        samples
    }
}

// ============================================================================
// Tests
// ============================================================================
