//! # Route Statistics Engine
//!
//! Pure functions computing per-route and cross-route metrics from ordered
//! sample sequences.
//!
//! The engine never trusts caller ordering: every computation sorts by the
//! timestamp field first, because storage appends may complete out of order.
//! Malformed samples (invalid coordinates, missing timestamp) are skipped
//! from aggregation rather than aborting the whole computation.

use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

use crate::{GeoSample, GpsPoint};

const MS_PER_SECOND: f64 = 1000.0;
const MPS_TO_KMH: f64 = 3.6;

/// Keep every Nth point when display smoothing is enabled.
const SMOOTHING_STRIDE: usize = 3;

// ============================================================================
// Per-Route Metrics
// ============================================================================

/// Metrics derived from one route's sample sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStats {
    /// Elapsed time from first to last sample, seconds (>= 0)
    pub duration_seconds: f64,
    /// Sum of great-circle distances between consecutive points, meters
    pub distance_meters: f64,
    /// Maximum per-segment speed, km/h (zero-time segments excluded)
    pub max_speed_kmh: f64,
    /// Time-weighted average: total distance / total duration, km/h
    pub avg_speed_kmh: f64,
    /// Arithmetic mean of sample accuracies, meters
    pub avg_accuracy_meters: f64,
    /// Serialized size of the sample sequence, bytes (informational)
    pub data_size_bytes: u64,
    /// Timestamp of the earliest sample, epoch ms
    pub start_ms: Option<i64>,
    /// Timestamp of the latest sample, epoch ms
    pub end_ms: Option<i64>,
}

impl RouteStats {
    /// Compute metrics over a sample sequence.
    ///
    /// Sorts by timestamp defensively and skips malformed samples. An empty
    /// (or all-malformed) input yields all-zero stats.
    pub fn from_samples(samples: &[GeoSample]) -> Self {
        let data_size_bytes = serde_json::to_vec(samples).map(|v| v.len() as u64).unwrap_or(0);

        let mut ordered: Vec<&GeoSample> =
            samples.iter().filter(|s| s.is_well_formed()).collect();
        ordered.sort_by_key(|s| s.timestamp_ms);

        if ordered.is_empty() {
            return Self {
                duration_seconds: 0.0,
                distance_meters: 0.0,
                max_speed_kmh: 0.0,
                avg_speed_kmh: 0.0,
                avg_accuracy_meters: 0.0,
                data_size_bytes,
                start_ms: None,
                end_ms: None,
            };
        }

        let start_ms = ordered[0].timestamp_ms;
        let end_ms = ordered[ordered.len() - 1].timestamp_ms;
        let duration_seconds = ((end_ms - start_ms) as f64 / MS_PER_SECOND).max(0.0);

        let mut distance_meters = 0.0;
        let mut max_speed_kmh: f64 = 0.0;

        for pair in ordered.windows(2) {
            let segment_meters = haversine_distance(&pair[0].point(), &pair[1].point());
            distance_meters += segment_meters;

            // Zero-time segments are skipped from speed computation,
            // never treated as infinite.
            let segment_seconds =
                (pair[1].timestamp_ms - pair[0].timestamp_ms) as f64 / MS_PER_SECOND;
            if segment_seconds > 0.0 {
                let segment_kmh = segment_meters / segment_seconds * MPS_TO_KMH;
                max_speed_kmh = max_speed_kmh.max(segment_kmh);
            }
        }

        // Time-weighted, not an average of per-segment speeds: avoids bias
        // from many short segments.
        let avg_speed_kmh = if duration_seconds > 0.0 {
            distance_meters / duration_seconds * MPS_TO_KMH
        } else {
            0.0
        };

        let avg_accuracy_meters =
            ordered.iter().map(|s| s.accuracy_meters).sum::<f64>() / ordered.len() as f64;

        Self {
            duration_seconds,
            distance_meters,
            max_speed_kmh,
            avg_speed_kmh,
            avg_accuracy_meters,
            data_size_bytes,
            start_ms: Some(start_ms),
            end_ms: Some(end_ms),
        }
    }
}

// ============================================================================
// Cross-Route Aggregation
// ============================================================================

/// Metrics aggregated across N routes viewed together.
///
/// Average speed and accuracy use equal per-route weighting (arithmetic mean
/// of per-route values), not sample weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    /// Max of per-route max speeds, km/h
    pub max_speed_kmh: f64,
    /// Mean of per-route average speeds, km/h
    pub avg_speed_kmh: f64,
    /// Mean of per-route average accuracies, meters
    pub avg_accuracy_meters: f64,
    /// Sum of per-route durations, seconds
    pub total_duration_seconds: f64,
    /// Sum of per-route distances, meters
    pub total_distance_meters: f64,
    /// Earliest route start across all routes, epoch ms
    pub window_start_ms: Option<i64>,
    /// Latest route end across all routes, epoch ms
    pub window_end_ms: Option<i64>,
}

impl AggregateStats {
    /// Aggregate per-route stats. Empty input yields all-zero stats.
    pub fn from_routes(routes: &[RouteStats]) -> Self {
        if routes.is_empty() {
            return Self {
                max_speed_kmh: 0.0,
                avg_speed_kmh: 0.0,
                avg_accuracy_meters: 0.0,
                total_duration_seconds: 0.0,
                total_distance_meters: 0.0,
                window_start_ms: None,
                window_end_ms: None,
            };
        }

        let n = routes.len() as f64;

        Self {
            max_speed_kmh: routes.iter().map(|r| r.max_speed_kmh).fold(0.0, f64::max),
            avg_speed_kmh: routes.iter().map(|r| r.avg_speed_kmh).sum::<f64>() / n,
            avg_accuracy_meters: routes.iter().map(|r| r.avg_accuracy_meters).sum::<f64>() / n,
            total_duration_seconds: routes.iter().map(|r| r.duration_seconds).sum(),
            total_distance_meters: routes.iter().map(|r| r.distance_meters).sum(),
            window_start_ms: routes.iter().filter_map(|r| r.start_ms).min(),
            window_end_ms: routes.iter().filter_map(|r| r.end_ms).max(),
        }
    }
}

// ============================================================================
// Display Decimation
// ============================================================================

/// Prepare a route's points for rendering.
///
/// With smoothing enabled, keeps every 3rd point; otherwise every point.
/// Never mutates the stored route.
pub fn decimate_for_display(samples: &[GeoSample], smoothing: bool) -> Vec<GpsPoint> {
    samples
        .iter()
        .enumerate()
        .filter(|(i, _)| !smoothing || i % SMOOTHING_STRIDE == 0)
        .map(|(_, s)| s.point())
        .collect()
}

/// Great-circle distance between two GPS points in meters.
fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

// ============================================================================
// Tests
// ============================================================================
