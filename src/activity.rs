//! App-layer Activity model.
//!
//! Only the slice of an Activity this subsystem owns is modeled: the
//! recorded routes and their derived totals. The three GPS-tracked activity
//! kinds share one `{routes, duration, distance, status}` payload with a
//! `type` discriminant rather than duplicating it per kind.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::stats::{AggregateStats, RouteStats};
use crate::Route;

/// Activity kind discriminant for GPS-tracked activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityKind {
    Driving,
    Running,
    SwimmingRecording,
}

/// Completion status of a recorded activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityStatus {
    InProgress,
    Completed,
}

/// The recorded slice shared by all GPS-tracked activity kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedActivity {
    /// Zero or more finalized routes; ids unique within the collection
    pub routes: Vec<Route>,
    /// Total duration across routes, seconds
    pub duration_seconds: f64,
    /// Total distance across routes, meters
    pub distance_meters: f64,
    pub status: ActivityStatus,
}

impl RecordedActivity {
    pub fn empty() -> Self {
        Self {
            routes: Vec::new(),
            duration_seconds: 0.0,
            distance_meters: 0.0,
            status: ActivityStatus::InProgress,
        }
    }
}

/// An activity as seen by the recording subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    /// Calendar date the activity belongs to
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(flatten)]
    pub recording: RecordedActivity,
}

impl Activity {
    pub fn new(id: &str, date: NaiveDate, kind: ActivityKind) -> Self {
        Self {
            id: id.to_string(),
            date,
            kind,
            recording: RecordedActivity::empty(),
        }
    }

    /// Ids of the routes currently attached.
    pub fn route_ids(&self) -> Vec<String> {
        self.recording.routes.iter().map(|r| r.id.clone()).collect()
    }

    /// Merge one route into the collection.
    ///
    /// A route with an id already present overwrites it rather than
    /// duplicating, keeping ids unique and making at-least-once saves safe.
    pub fn merge_route(&mut self, route: Route) {
        if let Some(existing) = self
            .recording
            .routes
            .iter_mut()
            .find(|r| r.id == route.id)
        {
            *existing = route;
        } else {
            self.recording.routes.push(route);
        }
        self.recompute_totals();
    }

    /// Remove one route by id. Returns whether anything was removed.
    pub fn remove_route(&mut self, route_id: &str) -> bool {
        let before = self.recording.routes.len();
        self.recording.routes.retain(|r| r.id != route_id);
        let removed = self.recording.routes.len() != before;
        if removed {
            self.recompute_totals();
        }
        removed
    }

    /// Recompute the duration/distance totals from the attached routes.
    pub fn recompute_totals(&mut self) {
        let per_route: Vec<RouteStats> = self
            .recording
            .routes
            .iter()
            .map(|r| RouteStats::from_samples(&r.geolocations))
            .collect();
        let agg = AggregateStats::from_routes(&per_route);
        self.recording.duration_seconds = agg.total_duration_seconds;
        self.recording.distance_meters = agg.total_distance_meters;
    }
}
