//! Recording lifecycle integration tests.
//!
//! Exercises the full pipeline: controller -> ping store -> save pipeline ->
//! repository, including crash recovery against an on-disk database.
//!
//! Run with: `cargo test --test recording_lifecycle`

use chrono::NaiveDate;
use tempfile::TempDir;

use route_recorder::{
    Activity, ActivityKind, ActivityRepository, PingStore, PositionFix, RecorderError,
    RecordingController, RecordingState, Result, Route, RouteStats, SavePipeline, ScriptedSource,
};

/// Repository double recording every call, optionally failing updates.
#[derive(Default)]
struct MockRepository {
    fail_updates: bool,
    updates: Vec<(String, Vec<String>)>,
    deletions: Vec<(String, Vec<String>)>,
}

impl ActivityRepository for MockRepository {
    fn create_activity(&mut self, _user_id: &str, _activity: &Activity) -> Result<()> {
        Ok(())
    }

    fn update_activity(
        &mut self,
        _user_id: &str,
        activity_id: &str,
        routes_to_merge: &[Route],
    ) -> Result<()> {
        if self.fail_updates {
            return Err(RecorderError::persistence("repository unreachable"));
        }
        self.updates.push((
            activity_id.to_string(),
            routes_to_merge.iter().map(|r| r.id.clone()).collect(),
        ));
        Ok(())
    }

    fn delete_routes(
        &mut self,
        _user_id: &str,
        activity_id: &str,
        route_ids: &[String],
    ) -> Result<()> {
        self.deletions
            .push((activity_id.to_string(), route_ids.to_vec()));
        Ok(())
    }
}

fn controller() -> RecordingController<ScriptedSource> {
    RecordingController::new(PingStore::in_memory().unwrap(), ScriptedSource::new())
}

fn pipeline() -> SavePipeline<MockRepository> {
    SavePipeline::new(MockRepository::default(), "user-1")
}

fn activity() -> Activity {
    Activity::new(
        "act-1",
        NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
        ActivityKind::Running,
    )
}

/// Fixes ~100 m apart northward, 10 s apart.
fn fix(i: i64) -> PositionFix {
    PositionFix::new(0.0009 * i as f64, 0.0, 5.0, 10_000 + i * 10_000)
}

// ============================================================================
// Save and Discard Round Trips
// ============================================================================

#[test]
fn save_round_trip_moves_samples_into_one_route() {
    let mut rec = controller();
    let mut pipe = pipeline();
    let mut act = activity();

    rec.start().unwrap();
    // Deliver out of timestamp order; the saved route must still be sorted.
    for i in [2, 0, 4, 1, 3] {
        assert!(rec.handle_fix(fix(i)).unwrap());
    }
    let session_id = rec.session().unwrap().session_id.clone();
    rec.stop();

    let route = rec.confirm_save(&mut pipe, &mut act).unwrap().unwrap();

    assert_eq!(rec.state(), RecordingState::NotStarted);
    assert!(rec.session().is_none());
    assert_eq!(rec.store().count_for_session(&session_id).unwrap(), 0);

    assert_eq!(act.recording.routes.len(), 1);
    assert_eq!(route.geolocations.len(), 5);
    let times: Vec<i64> = route.geolocations.iter().map(|s| s.timestamp_ms).collect();
    let mut sorted = times.clone();
    sorted.sort();
    assert_eq!(times, sorted);

    assert_eq!(pipe.repo().updates.len(), 1);
}

#[test]
fn discard_round_trip_leaves_activity_unchanged() {
    let mut rec = controller();
    let mut act = activity();

    rec.start().unwrap();
    for i in 0..3 {
        rec.handle_fix(fix(i)).unwrap();
    }
    let session_id = rec.session().unwrap().session_id.clone();

    rec.reset().unwrap();

    assert_eq!(rec.store().count_for_session(&session_id).unwrap(), 0);
    assert!(act.recording.routes.is_empty());
    assert_eq!(act.recording.distance_meters, 0.0);
}

#[test]
fn confirm_save_outside_stopped_is_a_noop() {
    let mut rec = controller();
    let mut pipe = pipeline();
    let mut act = activity();

    rec.start().unwrap();
    rec.handle_fix(fix(0)).unwrap();

    // Still recording: save refused as a no-op, nothing mutated.
    assert!(rec.confirm_save(&mut pipe, &mut act).unwrap().is_none());
    assert_eq!(rec.state(), RecordingState::Recording);
    assert!(pipe.repo().updates.is_empty());
}

#[test]
fn save_of_empty_session_is_refused() {
    let mut rec = controller();
    let mut pipe = pipeline();
    let mut act = activity();

    rec.start().unwrap();
    rec.stop();

    let err = rec.confirm_save(&mut pipe, &mut act).unwrap_err();
    assert!(matches!(err, RecorderError::EmptySession { .. }));
    // Refusal keeps the recorder in STOPPED for an explicit reset.
    assert_eq!(rec.state(), RecordingState::Stopped);
    assert!(act.recording.routes.is_empty());
}

// ============================================================================
// Pause Semantics
// ============================================================================

#[test]
fn samples_delivered_while_paused_never_reach_the_route() {
    let mut rec = controller();
    let mut pipe = pipeline();
    let mut act = activity();

    rec.start().unwrap();
    for i in 0..5 {
        assert!(rec.handle_fix(fix(i)).unwrap());
    }
    rec.pause();
    assert!(!rec.handle_fix(fix(5)).unwrap());

    rec.stop();
    let route = rec.confirm_save(&mut pipe, &mut act).unwrap().unwrap();
    assert_eq!(route.geolocations.len(), 5);
}

#[test]
fn pause_resume_produces_one_continuous_session() {
    let mut rec = controller();
    let mut pipe = pipeline();
    let mut act = activity();

    rec.start().unwrap();
    rec.handle_fix(fix(0)).unwrap();
    rec.pause();
    rec.start().unwrap(); // resume reuses the session id
    rec.handle_fix(fix(1)).unwrap();
    rec.stop();

    let route = rec.confirm_save(&mut pipe, &mut act).unwrap().unwrap();
    assert_eq!(route.geolocations.len(), 2);
    assert_eq!(act.recording.routes.len(), 1);
}

// ============================================================================
// Failure Handling
// ============================================================================

#[test]
fn failed_save_keeps_samples_and_stopped_state_for_retry() {
    let mut rec = controller();
    let mut repo = MockRepository::default();
    repo.fail_updates = true;
    let mut pipe = SavePipeline::new(repo, "user-1");
    let mut act = activity();

    rec.start().unwrap();
    for i in 0..4 {
        rec.handle_fix(fix(i)).unwrap();
    }
    let session_id = rec.session().unwrap().session_id.clone();
    rec.stop();

    let err = rec.confirm_save(&mut pipe, &mut act).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(rec.state(), RecordingState::Stopped);
    assert_eq!(rec.store().count_for_session(&session_id).unwrap(), 4);
    assert!(act.recording.routes.is_empty());

    // Retry once the repository recovers.
    let mut good = SavePipeline::new(MockRepository::default(), "user-1");
    let route = rec.confirm_save(&mut good, &mut act).unwrap().unwrap();
    assert_eq!(route.geolocations.len(), 4);
    assert_eq!(rec.state(), RecordingState::NotStarted);
    assert_eq!(rec.store().count_for_session(&session_id).unwrap(), 0);
}

#[test]
fn unavailable_source_refuses_start() {
    let store = PingStore::in_memory().unwrap();
    let mut rec = RecordingController::new(store, ScriptedSource::unavailable());

    assert!(rec.start().is_err());
    assert_eq!(rec.state(), RecordingState::NotStarted);
}

// ============================================================================
// Crash Recovery (on-disk store)
// ============================================================================

#[test]
fn orphaned_session_survives_restart_and_can_be_saved() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("pings.db");
    let db_path = db_path.to_str().unwrap();

    // First run: record, then "crash" (drop controller without stop/save).
    let orphan_id = {
        let store = PingStore::open(db_path).unwrap();
        let mut rec = RecordingController::new(store, ScriptedSource::new());
        rec.start().unwrap();
        for i in 0..3 {
            rec.handle_fix(fix(i)).unwrap();
        }
        rec.session().unwrap().session_id.clone()
    };

    // Second run: the session is still there, enumerable, and saveable.
    let store = PingStore::open(db_path).unwrap();
    let rec = RecordingController::new(store, ScriptedSource::new());
    assert_eq!(rec.orphaned_sessions().unwrap(), vec![orphan_id.clone()]);

    let mut pipe = pipeline();
    let mut act = activity();
    let route = pipe
        .save_session(rec.store(), &orphan_id, &mut act)
        .unwrap();
    assert_eq!(route.geolocations.len(), 3);
    assert_eq!(rec.store().count_for_session(&orphan_id).unwrap(), 0);
}

#[test]
fn exit_preserves_samples_and_activity_deletion_purges_them() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("pings.db");
    let db_path = db_path.to_str().unwrap();

    let store = PingStore::open(db_path).unwrap();
    let mut rec = RecordingController::new(store, ScriptedSource::new());
    rec.start().unwrap();
    rec.handle_fix(fix(0)).unwrap(); // timestamp 10s epoch => 1970-01-01
    let orphan = rec.exit().unwrap();

    assert_eq!(rec.store().count_for_session(&orphan.session_id).unwrap(), 1);

    // Deleting the activity for that date purges the orphaned samples.
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    rec.store().delete_by_activity_date(epoch).unwrap();
    assert_eq!(rec.store().count_for_session(&orphan.session_id).unwrap(), 0);
}

// ============================================================================
// Route Deletion
// ============================================================================

#[test]
fn delete_route_targets_exactly_one_id() {
    let mut rec = controller();
    let mut pipe = pipeline();
    let mut act = activity();

    // Save two independent sessions as two routes.
    let mut route_ids = Vec::new();
    for _ in 0..2 {
        rec.start().unwrap();
        for i in 0..2 {
            rec.handle_fix(fix(i)).unwrap();
        }
        rec.stop();
        let route = rec.confirm_save(&mut pipe, &mut act).unwrap().unwrap();
        route_ids.push(route.id);
    }
    assert_eq!(act.recording.routes.len(), 2);

    pipe.delete_route(&mut act, &route_ids[0]).unwrap();

    assert_eq!(act.route_ids(), vec![route_ids[1].clone()]);
    assert_eq!(pipe.repo().deletions.len(), 1);
    assert_eq!(pipe.repo().deletions[0].1, vec![route_ids[0].clone()]);
}

// ============================================================================
// Live Statistics
// ============================================================================

#[test]
fn live_stats_track_the_active_session() {
    let mut rec = controller();

    rec.start().unwrap();
    for i in 0..3 {
        rec.handle_fix(fix(i)).unwrap();
    }

    let stats: RouteStats = rec.live_stats().unwrap().unwrap();
    assert_eq!(stats.duration_seconds, 20.0);
    assert!((stats.distance_meters - 200.0).abs() < 10.0);
    assert!((stats.avg_speed_kmh - 36.0).abs() < 2.0);
}
