//! # Save / Reconciliation Pipeline
//!
//! Turns a finished session's samples into a Route, merges it into an
//! Activity via the remote repository, and clears local state only once the
//! remote accepted it. Captured data is never discarded on a failed save.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{RecorderError, Result};
use crate::store::PingStore;
use crate::{Activity, Route};

/// Remote Activity repository boundary (external collaborator).
///
/// `update_activity` receives the session's newly finalized routes to be
/// merged into the activity, not a full replacement list. The call is safe
/// under at-least-once retry provided the same route id is reused: duplicate
/// identical ids overwrite, not duplicate.
pub trait ActivityRepository {
    fn create_activity(&mut self, user_id: &str, activity: &Activity) -> Result<()>;

    fn update_activity(
        &mut self,
        user_id: &str,
        activity_id: &str,
        routes_to_merge: &[Route],
    ) -> Result<()>;

    fn delete_routes(
        &mut self,
        user_id: &str,
        activity_id: &str,
        route_ids: &[String],
    ) -> Result<()>;
}

/// Route id held across a failed save so a retry reuses it.
#[derive(Debug, Clone)]
struct PendingSave {
    session_id: String,
    route_id: String,
}

/// Save pipeline bound to one user and one repository.
pub struct SavePipeline<R: ActivityRepository> {
    repo: R,
    user_id: String,
    pending: Option<PendingSave>,
}

impl<R: ActivityRepository> SavePipeline<R> {
    pub fn new(repo: R, user_id: &str) -> Self {
        Self {
            repo,
            user_id: user_id.to_string(),
            pending: None,
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Persist a finished session as one Route on the given Activity.
    ///
    /// Refuses with `EmptySession` when no samples are stored. On success
    /// the session's local samples are deleted; on persistence failure they
    /// are retained and the same route id will be reused on retry.
    pub fn save_session(
        &mut self,
        store: &PingStore,
        session_id: &str,
        activity: &mut Activity,
    ) -> Result<Route> {
        let samples = store.query_by_session(session_id)?;
        if samples.is_empty() {
            return Err(RecorderError::EmptySession {
                session_id: session_id.to_string(),
            });
        }

        let route_id = match &self.pending {
            Some(p) if p.session_id == session_id => p.route_id.clone(),
            _ => format!("route_{}", Uuid::new_v4()),
        };

        // query_by_session returns timestamp-ascending order already.
        let route = Route {
            id: route_id.clone(),
            created_at: Utc::now(),
            geolocations: samples,
        };

        if let Err(e) = self
            .repo
            .update_activity(&self.user_id, &activity.id, std::slice::from_ref(&route))
        {
            self.pending = Some(PendingSave {
                session_id: session_id.to_string(),
                route_id,
            });
            log::warn!(
                "[SavePipeline] Save failed for session {} (samples retained): {}",
                session_id,
                e
            );
            return Err(e);
        }

        activity.merge_route(route.clone());
        store.delete_by_session(session_id)?;
        self.pending = None;

        log::info!(
            "[SavePipeline] Session {} saved as route {} ({} samples)",
            session_id,
            route.id,
            route.geolocations.len()
        );
        Ok(route)
    }

    /// Remove one route, optimistically locally and via the repository.
    ///
    /// Issues exactly one `delete_routes` call carrying that id.
    pub fn delete_route(&mut self, activity: &mut Activity, route_id: &str) -> Result<()> {
        activity.remove_route(route_id);
        self.repo
            .delete_routes(&self.user_id, &activity.id, &[route_id.to_string()])
    }

    /// Reconcile a full edit of an Activity's route list.
    ///
    /// Deletions are the set difference between the ids present before and
    /// after editing, so a merely-reordered route is never deleted. Issues
    /// one `delete_routes` call when anything disappeared.
    pub fn reconcile_route_edit(
        &mut self,
        activity_id: &str,
        before_ids: &[String],
        after_ids: &[String],
    ) -> Result<Vec<String>> {
        let removed = routes_to_delete(before_ids, after_ids);
        if !removed.is_empty() {
            self.repo
                .delete_routes(&self.user_id, activity_id, &removed)?;
        }
        Ok(removed)
    }
}

/// Ids present before an edit but absent after it.
pub fn routes_to_delete(before_ids: &[String], after_ids: &[String]) -> Vec<String> {
    before_ids
        .iter()
        .filter(|id| !after_ids.contains(id))
        .cloned()
        .collect()
}
