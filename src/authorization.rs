use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AccessError, AccessResult};
use crate::identity::UserId;
use crate::project::{Project, ProjectId};
use crate::rank::UserLevel;

/// Role of one user on one project. At most one row exists per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub level: UserLevel,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl Authorization {
    pub fn new(user_id: UserId, project_id: ProjectId, level: UserLevel) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            project_id,
            level,
            created_on: now,
            updated_on: now,
        }
    }
}

/// Keyed storage for authorization rows.
///
/// `upsert` replaces the row for the `(user, project)` pair, keeping the
/// first `created_on`. Implementations must never hold two rows for one
/// pair.
pub trait AuthorizationStore: Send + Sync {
    fn find(&self, user_id: &UserId, project_id: &ProjectId) -> AccessResult<Option<Authorization>>;

    fn upsert(&self, authorization: Authorization) -> AccessResult<()>;

    /// Stores the row only when the pair has none yet, atomically. Returns
    /// whether it was stored; an existing row is never touched.
    fn insert_if_absent(&self, authorization: Authorization) -> AccessResult<bool>;

    /// Returns whether a row was removed.
    fn remove(&self, user_id: &UserId, project_id: &ProjectId) -> AccessResult<bool>;

    fn list_for_user(&self, user_id: &UserId) -> AccessResult<Vec<Authorization>>;

    fn list_for_project(&self, project_id: &ProjectId) -> AccessResult<Vec<Authorization>>;
}

/// Project catalogue, needed when a decision spans every project.
pub trait ProjectStore: Send + Sync {
    /// Inserts or updates a project. A slug already held by a project with
    /// another id is a validation error: authorization rows are keyed by id.
    fn put_project(&self, project: Project) -> AccessResult<()>;

    fn get_project(&self, slug: &str) -> AccessResult<Option<Project>>;

    /// All projects, ordered by title.
    fn list_projects(&self) -> AccessResult<Vec<Project>>;
}

/// Keep `created_on` of an existing row when it is replaced.
pub(crate) fn merge_upsert(existing: Option<&Authorization>, mut incoming: Authorization) -> Authorization {
    if let Some(previous) = existing {
        incoming.created_on = previous.created_on;
        if incoming.updated_on < previous.updated_on {
            incoming.updated_on = previous.updated_on;
        }
    }
    incoming
}

/// Reject replacing a stored project by one with the same slug and a new id.
pub(crate) fn check_slug_owner(existing: Option<&Project>, incoming: &Project) -> AccessResult<()> {
    match existing {
        Some(stored) if stored.id != incoming.id => Err(AccessError::validation(
            "slug",
            format!(
                "slug '{}' already belongs to project {}",
                incoming.slug, stored.id
            ),
        )),
        _ => Ok(()),
    }
}

/// Both stores behind one object, as the CLI opens them.
pub trait AccessStore: AuthorizationStore + ProjectStore {}

impl<T: AuthorizationStore + ProjectStore + ?Sized> AccessStore for T {}
