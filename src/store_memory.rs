use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::authorization::{
    check_slug_owner, merge_upsert, Authorization, AuthorizationStore, ProjectStore,
};
use crate::errors::{AccessResult, SafeReadLock, SafeWriteLock};
use crate::identity::UserId;
use crate::project::{Project, ProjectId};
use crate::rank::RankLadder;

/// In-process store used by tests and by the `memory` backend.
///
/// Projects are validated against the ladder on insert, so a stored project
/// always references ranks that exist.
pub struct MemoryStore {
    ladder: RankLadder,
    authorizations: RwLock<HashMap<(UserId, ProjectId), Authorization>>,
    projects: RwLock<HashMap<String, Project>>,
}

impl MemoryStore {
    pub fn new(ladder: RankLadder) -> Self {
        Self {
            ladder,
            authorizations: RwLock::new(HashMap::new()),
            projects: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(RankLadder::default())
    }
}

impl AuthorizationStore for MemoryStore {
    fn find(&self, user_id: &UserId, project_id: &ProjectId) -> AccessResult<Option<Authorization>> {
        let rows = self.authorizations.safe_read()?;
        Ok(rows.get(&(*user_id, *project_id)).cloned())
    }

    fn upsert(&self, authorization: Authorization) -> AccessResult<()> {
        let mut rows = self.authorizations.safe_write()?;
        let key = (authorization.user_id, authorization.project_id);
        let merged = merge_upsert(rows.get(&key), authorization);
        rows.insert(key, merged);
        Ok(())
    }

    fn insert_if_absent(&self, authorization: Authorization) -> AccessResult<bool> {
        let mut rows = self.authorizations.safe_write()?;
        match rows.entry((authorization.user_id, authorization.project_id)) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(authorization);
                Ok(true)
            }
        }
    }

    fn remove(&self, user_id: &UserId, project_id: &ProjectId) -> AccessResult<bool> {
        let mut rows = self.authorizations.safe_write()?;
        Ok(rows.remove(&(*user_id, *project_id)).is_some())
    }

    fn list_for_user(&self, user_id: &UserId) -> AccessResult<Vec<Authorization>> {
        let rows = self.authorizations.safe_read()?;
        Ok(rows
            .values()
            .filter(|row| row.user_id == *user_id)
            .cloned()
            .collect())
    }

    fn list_for_project(&self, project_id: &ProjectId) -> AccessResult<Vec<Authorization>> {
        let rows = self.authorizations.safe_read()?;
        Ok(rows
            .values()
            .filter(|row| row.project_id == *project_id)
            .cloned()
            .collect())
    }
}

impl ProjectStore for MemoryStore {
    fn put_project(&self, project: Project) -> AccessResult<()> {
        project.validate(&self.ladder)?;
        let mut projects = self.projects.safe_write()?;
        check_slug_owner(projects.get(&project.slug), &project)?;
        projects.insert(project.slug.clone(), project);
        Ok(())
    }

    fn get_project(&self, slug: &str) -> AccessResult<Option<Project>> {
        let projects = self.projects.safe_read()?;
        Ok(projects.get(slug).cloned())
    }

    fn list_projects(&self) -> AccessResult<Vec<Project>> {
        let projects = self.projects.safe_read()?;
        let mut all: Vec<Project> = projects.values().cloned().collect();
        all.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.slug.cmp(&b.slug)));
        Ok(all)
    }
}
