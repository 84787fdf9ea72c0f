use sled::Db;
use tracing::debug;

use crate::authorization::{
    check_slug_owner, merge_upsert, Authorization, AuthorizationStore, ProjectStore,
};
use crate::errors::{AccessError, AccessResult};
use crate::identity::UserId;
use crate::project::{Project, ProjectId};
use crate::rank::RankLadder;

const AUTHORIZATION_TREE: &str = "authorizations";
const PROJECT_TREE: &str = "projects";

/// Row key: user uuid bytes followed by project uuid bytes. One key per pair
/// is what enforces the single-row invariant.
fn pair_key(user_id: &UserId, project_id: &ProjectId) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(user_id.as_uuid().as_bytes());
    key[16..].copy_from_slice(project_id.as_uuid().as_bytes());
    key
}

/// A sled-backed implementation of both stores. Values are JSON documents.
pub struct SledStore {
    db: Db,
    ladder: RankLadder,
}

impl SledStore {
    /// Opens (or creates) the database at `path`.
    pub fn open(path: &str, ladder: RankLadder) -> AccessResult<Self> {
        let db = sled::open(path)
            .map_err(|e| AccessError::database(format!("open sled database at {path}"), e))?;
        debug!(path = %path, "opened authorization database");
        Ok(Self { db, ladder })
    }

    fn tree(&self, name: &str) -> AccessResult<sled::Tree> {
        self.db
            .open_tree(name)
            .map_err(|e| AccessError::database(format!("open tree '{name}'"), e))
    }

    fn decode_authorization(bytes: &[u8]) -> AccessResult<Authorization> {
        serde_json::from_slice(bytes)
            .map_err(|e| AccessError::serialization("decode authorization row", e))
    }

    fn decode_project(&self, bytes: &[u8]) -> AccessResult<Project> {
        let project: Project = serde_json::from_slice(bytes)
            .map_err(|e| AccessError::serialization("decode project record", e))?;
        // records written under another ladder must not be evaluated silently
        project.validate(&self.ladder)?;
        Ok(project)
    }

    fn merge_encoded(old: Option<&[u8]>, incoming: &Authorization) -> AccessResult<Vec<u8>> {
        let existing = old.map(Self::decode_authorization).transpose()?;
        let merged = merge_upsert(existing.as_ref(), incoming.clone());
        serde_json::to_vec(&merged)
            .map_err(|e| AccessError::serialization("encode authorization row", e))
    }

    fn collect_authorizations<F>(iter: sled::Iter, keep: F) -> AccessResult<Vec<Authorization>>
    where
        F: Fn(&Authorization) -> bool,
    {
        let mut rows = Vec::new();
        for item in iter {
            let (_, value) = item?;
            let row = Self::decode_authorization(&value)?;
            if keep(&row) {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

impl AuthorizationStore for SledStore {
    fn find(&self, user_id: &UserId, project_id: &ProjectId) -> AccessResult<Option<Authorization>> {
        let tree = self.tree(AUTHORIZATION_TREE)?;
        match tree.get(pair_key(user_id, project_id))? {
            Some(bytes) => Ok(Some(Self::decode_authorization(&bytes)?)),
            None => Ok(None),
        }
    }

    fn upsert(&self, authorization: Authorization) -> AccessResult<()> {
        let tree = self.tree(AUTHORIZATION_TREE)?;
        let key = pair_key(&authorization.user_id, &authorization.project_id);

        // The closure may run more than once under contention; only the
        // outcome of the last run counts.
        let mut failure = None;
        tree.update_and_fetch(key, |old| {
            failure = None;
            match Self::merge_encoded(old, &authorization) {
                Ok(data) => Some(data),
                Err(e) => {
                    failure = Some(e);
                    old.map(<[u8]>::to_vec)
                }
            }
        })?;
        if let Some(e) = failure {
            return Err(e);
        }
        tree.flush()?;
        Ok(())
    }

    fn insert_if_absent(&self, authorization: Authorization) -> AccessResult<bool> {
        let tree = self.tree(AUTHORIZATION_TREE)?;
        let key = pair_key(&authorization.user_id, &authorization.project_id);
        let data = serde_json::to_vec(&authorization)
            .map_err(|e| AccessError::serialization("encode authorization row", e))?;

        let inserted = tree
            .compare_and_swap(key, None::<&[u8]>, Some(data))?
            .is_ok();
        if inserted {
            tree.flush()?;
        }
        Ok(inserted)
    }

    fn remove(&self, user_id: &UserId, project_id: &ProjectId) -> AccessResult<bool> {
        let tree = self.tree(AUTHORIZATION_TREE)?;
        let removed = tree.remove(pair_key(user_id, project_id))?.is_some();
        tree.flush()?;
        Ok(removed)
    }

    fn list_for_user(&self, user_id: &UserId) -> AccessResult<Vec<Authorization>> {
        let tree = self.tree(AUTHORIZATION_TREE)?;
        Self::collect_authorizations(tree.scan_prefix(user_id.as_uuid().as_bytes()), |_| true)
    }

    fn list_for_project(&self, project_id: &ProjectId) -> AccessResult<Vec<Authorization>> {
        let tree = self.tree(AUTHORIZATION_TREE)?;
        Self::collect_authorizations(tree.iter(), |row| row.project_id == *project_id)
    }
}

impl ProjectStore for SledStore {
    fn put_project(&self, project: Project) -> AccessResult<()> {
        project.validate(&self.ladder)?;
        let tree = self.tree(PROJECT_TREE)?;
        let key = project.slug.as_bytes();
        let data = serde_json::to_vec(&project)
            .map_err(|e| AccessError::serialization("encode project record", e))?;

        loop {
            let current = tree.get(key)?;
            if let Some(bytes) = &current {
                let stored: Project = serde_json::from_slice(bytes)
                    .map_err(|e| AccessError::serialization("decode project record", e))?;
                check_slug_owner(Some(&stored), &project)?;
            }
            // retry when another writer changed the slug in between
            if tree.compare_and_swap(key, current, Some(data.clone()))?.is_ok() {
                break;
            }
        }
        tree.flush()?;
        Ok(())
    }

    fn get_project(&self, slug: &str) -> AccessResult<Option<Project>> {
        let tree = self.tree(PROJECT_TREE)?;
        match tree.get(slug.as_bytes())? {
            Some(bytes) => Ok(Some(self.decode_project(&bytes)?)),
            None => Ok(None),
        }
    }

    fn list_projects(&self) -> AccessResult<Vec<Project>> {
        let tree = self.tree(PROJECT_TREE)?;
        let mut projects = Vec::new();
        for item in tree.iter() {
            let (_, value) = item?;
            projects.push(self.decode_project(&value)?);
        }
        projects.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.slug.cmp(&b.slug)));
        Ok(projects)
    }
}
