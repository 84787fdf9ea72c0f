use std::collections::BTreeMap;

use tracing::debug;

use crate::authorization::{AuthorizationStore, ProjectStore};
use crate::errors::{AccessError, AccessResult};
use crate::identity::User;
use crate::project::Project;
use crate::rank::{Rank, RankLadder};

/// Resolves a user's effective rank on a project.
pub struct RankResolver<'a, S: ?Sized> {
    store: &'a S,
    ladder: &'a RankLadder,
}

impl<'a, S> RankResolver<'a, S>
where
    S: AuthorizationStore + ?Sized,
{
    pub fn new(store: &'a S, ladder: &'a RankLadder) -> Self {
        Self { store, ladder }
    }

    /// Rank from the explicit authorization row, or the default for the
    /// user's authentication state when no row exists.
    ///
    /// A missing row is not an error. A failing store is, and so is a row
    /// whose level is not on the configured ladder.
    pub fn get_rank(&self, user: &User, project: &Project) -> AccessResult<Rank> {
        let row = if user.is_authenticated {
            self.store.find(&user.id, &project.id)?
        } else {
            None
        };

        let rank = match row {
            Some(authorization) => self.ladder.rank_of(authorization.level).ok_or_else(|| {
                AccessError::config(format!(
                    "authorization of user {} on project '{}' uses level '{}' absent from the ladder",
                    user.id, project.slug, authorization.level
                ))
            })?,
            None if user.is_authenticated => self.ladder.logged_user(),
            None => self.ladder.anonymous(),
        };

        debug!(user = %user.id, project = %project.slug, rank = %rank, "resolved rank");
        Ok(rank)
    }
}

impl<'a, S> RankResolver<'a, S>
where
    S: AuthorizationStore + ProjectStore + ?Sized,
{
    /// Display label of the user's level on every project, keyed by slug.
    /// Presentation only.
    pub fn get_user_level_projects(&self, user: &User) -> AccessResult<BTreeMap<String, String>> {
        let mut levels = BTreeMap::new();
        for project in self.store.list_projects()? {
            let rank = self.get_rank(user, &project)?;
            let label = self.ladder.label_of(rank)?;
            levels.insert(project.slug.clone(), label.to_string());
        }
        Ok(levels)
    }
}
