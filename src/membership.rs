// Membership lifecycle: the authorization rows created when projects and
// accounts appear, and the level changes made by project administrators.

use tracing::info;

use crate::authorization::{Authorization, AuthorizationStore};
use crate::errors::{AccessError, AccessResult};
use crate::identity::User;
use crate::project::Project;
use crate::rank::{RankLadder, UserLevel};

pub struct Membership<'a, S: ?Sized> {
    store: &'a S,
    ladder: &'a RankLadder,
}

impl<'a, S> Membership<'a, S>
where
    S: AuthorizationStore + ?Sized,
{
    pub fn new(store: &'a S, ladder: &'a RankLadder) -> Self {
        Self { store, ladder }
    }

    /// The creator administers the new project; every other active account
    /// becomes a logged user on it. Existing rows of other users are kept.
    pub fn on_project_created(
        &self,
        project: &Project,
        creator: &User,
        active_users: &[User],
    ) -> AccessResult<usize> {
        project.validate(self.ladder)?;
        require_account(creator)?;

        self.store
            .upsert(Authorization::new(creator.id, project.id, UserLevel::Admin))?;
        let mut created = 1;

        for user in active_users {
            if user.id == creator.id || !user.is_active || !user.is_authenticated {
                continue;
            }
            if self
                .store
                .insert_if_absent(Authorization::new(user.id, project.id, UserLevel::LoggedUser))?
            {
                created += 1;
            }
        }

        info!(
            project = %project.slug,
            creator = %creator.id,
            rows = created,
            "project memberships created"
        );
        Ok(created)
    }

    /// A new account becomes a logged user on every existing project.
    pub fn on_user_created(&self, user: &User, projects: &[Project]) -> AccessResult<usize> {
        require_account(user)?;

        let mut created = 0;
        for project in projects {
            if self
                .store
                .insert_if_absent(Authorization::new(user.id, project.id, UserLevel::LoggedUser))?
            {
                created += 1;
            }
        }

        info!(user = %user.id, rows = created, "account memberships created");
        Ok(created)
    }

    /// A deactivated account drops to the anonymous level everywhere.
    pub fn on_user_deactivated(&self, user: &User, projects: &[Project]) -> AccessResult<()> {
        require_account(user)?;

        for project in projects {
            self.store
                .upsert(Authorization::new(user.id, project.id, UserLevel::Anonymous))?;
        }

        info!(user = %user.id, projects = projects.len(), "account memberships revoked");
        Ok(())
    }

    /// Change a member's level on a project.
    pub fn set_member_level(
        &self,
        user: &User,
        project: &Project,
        level: UserLevel,
    ) -> AccessResult<()> {
        require_account(user)?;
        if level == UserLevel::Anonymous {
            return Err(AccessError::validation(
                "level",
                "members cannot be assigned the anonymous level",
            ));
        }
        if self.ladder.rank_of(level).is_none() {
            return Err(AccessError::config(format!(
                "level '{level}' is not part of the configured ladder"
            )));
        }

        self.store
            .upsert(Authorization::new(user.id, project.id, level))?;
        info!(user = %user.id, project = %project.slug, level = %level, "member level set");
        Ok(())
    }

    /// Drop the explicit row; the user falls back to the default rank.
    pub fn remove_member(&self, user: &User, project: &Project) -> AccessResult<bool> {
        let removed = self.store.remove(&user.id, &project.id)?;
        if removed {
            info!(user = %user.id, project = %project.slug, "member removed");
        }
        Ok(removed)
    }
}

fn require_account(user: &User) -> AccessResult<()> {
    user.check()?;
    if !user.is_authenticated {
        return Err(AccessError::precondition(
            "membership rows require an authenticated account",
        ));
    }
    Ok(())
}
