//! Feature listing filter.
//!
//! Same rules as the capability map, expressed as a per-status predicate so
//! it can be applied to a whole listing. Ownership only ever widens what a
//! user sees: every restriction below applies to features of other users.

use serde::Serialize;
use tracing::{debug, warn};

use crate::authorization::AuthorizationStore;
use crate::capability::Capability;
use crate::errors::AccessResult;
use crate::evaluator::PermissionEvaluator;
use crate::feature::{Feature, FeatureStatus};
use crate::identity::{User, UserId};
use crate::project::{Project, ProjectId};
use crate::rank::RankLadder;

/// Who may see features of one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusRule {
    Everyone,
    OwnOnly,
    Nobody,
}

impl StatusRule {
    fn own_or_everyone(visible_to_all: bool) -> Self {
        if visible_to_all {
            StatusRule::Everyone
        } else {
            StatusRule::OwnOnly
        }
    }

    fn everyone_or_nobody(visible: bool) -> Self {
        if visible {
            StatusRule::Everyone
        } else {
            StatusRule::Nobody
        }
    }
}

/// Predicate over a project's features for one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFilter {
    project_id: Option<ProjectId>,
    viewer: Option<UserId>,
    draft: StatusRule,
    pending: StatusRule,
    published: StatusRule,
    archived: StatusRule,
}

impl FeatureFilter {
    /// Matches nothing.
    pub fn deny_all() -> Self {
        Self {
            project_id: None,
            viewer: None,
            draft: StatusRule::Nobody,
            pending: StatusRule::Nobody,
            published: StatusRule::Nobody,
            archived: StatusRule::Nobody,
        }
    }

    /// Matches every feature of the project.
    pub fn allow_all(project_id: ProjectId) -> Self {
        Self {
            project_id: Some(project_id),
            viewer: None,
            draft: StatusRule::Everyone,
            pending: StatusRule::Everyone,
            published: StatusRule::Everyone,
            archived: StatusRule::Everyone,
        }
    }

    pub fn rule(&self, status: FeatureStatus) -> StatusRule {
        match status {
            FeatureStatus::Draft => self.draft,
            FeatureStatus::Pending => self.pending,
            FeatureStatus::Published => self.published,
            FeatureStatus::Archived => self.archived,
        }
    }

    /// Statuses whose features are visible regardless of creator.
    pub fn statuses_for_everyone(&self) -> Vec<FeatureStatus> {
        FeatureStatus::ALL
            .into_iter()
            .filter(|status| self.rule(*status) == StatusRule::Everyone)
            .collect()
    }

    pub fn allows(&self, feature: &Feature) -> bool {
        if self.project_id != Some(feature.project_id) {
            return false;
        }
        match self.rule(feature.status) {
            StatusRule::Everyone => true,
            StatusRule::OwnOnly => self.viewer == Some(feature.creator),
            StatusRule::Nobody => false,
        }
    }

    pub fn apply<'f, I>(&self, features: I) -> Vec<&'f Feature>
    where
        I: IntoIterator<Item = &'f Feature>,
    {
        features.into_iter().filter(|f| self.allows(f)).collect()
    }
}

/// Builds [`FeatureFilter`]s from the rank of the viewer.
pub struct VisibilityFilter<'a, S: ?Sized> {
    evaluator: PermissionEvaluator<'a, S>,
    ladder: &'a RankLadder,
}

impl<'a, S> VisibilityFilter<'a, S>
where
    S: AuthorizationStore + ?Sized,
{
    pub fn new(store: &'a S, ladder: &'a RankLadder) -> Self {
        Self {
            evaluator: PermissionEvaluator::new(store, ladder),
            ladder,
        }
    }

    pub fn availables(&self, user: &User, project: &Project) -> AccessResult<FeatureFilter> {
        user.check()?;
        project.validate(self.ladder)?;

        let user_rank = self.evaluator.resolver().get_rank(user, project)?;

        // A superuser who also holds a moderator row goes through the
        // ordinary path below.
        if user.is_superuser && user_rank != self.ladder.moderator() {
            return Ok(FeatureFilter::allow_all(project.id));
        }

        if !user.is_authenticated {
            let permissions = self.evaluator.all_permissions(user, project, None)?;
            let filter = FeatureFilter {
                project_id: Some(project.id),
                viewer: None,
                draft: StatusRule::Nobody,
                pending: StatusRule::Nobody,
                published: StatusRule::everyone_or_nobody(
                    permissions.get(Capability::CanViewFeature),
                ),
                archived: StatusRule::everyone_or_nobody(
                    permissions.get(Capability::CanViewArchivedFeature),
                ),
            };
            debug!(
                project = %project.slug,
                public = ?filter.statuses_for_everyone(),
                "anonymous feature filter built"
            );
            return Ok(filter);
        }

        let super_contributor = self.ladder.super_contributor();
        let pending_cutoff = match super_contributor {
            Some(rank) if user_rank == rank => rank,
            _ => self.ladder.moderator(),
        };

        let filter = FeatureFilter {
            project_id: Some(project.id),
            viewer: Some(user.id),
            draft: StatusRule::OwnOnly,
            pending: StatusRule::own_or_everyone(
                !(project.moderation && user_rank < pending_cutoff),
            ),
            published: StatusRule::own_or_everyone(
                user_rank >= project.access_level_pub_feature_rank,
            ),
            archived: StatusRule::own_or_everyone(
                user_rank >= project.access_level_arch_feature_rank,
            ),
        };

        debug!(
            user = %user.id,
            project = %project.slug,
            rank = %user_rank,
            public = ?filter.statuses_for_everyone(),
            "feature filter built"
        );
        Ok(filter)
    }

    /// [`availables`](Self::availables), denying everything when the filter
    /// cannot be computed.
    pub fn availables_or_deny(&self, user: &User, project: &Project) -> FeatureFilter {
        match self.availables(user, project) {
            Ok(filter) => filter,
            Err(e) => {
                warn!(
                    user = %user.id,
                    project = %project.slug,
                    error = %e,
                    "feature visibility could not be evaluated; denying"
                );
                FeatureFilter::deny_all()
            }
        }
    }
}
