use tracing::debug;

use crate::authorization::AuthorizationStore;
use crate::capability::{Capability, Permissions, Requirement, CAPABILITY_TABLE};
use crate::errors::{AccessError, AccessResult};
use crate::feature::Feature;
use crate::identity::User;
use crate::project::Project;
use crate::rank::{Rank, RankLadder};
use crate::resolver::RankResolver;

/// Inputs of one evaluation after the lookups are done.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RankContext {
    pub user_rank: Rank,
    pub published_threshold: Rank,
    pub archived_threshold: Rank,
    pub owns_feature: bool,
}

impl RankContext {
    pub(crate) fn satisfies(&self, requirement: Requirement, ladder: &RankLadder) -> bool {
        let at_least = |level| {
            ladder
                .rank_of(level)
                .map(|required| self.user_rank >= required)
                .unwrap_or(false)
        };

        match requirement {
            Requirement::PublishedThreshold => {
                self.user_rank >= self.published_threshold
                    || self.published_threshold == ladder.anonymous()
            }
            Requirement::ArchivedThreshold => {
                self.user_rank >= self.archived_threshold
                    || self.archived_threshold < ladder.contributor()
            }
            Requirement::AtLeast(level) => at_least(level),
            Requirement::AtLeastOrOwner { any, owner } => {
                at_least(any) || (self.owns_feature && at_least(owner))
            }
            Requirement::OwnerAtLeast(level) => self.owns_feature && at_least(level),
            Requirement::SuperuserOnly => false,
        }
    }
}

/// Computes the capability map of a user on a project.
pub struct PermissionEvaluator<'a, S: ?Sized> {
    resolver: RankResolver<'a, S>,
    ladder: &'a RankLadder,
}

impl<'a, S> PermissionEvaluator<'a, S>
where
    S: AuthorizationStore + ?Sized,
{
    pub fn new(store: &'a S, ladder: &'a RankLadder) -> Self {
        Self {
            resolver: RankResolver::new(store, ladder),
            ladder,
        }
    }

    /// Full capability map. Superusers get everything without a lookup.
    ///
    /// Fails on an inconsistent user, a project that does not fit the
    /// ladder, a feature from another project, or a store error.
    pub fn all_permissions(
        &self,
        user: &User,
        project: &Project,
        feature: Option<&Feature>,
    ) -> AccessResult<Permissions> {
        let context = self.context(user, project, feature)?;
        let Some(context) = context else {
            return Ok(Permissions::all());
        };

        let mut permissions = Permissions::none();
        for (capability, requirement) in CAPABILITY_TABLE.iter() {
            permissions.set(*capability, context.satisfies(*requirement, self.ladder));
        }

        debug!(
            user = %user.id,
            project = %project.slug,
            rank = %context.user_rank,
            granted = permissions.granted().count(),
            "evaluated permissions"
        );
        Ok(permissions)
    }

    pub fn has_permission(
        &self,
        user: &User,
        capability: Capability,
        project: &Project,
        feature: Option<&Feature>,
    ) -> AccessResult<bool> {
        let granted = match self.context(user, project, feature)? {
            Some(context) => context.satisfies(capability.requirement(), self.ladder),
            None => true,
        };
        debug!(
            user = %user.id,
            project = %project.slug,
            capability = %capability,
            granted,
            "evaluated permission"
        );
        Ok(granted)
    }

    /// Like [`has_permission`](Self::has_permission) but by name; a name
    /// that is not a known capability is simply not granted.
    pub fn has_permission_named(
        &self,
        user: &User,
        name: &str,
        project: &Project,
        feature: Option<&Feature>,
    ) -> AccessResult<bool> {
        match name.parse::<Capability>() {
            Ok(capability) => self.has_permission(user, capability, project, feature),
            Err(_) => {
                // inputs are still checked so a typo cannot hide a bad call
                self.context(user, project, feature)?;
                Ok(false)
            }
        }
    }

    pub(crate) fn resolver(&self) -> &RankResolver<'a, S> {
        &self.resolver
    }

    /// `None` for superusers, who skip rank evaluation entirely.
    pub(crate) fn context(
        &self,
        user: &User,
        project: &Project,
        feature: Option<&Feature>,
    ) -> AccessResult<Option<RankContext>> {
        user.check()?;
        project.validate(self.ladder)?;
        if let Some(feature) = feature {
            if feature.project_id != project.id {
                return Err(AccessError::precondition(format!(
                    "feature {} belongs to project {}, not '{}'",
                    feature.id, feature.project_id, project.slug
                )));
            }
        }

        if user.is_superuser {
            return Ok(None);
        }

        Ok(Some(RankContext {
            user_rank: self.resolver.get_rank(user, project)?,
            published_threshold: project.access_level_pub_feature_rank,
            archived_threshold: project.access_level_arch_feature_rank,
            owns_feature: feature.map(|f| user.owns(&f.creator)).unwrap_or(false),
        }))
    }
}
