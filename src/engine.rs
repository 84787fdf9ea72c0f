use std::collections::BTreeMap;
use std::sync::Arc;

use crate::authorization::{AuthorizationStore, ProjectStore};
use crate::capability::{Capability, Permissions};
use crate::errors::AccessResult;
use crate::evaluator::PermissionEvaluator;
use crate::feature::Feature;
use crate::identity::User;
use crate::membership::Membership;
use crate::project::Project;
use crate::rank::{Rank, RankLadder};
use crate::resolver::RankResolver;
use crate::visibility::{FeatureFilter, VisibilityFilter};

/// Entry point for callers: one ladder, one shared store.
///
/// The engine keeps no state between calls, so it can be shared freely
/// across request handlers.
pub struct AccessEngine<S: ?Sized> {
    ladder: RankLadder,
    store: Arc<S>,
}

impl<S: ?Sized> Clone for AccessEngine<S> {
    fn clone(&self) -> Self {
        Self {
            ladder: self.ladder.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> AccessEngine<S>
where
    S: AuthorizationStore + ?Sized,
{
    pub fn new(store: Arc<S>, ladder: RankLadder) -> Self {
        Self { ladder, store }
    }

    pub fn ladder(&self) -> &RankLadder {
        &self.ladder
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn resolver(&self) -> RankResolver<'_, S> {
        RankResolver::new(&*self.store, &self.ladder)
    }

    pub fn evaluator(&self) -> PermissionEvaluator<'_, S> {
        PermissionEvaluator::new(&*self.store, &self.ladder)
    }

    pub fn visibility(&self) -> VisibilityFilter<'_, S> {
        VisibilityFilter::new(&*self.store, &self.ladder)
    }

    pub fn membership(&self) -> Membership<'_, S> {
        Membership::new(&*self.store, &self.ladder)
    }

    pub fn get_rank(&self, user: &User, project: &Project) -> AccessResult<Rank> {
        user.check()?;
        self.resolver().get_rank(user, project)
    }

    pub fn all_permissions(
        &self,
        user: &User,
        project: &Project,
        feature: Option<&Feature>,
    ) -> AccessResult<Permissions> {
        self.evaluator().all_permissions(user, project, feature)
    }

    pub fn has_permission(
        &self,
        user: &User,
        capability: Capability,
        project: &Project,
        feature: Option<&Feature>,
    ) -> AccessResult<bool> {
        self.evaluator()
            .has_permission(user, capability, project, feature)
    }

    pub fn has_permission_named(
        &self,
        user: &User,
        name: &str,
        project: &Project,
        feature: Option<&Feature>,
    ) -> AccessResult<bool> {
        self.evaluator()
            .has_permission_named(user, name, project, feature)
    }

    pub fn availables(&self, user: &User, project: &Project) -> AccessResult<FeatureFilter> {
        self.visibility().availables(user, project)
    }

    pub fn availables_or_deny(&self, user: &User, project: &Project) -> FeatureFilter {
        self.visibility().availables_or_deny(user, project)
    }
}

impl<S> AccessEngine<S>
where
    S: AuthorizationStore + ProjectStore + ?Sized,
{
    pub fn get_user_level_projects(&self, user: &User) -> AccessResult<BTreeMap<String, String>> {
        user.check()?;
        self.resolver().get_user_level_projects(user)
    }
}
