use crate::authorization::{Authorization, AuthorizationStore};
use crate::feature::{Feature, FeatureStatus};
use crate::identity::{User, UserId};
use crate::project::Project;
use crate::rank::{RankLadder, UserLevel};
use crate::tests::test_utils::{feature, FailingStore, Fixture};
use crate::visibility::{FeatureFilter, StatusRule, VisibilityFilter};

/// One feature per status for each given creator.
fn catalogue(project: &Project, creators: &[&User]) -> Vec<Feature> {
    let mut features = Vec::new();
    for creator in creators {
        for status in FeatureStatus::ALL {
            features.push(feature(project, creator, status));
        }
    }
    features
}

fn visible_statuses(filter: &FeatureFilter, features: &[Feature], creator: &User) -> Vec<FeatureStatus> {
    filter
        .apply(features)
        .into_iter()
        .filter(|f| f.creator == creator.id)
        .map(|f| f.status)
        .collect()
}

#[test]
fn anonymous_sees_nothing_on_restricted_project() {
    let fx = Fixture::legacy();
    let project = fx.project("closed", false, UserLevel::Contributor, UserLevel::Moderator);
    let author = fx.member(&project, UserLevel::Contributor);
    let features = catalogue(&project, &[&author]);

    let filter = fx.visibility().availables(&User::anonymous(), &project).unwrap();
    assert!(filter.apply(&features).is_empty());
    assert!(filter.statuses_for_everyone().is_empty());
}

#[test]
fn anonymous_on_open_project_sees_published_and_archived() {
    let fx = Fixture::legacy();
    let project = fx.project("open", true, UserLevel::Anonymous, UserLevel::Anonymous);
    let author = fx.member(&project, UserLevel::Contributor);
    let features = catalogue(&project, &[&author]);

    let filter = fx.visibility().availables(&User::anonymous(), &project).unwrap();
    assert_eq!(
        visible_statuses(&filter, &features, &author),
        vec![FeatureStatus::Published, FeatureStatus::Archived]
    );
}

#[test]
fn contributor_on_moderated_project_sees_only_own_pending() {
    let fx = Fixture::legacy();
    let project = fx.project("moderated", true, UserLevel::Anonymous, UserLevel::Anonymous);
    let viewer = fx.member(&project, UserLevel::Contributor);
    let other = fx.member(&project, UserLevel::Contributor);
    let features = catalogue(&project, &[&viewer, &other]);

    let filter = fx.visibility().availables(&viewer, &project).unwrap();
    assert_eq!(filter.rule(FeatureStatus::Pending), StatusRule::OwnOnly);
    assert_eq!(
        visible_statuses(&filter, &features, &viewer),
        FeatureStatus::ALL.to_vec()
    );
    assert_eq!(
        visible_statuses(&filter, &features, &other),
        vec![FeatureStatus::Published, FeatureStatus::Archived]
    );
}

#[test]
fn unmoderated_project_shows_pending_of_others() {
    let fx = Fixture::legacy();
    let project = fx.project("open", false, UserLevel::Anonymous, UserLevel::Anonymous);
    let viewer = fx.member(&project, UserLevel::LoggedUser);

    let filter = fx.visibility().availables(&viewer, &project).unwrap();
    assert_eq!(filter.rule(FeatureStatus::Pending), StatusRule::Everyone);
}

#[test]
fn moderator_sees_every_pending_feature() {
    let fx = Fixture::legacy();
    let project = fx.project("moderated", true, UserLevel::Anonymous, UserLevel::Anonymous);
    let moderator = fx.member(&project, UserLevel::Moderator);
    let other = fx.member(&project, UserLevel::Contributor);
    let features = catalogue(&project, &[&other]);

    let filter = fx.visibility().availables(&moderator, &project).unwrap();
    assert_eq!(
        visible_statuses(&filter, &features, &other),
        vec![
            FeatureStatus::Pending,
            FeatureStatus::Published,
            FeatureStatus::Archived
        ]
    );
}

#[test]
fn archived_of_others_follows_threshold_but_own_stay_visible() {
    let fx = Fixture::legacy();
    let project = fx.project("archive", false, UserLevel::Anonymous, UserLevel::Admin);
    let moderator = fx.member(&project, UserLevel::Moderator);
    let admin = fx.member(&project, UserLevel::Admin);
    let other = fx.member(&project, UserLevel::Contributor);
    let own_archived = feature(&project, &moderator, FeatureStatus::Archived);
    let foreign_archived = feature(&project, &other, FeatureStatus::Archived);

    let filter = fx.visibility().availables(&moderator, &project).unwrap();
    assert_eq!(filter.rule(FeatureStatus::Archived), StatusRule::OwnOnly);
    assert!(filter.allows(&own_archived));
    assert!(!filter.allows(&foreign_archived));

    let filter = fx.visibility().availables(&admin, &project).unwrap();
    assert!(filter.allows(&foreign_archived));
}

#[test]
fn published_of_others_hidden_below_threshold() {
    let fx = Fixture::legacy();
    let project = fx.project("members", false, UserLevel::Contributor, UserLevel::Anonymous);
    let viewer = fx.member(&project, UserLevel::LoggedUser);
    let other = fx.member(&project, UserLevel::Contributor);

    let filter = fx.visibility().availables(&viewer, &project).unwrap();
    assert!(!filter.allows(&feature(&project, &other, FeatureStatus::Published)));
    assert!(filter.allows(&feature(&project, &viewer, FeatureStatus::Published)));
}

#[test]
fn drafts_of_others_are_hidden_from_every_non_superuser() {
    for ladder in [RankLadder::legacy(), RankLadder::extended()] {
        let fx = Fixture::with_ladder(ladder.clone());
        let project = fx.project("drafts", false, UserLevel::Anonymous, UserLevel::Anonymous);
        let author = fx.member(&project, UserLevel::Contributor);
        let draft = feature(&project, &author, FeatureStatus::Draft);

        let mut viewers = vec![User::anonymous()];
        for entry in ladder.entries() {
            if entry.level != UserLevel::Anonymous {
                viewers.push(fx.member(&project, entry.level));
            }
        }

        for viewer in viewers {
            let filter = fx.visibility().availables(&viewer, &project).unwrap();
            assert!(!filter.allows(&draft), "draft leaked to {:?}", viewer);
        }
        let own = fx.visibility().availables(&author, &project).unwrap();
        assert!(own.allows(&draft));
    }
}

#[test]
fn super_contributor_sees_pending_on_moderated_project() {
    let fx = Fixture::extended();
    let project = fx.project("moderated", true, UserLevel::Anonymous, UserLevel::Anonymous);
    let super_contributor = fx.member(&project, UserLevel::SuperContributor);
    let contributor = fx.member(&project, UserLevel::Contributor);
    let pending = feature(&project, &contributor, FeatureStatus::Pending);

    let filter = fx.visibility().availables(&super_contributor, &project).unwrap();
    assert!(filter.allows(&pending));

    let filter = fx.visibility().availables(&contributor, &project).unwrap();
    assert!(filter.allows(&pending));
    let other = fx.member(&project, UserLevel::Contributor);
    let filter = fx.visibility().availables(&other, &project).unwrap();
    assert!(!filter.allows(&pending));
}

#[test]
fn superuser_sees_everything() {
    let fx = Fixture::legacy();
    let project = fx.project("closed", true, UserLevel::Contributor, UserLevel::Admin);
    let author = fx.member(&project, UserLevel::Contributor);
    let features = catalogue(&project, &[&author]);
    let root = User::superuser(UserId::new());

    let filter = fx.visibility().availables(&root, &project).unwrap();
    assert_eq!(filter, FeatureFilter::allow_all(project.id));
    assert_eq!(filter.apply(&features).len(), features.len());
}

#[test]
fn superuser_holding_moderator_row_uses_the_ordinary_path() {
    let fx = Fixture::legacy();
    let project = fx.project("closed", true, UserLevel::Anonymous, UserLevel::Anonymous);
    let author = fx.member(&project, UserLevel::Contributor);
    let root = User::superuser(UserId::new());
    fx.store
        .upsert(Authorization::new(root.id, project.id, UserLevel::Moderator))
        .unwrap();

    let filter = fx.visibility().availables(&root, &project).unwrap();
    assert!(!filter.allows(&feature(&project, &author, FeatureStatus::Draft)));
    assert!(filter.allows(&feature(&project, &author, FeatureStatus::Pending)));
}

#[test]
fn features_of_other_projects_never_match() {
    let fx = Fixture::legacy();
    let here = fx.project("here", false, UserLevel::Anonymous, UserLevel::Anonymous);
    let there = fx.project("there", false, UserLevel::Anonymous, UserLevel::Anonymous);
    let author = fx.member(&there, UserLevel::Contributor);

    let root = User::superuser(UserId::new());
    let filter = fx.visibility().availables(&root, &here).unwrap();
    assert!(!filter.allows(&feature(&there, &author, FeatureStatus::Published)));
}

#[test]
fn store_failure_denies_everything() {
    let ladder = RankLadder::legacy();
    let store = FailingStore;
    let visibility = VisibilityFilter::new(&store, &ladder);
    let project = Project::new("p", "P", &ladder);
    let user = User::authenticated(UserId::new());

    assert!(visibility.availables(&user, &project).is_err());
    let filter = visibility.availables_or_deny(&user, &project);
    assert_eq!(filter, FeatureFilter::deny_all());
    assert!(!filter.allows(&Feature::new(project.id, user.id, FeatureStatus::Published)));
}

#[test]
fn archived_listing_ignores_the_low_threshold_relaxation() {
    let fx = Fixture::legacy();
    let project = fx.project("archive", false, UserLevel::Anonymous, UserLevel::LoggedUser);
    let author = fx.member(&project, UserLevel::Contributor);
    let retired = fx.member(&project, UserLevel::Moderator);
    fx.membership()
        .on_user_deactivated(&retired, &[project.clone()])
        .unwrap();
    let archived = feature(&project, &author, FeatureStatus::Archived);

    // the capability is granted because the threshold sits below contributor
    let perms = fx.evaluator().all_permissions(&retired, &project, None).unwrap();
    assert!(perms.get(crate::capability::Capability::CanViewArchivedFeature));

    // the listing compares the rank to the threshold directly
    let filter = fx.visibility().availables(&retired, &project).unwrap();
    assert_eq!(filter.rule(FeatureStatus::Archived), StatusRule::OwnOnly);
    assert!(!filter.allows(&archived));

    // anonymous visitors go through the capability and do see it
    let anonymous = fx.visibility().availables(&User::anonymous(), &project).unwrap();
    assert!(anonymous.allows(&archived));
}
