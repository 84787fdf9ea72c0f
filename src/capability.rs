//! Named capabilities and the static table that grants them.
//!
//! The table is the whole rule set: every capability maps to exactly one
//! [`Requirement`], evaluated against the caller's rank on the project.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::errors::AccessError;
use crate::rank::UserLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    CanViewProject,
    CanCreateProject,
    CanUpdateProject,
    CanViewFeature,
    CanViewArchivedFeature,
    CanArchiveFeature,
    CanCreateFeature,
    CanUpdateFeature,
    CanDeleteFeature,
    CanPublishFeature,
    CanCreateFeatureType,
    CanViewFeatureType,
    IsProjectAdministrator,
}

impl Capability {
    pub const ALL: [Capability; 13] = [
        Capability::CanViewProject,
        Capability::CanCreateProject,
        Capability::CanUpdateProject,
        Capability::CanViewFeature,
        Capability::CanViewArchivedFeature,
        Capability::CanArchiveFeature,
        Capability::CanCreateFeature,
        Capability::CanUpdateFeature,
        Capability::CanDeleteFeature,
        Capability::CanPublishFeature,
        Capability::CanCreateFeatureType,
        Capability::CanViewFeatureType,
        Capability::IsProjectAdministrator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::CanViewProject => "can_view_project",
            Capability::CanCreateProject => "can_create_project",
            Capability::CanUpdateProject => "can_update_project",
            Capability::CanViewFeature => "can_view_feature",
            Capability::CanViewArchivedFeature => "can_view_archived_feature",
            Capability::CanArchiveFeature => "can_archive_feature",
            Capability::CanCreateFeature => "can_create_feature",
            Capability::CanUpdateFeature => "can_update_feature",
            Capability::CanDeleteFeature => "can_delete_feature",
            Capability::CanPublishFeature => "can_publish_feature",
            Capability::CanCreateFeatureType => "can_create_feature_type",
            Capability::CanViewFeatureType => "can_view_feature_type",
            Capability::IsProjectAdministrator => "is_project_administrator",
        }
    }

    /// The rule that grants this capability.
    pub fn requirement(&self) -> Requirement {
        CAPABILITY_TABLE
            .iter()
            .find(|(cap, _)| cap == self)
            .map(|(_, req)| *req)
            // every variant has a row; see table_covers_every_capability
            .unwrap_or(Requirement::SuperuserOnly)
    }
}

impl FromStr for Capability {
    type Err = AccessError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .iter()
            .find(|cap| cap.as_str() == input)
            .copied()
            .ok_or_else(|| AccessError::not_found("capability", input))
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Capability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// How a capability is granted to a non-superuser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Rank at least the project's published threshold, or the threshold is
    /// the lowest rank of the ladder.
    PublishedThreshold,
    /// Rank at least the project's archived threshold, or the threshold is
    /// below `contributor`.
    ArchivedThreshold,
    /// Rank at least the given level.
    AtLeast(UserLevel),
    /// Rank at least `any`, or at least `owner` on a feature the caller created.
    AtLeastOrOwner { any: UserLevel, owner: UserLevel },
    /// Rank at least the given level on a feature the caller created.
    OwnerAtLeast(UserLevel),
    /// Never granted by rank.
    SuperuserOnly,
}

/// One row per capability.
pub const CAPABILITY_TABLE: [(Capability, Requirement); 13] = [
    (Capability::CanViewProject, Requirement::PublishedThreshold),
    (Capability::CanCreateProject, Requirement::SuperuserOnly),
    (Capability::CanUpdateProject, Requirement::AtLeast(UserLevel::Admin)),
    (Capability::CanViewFeature, Requirement::PublishedThreshold),
    (Capability::CanViewArchivedFeature, Requirement::ArchivedThreshold),
    (Capability::CanArchiveFeature, Requirement::ArchivedThreshold),
    (Capability::CanCreateFeature, Requirement::AtLeast(UserLevel::Contributor)),
    (
        Capability::CanUpdateFeature,
        Requirement::AtLeastOrOwner {
            any: UserLevel::Moderator,
            owner: UserLevel::Contributor,
        },
    ),
    (Capability::CanDeleteFeature, Requirement::OwnerAtLeast(UserLevel::Contributor)),
    (Capability::CanPublishFeature, Requirement::AtLeast(UserLevel::Moderator)),
    (Capability::CanCreateFeatureType, Requirement::AtLeast(UserLevel::Admin)),
    (Capability::CanViewFeatureType, Requirement::PublishedThreshold),
    (Capability::IsProjectAdministrator, Requirement::AtLeast(UserLevel::Admin)),
];

/// Complete capability map. Every capability is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Permissions {
    grants: BTreeMap<Capability, bool>,
}

impl Permissions {
    /// Every capability denied.
    pub fn none() -> Self {
        Self {
            grants: Capability::ALL.iter().map(|cap| (*cap, false)).collect(),
        }
    }

    /// Every capability granted.
    pub fn all() -> Self {
        Self {
            grants: Capability::ALL.iter().map(|cap| (*cap, true)).collect(),
        }
    }

    pub(crate) fn set(&mut self, capability: Capability, granted: bool) {
        self.grants.insert(capability, granted);
    }

    pub fn get(&self, capability: Capability) -> bool {
        self.grants.get(&capability).copied().unwrap_or(false)
    }

    /// Lookup by wire name. Unknown names are not granted.
    pub fn get_named(&self, name: &str) -> bool {
        name.parse::<Capability>()
            .map(|cap| self.get(cap))
            .unwrap_or(false)
    }

    pub fn granted(&self) -> impl Iterator<Item = Capability> + '_ {
        self.grants
            .iter()
            .filter(|(_, granted)| **granted)
            .map(|(cap, _)| *cap)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Capability, bool)> + '_ {
        self.grants.iter().map(|(cap, granted)| (*cap, *granted))
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}
