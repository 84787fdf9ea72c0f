// Project records as seen by the access engine: the moderation flag and the
// two visibility thresholds. Everything else about a project lives elsewhere.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::{AccessError, AccessResult};
use crate::rank::{Rank, RankLadder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(Uuid);

impl ProjectId {
    pub fn new() -> Self {
        ProjectId(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        ProjectId(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub slug: String,
    pub title: String,
    /// Publish requests need a moderator's approval.
    pub moderation: bool,
    /// Minimum rank to see published features of other users.
    pub access_level_pub_feature_rank: Rank,
    /// Minimum rank to see archived features.
    pub access_level_arch_feature_rank: Rank,
}

impl Project {
    /// Open, unmoderated project visible to everyone.
    pub fn new(slug: impl Into<String>, title: impl Into<String>, ladder: &RankLadder) -> Self {
        Self {
            id: ProjectId::new(),
            slug: slug.into(),
            title: title.into(),
            moderation: false,
            access_level_pub_feature_rank: ladder.anonymous(),
            access_level_arch_feature_rank: ladder.anonymous(),
        }
    }

    pub fn with_moderation(mut self, moderation: bool) -> Self {
        self.moderation = moderation;
        self
    }

    pub fn with_thresholds(mut self, published: Rank, archived: Rank) -> Self {
        self.access_level_pub_feature_rank = published;
        self.access_level_arch_feature_rank = archived;
        self
    }

    /// Check the project against the ladder it will be evaluated with.
    ///
    /// The published threshold may not exceed `contributor` and the archived
    /// threshold may not exceed `admin`; both must name a rank that exists.
    pub fn validate(&self, ladder: &RankLadder) -> AccessResult<()> {
        if self.slug.trim().is_empty() {
            return Err(AccessError::validation("slug", "project slug cannot be empty"));
        }

        let published = self.access_level_pub_feature_rank;
        if !ladder.contains(published) {
            return Err(AccessError::unknown_rank(
                published,
                format!("published threshold of project '{}'", self.slug),
            ));
        }
        if published > ladder.contributor() {
            return Err(AccessError::config(format!(
                "published threshold {published} of project '{}' exceeds contributor rank {}",
                self.slug,
                ladder.contributor()
            )));
        }

        let archived = self.access_level_arch_feature_rank;
        if !ladder.contains(archived) {
            return Err(AccessError::unknown_rank(
                archived,
                format!("archived threshold of project '{}'", self.slug),
            ));
        }
        if archived > ladder.admin() {
            return Err(AccessError::config(format!(
                "archived threshold {archived} of project '{}' exceeds admin rank {}",
                self.slug,
                ladder.admin()
            )));
        }

        Ok(())
    }
}
