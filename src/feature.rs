// Reporting records ("signalements"). The engine reads status and creator
// only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::AccessError;
use crate::identity::UserId;
use crate::project::ProjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureStatus {
    #[default]
    Draft,
    Pending,
    Published,
    Archived,
}

impl FeatureStatus {
    pub const ALL: [FeatureStatus; 4] = [
        FeatureStatus::Draft,
        FeatureStatus::Pending,
        FeatureStatus::Published,
        FeatureStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureStatus::Draft => "draft",
            FeatureStatus::Pending => "pending",
            FeatureStatus::Published => "published",
            FeatureStatus::Archived => "archived",
        }
    }
}

impl FromStr for FeatureStatus {
    type Err = AccessError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "draft" => Ok(FeatureStatus::Draft),
            "pending" => Ok(FeatureStatus::Pending),
            "published" => Ok(FeatureStatus::Published),
            "archived" => Ok(FeatureStatus::Archived),
            other => Err(AccessError::validation(
                "status",
                format!("unknown feature status '{other}'"),
            )),
        }
    }
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: Uuid,
    pub project_id: ProjectId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: FeatureStatus,
    pub creator: UserId,
}

impl Feature {
    pub fn new(project_id: ProjectId, creator: UserId, status: FeatureStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            title: None,
            status,
            creator,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
