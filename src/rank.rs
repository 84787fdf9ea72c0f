//! Permission levels and the rank ladder they are ordered by.
//!
//! Every authorization decision in the crate reduces to comparing two
//! [`Rank`]s. The [`RankLadder`] says which rank each [`UserLevel`] holds;
//! two presets exist because the level set grew a `super_contributor` tier
//! between `contributor` and `moderator`.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::errors::{AccessError, AccessResult};

/// Named permission level. Declaration order is the required rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserLevel {
    Anonymous,
    LoggedUser,
    Contributor,
    SuperContributor,
    Moderator,
    Admin,
}

impl UserLevel {
    pub const ALL: [UserLevel; 6] = [
        UserLevel::Anonymous,
        UserLevel::LoggedUser,
        UserLevel::Contributor,
        UserLevel::SuperContributor,
        UserLevel::Moderator,
        UserLevel::Admin,
    ];

    /// Identifier used in configuration files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserLevel::Anonymous => "anonymous",
            UserLevel::LoggedUser => "logged_user",
            UserLevel::Contributor => "contributor",
            UserLevel::SuperContributor => "super_contributor",
            UserLevel::Moderator => "moderator",
            UserLevel::Admin => "admin",
        }
    }

    /// Human-readable label shown next to a project in a user's profile.
    pub fn label(&self) -> &'static str {
        match self {
            UserLevel::Anonymous => "Utilisateur anonyme",
            UserLevel::LoggedUser => "Utilisateur connecté",
            UserLevel::Contributor => "Contributeur",
            UserLevel::SuperContributor => "Super Contributeur",
            UserLevel::Moderator => "Modérateur",
            UserLevel::Admin => "Administrateur projet",
        }
    }

    fn is_optional(&self) -> bool {
        matches!(self, UserLevel::SuperContributor)
    }
}

impl FromStr for UserLevel {
    type Err = AccessError;

    fn from_str(input: &str) -> Result<UserLevel, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "anonymous" => Ok(UserLevel::Anonymous),
            "logged_user" => Ok(UserLevel::LoggedUser),
            "contributor" => Ok(UserLevel::Contributor),
            "super_contributor" => Ok(UserLevel::SuperContributor),
            "moderator" => Ok(UserLevel::Moderator),
            "admin" => Ok(UserLevel::Admin),
            other => Err(AccessError::validation(
                "level",
                format!("unknown user level '{other}'"),
            )),
        }
    }
}

impl fmt::Display for UserLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a level on the ladder. Higher is more permissive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rank(u8);

impl Rank {
    pub const fn new(value: u8) -> Self {
        Rank(value)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One `level = rank` line of a ladder definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRank {
    pub level: UserLevel,
    pub rank: Rank,
}

/// Built-in ladder definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderPreset {
    /// anonymous(0) < logged_user(1) < contributor(2) < moderator(3) < admin(4)
    Legacy,
    /// Legacy with super_contributor(3) inserted; moderator(4), admin(5).
    #[default]
    Extended,
}

impl FromStr for LadderPreset {
    type Err = AccessError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "legacy" => Ok(LadderPreset::Legacy),
            "extended" => Ok(LadderPreset::Extended),
            other => Err(AccessError::config(format!("unknown ladder preset '{other}'"))),
        }
    }
}

lazy_static! {
    static ref LEGACY_LADDER: RankLadder = RankLadder {
        entries: vec![
            (UserLevel::Anonymous, Rank(0)),
            (UserLevel::LoggedUser, Rank(1)),
            (UserLevel::Contributor, Rank(2)),
            (UserLevel::Moderator, Rank(3)),
            (UserLevel::Admin, Rank(4)),
        ],
    };
    static ref EXTENDED_LADDER: RankLadder = RankLadder {
        entries: vec![
            (UserLevel::Anonymous, Rank(0)),
            (UserLevel::LoggedUser, Rank(1)),
            (UserLevel::Contributor, Rank(2)),
            (UserLevel::SuperContributor, Rank(3)),
            (UserLevel::Moderator, Rank(4)),
            (UserLevel::Admin, Rank(5)),
        ],
    };
}

/// Validated, totally ordered mapping from level to rank.
///
/// Construction goes through [`RankLadder::from_entries`] or a preset, so a
/// ladder value always holds every mandatory level with strictly increasing
/// ranks. The fixed cutoffs used by the evaluator therefore never fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankLadder {
    // sorted by level; ranks strictly increasing
    entries: Vec<(UserLevel, Rank)>,
}

impl RankLadder {
    pub fn legacy() -> Self {
        LEGACY_LADDER.clone()
    }

    pub fn extended() -> Self {
        EXTENDED_LADDER.clone()
    }

    pub fn preset(preset: LadderPreset) -> Self {
        match preset {
            LadderPreset::Legacy => Self::legacy(),
            LadderPreset::Extended => Self::extended(),
        }
    }

    /// Build a ladder from configuration entries.
    pub fn from_entries(entries: &[LevelRank]) -> AccessResult<Self> {
        let mut sorted: Vec<(UserLevel, Rank)> =
            entries.iter().map(|e| (e.level, e.rank)).collect();
        sorted.sort_by_key(|(level, _)| *level);

        for pair in sorted.windows(2) {
            let (lower, lower_rank) = pair[0];
            let (upper, upper_rank) = pair[1];
            if lower == upper {
                return Err(AccessError::config(format!(
                    "level '{lower}' is defined more than once"
                )));
            }
            if upper_rank <= lower_rank {
                return Err(AccessError::config(format!(
                    "rank of '{upper}' ({upper_rank}) must be greater than rank of '{lower}' ({lower_rank})"
                )));
            }
        }

        for level in UserLevel::ALL {
            if !level.is_optional() && !sorted.iter().any(|(l, _)| *l == level) {
                return Err(AccessError::config(format!(
                    "ladder is missing mandatory level '{level}'"
                )));
            }
        }

        Ok(Self { entries: sorted })
    }

    pub fn entries(&self) -> Vec<LevelRank> {
        self.entries
            .iter()
            .map(|(level, rank)| LevelRank {
                level: *level,
                rank: *rank,
            })
            .collect()
    }

    pub fn rank_of(&self, level: UserLevel) -> Option<Rank> {
        self.entries
            .iter()
            .find(|(l, _)| *l == level)
            .map(|(_, rank)| *rank)
    }

    pub fn level_of(&self, rank: Rank) -> Option<UserLevel> {
        self.entries
            .iter()
            .find(|(_, r)| *r == rank)
            .map(|(level, _)| *level)
    }

    pub fn contains(&self, rank: Rank) -> bool {
        self.level_of(rank).is_some()
    }

    /// Rank of a level that is guaranteed by construction.
    fn mandatory(&self, level: UserLevel) -> Rank {
        // from_entries rejects ladders without mandatory levels
        self.rank_of(level).unwrap_or(Rank(u8::MAX))
    }

    pub fn anonymous(&self) -> Rank {
        self.mandatory(UserLevel::Anonymous)
    }

    pub fn logged_user(&self) -> Rank {
        self.mandatory(UserLevel::LoggedUser)
    }

    pub fn contributor(&self) -> Rank {
        self.mandatory(UserLevel::Contributor)
    }

    pub fn super_contributor(&self) -> Option<Rank> {
        self.rank_of(UserLevel::SuperContributor)
    }

    pub fn moderator(&self) -> Rank {
        self.mandatory(UserLevel::Moderator)
    }

    pub fn admin(&self) -> Rank {
        self.mandatory(UserLevel::Admin)
    }

    /// Display label for a rank, as used in profile pages.
    pub fn label_of(&self, rank: Rank) -> AccessResult<&'static str> {
        self.level_of(rank)
            .map(|level| level.label())
            .ok_or_else(|| AccessError::unknown_rank(rank, "rank ladder"))
    }
}

impl Default for RankLadder {
    fn default() -> Self {
        Self::extended()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(level: UserLevel, rank: u8) -> LevelRank {
        LevelRank {
            level,
            rank: Rank::new(rank),
        }
    }

    #[test]
    fn presets_are_ordered() {
        let legacy = RankLadder::legacy();
        assert_eq!(legacy.anonymous(), Rank::new(0));
        assert_eq!(legacy.contributor(), Rank::new(2));
        assert_eq!(legacy.moderator(), Rank::new(3));
        assert_eq!(legacy.admin(), Rank::new(4));
        assert!(legacy.super_contributor().is_none());

        let extended = RankLadder::extended();
        assert_eq!(extended.super_contributor(), Some(Rank::new(3)));
        assert_eq!(extended.moderator(), Rank::new(4));
        assert_eq!(extended.admin(), Rank::new(5));
        assert_eq!(RankLadder::default(), extended);
    }

    #[test]
    fn parse_level_is_case_insensitive() {
        assert_eq!("Moderator".parse::<UserLevel>().unwrap(), UserLevel::Moderator);
        assert_eq!(
            " super_contributor ".parse::<UserLevel>().unwrap(),
            UserLevel::SuperContributor
        );
        assert!("root".parse::<UserLevel>().is_err());
    }

    #[test]
    fn custom_ladder_accepts_gaps() {
        let ladder = RankLadder::from_entries(&[
            entry(UserLevel::Admin, 40),
            entry(UserLevel::Anonymous, 0),
            entry(UserLevel::LoggedUser, 10),
            entry(UserLevel::Contributor, 20),
            entry(UserLevel::Moderator, 30),
        ])
        .unwrap();

        assert_eq!(ladder.level_of(Rank::new(30)), Some(UserLevel::Moderator));
        assert!(!ladder.contains(Rank::new(25)));
        assert_eq!(ladder.entries().first().unwrap().level, UserLevel::Anonymous);
    }

    #[test]
    fn ladder_rejects_out_of_order_ranks() {
        let err = RankLadder::from_entries(&[
            entry(UserLevel::Anonymous, 0),
            entry(UserLevel::LoggedUser, 1),
            entry(UserLevel::Contributor, 3),
            entry(UserLevel::Moderator, 2),
            entry(UserLevel::Admin, 4),
        ])
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("moderator"));
    }

    #[test]
    fn ladder_rejects_missing_or_duplicate_levels() {
        let missing = RankLadder::from_entries(&[
            entry(UserLevel::Anonymous, 0),
            entry(UserLevel::LoggedUser, 1),
            entry(UserLevel::Contributor, 2),
            entry(UserLevel::Admin, 4),
        ]);
        assert!(missing.unwrap_err().to_string().contains("moderator"));

        let duplicate = RankLadder::from_entries(&[
            entry(UserLevel::Anonymous, 0),
            entry(UserLevel::Anonymous, 1),
            entry(UserLevel::LoggedUser, 2),
            entry(UserLevel::Contributor, 3),
            entry(UserLevel::Moderator, 4),
            entry(UserLevel::Admin, 5),
        ]);
        assert!(duplicate.unwrap_err().to_string().contains("more than once"));
    }

    #[test]
    fn labels_follow_ranks() {
        let ladder = RankLadder::legacy();
        assert_eq!(ladder.label_of(Rank::new(3)).unwrap(), "Modérateur");
        assert!(ladder.label_of(Rank::new(5)).is_err());
    }
}
