//! Library root for the `geocontrib_access` crate
//!
//! Rank-based permission evaluation for collaborative reporting projects:
//! a user's rank on a project, the capability map derived from it, and the
//! visibility filter applied to feature listings.

// Core error handling
pub mod errors;

// Levels, identities and records
pub mod feature;
pub mod identity;
pub mod project;
pub mod rank;

// Authorization storage
pub mod authorization;
pub mod store_memory;
pub mod store_sled;

// Evaluation
pub mod capability;
pub mod engine;
pub mod evaluator;
pub mod resolver;
pub mod visibility;

// Membership lifecycle
pub mod membership;

// Configuration & CLI
pub mod cli;
pub mod config_loader;


pub use authorization::{AccessStore, Authorization, AuthorizationStore, ProjectStore};
pub use capability::{Capability, Permissions, Requirement, CAPABILITY_TABLE};
pub use engine::AccessEngine;
pub use errors::{AccessError, AccessResult};
pub use feature::{Feature, FeatureStatus};
pub use identity::{User, UserId};
pub use project::{Project, ProjectId};
pub use rank::{LadderPreset, LevelRank, Rank, RankLadder, UserLevel};
pub use store_memory::MemoryStore;
pub use store_sled::SledStore;
pub use visibility::{FeatureFilter, StatusRule};
