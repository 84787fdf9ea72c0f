use std::fs;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use crate::authorization::AccessStore;
use crate::config_loader::{AccessConfig, DbBackend};
use crate::engine::AccessEngine;
use crate::feature::Feature;
use crate::identity::{User, UserId};
use crate::project::Project;
use crate::rank::{RankLadder, UserLevel};
use crate::store_memory::MemoryStore;
use crate::store_sled::SledStore;

/// Top-level CLI interface
#[derive(Parser)]
#[command(
    name = "geoaccess",
    version = "0.1.0",
    about = "Rank-based access control for collaborative reporting projects"
)]
pub struct Cli {
    /// Configuration file (defaults to ./geoaccess.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Who is asking. No `--user` means an anonymous visitor.
#[derive(Args, Clone, Debug)]
pub struct IdentityArgs {
    #[arg(long)]
    pub user: Option<Uuid>,
    #[arg(long, requires = "user")]
    pub superuser: bool,
}

impl IdentityArgs {
    pub fn to_user(&self) -> User {
        match self.user {
            Some(id) if self.superuser => User::superuser(UserId::from_uuid(id)),
            Some(id) => User::authenticated(UserId::from_uuid(id)),
            None => User::anonymous(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a default configuration file
    InitConfig,

    /// Register a project
    ProjectAdd {
        #[arg(long)]
        slug: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        moderation: bool,
        /// Level needed to see published features of others
        #[arg(long, default_value = "anonymous")]
        pub_level: UserLevel,
        /// Level needed to see archived features
        #[arg(long, default_value = "anonymous")]
        arch_level: UserLevel,
        /// Creator account; becomes project administrator
        #[arg(long)]
        creator: Option<Uuid>,
    },

    /// List projects
    ProjectList,

    /// Set a member's level on a project
    Grant {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        project: String,
        #[arg(long)]
        level: UserLevel,
    },

    /// Remove a member's explicit level on a project
    Revoke {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        project: String,
    },

    /// Give a new account the default level on every project
    UserCreated {
        #[arg(long)]
        user: Uuid,
    },

    /// Print the effective rank on a project
    Rank {
        #[command(flatten)]
        identity: IdentityArgs,
        #[arg(long)]
        project: String,
    },

    /// Print the level label on every project
    Levels {
        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// Print the capability map as JSON
    Permissions {
        #[command(flatten)]
        identity: IdentityArgs,
        #[arg(long)]
        project: String,
        /// JSON file holding one feature for object-level checks
        #[arg(long)]
        feature: Option<String>,
    },

    /// Check one capability; exit status 1 when denied
    Check {
        #[command(flatten)]
        identity: IdentityArgs,
        #[arg(long)]
        project: String,
        #[arg(long)]
        capability: String,
        #[arg(long)]
        feature: Option<String>,
    },

    /// Print the features of a JSON array the identity may see
    Filter {
        #[command(flatten)]
        identity: IdentityArgs,
        #[arg(long)]
        project: String,
        #[arg(long)]
        features: String,
    },
}

fn open_store(config: &AccessConfig, ladder: &RankLadder) -> anyhow::Result<Arc<dyn AccessStore>> {
    let store: Arc<dyn AccessStore> = match config.db_backend {
        DbBackend::Memory => Arc::new(MemoryStore::new(ladder.clone())),
        DbBackend::Sled => Arc::new(SledStore::open(&config.data_dir, ladder.clone())?),
    };
    Ok(store)
}

fn require_project(engine: &AccessEngine<dyn AccessStore>, slug: &str) -> anyhow::Result<Project> {
    engine
        .store()
        .get_project(slug)?
        .ok_or_else(|| anyhow!("project '{slug}' not found"))
}

fn read_feature(path: Option<&str>) -> anyhow::Result<Option<Feature>> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(path).with_context(|| format!("read feature file {path}"))?;
            let feature = serde_json::from_str(&raw).with_context(|| format!("parse feature file {path}"))?;
            Ok(Some(feature))
        }
        None => Ok(None),
    }
}

/// Runs one command. Returns `false` when a `check` is denied.
pub fn dispatch(cli: Cli, config: &AccessConfig) -> anyhow::Result<bool> {
    if let Commands::InitConfig = cli.command {
        print!("{}", AccessConfig::template()?);
        return Ok(true);
    }

    let ladder = config.ladder()?;
    let engine = AccessEngine::new(open_store(config, &ladder)?, ladder);

    match cli.command {
        Commands::InitConfig => {}
        Commands::ProjectAdd {
            slug,
            title,
            moderation,
            pub_level,
            arch_level,
            creator,
        } => {
            let ladder = engine.ladder();
            let published = ladder
                .rank_of(pub_level)
                .ok_or_else(|| anyhow!("level '{pub_level}' is not on the configured ladder"))?;
            let archived = ladder
                .rank_of(arch_level)
                .ok_or_else(|| anyhow!("level '{arch_level}' is not on the configured ladder"))?;
            let project = Project::new(slug, title, ladder)
                .with_moderation(moderation)
                .with_thresholds(published, archived);

            engine.store().put_project(project.clone())?;
            if let Some(creator) = creator {
                let creator = User::authenticated(UserId::from_uuid(creator));
                engine.membership().on_project_created(&project, &creator, &[])?;
            }
            println!("{}", serde_json::to_string_pretty(&project)?);
        }
        Commands::ProjectList => {
            for project in engine.store().list_projects()? {
                println!(
                    "{}\t{}\tmoderation={}\tpub={}\tarch={}",
                    project.slug,
                    project.title,
                    project.moderation,
                    project.access_level_pub_feature_rank,
                    project.access_level_arch_feature_rank
                );
            }
        }
        Commands::Grant {
            user,
            project,
            level,
        } => {
            let project = require_project(&engine, &project)?;
            let user = User::authenticated(UserId::from_uuid(user));
            engine.membership().set_member_level(&user, &project, level)?;
        }
        Commands::Revoke { user, project } => {
            let project = require_project(&engine, &project)?;
            let user = User::authenticated(UserId::from_uuid(user));
            if !engine.membership().remove_member(&user, &project)? {
                bail!("user {} has no explicit level on '{}'", user.id, project.slug);
            }
        }
        Commands::UserCreated { user } => {
            let user = User::authenticated(UserId::from_uuid(user));
            let projects = engine.store().list_projects()?;
            let created = engine.membership().on_user_created(&user, &projects)?;
            println!("{created} memberships created");
        }
        Commands::Rank { identity, project } => {
            let project = require_project(&engine, &project)?;
            let rank = engine.get_rank(&identity.to_user(), &project)?;
            println!("{rank}\t{}", engine.ladder().label_of(rank)?);
        }
        Commands::Levels { identity } => {
            let levels = engine.get_user_level_projects(&identity.to_user())?;
            println!("{}", serde_json::to_string_pretty(&levels)?);
        }
        Commands::Permissions {
            identity,
            project,
            feature,
        } => {
            let project = require_project(&engine, &project)?;
            let feature = read_feature(feature.as_deref())?;
            let permissions =
                engine.all_permissions(&identity.to_user(), &project, feature.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&permissions)?);
        }
        Commands::Check {
            identity,
            project,
            capability,
            feature,
        } => {
            let project = require_project(&engine, &project)?;
            let feature = read_feature(feature.as_deref())?;
            let granted = engine.has_permission_named(
                &identity.to_user(),
                &capability,
                &project,
                feature.as_ref(),
            )?;
            println!("{capability}: {}", if granted { "granted" } else { "denied" });
            return Ok(granted);
        }
        Commands::Filter {
            identity,
            project,
            features,
        } => {
            let project = require_project(&engine, &project)?;
            let raw = fs::read_to_string(&features)
                .with_context(|| format!("read features file {features}"))?;
            let all: Vec<Feature> = serde_json::from_str(&raw)
                .with_context(|| format!("parse features file {features}"))?;

            let filter = engine.availables_or_deny(&identity.to_user(), &project);
            let visible = filter.apply(&all);
            println!("{}", serde_json::to_string_pretty(&visible)?);
        }
    }

    Ok(true)
}
