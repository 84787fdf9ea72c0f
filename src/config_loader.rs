use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::errors::{AccessError, AccessResult};
use crate::rank::{LadderPreset, LevelRank, RankLadder};

pub const DEFAULT_CONFIG_FILE: &str = "geoaccess.toml";
pub const ENV_PREFIX: &str = "GEOACCESS_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DbBackend {
    Memory,
    Sled,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AccessConfig {
    #[serde(default = "default_backend")]
    pub db_backend: DbBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub ladder: LadderConfig,
}

/// Either a preset name or an explicit list of `{ level, rank }` entries.
/// An explicit list wins over the preset.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct LadderConfig {
    #[serde(default)]
    pub preset: LadderPreset,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<LevelRank>,
}

fn default_backend() -> DbBackend {
    DbBackend::Sled
}

fn default_data_dir() -> String {
    "geoaccess-data".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AccessConfig {
    fn default() -> Self {
        AccessConfig {
            db_backend: default_backend(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            ladder: LadderConfig::default(),
        }
    }
}

impl LadderConfig {
    pub fn build(&self) -> AccessResult<RankLadder> {
        if self.levels.is_empty() {
            Ok(RankLadder::preset(self.preset))
        } else {
            RankLadder::from_entries(&self.levels)
        }
    }
}

impl AccessConfig {
    pub fn ladder(&self) -> AccessResult<RankLadder> {
        self.ladder.build()
    }

    pub fn tracing_level(&self) -> AccessResult<tracing::Level> {
        self.log_level
            .parse::<tracing::Level>()
            .map_err(|_| AccessError::config(format!("invalid log_level '{}'", self.log_level)))
    }

    fn validate(&self) -> AccessResult<()> {
        self.ladder()?;
        self.tracing_level()?;
        if self.db_backend == DbBackend::Sled && self.data_dir.trim().is_empty() {
            return Err(AccessError::config("data_dir must be set for the sled backend"));
        }
        Ok(())
    }

    /// Default configuration rendered as TOML, for `geoaccess init-config`.
    pub fn template() -> AccessResult<String> {
        toml::to_string_pretty(&AccessConfig::default())
            .map_err(|e| AccessError::config(format!("render default configuration: {e}")))
    }
}

/// Defaults, then the TOML file, then `GEOACCESS_*` environment variables.
/// Nested keys use a double underscore: `GEOACCESS_LADDER__PRESET=legacy`.
pub fn load_config(path: Option<&str>) -> AccessResult<AccessConfig> {
    let figment = Figment::from(Serialized::defaults(AccessConfig::default()))
        .merge(Toml::file(path.unwrap_or(DEFAULT_CONFIG_FILE)))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: AccessConfig = figment.extract()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::{Rank, UserLevel};
    use figment::Jail;

    #[test]
    fn defaults_without_file() {
        Jail::expect_with(|_jail| {
            let config = load_config(None).expect("defaults load");
            assert_eq!(config.db_backend, DbBackend::Sled);
            assert_eq!(config.ladder().unwrap(), RankLadder::extended());
            assert_eq!(config.tracing_level().unwrap(), tracing::Level::INFO);
            Ok(())
        });
    }

    #[test]
    fn file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "geoaccess.toml",
                r#"
                db_backend = "memory"
                log_level = "debug"

                [ladder]
                preset = "legacy"
                "#,
            )?;
            jail.set_env("GEOACCESS_LOG_LEVEL", "warn");

            let config = load_config(None).expect("config loads");
            assert_eq!(config.db_backend, DbBackend::Memory);
            assert_eq!(config.log_level, "warn");
            assert_eq!(config.ladder().unwrap(), RankLadder::legacy());
            Ok(())
        });
    }

    #[test]
    fn explicit_levels_override_preset() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                [ladder]
                preset = "extended"
                levels = [
                    { level = "anonymous", rank = 0 },
                    { level = "logged_user", rank = 10 },
                    { level = "contributor", rank = 20 },
                    { level = "moderator", rank = 30 },
                    { level = "admin", rank = 40 },
                ]
                "#,
            )?;

            let config = load_config(Some("custom.toml")).expect("config loads");
            let ladder = config.ladder().unwrap();
            assert_eq!(ladder.rank_of(UserLevel::Moderator), Some(Rank::new(30)));
            assert!(ladder.super_contributor().is_none());
            Ok(())
        });
    }

    #[test]
    fn broken_ladder_is_a_configuration_error() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "geoaccess.toml",
                r#"
                [ladder]
                levels = [
                    { level = "anonymous", rank = 0 },
                    { level = "admin", rank = 4 },
                ]
                "#,
            )?;

            let err = load_config(None).unwrap_err();
            assert!(err.is_configuration(), "got: {err}");
            Ok(())
        });
    }

    #[test]
    fn template_parses_back() {
        let rendered = AccessConfig::template().unwrap();
        let parsed: AccessConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, AccessConfig::default());
    }
}
