use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::{AppPaths, LevelId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::gameplay::{DeliveryPolicy, Tuning};

pub(crate) const CONFIG_ENV_VAR: &str = "GOOSE_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "game.json";
const DEFAULT_START_LEVEL: &str = "temple";
const DEFAULT_TARGET_TPS: u32 = 60;
const MAX_TARGET_TPS: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    pub(crate) start_level: LevelId,
    pub(crate) target_tps: u32,
    pub(crate) delivery_policy: DeliveryPolicy,
    pub(crate) tuning: Tuning,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_level: LevelId::new(DEFAULT_START_LEVEL),
            target_tps: DEFAULT_TARGET_TPS,
            delivery_policy: DeliveryPolicy::default(),
            tuning: Tuning::default(),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path} at {field}: {message}")]
    Parse {
        path: PathBuf,
        field: String,
        message: String,
    },
    #[error("invalid config {path}: {field} {message}")]
    InvalidValue {
        path: PathBuf,
        field: &'static str,
        message: &'static str,
    },
}

/// `GOOSE_CONFIG` names a file that must exist. Without it the optional
/// `config/game.json` is used, and defaults apply when that is absent too.
pub(crate) fn load_game_config(app_paths: &AppPaths) -> Result<GameConfig, ConfigError> {
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(explicit) => read_game_config(Path::new(&explicit), true),
        None => read_game_config(&app_paths.config_dir.join(DEFAULT_CONFIG_FILE), false),
    }
}

pub(crate) fn read_game_config(path: &Path, required: bool) -> Result<GameConfig, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if !required && source.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "game_config_default");
            return Ok(GameConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let config = parse_game_config(path, &raw)?;
    info!(
        path = %path.display(),
        start_level = %config.start_level,
        target_tps = config.target_tps,
        delivery_policy = ?config.delivery_policy,
        "game_config_loaded"
    );
    Ok(config)
}

pub(crate) fn parse_game_config(path: &Path, raw: &str) -> Result<GameConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let config: GameConfig = serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let field = error.path().to_string();
        ConfigError::Parse {
            path: path.to_path_buf(),
            field,
            message: error.into_inner().to_string(),
        }
    })?;

    let invalid = |field, message| ConfigError::InvalidValue {
        path: path.to_path_buf(),
        field,
        message,
    };
    if config.start_level.as_str().trim().is_empty() {
        return Err(invalid("start_level", "must not be empty"));
    }
    if config.target_tps == 0 || config.target_tps > MAX_TARGET_TPS {
        return Err(invalid("target_tps", "must be within 1..=1000"));
    }
    config
        .tuning
        .validate()
        .map_err(|(field, message)| invalid(field, message))?;
    Ok(config)
}
