use std::path::PathBuf;

use engine::{
    load_level_database, resolve_app_paths, ContentPipelineError, LevelDatabase, LoopConfig,
    SceneError, SceneMachine, StartupError,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{load_game_config, ConfigError};
use super::gameplay;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LaunchMode {
    Windowed,
    Script(PathBuf),
    DumpLevels,
}

pub(crate) struct AppWiring {
    pub(crate) mode: LaunchMode,
    pub(crate) config: LoopConfig,
    pub(crate) machine: SceneMachine,
    pub(crate) levels: LevelDatabase,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error("{0}\nusage: goose_delivery [--script <file.json> | --dump-levels]")]
    Usage(String),
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Content(#[from] ContentPipelineError),
    #[error("start level is not defined in assets/levels: {0}")]
    StartLevel(#[from] SceneError),
}

pub(crate) fn build_app<I>(args: I) -> Result<AppWiring, BootstrapError>
where
    I: IntoIterator<Item = String>,
{
    init_tracing();
    info!("=== Goose Delivery Startup ===");

    let mode = parse_launch_mode(args)?;
    let app_paths = resolve_app_paths()?;
    let game_config = load_game_config(&app_paths)?;
    let levels = load_level_database(&app_paths)?;

    let registry = gameplay::build_scene_registry(
        &levels,
        game_config.tuning,
        game_config.delivery_policy,
    );
    let machine = SceneMachine::new(registry, game_config.start_level.clone())?;
    let config = LoopConfig {
        target_tps: game_config.target_tps,
        ..LoopConfig::default()
    };
    info!(
        root = %app_paths.root.display(),
        mode = ?mode,
        start_level = %game_config.start_level,
        level_count = levels.len(),
        "bootstrap_complete"
    );

    Ok(AppWiring {
        mode,
        config,
        machine,
        levels,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

pub(crate) fn parse_launch_mode<I>(args: I) -> Result<LaunchMode, BootstrapError>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = LaunchMode::Windowed;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let next_mode = match arg.as_str() {
            "--dump-levels" => LaunchMode::DumpLevels,
            "--script" => match args.next() {
                Some(path) if !path.starts_with("--") => LaunchMode::Script(PathBuf::from(path)),
                _ => return Err(BootstrapError::Usage("--script needs a file path".to_string())),
            },
            other => {
                return Err(BootstrapError::Usage(format!(
                    "unrecognised argument '{other}'"
                )))
            }
        };
        if mode != LaunchMode::Windowed {
            return Err(BootstrapError::Usage(
                "--script and --dump-levels are mutually exclusive".to_string(),
            ));
        }
        mode = next_mode;
    }
    Ok(mode)
}
