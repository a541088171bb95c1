use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use engine::{run_app, run_headless, HeadlessSummary, LevelDatabase, SceneMachine};
use tracing::{error, info};

use super::bootstrap::{AppWiring, LaunchMode};
use super::script::{InputScript, ScriptError};

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        mode,
        config,
        mut machine,
        levels,
    } = app;

    match mode {
        LaunchMode::Windowed => {
            if let Err(err) = run_app(config, machine) {
                error!(error = %err, "startup_failed");
                return ExitCode::FAILURE;
            }
        }
        LaunchMode::DumpLevels => {
            if let Err(err) = write_level_dump(&levels, &mut io::stdout().lock()) {
                error!(error = %err, "level_dump_failed");
                return ExitCode::FAILURE;
            }
        }
        LaunchMode::Script(path) => {
            if let Err(err) = run_script(&path, &mut machine, config.target_tps) {
                error!(error = %err, path = %path.display(), "script_failed");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

/// Stdout carries the JSON and nothing else; logs go to stderr.
fn write_level_dump(levels: &LevelDatabase, out: &mut impl Write) -> io::Result<()> {
    let json = levels.to_json_pretty()?;
    writeln!(out, "{json}")?;
    out.flush()
}

fn run_script(
    path: &Path,
    machine: &mut SceneMachine,
    target_tps: u32,
) -> Result<HeadlessSummary, ScriptError> {
    let mut script = InputScript::load(path)?;
    let duration_ticks = script.duration_ticks();
    info!(
        path = %path.display(),
        duration_ticks,
        start_level = %machine.active_level(),
        "script_started"
    );

    let summary = run_headless(machine, target_tps, duration_ticks, |tick| {
        script.snapshot_for_tick(tick)
    });
    info!(
        ticks_run = summary.ticks_run,
        final_level = %summary.final_level,
        levels_entered = ?summary.levels_entered,
        quit_requested = summary.quit_requested,
        status = ?machine.debug_title_active(),
        "script_finished"
    );
    machine.shutdown();
    Ok(summary)
}
