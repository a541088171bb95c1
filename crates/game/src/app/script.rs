use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::{InputAction, InputAggregator, InputSnapshot, InputSource};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) enum ScriptControl {
    MoveLeft,
    MoveRight,
    Jump,
    Restart,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScriptEntry {
    pub(crate) tick: u64,
    pub(crate) control: ScriptControl,
    pub(crate) pressed: bool,
}

#[derive(Debug, Error)]
pub(crate) enum ScriptError {
    #[error("failed to read input script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid input script {path} at {field}: {message}")]
    Parse {
        path: PathBuf,
        field: String,
        message: String,
    },
    #[error("input script {path} has no entries")]
    Empty { path: PathBuf },
}

/// A recorded press/release timeline replayed through the same input path the
/// window uses. The run lasts until the tick of the last entry.
#[derive(Debug, Clone)]
pub(crate) struct InputScript {
    entries: Vec<ScriptEntry>,
    cursor: usize,
    held: InputAggregator,
}

impl InputScript {
    pub(crate) fn load(path: &Path) -> Result<Self, ScriptError> {
        let raw = fs::read_to_string(path).map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &raw)
    }

    pub(crate) fn parse(path: &Path, raw: &str) -> Result<Self, ScriptError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let mut entries: Vec<ScriptEntry> = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|error| {
                let field = error.path().to_string();
                ScriptError::Parse {
                    path: path.to_path_buf(),
                    field,
                    message: error.into_inner().to_string(),
                }
            })?;
        if entries.is_empty() {
            return Err(ScriptError::Empty {
                path: path.to_path_buf(),
            });
        }
        entries.sort_by_key(|entry| entry.tick);
        Ok(Self {
            entries,
            cursor: 0,
            held: InputAggregator::default(),
        })
    }

    pub(crate) fn duration_ticks(&self) -> u64 {
        self.entries
            .last()
            .map(|entry| entry.tick.saturating_add(1))
            .unwrap_or(0)
    }

    /// Must be called with increasing ticks.
    pub(crate) fn snapshot_for_tick(&mut self, tick: u64) -> InputSnapshot {
        let mut restart_pressed = false;
        let mut quit_requested = false;
        while let Some(entry) = self.entries.get(self.cursor) {
            if entry.tick > tick {
                break;
            }
            self.cursor += 1;
            if entry.tick < tick {
                continue;
            }
            let action = match entry.control {
                ScriptControl::MoveLeft => InputAction::MoveLeft,
                ScriptControl::MoveRight => InputAction::MoveRight,
                ScriptControl::Jump => InputAction::Jump,
                ScriptControl::Restart => {
                    restart_pressed |= entry.pressed;
                    continue;
                }
                ScriptControl::Quit => {
                    quit_requested |= entry.pressed;
                    continue;
                }
            };
            self.held.set(InputSource::Keyboard, action, entry.pressed);
        }

        InputSnapshot::from_aggregator(&self.held)
            .with_restart_pressed(restart_pressed)
            .with_quit_requested(quit_requested)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn script(value: serde_json::Value) -> Result<InputScript, ScriptError> {
        InputScript::parse(Path::new("scripts/test.json"), &value.to_string())
    }

    #[test]
    fn held_controls_persist_until_released() {
        let mut script = script(json!([
            { "tick": 0, "control": "MoveRight", "pressed": true },
            { "tick": 3, "control": "MoveRight", "pressed": false },
            { "tick": 2, "control": "Jump", "pressed": true }
        ]))
        .expect("script");
        assert_eq!(script.duration_ticks(), 4);

        let snapshots: Vec<InputSnapshot> = (0..4).map(|tick| script.snapshot_for_tick(tick)).collect();
        assert!(snapshots[0].is_down(InputAction::MoveRight));
        assert!(snapshots[1].is_down(InputAction::MoveRight));
        assert!(!snapshots[1].is_down(InputAction::Jump));
        assert!(snapshots[2].intents().jump);
        assert!(!snapshots[3].is_down(InputAction::MoveRight));
        assert!(snapshots[3].is_down(InputAction::Jump));
    }

    #[test]
    fn restart_and_quit_are_single_tick_edges() {
        let mut script = script(json!([
            { "tick": 1, "control": "Restart", "pressed": true },
            { "tick": 2, "control": "Quit", "pressed": true }
        ]))
        .expect("script");
        assert!(!script.snapshot_for_tick(0).restart_pressed());
        assert!(script.snapshot_for_tick(1).restart_pressed());
        let last = script.snapshot_for_tick(2);
        assert!(!last.restart_pressed());
        assert!(last.quit_requested());
    }

    #[test]
    fn unknown_control_reports_entry_path() {
        let error = script(json!([
            { "tick": 0, "control": "Jump", "pressed": true },
            { "tick": 1, "control": "Dive", "pressed": true }
        ]))
        .expect_err("control");
        let ScriptError::Parse { field, .. } = error else {
            panic!("expected parse error");
        };
        assert_eq!(field, "[1].control");
    }

    #[test]
    fn empty_script_is_rejected() {
        assert!(matches!(script(json!([])), Err(ScriptError::Empty { .. })));
    }
}
