use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, trace, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, TouchPhase, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use super::input::{InputAction, InputAggregator, InputSource, TouchLayout, TouchTracker};
use super::scene::{InputSnapshot, LevelId, SceneCommand, SceneMachine, Vec2};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Goose Delivery".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, mut machine: SceneMachine) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = WindowBuilder::new()
        .with_title(config.window_title.clone())
        .with_inner_size(LogicalSize::new(
            config.window_width as f64,
            config.window_height as f64,
        ))
        .build(&event_loop)
        .map_err(AppError::CreateWindow)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let fixed_dt = fixed_dt_for_tps(config.target_tps);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let mut input_collector = InputCollector::new(config.window_width, config.window_height);
    machine.load_active();

    info!(
        target_tps = config.target_tps.max(1),
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    input_collector.set_window_size(new_size.width, new_size.height);
                }
                WindowEvent::Focused(false) => {
                    input_collector.release_keyboard();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::Touch(touch) => {
                    input_collector.handle_touch(
                        touch.id,
                        touch.phase,
                        Vec2 {
                            x: touch.location.x as f32,
                            y: touch.location.y as f32,
                        },
                    );
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    accumulator =
                        accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));
                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let input_snapshot = input_collector.snapshot_for_tick();
                        let command = machine.update_active(fixed_dt_seconds, &input_snapshot);
                        apply_scene_command(&mut machine, command);
                    }
                    accumulator = step_plan.remaining_accumulator;

                    if step_plan.dropped_backlog > Duration::ZERO {
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    machine.render_active();
                    let next_title = machine.debug_title_active();
                    if next_title != last_applied_title {
                        match &next_title {
                            Some(title) => window.set_title(title),
                            None => window.set_title(&config.window_title),
                        }
                        last_applied_title = next_title;
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                machine.shutdown();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessSummary {
    pub ticks_run: u64,
    pub final_level: LevelId,
    pub levels_entered: Vec<LevelId>,
    pub quit_requested: bool,
}

/// Drives the machine at a fixed step without a window. `input_for_tick`
/// receives the zero-based tick index.
pub fn run_headless<F>(
    machine: &mut SceneMachine,
    target_tps: u32,
    max_ticks: u64,
    mut input_for_tick: F,
) -> HeadlessSummary
where
    F: FnMut(u64) -> InputSnapshot,
{
    let fixed_dt_seconds = fixed_dt_for_tps(target_tps).as_secs_f32();
    machine.load_active();

    let mut ticks_run = 0u64;
    let mut levels_entered = Vec::new();
    let mut quit_requested = false;

    for tick in 0..max_ticks {
        let input = input_for_tick(tick);
        if input.quit_requested() {
            quit_requested = true;
            break;
        }
        let level_before = machine.active_level().clone();
        let command = machine.update_active(fixed_dt_seconds, &input);
        ticks_run += 1;
        if apply_scene_command(machine, command) && *machine.active_level() != level_before {
            levels_entered.push(machine.active_level().clone());
        }
        machine.render_active();
    }

    HeadlessSummary {
        ticks_run,
        final_level: machine.active_level().clone(),
        levels_entered,
        quit_requested,
    }
}

fn apply_scene_command(machine: &mut SceneMachine, command: SceneCommand) -> bool {
    match machine.apply_command(command) {
        Ok(changed) => changed,
        Err(error) => {
            warn!(error = %error, level = %machine.active_level(), "scene_command_rejected");
            false
        }
    }
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    restart_key_is_down: bool,
    restart_pressed_edge: bool,
    aggregator: InputAggregator,
    touches: TouchTracker,
    touch_layout: TouchLayout,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            touch_layout: TouchLayout::for_window(window_width, window_height),
            ..Self::default()
        }
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.touch_layout = TouchLayout::for_window(width, height);
    }

    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        self.update_action_state_from_physical_key(key_event.physical_key, is_pressed);
        self.handle_restart_key_state(is_restart_key(key_event), key_event.state);
    }

    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        match key {
            PhysicalKey::Code(KeyCode::KeyA) | PhysicalKey::Code(KeyCode::ArrowLeft) => {
                self.aggregator
                    .set(InputSource::Keyboard, InputAction::MoveLeft, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyD) | PhysicalKey::Code(KeyCode::ArrowRight) => {
                self.aggregator
                    .set(InputSource::Keyboard, InputAction::MoveRight, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyW)
            | PhysicalKey::Code(KeyCode::ArrowUp)
            | PhysicalKey::Code(KeyCode::Space) => {
                self.aggregator
                    .set(InputSource::Keyboard, InputAction::Jump, is_pressed);
            }
            PhysicalKey::Code(KeyCode::Escape) => {
                if is_pressed {
                    self.quit_requested = true;
                }
            }
            _ => {}
        }
    }

    fn handle_restart_key_state(&mut self, is_restart: bool, state: ElementState) {
        if !is_restart {
            return;
        }
        match state {
            ElementState::Pressed => {
                if !self.restart_key_is_down {
                    self.restart_pressed_edge = true;
                }
                self.restart_key_is_down = true;
            }
            ElementState::Released => self.restart_key_is_down = false,
        }
    }

    fn handle_touch(&mut self, finger: u64, phase: TouchPhase, location_px: Vec2) {
        match phase {
            TouchPhase::Started => {
                if let Some(action) = self.touches.begin(finger, location_px, &self.touch_layout) {
                    trace!(finger, ?action, "touch_button_down");
                    self.aggregator.press(InputSource::Touch, action);
                }
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                if let Some(action) = self.touches.end(finger) {
                    trace!(finger, ?action, "touch_button_up");
                    self.aggregator.release(InputSource::Touch, action);
                }
            }
            TouchPhase::Moved => {}
        }
    }

    fn release_keyboard(&mut self) {
        self.aggregator.release_all(InputSource::Keyboard);
        self.restart_key_is_down = false;
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(
            self.quit_requested,
            self.restart_pressed_edge,
            self.aggregator.actions(),
        );
        self.restart_pressed_edge = false;
        snapshot
    }
}

fn is_restart_key(key_event: &KeyEvent) -> bool {
    matches!(key_event.physical_key, PhysicalKey::Code(KeyCode::KeyR))
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn fixed_dt_for_tps(target_tps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / target_tps.max(1) as f64)
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::scene::{Scene, SceneRegistry, SceneWorld};

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);
        assert_eq!(clamp_frame_delta(raw_frame_dt, max_frame_delta), max_frame_delta);
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(50), fixed_dt, 5);
        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(2));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);
        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn zero_durations_fall_back_and_zero_tps_is_treated_as_one() {
        assert_eq!(
            normalize_non_zero_duration(Duration::ZERO, Duration::from_millis(250)),
            Duration::from_millis(250)
        );
        assert_eq!(fixed_dt_for_tps(0), Duration::from_secs(1));
    }

    #[test]
    fn wasd_arrows_and_space_map_to_actions() {
        let mut input = InputCollector::default();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyA), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::ArrowRight), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::Space), true);

        let intents = input.snapshot_for_tick().intents();
        assert!(intents.move_left);
        assert!(intents.move_right);
        assert!(intents.jump);
    }

    #[test]
    fn key_release_clears_action_state() {
        let mut input = InputCollector::default();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyD), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyD), false);
        assert!(!input.snapshot_for_tick().is_down(InputAction::MoveRight));
    }

    #[test]
    fn restart_press_is_edge_triggered_for_single_tick() {
        let mut input = InputCollector::default();
        input.handle_restart_key_state(true, ElementState::Pressed);
        input.handle_restart_key_state(true, ElementState::Pressed);
        assert!(input.snapshot_for_tick().restart_pressed());
        assert!(!input.snapshot_for_tick().restart_pressed());

        input.handle_restart_key_state(true, ElementState::Released);
        input.handle_restart_key_state(true, ElementState::Pressed);
        assert!(input.snapshot_for_tick().restart_pressed());
    }

    #[test]
    fn escape_requests_quit() {
        let mut input = InputCollector::default();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::Escape), true);
        assert!(input.snapshot_for_tick().quit_requested());
    }

    #[test]
    fn touch_buttons_press_and_release_through_aggregator() {
        let mut input = InputCollector::new(1200, 720);
        let on_jump = Vec2 {
            x: 1050.0,
            y: 600.0,
        };
        input.handle_touch(3, TouchPhase::Started, on_jump);
        assert!(input.snapshot_for_tick().intents().jump);

        input.handle_touch(3, TouchPhase::Moved, Vec2 { x: 0.0, y: 0.0 });
        assert!(input.snapshot_for_tick().intents().jump);

        input.handle_touch(3, TouchPhase::Cancelled, on_jump);
        assert!(!input.snapshot_for_tick().intents().jump);
    }

    #[test]
    fn focus_loss_releases_keys_but_not_touches() {
        let mut input = InputCollector::new(1200, 720);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyA), true);
        input.handle_touch(1, TouchPhase::Started, Vec2 { x: 450.0, y: 600.0 });
        input.release_keyboard();
        let intents = input.snapshot_for_tick().intents();
        assert!(!intents.move_left);
        assert!(intents.move_right);
    }

    struct CountdownScene {
        ticks: u32,
        switch_after: u32,
        target: &'static str,
    }

    impl Scene for CountdownScene {
        fn load(&mut self, _world: &mut SceneWorld) {
            self.ticks = 0;
        }

        fn update(
            &mut self,
            _fixed_dt_seconds: f32,
            _input: &InputSnapshot,
            _world: &mut SceneWorld,
        ) -> SceneCommand {
            self.ticks += 1;
            if self.ticks == self.switch_after {
                SceneCommand::SwitchTo(LevelId::new(self.target))
            } else {
                SceneCommand::None
            }
        }

        fn render(&mut self, _world: &SceneWorld) {}

        fn unload(&mut self, _world: &mut SceneWorld) {}
    }

    fn two_level_machine() -> SceneMachine {
        let mut registry = SceneRegistry::new();
        registry.register(
            LevelId::new("first"),
            Box::new(CountdownScene {
                ticks: 0,
                switch_after: 3,
                target: "second",
            }),
        );
        registry.register(
            LevelId::new("second"),
            Box::new(CountdownScene {
                ticks: 0,
                switch_after: 0,
                target: "first",
            }),
        );
        SceneMachine::new(registry, LevelId::new("first")).expect("machine")
    }

    #[test]
    fn headless_run_records_level_switches() {
        let mut machine = two_level_machine();
        let summary = run_headless(&mut machine, 60, 10, |_| InputSnapshot::empty());
        assert_eq!(summary.ticks_run, 10);
        assert_eq!(summary.final_level, LevelId::new("second"));
        assert_eq!(summary.levels_entered, vec![LevelId::new("second")]);
        assert!(!summary.quit_requested);
    }

    #[test]
    fn headless_run_stops_on_quit() {
        let mut machine = two_level_machine();
        let summary = run_headless(&mut machine, 60, 100, |tick| {
            InputSnapshot::empty().with_quit_requested(tick == 2)
        });
        assert_eq!(summary.ticks_run, 2);
        assert!(summary.quit_requested);
        assert_eq!(summary.final_level, LevelId::new("first"));
    }
}
