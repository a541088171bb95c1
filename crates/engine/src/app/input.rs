use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::physics::Aabb;
use super::scene::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    Jump,
}

const ACTION_COUNT: usize = 3;

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::MoveLeft,
        InputAction::MoveRight,
        InputAction::Jump,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::Jump => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    fn union(self, other: ActionStates) -> ActionStates {
        let mut merged = self;
        for action in InputAction::ALL {
            merged.set(action, self.is_down(action) || other.is_down(action));
        }
        merged
    }
}

/// The three booleans the movement code consumes. Nothing downstream of this
/// type knows which device produced them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveIntents {
    pub move_left: bool,
    pub move_right: bool,
    pub jump: bool,
}

impl MoveIntents {
    pub(crate) fn from_actions(actions: ActionStates) -> Self {
        Self {
            move_left: actions.is_down(InputAction::MoveLeft),
            move_right: actions.is_down(InputAction::MoveRight),
            jump: actions.is_down(InputAction::Jump),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    Keyboard,
    Touch,
}

/// Per-source held state. A control is down when any source holds it.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputAggregator {
    keyboard: ActionStates,
    touch: ActionStates,
}

impl InputAggregator {
    pub fn press(&mut self, source: InputSource, action: InputAction) {
        self.set(source, action, true);
    }

    pub fn release(&mut self, source: InputSource, action: InputAction) {
        self.set(source, action, false);
    }

    pub fn set(&mut self, source: InputSource, action: InputAction, is_down: bool) {
        self.source_mut(source).set(action, is_down);
    }

    pub fn release_all(&mut self, source: InputSource) {
        *self.source_mut(source) = ActionStates::default();
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions().is_down(action)
    }

    pub fn intents(&self) -> MoveIntents {
        MoveIntents::from_actions(self.actions())
    }

    pub(crate) fn actions(&self) -> ActionStates {
        self.keyboard.union(self.touch)
    }

    fn source_mut(&mut self, source: InputSource) -> &mut ActionStates {
        match source {
            InputSource::Keyboard => &mut self.keyboard,
            InputSource::Touch => &mut self.touch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchButton {
    pub action: InputAction,
    pub area_px: Aabb,
}

/// Hit areas of the on-screen buttons, in window pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TouchLayout {
    buttons: Vec<TouchButton>,
}

const TOUCH_BUTTON_SIZE_PX: f32 = 96.0;

impl TouchLayout {
    pub fn new(buttons: Vec<TouchButton>) -> Self {
        Self { buttons }
    }

    /// Left and right on the lower left, jump on the lower right.
    pub fn for_window(width: u32, height: u32) -> Self {
        let width = width as f32;
        let height = height as f32;
        let half = Vec2 {
            x: TOUCH_BUTTON_SIZE_PX * 0.5,
            y: TOUCH_BUTTON_SIZE_PX * 0.5,
        };
        let row_y = height / 1.2;
        let button = |action, x: f32| TouchButton {
            action,
            area_px: Aabb::from_center_half_extents(Vec2 { x, y: row_y }, half),
        };
        Self::new(vec![
            button(InputAction::MoveLeft, width / 6.0),
            button(InputAction::MoveRight, width * 3.0 / 8.0),
            button(InputAction::Jump, width - width / 8.0),
        ])
    }

    pub fn hit_test(&self, point_px: Vec2) -> Option<InputAction> {
        self.buttons
            .iter()
            .find(|button| button.area_px.contains_point(point_px))
            .map(|button| button.action)
    }

    pub fn buttons(&self) -> &[TouchButton] {
        &self.buttons
    }
}

/// Tracks which button each finger went down on. Finger moves are ignored: a
/// control stays held until the finger that pressed it lifts.
#[derive(Debug, Clone, Default)]
pub struct TouchTracker {
    fingers: BTreeMap<u64, InputAction>,
}

impl TouchTracker {
    /// Returns the action that became held, if this finger pressed a button
    /// no other finger was already holding.
    pub fn begin(&mut self, finger: u64, point_px: Vec2, layout: &TouchLayout) -> Option<InputAction> {
        let action = layout.hit_test(point_px)?;
        let already_held = self.is_held(action);
        self.fingers.insert(finger, action);
        (!already_held).then_some(action)
    }

    /// Returns the action that is no longer held by any finger.
    pub fn end(&mut self, finger: u64) -> Option<InputAction> {
        let action = self.fingers.remove(&finger)?;
        (!self.is_held(action)).then_some(action)
    }

    pub fn is_held(&self, action: InputAction) -> bool {
        self.fingers.values().any(|held| *held == action)
    }

    pub fn clear(&mut self) {
        self.fingers.clear();
    }
}
