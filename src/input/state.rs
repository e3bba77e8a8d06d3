//! Frame counters for registered inputs
//!
//! Each registered input carries one signed counter, refreshed once per tick:
//! - held: counts up from 1 (1 on the first tick down, so "clicked" is `== 1`)
//! - released: counts down from 0 (0 on the first tick up)
//!
//! Zero is the boundary. Inputs must be registered before they are tracked;
//! querying anything else yields `None` and the engine context turns that
//! into a diagnostic.

use std::collections::HashMap;

use crate::math::Vec2;

use super::{InputId, InputSource};

#[derive(Debug, Default)]
pub struct InputState {
    counters: HashMap<InputId, i64>,
    /// Cursor position in view coordinates
    mouse_position: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an input. Re-registering keeps the current count.
    pub fn add_input(&mut self, id: impl Into<InputId>) {
        self.counters.entry(id.into()).or_insert(0);
    }

    pub fn add_inputs<I, T>(&mut self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<InputId>,
    {
        for id in ids {
            self.add_input(id);
        }
    }

    pub fn is_registered(&self, id: InputId) -> bool {
        self.counters.contains_key(&id)
    }

    /// Advance every counter from the source's current state.
    pub fn refresh(&mut self, source: &dyn InputSource) {
        for (id, value) in self.counters.iter_mut() {
            *value = advance(*value, source.is_down(*id));
        }
    }

    /// Raw counter, `None` if the input was never registered.
    pub fn get(&self, id: InputId) -> Option<i64> {
        self.counters.get(&id).copied()
    }

    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    pub fn set_mouse_position(&mut self, position: Vec2) {
        self.mouse_position = position;
    }
}

fn advance(value: i64, down: bool) -> i64 {
    if down {
        if value < 0 {
            0
        } else {
            value + 1
        }
    } else if value > 0 {
        0
    } else {
        value - 1
    }
}

/// Held for at least one tick.
pub fn is_pressed(frames: i64) -> bool {
    frames > 0
}

/// First tick held.
pub fn is_clicked(frames: i64) -> bool {
    frames == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ScriptedInput;
    use macroquad::input::{KeyCode, MouseButton};

    #[test]
    fn test_press_hold_release_sequence() {
        let mut state = InputState::new();
        let space = InputId::Key(KeyCode::Space);
        state.add_input(space);

        let mut source = ScriptedInput::new();
        let mut seen = Vec::new();
        for down in [true, true, true, false, false, true] {
            source.set(space, down);
            state.refresh(&source);
            seen.push(state.get(space).unwrap());
        }
        assert_eq!(seen, vec![1, 2, 3, 0, -1, 0]);
    }

    #[test]
    fn test_press_from_released_starts_at_boundary() {
        // a press after a long release first snaps to zero, then counts
        assert_eq!(advance(-5, true), 0);
        assert_eq!(advance(0, true), 1);
        assert_eq!(advance(7, false), 0);
        assert_eq!(advance(0, false), -1);
    }

    #[test]
    fn test_pressed_and_clicked() {
        assert!(is_clicked(1));
        assert!(is_pressed(1));
        assert!(is_pressed(4));
        assert!(!is_clicked(4));
        assert!(!is_pressed(0));
        assert!(!is_pressed(-3));
    }

    #[test]
    fn test_unregistered_input_is_none() {
        let mut state = InputState::new();
        state.add_inputs([KeyCode::A, KeyCode::D]);
        state.add_input(MouseButton::Left);

        assert_eq!(state.get(InputId::Key(KeyCode::A)), Some(0));
        assert!(state.is_registered(InputId::Mouse(MouseButton::Left)));
        assert_eq!(state.get(InputId::Key(KeyCode::W)), None);
    }

    #[test]
    fn test_unregistered_inputs_are_not_tracked() {
        let mut state = InputState::new();
        let mut source = ScriptedInput::new();
        source.set(InputId::Key(KeyCode::W), true);
        state.refresh(&source);
        assert_eq!(state.get(InputId::Key(KeyCode::W)), None);
    }
}
