//! Input tracking
//!
//! Keyboard keys and mouse buttons share one identifier space. The engine
//! keeps a frame counter per registered identifier (see `state`) and reads
//! the live button state from an `InputSource`: macroquad in the binary,
//! a scripted source in tests.

mod state;

use std::collections::HashSet;

use macroquad::input::{is_key_down, is_mouse_button_down, KeyCode, MouseButton};

pub use state::{is_clicked, is_pressed, InputState};

/// A trackable key or mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputId {
    Key(KeyCode),
    Mouse(MouseButton),
}

impl From<KeyCode> for InputId {
    fn from(key: KeyCode) -> Self {
        InputId::Key(key)
    }
}

impl From<MouseButton> for InputId {
    fn from(button: MouseButton) -> Self {
        InputId::Mouse(button)
    }
}

/// Live button state.
pub trait InputSource {
    fn is_down(&self, id: InputId) -> bool;
}

/// Reads macroquad's keyboard and mouse state.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacroquadInput;

impl InputSource for MacroquadInput {
    fn is_down(&self, id: InputId) -> bool {
        match id {
            InputId::Key(key) => is_key_down(key),
            InputId::Mouse(button) => is_mouse_button_down(button),
        }
    }
}

/// Input source driven by hand, for tests and replays.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    down: HashSet<InputId>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: impl Into<InputId>, down: bool) {
        let id = id.into();
        if down {
            self.down.insert(id);
        } else {
            self.down.remove(&id);
        }
    }

    pub fn press(&mut self, id: impl Into<InputId>) {
        self.set(id, true);
    }

    pub fn release(&mut self, id: impl Into<InputId>) {
        self.set(id, false);
    }
}

impl InputSource for ScriptedInput {
    fn is_down(&self, id: InputId) -> bool {
        self.down.contains(&id)
    }
}
