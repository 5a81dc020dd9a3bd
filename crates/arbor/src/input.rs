//! Keyboard input state.
//!
//! The [`Input`] value tracks which keys are currently pressed, just pressed
//! this frame, or just released this frame. The host window layer feeds it
//! through [`Hierarchy::input_mut`](crate::hierarchy::Hierarchy::input_mut);
//! node hooks read it through their [`NodeContext`](crate::context::NodeContext).

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Keys the kernel knows about. The windowing backend maps its own key codes
/// onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    KeyW,
    KeyA,
    KeyS,
    KeyD,
    KeyQ,
    KeyE,
    KeyR,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Space,
    Enter,
    Escape,
    ShiftLeft,
    ControlLeft,
}

/// Where a key is in its press cycle, as seen by the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyPhase {
    /// Went down since the last frame ended.
    Down,
    /// Down for at least one full frame.
    Held,
    /// Went up since the last frame ended.
    Up,
}

/// Per-frame key state fed by the host and read by node hooks.
///
/// Only keys that are down, or went up this frame, have an entry.
#[derive(Debug, Clone)]
pub struct Input<T: Eq + Hash + Copy = KeyCode> {
    keys: HashMap<T, KeyPhase>,
}

impl<T: Eq + Hash + Copy> Input<T> {
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }

    /// Down right now, whether it went down this frame or earlier.
    pub fn pressed(&self, key: T) -> bool {
        matches!(self.keys.get(&key), Some(KeyPhase::Down | KeyPhase::Held))
    }

    pub fn just_pressed(&self, key: T) -> bool {
        self.keys.get(&key) == Some(&KeyPhase::Down)
    }

    pub fn just_released(&self, key: T) -> bool {
        self.keys.get(&key) == Some(&KeyPhase::Up)
    }

    /// Keys currently down, in no particular order.
    pub fn held_keys(&self) -> impl Iterator<Item = T> + '_ {
        self.keys
            .iter()
            .filter(|(_, phase)| **phase != KeyPhase::Up)
            .map(|(key, _)| *key)
    }

    /// Record a key-down event. Repeats while the key is down are ignored.
    pub fn press(&mut self, key: T) {
        if !self.pressed(key) {
            self.keys.insert(key, KeyPhase::Down);
        }
    }

    /// Record a key-up event. Ignored for keys that are not down.
    pub fn release(&mut self, key: T) {
        if self.pressed(key) {
            self.keys.insert(key, KeyPhase::Up);
        }
    }

    /// Settle this frame's edges: new presses become holds, releases are forgotten.
    pub(crate) fn end_frame(&mut self) {
        self.keys.retain(|_, phase| *phase != KeyPhase::Up);
        for phase in self.keys.values_mut() {
            *phase = KeyPhase::Held;
        }
    }
}

impl<T: Eq + Hash + Copy> Default for Input<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_an_edge_then_a_hold() {
        let mut input = Input::new();
        input.press(KeyCode::Space);
        assert!(input.pressed(KeyCode::Space));
        assert!(input.just_pressed(KeyCode::Space));

        input.end_frame();
        assert!(input.pressed(KeyCode::Space));
        assert!(!input.just_pressed(KeyCode::Space));

        input.release(KeyCode::Space);
        assert!(!input.pressed(KeyCode::Space));
        assert!(input.just_released(KeyCode::Space));

        input.end_frame();
        assert!(!input.just_released(KeyCode::Space));
        assert_eq!(input.held_keys().count(), 0);
    }

    #[test]
    fn key_repeat_does_not_press_again() {
        let mut input = Input::new();
        input.press(KeyCode::KeyW);
        input.end_frame();
        input.press(KeyCode::KeyW);
        assert!(!input.just_pressed(KeyCode::KeyW));
        assert_eq!(input.held_keys().collect::<Vec<_>>(), [KeyCode::KeyW]);
    }

    #[test]
    fn release_of_idle_key_is_ignored() {
        let mut input: Input = Input::new();
        input.release(KeyCode::Escape);
        assert!(!input.just_released(KeyCode::Escape));
    }
}
