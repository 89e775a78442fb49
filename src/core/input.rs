//! Input state tracking
//!
//! `InputSystem` keeps the keyboard and mouse state between events so scenes can
//! ask "is key 1 held" during update and get per-move mouse deltas while dragging.

use std::collections::HashSet;

use tracing::trace;

use crate::core::event::{InputEvent, KeyCode, MouseButton, MouseButtons};

/// Tracks held keys, held mouse buttons and the last cursor position
#[derive(Debug, Default)]
pub struct InputSystem {
    // Keyboard state
    pressed_keys: HashSet<KeyCode>,

    // Mouse state
    mouse_buttons: MouseButtons,
    last_mouse_pos: (f32, f32),
    mouse_delta: (f32, f32),
}

impl InputSystem {
    /// Create a new InputSystem with nothing held
    pub fn new() -> Self {
        Self::default()
    }

    /// Update state from an event
    ///
    /// Mouse moves update the delta relative to the previous cursor position.
    /// Button presses reset the reference position so a drag starts at zero.
    pub fn handle(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(e) => {
                self.pressed_keys.insert(e.key_code);
            }
            InputEvent::KeyUp(e) => {
                self.pressed_keys.remove(&e.key_code);
            }
            InputEvent::MouseDown(e) => {
                self.mouse_buttons.set(e.button, true);
                self.last_mouse_pos = (e.x, e.y);
                self.mouse_delta = (0.0, 0.0);
            }
            InputEvent::MouseUp(e) => {
                self.mouse_buttons.set(e.button, false);
            }
            InputEvent::MouseMove(e) => {
                self.mouse_delta = (e.x - self.last_mouse_pos.0, e.y - self.last_mouse_pos.1);
                self.last_mouse_pos = (e.x, e.y);
                trace!(dx = self.mouse_delta.0, dy = self.mouse_delta.1, "Mouse moved");
            }
        }
    }

    /// Whether a key is currently held
    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    /// Whether a mouse button is currently held
    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(button)
    }

    /// Movement of the last mouse move event in pixels
    pub fn mouse_delta(&self) -> (f32, f32) {
        self.mouse_delta
    }

    /// Cursor position of the last mouse event
    pub fn last_mouse_pos(&self) -> (f32, f32) {
        self.last_mouse_pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::{KeyboardEvent, MouseButtonEvent, MouseMoveEvent};

    #[test]
    fn test_key_state() {
        let mut input = InputSystem::new();
        assert!(!input.is_key_down(KeyCode::Digit1));

        input.handle(&InputEvent::KeyDown(KeyboardEvent::new(KeyCode::Digit1)));
        assert!(input.is_key_down(KeyCode::Digit1));

        input.handle(&InputEvent::KeyUp(KeyboardEvent::new(KeyCode::Digit1)));
        assert!(!input.is_key_down(KeyCode::Digit1));
    }

    #[test]
    fn test_drag_delta() {
        let mut input = InputSystem::new();
        input.handle(&InputEvent::MouseDown(MouseButtonEvent::new(MouseButton::Left, 100.0, 100.0)));
        assert!(input.is_button_down(MouseButton::Left));

        input.handle(&InputEvent::MouseMove(MouseMoveEvent::new(110.0, 95.0, MouseButtons::LEFT)));
        assert_eq!(input.mouse_delta(), (10.0, -5.0));

        input.handle(&InputEvent::MouseMove(MouseMoveEvent::new(112.0, 95.0, MouseButtons::LEFT)));
        assert_eq!(input.mouse_delta(), (2.0, 0.0));
        assert_eq!(input.last_mouse_pos(), (112.0, 95.0));

        input.handle(&InputEvent::MouseUp(MouseButtonEvent::new(MouseButton::Left, 112.0, 95.0)));
        assert!(!input.is_button_down(MouseButton::Left));
    }
}
