use std::collections::HashSet;

use glam::DVec2;
use winit::event::{ElementState, MouseButton, VirtualKeyCode};

/// Keyboard and mouse state collected from window events between two
/// updates. Held state persists; press edges are cleared by [`end_frame`].
///
/// [`end_frame`]: InputState::end_frame
#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<VirtualKeyCode>,
    pressed: HashSet<VirtualKeyCode>,
    buttons: HashSet<MouseButton>,
    clicked: HashSet<MouseButton>,
    cursor: DVec2,
    cursor_seen: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_key(&mut self, keycode: VirtualKeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.held.insert(keycode) {
                    self.pressed.insert(keycode);
                }
            }
            ElementState::Released => {
                self.held.remove(&keycode);
            }
        }
    }

    pub fn on_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.buttons.insert(button) {
                    self.clicked.insert(button);
                }
            }
            ElementState::Released => {
                self.buttons.remove(&button);
            }
        }
    }

    /// Raw device motion. The virtual cursor keeps moving while the real
    /// one is grabbed at the window edge.
    pub fn on_mouse_motion(&mut self, (dx, dy): (f64, f64)) {
        self.cursor += DVec2::new(dx, dy);
        self.cursor_seen = true;
    }

    pub fn is_held(&self, keycode: VirtualKeyCode) -> bool {
        self.held.contains(&keycode)
    }

    /// True only for the update following the key going down.
    pub fn was_pressed(&self, keycode: VirtualKeyCode) -> bool {
        self.pressed.contains(&keycode)
    }

    pub fn is_button_held(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    pub fn was_clicked(&self, button: MouseButton) -> bool {
        self.clicked.contains(&button)
    }

    /// Accumulated cursor position, `None` until the mouse first moves.
    pub fn cursor(&self) -> Option<DVec2> {
        self.cursor_seen.then(|| self.cursor)
    }

    pub fn end_frame(&mut self) {
        self.pressed.clear();
        self.clicked.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_edge_lasts_one_frame() {
        let mut input = InputState::new();
        input.on_key(VirtualKeyCode::Key2, ElementState::Pressed);
        assert!(input.was_pressed(VirtualKeyCode::Key2));
        assert!(input.is_held(VirtualKeyCode::Key2));

        input.end_frame();
        assert!(!input.was_pressed(VirtualKeyCode::Key2));
        assert!(input.is_held(VirtualKeyCode::Key2));
    }

    #[test]
    fn key_repeat_does_not_retrigger() {
        let mut input = InputState::new();
        input.on_key(VirtualKeyCode::Key1, ElementState::Pressed);
        input.end_frame();
        input.on_key(VirtualKeyCode::Key1, ElementState::Pressed);
        assert!(!input.was_pressed(VirtualKeyCode::Key1));

        input.on_key(VirtualKeyCode::Key1, ElementState::Released);
        input.on_key(VirtualKeyCode::Key1, ElementState::Pressed);
        assert!(input.was_pressed(VirtualKeyCode::Key1));
    }

    #[test]
    fn cursor_accumulates_motion() {
        let mut input = InputState::new();
        assert_eq!(input.cursor(), None);
        input.on_mouse_motion((3.0, -1.0));
        input.on_mouse_motion((2.0, 4.0));
        assert_eq!(input.cursor(), Some(DVec2::new(5.0, 3.0)));
    }

    #[test]
    fn cursor_keeps_unit_steps_after_long_travel() {
        let mut input = InputState::new();
        input.on_mouse_motion((3e9, 0.0));
        input.on_mouse_motion((1.0, 0.0));
        assert_eq!(input.cursor(), Some(DVec2::new(3e9 + 1.0, 0.0)));
    }

    #[test]
    fn clicks_are_edges() {
        let mut input = InputState::new();
        input.on_mouse_button(MouseButton::Right, ElementState::Pressed);
        assert!(input.was_clicked(MouseButton::Right));
        input.end_frame();
        assert!(!input.was_clicked(MouseButton::Right));
        assert!(input.is_button_held(MouseButton::Right));
    }
}
