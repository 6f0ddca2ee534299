use glam::DVec2;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ButtonAction {
    Press,
    Release,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
    pub struct Modifiers: u8 {
        const NONE    = 0;
        const SHIFT   = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT     = 1 << 2;
        const SUPER   = 1 << 3;
    }
}

/// Cursor the scene asks the host to show.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CursorStyle {
    Default,
    Busy,
}

/// Drag bookkeeping for rotating the camera with the primary button.
#[derive(Clone, Debug, Default)]
pub struct DragState {
    cursor: DVec2,
    drag_start: DVec2,
    dragging: bool,
    last_button: Option<MouseButton>,
    last_action: Option<ButtonAction>,
    last_modifiers: Modifiers,
}

impl DragState {
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn cursor(&self) -> DVec2 {
        self.cursor
    }

    pub fn last_button(&self) -> Option<(MouseButton, ButtonAction, Modifiers)> {
        match (self.last_button, self.last_action) {
            (Some(button), Some(action)) => Some((button, action, self.last_modifiers)),
            _ => None,
        }
    }

    /// Records the cursor and, while dragging, returns the delta since the
    /// previous recorded position.
    pub fn cursor_moved(&mut self, x: f64, y: f64) -> Option<DVec2> {
        self.cursor = DVec2::new(x, y);
        if !self.dragging {
            return None;
        }

        let delta = self.cursor - self.drag_start;
        self.drag_start = self.cursor;
        Some(delta)
    }

    /// Idle -> Dragging on primary press, Dragging -> Idle on primary release.
    /// Returns the cursor the host should switch to, if it changes.
    pub fn button(
        &mut self,
        button: MouseButton,
        action: ButtonAction,
        modifiers: Modifiers,
    ) -> Option<CursorStyle> {
        self.last_button = Some(button);
        self.last_action = Some(action);
        self.last_modifiers = modifiers;

        if button != MouseButton::Left {
            return None;
        }

        match (action, self.dragging) {
            (ButtonAction::Press, false) => {
                self.dragging = true;
                self.drag_start = self.cursor;
                Some(CursorStyle::Busy)
            }
            (ButtonAction::Release, true) => {
                self.dragging = false;
                Some(CursorStyle::Default)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_without_drag_report_nothing() {
        let mut drag = DragState::default();
        assert_eq!(drag.cursor_moved(10.0, 20.0), None);
        assert_eq!(drag.cursor(), DVec2::new(10.0, 20.0));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn primary_press_starts_drag_and_requests_busy_cursor() {
        let mut drag = DragState::default();
        drag.cursor_moved(5.0, 5.0);
        let cursor = drag.button(MouseButton::Left, ButtonAction::Press, Modifiers::SHIFT);
        assert_eq!(cursor, Some(CursorStyle::Busy));
        assert!(drag.is_dragging());
        assert_eq!(
            drag.last_button(),
            Some((MouseButton::Left, ButtonAction::Press, Modifiers::SHIFT))
        );
    }

    #[test]
    fn deltas_are_relative_to_last_position() {
        let mut drag = DragState::default();
        drag.cursor_moved(5.0, 5.0);
        drag.button(MouseButton::Left, ButtonAction::Press, Modifiers::NONE);

        assert_eq!(drag.cursor_moved(8.0, 4.0), Some(DVec2::new(3.0, -1.0)));
        assert_eq!(drag.cursor_moved(8.0, 10.0), Some(DVec2::new(0.0, 6.0)));
    }

    #[test]
    fn release_ends_drag_and_restores_cursor() {
        let mut drag = DragState::default();
        drag.button(MouseButton::Left, ButtonAction::Press, Modifiers::NONE);
        let cursor = drag.button(MouseButton::Left, ButtonAction::Release, Modifiers::NONE);
        assert_eq!(cursor, Some(CursorStyle::Default));
        assert!(!drag.is_dragging());
        assert_eq!(drag.cursor_moved(1.0, 1.0), None);
    }

    #[test]
    fn other_buttons_do_not_drag() {
        let mut drag = DragState::default();
        assert_eq!(
            drag.button(MouseButton::Right, ButtonAction::Press, Modifiers::NONE),
            None
        );
        assert!(!drag.is_dragging());
        assert_eq!(
            drag.button(MouseButton::Left, ButtonAction::Release, Modifiers::NONE),
            None
        );
    }
}
