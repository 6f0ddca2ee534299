use std::rc::Rc;

use cloudview_core::{ButtonAction, CursorStyle, Modifiers, MouseButton, WindowConfig};

use crate::device::GraphicsDevice;

/// Callbacks a host window delivers to whatever it displays.
///
/// All calls happen on the host thread with the scene's context current.
pub trait Scene {
    fn window_config(&self) -> &WindowConfig;

    /// `false` when construction found the scene cannot run.
    fn is_usable(&self) -> bool {
        true
    }

    fn on_initialize(&mut self, gpu: Rc<dyn GraphicsDevice>) -> bool;

    fn on_resized(&mut self, width: u32, height: u32);

    /// Draws one frame; `false` asks the host to stop rendering this scene.
    fn on_render(&mut self) -> bool;

    fn on_cursor_update(&mut self, _x: f64, _y: f64) {}

    /// May ask the host to change the cursor.
    fn on_mouse_click(
        &mut self,
        _button: MouseButton,
        _action: ButtonAction,
        _mods: Modifiers,
    ) -> Option<CursorStyle> {
        None
    }

    fn on_mouse_scroll(&mut self, _dx: f64, _dy: f64) {}

    fn on_focus(&mut self, _focused: bool) {}

    fn on_exit(&mut self) {}
}
