use std::{collections::HashMap, error::Error, num::NonZeroU32, rc::Rc};

use cloudview_core::{ButtonAction, CursorStyle, Modifiers, MouseButton};
use cloudview_renderer::{GraphicsDevice, Scene};
use glutin::{
    config::{Config, ConfigTemplateBuilder, GlConfig},
    context::{
        ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentGlContext,
        PossiblyCurrentContext, PossiblyCurrentGlContext, Version,
    },
    display::{GetGlDisplay, GlDisplay},
    surface::{GlSurface, Surface, SwapInterval, WindowSurface},
};
use glutin_winit::{DisplayBuilder, GlWindow};
use log::{debug, error, info, warn};
use raw_window_handle::HasWindowHandle;
use thiserror::Error;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::ModifiersState,
    window::{CursorIcon, Window, WindowId},
};

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("could not pick a GL configuration: {0}")]
    Display(Box<dyn Error>),
    #[error("display builder returned no window")]
    NoWindow,
    #[error(transparent)]
    Handle(#[from] raw_window_handle::HandleError),
    #[error(transparent)]
    Gl(#[from] glutin::error::Error),
}

/// One scene with the window and GL context it draws into.
// `scene` holds GPU objects and must drop before the context.
struct SceneWindow {
    scene: Box<dyn Scene>,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: Window,
    modifiers: Modifiers,
    rendering: bool,
}

impl SceneWindow {
    fn open(event_loop: &ActiveEventLoop, mut scene: Box<dyn Scene>) -> Result<Self, HostError> {
        let config = scene.window_config().clone();
        let attributes = Window::default_attributes()
            .with_title(config.title.as_str())
            .with_inner_size(LogicalSize::new(config.width, config.height))
            .with_resizable(config.resizable);

        let template = ConfigTemplateBuilder::new().with_depth_size(24);
        let (window, gl_config) = DisplayBuilder::new()
            .with_window_attributes(Some(attributes))
            .build(event_loop, template, pick_config)
            .map_err(HostError::Display)?;
        let window = window.ok_or(HostError::NoWindow)?;

        let raw_handle = window.window_handle()?.as_raw();
        let gl_display = gl_config.display();
        let context_attributes = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(
                config.gl_major,
                config.gl_minor,
            ))))
            .build(Some(raw_handle));

        // SAFETY: the raw handle belongs to `window`, which outlives the context.
        let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes)? };
        let surface_attributes = window.build_surface_attributes(Default::default())?;
        let surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes)? };
        let context = not_current.make_current(&surface)?;

        if let Err(error) = surface.set_swap_interval(&context, SwapInterval::Wait(NonZeroU32::MIN)) {
            debug!("{}: vsync unavailable: {error}", config.title);
        }

        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|name| gl_display.get_proc_address(name))
        };
        let gpu: Rc<dyn GraphicsDevice> = Rc::new(gl);

        let rendering = scene.on_initialize(gpu);
        if rendering {
            info!("{}: initialized", config.title);
        } else {
            error!("{}: initialization failed, nothing will be drawn", config.title);
        }

        let size = window.inner_size();
        scene.on_resized(size.width, size.height);

        Ok(Self {
            scene,
            surface,
            context,
            window,
            modifiers: Modifiers::NONE,
            rendering,
        })
    }

    fn make_current(&self) -> Result<(), glutin::error::Error> {
        if self.context.is_current() {
            return Ok(());
        }
        self.context.make_current(&self.surface)
    }

    fn title(&self) -> &str {
        &self.scene.window_config().title
    }
}

// glutin only calls the picker after `find_configs` matched at least one
// configuration; an empty match is returned from `DisplayBuilder::build` as
// an error, which `open` reports as `HostError::Display`.
fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    most_samples(configs, |config| config.num_samples())
        .expect("glutin hands the picker a non-empty set of configurations")
}

/// The first candidate with the highest sample count.
fn most_samples<T>(candidates: impl Iterator<Item = T>, samples: impl Fn(&T) -> u8) -> Option<T> {
    candidates.reduce(|best, candidate| {
        if samples(&candidate) > samples(&best) {
            candidate
        } else {
            best
        }
    })
}

// The State Machine that owns every scene window
struct SceneRunner {
    pending: Vec<Box<dyn Scene>>,
    windows: HashMap<WindowId, SceneWindow>,
}

impl SceneRunner {
    fn new(scenes: Vec<Box<dyn Scene>>) -> Self {
        Self {
            pending: scenes,
            windows: HashMap::new(),
        }
    }

    fn close(&mut self, event_loop: &ActiveEventLoop, id: WindowId) {
        if let Some(mut closing) = self.windows.remove(&id) {
            info!("{}: closed", closing.title());
            closing.scene.on_exit();
        }
        if self.windows.is_empty() {
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for SceneRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        for scene in self.pending.drain(..) {
            let title = scene.window_config().title.clone();
            if !scene.is_usable() {
                warn!("{title}: not usable, skipping");
                continue;
            }
            match SceneWindow::open(event_loop, scene) {
                Ok(window) => {
                    self.windows.insert(window.window.id(), window);
                }
                Err(error) => error!("{title}: could not open window: {error}"),
            }
        }

        if self.windows.is_empty() {
            warn!("No scene could be opened; stopping");
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        for window in self.windows.values() {
            if window.rendering {
                window.window.request_redraw();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(target) = self.windows.get_mut(&id) else {
            return;
        };
        if let Err(error) = target.make_current() {
            error!("{}: could not make context current: {error}", target.title());
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.close(event_loop, id),
            WindowEvent::Resized(size) => {
                if let (Some(width), Some(height)) =
                    (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
                {
                    target.surface.resize(&target.context, width, height);
                    target.scene.on_resized(size.width, size.height);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                target.scene.on_cursor_update(position.x, position.y);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let style = target
                    .scene
                    .on_mouse_click(map_button(button), map_action(state), target.modifiers);
                if let Some(style) = style {
                    target.window.set_cursor(cursor_icon(style));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let (dx, dy) = scroll_delta(delta);
                target.scene.on_mouse_scroll(dx, dy);
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                target.modifiers = map_modifiers(modifiers.state());
            }
            WindowEvent::Focused(focused) => target.scene.on_focus(focused),
            WindowEvent::RedrawRequested => {
                if !target.rendering {
                    return;
                }
                // 1. Draw
                target.rendering = target.scene.on_render();
                if !target.rendering {
                    warn!("{}: scene asked to stop rendering", target.title());
                }

                // 2. Present
                if let Err(error) = target.surface.swap_buffers(&target.context) {
                    error!("{}: swap failed: {error}", target.title());
                }
            }
            _ => (),
        }
    }
}

/// Opens a window per usable scene and runs until every window is closed.
pub fn run(scenes: Vec<Box<dyn Scene>>) -> Result<(), HostError> {
    let event_loop = EventLoop::new()?;

    // ControlFlow::Poll continuously runs the event loop, even if the OS hasn't
    // dispatched any events. Scenes animate every frame.
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = SceneRunner::new(scenes);
    event_loop.run_app(&mut runner)?;
    Ok(())
}

fn map_button(button: winit::event::MouseButton) -> MouseButton {
    match button {
        winit::event::MouseButton::Left => MouseButton::Left,
        winit::event::MouseButton::Right => MouseButton::Right,
        winit::event::MouseButton::Middle => MouseButton::Middle,
        winit::event::MouseButton::Back => MouseButton::Back,
        winit::event::MouseButton::Forward => MouseButton::Forward,
        winit::event::MouseButton::Other(code) => MouseButton::Other(code),
    }
}

fn map_action(state: ElementState) -> ButtonAction {
    match state {
        ElementState::Pressed => ButtonAction::Press,
        ElementState::Released => ButtonAction::Release,
    }
}

fn map_modifiers(state: ModifiersState) -> Modifiers {
    let mut modifiers = Modifiers::NONE;
    modifiers.set(Modifiers::SHIFT, state.shift_key());
    modifiers.set(Modifiers::CONTROL, state.control_key());
    modifiers.set(Modifiers::ALT, state.alt_key());
    modifiers.set(Modifiers::SUPER, state.super_key());
    modifiers
}

fn cursor_icon(style: CursorStyle) -> CursorIcon {
    match style {
        CursorStyle::Default => CursorIcon::Default,
        CursorStyle::Busy => CursorIcon::Grabbing,
    }
}

fn scroll_delta(delta: MouseScrollDelta) -> (f64, f64) {
    match delta {
        MouseScrollDelta::LineDelta(x, y) => (x as f64, y as f64),
        MouseScrollDelta::PixelDelta(position) => (position.x, position.y),
    }
}
