use std::rc::Rc;

use cloudview_assets::{Bounds, LoadOptions, PointCloudError, ShaderStage, point_cloud};
use cloudview_core::{
    ButtonAction, ConfigError, CursorStyle, DragState, Modifiers, MouseButton, Projection,
    SphericalCamera, ViewerConfig, WindowConfig,
};
use glam::{Mat4, Vec3};
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::{
    axes::{AXIS_VERTICES, AxisVertex, axis_lines},
    compiler::{ShaderError, build_program},
    device::{BufferUsage, GraphicsDevice, GraphicsError, Primitive, VertexAttribute, check_errors, drain_errors},
    program::{BufferError, ProgramUnit},
    scene::Scene,
};

pub const DEFAULT_POINT_SIZE: f32 = 8.0;

const AXES_UNIFORM: &str = "MVP";
const CLOUD_UNIFORMS: [&str; 4] = ["MV", "P", "maxDistance", "pointSize"];
const REQUIRED_STAGES: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Fragment];

const POINT_LAYOUT: [VertexAttribute; 2] = [
    // position
    VertexAttribute {
        location: 0,
        components: 4,
        offset: 0,
    },
    // color
    VertexAttribute {
        location: 1,
        components: 4,
        offset: 16,
    },
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ViewerState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("point cloud shaders: {0}")]
    Shaders(#[from] ShaderError),
    #[error(transparent)]
    PointCloud(#[from] PointCloudError),
    #[error("point cloud buffers: {0}")]
    Buffers(#[from] BufferError),
    #[error(transparent)]
    Graphics(#[from] GraphicsError),
}

/// Interactive view of one PLY point cloud with optional reference axes.
pub struct PointCloudViewer {
    config: ViewerConfig,
    config_error: Option<ConfigError>,
    state: ViewerState,
    gpu: Option<Rc<dyn GraphicsDevice>>,
    axes: Option<ProgramUnit>,
    cloud: Option<ProgramUnit>,
    count: i32,
    bounds: Bounds,
    max_distance: f32,
    camera: SphericalCamera,
    projection: Projection,
    drag: DragState,
    point_size: f32,
    radius: Option<f32>,
    center: Option<Vec3>,
    focused: bool,
    log: String,
}

impl PointCloudViewer {
    /// Checks the configuration up front; a bad one leaves the viewer
    /// unusable instead of failing.
    pub fn new(config: ViewerConfig) -> Self {
        let config_error = config.validate().err();
        if let Some(error) = &config_error {
            error!("{}: {error}", config.window.title);
        }

        Self {
            config,
            config_error,
            state: ViewerState::Uninitialized,
            gpu: None,
            axes: None,
            cloud: None,
            count: 0,
            bounds: Bounds::EMPTY,
            max_distance: 0.0,
            camera: SphericalCamera::default(),
            projection: Projection::default(),
            drag: DragState::default(),
            point_size: DEFAULT_POINT_SIZE,
            radius: None,
            center: None,
            focused: false,
            log: String::new(),
        }
    }

    pub fn config_error(&self) -> Option<&ConfigError> {
        self.config_error.as_ref()
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    pub fn camera(&self) -> &SphericalCamera {
        &self.camera
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    pub fn point_count(&self) -> usize {
        self.count as usize
    }

    pub fn has_axes(&self) -> bool {
        self.axes.is_some()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Diagnostics collected from the shader compiler and GL error checks.
    pub fn log(&self) -> &str {
        &self.log
    }

    /// Camera distance from the centroid. Before initialization this
    /// replaces the default of half the cloud diagonal.
    pub fn set_radius(&mut self, r: f32) {
        self.radius = Some(r);
        if self.state == ViewerState::Ready {
            self.camera.set_radius(r);
        }
    }

    pub fn set_point_size(&mut self, size: f32) {
        self.point_size = size;
    }

    /// Looks at `(x, y, z) * scale` instead of the computed centroid.
    pub fn set_center(&mut self, x: f32, y: f32, z: f32, scale: f32) {
        let center = Vec3::new(x, y, z) * scale;
        self.center = Some(center);
        if self.state == ViewerState::Ready {
            self.camera.set_centroid(center);
        }
    }

    fn initialize(&mut self, gpu: &Rc<dyn GraphicsDevice>) -> Result<(), ViewerError> {
        gpu.clear_color(0.0, 0.0, 0.0, 0.0);
        gpu.enable_depth_test();

        // 1. Axes are optional
        let axes = self.axes_program(gpu);

        // 2. Point cloud program
        let mut cloud = build_program(
            gpu,
            &self.config.cloud_shader_dir(),
            self.config.glsl_version,
            &REQUIRED_STAGES,
            &mut self.log,
        )?;

        // 3. Uniforms
        for name in CLOUD_UNIFORMS {
            if cloud.cache_uniform(name).is_none() {
                return Err(ShaderError::MissingUniform(name.to_owned()).into());
            }
        }

        // 4. Nothing may be pending before the upload
        check_errors(gpu.as_ref(), "initialization", &mut self.log)?;

        // 5. Point cloud
        let options = LoadOptions {
            scale: self.config.scale,
            flip_yz: self.config.flip_yz,
            centering: self.config.centering,
            radius: self.radius,
        };
        let loaded = point_cloud::load(&self.config.ply_path, &options)?;

        // 6. Vertex buffer
        cloud.upload_vertices(
            "points",
            &loaded.vertices,
            &POINT_LAYOUT,
            BufferUsage::DynamicDraw,
            &mut self.log,
        )?;

        self.count = loaded.len() as i32;
        self.bounds = loaded.bounds;
        self.max_distance = loaded.max_distance;
        self.camera = loaded.camera;
        if let Some(center) = self.center {
            self.camera.set_centroid(center);
        }
        self.projection = Projection::for_viewport(
            self.config.window.width,
            self.config.window.height,
            self.bounds.ranges().z,
        );
        self.cloud = Some(cloud);

        // 7. Axes geometry
        self.axes = axes.and_then(|mut unit| {
            let lines = axis_lines(&self.bounds, self.camera.centroid());
            let layout = AxisVertex::layout();
            match unit.upload_vertices("axes", &lines, &layout, BufferUsage::StaticDraw, &mut self.log) {
                Ok(_) => Some(unit),
                Err(error) => {
                    warn!("{}: axes disabled: {error}", self.config.window.title);
                    None
                }
            }
        });

        Ok(())
    }

    fn axes_program(&mut self, gpu: &Rc<dyn GraphicsDevice>) -> Option<ProgramUnit> {
        let dir = self.config.axes_shader_dir();
        let mut unit = match build_program(
            gpu,
            &dir,
            self.config.glsl_version,
            &REQUIRED_STAGES,
            &mut self.log,
        ) {
            Ok(unit) => unit,
            Err(error) => {
                warn!("Axes shaders in {} unusable, axes will not be displayed: {error}", dir.display());
                return None;
            }
        };

        if unit.cache_uniform(AXES_UNIFORM).is_none() {
            warn!("Axes program has no {AXES_UNIFORM} uniform, axes will not be displayed");
            return None;
        }
        Some(unit)
    }

    fn draw_axes(&self, gpu: &dyn GraphicsDevice, axes: &ProgramUnit, mvp: &Mat4) -> Result<(), GraphicsError> {
        let mut log = String::new();
        axes.activate();
        if let Some(location) = axes.uniform(AXES_UNIFORM) {
            gpu.uniform_matrix4(location, mvp);
        }
        gpu.bind_vertex_array(axes.resource("axes_vao"));
        gpu.draw_arrays(Primitive::Lines, 0, AXIS_VERTICES);
        gpu.bind_vertex_array(None);
        gpu.use_program(None);
        check_errors(gpu, "axes draw", &mut log)
    }

    fn draw_points(
        &self,
        gpu: &dyn GraphicsDevice,
        cloud: &ProgramUnit,
        view: &Mat4,
        projection: &Mat4,
    ) -> Result<(), GraphicsError> {
        let mut log = String::new();
        cloud.activate();
        if let Some(location) = cloud.uniform("MV") {
            gpu.uniform_matrix4(location, view);
        }
        if let Some(location) = cloud.uniform("P") {
            gpu.uniform_matrix4(location, projection);
        }
        if let Some(location) = cloud.uniform("maxDistance") {
            gpu.uniform_f32(location, self.max_distance);
        }
        if let Some(location) = cloud.uniform("pointSize") {
            gpu.uniform_f32(location, self.point_size);
        }
        check_errors(gpu, "point cloud uniforms", &mut log)?;

        gpu.bind_vertex_array(cloud.resource("points_vao"));
        gpu.enable_program_point_size();
        gpu.draw_arrays(Primitive::Points, 0, self.count);
        gpu.bind_vertex_array(None);
        gpu.use_program(None);
        check_errors(gpu, "point cloud draw", &mut log)
    }
}

impl Scene for PointCloudViewer {
    fn window_config(&self) -> &WindowConfig {
        &self.config.window
    }

    fn is_usable(&self) -> bool {
        self.config_error.is_none() && self.state != ViewerState::Failed
    }

    fn on_initialize(&mut self, gpu: Rc<dyn GraphicsDevice>) -> bool {
        if self.state != ViewerState::Uninitialized {
            return self.state == ViewerState::Ready;
        }
        if let Some(error) = &self.config_error {
            error!("{}: not initializing, {error}", self.config.window.title);
            self.state = ViewerState::Failed;
            return false;
        }

        self.state = ViewerState::Initializing;
        match self.initialize(&gpu) {
            Ok(()) => {
                info!(
                    "{}: {} points, max distance {:.3}",
                    self.config.window.title, self.count, self.max_distance
                );
                self.gpu = Some(gpu);
                self.state = ViewerState::Ready;
                true
            }
            Err(error) => {
                error!("{}: {error}", self.config.window.title);
                self.log.push_str(&error.to_string());
                self.log.push('\n');
                self.cloud = None;
                self.axes = None;
                self.state = ViewerState::Failed;
                false
            }
        }
    }

    fn on_resized(&mut self, width: u32, height: u32) {
        self.projection = Projection::for_viewport(width, height, self.bounds.ranges().z);
        if let Some(gpu) = &self.gpu {
            gpu.viewport(width, height);
        }
    }

    fn on_render(&mut self) -> bool {
        match self.state {
            ViewerState::Ready => {}
            ViewerState::Failed => return false,
            ViewerState::Uninitialized | ViewerState::Initializing => return true,
        }
        let (Some(gpu), Some(cloud)) = (&self.gpu, &self.cloud) else {
            return false;
        };
        let gpu = gpu.as_ref();

        let stale = drain_errors(gpu);
        if !stale.is_empty() {
            debug!("Discarding {} GL error(s) from before the frame", stale.len());
        }

        gpu.enable_depth_test();
        gpu.clear_color(0.0, 0.0, 0.0, 1.0);
        gpu.clear();

        let view = self.camera.view_matrix();
        let projection = self.projection.compute_projection_matrix();

        // Only the point draw decides whether the frame failed.
        let axes = self
            .axes
            .as_ref()
            .and_then(|axes| self.draw_axes(gpu, axes, &(projection * view)).err());

        let frame = self.draw_points(gpu, cloud, &view, &projection);

        if let Some(error) = axes {
            warn!("{}: {error}", self.config.window.title);
            self.log.push_str(&error.to_string());
            self.log.push('\n');
        }
        match frame {
            Ok(()) => true,
            Err(error) => {
                error!("{}: {error}", self.config.window.title);
                false
            }
        }
    }

    fn on_cursor_update(&mut self, x: f64, y: f64) {
        if let Some(delta) = self.drag.cursor_moved(x, y) {
            self.camera.drag(delta.x as f32, delta.y as f32);
        }
    }

    fn on_mouse_click(
        &mut self,
        button: MouseButton,
        action: ButtonAction,
        mods: Modifiers,
    ) -> Option<CursorStyle> {
        self.drag.button(button, action, mods)
    }

    fn on_mouse_scroll(&mut self, _dx: f64, dy: f64) {
        self.camera.zoom(dy as f32);
    }

    fn on_focus(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn on_exit(&mut self) {
        debug!("{}: releasing GPU objects", self.config.window.title);
        self.axes = None;
        self.cloud = None;
        self.gpu = None;
    }
}
