use std::{path::Path, rc::Rc};

use cloudview_assets::{ShaderSourceError, ShaderSources, ShaderStage, shaders};
use cloudview_core::WindowConfig;
use log::{error, warn};

use crate::{
    compiler::compile_link,
    device::{BufferUsage, GraphicsDevice, Primitive, VertexAttribute, check_errors, drain_errors},
    program::ProgramUnit,
    scene::Scene,
};

/// Full-screen quad built from `gl_VertexID`, used when a sample directory
/// has no vertex shader of its own.
pub const DEFAULT_VERTEX_SHADER: &str = "#version {{ver}} core
const vec2 quadVertices[4] = { vec2(-1.0, -1.0), vec2(1.0, -1.0), vec2(-1.0, 1.0), vec2(1.0, 1.0) };
void main()
{
   gl_Position = vec4(quadVertices[gl_VertexID], 0.0, 1.0);
}
";

/// Added to the `time` uniform after every frame.
pub const TIME_STEP: f32 = 0.1;

const QUAD: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

const QUAD_LAYOUT: [VertexAttribute; 1] = [VertexAttribute {
    location: 0,
    components: 2,
    offset: 0,
}];

/// A fragment shader animated over a full-screen quad.
pub struct ShaderSample {
    window: WindowConfig,
    glsl_version: u32,
    sources: Option<ShaderSources>,
    load_error: Option<ShaderSourceError>,
    unit: Option<ProgramUnit>,
    width: u32,
    height: u32,
    time: f32,
    failed: bool,
}

impl ShaderSample {
    pub fn new(window: WindowConfig, shader_dir: &Path, glsl_version: u32) -> Self {
        let loaded = shaders::discover(shader_dir).and_then(|mut sources| {
            sources.require(&[ShaderStage::Fragment])?;
            if sources.vertex.is_none() {
                sources.set(ShaderStage::Vertex, DEFAULT_VERTEX_SHADER);
            }
            Ok(sources)
        });

        let (sources, load_error) = match loaded {
            Ok(sources) => (Some(sources), None),
            Err(error) => {
                error!("{}: {error}", window.title);
                (None, Some(error))
            }
        };

        Self {
            width: window.width,
            height: window.height,
            window,
            glsl_version,
            sources,
            load_error,
            unit: None,
            time: 0.0,
            failed: false,
        }
    }

    pub fn load_error(&self) -> Option<&ShaderSourceError> {
        self.load_error.as_ref()
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    fn fail(&mut self, message: impl std::fmt::Display) -> bool {
        error!("{}: {message}", self.window.title);
        self.unit = None;
        self.failed = true;
        false
    }
}

impl Scene for ShaderSample {
    fn window_config(&self) -> &WindowConfig {
        &self.window
    }

    fn is_usable(&self) -> bool {
        self.sources.is_some() && !self.failed
    }

    fn on_initialize(&mut self, gpu: Rc<dyn GraphicsDevice>) -> bool {
        let Some(sources) = self.sources.clone() else {
            return self.fail("no shaders to compile");
        };

        gpu.clear_color(0.0, 0.0, 0.0, 0.0);
        gpu.enable_depth_test();

        let mut log = String::new();
        let mut unit = match compile_link(&gpu, &sources.with_version(self.glsl_version), &mut log) {
            Ok(unit) => unit,
            Err(error) => return self.fail(error),
        };

        if let Err(error) = unit.upload_vertices("quad", &QUAD, &QUAD_LAYOUT, BufferUsage::StaticDraw, &mut log) {
            return self.fail(format!("binding quad buffers: {error}"));
        }

        for name in ["time", "resolution"] {
            if unit.cache_uniform(name).is_none() {
                warn!("{}: shader has no '{name}' uniform", self.window.title);
            }
        }

        self.unit = Some(unit);
        true
    }

    fn on_resized(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        if let Some(unit) = &self.unit {
            unit.device().viewport(width, height);
        }
    }

    fn on_render(&mut self) -> bool {
        let Some(unit) = &self.unit else {
            return !self.failed;
        };
        let gpu = unit.device().as_ref();
        let mut log = String::new();
        drain_errors(gpu);

        gpu.clear_color(0.0, 0.0, 0.0, 1.0);
        gpu.clear();

        // 1. Program
        unit.activate();
        if let Err(error) = check_errors(gpu, "sample program", &mut log) {
            error!("{}: {error}", self.window.title);
            return false;
        }

        // 2. Uniforms
        if let Some(location) = unit.uniform("resolution") {
            gpu.uniform_vec2(location, self.width as f32, self.height as f32);
        }
        if let Some(location) = unit.uniform("time") {
            gpu.uniform_f32(location, self.time);
        }
        self.time += TIME_STEP;
        if let Err(error) = check_errors(gpu, "sample uniforms", &mut log) {
            error!("{}: {error}", self.window.title);
            return false;
        }

        // 3. Draw
        gpu.bind_vertex_array(unit.resource("quad_vao"));
        gpu.draw_arrays(Primitive::TriangleStrip, 0, QUAD.len() as i32);
        gpu.bind_vertex_array(None);
        match check_errors(gpu, "sample draw", &mut log) {
            Ok(()) => true,
            Err(error) => {
                error!("{}: {error}", self.window.title);
                false
            }
        }
    }

    fn on_exit(&mut self) {
        self.unit = None;
    }
}
