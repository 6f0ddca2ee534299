use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet, VecDeque},
};

use cloudview_assets::ShaderStage;
use glam::Mat4;

use super::{BufferUsage, GraphicsDevice, NO_ERROR, Primitive, VertexAttribute};

/// Sources containing this fail to compile.
pub const FAIL_COMPILE: &str = "FAIL_COMPILE";
/// Programs with an attached source containing this fail to link.
pub const FAIL_LINK: &str = "FAIL_LINK";

#[derive(Clone, Debug, PartialEq)]
pub enum UniformValue {
    Matrix(Mat4),
    Float(f32),
    Vec2(f32, f32),
}

#[derive(Debug)]
struct MockShader {
    stage: ShaderStage,
    source: String,
    compiled: bool,
}

#[derive(Debug, Default)]
struct MockProgram {
    attached: Vec<u32>,
    linked: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCall {
    pub program: Option<u32>,
    pub vertex_array: Option<u32>,
    pub primitive: Primitive,
    pub first: i32,
    pub count: i32,
}

/// Records every call and keeps object lifetimes so tests can spot leaks.
#[derive(Debug, Default)]
pub struct MockDevice {
    next_name: Cell<u32>,
    shaders: RefCell<HashMap<u32, MockShader>>,
    programs: RefCell<HashMap<u32, MockProgram>>,
    buffers: RefCell<HashMap<u32, Vec<u8>>>,
    vertex_arrays: RefCell<HashMap<u32, Vec<VertexAttribute>>>,
    deleted_textures: RefCell<Vec<u32>>,
    errors: RefCell<VecDeque<u32>>,
    locations: RefCell<HashMap<String, i32>>,
    uniforms: RefCell<HashMap<i32, UniformValue>>,
    draws: RefCell<Vec<DrawCall>>,
    current_program: Cell<Option<u32>>,
    current_vertex_array: Cell<Option<u32>>,
    viewport: Cell<(u32, u32)>,
    clears: Cell<usize>,
    capabilities: RefCell<HashSet<&'static str>>,
    refuse_shader: Cell<Option<ShaderStage>>,
    refuse_program: Cell<bool>,
    error_on_draw: Cell<Option<u32>>,
    error_once_on: Cell<Option<(Primitive, u32)>>,
    usages: RefCell<HashMap<u32, BufferUsage>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            next_name: Cell::new(1),
            ..Default::default()
        }
    }

    pub fn push_error(&self, code: u32) {
        self.errors.borrow_mut().push_back(code);
    }

    /// Makes `create_shader` fail for `stage`.
    pub fn refuse_shader(&self, stage: ShaderStage) {
        self.refuse_shader.set(Some(stage));
    }

    pub fn refuse_program(&self) {
        self.refuse_program.set(true);
    }

    /// Raises `code` on every following draw call.
    pub fn error_on_draw(&self, code: u32) {
        self.error_on_draw.set(Some(code));
    }

    /// Raises `code` on the next draw of `primitive` only.
    pub fn error_once_on(&self, primitive: Primitive, code: u32) {
        self.error_once_on.set(Some((primitive, code)));
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.borrow().len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.borrow().len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.borrow().len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.borrow().len()
    }

    pub fn deleted_textures(&self) -> Vec<u32> {
        self.deleted_textures.borrow().clone()
    }

    pub fn is_program(&self, program: u32) -> bool {
        self.programs.borrow().contains_key(&program)
    }

    pub fn is_linked(&self, program: u32) -> bool {
        self.programs.borrow().get(&program).is_some_and(|p| p.linked)
    }

    pub fn attached_stages(&self, program: u32) -> Vec<ShaderStage> {
        let shaders = self.shaders.borrow();
        self.programs
            .borrow()
            .get(&program)
            .map(|p| {
                p.attached
                    .iter()
                    .filter_map(|shader| shaders.get(shader).map(|s| s.stage))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn buffer_contents(&self, buffer: u32) -> Option<Vec<u8>> {
        self.buffers.borrow().get(&buffer).cloned()
    }

    pub fn buffer_usage(&self, buffer: u32) -> Option<BufferUsage> {
        self.usages.borrow().get(&buffer).copied()
    }

    pub fn vertex_layout_of(&self, vertex_array: u32) -> Option<Vec<VertexAttribute>> {
        self.vertex_arrays.borrow().get(&vertex_array).cloned()
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        let location = *self.locations.borrow().get(name)?;
        self.uniforms.borrow().get(&location).cloned()
    }

    pub fn draws(&self) -> Vec<DrawCall> {
        self.draws.borrow().clone()
    }

    pub fn clear_draws(&self) {
        self.draws.borrow_mut().clear();
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        self.viewport.get()
    }

    pub fn clears(&self) -> usize {
        self.clears.get()
    }

    pub fn capability_enabled(&self, name: &str) -> bool {
        self.capabilities.borrow().contains(name)
    }

    fn allocate(&self) -> u32 {
        let name = self.next_name.get();
        self.next_name.set(name + 1);
        name
    }

    fn attached_sources(&self, program: u32) -> Vec<String> {
        let shaders = self.shaders.borrow();
        self.programs
            .borrow()
            .get(&program)
            .map(|p| {
                p.attached
                    .iter()
                    .filter_map(|shader| shaders.get(shader).map(|s| s.source.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl GraphicsDevice for MockDevice {
    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
        if self.refuse_shader.get() == Some(stage) {
            return Err(format!("cannot create {stage} shader"));
        }
        let name = self.allocate();
        self.shaders.borrow_mut().insert(
            name,
            MockShader {
                stage,
                source: String::new(),
                compiled: false,
            },
        );
        Ok(name)
    }

    fn shader_source(&self, shader: u32, source: &str) {
        match self.shaders.borrow_mut().get_mut(&shader) {
            Some(s) => s.source = source.to_owned(),
            None => self.push_error(glow::INVALID_VALUE),
        }
    }

    fn compile_shader(&self, shader: u32) {
        match self.shaders.borrow_mut().get_mut(&shader) {
            Some(s) => s.compiled = !s.source.contains(FAIL_COMPILE),
            None => self.push_error(glow::INVALID_VALUE),
        }
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.shaders.borrow().get(&shader).is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&self, shader: u32) -> String {
        match self.shaders.borrow().get(&shader) {
            Some(s) if !s.compiled => format!("0:1(1): error: {} shader rejected", s.stage),
            _ => String::new(),
        }
    }

    fn delete_shader(&self, shader: u32) {
        self.shaders.borrow_mut().remove(&shader);
    }

    fn create_program(&self) -> Result<u32, String> {
        if self.refuse_program.get() {
            return Err("cannot create program".to_owned());
        }
        let name = self.allocate();
        self.programs.borrow_mut().insert(name, MockProgram::default());
        Ok(name)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        if !self.shaders.borrow().contains_key(&shader) {
            self.push_error(glow::INVALID_VALUE);
            return;
        }
        match self.programs.borrow_mut().get_mut(&program) {
            Some(p) => p.attached.push(shader),
            None => self.errors.borrow_mut().push_back(glow::INVALID_VALUE),
        }
    }

    fn link_program(&self, program: u32) {
        let sources = self.attached_sources(program);
        let compiled = {
            let shaders = self.shaders.borrow();
            self.programs.borrow().get(&program).is_some_and(|p| {
                p.attached
                    .iter()
                    .all(|shader| shaders.get(shader).is_some_and(|s| s.compiled))
            })
        };
        let linked = compiled && !sources.iter().any(|source| source.contains(FAIL_LINK));
        if let Some(p) = self.programs.borrow_mut().get_mut(&program) {
            p.linked = linked;
        }
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.is_linked(program)
    }

    fn program_info_log(&self, program: u32) -> String {
        if self.is_linked(program) {
            String::new()
        } else {
            "error: linking failed".to_owned()
        }
    }

    fn delete_program(&self, program: u32) {
        self.programs.borrow_mut().remove(&program);
        if self.current_program.get() == Some(program) {
            self.current_program.set(None);
        }
    }

    fn use_program(&self, program: Option<u32>) {
        if program.is_some_and(|p| !self.is_linked(p)) {
            self.push_error(glow::INVALID_OPERATION);
            return;
        }
        self.current_program.set(program);
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<i32> {
        let declared = self
            .attached_sources(program)
            .iter()
            .any(|source| source.contains(name));
        if !declared || !self.is_linked(program) {
            return None;
        }
        let mut locations = self.locations.borrow_mut();
        let next = locations.len() as i32;
        Some(*locations.entry(name.to_owned()).or_insert(next))
    }

    fn uniform_matrix4(&self, location: i32, matrix: &Mat4) {
        self.uniforms
            .borrow_mut()
            .insert(location, UniformValue::Matrix(*matrix));
    }

    fn uniform_f32(&self, location: i32, value: f32) {
        self.uniforms
            .borrow_mut()
            .insert(location, UniformValue::Float(value));
    }

    fn uniform_vec2(&self, location: i32, x: f32, y: f32) {
        self.uniforms
            .borrow_mut()
            .insert(location, UniformValue::Vec2(x, y));
    }

    fn create_buffer(&self) -> Result<u32, String> {
        let name = self.allocate();
        self.buffers.borrow_mut().insert(name, Vec::new());
        Ok(name)
    }

    fn buffer_data(&self, buffer: u32, data: &[u8], usage: BufferUsage) {
        match self.buffers.borrow_mut().get_mut(&buffer) {
            Some(contents) => {
                *contents = data.to_vec();
                self.usages.borrow_mut().insert(buffer, usage);
            }
            None => self.errors.borrow_mut().push_back(glow::INVALID_OPERATION),
        }
    }

    fn delete_buffer(&self, buffer: u32) {
        self.buffers.borrow_mut().remove(&buffer);
        self.usages.borrow_mut().remove(&buffer);
    }

    fn create_vertex_array(&self) -> Result<u32, String> {
        let name = self.allocate();
        self.vertex_arrays.borrow_mut().insert(name, Vec::new());
        Ok(name)
    }

    fn vertex_layout(&self, vertex_array: u32, buffer: u32, _stride: i32, attributes: &[VertexAttribute]) {
        if !self.buffers.borrow().contains_key(&buffer) {
            self.push_error(glow::INVALID_OPERATION);
            return;
        }
        match self.vertex_arrays.borrow_mut().get_mut(&vertex_array) {
            Some(layout) => *layout = attributes.to_vec(),
            None => self.errors.borrow_mut().push_back(glow::INVALID_OPERATION),
        }
    }

    fn bind_vertex_array(&self, vertex_array: Option<u32>) {
        self.current_vertex_array.set(vertex_array);
    }

    fn delete_vertex_array(&self, vertex_array: u32) {
        self.vertex_arrays.borrow_mut().remove(&vertex_array);
    }

    fn delete_texture(&self, texture: u32) {
        self.deleted_textures.borrow_mut().push(texture);
    }

    fn clear_color(&self, _r: f32, _g: f32, _b: f32, _a: f32) {}

    fn clear(&self) {
        self.clears.set(self.clears.get() + 1);
    }

    fn enable_depth_test(&self) {
        self.capabilities.borrow_mut().insert("depth_test");
    }

    fn enable_program_point_size(&self) {
        self.capabilities.borrow_mut().insert("program_point_size");
    }

    fn viewport(&self, width: u32, height: u32) {
        self.viewport.set((width, height));
    }

    fn draw_arrays(&self, primitive: Primitive, first: i32, count: i32) {
        if let Some(code) = self.error_on_draw.get() {
            self.push_error(code);
        }
        if let Some((target, code)) = self.error_once_on.get() {
            if target == primitive {
                self.error_once_on.set(None);
                self.push_error(code);
            }
        }
        self.draws.borrow_mut().push(DrawCall {
            program: self.current_program.get(),
            vertex_array: self.current_vertex_array.get(),
            primitive,
            first,
            count,
        });
    }

    fn poll_error(&self) -> u32 {
        self.errors.borrow_mut().pop_front().unwrap_or(NO_ERROR)
    }
}
