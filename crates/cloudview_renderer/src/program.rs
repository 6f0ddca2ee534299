use std::{collections::HashMap, rc::Rc};

use bytemuck::Pod;
use cloudview_assets::ShaderStage;
use log::debug;
use thiserror::Error;

use crate::device::{BufferUsage, GraphicsDevice, GraphicsError, VertexAttribute, check_errors};

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("could not create {0}: {1}")]
    Create(&'static str, String),
    #[error(transparent)]
    Graphics(#[from] GraphicsError),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceKind {
    Buffer,
    VertexArray,
    Texture,
}

/// A linked program, its compiled stages and the GPU objects drawn with it.
///
/// Everything the unit holds is released together by [`ProgramUnit::del`],
/// which also runs on drop.
pub struct ProgramUnit {
    gpu: Rc<dyn GraphicsDevice>,
    program: Option<u32>,
    stages: Vec<(ShaderStage, u32)>,
    resources: HashMap<String, (ResourceKind, u32)>,
    ints: HashMap<String, i32>,
}

impl ProgramUnit {
    /// Takes ownership of an already linked `program` and its `stages`.
    pub(crate) fn new(gpu: Rc<dyn GraphicsDevice>, program: u32, stages: Vec<(ShaderStage, u32)>) -> Self {
        Self {
            gpu,
            program: Some(program),
            stages,
            resources: HashMap::new(),
            ints: HashMap::new(),
        }
    }

    pub fn program(&self) -> Option<u32> {
        self.program
    }

    pub fn is_linked(&self) -> bool {
        self.program.is_some()
    }

    pub fn stage(&self, stage: ShaderStage) -> Option<u32> {
        self.stages
            .iter()
            .find_map(|(s, handle)| (*s == stage).then_some(*handle))
    }

    pub fn device(&self) -> &Rc<dyn GraphicsDevice> {
        &self.gpu
    }

    /// Binds the program for drawing. Returns `false` once released.
    pub fn activate(&self) -> bool {
        match self.program {
            Some(program) => {
                self.gpu.use_program(Some(program));
                true
            }
            None => false,
        }
    }

    /// Registers a GPU object under `name`; a previous object with that name
    /// is released first.
    pub fn insert_resource(&mut self, name: impl Into<String>, kind: ResourceKind, handle: u32) {
        let name = name.into();
        if let Some((old_kind, old)) = self.resources.insert(name, (kind, handle)) {
            release(self.gpu.as_ref(), old_kind, old);
        }
    }

    pub fn resource(&self, name: &str) -> Option<u32> {
        self.resources.get(name).map(|(_, handle)| *handle)
    }

    pub fn release_resource(&mut self, name: &str) -> bool {
        match self.resources.remove(name) {
            Some((kind, handle)) => {
                release(self.gpu.as_ref(), kind, handle);
                true
            }
            None => false,
        }
    }

    /// Uploads `vertices` into a new buffer and describes it with a new
    /// vertex array, registered as `{name}_vbo` and `{name}_vao`.
    ///
    /// On failure neither object is kept.
    pub fn upload_vertices<T: Pod>(
        &mut self,
        name: &str,
        vertices: &[T],
        attributes: &[VertexAttribute],
        usage: BufferUsage,
        log: &mut String,
    ) -> Result<u32, BufferError> {
        let gpu = self.gpu.clone();
        let vbo = format!("{name}_vbo");
        let vao = format!("{name}_vao");
        self.release_resource(&vbo);
        self.release_resource(&vao);

        let buffer = gpu
            .create_buffer()
            .map_err(|message| BufferError::Create("vertex buffer", message))?;
        self.insert_resource(vbo.as_str(), ResourceKind::Buffer, buffer);
        gpu.buffer_data(buffer, bytemuck::cast_slice(vertices), usage);

        let vertex_array = match gpu.create_vertex_array() {
            Ok(vertex_array) => vertex_array,
            Err(message) => {
                self.release_resource(&vbo);
                return Err(BufferError::Create("vertex array", message));
            }
        };
        self.insert_resource(vao.as_str(), ResourceKind::VertexArray, vertex_array);
        gpu.vertex_layout(vertex_array, buffer, size_of::<T>() as i32, attributes);

        if let Err(error) = check_errors(gpu.as_ref(), "vertex upload", log) {
            self.release_resource(&vbo);
            self.release_resource(&vao);
            return Err(error.into());
        }
        Ok(vertex_array)
    }

    /// Looks up a uniform once and caches its location. `None` when the
    /// linked program does not expose it.
    pub fn cache_uniform(&mut self, name: &str) -> Option<i32> {
        if let Some(location) = self.ints.get(name) {
            return Some(*location);
        }
        let location = self.gpu.uniform_location(self.program?, name)?;
        self.ints.insert(name.to_owned(), location);
        Some(location)
    }

    pub fn uniform(&self, name: &str) -> Option<i32> {
        self.ints.get(name).copied()
    }

    /// Releases every owned object. Safe to call more than once.
    pub fn del(&mut self) {
        for (name, (kind, handle)) in self.resources.drain() {
            debug!("Releasing {kind:?} {name} ({handle})");
            release(self.gpu.as_ref(), kind, handle);
        }
        self.ints.clear();

        for (_, shader) in self.stages.drain(..) {
            self.gpu.delete_shader(shader);
        }
        if let Some(program) = self.program.take() {
            self.gpu.delete_program(program);
        }
    }
}

impl Drop for ProgramUnit {
    fn drop(&mut self) {
        self.del();
    }
}

fn release(gpu: &dyn GraphicsDevice, kind: ResourceKind, handle: u32) {
    match kind {
        ResourceKind::Buffer => gpu.delete_buffer(handle),
        ResourceKind::VertexArray => gpu.delete_vertex_array(handle),
        ResourceKind::Texture => gpu.delete_texture(handle),
    }
}
