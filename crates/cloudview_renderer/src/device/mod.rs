use cloudview_assets::ShaderStage;
use glam::Mat4;
use thiserror::Error;

mod glow_backend;
#[cfg(test)]
pub(crate) mod mock;

pub const NO_ERROR: u32 = 0;

#[derive(Debug, Error)]
#[error("OpenGL error during {context}: {}", names(.codes))]
pub struct GraphicsError {
    pub context: &'static str,
    pub codes: Vec<u32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Primitive {
    Points,
    Lines,
    TriangleStrip,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BufferUsage {
    StaticDraw,
    DynamicDraw,
}

/// One float attribute of an interleaved vertex buffer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: i32,
    /// Offset in bytes from the start of the vertex.
    pub offset: i32,
}

/// The OpenGL calls the viewer needs, with raw `u32` object names.
///
/// Creation calls fail with the driver's message; everything else reports
/// through `poll_error`, exactly like the underlying API.
pub trait GraphicsDevice {
    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String>;
    fn shader_source(&self, shader: u32, source: &str);
    fn compile_shader(&self, shader: u32);
    fn shader_compile_status(&self, shader: u32) -> bool;
    fn shader_info_log(&self, shader: u32) -> String;
    fn delete_shader(&self, shader: u32);

    fn create_program(&self) -> Result<u32, String>;
    fn attach_shader(&self, program: u32, shader: u32);
    fn link_program(&self, program: u32);
    fn program_link_status(&self, program: u32) -> bool;
    fn program_info_log(&self, program: u32) -> String;
    fn delete_program(&self, program: u32);
    fn use_program(&self, program: Option<u32>);

    fn uniform_location(&self, program: u32, name: &str) -> Option<i32>;
    fn uniform_matrix4(&self, location: i32, matrix: &Mat4);
    fn uniform_f32(&self, location: i32, value: f32);
    fn uniform_vec2(&self, location: i32, x: f32, y: f32);

    fn create_buffer(&self) -> Result<u32, String>;
    fn buffer_data(&self, buffer: u32, data: &[u8], usage: BufferUsage);
    fn delete_buffer(&self, buffer: u32);

    fn create_vertex_array(&self) -> Result<u32, String>;
    /// Binds `buffer` to `vertex_array` with the given float attributes.
    fn vertex_layout(&self, vertex_array: u32, buffer: u32, stride: i32, attributes: &[VertexAttribute]);
    fn bind_vertex_array(&self, vertex_array: Option<u32>);
    fn delete_vertex_array(&self, vertex_array: u32);

    fn delete_texture(&self, texture: u32);

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&self);
    fn enable_depth_test(&self);
    fn enable_program_point_size(&self);
    fn viewport(&self, width: u32, height: u32);
    fn draw_arrays(&self, primitive: Primitive, first: i32, count: i32);

    /// Returns the oldest pending error flag, `NO_ERROR` when none remain.
    fn poll_error(&self) -> u32;
}

/// Drains every pending error flag.
pub fn drain_errors(gpu: &dyn GraphicsDevice) -> Vec<u32> {
    // GL keeps one flag per error kind; a lost context can report forever.
    let mut codes = Vec::new();
    for _ in 0..16 {
        match gpu.poll_error() {
            NO_ERROR => break,
            code => codes.push(code),
        }
    }
    codes
}

/// Fails when the device has pending errors, appending their names to `log`.
pub fn check_errors(
    gpu: &dyn GraphicsDevice,
    context: &'static str,
    log: &mut String,
) -> Result<(), GraphicsError> {
    let codes = drain_errors(gpu);
    if codes.is_empty() {
        return Ok(());
    }

    let error = GraphicsError { context, codes };
    log.push_str(&error.to_string());
    log.push('\n');
    Err(error)
}

pub fn error_name(code: u32) -> &'static str {
    match code {
        glow::INVALID_ENUM => "GL_INVALID_ENUM",
        glow::INVALID_VALUE => "GL_INVALID_VALUE",
        glow::INVALID_OPERATION => "GL_INVALID_OPERATION",
        glow::STACK_OVERFLOW => "GL_STACK_OVERFLOW",
        glow::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
        glow::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        glow::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        glow::CONTEXT_LOST => "GL_CONTEXT_LOST",
        _ => "unknown GL error",
    }
}

fn names(codes: &[u32]) -> String {
    codes
        .iter()
        .map(|code| format!("{} (0x{code:04X})", error_name(*code)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock::MockDevice;

    #[test]
    fn check_errors_names_every_pending_flag() {
        let gpu = MockDevice::new();
        gpu.push_error(glow::INVALID_ENUM);
        gpu.push_error(glow::OUT_OF_MEMORY);

        let mut log = String::new();
        let error = check_errors(&gpu, "upload", &mut log).unwrap_err();
        assert_eq!(error.codes, vec![glow::INVALID_ENUM, glow::OUT_OF_MEMORY]);
        assert!(log.contains("GL_INVALID_ENUM"));
        assert!(log.contains("GL_OUT_OF_MEMORY"));
        assert!(log.contains("upload"));

        assert!(check_errors(&gpu, "upload", &mut log).is_ok());
    }
}
