use std::num::NonZeroU32;

use cloudview_assets::ShaderStage;
use glam::Mat4;
use glow::HasContext;

use super::{BufferUsage, GraphicsDevice, Primitive, VertexAttribute};

fn shader_type(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::TessControl => glow::TESS_CONTROL_SHADER,
        ShaderStage::TessEval => glow::TESS_EVALUATION_SHADER,
        ShaderStage::Geometry => glow::GEOMETRY_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn native<T>(name: u32, wrap: impl FnOnce(NonZeroU32) -> T) -> Option<T> {
    NonZeroU32::new(name).map(wrap)
}

fn location(location: i32) -> glow::NativeUniformLocation {
    glow::NativeUniformLocation(location as u32)
}

// SAFETY (whole impl): the host makes this context current on the calling
// thread before invoking any scene callback, and every name passed in was
// created by this same context.
impl GraphicsDevice for glow::Context {
    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
        unsafe { HasContext::create_shader(self, shader_type(stage)).map(|s| s.0.get()) }
    }

    fn shader_source(&self, shader: u32, source: &str) {
        if let Some(shader) = native(shader, glow::NativeShader) {
            unsafe { HasContext::shader_source(self, shader, source) }
        }
    }

    fn compile_shader(&self, shader: u32) {
        if let Some(shader) = native(shader, glow::NativeShader) {
            unsafe { HasContext::compile_shader(self, shader) }
        }
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        native(shader, glow::NativeShader)
            .is_some_and(|shader| unsafe { self.get_shader_compile_status(shader) })
    }

    fn shader_info_log(&self, shader: u32) -> String {
        native(shader, glow::NativeShader)
            .map(|shader| unsafe { self.get_shader_info_log(shader) })
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: u32) {
        if let Some(shader) = native(shader, glow::NativeShader) {
            unsafe { HasContext::delete_shader(self, shader) }
        }
    }

    fn create_program(&self) -> Result<u32, String> {
        unsafe { HasContext::create_program(self).map(|p| p.0.get()) }
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        if let (Some(program), Some(shader)) = (
            native(program, glow::NativeProgram),
            native(shader, glow::NativeShader),
        ) {
            unsafe { HasContext::attach_shader(self, program, shader) }
        }
    }

    fn link_program(&self, program: u32) {
        if let Some(program) = native(program, glow::NativeProgram) {
            unsafe { HasContext::link_program(self, program) }
        }
    }

    fn program_link_status(&self, program: u32) -> bool {
        native(program, glow::NativeProgram)
            .is_some_and(|program| unsafe { self.get_program_link_status(program) })
    }

    fn program_info_log(&self, program: u32) -> String {
        native(program, glow::NativeProgram)
            .map(|program| unsafe { self.get_program_info_log(program) })
            .unwrap_or_default()
    }

    fn delete_program(&self, program: u32) {
        if let Some(program) = native(program, glow::NativeProgram) {
            unsafe { HasContext::delete_program(self, program) }
        }
    }

    fn use_program(&self, program: Option<u32>) {
        let program = program.and_then(|p| native(p, glow::NativeProgram));
        unsafe { HasContext::use_program(self, program) }
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<i32> {
        let program = native(program, glow::NativeProgram)?;
        unsafe { self.get_uniform_location(program, name) }.map(|loc| loc.0 as i32)
    }

    fn uniform_matrix4(&self, loc: i32, matrix: &Mat4) {
        unsafe {
            self.uniform_matrix_4_f32_slice(Some(&location(loc)), false, &matrix.to_cols_array())
        }
    }

    fn uniform_f32(&self, loc: i32, value: f32) {
        unsafe { self.uniform_1_f32(Some(&location(loc)), value) }
    }

    fn uniform_vec2(&self, loc: i32, x: f32, y: f32) {
        unsafe { self.uniform_2_f32(Some(&location(loc)), x, y) }
    }

    fn create_buffer(&self) -> Result<u32, String> {
        unsafe { HasContext::create_buffer(self).map(|b| b.0.get()) }
    }

    fn buffer_data(&self, buffer: u32, data: &[u8], usage: BufferUsage) {
        let usage = match usage {
            BufferUsage::StaticDraw => glow::STATIC_DRAW,
            BufferUsage::DynamicDraw => glow::DYNAMIC_DRAW,
        };
        unsafe {
            self.bind_buffer(glow::ARRAY_BUFFER, native(buffer, glow::NativeBuffer));
            self.buffer_data_u8_slice(glow::ARRAY_BUFFER, data, usage);
            self.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn delete_buffer(&self, buffer: u32) {
        if let Some(buffer) = native(buffer, glow::NativeBuffer) {
            unsafe { HasContext::delete_buffer(self, buffer) }
        }
    }

    fn create_vertex_array(&self) -> Result<u32, String> {
        unsafe { HasContext::create_vertex_array(self).map(|v| v.0.get()) }
    }

    fn vertex_layout(&self, vertex_array: u32, buffer: u32, stride: i32, attributes: &[VertexAttribute]) {
        unsafe {
            HasContext::bind_vertex_array(self, native(vertex_array, glow::NativeVertexArray));
            self.bind_buffer(glow::ARRAY_BUFFER, native(buffer, glow::NativeBuffer));
            for attribute in attributes {
                self.enable_vertex_attrib_array(attribute.location);
                self.vertex_attrib_pointer_f32(
                    attribute.location,
                    attribute.components,
                    glow::FLOAT,
                    false,
                    stride,
                    attribute.offset,
                );
            }
            HasContext::bind_vertex_array(self, None);
            self.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn bind_vertex_array(&self, vertex_array: Option<u32>) {
        let vertex_array = vertex_array.and_then(|v| native(v, glow::NativeVertexArray));
        unsafe { HasContext::bind_vertex_array(self, vertex_array) }
    }

    fn delete_vertex_array(&self, vertex_array: u32) {
        if let Some(vertex_array) = native(vertex_array, glow::NativeVertexArray) {
            unsafe { HasContext::delete_vertex_array(self, vertex_array) }
        }
    }

    fn delete_texture(&self, texture: u32) {
        if let Some(texture) = native(texture, glow::NativeTexture) {
            unsafe { HasContext::delete_texture(self, texture) }
        }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { HasContext::clear_color(self, r, g, b, a) }
    }

    fn clear(&self) {
        unsafe { HasContext::clear(self, glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT) }
    }

    fn enable_depth_test(&self) {
        unsafe { self.enable(glow::DEPTH_TEST) }
    }

    fn enable_program_point_size(&self) {
        unsafe { self.enable(glow::PROGRAM_POINT_SIZE) }
    }

    fn viewport(&self, width: u32, height: u32) {
        unsafe { HasContext::viewport(self, 0, 0, width as i32, height as i32) }
    }

    fn draw_arrays(&self, primitive: Primitive, first: i32, count: i32) {
        let mode = match primitive {
            Primitive::Points => glow::POINTS,
            Primitive::Lines => glow::LINES,
            Primitive::TriangleStrip => glow::TRIANGLE_STRIP,
        };
        unsafe { HasContext::draw_arrays(self, mode, first, count) }
    }

    fn poll_error(&self) -> u32 {
        unsafe { self.get_error() }
    }
}
