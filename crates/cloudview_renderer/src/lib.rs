pub mod axes;
pub mod compiler;
pub mod device;
pub mod program;
pub mod sample;
pub mod scene;
pub mod viewer;

pub use compiler::{ShaderError, build_program, compile_link, compile_shader};
pub use device::{BufferUsage, GraphicsDevice, GraphicsError};
pub use program::{BufferError, ProgramUnit, ResourceKind};
pub use sample::ShaderSample;
pub use scene::Scene;
pub use viewer::{PointCloudViewer, ViewerError, ViewerState};
