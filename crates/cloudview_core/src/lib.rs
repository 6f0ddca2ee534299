pub mod camera;
pub mod config;
pub mod input;

pub use camera::{Projection, SphericalCamera};
pub use config::{Centering, ConfigError, ViewerConfig, WindowConfig};
pub use input::*;
