pub mod point_cloud;
pub mod shaders;

pub use point_cloud::{
    Bounds, ColorChannels, LoadOptions, PointCloud, PointCloudError, PointVertex, RawCloud,
};
pub use shaders::{ShaderSourceError, ShaderSources, ShaderStage};
