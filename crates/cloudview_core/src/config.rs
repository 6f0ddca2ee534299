use std::path::{Path, PathBuf};

use thiserror::Error;

/// Placeholder replaced by the GLSL version number in shader sources.
pub const VERSION_TOKEN: &str = "{{ver}}";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid shader directory {0}")]
    ShaderDirectory(PathBuf),
    #[error("shader directory {0} has no '{1}' sub-directory")]
    MissingSubdirectory(PathBuf, &'static str),
    #[error("point cloud file {0} is not valid")]
    InvalidPointCloud(PathBuf),
    #[error("point cloud file {path} is not readable: {source}")]
    UnreadablePointCloud {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// How the camera target is derived from the loaded points.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Centering {
    #[default]
    Mean,
    Median,
}

#[derive(Clone, Debug)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub gl_major: u8,
    pub gl_minor: u8,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "cloudview".to_owned(),
            width: 1024,
            height: 768,
            gl_major: 4,
            gl_minor: 4,
            resizable: true,
        }
    }
}

impl WindowConfig {
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_gl_version(mut self, major: u8, minor: u8) -> Self {
        self.gl_major = major;
        self.gl_minor = minor;
        self
    }

    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }
}

#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    /// Must contain `axes` and `cloud` sub-directories.
    pub shader_dir: PathBuf,
    pub ply_path: PathBuf,
    pub scale: f32,
    /// Converts Y-down/Z-forward captures (e.g. Tango) to Y-up.
    pub flip_yz: bool,
    pub centering: Centering,
    pub glsl_version: u32,
}

impl ViewerConfig {
    pub fn new(
        window: WindowConfig,
        shader_dir: impl Into<PathBuf>,
        ply_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            window,
            shader_dir: shader_dir.into(),
            ply_path: ply_path.into(),
            scale: 1.0,
            flip_yz: false,
            centering: Centering::Mean,
            glsl_version: 440,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_flip_yz(mut self, flip_yz: bool) -> Self {
        self.flip_yz = flip_yz;
        self
    }

    pub fn with_centering(mut self, centering: Centering) -> Self {
        self.centering = centering;
        self
    }

    pub fn with_glsl_version(mut self, glsl_version: u32) -> Self {
        self.glsl_version = glsl_version;
        self
    }

    pub fn axes_shader_dir(&self) -> PathBuf {
        self.shader_dir.join("axes")
    }

    pub fn cloud_shader_dir(&self) -> PathBuf {
        self.shader_dir.join("cloud")
    }

    /// Checks the directories and the point cloud file exist before any GL
    /// context is created.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.shader_dir.is_dir() {
            return Err(ConfigError::ShaderDirectory(self.shader_dir.clone()));
        }
        for sub in ["axes", "cloud"] {
            if !self.shader_dir.join(sub).is_dir() {
                return Err(ConfigError::MissingSubdirectory(self.shader_dir.clone(), sub));
            }
        }
        check_readable(&self.ply_path)
    }
}

fn check_readable(path: &Path) -> Result<(), ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::InvalidPointCloud(path.to_path_buf()));
    }
    std::fs::File::open(path)
        .map(|_| ())
        .map_err(|source| ConfigError::UnreadablePointCloud {
            path: path.to_path_buf(),
            source,
        })
}
