use std::{
    fmt,
    path::{Path, PathBuf},
};

use cloudview_core::config::VERSION_TOKEN;
use log::{debug, warn};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    TessControl,
    TessEval,
    Geometry,
    Fragment,
}

impl ShaderStage {
    /// Compile order of a program's stages.
    pub const ALL: [ShaderStage; 5] = [
        ShaderStage::Vertex,
        ShaderStage::TessControl,
        ShaderStage::TessEval,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::TessControl => "tessellation control",
            ShaderStage::TessEval => "tessellation evaluation",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum ShaderSourceError {
    #[error("could not read shader directory {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not read shader file {path}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no shader files found in {0}")]
    Empty(PathBuf),
    #[error("{stage} shader missing from {path}")]
    MissingStage { path: PathBuf, stage: ShaderStage },
}

/// Source text for each stage of one program. Absent stages are skipped.
#[derive(Clone, Debug, Default)]
pub struct ShaderSources {
    pub directory: PathBuf,
    pub vertex: Option<String>,
    pub tess_control: Option<String>,
    pub tess_eval: Option<String>,
    pub geometry: Option<String>,
    pub fragment: Option<String>,
}

impl ShaderSources {
    pub fn get(&self, stage: ShaderStage) -> Option<&str> {
        self.slot(stage).as_deref()
    }

    pub fn set(&mut self, stage: ShaderStage, source: impl Into<String>) {
        *self.slot_mut(stage) = Some(source.into());
    }

    pub fn is_empty(&self) -> bool {
        ShaderStage::ALL.iter().all(|stage| self.get(*stage).is_none())
    }

    pub fn require(&self, stages: &[ShaderStage]) -> Result<(), ShaderSourceError> {
        match stages.iter().find(|stage| self.get(**stage).is_none()) {
            Some(stage) => Err(ShaderSourceError::MissingStage {
                path: self.directory.clone(),
                stage: *stage,
            }),
            None => Ok(()),
        }
    }

    /// Replaces the version placeholder in every stage.
    pub fn with_version(mut self, version: u32) -> Self {
        for stage in ShaderStage::ALL {
            if let Some(source) = self.slot_mut(stage) {
                *source = substitute_version(source, version);
            }
        }
        self
    }

    fn slot(&self, stage: ShaderStage) -> &Option<String> {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::TessControl => &self.tess_control,
            ShaderStage::TessEval => &self.tess_eval,
            ShaderStage::Geometry => &self.geometry,
            ShaderStage::Fragment => &self.fragment,
        }
    }

    fn slot_mut(&mut self, stage: ShaderStage) -> &mut Option<String> {
        match stage {
            ShaderStage::Vertex => &mut self.vertex,
            ShaderStage::TessControl => &mut self.tess_control,
            ShaderStage::TessEval => &mut self.tess_eval,
            ShaderStage::Geometry => &mut self.geometry,
            ShaderStage::Fragment => &mut self.fragment,
        }
    }
}

pub fn substitute_version(source: &str, version: u32) -> String {
    source.replace(VERSION_TOKEN, &version.to_string())
}

/// Works out which stage a file holds from its name, ignoring case.
///
/// Extensions win over name fragments. Tessellation files must use the
/// `.tess` extension and say `cont` or `eval` somewhere in the name.
pub fn classify(file_name: &str) -> Option<ShaderStage> {
    let lower = file_name.to_lowercase();
    let extension = Path::new(&lower)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "tess" if lower.contains("cont") => return Some(ShaderStage::TessControl),
        "tess" if lower.contains("eval") => return Some(ShaderStage::TessEval),
        "tess" => {
            warn!("Skipping tessellation shader {file_name}: name has neither 'cont' nor 'eval'");
            return None;
        }
        "vert" => return Some(ShaderStage::Vertex),
        "frag" => return Some(ShaderStage::Fragment),
        "geom" => return Some(ShaderStage::Geometry),
        _ => {}
    }

    if lower.contains("vert") {
        Some(ShaderStage::Vertex)
    } else if lower.contains("frag") {
        Some(ShaderStage::Fragment)
    } else if lower.contains("geom") {
        Some(ShaderStage::Geometry)
    } else {
        None
    }
}

/// Picks at most one file per stage from `dir` and reads them.
pub fn discover(dir: &Path) -> Result<ShaderSources, ShaderSourceError> {
    let directory_error = |source| ShaderSourceError::Directory {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(directory_error)? {
        let entry = entry.map_err(directory_error)?;
        if entry.path().is_file() {
            entries.push(entry.path());
        }
    }
    // read_dir order is platform dependent.
    entries.sort();

    let mut sources = ShaderSources {
        directory: dir.to_path_buf(),
        ..Default::default()
    };

    for path in entries {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(stage) = classify(&name) else {
            continue;
        };
        if sources.get(stage).is_some() {
            debug!("Ignoring extra {stage} shader {}", path.display());
            continue;
        }

        let text = std::fs::read_to_string(&path).map_err(|source| ShaderSourceError::File {
            path: path.clone(),
            source,
        })?;
        debug!("Found {stage} shader {}", path.display());
        sources.set(stage, text);
    }

    if sources.is_empty() {
        return Err(ShaderSourceError::Empty(dir.to_path_buf()));
    }
    Ok(sources)
}
