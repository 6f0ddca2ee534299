use std::{
    mem,
    path::{Path, PathBuf},
    rc::Rc,
};

use cloudview_assets::{ShaderSourceError, ShaderSources, ShaderStage, shaders};
use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    device::{GraphicsDevice, GraphicsError, check_errors},
    program::ProgramUnit,
};

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("program failed to link:\n{log}")]
    Link { log: String },
    #[error("could not create {stage} shader: {message}")]
    CreateShader { stage: ShaderStage, message: String },
    #[error("could not create program: {0}")]
    CreateProgram(String),
    #[error("attaching shaders failed: {0}")]
    Attach(#[source] GraphicsError),
    #[error(transparent)]
    Graphics(#[from] GraphicsError),
    #[error("could not read shader {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Sources(#[from] ShaderSourceError),
    #[error("uniform {0} not found in program")]
    MissingUniform(String),
}

/// Compiles one stage. `source_or_path` is read from disk when it names an
/// existing file and used as inline source otherwise.
///
/// The compiler log is appended to `log` whether or not compilation worked.
pub fn compile_shader(
    gpu: &dyn GraphicsDevice,
    source_or_path: &str,
    stage: ShaderStage,
    log: &mut String,
) -> Result<u32, ShaderError> {
    let path = Path::new(source_or_path);
    let source = if path.is_file() {
        debug!("Reading {stage} shader from {}", path.display());
        std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        source_or_path.to_owned()
    };

    let shader = gpu
        .create_shader(stage)
        .map_err(|message| ShaderError::CreateShader { stage, message })?;

    gpu.shader_source(shader, &source);
    gpu.compile_shader(shader);

    let info_log = gpu.shader_info_log(shader);
    if !info_log.trim().is_empty() {
        log.push_str(&info_log);
        if !info_log.ends_with('\n') {
            log.push('\n');
        }
    }

    if !gpu.shader_compile_status(shader) {
        gpu.delete_shader(shader);
        return Err(ShaderError::Compile {
            stage,
            log: info_log,
        });
    }
    if let Err(error) = check_errors(gpu, "shader compile", log) {
        gpu.delete_shader(shader);
        return Err(error.into());
    }

    if !info_log.trim().is_empty() {
        info!("{stage} shader compiled with messages:\n{info_log}");
    }
    Ok(shader)
}

/// Stages and program of an unfinished `compile_link` call. Dropping it
/// releases them; `finish` hands them to a `ProgramUnit` instead.
struct Pending<'a> {
    gpu: &'a dyn GraphicsDevice,
    stages: Vec<(ShaderStage, u32)>,
    program: Option<u32>,
}

impl Pending<'_> {
    fn finish(mut self, gpu: Rc<dyn GraphicsDevice>, program: u32) -> ProgramUnit {
        self.program = None;
        ProgramUnit::new(gpu, program, mem::take(&mut self.stages))
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if let Some(program) = self.program.take() {
            self.gpu.delete_program(program);
        }
        for (_, shader) in self.stages.drain(..) {
            self.gpu.delete_shader(shader);
        }
    }
}

/// Compiles every present stage in pipeline order and links them.
///
/// Nothing created by a failed call outlives it.
pub fn compile_link(
    gpu: &Rc<dyn GraphicsDevice>,
    sources: &ShaderSources,
    log: &mut String,
) -> Result<ProgramUnit, ShaderError> {
    let device = gpu.as_ref();
    let mut pending = Pending {
        gpu: device,
        stages: Vec::new(),
        program: None,
    };

    for stage in ShaderStage::ALL {
        let Some(source) = sources.get(stage).filter(|s| !s.trim().is_empty()) else {
            continue;
        };
        let shader = compile_shader(device, source, stage, log)?;
        pending.stages.push((stage, shader));
    }

    let program = device.create_program().map_err(ShaderError::CreateProgram)?;
    pending.program = Some(program);

    for (_, shader) in &pending.stages {
        device.attach_shader(program, *shader);
    }
    check_errors(device, "shader attach", log).map_err(ShaderError::Attach)?;

    device.link_program(program);
    let link_log = device.program_info_log(program);
    if !device.program_link_status(program) {
        log.push_str(&link_log);
        log.push('\n');
        return Err(ShaderError::Link { log: link_log });
    }
    check_errors(device, "program link", log)?;

    if !link_log.trim().is_empty() {
        info!("Program linked with messages:\n{link_log}");
        log.push_str(&link_log);
        log.push('\n');
    }

    Ok(pending.finish(gpu.clone(), program))
}

/// Discovers the shaders in `dir`, fills in the GLSL version and links them.
pub fn build_program(
    gpu: &Rc<dyn GraphicsDevice>,
    dir: &Path,
    glsl_version: u32,
    required: &[ShaderStage],
    log: &mut String,
) -> Result<ProgramUnit, ShaderError> {
    let sources = shaders::discover(dir)?.with_version(glsl_version);
    sources.require(required)?;
    compile_link(gpu, &sources, log).inspect_err(|error| {
        warn!("Shaders in {} failed: {error}", dir.display());
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::{FAIL_COMPILE, FAIL_LINK, MockDevice};

    fn full_sources() -> ShaderSources {
        let mut sources = ShaderSources::default();
        for stage in ShaderStage::ALL {
            sources.set(stage, format!("// {stage}\nvoid main() {{}}"));
        }
        sources
    }

    fn device() -> (Rc<MockDevice>, Rc<dyn GraphicsDevice>) {
        let mock = Rc::new(MockDevice::new());
        let gpu: Rc<dyn GraphicsDevice> = mock.clone();
        (mock, gpu)
    }

    #[test]
    fn empty_stages_are_never_attached() {
        let (mock, gpu) = device();
        let mut sources = ShaderSources::default();
        sources.set(ShaderStage::Vertex, "void main() {}");
        sources.set(ShaderStage::Geometry, "   ");
        sources.set(ShaderStage::Fragment, "void main() {}");

        let mut log = String::new();
        let unit = compile_link(&gpu, &sources, &mut log).unwrap();
        let program = unit.program().unwrap();
        assert!(mock.is_linked(program));
        assert_eq!(
            mock.attached_stages(program),
            vec![ShaderStage::Vertex, ShaderStage::Fragment]
        );
        assert!(unit.stage(ShaderStage::Geometry).is_none());
        assert_eq!(mock.live_shaders(), 2);
    }

    #[test]
    fn failing_stage_leaves_no_handles_behind() {
        for failing in ShaderStage::ALL {
            let (mock, gpu) = device();
            let mut sources = full_sources();
            sources.set(failing, FAIL_COMPILE);

            let mut log = String::new();
            let result = compile_link(&gpu, &sources, &mut log);
            assert!(
                matches!(result, Err(ShaderError::Compile { stage, .. }) if stage == failing),
                "{failing} should fail"
            );
            assert_eq!(mock.live_shaders(), 0, "{failing} leaked a shader");
            assert_eq!(mock.live_programs(), 0);
            assert!(log.contains("rejected"));
        }
    }

    #[test]
    fn shader_creation_failure_releases_earlier_stages() {
        for refused in ShaderStage::ALL {
            let (mock, gpu) = device();
            mock.refuse_shader(refused);
            let result = compile_link(&gpu, &full_sources(), &mut String::new());
            assert!(matches!(result, Err(ShaderError::CreateShader { .. })));
            assert_eq!(mock.live_shaders(), 0);
            assert_eq!(mock.live_programs(), 0);
        }
    }

    #[test]
    fn link_failure_releases_program_and_stages() {
        let (mock, gpu) = device();
        let mut sources = full_sources();
        sources.set(ShaderStage::Fragment, format!("// {FAIL_LINK}\nvoid main() {{}}"));

        let mut log = String::new();
        let result = compile_link(&gpu, &sources, &mut log);
        assert!(matches!(result, Err(ShaderError::Link { .. })));
        assert!(log.contains("linking failed"));
        assert_eq!(mock.live_shaders(), 0);
        assert_eq!(mock.live_programs(), 0);
    }

    #[test]
    fn program_creation_failure_releases_stages() {
        let (mock, gpu) = device();
        mock.refuse_program();
        let result = compile_link(&gpu, &full_sources(), &mut String::new());
        assert!(matches!(result, Err(ShaderError::CreateProgram(_))));
        assert_eq!(mock.live_shaders(), 0);
    }

    #[test]
    fn pending_gl_error_fails_the_stage_and_rolls_back() {
        let (mock, gpu) = device();
        mock.push_error(glow::INVALID_OPERATION);

        let mut log = String::new();
        let result = compile_link(&gpu, &full_sources(), &mut log);
        assert!(matches!(result, Err(ShaderError::Graphics(_))));
        assert!(log.contains("GL_INVALID_OPERATION"));
        assert_eq!(mock.live_shaders(), 0);
        assert_eq!(mock.live_programs(), 0);
    }

    #[test]
    fn compile_reads_source_from_an_existing_file() {
        let (mock, gpu) = device();
        let path = std::env::temp_dir().join(format!("cloudview-compile-{}.frag", std::process::id()));
        std::fs::write(&path, FAIL_COMPILE).unwrap();

        let mut log = String::new();
        let result = compile_shader(gpu.as_ref(), path.to_str().unwrap(), ShaderStage::Fragment, &mut log);
        assert!(matches!(result, Err(ShaderError::Compile { .. })));
        assert_eq!(mock.live_shaders(), 0);

        let shader = compile_shader(gpu.as_ref(), "void main() {}", ShaderStage::Fragment, &mut log).unwrap();
        assert!(mock.shader_compile_status(shader));
    }
}
