use std::path::Path;

use cloudview_core::{Centering, ViewerConfig, WindowConfig};
use cloudview_renderer::{PointCloudViewer, Scene, ShaderSample};
use log::{error, info};

const GLSL_VERSION: u32 = 450;
const GL_MAJOR: u8 = 4;
const GL_MINOR: u8 = 5;

const WIDTH: u32 = 1024;
const HEIGHT: u32 = 768;

fn window(title: &str) -> WindowConfig {
    WindowConfig::new(title, WIDTH, HEIGHT).with_gl_version(GL_MAJOR, GL_MINOR)
}

fn cloud(title: &str, ply: &str) -> ViewerConfig {
    ViewerConfig::new(window(title), "shaders/pc", Path::new("shaders/pc").join(ply))
        .with_glsl_version(GLSL_VERSION)
}

fn scenes() -> Vec<Box<dyn Scene>> {
    let sample1 = ShaderSample::new(window("Sample 1"), Path::new("shaders/sample1"), GLSL_VERSION);
    let sample2 = ShaderSample::new(window("Sample 2"), Path::new("shaders/sample2"), GLSL_VERSION);

    let mut penholder = PointCloudViewer::new(
        cloud("Clock Penholder", "clock.ply")
            .with_scale(100.0)
            .with_flip_yz(true)
            .with_centering(Centering::Median),
    );
    penholder.set_radius(10.0);
    penholder.set_point_size(10.0);

    let mut bunny = PointCloudViewer::new(cloud("Bunny", "bunny.ply").with_scale(100.0));
    bunny.set_radius(20.0);

    let mut dodecahedron = PointCloudViewer::new(cloud("Dodecahedron", "dodecahedron.ply"));
    dodecahedron.set_point_size(15.0);

    vec![
        Box::new(sample1),
        Box::new(sample2),
        Box::new(dodecahedron),
        Box::new(penholder),
        Box::new(bunny),
    ]
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let scenes = scenes();
    info!(
        "Opening {} of {} scenes",
        scenes.iter().filter(|scene| scene.is_usable()).count(),
        scenes.len()
    );

    if let Err(error) = cloudview_window::run(scenes) {
        error!("Event loop failed: {error}");
        std::process::exit(1);
    }
}
