use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use bytemuck::{Pod, Zeroable};
use cloudview_core::{Centering, SphericalCamera};
use glam::{DVec3, Vec3};
use log::{debug, info, warn};
use ply_rs::{
    parser::Parser,
    ply::{DefaultElement, ElementDef, Property},
};
use thiserror::Error;

/// Color given to points of clouds without color channels.
pub const DEFAULT_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

#[derive(Debug, Error)]
pub enum PointCloudError {
    #[error("could not open point cloud file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse point cloud header of {path}: {source}")]
    Header {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not read point cloud data of {path}: {source}")]
    Body {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("vertex property '{0}' missing or not numeric")]
    MissingPosition(&'static str),
    #[error("point cloud has no vertices")]
    NoVertices,
}

// Matches the attribute layout of the cloud shaders: two vec4s, stride 32 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PointVertex {
    pub position: [f32; 4],
    pub color: [f32; 4],
}

impl PointVertex {
    pub const FLOATS: usize = 8;

    pub fn xyz(&self) -> Vec3 {
        Vec3::new(self.position[0], self.position[1], self.position[2])
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ColorChannels {
    #[default]
    None,
    Rgb,
    Rgba,
}

#[derive(Clone, Copy, Debug)]
pub struct LoadOptions {
    pub scale: f32,
    pub flip_yz: bool,
    pub centering: Centering,
    /// Camera radius; `None` places the camera at half the cloud diagonal.
    pub radius: Option<f32>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            flip_yz: false,
            centering: Centering::Mean,
            radius: None,
        }
    }
}

/// Axis aligned box around every loaded point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub const EMPTY: Bounds = Bounds {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    pub fn include(self, p: Vec3) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    pub fn ranges(&self) -> Vec3 {
        (self.max - self.min).abs()
    }

    /// Length of the box diagonal.
    pub fn max_r(&self) -> f32 {
        self.ranges().length()
    }
}

/// Points as they appear in the file, before scaling.
#[derive(Clone, Debug, Default)]
pub struct RawCloud {
    pub positions: Vec<[f32; 3]>,
    /// Channel values on a 0-255 scale; alpha is unused for `Rgb`.
    pub colors: Vec<[f32; 4]>,
    pub channels: ColorChannels,
}

#[derive(Clone, Debug)]
pub struct PointCloud {
    pub vertices: Vec<PointVertex>,
    pub bounds: Bounds,
    pub centroid: Vec3,
    pub max_distance: f32,
    pub camera: SphericalCamera,
    pub channels: ColorChannels,
}

impl PointCloud {
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Every point coincides, so the bounds have no extent and the fitted
    /// camera has nowhere to stand.
    pub fn is_degenerate(&self) -> bool {
        self.bounds.max_r() == 0.0
    }

    /// Normalizes raw points and derives bounds, centroid and camera.
    pub fn from_raw(raw: &RawCloud, options: &LoadOptions) -> Result<Self, PointCloudError> {
        if raw.positions.is_empty() {
            return Err(PointCloudError::NoVertices);
        }

        let scan = raw
            .positions
            .iter()
            .enumerate()
            .fold(Scan::new(raw.positions.len(), options.centering), |scan, (i, p)| {
                scan.push(i, *p, raw, options)
            });

        let Scan {
            vertices,
            bounds,
            sum,
            axes,
        } = scan;

        let centroid = match axes {
            None => (sum / vertices.len() as f64).as_vec3(),
            Some([mut xs, mut ys, mut zs]) => {
                Vec3::new(median(&mut xs), median(&mut ys), median(&mut zs))
            }
        };

        let camera = SphericalCamera::fit(bounds.max_r(), centroid, options.radius);
        let eye = camera.eye();
        let max_distance = vertices
            .iter()
            .map(|v| eye.distance(v.xyz()))
            .fold(f32::MIN, f32::max);

        Ok(Self {
            vertices,
            bounds,
            centroid,
            max_distance,
            camera,
            channels: raw.channels,
        })
    }
}

/// Running state of the single pass over the points.
struct Scan {
    vertices: Vec<PointVertex>,
    bounds: Bounds,
    sum: DVec3,
    axes: Option<[Vec<f32>; 3]>,
}

impl Scan {
    fn new(count: usize, centering: Centering) -> Self {
        let axes = match centering {
            Centering::Mean => None,
            Centering::Median => Some([
                Vec::with_capacity(count),
                Vec::with_capacity(count),
                Vec::with_capacity(count),
            ]),
        };
        Self {
            vertices: Vec::with_capacity(count),
            bounds: Bounds::EMPTY,
            sum: DVec3::ZERO,
            axes,
        }
    }

    // Order: scale+flip, color, bounds, median arrays.
    fn push(mut self, i: usize, raw_position: [f32; 3], raw: &RawCloud, options: &LoadOptions) -> Self {
        let flip = if options.flip_yz { -1.0 } else { 1.0 };
        let position = Vec3::new(
            raw_position[0] * options.scale,
            raw_position[1] * options.scale * flip,
            raw_position[2] * options.scale * flip,
        );

        let color = match (raw.channels, raw.colors.get(i)) {
            (ColorChannels::Rgba, Some(c)) => [c[0] / 255.0, c[1] / 255.0, c[2] / 255.0, c[3] / 255.0],
            (ColorChannels::Rgb, Some(c)) => [c[0] / 255.0, c[1] / 255.0, c[2] / 255.0, 1.0],
            _ => DEFAULT_COLOR,
        };

        self.vertices.push(PointVertex {
            position: position.extend(1.0).to_array(),
            color,
        });
        self.bounds = self.bounds.include(position);
        self.sum += position.as_dvec3();
        if let Some([xs, ys, zs]) = self.axes.as_mut() {
            xs.push(position.x);
            ys.push(position.y);
            zs.push(position.z);
        }
        self
    }
}

/// Median by partial selection. Even counts average the two middle values.
pub fn median(values: &mut [f32]) -> f32 {
    let len = values.len();
    if len == 0 {
        return 0.0;
    }

    let mid = len / 2;
    let (lower, upper, _) = values.select_nth_unstable_by(mid, f32::total_cmp);
    let upper = *upper;
    if len % 2 == 1 {
        return upper;
    }

    let below = lower.iter().copied().max_by(f32::total_cmp).unwrap_or(upper);
    (below + upper) / 2.0
}

pub fn load(path: &Path, options: &LoadOptions) -> Result<PointCloud, PointCloudError> {
    let raw = read_ply(path)?;
    let cloud = PointCloud::from_raw(&raw, options)?;
    info!(
        "Loaded {} points from {} ({:?} color)",
        cloud.len(),
        path.display(),
        cloud.channels
    );
    if cloud.is_degenerate() {
        warn!(
            "All points in {} coincide; the cloud has no extent and nothing will be visible",
            path.display()
        );
    }
    Ok(cloud)
}

pub fn read_ply(path: &Path) -> Result<RawCloud, PointCloudError> {
    let file = File::open(path).map_err(|source| PointCloudError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let header = parser
        .read_header(&mut reader)
        .map_err(|source| PointCloudError::Header {
            path: path.to_path_buf(),
            source,
        })?;

    let Some(vertex_def) = header.elements.get("vertex") else {
        return Err(PointCloudError::NoVertices);
    };
    let mut channels = detect_channels(vertex_def);

    let payload = parser
        .read_payload(&mut reader, &header)
        .map_err(|source| PointCloudError::Body {
            path: path.to_path_buf(),
            source,
        })?;
    let elements = payload.get("vertex").map(Vec::as_slice).unwrap_or(&[]);

    let positions = elements
        .iter()
        .map(|element| {
            Ok([
                scalar(element, "x").ok_or(PointCloudError::MissingPosition("x"))?,
                scalar(element, "y").ok_or(PointCloudError::MissingPosition("y"))?,
                scalar(element, "z").ok_or(PointCloudError::MissingPosition("z"))?,
            ])
        })
        .collect::<Result<Vec<_>, PointCloudError>>()?;

    let colors = match read_colors(elements, channels) {
        Some(colors) => colors,
        None => {
            if channels != ColorChannels::None {
                debug!("Could not read colors from {}; using default color", path.display());
            }
            channels = ColorChannels::None;
            Vec::new()
        }
    };

    Ok(RawCloud {
        positions,
        colors,
        channels,
    })
}

fn detect_channels(vertex: &ElementDef) -> ColorChannels {
    let has = |name: &str| vertex.properties.contains_key(name);
    let colored = has("red") || has("green") || has("blue");
    match (colored, has("alpha")) {
        (false, _) => ColorChannels::None,
        (true, false) => ColorChannels::Rgb,
        (true, true) => ColorChannels::Rgba,
    }
}

fn read_colors(elements: &[DefaultElement], channels: ColorChannels) -> Option<Vec<[f32; 4]>> {
    let names: &[&str] = match channels {
        ColorChannels::None => return None,
        ColorChannels::Rgb => &["red", "green", "blue"],
        ColorChannels::Rgba => &["red", "green", "blue", "alpha"],
    };

    elements
        .iter()
        .map(|element| {
            let mut color = [255.0; 4];
            for (slot, name) in color.iter_mut().zip(names) {
                *slot = scalar(element, name)?;
            }
            Some(color)
        })
        .collect()
}

fn scalar(element: &DefaultElement, name: &str) -> Option<f32> {
    match element.get(name)? {
        Property::Char(v) => Some(*v as f32),
        Property::UChar(v) => Some(*v as f32),
        Property::Short(v) => Some(*v as f32),
        Property::UShort(v) => Some(*v as f32),
        Property::Int(v) => Some(*v as f32),
        Property::UInt(v) => Some(*v as f32),
        Property::Float(v) => Some(*v),
        Property::Double(v) => Some(*v as f32),
        _ => None,
    }
}
