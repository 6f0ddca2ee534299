use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec3};

/// Rotation applied per drag update (0.05 degrees).
pub const ANGLE_INCREMENT: f32 = 0.05 * PI / 180.0;

/// Fraction of the radius added or removed per scroll notch.
pub const ZOOM_STEP: f32 = 0.1;

#[derive(Clone, Debug)]
pub struct Projection {
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov: 45.0f32.to_radians(),
            aspect_ratio: 4.0 / 3.0,
            near: 0.01,
            far: 100.0,
        }
    }
}

impl Projection {
    /// Perspective for a viewport of `width` x `height` pixels looking at a
    /// cloud whose z-extent is `z_range`.
    pub fn for_viewport(width: u32, height: u32, z_range: f32) -> Self {
        let aspect_ratio = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        let near = 0.01;
        // A flat cloud has no z-extent; keep the frustum non-degenerate.
        let far = (z_range * 3.0).max(near * 2.0);

        Self {
            aspect_ratio,
            near,
            far,
            ..Default::default()
        }
    }

    /// Computes the "Projection Matrix" (World -> Clip), OpenGL depth range.
    pub fn compute_projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov, self.aspect_ratio, self.near, self.far)
    }
}

/// Camera on a sphere around `centroid`.
///
/// `phi` is the polar angle measured from +Y and `theta` the azimuth measured
/// from +Z towards +X. The eye always looks at the centroid and its up vector
/// is the projection of +Y onto the tangent plane at the eye.
#[derive(Clone, Debug)]
pub struct SphericalCamera {
    r: f32,
    phi: f32,
    theta: f32,
    max_r: f32,
    centroid: Vec3,
    eye: Vec3,
    up: Vec3,
}

impl Default for SphericalCamera {
    fn default() -> Self {
        let mut camera = Self {
            r: 1.0,
            phi: PI / 2.0,
            theta: 0.0,
            max_r: 0.0,
            centroid: Vec3::ZERO,
            eye: Vec3::ZERO,
            up: Vec3::Y,
        };
        camera.cartesian();
        camera
    }
}

impl SphericalCamera {
    /// Places a camera for a cloud with characteristic size `max_r`.
    ///
    /// Without an explicit radius the camera sits at `max_r / 2`, on the
    /// equator (`phi = pi/2`) at azimuth zero.
    pub fn fit(max_r: f32, centroid: Vec3, radius: Option<f32>) -> Self {
        let mut camera = Self {
            r: radius.unwrap_or(max_r / 2.0),
            phi: PI / 2.0,
            theta: 0.0,
            max_r,
            centroid,
            eye: Vec3::ZERO,
            up: Vec3::Y,
        };
        camera.cartesian();
        camera
    }

    pub fn radius(&self) -> f32 {
        self.r
    }

    pub fn phi(&self) -> f32 {
        self.phi
    }

    pub fn theta(&self) -> f32 {
        self.theta
    }

    pub fn max_r(&self) -> f32 {
        self.max_r
    }

    pub fn centroid(&self) -> Vec3 {
        self.centroid
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn set_radius(&mut self, r: f32) {
        self.r = r;
        self.cartesian();
    }

    pub fn set_centroid(&mut self, centroid: Vec3) {
        self.centroid = centroid;
        self.cartesian();
    }

    /// Rotates by one fixed increment along whichever axis moved more.
    pub fn drag(&mut self, dx: f32, dy: f32) {
        if dx.abs() >= dy.abs() {
            self.theta = add_angle(self.theta, sign(dx) * ANGLE_INCREMENT, TAU);
        } else {
            self.phi = add_angle(self.phi, sign(dy) * ANGLE_INCREMENT, PI);
        }
        self.cartesian();
    }

    pub fn zoom(&mut self, scroll: f32) {
        self.r += sign(scroll) * ZOOM_STEP * self.r;
        self.r = self.r.clamp(self.max_r / 6.0, self.max_r * 1.5);
        self.cartesian();
    }

    /// View matrix looking from the eye at the centroid.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.centroid, self.up)
    }

    fn cartesian(&mut self) {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        let x = self.r * sin_phi * sin_theta;
        let y = self.r * cos_phi;
        let z = self.r * sin_phi * cos_theta;
        self.eye = self.centroid + Vec3::new(x, y, z);

        let r2 = self.r * self.r;
        let tangent = Vec3::new(-x * y / r2, 1.0 - y * y / r2, -y * z / r2);
        // Zero at the poles; keep the last usable up vector there.
        if let Some(up) = tangent.try_normalize() {
            self.up = up;
        }
    }
}

/// `angle + increment` wrapped into `[0, max)`.
pub fn add_angle(angle: f32, increment: f32, max: f32) -> f32 {
    let wrapped = (angle + increment).rem_euclid(max);
    // rem_euclid can round up to exactly `max` for tiny negative inputs.
    if wrapped >= max { 0.0 } else { wrapped }
}

fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}
