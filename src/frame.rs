use crate::float::Float;
use crate::math::safe_sqrt;
use crate::vecmath::{Normal3f, Vector3f};

/// Orthonormal basis used to move directions between world space and a
/// surface-local space where `z` is the shading normal.
#[derive(Debug, Copy, Clone)]
pub struct Frame {
    pub x: Vector3f,
    pub y: Vector3f,
    pub z: Vector3f,
}

impl Frame {
    pub fn new(x: Vector3f, y: Vector3f, z: Vector3f) -> Frame {
        Frame { x, y, z }
    }

    pub fn from_z(z: Vector3f) -> Frame {
        let (x, y) = z.coordinate_system();
        Frame { x, y, z }
    }

    pub fn from_xz(x: Vector3f, z: Vector3f) -> Frame {
        let y = z.cross(&x);
        Frame::new(x, y, z)
    }

    pub fn to_local(&self, v: &Vector3f) -> Vector3f {
        Vector3f::new(v.dot(&self.x), v.dot(&self.y), v.dot(&self.z))
    }

    pub fn from_local(&self, v: &Vector3f) -> Vector3f {
        v.x * self.x + v.y * self.y + v.z * self.z
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            x: Vector3f::X,
            y: Vector3f::Y,
            z: Vector3f::Z,
        }
    }
}

impl From<Normal3f> for Frame {
    fn from(n: Normal3f) -> Frame {
        Frame::from_z(Vector3f::from(n).normalize())
    }
}

// Local-space angle helpers; all assume the frame convention above.

pub fn cos_theta(w: &Vector3f) -> Float {
    w.z
}

pub fn abs_cos_theta(w: &Vector3f) -> Float {
    w.z.abs()
}

pub fn cos2_theta(w: &Vector3f) -> Float {
    w.z * w.z
}

pub fn sin2_theta(w: &Vector3f) -> Float {
    (1.0 - cos2_theta(w)).max(0.0)
}

pub fn tan2_theta(w: &Vector3f) -> Float {
    sin2_theta(w) / cos2_theta(w)
}

pub fn same_hemisphere(w: &Vector3f, wp: &Vector3f) -> bool {
    w.z * wp.z > 0.0
}

pub fn spherical_direction(sin_theta: Float, cos_theta: Float, phi: Float) -> Vector3f {
    Vector3f::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

pub fn reflect(wo: &Vector3f, n: &Vector3f) -> Vector3f {
    -wo + 2.0 * wo.dot(n) * n
}

/// Snell refraction of `wi` about `n`; `eta` is the relative IOR of the
/// transmitted side. Returns None on total internal reflection.
pub fn refract(wi: &Vector3f, n: &Vector3f, eta: Float) -> Option<Vector3f> {
    let cos_theta_i = n.dot(wi);
    let sin2_theta_i = (1.0 - cos_theta_i * cos_theta_i).max(0.0);
    let sin2_theta_t = sin2_theta_i / (eta * eta);
    if sin2_theta_t >= 1.0 {
        return None;
    }
    let cos_theta_t = safe_sqrt(1.0 - sin2_theta_t);
    Some(-wi / eta + (cos_theta_i / eta - cos_theta_t) * n)
}
