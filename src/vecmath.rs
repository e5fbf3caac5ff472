use auto_ops::{impl_op_ex, impl_op_ex_commutative};

use crate::float::Float;
use crate::math::sqr;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Vector3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Vector3f {
    pub const ZERO: Vector3f = Vector3f {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const X: Vector3f = Vector3f {
        x: 1.0,
        y: 0.0,
        z: 0.0,
    };
    pub const Y: Vector3f = Vector3f {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };
    pub const Z: Vector3f = Vector3f {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    };

    pub fn new(x: Float, y: Float, z: Float) -> Vector3f {
        Vector3f { x, y, z }
    }

    pub fn dot(&self, v: &Vector3f) -> Float {
        self.x * v.x + self.y * v.y + self.z * v.z
    }

    pub fn abs_dot(&self, v: &Vector3f) -> Float {
        self.dot(v).abs()
    }

    pub fn cross(&self, v: &Vector3f) -> Vector3f {
        Vector3f {
            x: self.y * v.z - self.z * v.y,
            y: self.z * v.x - self.x * v.z,
            z: self.x * v.y - self.y * v.x,
        }
    }

    pub fn length_squared(&self) -> Float {
        sqr(self.x) + sqr(self.y) + sqr(self.z)
    }

    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }

    pub fn normalize(&self) -> Vector3f {
        *self / self.length()
    }

    pub fn abs(&self) -> Vector3f {
        Vector3f::new(self.x.abs(), self.y.abs(), self.z.abs())
    }

    pub fn max_component(&self) -> Float {
        self.x.max(self.y).max(self.z)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    pub fn axis(&self, i: usize) -> Float {
        match i {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Builds two vectors completing an orthonormal basis with self;
    /// self must be normalized.
    pub fn coordinate_system(&self) -> (Vector3f, Vector3f) {
        let sign = if self.z >= 0.0 { 1.0 } else { -1.0 };
        let a = -1.0 / (sign + self.z);
        let b = self.x * self.y * a;
        let v2 = Vector3f::new(1.0 + sign * sqr(self.x) * a, sign * b, -sign * self.x);
        let v3 = Vector3f::new(b, sign + sqr(self.y) * a, -self.y);
        (v2, v3)
    }
}

impl_op_ex!(+ |a: &Vector3f, b: &Vector3f| -> Vector3f {
    Vector3f::new(a.x + b.x, a.y + b.y, a.z + b.z)
});
impl_op_ex!(-|a: &Vector3f, b: &Vector3f| -> Vector3f {
    Vector3f::new(a.x - b.x, a.y - b.y, a.z - b.z)
});
impl_op_ex!(-|a: &Vector3f| -> Vector3f { Vector3f::new(-a.x, -a.y, -a.z) });
impl_op_ex_commutative!(*|a: &Vector3f, s: Float| -> Vector3f {
    Vector3f::new(a.x * s, a.y * s, a.z * s)
});
impl_op_ex!(/ |a: &Vector3f, s: Float| -> Vector3f {
    Vector3f::new(a.x / s, a.y / s, a.z / s)
});
impl_op_ex!(+= |a: &mut Vector3f, b: &Vector3f| { a.x += b.x; a.y += b.y; a.z += b.z; });
impl_op_ex!(-= |a: &mut Vector3f, b: &Vector3f| { a.x -= b.x; a.y -= b.y; a.z -= b.z; });
impl_op_ex!(*= |a: &mut Vector3f, s: Float| { a.x *= s; a.y *= s; a.z *= s; });

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Point3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Point3f {
    pub const ZERO: Point3f = Point3f {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: Float, y: Float, z: Float) -> Point3f {
        Point3f { x, y, z }
    }

    pub fn distance(&self, p: &Point3f) -> Float {
        (self - p).length()
    }

    pub fn distance_squared(&self, p: &Point3f) -> Float {
        (self - p).length_squared()
    }

    pub fn min(&self, p: &Point3f) -> Point3f {
        Point3f::new(self.x.min(p.x), self.y.min(p.y), self.z.min(p.z))
    }

    pub fn max(&self, p: &Point3f) -> Point3f {
        Point3f::new(self.x.max(p.x), self.y.max(p.y), self.z.max(p.z))
    }

    pub fn axis(&self, i: usize) -> Float {
        match i {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<Point3f> for Vector3f {
    fn from(p: Point3f) -> Vector3f {
        Vector3f::new(p.x, p.y, p.z)
    }
}

impl From<Vector3f> for Point3f {
    fn from(v: Vector3f) -> Point3f {
        Point3f::new(v.x, v.y, v.z)
    }
}

impl_op_ex!(+ |p: &Point3f, v: &Vector3f| -> Point3f {
    Point3f::new(p.x + v.x, p.y + v.y, p.z + v.z)
});
impl_op_ex!(-|p: &Point3f, v: &Vector3f| -> Point3f {
    Point3f::new(p.x - v.x, p.y - v.y, p.z - v.z)
});
impl_op_ex!(-|a: &Point3f, b: &Point3f| -> Vector3f {
    Vector3f::new(a.x - b.x, a.y - b.y, a.z - b.z)
});
impl_op_ex!(+= |p: &mut Point3f, v: &Vector3f| { p.x += v.x; p.y += v.y; p.z += v.z; });

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Normal3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Normal3f {
    pub fn new(x: Float, y: Float, z: Float) -> Normal3f {
        Normal3f { x, y, z }
    }

    pub fn dot(&self, n: &Normal3f) -> Float {
        self.x * n.x + self.y * n.y + self.z * n.z
    }

    pub fn dot_vector(&self, v: &Vector3f) -> Float {
        self.x * v.x + self.y * v.y + self.z * v.z
    }

    pub fn abs_dot_vector(&self, v: &Vector3f) -> Float {
        self.dot_vector(v).abs()
    }

    pub fn length(&self) -> Float {
        (sqr(self.x) + sqr(self.y) + sqr(self.z)).sqrt()
    }

    pub fn normalize(&self) -> Normal3f {
        let len = self.length();
        Normal3f::new(self.x / len, self.y / len, self.z / len)
    }

    /// Flips the normal into the hemisphere containing `v`.
    pub fn face_forward(&self, v: &Vector3f) -> Normal3f {
        if self.dot_vector(v) < 0.0 {
            -self
        } else {
            *self
        }
    }
}

impl From<Vector3f> for Normal3f {
    fn from(v: Vector3f) -> Normal3f {
        Normal3f::new(v.x, v.y, v.z)
    }
}

impl From<Normal3f> for Vector3f {
    fn from(n: Normal3f) -> Vector3f {
        Vector3f::new(n.x, n.y, n.z)
    }
}

impl_op_ex!(-|n: &Normal3f| -> Normal3f { Normal3f::new(-n.x, -n.y, -n.z) });
impl_op_ex!(+ |a: &Normal3f, b: &Normal3f| -> Normal3f {
    Normal3f::new(a.x + b.x, a.y + b.y, a.z + b.z)
});
impl_op_ex_commutative!(*|n: &Normal3f, s: Float| -> Normal3f {
    Normal3f::new(n.x * s, n.y * s, n.z * s)
});

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Point2f {
    pub x: Float,
    pub y: Float,
}

impl Point2f {
    pub const ZERO: Point2f = Point2f { x: 0.0, y: 0.0 };

    pub fn new(x: Float, y: Float) -> Point2f {
        Point2f { x, y }
    }
}

impl_op_ex!(+ |a: &Point2f, b: &Point2f| -> Point2f { Point2f::new(a.x + b.x, a.y + b.y) });
impl_op_ex!(-|a: &Point2f, b: &Point2f| -> Point2f { Point2f::new(a.x - b.x, a.y - b.y) });
impl_op_ex_commutative!(*|a: &Point2f, s: Float| -> Point2f { Point2f::new(a.x * s, a.y * s) });

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Point2i {
    pub x: i32,
    pub y: i32,
}

impl Point2i {
    pub fn new(x: i32, y: i32) -> Point2i {
        Point2i { x, y }
    }
}

impl From<Point2i> for Point2f {
    fn from(p: Point2i) -> Point2f {
        Point2f::new(p.x as Float, p.y as Float)
    }
}

impl_op_ex!(+ |a: &Point2i, b: &Point2i| -> Point2i { Point2i::new(a.x + b.x, a.y + b.y) });
impl_op_ex!(-|a: &Point2i, b: &Point2i| -> Point2i { Point2i::new(a.x - b.x, a.y - b.y) });

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn cross_follows_right_hand_rule() {
        let c = Vector3f::X.cross(&Vector3f::Y);
        assert_eq!(c, Vector3f::Z);
    }

    #[test]
    fn coordinate_system_is_orthonormal() {
        let z = Vector3f::new(0.3, -0.6, 0.2).normalize();
        let (x, y) = z.coordinate_system();
        assert_approx_eq!(Float, x.dot(&y), 0.0, epsilon = 1e-5);
        assert_approx_eq!(Float, x.dot(&z), 0.0, epsilon = 1e-5);
        assert_approx_eq!(Float, y.dot(&z), 0.0, epsilon = 1e-5);
        assert_approx_eq!(Float, x.length(), 1.0, epsilon = 1e-5);
        assert_approx_eq!(Float, y.length(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn face_forward_flips_against_direction() {
        let n = Normal3f::new(0.0, 0.0, 1.0);
        let v = Vector3f::new(0.0, 0.0, -1.0);
        assert_eq!(n.face_forward(&v), Normal3f::new(0.0, 0.0, -1.0));
    }
}
