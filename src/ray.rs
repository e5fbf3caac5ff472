use crate::float::{Float, EPS};
use crate::vecmath::{Point3f, Vector3f};

/// Parametric ray limited to `[t_min, t_max]`. The direction is not
/// required to be normalized except where an operation says so.
#[derive(Debug, Copy, Clone)]
pub struct Ray {
    pub o: Point3f,
    pub d: Vector3f,
    pub t_min: Float,
    pub t_max: Float,
}

impl Ray {
    pub fn new(o: Point3f, d: Vector3f) -> Ray {
        Ray {
            o,
            d,
            t_min: 0.0,
            t_max: Float::INFINITY,
        }
    }

    pub fn new_with_range(o: Point3f, d: Vector3f, t_min: Float, t_max: Float) -> Ray {
        Ray { o, d, t_min, t_max }
    }

    /// Ray leaving a surface at `o` toward `d`; starts past the
    /// self-intersection epsilon.
    pub fn spawn(o: Point3f, d: Vector3f) -> Ray {
        Ray {
            o,
            d,
            t_min: EPS,
            t_max: Float::INFINITY,
        }
    }

    /// Normalized segment ray between two surface points, shortened at
    /// both ends. Used for visibility tests.
    pub fn between(a: Point3f, b: Point3f) -> Ray {
        let d = b - a;
        let dist = d.length();
        Ray {
            o: a,
            d: d / dist,
            t_min: EPS,
            t_max: dist - EPS,
        }
    }

    pub fn at(&self, t: Float) -> Point3f {
        self.o + t * self.d
    }
}
