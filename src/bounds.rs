use crate::float::Float;
use crate::ray::Ray;
use crate::vecmath::{Point2i, Point3f, Vector3f};

/// Axis-aligned box; empty when any low component reaches the matching
/// high component.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds3f {
    pub low: Point3f,
    pub high: Point3f,
}

/// Relative slack applied to the far slab multiplier so rays grazing a
/// shared face are not rejected by rounding.
const SLAB_SLACK: Float = 1.0 + 1e-5;

impl Bounds3f {
    pub fn new(a: Point3f, b: Point3f) -> Bounds3f {
        Bounds3f {
            low: a.min(&b),
            high: a.max(&b),
        }
    }

    pub fn from_point(p: Point3f) -> Bounds3f {
        Bounds3f { low: p, high: p }
    }

    /// The additive identity for union.
    pub fn empty() -> Bounds3f {
        Bounds3f {
            low: Point3f::new(Float::INFINITY, Float::INFINITY, Float::INFINITY),
            high: Point3f::new(-Float::INFINITY, -Float::INFINITY, -Float::INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.low.x >= self.high.x || self.low.y >= self.high.y || self.low.z >= self.high.z
    }

    pub fn union(&self, other: &Bounds3f) -> Bounds3f {
        Bounds3f {
            low: self.low.min(&other.low),
            high: self.high.max(&other.high),
        }
    }

    pub fn expand(&self, p: &Point3f) -> Bounds3f {
        Bounds3f {
            low: self.low.min(p),
            high: self.high.max(p),
        }
    }

    pub fn contains(&self, p: &Point3f) -> bool {
        p.x >= self.low.x
            && p.x <= self.high.x
            && p.y >= self.low.y
            && p.y <= self.high.y
            && p.z >= self.low.z
            && p.z <= self.high.z
    }

    pub fn contains_bounds(&self, b: &Bounds3f) -> bool {
        self.contains(&b.low) && self.contains(&b.high)
    }

    pub fn diagonal(&self) -> Vector3f {
        self.high - self.low
    }

    pub fn centroid(&self) -> Point3f {
        self.low + 0.5 * self.diagonal()
    }

    pub fn surface_area(&self) -> Float {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.diagonal();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    pub fn max_extent_axis(&self) -> usize {
        let d = self.diagonal();
        if d.x >= d.y && d.x >= d.z {
            0
        } else if d.y >= d.z {
            1
        } else {
            2
        }
    }

    /// Sphere centred on the box centroid enclosing the whole box.
    pub fn bounding_sphere(&self) -> (Point3f, Float) {
        let centre = self.centroid();
        (centre, centre.distance(&self.high))
    }

    /// Slab test; `d_recip` caches the per-component reciprocals of the
    /// ray direction so BVH traversal computes them once per ray.
    pub fn has_intersection_with_recip(&self, ray: &Ray, d_recip: &Vector3f, t_max: Float) -> bool {
        let mut t0 = ray.t_min;
        let mut t1 = t_max;
        for axis in 0..3 {
            let inv = d_recip.axis(axis);
            let mut t_near = (self.low.axis(axis) - ray.o.axis(axis)) * inv;
            let mut t_far = (self.high.axis(axis) - ray.o.axis(axis)) * inv;
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }
            t_far *= SLAB_SLACK;
            t0 = t0.max(t_near);
            t1 = t1.min(t_far);
            if t0 > t1 {
                return false;
            }
        }
        true
    }

    pub fn has_intersection(&self, ray: &Ray) -> bool {
        let d_recip = Vector3f::new(1.0 / ray.d.x, 1.0 / ray.d.y, 1.0 / ray.d.z);
        self.has_intersection_with_recip(ray, &d_recip, ray.t_max)
    }
}

impl Default for Bounds3f {
    fn default() -> Self {
        Bounds3f::empty()
    }
}

/// Half-open pixel rectangle `[low, high)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Bounds2i {
    pub low: Point2i,
    pub high: Point2i,
}

impl Bounds2i {
    pub fn new(low: Point2i, high: Point2i) -> Bounds2i {
        Bounds2i { low, high }
    }

    pub fn width(&self) -> i32 {
        (self.high.x - self.low.x).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.high.y - self.low.y).max(0)
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    pub fn is_empty(&self) -> bool {
        self.low.x >= self.high.x || self.low.y >= self.high.y
    }

    pub fn contains(&self, p: Point2i) -> bool {
        p.x >= self.low.x && p.x < self.high.x && p.y >= self.low.y && p.y < self.high.y
    }

    pub fn intersect(&self, other: &Bounds2i) -> Bounds2i {
        Bounds2i {
            low: Point2i::new(self.low.x.max(other.low.x), self.low.y.max(other.low.y)),
            high: Point2i::new(self.high.x.min(other.high.x), self.high.y.min(other.high.y)),
        }
    }

    pub fn pixels(&self) -> impl Iterator<Item = Point2i> + '_ {
        (self.low.y..self.high.y)
            .flat_map(move |y| (self.low.x..self.high.x).map(move |x| Point2i::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(lx: Float, ly: Float, lz: Float, hx: Float, hy: Float, hz: Float) -> Bounds3f {
        Bounds3f::new(Point3f::new(lx, ly, lz), Point3f::new(hx, hy, hz))
    }

    #[test]
    fn union_is_associative_and_contains_operands() {
        let a = b(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let bb = b(-2.0, 0.5, 0.5, 0.5, 3.0, 0.9);
        let c = b(5.0, -1.0, 2.0, 6.0, 0.0, 4.0);

        assert_eq!(a.union(&bb).union(&c), a.union(&bb.union(&c)));
        assert_eq!(a.union(&bb), bb.union(&a));

        let u = a.union(&bb);
        assert!(u.contains_bounds(&a));
        assert!(u.contains_bounds(&bb));
    }

    #[test]
    fn union_with_empty_is_identity() {
        let a = b(0.0, 0.0, 0.0, 1.0, 2.0, 3.0);
        assert_eq!(a.union(&Bounds3f::empty()), a);
    }

    #[test]
    fn degenerate_box_has_zero_surface_area() {
        let flat = b(0.0, 0.0, 0.0, 1.0, 0.0, 1.0);
        assert_eq!(flat.surface_area(), 0.0);
    }

    #[test]
    fn slab_test_hits_and_misses() {
        let box3 = b(-1.0, -1.0, -1.0, 1.0, 1.0, 1.0);
        let hit = Ray::new(
            Point3f::new(0.0, 0.0, -5.0),
            Vector3f::new(0.0, 0.0, 1.0),
        );
        assert!(box3.has_intersection(&hit));
        let miss = Ray::new(
            Point3f::new(0.0, 5.0, -5.0),
            Vector3f::new(0.0, 0.0, 1.0),
        );
        assert!(!box3.has_intersection(&miss));
    }

    #[test]
    fn pixel_bounds_iteration_covers_area() {
        let r = Bounds2i::new(Point2i::new(1, 1), Point2i::new(4, 3));
        assert_eq!(r.pixels().count() as i64, r.area());
    }
}
