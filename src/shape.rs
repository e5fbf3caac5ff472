use crate::bounds::Bounds3f;
use crate::bvh::Bvh;
use crate::error::{Error, Result};
use crate::float::{Float, PI};
use crate::interaction::SurfaceInteraction;
use crate::math::{safe_acos, sqr};
use crate::ray::Ray;
use crate::sampling::sample_uniform_triangle;
use crate::sampling::sample_uniform_sphere;
use crate::vecmath::{Normal3f, Point2f, Point3f, Vector3f};

/// Point sampled on a shape's surface, with the pdf taken w.r.t.
/// surface area.
#[derive(Debug, Copy, Clone)]
pub struct ShapeSample {
    pub p: Point3f,
    pub n: Normal3f,
    pub uv: Point2f,
    pub pdf: Float,
}

pub trait ShapeI {
    fn intersect(&self, ray: &Ray) -> Option<SurfaceInteraction>;
    fn intersect_p(&self, ray: &Ray) -> bool;
    fn bounds(&self) -> Bounds3f;
    fn area(&self) -> Float;
    /// Uniform-by-area sample of the surface.
    fn sample(&self, u: &[Float; 3]) -> ShapeSample;
    /// Area pdf of `sample`; constant `1/area`.
    fn pdf_area(&self) -> Float;
}

#[derive(Debug)]
pub enum Shape {
    Sphere(Sphere),
    TriangleMesh(TriangleMesh),
}

impl ShapeI for Shape {
    fn intersect(&self, ray: &Ray) -> Option<SurfaceInteraction> {
        match self {
            Shape::Sphere(s) => s.intersect(ray),
            Shape::TriangleMesh(s) => s.intersect(ray),
        }
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        match self {
            Shape::Sphere(s) => s.intersect_p(ray),
            Shape::TriangleMesh(s) => s.intersect_p(ray),
        }
    }

    fn bounds(&self) -> Bounds3f {
        match self {
            Shape::Sphere(s) => s.bounds(),
            Shape::TriangleMesh(s) => s.bounds(),
        }
    }

    fn area(&self) -> Float {
        match self {
            Shape::Sphere(s) => s.area(),
            Shape::TriangleMesh(s) => s.area(),
        }
    }

    fn sample(&self, u: &[Float; 3]) -> ShapeSample {
        match self {
            Shape::Sphere(s) => s.sample(u),
            Shape::TriangleMesh(s) => s.sample(u),
        }
    }

    fn pdf_area(&self) -> Float {
        match self {
            Shape::Sphere(s) => s.pdf_area(),
            Shape::TriangleMesh(s) => s.pdf_area(),
        }
    }
}

#[derive(Debug)]
pub struct Sphere {
    center: Point3f,
    radius: Float,
}

impl Sphere {
    pub fn new(center: Point3f, radius: Float) -> Result<Sphere> {
        if radius <= 0.0 {
            return Err(Error::InvalidValue {
                name: "radius",
                reason: format!("must be positive, got {}", radius),
            });
        }
        Ok(Sphere { center, radius })
    }
}

impl ShapeI for Sphere {
    fn intersect(&self, ray: &Ray) -> Option<SurfaceInteraction> {
        let oc = ray.o - self.center;
        let a = ray.d.length_squared();
        let b = 2.0 * oc.dot(&ray.d);
        let c = oc.length_squared() - sqr(self.radius);
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();
        let mut t = (-b - sqrt_disc) / (2.0 * a);
        if t < ray.t_min {
            t = (-b + sqrt_disc) / (2.0 * a);
        }
        if t < ray.t_min || t > ray.t_max {
            return None;
        }
        let p = ray.at(t);
        let n = Normal3f::from((p - self.center) / self.radius);
        let local = (p - self.center) / self.radius;
        let phi = local.y.atan2(local.x);
        let theta = safe_acos(local.z);
        let uv = Point2f::new(
            (phi + PI) / (2.0 * PI),
            theta / PI,
        );
        Some(SurfaceInteraction {
            p,
            n,
            shading_n: n,
            uv,
            t,
            wo: -ray.d.normalize(),
        })
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        let oc = ray.o - self.center;
        let a = ray.d.length_squared();
        let b = 2.0 * oc.dot(&ray.d);
        let c = oc.length_squared() - sqr(self.radius);
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return false;
        }
        let sqrt_disc = disc.sqrt();
        let t0 = (-b - sqrt_disc) / (2.0 * a);
        let t1 = (-b + sqrt_disc) / (2.0 * a);
        (t0 >= ray.t_min && t0 <= ray.t_max) || (t1 >= ray.t_min && t1 <= ray.t_max)
    }

    fn bounds(&self) -> Bounds3f {
        let r = Vector3f::new(self.radius, self.radius, self.radius);
        Bounds3f::new(self.center - r, self.center + r)
    }

    fn area(&self) -> Float {
        4.0 * PI * sqr(self.radius)
    }

    fn sample(&self, u: &[Float; 3]) -> ShapeSample {
        let dir = sample_uniform_sphere(Point2f::new(u[0], u[1]));
        let p = self.center + self.radius * dir;
        ShapeSample {
            p,
            n: Normal3f::from(dir),
            uv: Point2f::ZERO,
            pdf: self.pdf_area(),
        }
    }

    fn pdf_area(&self) -> Float {
        1.0 / self.area()
    }
}

/// Indexed triangle mesh with a BVH built over its triangles at
/// construction time.
#[derive(Debug)]
pub struct TriangleMesh {
    positions: Vec<Point3f>,
    indices: Vec<[u32; 3]>,
    normals: Option<Vec<Normal3f>>,
    uvs: Option<Vec<Point2f>>,
    bvh: Bvh,
    /// Cumulative triangle areas for uniform-by-area sampling.
    area_cdf: Vec<Float>,
    total_area: Float,
}

impl TriangleMesh {
    pub fn new(
        positions: Vec<Point3f>,
        indices: Vec<[u32; 3]>,
        normals: Option<Vec<Normal3f>>,
        uvs: Option<Vec<Point2f>>,
    ) -> Result<TriangleMesh> {
        if indices.is_empty() {
            return Err(Error::InvalidValue {
                name: "indices",
                reason: "mesh has no triangles".to_string(),
            });
        }
        let vertex_count = positions.len() as u32;
        if indices.iter().flatten().any(|&i| i >= vertex_count) {
            return Err(Error::InvalidValue {
                name: "indices",
                reason: "vertex index out of range".to_string(),
            });
        }
        if let Some(ns) = &normals {
            if ns.len() != positions.len() {
                return Err(Error::InvalidValue {
                    name: "normals",
                    reason: "normal count differs from vertex count".to_string(),
                });
            }
        }
        if let Some(uvs) = &uvs {
            if uvs.len() != positions.len() {
                return Err(Error::InvalidValue {
                    name: "uvs",
                    reason: "uv count differs from vertex count".to_string(),
                });
            }
        }

        let tri_bounds: Vec<Bounds3f> = indices
            .iter()
            .map(|tri| {
                Bounds3f::from_point(positions[tri[0] as usize])
                    .expand(&positions[tri[1] as usize])
                    .expand(&positions[tri[2] as usize])
            })
            .collect();
        let bvh = Bvh::build(&tri_bounds);

        let mut area_cdf = Vec::with_capacity(indices.len());
        let mut total_area = 0.0;
        for tri in &indices {
            let a = positions[tri[0] as usize];
            let b = positions[tri[1] as usize];
            let c = positions[tri[2] as usize];
            total_area += 0.5 * (b - a).cross(&(c - a)).length();
            area_cdf.push(total_area);
        }
        if total_area <= 0.0 {
            return Err(Error::InvalidValue {
                name: "positions",
                reason: "mesh has zero surface area".to_string(),
            });
        }

        Ok(TriangleMesh {
            positions,
            indices,
            normals,
            uvs,
            bvh,
            area_cdf,
            total_area,
        })
    }

    fn triangle(&self, i: u32) -> (Point3f, Point3f, Point3f) {
        let tri = self.indices[i as usize];
        (
            self.positions[tri[0] as usize],
            self.positions[tri[1] as usize],
            self.positions[tri[2] as usize],
        )
    }

    fn interaction(
        &self,
        ray: &Ray,
        tri_index: u32,
        t: Float,
        b1: Float,
        b2: Float,
    ) -> SurfaceInteraction {
        let tri = self.indices[tri_index as usize];
        let (a, b, c) = self.triangle(tri_index);
        let b0 = 1.0 - b1 - b2;
        let ng = Normal3f::from((b - a).cross(&(c - a)).normalize());
        let shading_n = match &self.normals {
            Some(ns) => {
                let n = b0 * ns[tri[0] as usize]
                    + b1 * ns[tri[1] as usize]
                    + b2 * ns[tri[2] as usize];
                if n.length() > 0.0 {
                    n.normalize()
                } else {
                    ng
                }
            }
            None => ng,
        };
        let uv = match &self.uvs {
            Some(uvs) => {
                b0 * uvs[tri[0] as usize] + b1 * uvs[tri[1] as usize] + b2 * uvs[tri[2] as usize]
            }
            None => Point2f::new(b1, b2),
        };
        SurfaceInteraction {
            p: ray.at(t),
            n: ng,
            shading_n,
            uv,
            t,
            wo: -ray.d.normalize(),
        }
    }
}

impl ShapeI for TriangleMesh {
    fn intersect(&self, ray: &Ray) -> Option<SurfaceInteraction> {
        let mut best: Option<(u32, Float, Float, Float)> = None;
        self.bvh.intersect_closest(ray, |i, t_max| {
            let (a, b, c) = self.triangle(i);
            intersect_triangle(ray, a, b, c, t_max).map(|(t, b1, b2)| {
                best = Some((i, t, b1, b2));
                t
            })
        });
        best.map(|(i, t, b1, b2)| self.interaction(ray, i, t, b1, b2))
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        self.bvh.intersect_any(ray, |i| {
            let (a, b, c) = self.triangle(i);
            intersect_triangle(ray, a, b, c, ray.t_max).is_some()
        })
    }

    fn bounds(&self) -> Bounds3f {
        self.bvh.bounds()
    }

    fn area(&self) -> Float {
        self.total_area
    }

    fn sample(&self, u: &[Float; 3]) -> ShapeSample {
        let target = u[0] * self.total_area;
        let tri_index = self
            .area_cdf
            .partition_point(|&cum| cum < target)
            .min(self.indices.len() - 1);
        let (a, b, c) = self.triangle(tri_index as u32);
        let (b0, b1, b2) = sample_uniform_triangle(Point2f::new(u[1], u[2]));
        let p = Point3f::from(
            b0 * Vector3f::from(a) + b1 * Vector3f::from(b) + b2 * Vector3f::from(c),
        );
        let n = Normal3f::from((b - a).cross(&(c - a)).normalize());
        ShapeSample {
            p,
            n,
            uv: Point2f::new(b1, b2),
            pdf: self.pdf_area(),
        }
    }

    fn pdf_area(&self) -> Float {
        1.0 / self.total_area
    }
}

/// Moller-Trumbore; rejects degenerate triangles by returning no hit.
fn intersect_triangle(
    ray: &Ray,
    a: Point3f,
    b: Point3f,
    c: Point3f,
    t_max: Float,
) -> Option<(Float, Float, Float)> {
    let e1 = b - a;
    let e2 = c - a;
    let pvec = ray.d.cross(&e2);
    let det = e1.dot(&pvec);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = ray.o - a;
    let b1 = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&b1) {
        return None;
    }
    let qvec = tvec.cross(&e1);
    let b2 = ray.d.dot(&qvec) * inv_det;
    if b2 < 0.0 || b1 + b2 > 1.0 {
        return None;
    }
    let t = e2.dot(&qvec) * inv_det;
    if t < ray.t_min || t > t_max {
        return None;
    }
    Some((t, b1, b2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{IndependentSampler, SamplerI};
    use float_cmp::assert_approx_eq;

    fn random_mesh(tri_count: usize, seed: u64) -> TriangleMesh {
        let mut s = IndependentSampler::new(seed);
        let mut positions = Vec::new();
        let mut indices = Vec::new();
        for i in 0..tri_count {
            let [x, y, z] = s.get_3d();
            let base = Point3f::new(x * 20.0 - 10.0, y * 20.0 - 10.0, z * 20.0 - 10.0);
            let [ex, ey, ez] = s.get_3d();
            let e1 = Vector3f::new(ex - 0.5, ey - 0.5, ez - 0.5);
            let [fx, fy, fz] = s.get_3d();
            let e2 = Vector3f::new(fx - 0.5, fy - 0.5, fz - 0.5);
            let v = i as u32 * 3;
            positions.push(base);
            positions.push(base + e1);
            positions.push(base + e2);
            indices.push([v, v + 1, v + 2]);
        }
        TriangleMesh::new(positions, indices, None, None).unwrap()
    }

    fn brute_force(mesh: &TriangleMesh, ray: &Ray) -> Option<(u32, Float)> {
        let mut best: Option<(u32, Float)> = None;
        let mut t_max = ray.t_max;
        for i in 0..mesh.indices.len() as u32 {
            let (a, b, c) = mesh.triangle(i);
            if let Some((t, _, _)) = intersect_triangle(ray, a, b, c, t_max) {
                t_max = t;
                best = Some((i, t));
            }
        }
        best
    }

    #[test]
    fn bvh_matches_brute_force_over_many_rays() {
        let mesh = random_mesh(600, 77);
        let mut s = IndependentSampler::new(123);
        let mut hits = 0;
        for _ in 0..10_000 {
            let [x, y, z] = s.get_3d();
            let o = Point3f::new(x * 40.0 - 20.0, y * 40.0 - 20.0, z * 40.0 - 20.0);
            let d = sample_uniform_sphere(s.get_2d());
            let ray = Ray::new(o, d);

            let expect = brute_force(&mesh, &ray);
            let got = mesh.intersect(&ray);
            match (expect, got) {
                (None, None) => {}
                (Some((_, t)), Some(inter)) => {
                    hits += 1;
                    assert_approx_eq!(Float, t, inter.t, epsilon = 1e-3);
                }
                (e, g) => panic!("bvh disagrees with brute force: {:?} vs {:?}", e, g.map(|i| i.t)),
            }
        }
        assert!(hits > 100, "scene too sparse to be a meaningful test");
    }

    #[test]
    fn sphere_hit_from_outside() {
        let sphere = Sphere::new(Point3f::ZERO, 1.0).unwrap();
        let ray = Ray::new(Point3f::new(0.0, 0.0, -5.0), Vector3f::Z);
        let inter = sphere.intersect(&ray).unwrap();
        assert_approx_eq!(Float, inter.t, 4.0, epsilon = 1e-4);
        assert_approx_eq!(Float, inter.n.z, -1.0, epsilon = 1e-4);
    }

    #[test]
    fn sphere_rejects_invalid_radius() {
        assert!(Sphere::new(Point3f::ZERO, 0.0).is_err());
        assert!(Sphere::new(Point3f::ZERO, -1.0).is_err());
    }

    #[test]
    fn degenerate_triangle_is_no_hit_not_an_error() {
        let a = Point3f::ZERO;
        let ray = Ray::new(Point3f::new(0.0, 0.0, -1.0), Vector3f::Z);
        assert!(intersect_triangle(&ray, a, a, a, Float::INFINITY).is_none());
    }

    #[test]
    fn mesh_sampling_stays_on_surface() {
        let mesh = random_mesh(32, 5);
        let mut s = IndependentSampler::new(6);
        for _ in 0..128 {
            let sample = mesh.sample(&s.get_3d());
            assert!(mesh.bounds().contains(&sample.p));
            assert_approx_eq!(Float, sample.pdf, 1.0 / mesh.area(), epsilon = 1e-6);
        }
    }
}
