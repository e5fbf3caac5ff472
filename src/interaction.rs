use crate::float::Float;
use crate::frame::Frame;
use crate::ray::Ray;
use crate::vecmath::{Normal3f, Point2f, Point3f, Vector3f};

/// Transient record of a ray/surface hit. Built per intersection query
/// and never persisted past the query's scope.
#[derive(Debug, Copy, Clone)]
pub struct SurfaceInteraction {
    pub p: Point3f,
    /// Geometric normal.
    pub n: Normal3f,
    /// Interpolated or remapped shading normal; equals `n` for shapes
    /// without vertex normals.
    pub shading_n: Normal3f,
    pub uv: Point2f,
    pub t: Float,
    /// Direction back toward the ray origin; normalized.
    pub wo: Vector3f,
}

impl SurfaceInteraction {
    pub fn shading_frame(&self) -> Frame {
        Frame::from(self.shading_n)
    }

    /// Ray leaving this point toward `d`, offset past the surface.
    pub fn spawn_ray(&self, d: Vector3f) -> Ray {
        Ray::spawn(self.p, d)
    }
}
