use std::sync::Arc;

use crate::bounds::Bounds3f;
use crate::error::{Error, Result};
use crate::float::{Float, INV_4PI, PI};
use crate::frame::Frame;
use crate::paramset::ParamSet;
use crate::sampling::{
    cosine_hemisphere_pdf, sample_cosine_hemisphere, sample_uniform_disk_concentric,
    sample_uniform_sphere, uniform_sphere_pdf,
};
use crate::shape::{Shape, ShapeI};
use crate::spectrum::Spectrum;
use crate::vecmath::{Normal3f, Point2f, Point3f, Vector3f};

/// Incident-light sample toward a reference point; `pdf` is w.r.t.
/// solid angle at the reference point. A zero pdf marks a failed
/// sample.
#[derive(Debug, Copy, Clone)]
pub struct LightLiSample {
    pub radiance: Spectrum,
    /// Point on the light (for environment lights, a virtual point on
    /// the enclosing sphere).
    pub pos: Point3f,
    pub nor: Normal3f,
    pub pdf: Float,
}

impl LightLiSample {
    pub fn dir_from(&self, ref_p: Point3f) -> Vector3f {
        (self.pos - ref_p).normalize()
    }
}

/// Emission sample used by bidirectional algorithms: a position on the
/// light with an outgoing direction, with separate area and
/// solid-angle pdfs.
#[derive(Debug, Copy, Clone)]
pub struct LightEmitSample {
    pub pos: Point3f,
    pub dir: Vector3f,
    pub nor: Normal3f,
    pub uv: Point2f,
    pub radiance: Spectrum,
    pub pdf_pos: Float,
    pub pdf_dir: Float,
}

#[derive(Debug, Copy, Clone)]
pub struct LightEmitPdf {
    pub pdf_pos: Float,
    pub pdf_dir: Float,
}

#[derive(Debug)]
pub enum Light {
    Area(AreaLight),
    Environment(EnvironmentLight),
    Directional(DirectionalLight),
}

impl Light {
    /// Factory for lights that are not bound to scene geometry; area
    /// lights are built from emissive entities instead.
    pub fn create(name: &str, params: &ParamSet) -> Result<Light> {
        match name {
            "native_sky" | "sky" => Ok(Light::Environment(EnvironmentLight::new(
                params.get_spectrum("top", Spectrum::splat(0.5)),
                params.get_spectrum("bottom", Spectrum::splat(0.1)),
            ))),
            "directional" => {
                let dir = params.require_vec3("direction")?;
                if dir.length_squared() == 0.0 {
                    return Err(Error::InvalidValue {
                        name: "direction",
                        reason: "zero-length direction".to_string(),
                    });
                }
                Ok(Light::Directional(DirectionalLight::new(
                    dir.normalize(),
                    params.require_spectrum("radiance")?,
                )))
            }
            _ => Err(Error::UnknownType {
                kind: "light",
                name: name.to_string(),
            }),
        }
    }

    pub fn as_area(&self) -> Option<&AreaLight> {
        match self {
            Light::Area(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_environment(&self) -> Option<&EnvironmentLight> {
        match self {
            Light::Environment(l) => Some(l),
            _ => None,
        }
    }

    /// Delta lights cannot be hit by BSDF-sampled rays, so MIS treats
    /// their contribution as light-sampling-only.
    pub fn is_delta(&self) -> bool {
        matches!(self, Light::Directional(_))
    }

    pub fn sample_li(&self, ref_p: Point3f, u: &[Float; 5]) -> Option<LightLiSample> {
        match self {
            Light::Area(l) => l.sample_li(ref_p, u),
            Light::Environment(l) => Some(l.sample_li(ref_p, u)),
            Light::Directional(l) => Some(l.sample_li(ref_p)),
        }
    }

    pub fn sample_emit(&self, u: &[Float; 5]) -> LightEmitSample {
        match self {
            Light::Area(l) => l.sample_emit(u),
            Light::Environment(l) => l.sample_emit(u),
            Light::Directional(l) => l.sample_emit(u),
        }
    }

    pub fn emit_pdf(&self, pos: Point3f, dir: Vector3f, nor: Normal3f) -> LightEmitPdf {
        match self {
            Light::Area(l) => l.emit_pdf(pos, dir, nor),
            Light::Environment(l) => l.emit_pdf(),
            Light::Directional(l) => l.emit_pdf(),
        }
    }

    pub fn power(&self) -> Spectrum {
        match self {
            Light::Area(l) => l.power(),
            Light::Environment(l) => l.power(),
            Light::Directional(l) => l.power(),
        }
    }

    /// Derives the enclosing-sphere geometry for infinite lights; runs
    /// once per render before the scene is frozen.
    pub fn preprocess(&mut self, world_bound: &Bounds3f) {
        match self {
            Light::Area(_) => {}
            Light::Environment(l) => l.preprocess(world_bound),
            Light::Directional(l) => l.preprocess(world_bound),
        }
    }
}

/// Lambertian emitter bound to a shape; emits from the normal side
/// only.
#[derive(Debug)]
pub struct AreaLight {
    shape: Arc<Shape>,
    radiance: Spectrum,
}

impl AreaLight {
    pub fn new(shape: Arc<Shape>, radiance: Spectrum) -> AreaLight {
        AreaLight { shape, radiance }
    }

    /// Emitted radiance leaving `pos` toward `light_to_out`.
    pub fn radiance(&self, nor: Normal3f, light_to_out: &Vector3f) -> Spectrum {
        if nor.dot_vector(light_to_out) > 0.0 {
            self.radiance
        } else {
            Spectrum::BLACK
        }
    }

    fn sample_li(&self, ref_p: Point3f, u: &[Float; 5]) -> Option<LightLiSample> {
        let s = self.shape.sample(&[u[0], u[1], u[2]]);
        let to_ref = ref_p - s.p;
        let dist2 = to_ref.length_squared();
        if dist2 == 0.0 {
            return None;
        }
        let cos_light = s.n.dot_vector(&to_ref.normalize());
        if cos_light <= 0.0 {
            return None;
        }
        // Convert the area pdf to solid angle at the reference point.
        let pdf = s.pdf * dist2 / cos_light;
        Some(LightLiSample {
            radiance: self.radiance,
            pos: s.p,
            nor: s.n,
            pdf,
        })
    }

    /// Solid-angle pdf of light-sampling the point `pos` from `ref_p`;
    /// used as the MIS counterpart when a BSDF ray hits this light.
    pub fn pdf_li(&self, ref_p: Point3f, pos: Point3f, nor: Normal3f) -> Float {
        let to_ref = ref_p - pos;
        let dist2 = to_ref.length_squared();
        if dist2 == 0.0 {
            return 0.0;
        }
        let cos_light = nor.dot_vector(&to_ref.normalize());
        if cos_light <= 0.0 {
            return 0.0;
        }
        self.shape.pdf_area() * dist2 / cos_light
    }

    fn sample_emit(&self, u: &[Float; 5]) -> LightEmitSample {
        let s = self.shape.sample(&[u[0], u[1], u[2]]);
        let frame = Frame::from(s.n);
        let local = sample_cosine_hemisphere(Point2f::new(u[3], u[4]));
        let dir = frame.from_local(&local);
        LightEmitSample {
            pos: s.p,
            dir,
            nor: s.n,
            uv: s.uv,
            radiance: self.radiance,
            pdf_pos: s.pdf,
            pdf_dir: cosine_hemisphere_pdf(local.z.max(0.0)),
        }
    }

    fn emit_pdf(&self, _pos: Point3f, dir: Vector3f, nor: Normal3f) -> LightEmitPdf {
        let cos = nor.dot_vector(&dir);
        LightEmitPdf {
            pdf_pos: self.shape.pdf_area(),
            pdf_dir: if cos > 0.0 {
                cosine_hemisphere_pdf(cos)
            } else {
                0.0
            },
        }
    }

    fn power(&self) -> Spectrum {
        self.radiance * PI * self.shape.area()
    }
}

/// Gradient sky: radiance blends from `bottom` at the nadir to `top`
/// at the zenith. Directions are sampled uniformly over the sphere.
#[derive(Debug)]
pub struct EnvironmentLight {
    top: Spectrum,
    bottom: Spectrum,
    world_centre: Point3f,
    world_radius: Float,
}

/// Inflation applied to the scene bounding sphere so rays emitted from
/// the virtual environment surface start outside all geometry.
const WORLD_RADIUS_SCALE: Float = 1.01;

impl EnvironmentLight {
    pub fn new(top: Spectrum, bottom: Spectrum) -> EnvironmentLight {
        EnvironmentLight {
            top,
            bottom,
            world_centre: Point3f::ZERO,
            world_radius: 1.0,
        }
    }

    fn preprocess(&mut self, world_bound: &Bounds3f) {
        let (centre, radius) = world_bound.bounding_sphere();
        self.world_centre = centre;
        self.world_radius = (radius * WORLD_RADIUS_SCALE).max(1e-3);
    }

    /// Radiance arriving from direction `ref_to_light`.
    pub fn radiance(&self, ref_to_light: &Vector3f) -> Spectrum {
        let d = ref_to_light.normalize();
        let s = (d.z + 1.0) / 2.0;
        Spectrum::lerp(s, &self.bottom, &self.top)
    }

    fn sample_li(&self, ref_p: Point3f, u: &[Float; 5]) -> LightLiSample {
        let dir = sample_uniform_sphere(Point2f::new(u[0], u[1]));
        let pos = ref_p + 2.0 * self.world_radius * dir;
        LightLiSample {
            radiance: self.radiance(&dir),
            pos,
            nor: Normal3f::from(-dir),
            pdf: uniform_sphere_pdf(),
        }
    }

    /// Solid-angle pdf of light-sampling any direction; uniform.
    pub fn pdf_li(&self) -> Float {
        uniform_sphere_pdf()
    }

    /// Finds the virtual emission point behind `ref_p` along
    /// `ref_to_light`; used when a bidirectional path escapes.
    pub fn emit_pos(&self, ref_p: Point3f, ref_to_light: &Vector3f) -> (Point3f, Normal3f) {
        let d = ref_to_light.normalize();
        (
            ref_p + 2.0 * self.world_radius * d,
            Normal3f::from(-d),
        )
    }

    fn sample_emit(&self, u: &[Float; 5]) -> LightEmitSample {
        // Direction the light emits along, i.e. into the scene.
        let dir = sample_uniform_sphere(Point2f::new(u[0], u[1]));
        let frame = Frame::from_z(dir);
        let disk = sample_uniform_disk_concentric(Point2f::new(u[2], u[3]));
        let disk_offset =
            self.world_radius * (disk.x * frame.x + disk.y * frame.y);
        let pos = self.world_centre - self.world_radius * dir + disk_offset;
        LightEmitSample {
            pos,
            dir,
            nor: Normal3f::from(dir),
            uv: Point2f::ZERO,
            radiance: self.radiance(&-dir),
            pdf_pos: 1.0 / (PI * self.world_radius * self.world_radius),
            pdf_dir: uniform_sphere_pdf(),
        }
    }

    fn emit_pdf(&self) -> LightEmitPdf {
        LightEmitPdf {
            pdf_pos: 1.0 / (PI * self.world_radius * self.world_radius),
            pdf_dir: uniform_sphere_pdf(),
        }
    }

    fn power(&self) -> Spectrum {
        let mean = (self.top + self.bottom) / 2.0;
        mean * 4.0 * PI * PI * self.world_radius * self.world_radius
    }
}

/// Parallel light arriving along a fixed direction; a Dirac term in
/// the direction domain.
#[derive(Debug)]
pub struct DirectionalLight {
    /// Direction the light travels, normalized.
    dir: Vector3f,
    radiance: Spectrum,
    world_centre: Point3f,
    world_radius: Float,
}

impl DirectionalLight {
    pub fn new(dir: Vector3f, radiance: Spectrum) -> DirectionalLight {
        DirectionalLight {
            dir,
            radiance,
            world_centre: Point3f::ZERO,
            world_radius: 1.0,
        }
    }

    fn preprocess(&mut self, world_bound: &Bounds3f) {
        let (centre, radius) = world_bound.bounding_sphere();
        self.world_centre = centre;
        self.world_radius = (radius * WORLD_RADIUS_SCALE).max(1e-3);
    }

    fn sample_li(&self, ref_p: Point3f) -> LightLiSample {
        LightLiSample {
            radiance: self.radiance,
            pos: ref_p - 2.0 * self.world_radius * self.dir,
            nor: Normal3f::from(self.dir),
            pdf: 1.0,
        }
    }

    fn sample_emit(&self, u: &[Float; 5]) -> LightEmitSample {
        let frame = Frame::from_z(self.dir);
        let disk = sample_uniform_disk_concentric(Point2f::new(u[0], u[1]));
        let disk_offset =
            self.world_radius * (disk.x * frame.x + disk.y * frame.y);
        let pos = self.world_centre - self.world_radius * self.dir + disk_offset;
        LightEmitSample {
            pos,
            dir: self.dir,
            nor: Normal3f::from(self.dir),
            uv: Point2f::ZERO,
            radiance: self.radiance,
            pdf_pos: 1.0 / (PI * self.world_radius * self.world_radius),
            pdf_dir: 1.0,
        }
    }

    fn emit_pdf(&self) -> LightEmitPdf {
        LightEmitPdf {
            pdf_pos: 1.0 / (PI * self.world_radius * self.world_radius),
            pdf_dir: 0.0,
        }
    }

    fn power(&self) -> Spectrum {
        self.radiance * PI * self.world_radius * self.world_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{IndependentSampler, SamplerI};
    use crate::shape::Sphere;
    use float_cmp::assert_approx_eq;

    fn unit_sphere_light() -> AreaLight {
        let shape = Arc::new(Shape::Sphere(
            Sphere::new(Point3f::ZERO, 1.0).unwrap(),
        ));
        AreaLight::new(shape, Spectrum::splat(5.0))
    }

    #[test]
    fn area_pdf_converts_to_solid_angle() {
        let light = unit_sphere_light();
        let ref_p = Point3f::new(0.0, 0.0, 10.0);
        let mut s = IndependentSampler::new(2);
        for _ in 0..128 {
            if let Some(sample) = light.sample_li(ref_p, &s.get_5d()) {
                let q = light.pdf_li(ref_p, sample.pos, sample.nor);
                assert_approx_eq!(Float, sample.pdf, q, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn area_light_is_one_sided() {
        let light = unit_sphere_light();
        let nor = Normal3f::new(0.0, 0.0, 1.0);
        assert!(!light.radiance(nor, &Vector3f::Z).is_black());
        assert!(light.radiance(nor, &-Vector3f::Z).is_black());
    }

    #[test]
    fn environment_gradient_interpolates() {
        let sky = EnvironmentLight::new(Spectrum::splat(1.0), Spectrum::BLACK);
        assert_approx_eq!(Float, sky.radiance(&Vector3f::Z).r, 1.0, epsilon = 1e-6);
        assert_approx_eq!(Float, sky.radiance(&-Vector3f::Z).r, 0.0, epsilon = 1e-6);
        assert_approx_eq!(Float, sky.radiance(&Vector3f::X).r, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn environment_emit_pdfs_match_query() {
        let mut sky = EnvironmentLight::new(Spectrum::splat(1.0), Spectrum::splat(0.2));
        sky.preprocess(&Bounds3f::new(
            Point3f::new(-3.0, -3.0, -3.0),
            Point3f::new(3.0, 3.0, 3.0),
        ));
        let mut s = IndependentSampler::new(8);
        let emit = sky.sample_emit(&s.get_5d());
        let q = sky.emit_pdf();
        assert_approx_eq!(Float, emit.pdf_pos, q.pdf_pos, epsilon = 1e-6);
        assert_approx_eq!(Float, emit.pdf_dir, q.pdf_dir, epsilon = 1e-6);
    }

    #[test]
    fn directional_light_is_delta() {
        let l = Light::Directional(DirectionalLight::new(
            Vector3f::new(0.0, 0.0, -1.0),
            Spectrum::splat(3.0),
        ));
        assert!(l.is_delta());
    }

    #[test]
    fn factory_rejects_unknown_kind() {
        assert!(Light::create("spot", &ParamSet::new()).is_err());
    }
}
