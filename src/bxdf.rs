use bitflags::bitflags;

use crate::float::{Float, INV_PI, PI, TWO_PI};
use crate::frame::{
    abs_cos_theta, cos2_theta, cos_theta, reflect, refract, same_hemisphere, spherical_direction,
    tan2_theta,
};
use crate::math::{safe_sqrt, sqr};
use crate::spectrum::Spectrum;
use crate::vecmath::{Point2f, Vector3f};

bitflags! {
    /// Scattering capability vocabulary: a component axis
    /// (diffuse/glossy/specular) crossed with a direction axis
    /// (reflection/transmission).
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct BxdfFlags: u8 {
        const DIFFUSE = 1 << 0;
        const GLOSSY = 1 << 1;
        const SPECULAR = 1 << 2;
        const REFLECTION = 1 << 3;
        const TRANSMISSION = 1 << 4;

        const DIFFUSE_REFLECTION = Self::DIFFUSE.bits() | Self::REFLECTION.bits();
        const GLOSSY_REFLECTION = Self::GLOSSY.bits() | Self::REFLECTION.bits();
        const SPECULAR_REFLECTION = Self::SPECULAR.bits() | Self::REFLECTION.bits();
        const ALL = Self::DIFFUSE.bits()
            | Self::GLOSSY.bits()
            | Self::SPECULAR.bits()
            | Self::REFLECTION.bits()
            | Self::TRANSMISSION.bits();
    }
}

impl BxdfFlags {
    pub fn is_specular(&self) -> bool {
        self.contains(BxdfFlags::SPECULAR)
    }

    /// A lobe matches a capability filter when both its component kind
    /// and its direction kind survive the filter.
    pub fn matches(&self, filter: BxdfFlags) -> bool {
        let component = BxdfFlags::DIFFUSE | BxdfFlags::GLOSSY | BxdfFlags::SPECULAR;
        let direction = BxdfFlags::REFLECTION | BxdfFlags::TRANSMISSION;
        self.intersects(filter & component) && self.intersects(filter & direction)
    }
}

/// Distinguishes radiance transport (camera paths) from importance
/// transport (light paths); refraction is not symmetric between the
/// two.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransportMode {
    Radiance,
    Importance,
}

/// Result of importance-sampling a BxDF; directions are in the local
/// shading frame. `pdf` is a probability per solid angle unless
/// `flags` carries SPECULAR, in which case it is a discrete lobe
/// probability.
#[derive(Debug, Copy, Clone)]
pub struct BxdfSample {
    pub f: Spectrum,
    pub wi: Vector3f,
    pub pdf: Float,
    pub flags: BxdfFlags,
}

impl BxdfSample {
    pub fn is_specular(&self) -> bool {
        self.flags.is_specular()
    }
}

pub trait BxdfI {
    fn flags(&self) -> BxdfFlags;
    fn f(&self, wo: Vector3f, wi: Vector3f, mode: TransportMode) -> Spectrum;
    fn sample_f(
        &self,
        wo: Vector3f,
        uc: Float,
        u: Point2f,
        mode: TransportMode,
    ) -> Option<BxdfSample>;
    fn pdf(&self, wo: Vector3f, wi: Vector3f, mode: TransportMode) -> Float;
    /// Reflectance estimate used for the G-buffer.
    fn albedo(&self) -> Spectrum;
}

#[derive(Debug, Clone)]
pub enum Bxdf {
    Diffuse(DiffuseBxdf),
    SpecularReflection(SpecularReflectionBxdf),
    Dielectric(DielectricBxdf),
    MicrofacetReflection(MicrofacetReflectionBxdf),
}

impl BxdfI for Bxdf {
    fn flags(&self) -> BxdfFlags {
        match self {
            Bxdf::Diffuse(b) => b.flags(),
            Bxdf::SpecularReflection(b) => b.flags(),
            Bxdf::Dielectric(b) => b.flags(),
            Bxdf::MicrofacetReflection(b) => b.flags(),
        }
    }

    fn f(&self, wo: Vector3f, wi: Vector3f, mode: TransportMode) -> Spectrum {
        match self {
            Bxdf::Diffuse(b) => b.f(wo, wi, mode),
            Bxdf::SpecularReflection(b) => b.f(wo, wi, mode),
            Bxdf::Dielectric(b) => b.f(wo, wi, mode),
            Bxdf::MicrofacetReflection(b) => b.f(wo, wi, mode),
        }
    }

    fn sample_f(
        &self,
        wo: Vector3f,
        uc: Float,
        u: Point2f,
        mode: TransportMode,
    ) -> Option<BxdfSample> {
        match self {
            Bxdf::Diffuse(b) => b.sample_f(wo, uc, u, mode),
            Bxdf::SpecularReflection(b) => b.sample_f(wo, uc, u, mode),
            Bxdf::Dielectric(b) => b.sample_f(wo, uc, u, mode),
            Bxdf::MicrofacetReflection(b) => b.sample_f(wo, uc, u, mode),
        }
    }

    fn pdf(&self, wo: Vector3f, wi: Vector3f, mode: TransportMode) -> Float {
        match self {
            Bxdf::Diffuse(b) => b.pdf(wo, wi, mode),
            Bxdf::SpecularReflection(b) => b.pdf(wo, wi, mode),
            Bxdf::Dielectric(b) => b.pdf(wo, wi, mode),
            Bxdf::MicrofacetReflection(b) => b.pdf(wo, wi, mode),
        }
    }

    fn albedo(&self) -> Spectrum {
        match self {
            Bxdf::Diffuse(b) => b.albedo(),
            Bxdf::SpecularReflection(b) => b.albedo(),
            Bxdf::Dielectric(b) => b.albedo(),
            Bxdf::MicrofacetReflection(b) => b.albedo(),
        }
    }
}

impl Bxdf {
    /// Scales the lobe's throughput spectrum; used by composite
    /// materials to weight child contributions.
    pub fn scaled(&self, s: Spectrum) -> Bxdf {
        match self {
            Bxdf::Diffuse(b) => Bxdf::Diffuse(DiffuseBxdf {
                reflectance: s * b.reflectance,
            }),
            Bxdf::SpecularReflection(b) => Bxdf::SpecularReflection(SpecularReflectionBxdf {
                reflectance: s * b.reflectance,
            }),
            Bxdf::Dielectric(b) => Bxdf::Dielectric(DielectricBxdf {
                eta: b.eta,
                reflectance: s * b.reflectance,
            }),
            Bxdf::MicrofacetReflection(b) => {
                Bxdf::MicrofacetReflection(MicrofacetReflectionBxdf {
                    f0: s * b.f0,
                    alpha: b.alpha,
                })
            }
        }
    }
}

/// Lambertian reflection.
#[derive(Debug, Clone)]
pub struct DiffuseBxdf {
    pub reflectance: Spectrum,
}

impl BxdfI for DiffuseBxdf {
    fn flags(&self) -> BxdfFlags {
        BxdfFlags::DIFFUSE_REFLECTION
    }

    fn f(&self, wo: Vector3f, wi: Vector3f, _mode: TransportMode) -> Spectrum {
        if !same_hemisphere(&wo, &wi) {
            return Spectrum::BLACK;
        }
        self.reflectance * INV_PI
    }

    fn sample_f(
        &self,
        wo: Vector3f,
        _uc: Float,
        u: Point2f,
        mode: TransportMode,
    ) -> Option<BxdfSample> {
        if cos_theta(&wo) == 0.0 {
            return None;
        }
        let mut wi = crate::sampling::sample_cosine_hemisphere(u);
        if wo.z < 0.0 {
            wi.z = -wi.z;
        }
        let pdf = crate::sampling::cosine_hemisphere_pdf(abs_cos_theta(&wi));
        if pdf <= 0.0 {
            return None;
        }
        Some(BxdfSample {
            f: self.f(wo, wi, mode),
            wi,
            pdf,
            flags: self.flags(),
        })
    }

    fn pdf(&self, wo: Vector3f, wi: Vector3f, _mode: TransportMode) -> Float {
        if !same_hemisphere(&wo, &wi) {
            return 0.0;
        }
        crate::sampling::cosine_hemisphere_pdf(abs_cos_theta(&wi))
    }

    fn albedo(&self) -> Spectrum {
        self.reflectance
    }
}

/// Ideal mirror; Dirac reflection lobe.
#[derive(Debug, Clone)]
pub struct SpecularReflectionBxdf {
    pub reflectance: Spectrum,
}

impl BxdfI for SpecularReflectionBxdf {
    fn flags(&self) -> BxdfFlags {
        BxdfFlags::SPECULAR_REFLECTION
    }

    fn f(&self, _wo: Vector3f, _wi: Vector3f, _mode: TransportMode) -> Spectrum {
        Spectrum::BLACK
    }

    fn sample_f(
        &self,
        wo: Vector3f,
        _uc: Float,
        _u: Point2f,
        _mode: TransportMode,
    ) -> Option<BxdfSample> {
        if cos_theta(&wo) == 0.0 {
            return None;
        }
        let wi = Vector3f::new(-wo.x, -wo.y, wo.z);
        Some(BxdfSample {
            f: self.reflectance / abs_cos_theta(&wi),
            wi,
            pdf: 1.0,
            flags: self.flags(),
        })
    }

    fn pdf(&self, _wo: Vector3f, _wi: Vector3f, _mode: TransportMode) -> Float {
        0.0
    }

    fn albedo(&self) -> Spectrum {
        self.reflectance
    }
}

/// Smooth dielectric with Fresnel-weighted reflection/refraction. The
/// transmitted term carries the `1/eta^2` radiance-compression factor
/// only in radiance transport; importance transport omits it (the
/// adjoint is not symmetric).
#[derive(Debug, Clone)]
pub struct DielectricBxdf {
    pub eta: Float,
    pub reflectance: Spectrum,
}

impl BxdfI for DielectricBxdf {
    fn flags(&self) -> BxdfFlags {
        BxdfFlags::SPECULAR | BxdfFlags::REFLECTION | BxdfFlags::TRANSMISSION
    }

    fn f(&self, _wo: Vector3f, _wi: Vector3f, _mode: TransportMode) -> Spectrum {
        Spectrum::BLACK
    }

    fn sample_f(
        &self,
        wo: Vector3f,
        uc: Float,
        _u: Point2f,
        mode: TransportMode,
    ) -> Option<BxdfSample> {
        if cos_theta(&wo) == 0.0 {
            return None;
        }
        let fr = fresnel_dielectric(cos_theta(&wo), self.eta);
        if uc < fr {
            let wi = Vector3f::new(-wo.x, -wo.y, wo.z);
            return Some(BxdfSample {
                f: self.reflectance * fr / abs_cos_theta(&wi),
                wi,
                pdf: fr,
                flags: BxdfFlags::SPECULAR_REFLECTION,
            });
        }

        let n = if wo.z > 0.0 {
            Vector3f::Z
        } else {
            -Vector3f::Z
        };
        let etap = if wo.z > 0.0 { self.eta } else { 1.0 / self.eta };
        let wi = refract(&wo, &n, etap)?;
        let mut ft = self.reflectance * (1.0 - fr);
        if mode == TransportMode::Radiance {
            ft /= sqr(etap);
        }
        Some(BxdfSample {
            f: ft / abs_cos_theta(&wi),
            wi,
            pdf: 1.0 - fr,
            flags: BxdfFlags::SPECULAR | BxdfFlags::TRANSMISSION,
        })
    }

    fn pdf(&self, _wo: Vector3f, _wi: Vector3f, _mode: TransportMode) -> Float {
        0.0
    }

    fn albedo(&self) -> Spectrum {
        self.reflectance
    }
}

/// Torrance-Sparrow reflection over a GGX distribution with a Schlick
/// Fresnel term.
#[derive(Debug, Clone)]
pub struct MicrofacetReflectionBxdf {
    pub f0: Spectrum,
    pub alpha: Float,
}

impl MicrofacetReflectionBxdf {
    fn d(&self, wh: &Vector3f) -> Float {
        let a2 = sqr(self.alpha);
        let denom = cos2_theta(wh) * (a2 - 1.0) + 1.0;
        a2 / (PI * sqr(denom))
    }

    fn lambda(&self, w: &Vector3f) -> Float {
        let t2 = tan2_theta(w);
        if !t2.is_finite() {
            return 0.0;
        }
        (safe_sqrt(1.0 + sqr(self.alpha) * t2) - 1.0) / 2.0
    }

    fn g(&self, wo: &Vector3f, wi: &Vector3f) -> Float {
        1.0 / (1.0 + self.lambda(wo) + self.lambda(wi))
    }

    fn sample_wh(&self, u: Point2f) -> Vector3f {
        let a2 = sqr(self.alpha);
        let cos2 = (1.0 - u.x) / (1.0 + (a2 - 1.0) * u.x);
        let cos_theta = safe_sqrt(cos2);
        let sin_theta = safe_sqrt(1.0 - cos2);
        spherical_direction(sin_theta, cos_theta, TWO_PI * u.y)
    }
}

impl BxdfI for MicrofacetReflectionBxdf {
    fn flags(&self) -> BxdfFlags {
        BxdfFlags::GLOSSY_REFLECTION
    }

    fn f(&self, wo: Vector3f, wi: Vector3f, _mode: TransportMode) -> Spectrum {
        if !same_hemisphere(&wo, &wi) {
            return Spectrum::BLACK;
        }
        let cos_o = abs_cos_theta(&wo);
        let cos_i = abs_cos_theta(&wi);
        if cos_o == 0.0 || cos_i == 0.0 {
            return Spectrum::BLACK;
        }
        let wh = wo + wi;
        if wh.is_zero() {
            return Spectrum::BLACK;
        }
        let wh = wh.normalize();
        let fr = fresnel_schlick(self.f0, wh.dot(&wi).abs());
        fr * (self.d(&wh) * self.g(&wo, &wi) / (4.0 * cos_o * cos_i))
    }

    fn sample_f(
        &self,
        wo: Vector3f,
        _uc: Float,
        u: Point2f,
        mode: TransportMode,
    ) -> Option<BxdfSample> {
        if cos_theta(&wo) == 0.0 {
            return None;
        }
        let mut wh = self.sample_wh(u);
        if wo.z < 0.0 {
            wh = -wh;
        }
        let wi = reflect(&wo, &wh);
        if !same_hemisphere(&wo, &wi) {
            return None;
        }
        let pdf = self.pdf(wo, wi, mode);
        if pdf <= 0.0 {
            return None;
        }
        Some(BxdfSample {
            f: self.f(wo, wi, mode),
            wi,
            pdf,
            flags: self.flags(),
        })
    }

    fn pdf(&self, wo: Vector3f, wi: Vector3f, _mode: TransportMode) -> Float {
        if !same_hemisphere(&wo, &wi) {
            return 0.0;
        }
        let wh = wo + wi;
        if wh.is_zero() {
            return 0.0;
        }
        let wh = wh.normalize();
        let dot = wo.abs_dot(&wh);
        if dot == 0.0 {
            return 0.0;
        }
        self.d(&wh) * abs_cos_theta(&wh) / (4.0 * dot)
    }

    fn albedo(&self) -> Spectrum {
        self.f0
    }
}

pub fn fresnel_dielectric(cos_theta_i: Float, eta: Float) -> Float {
    let mut cos_theta_i = cos_theta_i.clamp(-1.0, 1.0);
    let mut eta = eta;
    if cos_theta_i < 0.0 {
        eta = 1.0 / eta;
        cos_theta_i = -cos_theta_i;
    }
    let sin2_theta_i = 1.0 - sqr(cos_theta_i);
    let sin2_theta_t = sin2_theta_i / sqr(eta);
    if sin2_theta_t >= 1.0 {
        return 1.0;
    }
    let cos_theta_t = safe_sqrt(1.0 - sin2_theta_t);
    let r_parl = (eta * cos_theta_i - cos_theta_t) / (eta * cos_theta_i + cos_theta_t);
    let r_perp = (cos_theta_i - eta * cos_theta_t) / (cos_theta_i + eta * cos_theta_t);
    (sqr(r_parl) + sqr(r_perp)) / 2.0
}

pub fn fresnel_schlick(f0: Spectrum, cos_theta: Float) -> Spectrum {
    let c = (1.0 - cos_theta).clamp(0.0, 1.0);
    let c5 = sqr(sqr(c)) * c;
    f0 + (Spectrum::splat(1.0) - f0) * c5
}
