use std::sync::Arc;

use crate::arena::Arena;
use crate::bsdf::Bsdf;
use crate::bxdf::{
    Bxdf, DielectricBxdf, DiffuseBxdf, MicrofacetReflectionBxdf, SpecularReflectionBxdf,
};
use crate::error::{Context, Error, Result};
use crate::float::Float;
use crate::interaction::SurfaceInteraction;
use crate::math::sqr;
use crate::paramset::ParamSet;
use crate::spectrum::Spectrum;
use crate::texture::{FloatTexture, FloatTextureI, SpectrumTexture, SpectrumTextureI};

/// Below this alpha a microfacet lobe degenerates into a mirror.
const MIN_GLOSSY_ALPHA: Float = 1e-3;

pub trait MaterialI {
    /// Builds the shading point's BSDF in the worker arena. The result
    /// lives no longer than the arena's next reset.
    fn bsdf<'a>(&self, si: &SurfaceInteraction, arena: &'a Arena) -> &'a Bsdf;
}

#[derive(Debug)]
pub enum Material {
    Diffuse(DiffuseMaterial),
    Mirror(MirrorMaterial),
    Glass(GlassMaterial),
    Metal(MetalMaterial),
    Disney(DisneyMaterial),
    Composite(CompositeMaterial),
}

impl Material {
    pub fn create(name: &str, params: &ParamSet) -> Result<Material> {
        let built = match name {
            "diffuse" | "ideal_diffuse" => Ok(Material::Diffuse(DiffuseMaterial {
                reflectance: SpectrumTexture::constant(params.require_spectrum("albedo")?),
            })),
            "mirror" => Ok(Material::Mirror(MirrorMaterial {
                reflectance: SpectrumTexture::constant(
                    params.get_spectrum("color", Spectrum::splat(1.0)),
                ),
            })),
            "glass" => {
                let eta = params.get_float("ior", 1.5);
                if eta <= 0.0 {
                    return Err(Error::InvalidValue {
                        name: "ior",
                        reason: format!("must be positive, got {}", eta),
                    })
                    .context(&format!("material `{}`", name));
                }
                Ok(Material::Glass(GlassMaterial {
                    color: SpectrumTexture::constant(
                        params.get_spectrum("color", Spectrum::splat(1.0)),
                    ),
                    eta,
                }))
            }
            "metal" => Ok(Material::Metal(MetalMaterial {
                f0: SpectrumTexture::constant(params.require_spectrum("color")?),
                roughness: FloatTexture::constant(params.get_float("roughness", 0.2)),
            })),
            "disney" => Ok(Material::Disney(DisneyMaterial {
                base_color: SpectrumTexture::constant(params.require_spectrum("base_color")?),
                metallic: FloatTexture::constant(params.get_float("metallic", 0.0)),
                roughness: FloatTexture::constant(params.get_float("roughness", 0.5)),
            })),
            _ => Err(Error::UnknownType {
                kind: "material",
                name: name.to_string(),
            }),
        };
        built.context(&format!("material `{}`", name))
    }

    fn add_lobes(&self, si: &SurfaceInteraction, bsdf: &mut Bsdf) {
        match self {
            Material::Diffuse(m) => m.add_lobes(si, bsdf),
            Material::Mirror(m) => m.add_lobes(si, bsdf),
            Material::Glass(m) => m.add_lobes(si, bsdf),
            Material::Metal(m) => m.add_lobes(si, bsdf),
            Material::Disney(m) => m.add_lobes(si, bsdf),
            Material::Composite(m) => m.add_lobes(si, bsdf),
        }
    }
}

impl MaterialI for Material {
    fn bsdf<'a>(&self, si: &SurfaceInteraction, arena: &'a Arena) -> &'a Bsdf {
        let mut bsdf = Bsdf::new(si);
        self.add_lobes(si, &mut bsdf);
        arena.alloc(bsdf)
    }
}

#[derive(Debug)]
pub struct DiffuseMaterial {
    pub reflectance: SpectrumTexture,
}

impl DiffuseMaterial {
    fn add_lobes(&self, si: &SurfaceInteraction, bsdf: &mut Bsdf) {
        bsdf.add(Bxdf::Diffuse(DiffuseBxdf {
            reflectance: self.reflectance.evaluate(si.uv),
        }));
    }
}

#[derive(Debug)]
pub struct MirrorMaterial {
    pub reflectance: SpectrumTexture,
}

impl MirrorMaterial {
    fn add_lobes(&self, si: &SurfaceInteraction, bsdf: &mut Bsdf) {
        bsdf.add(Bxdf::SpecularReflection(SpecularReflectionBxdf {
            reflectance: self.reflectance.evaluate(si.uv),
        }));
    }
}

#[derive(Debug)]
pub struct GlassMaterial {
    pub color: SpectrumTexture,
    pub eta: Float,
}

impl GlassMaterial {
    fn add_lobes(&self, si: &SurfaceInteraction, bsdf: &mut Bsdf) {
        bsdf.add(Bxdf::Dielectric(DielectricBxdf {
            eta: self.eta,
            reflectance: self.color.evaluate(si.uv),
        }));
    }
}

#[derive(Debug)]
pub struct MetalMaterial {
    pub f0: SpectrumTexture,
    pub roughness: FloatTexture,
}

impl MetalMaterial {
    fn add_lobes(&self, si: &SurfaceInteraction, bsdf: &mut Bsdf) {
        let f0 = self.f0.evaluate(si.uv);
        let alpha = sqr(self.roughness.evaluate(si.uv));
        if alpha < MIN_GLOSSY_ALPHA {
            bsdf.add(Bxdf::SpecularReflection(SpecularReflectionBxdf {
                reflectance: f0,
            }));
        } else {
            bsdf.add(Bxdf::MicrofacetReflection(MicrofacetReflectionBxdf {
                f0,
                alpha,
            }));
        }
    }
}

/// Reduced principled material: a metallic-weighted blend of a
/// Lambertian base and a GGX specular lobe.
#[derive(Debug)]
pub struct DisneyMaterial {
    pub base_color: SpectrumTexture,
    pub metallic: FloatTexture,
    pub roughness: FloatTexture,
}

impl DisneyMaterial {
    fn add_lobes(&self, si: &SurfaceInteraction, bsdf: &mut Bsdf) {
        let base = self.base_color.evaluate(si.uv);
        let metallic = self.metallic.evaluate(si.uv).clamp(0.0, 1.0);
        let alpha = sqr(self.roughness.evaluate(si.uv)).max(MIN_GLOSSY_ALPHA);

        if metallic < 1.0 {
            bsdf.add(Bxdf::Diffuse(DiffuseBxdf {
                reflectance: (1.0 - metallic) * base,
            }));
        }
        let f0 = Spectrum::lerp(metallic, &Spectrum::splat(0.04), &base);
        bsdf.add(Bxdf::MicrofacetReflection(MicrofacetReflectionBxdf {
            f0,
            alpha,
        }));
    }
}

/// Weighted additive combination of child materials; children share the
/// aggregate's uniform lobe-selection rule.
#[derive(Debug)]
pub struct CompositeMaterial {
    pub children: Vec<(Arc<Material>, Spectrum)>,
}

impl CompositeMaterial {
    fn add_lobes(&self, si: &SurfaceInteraction, bsdf: &mut Bsdf) {
        for (child, weight) in &self.children {
            let mut child_bsdf = Bsdf::new(si);
            child.add_lobes(si, &mut child_bsdf);
            for lobe in child_bsdf.take_lobes() {
                bsdf.add(lobe.scaled(*weight));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bxdf::{BxdfFlags, TransportMode};
    use crate::vecmath::{Normal3f, Point2f, Point3f, Vector3f};
    use float_cmp::assert_approx_eq;

    fn flat_interaction() -> SurfaceInteraction {
        SurfaceInteraction {
            p: Point3f::ZERO,
            n: Normal3f::new(0.0, 0.0, 1.0),
            shading_n: Normal3f::new(0.0, 0.0, 1.0),
            uv: Point2f::ZERO,
            t: 1.0,
            wo: Vector3f::Z,
        }
    }

    #[test]
    fn diffuse_material_evaluates_to_albedo_over_pi() {
        let m = Material::create(
            "diffuse",
            &ParamSet::new().set_spectrum("albedo", Spectrum::splat(0.6)),
        )
        .unwrap();
        let arena = Arena::new();
        let si = flat_interaction();
        let bsdf = m.bsdf(&si, &arena);
        let wo = Vector3f::new(0.0, 0.0, 1.0);
        let wi = Vector3f::new(0.0, 0.3, 0.95).normalize();
        let f = bsdf.f(&wo, &wi, TransportMode::Radiance, BxdfFlags::ALL);
        assert_approx_eq!(
            Float,
            f.r,
            0.6 * crate::float::INV_PI,
            epsilon = 1e-5
        );
    }

    #[test]
    fn missing_albedo_fails_with_context() {
        let err = Material::create("diffuse", &ParamSet::new()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("in constructing material `diffuse`"));
        assert!(msg.contains("albedo"));
    }

    #[test]
    fn unknown_material_name_is_an_error() {
        assert!(Material::create("velvet", &ParamSet::new()).is_err());
    }

    #[test]
    fn smooth_metal_degenerates_to_mirror() {
        let m = Material::create(
            "metal",
            &ParamSet::new()
                .set_spectrum("color", Spectrum::splat(0.9))
                .set_float("roughness", 0.0),
        )
        .unwrap();
        let arena = Arena::new();
        let si = flat_interaction();
        let bsdf = m.bsdf(&si, &arena);
        assert!(bsdf.is_delta());
    }

    #[test]
    fn composite_scales_child_lobes() {
        let child = Arc::new(
            Material::create(
                "diffuse",
                &ParamSet::new().set_spectrum("albedo", Spectrum::splat(0.8)),
            )
            .unwrap(),
        );
        let m = Material::Composite(CompositeMaterial {
            children: vec![(child, Spectrum::splat(0.5))],
        });
        let arena = Arena::new();
        let si = flat_interaction();
        let bsdf = m.bsdf(&si, &arena);
        let wo = Vector3f::Z;
        let wi = Vector3f::new(0.1, 0.0, 0.99).normalize();
        let f = bsdf.f(&wo, &wi, TransportMode::Radiance, BxdfFlags::ALL);
        assert_approx_eq!(
            Float,
            f.r,
            0.4 * crate::float::INV_PI,
            epsilon = 1e-5
        );
    }
}
