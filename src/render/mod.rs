pub mod bdpt;
pub mod direct_illum;
pub mod particle;
pub mod path_tracing;

use crate::arena::Arena;
use crate::error::{Error, Result};
use crate::film::{GBufferSample, SplatGrid};
use crate::float::Float;
use crate::options::{BdptParams, PathTracingParams};
use crate::paramset::ParamSet;
use crate::sampler::{Sampler, SamplerI};
use crate::scene::Scene;
use crate::spectrum::Spectrum;
use crate::vecmath::Point2f;

/// Radiance estimate for one camera sample plus its auxiliary
/// channels.
#[derive(Debug, Copy, Clone, Default)]
pub struct PixelEval {
    pub value: Spectrum,
    pub gbuffer: GBufferSample,
}

/// Per-pixel light transport strategy run by the tile renderer.
#[derive(Debug, Copy, Clone)]
pub enum Integrator {
    /// Pure BSDF-sampled path tracing.
    Native(PathTracingParams),
    /// Path tracing with multiple importance sampled next-event
    /// estimation.
    Mis(PathTracingParams),
    /// Bidirectional path tracing; light subpath connections to the
    /// lens are splatted.
    Bdpt(BdptParams),
}

impl Integrator {
    pub fn create(name: &str, params: &ParamSet) -> Result<Integrator> {
        match name {
            "native" => Ok(Integrator::Native(PathTracingParams::from_params(
                params,
            )?)),
            "pt" | "mis" => Ok(Integrator::Mis(PathTracingParams::from_params(params)?)),
            "bdpt" => Ok(Integrator::Bdpt(BdptParams::from_params(params)?)),
            _ => Err(Error::UnknownType {
                kind: "integrator",
                name: name.to_string(),
            }),
        }
    }

    /// Whether workers must carry a splat buffer for this strategy.
    pub fn uses_splats(&self) -> bool {
        matches!(self, Integrator::Bdpt(_))
    }

    /// Factor applied to accumulated splats when the film is developed.
    pub fn splat_scale(&self, spp: usize) -> Float {
        if self.uses_splats() {
            1.0 / spp as Float
        } else {
            0.0
        }
    }

    /// Estimates radiance arriving through the film point `film_coord`
    /// (in `[0,1]^2`). `splats` must be provided iff `uses_splats`.
    pub fn eval_pixel(
        &self,
        scene: &Scene,
        film_coord: Point2f,
        sampler: &mut Sampler,
        arena: &Arena,
        splats: Option<&mut SplatGrid>,
    ) -> PixelEval {
        match self {
            Integrator::Native(params) => {
                let ray = scene.camera().generate_ray(film_coord, sampler.get_2d());
                path_tracing::trace_native(params, scene, &ray, sampler, arena)
            }
            Integrator::Mis(params) => {
                let ray = scene.camera().generate_ray(film_coord, sampler.get_2d());
                path_tracing::trace_mis(params, scene, &ray, sampler, arena)
            }
            Integrator::Bdpt(params) => {
                bdpt::trace_bdpt(params, scene, film_coord, sampler, arena, splats)
            }
        }
    }
}
