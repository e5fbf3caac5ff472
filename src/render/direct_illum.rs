//! Next-event estimation combined with BSDF sampling through the
//! balance heuristic. Both strategies estimate the same direct-lighting
//! integral, so each contribution is divided by the sum of both pdfs.

use crate::bsdf::Bsdf;
use crate::bxdf::{BxdfFlags, TransportMode};
use crate::interaction::SurfaceInteraction;
use crate::light::Light;
use crate::sampler::{Sampler, SamplerI};
use crate::scene::Scene;
use crate::spectrum::Spectrum;

/// Samples a point on `light` and evaluates the BSDF toward it. The
/// light-selection pdf folds into the MIS denominator so the pairing
/// with [`mis_sample_bsdf`] stays unbiased under uniform selection.
pub fn mis_sample_light(
    scene: &Scene,
    light: &Light,
    select_pdf: crate::float::Float,
    inter: &SurfaceInteraction,
    bsdf: &Bsdf,
    sampler: &mut Sampler,
) -> Spectrum {
    let ls = match light.sample_li(inter.p, &sampler.get_5d()) {
        Some(ls) => ls,
        None => return Spectrum::BLACK,
    };
    if ls.radiance.is_black() || ls.pdf <= 0.0 {
        return Spectrum::BLACK;
    }

    if !scene.visible(inter.p, ls.pos) {
        return Spectrum::BLACK;
    }

    let wi = ls.dir_from(inter.p);
    let f = bsdf.f(&inter.wo, &wi, TransportMode::Radiance, BxdfFlags::ALL);
    if f.is_black() {
        return Spectrum::BLACK;
    }
    let f = f * ls.radiance * inter.n.abs_dot_vector(&wi);

    let light_pdf = select_pdf * ls.pdf;
    if light.is_delta() {
        // BSDF sampling can never hit a delta light.
        return f / light_pdf;
    }
    let bsdf_pdf = bsdf.pdf(&inter.wo, &wi, TransportMode::Radiance, BxdfFlags::ALL);
    f / (light_pdf + bsdf_pdf)
}

/// Samples the BSDF and looks for emission along the sampled ray,
/// weighting any hit against the light-sampling strategy.
pub fn mis_sample_bsdf(
    scene: &Scene,
    inter: &SurfaceInteraction,
    bsdf: &Bsdf,
    sampler: &mut Sampler,
) -> Spectrum {
    let uc = sampler.get_1d();
    let u = sampler.get_2d();
    let bs = match bsdf.sample_f(
        &inter.wo,
        uc,
        u,
        TransportMode::Radiance,
        BxdfFlags::ALL,
    ) {
        Some(bs) => bs,
        None => return Spectrum::BLACK,
    };

    let ray = inter.spawn_ray(bs.wi);
    let f = bs.f * inter.n.abs_dot_vector(&bs.wi);
    let select_pdf = scene.light_pdf();

    match scene.closest_intersection(&ray) {
        None => {
            let mut illum = Spectrum::BLACK;
            for env in scene.environment_lights() {
                let radiance = match env.as_environment() {
                    Some(e) => e.radiance(&ray.d),
                    None => continue,
                };
                if radiance.is_black() {
                    continue;
                }
                if bs.is_specular() {
                    illum += radiance * f / bs.pdf;
                } else {
                    let light_pdf =
                        select_pdf * env.as_environment().map_or(0.0, |e| e.pdf_li());
                    illum += radiance * f / (bs.pdf + light_pdf);
                }
            }
            illum
        }
        Some(hit) => {
            let light = match hit.entity.as_light() {
                Some(l) => l,
                None => return Spectrum::BLACK,
            };
            let area = match light.as_area() {
                Some(a) => a,
                None => return Spectrum::BLACK,
            };
            let radiance = area.radiance(hit.inter.n, &hit.inter.wo);
            if radiance.is_black() {
                return Spectrum::BLACK;
            }
            if bs.is_specular() {
                return radiance * f / bs.pdf;
            }
            let light_pdf = select_pdf * area.pdf_li(inter.p, hit.inter.p, hit.inter.n);
            radiance * f / (bs.pdf + light_pdf)
        }
    }
}
