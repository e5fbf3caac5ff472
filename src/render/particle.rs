//! Light-to-camera particle tracing. Particles start on a light,
//! scatter through the scene under importance transport, and at every
//! vertex attempt a direct connection to the lens; successful
//! connections are splatted onto the film position the lens reports.

use crate::arena::Arena;
use crate::bxdf::{BxdfFlags, TransportMode};
use crate::film::SplatGrid;
use crate::float::{Float, EPS};
use crate::material::MaterialI;
use crate::options::PathTracingParams;
use crate::ray::Ray;
use crate::sampler::{Sampler, SamplerI};
use crate::scene::Scene;
use crate::vecmath::Vector3f;

/// Traces one particle and splats all its lens connections.
pub fn trace_particle(
    params: &PathTracingParams,
    scene: &Scene,
    sampler: &mut Sampler,
    splats: &mut SplatGrid,
    arena: &Arena,
) {
    let (light, select_light_pdf) = scene.sample_light(sampler.get_1d());
    let emit = light.sample_emit(&sampler.get_5d());
    if emit.radiance.is_black() || emit.pdf_pos <= 0.0 || emit.pdf_dir <= 0.0 {
        return;
    }

    let camera = scene.camera();

    let mut coef =
        emit.radiance / (select_light_pdf * emit.pdf_pos * emit.pdf_dir);
    coef *= emit.nor.abs_dot_vector(&emit.dir);

    let mut ray = Ray::new_with_range(
        emit.pos + EPS * Vector3f::from(emit.nor),
        emit.dir,
        EPS,
        Float::INFINITY,
    );

    for depth in 1..=params.max_depth {
        if depth > params.min_depth {
            if sampler.get_1d() > params.cont_prob {
                return;
            }
            coef /= params.cont_prob;
        }

        let hit = match scene.closest_intersection(&ray) {
            Some(hit) => hit,
            None => return,
        };
        let bsdf = hit.entity.material().bsdf(&hit.inter, arena);

        // Connect this vertex to the lens.
        if let Some(cam_sam) = camera.sample_wi(hit.inter.p, sampler.get_2d()) {
            if !cam_sam.we.is_black() && scene.visible(cam_sam.pos, hit.inter.p) {
                let to_cam = cam_sam.ref_to_pos.normalize();
                let f = bsdf.f(
                    &to_cam,
                    &hit.inter.wo,
                    TransportMode::Radiance,
                    BxdfFlags::ALL,
                );
                if !f.is_black() {
                    let abscos = hit.inter.n.abs_dot_vector(&to_cam);
                    let contrib = coef * f * abscos * cam_sam.we / cam_sam.pdf;
                    splats.add_splat(cam_sam.film_coord, contrib);
                }
            }
        }

        let uc = sampler.get_1d();
        let u = sampler.get_2d();
        let bs = match bsdf.sample_f(
            &hit.inter.wo,
            uc,
            u,
            TransportMode::Importance,
            BxdfFlags::ALL,
        ) {
            Some(bs) if bs.pdf >= EPS => bs,
            _ => return,
        };

        coef *= bs.f * hit.inter.n.abs_dot_vector(&bs.wi) / bs.pdf;
        ray = hit.inter.spawn_ray(bs.wi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::film::Film;
    use crate::filter::{BoxFilter, Filter};
    use crate::material::Material;
    use crate::paramset::ParamSet;
    use crate::render::path_tracing::trace_mis;
    use crate::scene::Entity;
    use crate::shape::{Shape, Sphere};
    use crate::spectrum::Spectrum;
    use crate::vecmath::{Point2i, Point3f};
    use std::sync::Arc;

    fn test_scene() -> Scene {
        let diffuse = Arc::new(
            Material::create(
                "diffuse",
                &ParamSet::new().set_spectrum("albedo", Spectrum::splat(0.5)),
            )
            .unwrap(),
        );
        let ball = Entity::new(
            Arc::new(Shape::Sphere(
                Sphere::new(Point3f::new(0.0, 5.0, 0.0), 1.0).unwrap(),
            )),
            diffuse.clone(),
            None,
        );
        let lamp = Entity::new(
            Arc::new(Shape::Sphere(
                Sphere::new(Point3f::new(0.0, 5.0, 5.0), 1.0).unwrap(),
            )),
            diffuse,
            Some(Spectrum::splat(10.0)),
        );
        let camera = Camera::create(
            "pinhole",
            &ParamSet::new()
                .set_vec3("pos", Vector3f::new(0.0, -4.0, 0.0))
                .set_vec3("dst", Vector3f::new(0.0, 5.0, 0.0))
                .set_vec3("up", Vector3f::Z),
            1.0,
        )
        .unwrap();
        Scene::new(vec![ball, lamp], Vec::new(), camera).unwrap()
    }

    /// Light tracing and MIS path tracing estimate the same
    /// film-average radiance; compare them on a one-pixel film.
    #[test]
    fn particle_tracing_matches_path_tracing_mean() {
        let scene = test_scene();
        let params = PathTracingParams {
            min_depth: 5,
            max_depth: 12,
            cont_prob: 0.9,
        };
        let arena = Arena::new();
        let n = 30000;
        let res = Point2i::new(1, 1);

        let mut sampler = Sampler::create("independent", &ParamSet::new()).unwrap();
        let mut splats = SplatGrid::new(res);
        for _ in 0..n {
            trace_particle(&params, &scene, &mut sampler, &mut splats, &arena);
        }
        let mut film = Film::new(res, Filter::Box(BoxFilter { radius: 0.5 }));
        film.merge_splats(&splats);
        // One pixel and n particles: the splat scale is 1/n.
        let particle = film
            .develop(1.0 / n as Float)
            .radiance
            .get(Point2i::new(0, 0))
            .luminance();

        let mut sum_pt = 0.0;
        let m = 4000;
        for _ in 0..m {
            let coord = sampler.get_2d();
            let ray = scene.camera().generate_ray(coord, sampler.get_2d());
            sum_pt += trace_mis(&params, &scene, &ray, &mut sampler, &arena)
                .value
                .luminance();
        }
        let pt = sum_pt / m as Float;

        assert!(
            (particle - pt).abs() < 0.2 * pt.max(particle).max(1e-3),
            "particle {} vs pt {}",
            particle,
            pt
        );
    }

    /// A scene whose only light faces away from the camera still
    /// produces finite splats.
    #[test]
    fn particles_never_splat_non_finite_values() {
        let scene = test_scene();
        let params = PathTracingParams::default();
        let arena = Arena::new();
        let mut sampler = Sampler::create("independent", &ParamSet::new()).unwrap();
        let mut splats = SplatGrid::new(Point2i::new(2, 2));
        for _ in 0..2000 {
            trace_particle(&params, &scene, &mut sampler, &mut splats, &arena);
        }
        let mut film = Film::new(Point2i::new(2, 2), Filter::Box(BoxFilter { radius: 0.5 }));
        film.merge_splats(&splats);
        let out = film.develop(1.0);
        for p in out.radiance.extent().pixels() {
            assert!(out.radiance.get(p).is_finite());
        }
    }
}
