//! Two-stage particle tracing renderer. A forward stage traces light
//! particles into per-worker splat buffers; a backward stage walks one
//! camera ray per sample to pick up directly visible emission and the
//! auxiliary channels the splats cannot provide. Splats are normalized
//! by `pixel_count / particle_count` when the film is developed.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::arena::Arena;
use crate::error::{Error, Result};
use crate::film::{Film, RenderTarget, SplatGrid};
use crate::float::Float;
use crate::material::MaterialI;
use crate::options::{ParticleParams, RendererConfig};
use crate::ray::Ray;
use crate::render::{particle::trace_particle, PixelEval};
use crate::renderer::{lock, tiles, RendererI};
use crate::reporter::{Reporter, ReporterI};
use crate::sampler::{IndependentSampler, Sampler, SamplerI};
use crate::scene::Scene;
use crate::vecmath::Point2f;

const ARENA_RESET_THRESHOLD: usize = 4 << 20;

pub struct ParticleRenderer {
    config: RendererConfig,
    params: ParticleParams,
}

impl ParticleRenderer {
    pub fn new(config: RendererConfig, params: ParticleParams) -> ParticleRenderer {
        ParticleRenderer { config, params }
    }

    /// Traces all particle tasks and merges the splats into `film`.
    /// Returns the number of particles actually traced.
    fn forward_stage(
        &self,
        scene: &Scene,
        base: &Sampler,
        film: &Mutex<Film>,
        reporter: &Mutex<&mut Reporter>,
        cancel: &AtomicBool,
    ) -> u64 {
        let resolution = lock(film).resolution();
        let total = self.params.particle_task_count;
        let per_task = self.params.particles_per_task;

        let particle_count = AtomicU64::new(0);
        let finished = AtomicUsize::new(0);

        let (tx, rx) = crossbeam_channel::unbounded();
        for task_idx in 0..total {
            let _ = tx.send(task_idx);
        }
        drop(tx);

        std::thread::scope(|s| {
            for _ in 0..self.config.resolved_worker_count() {
                let rx = rx.clone();
                let particle_count = &particle_count;
                let finished = &finished;
                s.spawn(move || {
                    let mut arena = Arena::new();
                    let mut splats = SplatGrid::new(resolution);

                    while let Ok(task_idx) = rx.recv() {
                        if cancel.load(Ordering::Relaxed) {
                            break;
                        }
                        let mut sampler = base.clone_with_seed(task_idx as u64);

                        let task = catch_unwind(AssertUnwindSafe(|| {
                            let mut traced = 0u64;
                            for _ in 0..per_task {
                                if cancel.load(Ordering::Relaxed) {
                                    break;
                                }
                                trace_particle(
                                    &self.params.walk,
                                    scene,
                                    &mut sampler,
                                    &mut splats,
                                    &arena,
                                );
                                traced += 1;
                                arena.reset_if_above(ARENA_RESET_THRESHOLD);
                            }
                            traced
                        }));

                        match task {
                            Ok(traced) => {
                                particle_count.fetch_add(traced, Ordering::Relaxed);
                                let done = finished.fetch_add(1, Ordering::Relaxed) + 1;
                                let percent = 100.0 * done as Float / total as Float;
                                lock(reporter).progress(percent, None);
                            }
                            Err(_) => {
                                lock(reporter)
                                    .error(&format!("particle task {} panicked", task_idx));
                            }
                        }
                    }

                    lock(film).merge_splats(&splats);
                });
            }
        });

        particle_count.into_inner()
    }

    /// One camera ray per sample: direct emission, environment hits and
    /// the G-buffer channels.
    fn eval_camera_sample(scene: &Scene, ray: &Ray, arena: &Arena) -> PixelEval {
        let mut pixel = PixelEval::default();
        match scene.closest_intersection(ray) {
            Some(hit) => {
                let bsdf = hit.entity.material().bsdf(&hit.inter, arena);
                pixel.gbuffer.albedo = bsdf.albedo();
                pixel.gbuffer.normal = hit.inter.shading_n.into();
                pixel.gbuffer.depth = hit.inter.t;
                if let Some(light) = hit.entity.as_light() {
                    if let Some(area) = light.as_area() {
                        pixel.value = area.radiance(hit.inter.n, &hit.inter.wo);
                    }
                }
            }
            None => {
                for env in scene.environment_lights() {
                    if let Some(e) = env.as_environment() {
                        pixel.value += e.radiance(&ray.d);
                    }
                }
            }
        }
        pixel
    }

    /// Returns how many camera tasks failed, and the task total.
    fn backward_stage(
        &self,
        scene: &Scene,
        base: &Sampler,
        film: &Mutex<Film>,
        reporter: &Mutex<&mut Reporter>,
        cancel: &AtomicBool,
    ) -> (usize, usize) {
        let resolution = lock(film).resolution();
        let spp = self.config.spp;
        let task_list = tiles::partition(resolution, self.config.task_grid_size);
        let total = task_list.len();
        // Offset past the particle tasks so the stages draw from
        // disjoint sample streams.
        let seed_offset = self.params.particle_task_count as u64;

        let finished = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        let (tx, rx) = crossbeam_channel::unbounded();
        for (task_idx, tile) in task_list.iter().enumerate() {
            let _ = tx.send((task_idx, *tile));
        }
        drop(tx);

        std::thread::scope(|s| {
            for _ in 0..self.config.resolved_worker_count() {
                let rx = rx.clone();
                let finished = &finished;
                let failed = &failed;
                s.spawn(move || {
                    let mut arena = Arena::new();
                    let camera = scene.camera();

                    while let Ok((task_idx, tile)) = rx.recv() {
                        if cancel.load(Ordering::Relaxed) {
                            break;
                        }
                        let mut sampler = base.clone_with_seed(seed_offset + task_idx as u64);

                        let task = catch_unwind(AssertUnwindSafe(|| {
                            let mut grid = lock(film).film_grid(tile);
                            'pixels: for p in tile.pixels() {
                                for _ in 0..spp {
                                    if cancel.load(Ordering::Relaxed) {
                                        break 'pixels;
                                    }
                                    let u = sampler.get_2d();
                                    let pixel_coord = Point2f::new(
                                        p.x as Float + u.x,
                                        p.y as Float + u.y,
                                    );
                                    let film_coord = Point2f::new(
                                        pixel_coord.x / resolution.x as Float,
                                        pixel_coord.y / resolution.y as Float,
                                    );
                                    let ray =
                                        camera.generate_ray(film_coord, sampler.get_2d());
                                    let eval =
                                        Self::eval_camera_sample(scene, &ray, &arena);
                                    grid.add_sample(pixel_coord, eval.value, &eval.gbuffer);
                                    arena.reset_if_above(ARENA_RESET_THRESHOLD);
                                }
                            }
                            lock(film).merge_grid(&grid);
                        }));

                        match task {
                            Ok(()) => {
                                let done = finished.fetch_add(1, Ordering::Relaxed) + 1;
                                let percent = 100.0 * done as Float / total as Float;
                                let mut rep = lock(reporter);
                                if rep.need_image_preview() {
                                    rep.progress(percent, Some(&|| lock(film).preview()));
                                } else {
                                    rep.progress(percent, None);
                                }
                            }
                            Err(_) => {
                                failed.fetch_add(1, Ordering::Relaxed);
                                lock(reporter)
                                    .error(&format!("camera task {} panicked", task_idx));
                            }
                        }
                    }
                });
            }
        });

        (failed.into_inner(), total)
    }
}

impl RendererI for ParticleRenderer {
    fn render(
        &self,
        scene: &Scene,
        film: Film,
        reporter: &mut Reporter,
        cancel: &AtomicBool,
    ) -> Result<RenderTarget> {
        let resolution = film.resolution();
        let pixel_count = (resolution.x as u64) * (resolution.y as u64);

        reporter.begin();

        let base = Sampler::Independent(IndependentSampler::new(self.config.resolved_seed()));
        let film = Mutex::new(film);
        let reporter = Mutex::new(reporter);

        lock(&reporter).new_stage("particle pass");
        let particle_count = self.forward_stage(scene, &base, &film, &reporter, cancel);
        lock(&reporter).end_stage();

        lock(&reporter).new_stage("camera pass");
        let (failed, total) = self.backward_stage(scene, &base, &film, &reporter, cancel);
        lock(&reporter).end_stage();

        let reporter = reporter
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let cancelled = cancel.load(Ordering::Relaxed);
        if !cancelled {
            if particle_count == 0 {
                reporter.error("all particle tasks failed");
                return Err(Error::Render("all particle tasks failed".to_string()));
            }
            if failed == total && total > 0 {
                reporter.error("all camera tasks failed");
                return Err(Error::Render("all camera tasks failed".to_string()));
            }
        } else {
            reporter.message("rendering cancelled");
        }

        reporter.end();

        let film = film
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let splat_scale = if particle_count == 0 {
            0.0
        } else {
            pixel_count as Float / particle_count as Float
        };
        Ok(film.develop(splat_scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::filter::{BoxFilter, Filter};
    use crate::material::Material;
    use crate::paramset::ParamSet;
    use crate::scene::Entity;
    use crate::shape::{Shape, Sphere};
    use crate::spectrum::Spectrum;
    use crate::vecmath::{Point2i, Point3f, Vector3f};
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
                Sphere::new(Point3f::new(0.0, 6.0, 0.0), 1.0).unwrap(),
            )),
            diffuse.clone(),
            None,
        );
        let lamp = Entity::new(
            Arc::new(Shape::Sphere(
                Sphere::new(Point3f::new(0.0, 6.0, 4.0), 1.0).unwrap(),
            )),
            diffuse,
            Some(Spectrum::splat(8.0)),
        );
        let camera = Camera::create(
            "pinhole",
            &ParamSet::new()
                .set_vec3("pos", Vector3f::new(0.0, -4.0, 0.0))
                .set_vec3("dst", Vector3f::new(0.0, 6.0, 0.0))
                .set_vec3("up", Vector3f::Z),
            1.0,
        )
        .unwrap();
        Scene::new(vec![ball, lamp], Vec::new(), camera).unwrap()
    }

    #[test]
    fn particle_render_completes_with_finite_image() {
        let scene = test_scene();
        let renderer = ParticleRenderer::new(
            RendererConfig {
                worker_count: 2,
                task_grid_size: 8,
                spp: 2,
                seed: 11,
                use_time_seed: false,
            },
            ParticleParams {
                particle_task_count: 8,
                particles_per_task: 200,
                ..ParticleParams::default()
            },
        );
        let film = Film::new(
            Point2i::new(16, 16),
            Filter::Box(BoxFilter { radius: 0.5 }),
        );
        let mut reporter = Reporter::Silent(crate::reporter::SilentReporter::new());
        let out = renderer
            .render(&scene, film, &mut reporter, &AtomicBool::new(false))
            .unwrap();

        let mut any_lit = false;
        for p in out.radiance.extent().pixels() {
            let v = out.radiance.get(p);
            assert!(v.is_finite());
            any_lit |= !v.is_black();
        }
        assert!(any_lit);
    }

    #[test]
    fn camera_pass_fills_gbuffer_channels() {
        let scene = test_scene();
        let renderer = ParticleRenderer::new(
            RendererConfig {
                worker_count: 1,
                task_grid_size: 8,
                spp: 4,
                seed: 3,
                use_time_seed: false,
            },
            ParticleParams {
                particle_task_count: 2,
                particles_per_task: 50,
                ..ParticleParams::default()
            },
        );
        let film = Film::new(
            Point2i::new(8, 8),
            Filter::Box(BoxFilter { radius: 0.5 }),
        );
        let mut reporter = Reporter::Silent(crate::reporter::SilentReporter::new());
        let out = renderer
            .render(&scene, film, &mut reporter, &AtomicBool::new(false))
            .unwrap();

        // The sphere fills the image centre, so some pixel must carry
        // a surface hit.
        let mut any_surface = false;
        for p in out.depth.extent().pixels() {
            any_surface |= out.depth.get(p) > 0.0;
        }
        assert!(any_surface);
    }
}
