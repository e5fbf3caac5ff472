//! Bidirectional path tracing. A camera subpath and a light subpath are
//! traced independently, every (s, t) pairing is connected, and each
//! connection is weighted by the balance heuristic over all strategies
//! that could have produced the same path. Vertices carry projected
//! solid-angle pdfs so the weights reduce to ratios of per-vertex pdf
//! and geometry terms.

use crate::arena::Arena;
use crate::bsdf::Bsdf;
use crate::bxdf::{BxdfFlags, TransportMode};
use crate::camera::Camera;
use crate::film::SplatGrid;
use crate::float::{Float, EPS};
use crate::light::Light;
use crate::material::MaterialI;
use crate::options::BdptParams;
use crate::ray::Ray;
use crate::render::PixelEval;
use crate::sampler::{Sampler, SamplerI};
use crate::scene::{Entity, Scene};
use crate::spectrum::Spectrum;
use crate::vecmath::{Normal3f, Point2f, Point3f, Vector3f};

/// Geometry term between two surface points.
fn geometry_term(a: Point3f, b: Point3f, na: Normal3f, nb: Normal3f) -> Float {
    let d = a - b;
    let len2 = d.length_squared();
    if len2 == 0.0 {
        return 0.0;
    }
    let dn = d / len2.sqrt();
    na.abs_dot_vector(&dn) * nb.abs_dot_vector(&dn) / len2
}

fn abs_cos(n: Normal3f, d: Vector3f) -> Float {
    let len = d.length();
    if len == 0.0 {
        return 0.0;
    }
    n.abs_dot_vector(&d) / len
}

/// Maps unusable pdf ratios (delta lobes report zero, degenerate
/// geometry produces NaN) to one so they cancel out of the weight
/// chains.
fn usable_pdf(x: Float) -> Float {
    if !x.is_nan() && x > EPS {
        x
    } else {
        1.0
    }
}

/// Projected solid-angle pdf of sampling `sampled` at a vertex with
/// normal `n`, given arrival along `given`.
fn proj_bsdf_pdf(bsdf: &Bsdf, n: Normal3f, given: Vector3f, sampled: Vector3f) -> Float {
    let given = given.normalize();
    let sampled = sampled.normalize();
    let pdf = bsdf.pdf(&given, &sampled, TransportMode::Radiance, BxdfFlags::ALL);
    pdf / abs_cos(n, sampled)
}

#[derive(Copy, Clone)]
struct SurfaceRef<'a> {
    entity: &'a Entity,
    bsdf: &'a Bsdf,
}

/// One subpath vertex. For a camera ray that escaped the scene, `pos`
/// stores the ray direction and `surface` is `None`; the lens and
/// light-origin vertices also carry no surface.
#[derive(Copy, Clone)]
struct Vertex<'a> {
    pos: Point3f,
    nor: Normal3f,
    accu_coef: Spectrum,
    accu_proj_pdf: Float,
    pdf_fwd: Float,
    pdf_bwd: Float,
    g_with_last: Float,
    is_delta: bool,
    surface: Option<SurfaceRef<'a>>,
}

impl<'a> Vertex<'a> {
    fn direction(&self) -> Vector3f {
        Vector3f::new(self.pos.x, self.pos.y, self.pos.z)
    }

    fn is_surface(&self) -> bool {
        self.surface.is_some()
    }
}

struct CameraSubpath<'a> {
    vertices: Vec<Vertex<'a>>,
    gbuffer: crate::film::GBufferSample,
}

struct LightSubpath<'a> {
    vertices: Vec<Vertex<'a>>,
    light: &'a Light,
    select_light_pdf: Float,
}

fn build_camera_subpath<'a>(
    max_vertices: usize,
    scene: &'a Scene,
    film_coord: Point2f,
    sampler: &mut Sampler,
    arena: &'a Arena,
) -> CameraSubpath<'a> {
    let camera = scene.camera();
    let cam_sam = camera.sample_we(film_coord, sampler.get_2d());
    let cam_pdf = camera.pdf_we(cam_sam.pos, cam_sam.dir);

    let mut vertices = Vec::with_capacity(max_vertices);
    vertices.push(Vertex {
        pos: cam_sam.pos,
        nor: cam_sam.nor,
        accu_coef: Spectrum::splat(1.0),
        accu_proj_pdf: cam_pdf.pdf_pos,
        pdf_fwd: cam_pdf.pdf_pos,
        pdf_bwd: 0.0,
        g_with_last: 1.0,
        is_delta: false,
        surface: None,
    });

    let mut gbuffer = crate::film::GBufferSample::default();

    let mut proj_pdf = cam_pdf.pdf_dir / abs_cos(cam_sam.nor, cam_sam.dir);
    let mut accu_proj_pdf = cam_pdf.pdf_pos * proj_pdf;
    let mut accu_coef = camera.eval_we(cam_sam.pos, cam_sam.dir).we;
    let mut last_pos = cam_sam.pos;
    let mut last_nor = cam_sam.nor;
    let mut ray = Ray::new_with_range(cam_sam.pos, cam_sam.dir, EPS, Float::INFINITY);

    while vertices.len() < max_vertices {
        let hit = match scene.closest_intersection(&ray) {
            Some(hit) => hit,
            None => {
                vertices.push(Vertex {
                    pos: Point3f::new(ray.d.x, ray.d.y, ray.d.z),
                    nor: Normal3f::new(0.0, 0.0, 1.0),
                    accu_coef,
                    accu_proj_pdf,
                    pdf_fwd: proj_pdf,
                    pdf_bwd: 0.0,
                    g_with_last: 1.0,
                    is_delta: false,
                    surface: None,
                });
                break;
            }
        };

        let bsdf = hit.entity.material().bsdf(&hit.inter, arena);
        if vertices.len() == 1 {
            gbuffer.albedo = bsdf.albedo();
            gbuffer.normal = hit.inter.shading_n.into();
            gbuffer.depth = hit.inter.t;
        }

        vertices.push(Vertex {
            pos: hit.inter.p,
            nor: hit.inter.n,
            accu_coef,
            accu_proj_pdf,
            pdf_fwd: proj_pdf,
            pdf_bwd: 0.0,
            g_with_last: geometry_term(hit.inter.p, last_pos, hit.inter.n, last_nor),
            is_delta: bsdf.is_delta(),
            surface: Some(SurfaceRef {
                entity: hit.entity,
                bsdf,
            }),
        });
        last_pos = hit.inter.p;
        last_nor = hit.inter.n;

        let uc = sampler.get_1d();
        let u = sampler.get_2d();
        let bs = match bsdf.sample_f(
            &hit.inter.wo,
            uc,
            u,
            TransportMode::Radiance,
            BxdfFlags::ALL,
        ) {
            Some(bs) => bs,
            None => break,
        };

        proj_pdf = bs.pdf / abs_cos(hit.inter.n, bs.wi);
        accu_coef *= bs.f;
        accu_proj_pdf *= proj_pdf;
        ray = hit.inter.spawn_ray(bs.wi);
    }

    // Backward projected pdfs: pdf of regenerating vertex i from the
    // light side through its two successors.
    let n = vertices.len();
    let escaped = !vertices[n - 1].is_surface() && n > 1;
    let max_bwd = if escaped { n.saturating_sub(3) } else { n.saturating_sub(2) };
    for i in 0..max_bwd {
        let (a_pos, b, c_pos) = (vertices[i].pos, vertices[i + 1], vertices[i + 2].pos);
        if let Some(surf) = b.surface {
            vertices[i].pdf_bwd =
                proj_bsdf_pdf(surf.bsdf, b.nor, c_pos - b.pos, a_pos - b.pos);
        }
    }
    if escaped && n >= 3 {
        let (a_pos, b, c_dir) = (
            vertices[n - 3].pos,
            vertices[n - 2],
            vertices[n - 1].direction(),
        );
        if let Some(surf) = b.surface {
            vertices[n - 3].pdf_bwd = proj_bsdf_pdf(surf.bsdf, b.nor, c_dir, a_pos - b.pos);
        }
    }

    CameraSubpath { vertices, gbuffer }
}

fn build_light_subpath<'a>(
    max_vertices: usize,
    scene: &'a Scene,
    sampler: &mut Sampler,
    arena: &'a Arena,
) -> LightSubpath<'a> {
    let (light, select_light_pdf) = scene.sample_light(sampler.get_1d());
    let emit = light.sample_emit(&sampler.get_5d());

    let mut vertices = Vec::with_capacity(max_vertices);
    vertices.push(Vertex {
        pos: emit.pos,
        nor: emit.nor,
        accu_coef: Spectrum::splat(1.0),
        accu_proj_pdf: select_light_pdf * emit.pdf_pos,
        pdf_fwd: 0.0,
        pdf_bwd: select_light_pdf * emit.pdf_pos,
        g_with_last: 1.0,
        is_delta: light.is_delta(),
        surface: None,
    });

    let mut proj_pdf = emit.pdf_dir / abs_cos(emit.nor, emit.dir);
    let mut accu_proj_pdf = select_light_pdf * emit.pdf_pos * proj_pdf;
    let mut accu_coef = emit.radiance;
    let mut last_pos = emit.pos;
    let mut last_nor = emit.nor;
    let mut ray = Ray::new_with_range(emit.pos, emit.dir, EPS, Float::INFINITY);

    while vertices.len() < max_vertices {
        let hit = match scene.closest_intersection(&ray) {
            Some(hit) => hit,
            None => break,
        };

        let bsdf = hit.entity.material().bsdf(&hit.inter, arena);
        vertices.push(Vertex {
            pos: hit.inter.p,
            nor: hit.inter.n,
            accu_coef,
            accu_proj_pdf,
            pdf_fwd: 0.0,
            pdf_bwd: proj_pdf,
            g_with_last: geometry_term(hit.inter.p, last_pos, hit.inter.n, last_nor),
            is_delta: bsdf.is_delta(),
            surface: Some(SurfaceRef {
                entity: hit.entity,
                bsdf,
            }),
        });
        last_pos = hit.inter.p;
        last_nor = hit.inter.n;

        let uc = sampler.get_1d();
        let u = sampler.get_2d();
        let bs = match bsdf.sample_f(
            &hit.inter.wo,
            uc,
            u,
            TransportMode::Importance,
            BxdfFlags::ALL,
        ) {
            Some(bs) => bs,
            None => break,
        };

        proj_pdf = bs.pdf / abs_cos(hit.inter.n, bs.wi);
        accu_coef *= bs.f;
        accu_proj_pdf *= proj_pdf;
        ray = hit.inter.spawn_ray(bs.wi);
    }

    // Forward projected pdfs: pdf of regenerating vertex i from the
    // camera side.
    let n = vertices.len();
    for i in 1..n.saturating_sub(2) {
        let (a_pos, b, c_pos) = (vertices[i].pos, vertices[i + 1], vertices[i + 2].pos);
        if let Some(surf) = b.surface {
            vertices[i].pdf_fwd =
                proj_bsdf_pdf(surf.bsdf, b.nor, c_pos - b.pos, a_pos - b.pos);
        }
    }
    if n >= 3 {
        let b = vertices[1];
        let c_pos = vertices[2].pos;
        if let Some(surf) = b.surface {
            vertices[0].pdf_fwd =
                proj_bsdf_pdf(surf.bsdf, b.nor, c_pos - b.pos, -emit.dir);
        }
    }

    LightSubpath {
        vertices,
        light,
        select_light_pdf,
    }
}

/// Balance-heuristic weight over all strategies generating the same
/// path, expressed as pdf ratio chains walked from the connection
/// toward both path ends. Vertices must carry `pdf_fwd`, `pdf_bwd` and
/// `g_with_last`.
fn weight_common(
    cam: &[Vertex],
    lht: &[Vertex],
    s: usize,
    t: usize,
    g_connect: Float,
) -> Float {
    debug_assert!(s >= 1 && s + t >= 3);

    let mut sum_pdf = 1.0;
    let mut cur_pdf = 1.0;

    if t >= 2 {
        let mul = usable_pdf(lht[t - 1].pdf_fwd) * usable_pdf(g_connect);
        let div = usable_pdf(lht[t - 1].pdf_bwd) * usable_pdf(lht[t - 1].g_with_last);
        cur_pdf *= mul / div;
        if !lht[t - 2].is_delta {
            sum_pdf += cur_pdf;
        }
    }

    for i in (1..t.saturating_sub(1)).rev() {
        let mul = usable_pdf(lht[i].pdf_fwd) * usable_pdf(lht[i + 1].g_with_last);
        let div = usable_pdf(lht[i].pdf_bwd) * usable_pdf(lht[i].g_with_last);
        cur_pdf *= mul / div;
        if !lht[i].is_delta && !lht[i - 1].is_delta {
            sum_pdf += cur_pdf;
        }
    }

    if t >= 1 {
        let mul_g = if t == 1 {
            g_connect
        } else {
            lht[1].g_with_last
        };
        let mul = usable_pdf(lht[0].pdf_fwd) * usable_pdf(mul_g);
        let div = usable_pdf(lht[0].pdf_bwd);
        cur_pdf *= mul / div;
        if !lht[0].is_delta {
            sum_pdf += cur_pdf;
        }
    }

    cur_pdf = 1.0;

    if s >= 2 {
        let mul = usable_pdf(cam[s - 1].pdf_bwd) * usable_pdf(g_connect);
        let div = usable_pdf(cam[s - 1].pdf_fwd) * usable_pdf(cam[s - 1].g_with_last);
        cur_pdf *= mul / div;
        if !cam[s - 2].is_delta {
            sum_pdf += cur_pdf;
        }
    }

    for i in (1..s.saturating_sub(1)).rev() {
        let mul = usable_pdf(cam[i].pdf_bwd) * usable_pdf(cam[i + 1].g_with_last);
        let div = usable_pdf(cam[i].pdf_fwd) * usable_pdf(cam[i].g_with_last);
        cur_pdf *= mul / div;
        if !cam[i].is_delta && !cam[i - 1].is_delta {
            sum_pdf += cur_pdf;
        }
    }

    1.0 / sum_pdf
}

struct ConnectCtx<'a> {
    scene: &'a Scene,
    camera: &'a Camera,
    light: &'a Light,
    select_light_pdf: Float,
}

/// Direct camera-to-emitter path; the only strategy for two-vertex
/// paths, so it carries weight one.
fn contrib_s2_t0(ctx: &ConnectCtx, cam: &[Vertex]) -> Spectrum {
    let cam_beg = &cam[0];
    let cam_end = &cam[1];

    let radiance = match cam_end.surface {
        Some(surf) => match surf.entity.as_light().and_then(|l| l.as_area()) {
            Some(area) => area.radiance(cam_end.nor, &(cam_beg.pos - cam_end.pos)),
            None => return Spectrum::BLACK,
        },
        None => match ctx.scene.environment_lights().next() {
            Some(env) => env
                .as_environment()
                .map_or(Spectrum::BLACK, |e| e.radiance(&cam_end.direction())),
            None => return Spectrum::BLACK,
        },
    };
    radiance * cam_end.accu_coef / cam_end.accu_proj_pdf
}

/// Connects the light subpath directly to the lens; the result lands on
/// a film position chosen by the connection, so it is splatted.
fn contrib_s1_tx(
    ctx: &ConnectCtx,
    cam: &mut [Vertex],
    lht: &mut [Vertex],
    t: usize,
) -> Option<(Point2f, Spectrum)> {
    debug_assert!(t >= 2);
    let cam_beg = cam[0];
    let lht_end = lht[t - 1];
    let lht_bend = lht[t - 2];

    let cam_we = ctx.camera.eval_we(cam_beg.pos, lht_end.pos - cam_beg.pos);
    if cam_we.we.is_black() {
        return None;
    }
    if !ctx.scene.visible(cam_beg.pos, lht_end.pos) {
        return None;
    }

    let lht_end_bsdf = lht_end.surface?.bsdf;
    let wo = (lht_bend.pos - lht_end.pos).normalize();
    let wi = (cam_beg.pos - lht_end.pos).normalize();
    let f = lht_end_bsdf.f(&wo, &wi, TransportMode::Radiance, BxdfFlags::ALL);
    if f.is_black() {
        return None;
    }

    let g = geometry_term(cam_beg.pos, lht_end.pos, cam_beg.nor, lht_end.nor);
    if g < EPS {
        return None;
    }

    let contrib = cam_we.we * g * f * lht_end.accu_coef
        / (cam_beg.accu_proj_pdf * lht_end.accu_proj_pdf);
    if contrib.is_black() {
        return None;
    }

    // Temporarily fill the pdfs the alternative strategies would have
    // used for the two vertices adjacent to the connection.
    let saved_end_fwd = lht[t - 1].pdf_fwd;
    let saved_bend_fwd = lht[t - 2].pdf_fwd;

    let cam_to_end = lht_end.pos - cam_beg.pos;
    let cam_we_pdf = ctx.camera.pdf_we(cam_beg.pos, cam_to_end);
    lht[t - 1].pdf_fwd = cam_we_pdf.pdf_dir / abs_cos(cam_beg.nor, cam_to_end);
    lht[t - 2].pdf_fwd = proj_bsdf_pdf(
        lht_end_bsdf,
        lht_end.nor,
        cam_beg.pos - lht_end.pos,
        lht_bend.pos - lht_end.pos,
    );

    let weight = weight_common(cam, lht, 1, t, g);

    lht[t - 1].pdf_fwd = saved_end_fwd;
    lht[t - 2].pdf_fwd = saved_bend_fwd;

    if !weight.is_finite() || !contrib.is_finite() {
        return None;
    }
    Some((cam_we.film_coord, weight * contrib))
}

/// Camera subpath that terminated on an emitter (or escaped to the
/// environment) with no light vertices used.
fn contrib_sx_t0(ctx: &ConnectCtx, cam: &mut [Vertex], lht: &mut [Vertex], s: usize) -> Spectrum {
    debug_assert!(s >= 3);
    let cam_end = cam[s - 1];
    let cam_bend = cam[s - 2];

    let select_light_pdf = ctx.scene.light_pdf();

    let (contrib, weight);
    if let Some(surf) = cam_end.surface {
        let light = match surf.entity.as_light() {
            Some(l) => l,
            None => return Spectrum::BLACK,
        };
        let area = match light.as_area() {
            Some(a) => a,
            None => return Spectrum::BLACK,
        };
        let radiance = area.radiance(cam_end.nor, &(cam_bend.pos - cam_end.pos));
        contrib = radiance * cam_end.accu_coef / cam_end.accu_proj_pdf;
        if contrib.is_black() || !contrib.is_finite() {
            return Spectrum::BLACK;
        }

        let bend_to_end = cam_end.pos - cam_bend.pos;
        let emit_pdf = light.emit_pdf(cam_end.pos, -bend_to_end, cam_end.nor);

        let saved_end_bwd = cam[s - 1].pdf_bwd;
        let saved_bend_bwd = cam[s - 2].pdf_bwd;
        cam[s - 1].pdf_bwd = select_light_pdf * emit_pdf.pdf_pos;
        cam[s - 2].pdf_bwd = emit_pdf.pdf_dir / abs_cos(cam_end.nor, bend_to_end);

        weight = weight_common(cam, lht, s, 0, 1.0);

        cam[s - 1].pdf_bwd = saved_end_bwd;
        cam[s - 2].pdf_bwd = saved_bend_bwd;
    } else {
        let env_light = match ctx.scene.environment_lights().next() {
            Some(l) => l,
            None => return Spectrum::BLACK,
        };
        let env = match env_light.as_environment() {
            Some(e) => e,
            None => return Spectrum::BLACK,
        };
        let radiance = env.radiance(&cam_end.direction());
        contrib = radiance * cam_end.accu_coef / cam_end.accu_proj_pdf;
        if contrib.is_black() || !contrib.is_finite() {
            return Spectrum::BLACK;
        }

        let emit_pdf = env_light.emit_pdf(
            Point3f::ZERO,
            -cam_end.direction(),
            Normal3f::new(0.0, 0.0, 1.0),
        );
        let (emit_pos, emit_nor) = env.emit_pos(cam_bend.pos, &cam_end.direction());

        let saved_end_bwd = cam[s - 1].pdf_bwd;
        let saved_bend_bwd = cam[s - 2].pdf_bwd;
        let saved_end_g = cam[s - 1].g_with_last;
        cam[s - 1].pdf_bwd = select_light_pdf * emit_pdf.pdf_pos;
        cam[s - 2].pdf_bwd = emit_pdf.pdf_dir;
        cam[s - 1].g_with_last =
            geometry_term(cam_bend.pos, emit_pos, cam_bend.nor, emit_nor);

        weight = weight_common(cam, lht, s, 0, 1.0);

        cam[s - 1].pdf_bwd = saved_end_bwd;
        cam[s - 2].pdf_bwd = saved_bend_bwd;
        cam[s - 1].g_with_last = saved_end_g;
    }

    if !weight.is_finite() {
        return Spectrum::BLACK;
    }
    weight * contrib
}

/// Next-event estimation at the camera subpath end: one fresh light
/// sample replaces the light subpath.
fn contrib_sx_t1(
    ctx: &ConnectCtx,
    cam: &mut [Vertex],
    lht: &mut [Vertex],
    s: usize,
    sampler: &mut Sampler,
) -> Spectrum {
    debug_assert!(s >= 2);
    let cam_end = cam[s - 1];
    let cam_bend = cam[s - 2];

    let cam_end_bsdf = match cam_end.surface {
        Some(surf) => surf.bsdf,
        None => return Spectrum::BLACK,
    };

    let ls = match ctx.light.sample_li(cam_end.pos, &sampler.get_5d()) {
        Some(ls) => ls,
        None => return Spectrum::BLACK,
    };
    if ls.radiance.is_black() || ls.pdf <= 0.0 {
        return Spectrum::BLACK;
    }
    if !ctx.scene.visible(cam_end.pos, ls.pos) {
        return Spectrum::BLACK;
    }

    let ref_to_light = ls.dir_from(cam_end.pos);
    let wo = (cam_bend.pos - cam_end.pos).normalize();
    let f = cam_end_bsdf.f(&wo, &ref_to_light, TransportMode::Radiance, BxdfFlags::ALL);
    if f.is_black() {
        return Spectrum::BLACK;
    }

    let proj_pdf = ls.pdf / abs_cos(cam_end.nor, ref_to_light);
    let contrib = f * cam_end.accu_coef * ls.radiance
        / (ctx.select_light_pdf * cam_end.accu_proj_pdf * proj_pdf);
    if contrib.is_black() || !contrib.is_finite() {
        return Spectrum::BLACK;
    }

    let emit_pdf = ctx.light.emit_pdf(ls.pos, -ref_to_light, ls.nor);

    let saved_lht0_bwd = lht[0].pdf_bwd;
    let saved_lht0_fwd = lht[0].pdf_fwd;
    let saved_end_bwd = cam[s - 1].pdf_bwd;
    let saved_bend_bwd = cam[s - 2].pdf_bwd;

    lht[0].pdf_bwd = ctx.select_light_pdf * emit_pdf.pdf_pos;
    lht[0].pdf_fwd = proj_bsdf_pdf(
        cam_end_bsdf,
        cam_end.nor,
        cam_bend.pos - cam_end.pos,
        ref_to_light,
    );
    cam[s - 1].pdf_bwd = emit_pdf.pdf_dir / abs_cos(ls.nor, -ref_to_light);
    cam[s - 2].pdf_bwd = proj_bsdf_pdf(
        cam_end_bsdf,
        cam_end.nor,
        ref_to_light,
        cam_bend.pos - cam_end.pos,
    );

    let g = geometry_term(cam_end.pos, ls.pos, cam_end.nor, ls.nor);
    let weight = weight_common(cam, lht, s, 1, g);

    lht[0].pdf_bwd = saved_lht0_bwd;
    lht[0].pdf_fwd = saved_lht0_fwd;
    cam[s - 1].pdf_bwd = saved_end_bwd;
    cam[s - 2].pdf_bwd = saved_bend_bwd;

    if !weight.is_finite() {
        return Spectrum::BLACK;
    }
    weight * contrib
}

/// General surface-to-surface connection between the two subpath ends.
fn contrib_sx_tx(
    ctx: &ConnectCtx,
    cam: &mut [Vertex],
    lht: &mut [Vertex],
    s: usize,
    t: usize,
) -> Spectrum {
    debug_assert!(s > 1 && t > 1);
    let a = cam[s - 2];
    let b = cam[s - 1];
    let c = lht[t - 1];
    let d = lht[t - 2];

    let b_bsdf = match b.surface {
        Some(surf) => surf.bsdf,
        None => return Spectrum::BLACK,
    };
    let c_bsdf = match c.surface {
        Some(surf) => surf.bsdf,
        None => return Spectrum::BLACK,
    };

    if !ctx.scene.visible(b.pos, c.pos) {
        return Spectrum::BLACK;
    }

    let b_to_c = (c.pos - b.pos).normalize();
    let cam_f = b_bsdf.f(
        &(a.pos - b.pos).normalize(),
        &b_to_c,
        TransportMode::Radiance,
        BxdfFlags::ALL,
    );
    let lht_f = c_bsdf.f(
        &(d.pos - c.pos).normalize(),
        &(-b_to_c),
        TransportMode::Importance,
        BxdfFlags::ALL,
    );

    let g = geometry_term(b.pos, c.pos, b.nor, c.nor);
    let contrib = cam_f * lht_f * b.accu_coef * c.accu_coef * g
        / (b.accu_proj_pdf * c.accu_proj_pdf);
    if contrib.is_black() || !contrib.is_finite() {
        return Spectrum::BLACK;
    }

    let saved_c_fwd = lht[t - 1].pdf_fwd;
    let saved_d_fwd = lht[t - 2].pdf_fwd;
    let saved_b_bwd = cam[s - 1].pdf_bwd;
    let saved_a_bwd = cam[s - 2].pdf_bwd;

    lht[t - 1].pdf_fwd = proj_bsdf_pdf(b_bsdf, b.nor, a.pos - b.pos, c.pos - b.pos);
    lht[t - 2].pdf_fwd = proj_bsdf_pdf(c_bsdf, c.nor, b.pos - c.pos, d.pos - c.pos);
    cam[s - 1].pdf_bwd = proj_bsdf_pdf(c_bsdf, c.nor, d.pos - c.pos, b.pos - c.pos);
    cam[s - 2].pdf_bwd = proj_bsdf_pdf(b_bsdf, b.nor, c.pos - b.pos, a.pos - b.pos);

    let weight = weight_common(cam, lht, s, t, g);

    lht[t - 1].pdf_fwd = saved_c_fwd;
    lht[t - 2].pdf_fwd = saved_d_fwd;
    cam[s - 1].pdf_bwd = saved_b_bwd;
    cam[s - 2].pdf_bwd = saved_a_bwd;

    if !weight.is_finite() {
        return Spectrum::BLACK;
    }
    weight * contrib
}

fn eval_connection(
    ctx: &ConnectCtx,
    cam: &mut [Vertex],
    lht: &mut [Vertex],
    s: usize,
    t: usize,
    sampler: &mut Sampler,
) -> Spectrum {
    debug_assert!(s >= 2);
    if s + t < 2 {
        return Spectrum::BLACK;
    }
    if s + t == 2 {
        return if s == 2 {
            contrib_s2_t0(ctx, cam)
        } else {
            Spectrum::BLACK
        };
    }
    match t {
        0 => {
            if s >= 3 {
                contrib_sx_t0(ctx, cam, lht, s)
            } else {
                Spectrum::BLACK
            }
        }
        1 => contrib_sx_t1(ctx, cam, lht, s, sampler),
        _ => contrib_sx_tx(ctx, cam, lht, s, t),
    }
}

/// Runs one bidirectional sample through the film point `film_coord`.
/// Lens connections (s = 1) are deposited into `splats`; all other
/// strategies accumulate into the returned pixel estimate.
pub fn trace_bdpt(
    params: &BdptParams,
    scene: &Scene,
    film_coord: Point2f,
    sampler: &mut Sampler,
    arena: &Arena,
    mut splats: Option<&mut SplatGrid>,
) -> PixelEval {
    let cam_subpath = build_camera_subpath(
        params.max_camera_vertices,
        scene,
        film_coord,
        sampler,
        arena,
    );
    let lht_subpath = build_light_subpath(params.max_light_vertices, scene, sampler, arena);

    let mut cam = cam_subpath.vertices;
    let mut lht = lht_subpath.vertices;
    let ctx = ConnectCtx {
        scene,
        camera: scene.camera(),
        light: lht_subpath.light,
        select_light_pdf: lht_subpath.select_light_pdf,
    };

    if let Some(splats) = splats.as_deref_mut() {
        for t in 2..=lht.len() {
            if let Some((coord, rad)) = contrib_s1_tx(&ctx, &mut cam, &mut lht, t) {
                splats.add_splat(coord, rad);
            }
        }
    }

    let mut radiance = Spectrum::BLACK;
    for s in 2..=cam.len() {
        for t in 0..=lht.len() {
            radiance += eval_connection(&ctx, &mut cam, &mut lht, s, t, sampler);
        }
    }
    if !radiance.is_finite() {
        radiance = Spectrum::BLACK;
    }

    PixelEval {
        value: radiance,
        gbuffer: cam_subpath.gbuffer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::material::Material;
    use crate::options::PathTracingParams;
    use crate::paramset::ParamSet;
    use crate::render::path_tracing::trace_mis;
    use crate::scene::Entity;
    use crate::shape::{Shape, Sphere};
    use crate::vecmath::Point2i;
    use std::sync::Arc;

    #[test]
    fn usable_pdf_guards_degenerate_values() {
        assert_eq!(usable_pdf(Float::NAN), 1.0);
        assert_eq!(usable_pdf(0.0), 1.0);
        assert_eq!(usable_pdf(0.5), 0.5);
    }

    #[test]
    fn geometry_term_is_symmetric() {
        let a = Point3f::new(0.0, 0.0, 0.0);
        let b = Point3f::new(0.0, 0.0, 2.0);
        let na = Normal3f::new(0.0, 0.0, 1.0);
        let nb = Normal3f::new(0.0, 0.0, -1.0);
        let g_ab = geometry_term(a, b, na, nb);
        let g_ba = geometry_term(b, a, nb, na);
        assert!((g_ab - g_ba).abs() < 1e-6);
        assert!((g_ab - 0.25).abs() < 1e-6);
    }

    fn test_scene() -> Scene {
        let diffuse = Arc::new(
            Material::create(
                "diffuse",
                &ParamSet::new().set_spectrum("albedo", Spectrum::splat(0.5)),
            )
            .unwrap(),
        );
        let floor = Entity::new(
            Arc::new(Shape::Sphere(
                Sphere::new(Point3f::new(0.0, 0.0, -100.0), 99.0).unwrap(),
            )),
            diffuse.clone(),
            None,
        );
        let ball = Entity::new(
            Arc::new(Shape::Sphere(
                Sphere::new(Point3f::new(0.0, 5.0, 0.5), 1.0).unwrap(),
            )),
            diffuse.clone(),
            None,
        );
        let lamp = Entity::new(
            Arc::new(Shape::Sphere(
                Sphere::new(Point3f::new(0.0, 5.0, 6.0), 1.0).unwrap(),
            )),
            diffuse,
            Some(Spectrum::splat(10.0)),
        );
        let camera = Camera::create(
            "pinhole",
            &ParamSet::new()
                .set_vec3("pos", Vector3f::new(0.0, -4.0, 1.0))
                .set_vec3("dst", Vector3f::new(0.0, 5.0, 0.5))
                .set_vec3("up", Vector3f::Z),
            1.0,
        )
        .unwrap();
        Scene::new(vec![floor, ball, lamp], Vec::new(), camera).unwrap()
    }

    /// The bidirectional estimator must agree with unidirectional MIS
    /// path tracing in expectation. A one-pixel film makes the
    /// comparison well defined: every lens-connection splat lands in
    /// that pixel, so film-average radiance can be compared directly.
    #[test]
    fn bdpt_matches_path_tracing_mean() {
        use crate::film::{Film, GBufferSample};
        use crate::filter::{BoxFilter, Filter};

        let scene = test_scene();
        let bdpt_params = BdptParams {
            max_camera_vertices: 8,
            max_light_vertices: 8,
        };
        let pt_params = PathTracingParams {
            min_depth: 5,
            max_depth: 12,
            cont_prob: 0.9,
        };
        let arena = Arena::new();
        let n = 4000;
        let res = Point2i::new(1, 1);

        let mut sampler = Sampler::create("independent", &ParamSet::new()).unwrap();
        let mut film = Film::new(res, Filter::Box(BoxFilter { radius: 0.5 }));
        let mut grid = film.film_grid(film.full_bounds());
        let mut splats = SplatGrid::new(res);
        for _ in 0..n {
            let coord = sampler.get_2d();
            let pixel = trace_bdpt(
                &bdpt_params,
                &scene,
                coord,
                &mut sampler,
                &arena,
                Some(&mut splats),
            );
            grid.add_sample(
                Point2f::new(0.5, 0.5),
                pixel.value,
                &GBufferSample::default(),
            );
        }
        film.merge_grid(&grid);
        film.merge_splats(&splats);
        let bdpt = film
            .develop(1.0 / n as Float)
            .radiance
            .get(Point2i::new(0, 0))
            .luminance();

        let mut sum_pt = 0.0;
        for _ in 0..n {
            let coord = sampler.get_2d();
            let ray = scene.camera().generate_ray(coord, sampler.get_2d());
            sum_pt += trace_mis(&pt_params, &scene, &ray, &mut sampler, &arena)
                .value
                .luminance();
        }
        let pt = sum_pt / n as Float;

        assert!(
            (bdpt - pt).abs() < 0.15 * pt.max(bdpt).max(1e-3),
            "bdpt {} vs pt {}",
            bdpt,
            pt
        );
    }

    #[test]
    fn camera_subpath_starts_on_the_lens() {
        let scene = test_scene();
        let mut sampler = Sampler::create("independent", &ParamSet::new()).unwrap();
        let arena = Arena::new();
        let subpath =
            build_camera_subpath(6, &scene, Point2f::new(0.5, 0.5), &mut sampler, &arena);
        assert!(subpath.vertices.len() >= 2);
        assert!(!subpath.vertices[0].is_surface());
        assert!((subpath.vertices[0].pos - Point3f::new(0.0, -4.0, 1.0)).length() < 1e-5);
        assert!(subpath.vertices[1].is_surface());
    }

    #[test]
    fn light_subpath_starts_on_the_light() {
        let scene = test_scene();
        let mut sampler = Sampler::create("independent", &ParamSet::new()).unwrap();
        let arena = Arena::new();
        let subpath = build_light_subpath(6, &scene, &mut sampler, &arena);
        assert!(!subpath.vertices.is_empty());
        let origin = &subpath.vertices[0];
        assert!((origin.pos.distance(&Point3f::new(0.0, 5.0, 6.0)) - 1.0).abs() < 1e-4);
        assert!(origin.pdf_bwd > 0.0);
    }
}
