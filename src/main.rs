use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;

use radiant::camera::Camera;
use radiant::film::{Film, RenderTarget};
use radiant::filter::Filter;
use radiant::light::Light;
use radiant::material::Material;
use radiant::paramset::ParamSet;
use radiant::renderer::{Renderer, RendererI};
use radiant::reporter::{LogReporter, Reporter, ReporterI};
use radiant::scene::{Entity, Scene};
use radiant::shape::{Shape, Sphere};
use radiant::spectrum::Spectrum;
use radiant::vecmath::{Point2i, Point3f, Vector3f};
use radiant::{Error, Float, Result};

/// Renders a built-in demonstration scene with the selected strategy.
#[derive(Parser)]
#[command(name = "radiant", about = "Offline Monte-Carlo renderer")]
struct Args {
    /// Rendering strategy: native, pt, mis, bdpt or particle.
    #[arg(long, default_value = "mis")]
    renderer: String,

    #[arg(long, default_value_t = 512)]
    width: i32,

    #[arg(long, default_value_t = 384)]
    height: i32,

    /// Samples per pixel.
    #[arg(long, default_value_t = 16)]
    spp: i64,

    /// Worker threads; zero means one per logical CPU.
    #[arg(long, default_value_t = 0)]
    workers: i64,

    /// Reconstruction filter: box or gaussian.
    #[arg(long, default_value = "gaussian")]
    filter: String,

    #[arg(long, default_value_t = 42)]
    seed: i64,

    #[arg(long, default_value = "render.png")]
    output: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run(Args::parse()) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    if args.width <= 0 || args.height <= 0 {
        return Err(Error::InvalidValue {
            name: "width",
            reason: "image dimensions must be positive".to_string(),
        });
    }

    let scene = demo_scene(args.width as Float / args.height as Float)?;
    let filter = Filter::create(&args.filter, &ParamSet::new())?;
    let film = Film::new(Point2i::new(args.width, args.height), filter);

    let renderer_params = ParamSet::new()
        .set_int("spp", args.spp)
        .set_int("worker_count", args.workers)
        .set_int("seed", args.seed);
    let renderer = Renderer::create(&args.renderer, &renderer_params)?;

    let mut reporter = Reporter::Log(LogReporter::new());
    let cancel = AtomicBool::new(false);
    let target = renderer.render(&scene, film, &mut reporter, &cancel)?;

    write_png(&target, &args.output)?;
    log::info!(
        "wrote {} ({:.2}s)",
        args.output.display(),
        reporter.total_seconds()
    );
    Ok(())
}

/// Two spheres over a ground plane, lit by a spherical lamp and a
/// gradient sky.
fn demo_scene(film_aspect: Float) -> Result<Scene> {
    let ground = Entity::new(
        Arc::new(Shape::Sphere(Sphere::new(
            Point3f::new(0.0, 0.0, -1000.0),
            1000.0,
        )?)),
        Arc::new(Material::create(
            "diffuse",
            &ParamSet::new().set_spectrum("albedo", Spectrum::splat(0.7)),
        )?),
        None,
    );
    let red_ball = Entity::new(
        Arc::new(Shape::Sphere(Sphere::new(
            Point3f::new(-1.2, 0.0, 1.0),
            1.0,
        )?)),
        Arc::new(Material::create(
            "diffuse",
            &ParamSet::new().set_spectrum("albedo", Spectrum::new(0.7, 0.25, 0.25)),
        )?),
        None,
    );
    let metal_ball = Entity::new(
        Arc::new(Shape::Sphere(Sphere::new(
            Point3f::new(1.2, 0.6, 1.0),
            1.0,
        )?)),
        Arc::new(Material::create(
            "metal",
            &ParamSet::new()
                .set_spectrum("color", Spectrum::new(0.9, 0.8, 0.6))
                .set_float("roughness", 0.15),
        )?),
        None,
    );
    let lamp = Entity::new(
        Arc::new(Shape::Sphere(Sphere::new(
            Point3f::new(0.0, 0.0, 6.0),
            1.0,
        )?)),
        Arc::new(Material::create(
            "diffuse",
            &ParamSet::new().set_spectrum("albedo", Spectrum::BLACK),
        )?),
        Some(Spectrum::splat(12.0)),
    );

    let sky = Light::create(
        "native_sky",
        &ParamSet::new()
            .set_spectrum("top", Spectrum::new(0.4, 0.55, 0.8))
            .set_spectrum("bottom", Spectrum::splat(0.9)),
    )?;

    let camera = Camera::create(
        "thin_lens",
        &ParamSet::new()
            .set_vec3("pos", Vector3f::new(0.0, -7.0, 1.5))
            .set_vec3("dst", Vector3f::new(0.0, 0.0, 1.0))
            .set_vec3("up", Vector3f::Z)
            .set_float("fov", 50.0),
        film_aspect,
    )?;

    Scene::new(vec![ground, red_ball, metal_ball, lamp], vec![sky], camera)
}

/// Tonemaps with plain gamma 2.2 and writes an 8-bit PNG.
fn write_png(target: &RenderTarget, path: &Path) -> Result<()> {
    let res = target.resolution();
    let mut img = image::RgbImage::new(res.x as u32, res.y as u32);
    for p in target.radiance.extent().pixels() {
        let c = target.radiance.get(p);
        let encode = |v: Float| (v.max(0.0).powf(1.0 / 2.2).min(1.0) * 255.0) as u8;
        img.put_pixel(
            p.x as u32,
            p.y as u32,
            image::Rgb([encode(c.r), encode(c.g), encode(c.b)]),
        );
    }
    img.save(path)
        .map_err(|e| Error::Render(format!("writing {}: {}", path.display(), e)))
}
