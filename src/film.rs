use crate::bounds::Bounds2i;
use crate::filter::{Filter, FilterI};
use crate::float::Float;
use crate::spectrum::Spectrum;
use crate::vec2d::Vec2d;
use crate::vecmath::{Point2f, Point2i, Vector3f};

/// Auxiliary per-sample shading data accumulated next to radiance and
/// exported for denoising consumers.
#[derive(Debug, Copy, Clone, Default)]
pub struct GBufferSample {
    pub albedo: Spectrum,
    pub normal: Vector3f,
    pub depth: Float,
}

/// Final images handed to the caller; encoding is not our business.
pub struct RenderTarget {
    pub radiance: Vec2d<Spectrum>,
    pub albedo: Vec2d<Spectrum>,
    pub normal: Vec2d<Vector3f>,
    pub depth: Vec2d<Float>,
}

impl RenderTarget {
    pub fn resolution(&self) -> Point2i {
        Point2i::new(self.radiance.width(), self.radiance.height())
    }
}

/// Shared reconstruction-filter-weighted accumulation buffers. Workers
/// never touch the film directly; they fill private `FilmGrid`s and
/// merge them under the renderer's lock.
pub struct Film {
    resolution: Point2i,
    filter: Filter,
    value: Vec2d<Spectrum>,
    weight: Vec2d<Float>,
    albedo: Vec2d<Spectrum>,
    normal: Vec2d<Vector3f>,
    depth: Vec2d<Float>,
    splat: Vec2d<Spectrum>,
}

impl Film {
    pub fn new(resolution: Point2i, filter: Filter) -> Film {
        let full = Bounds2i::new(Point2i::new(0, 0), resolution);
        Film {
            resolution,
            filter,
            value: Vec2d::from_bounds(full),
            weight: Vec2d::from_bounds(full),
            albedo: Vec2d::from_bounds(full),
            normal: Vec2d::from_bounds(full),
            depth: Vec2d::from_bounds(full),
            splat: Vec2d::from_bounds(full),
        }
    }

    pub fn resolution(&self) -> Point2i {
        self.resolution
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn full_bounds(&self) -> Bounds2i {
        Bounds2i::new(Point2i::new(0, 0), self.resolution)
    }

    /// Private accumulation grid for one task. The grid's extent is the
    /// task rectangle expanded by the filter radius (clipped to the
    /// image) so border samples can deposit weight into neighbouring
    /// pixels owned by adjacent tasks; merging sums the overlap.
    pub fn film_grid(&self, sample_pixels: Bounds2i) -> FilmGrid {
        let r = self.filter.radius().ceil() as i32;
        let expanded = Bounds2i::new(
            Point2i::new(sample_pixels.low.x - r, sample_pixels.low.y - r),
            Point2i::new(sample_pixels.high.x + r, sample_pixels.high.y + r),
        )
        .intersect(&self.full_bounds());
        FilmGrid {
            sample_pixels,
            filter: self.filter.clone(),
            value: Vec2d::from_bounds(expanded),
            weight: Vec2d::from_bounds(expanded),
            albedo: Vec2d::from_bounds(expanded),
            normal: Vec2d::from_bounds(expanded),
            depth: Vec2d::from_bounds(expanded),
        }
    }

    /// Commutative, associative merge; the final image does not depend
    /// on the order tasks complete.
    pub fn merge_grid(&mut self, grid: &FilmGrid) {
        let extent = grid.value.extent();
        for p in extent.pixels() {
            *self.value.get_mut(p) += grid.value.get(p);
            *self.weight.get_mut(p) += grid.weight.get(p);
            *self.albedo.get_mut(p) += grid.albedo.get(p);
            *self.normal.get_mut(p) += grid.normal.get(p);
            *self.depth.get_mut(p) += grid.depth.get(p);
        }
    }

    /// Adds a worker's full-resolution splat buffer.
    pub fn merge_splats(&mut self, splats: &SplatGrid) {
        for p in self.full_bounds().pixels() {
            *self.splat.get_mut(p) += splats.image.get(p);
        }
    }

    /// Snapshot of the radiance accumulated so far, for progress
    /// previews. Splats are left out since their scale is only known at
    /// the end of the render.
    pub fn preview(&self) -> Vec2d<Spectrum> {
        let full = self.full_bounds();
        let mut out = Vec2d::from_bounds(full);
        for p in full.pixels() {
            let w = self.weight.get(p);
            if w > 0.0 {
                out.set(p, self.value.get(p) / w);
            }
        }
        out
    }

    /// Resolves the accumulators into displayable buffers.
    /// `splat_scale` converts raw splat sums into radiance (e.g.
    /// `pixel_count / particle_count` for particle tracing).
    pub fn develop(&self, splat_scale: Float) -> RenderTarget {
        let full = self.full_bounds();
        let mut radiance = Vec2d::from_bounds(full);
        let mut albedo = Vec2d::from_bounds(full);
        let mut normal = Vec2d::from_bounds(full);
        let mut depth = Vec2d::from_bounds(full);
        for p in full.pixels() {
            let w = self.weight.get(p);
            if w > 0.0 {
                radiance.set(p, self.value.get(p) / w);
                albedo.set(p, self.albedo.get(p) / w);
                normal.set(p, self.normal.get(p) / w);
                depth.set(p, self.depth.get(p) / w);
            }
            let r = radiance.get(p) + self.splat.get(p) * splat_scale;
            radiance.set(p, r);
        }
        RenderTarget {
            radiance,
            albedo,
            normal,
            depth,
        }
    }
}

/// Per-task accumulation grid; owned by exactly one worker until it is
/// merged.
pub struct FilmGrid {
    sample_pixels: Bounds2i,
    filter: Filter,
    value: Vec2d<Spectrum>,
    weight: Vec2d<Float>,
    albedo: Vec2d<Spectrum>,
    normal: Vec2d<Vector3f>,
    depth: Vec2d<Float>,
}

impl FilmGrid {
    /// Pixels this task generates samples for.
    pub fn sample_pixels(&self) -> Bounds2i {
        self.sample_pixels
    }

    /// Deposits one radiance sample at film position `p_film` (pixel
    /// units). Non-finite values are dropped here so one broken sample
    /// cannot poison the image.
    pub fn add_sample(&mut self, p_film: Point2f, value: Spectrum, gbuffer: &GBufferSample) {
        if !value.is_finite() {
            return;
        }
        let r = self.filter.radius();
        let extent = self.value.extent();
        let x0 = (p_film.x - r - 0.5).ceil() as i32;
        let x1 = (p_film.x + r - 0.5).floor() as i32;
        let y0 = (p_film.y - r - 0.5).ceil() as i32;
        let y1 = (p_film.y + r - 0.5).floor() as i32;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = Point2i::new(x, y);
                if !extent.contains(p) {
                    continue;
                }
                let centre = Point2f::new(x as Float + 0.5, y as Float + 0.5);
                let w = self.filter.evaluate(centre - p_film);
                if w == 0.0 {
                    continue;
                }
                *self.value.get_mut(p) += w * value;
                *self.weight.get_mut(p) += w;
                *self.albedo.get_mut(p) += w * gbuffer.albedo;
                *self.normal.get_mut(p) += w * gbuffer.normal;
                *self.depth.get_mut(p) += w * gbuffer.depth;
            }
        }
    }
}

/// Full-resolution splat accumulator for integrators that write to
/// pixels not known in advance. Each worker owns one and the renderer
/// merges them at end of pass, so splatting never contends on a lock.
pub struct SplatGrid {
    image: Vec2d<Spectrum>,
}

impl SplatGrid {
    pub fn new(resolution: Point2i) -> SplatGrid {
        SplatGrid {
            image: Vec2d::from_bounds(Bounds2i::new(Point2i::new(0, 0), resolution)),
        }
    }

    /// Splats at a film coordinate in `[0,1]^2`.
    pub fn add_splat(&mut self, film_coord: Point2f, value: Spectrum) {
        if !value.is_finite() {
            return;
        }
        let res = self.image.extent().high;
        let x = (film_coord.x * res.x as Float) as i32;
        let y = (film_coord.y * res.y as Float) as i32;
        let p = Point2i::new(x.clamp(0, res.x - 1), y.clamp(0, res.y - 1));
        if film_coord.x < 0.0
            || film_coord.x >= 1.0
            || film_coord.y < 0.0
            || film_coord.y >= 1.0
        {
            return;
        }
        *self.image.get_mut(p) += value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::BoxFilter;
    use crate::paramset::ParamSet;
    use float_cmp::assert_approx_eq;

    fn box_film(w: i32, h: i32) -> Film {
        Film::new(
            Point2i::new(w, h),
            Filter::Box(BoxFilter { radius: 0.5 }),
        )
    }

    #[test]
    fn box_sample_lands_in_one_pixel() {
        let film = box_film(4, 4);
        let mut grid = film.film_grid(film.full_bounds());
        grid.add_sample(
            Point2f::new(1.3, 2.6),
            Spectrum::splat(2.0),
            &GBufferSample::default(),
        );
        let mut film = film;
        film.merge_grid(&grid);
        let out = film.develop(0.0);
        assert_approx_eq!(Float, out.radiance.get(Point2i::new(1, 2)).r, 2.0, epsilon = 1e-5);
        assert_eq!(out.radiance.get(Point2i::new(2, 2)), Spectrum::BLACK);
    }

    #[test]
    fn merge_is_order_independent() {
        let film = box_film(8, 8);
        let half_a = Bounds2i::new(Point2i::new(0, 0), Point2i::new(4, 8));
        let half_b = Bounds2i::new(Point2i::new(4, 0), Point2i::new(8, 8));
        let mut grid_a = film.film_grid(half_a);
        let mut grid_b = film.film_grid(half_b);
        grid_a.add_sample(
            Point2f::new(1.5, 1.5),
            Spectrum::splat(1.0),
            &GBufferSample::default(),
        );
        grid_b.add_sample(
            Point2f::new(5.5, 6.5),
            Spectrum::splat(3.0),
            &GBufferSample::default(),
        );

        let mut film_ab = box_film(8, 8);
        film_ab.merge_grid(&grid_a);
        film_ab.merge_grid(&grid_b);
        let mut film_ba = box_film(8, 8);
        film_ba.merge_grid(&grid_b);
        film_ba.merge_grid(&grid_a);

        let out_ab = film_ab.develop(0.0);
        let out_ba = film_ba.develop(0.0);
        for p in out_ab.radiance.extent().pixels() {
            assert_eq!(out_ab.radiance.get(p), out_ba.radiance.get(p));
        }
    }

    #[test]
    fn non_finite_samples_are_dropped() {
        let film = box_film(2, 2);
        let mut grid = film.film_grid(film.full_bounds());
        grid.add_sample(
            Point2f::new(0.5, 0.5),
            Spectrum::new(Float::NAN, 1.0, 1.0),
            &GBufferSample::default(),
        );
        let mut film = film;
        film.merge_grid(&grid);
        let out = film.develop(0.0);
        assert_eq!(out.radiance.get(Point2i::new(0, 0)), Spectrum::BLACK);
    }

    #[test]
    fn splats_are_scaled_at_develop_time() {
        let mut film = box_film(4, 4);
        let mut splats = SplatGrid::new(film.resolution());
        splats.add_splat(Point2f::new(0.4, 0.4), Spectrum::splat(8.0));
        film.merge_splats(&splats);
        let out = film.develop(0.25);
        assert_approx_eq!(Float, out.radiance.get(Point2i::new(1, 1)).r, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn gaussian_grid_extends_past_task_boundary() {
        let filter = Filter::create("gaussian", &ParamSet::new()).unwrap();
        let film = Film::new(Point2i::new(8, 4), filter);
        let left = Bounds2i::new(Point2i::new(0, 0), Point2i::new(4, 4));
        let mut grid = film.film_grid(left);
        // Sample near the task boundary spills into x=4.
        grid.add_sample(
            Point2f::new(3.9, 2.0),
            Spectrum::splat(1.0),
            &GBufferSample::default(),
        );
        assert!(grid.weight.get(Point2i::new(4, 1)) > 0.0);
    }
}
