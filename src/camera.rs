use crate::error::{Error, Result};
use crate::float::{Float, PI};
use crate::frame::Frame;
use crate::paramset::ParamSet;
use crate::ray::Ray;
use crate::sampling::sample_uniform_disk_concentric;
use crate::spectrum::Spectrum;
use crate::vecmath::{Normal3f, Point2f, Point3f, Vector3f};

/// Emitted-importance sample: a ray leaving the lens.
#[derive(Debug, Copy, Clone)]
pub struct CameraSampleWe {
    pub pos: Point3f,
    pub dir: Vector3f,
    pub nor: Normal3f,
    pub we: Spectrum,
}

#[derive(Debug, Copy, Clone)]
pub struct CameraEvalWe {
    pub we: Spectrum,
    pub film_coord: Point2f,
}

#[derive(Debug, Copy, Clone)]
pub struct CameraWePdf {
    pub pdf_pos: Float,
    pub pdf_dir: Float,
}

/// Lens point sampled toward a reference point; `pdf` is w.r.t. solid
/// angle at the reference point.
#[derive(Debug, Copy, Clone)]
pub struct CameraWiSample {
    pub pos: Point3f,
    pub nor: Normal3f,
    pub ref_to_pos: Vector3f,
    pub we: Spectrum,
    pub pdf: Float,
    pub film_coord: Point2f,
}

#[derive(Debug)]
pub enum Camera {
    ThinLens(ThinLensCamera),
}

impl Camera {
    pub fn create(name: &str, params: &ParamSet, film_aspect: Float) -> Result<Camera> {
        match name {
            "thin_lens" | "pinhole" => {
                let lens_radius = if name == "pinhole" {
                    0.0
                } else {
                    params.get_float("lens_radius", 0.0)
                };
                Ok(Camera::ThinLens(ThinLensCamera::new(
                    film_aspect,
                    params.get_point3(
                        "pos",
                        Point3f::new(0.0, 0.0, 0.0),
                    ),
                    params.get_point3("dst", Point3f::new(0.0, 1.0, 0.0)),
                    params.get_vec3("up", Vector3f::Z),
                    params.get_float("fov", 60.0).to_radians(),
                    lens_radius,
                    params.get_float("focal_distance", 1.0),
                )?))
            }
            _ => Err(Error::UnknownType {
                kind: "camera",
                name: name.to_string(),
            }),
        }
    }

    pub fn generate_ray(&self, film_coord: Point2f, aperture: Point2f) -> Ray {
        match self {
            Camera::ThinLens(c) => c.generate_ray(film_coord, aperture),
        }
    }

    pub fn sample_we(&self, film_coord: Point2f, aperture: Point2f) -> CameraSampleWe {
        match self {
            Camera::ThinLens(c) => c.sample_we(film_coord, aperture),
        }
    }

    pub fn eval_we(&self, pos_on_cam: Point3f, pos_to_out: Vector3f) -> CameraEvalWe {
        match self {
            Camera::ThinLens(c) => c.eval_we(pos_on_cam, pos_to_out),
        }
    }

    pub fn pdf_we(&self, pos_on_cam: Point3f, pos_to_out: Vector3f) -> CameraWePdf {
        match self {
            Camera::ThinLens(c) => c.pdf_we(pos_on_cam, pos_to_out),
        }
    }

    pub fn sample_wi(&self, ref_p: Point3f, u: Point2f) -> Option<CameraWiSample> {
        match self {
            Camera::ThinLens(c) => c.sample_wi(ref_p, u),
        }
    }
}

/// Thin-lens model; a zero lens radius degenerates to a pinhole. Film
/// coordinates are in `[0,1]^2` with the origin at the top-left of the
/// focal-plane film.
#[derive(Debug)]
pub struct ThinLensCamera {
    pos: Point3f,
    dir: Vector3f,
    frame: Frame,
    focal_film_width: Float,
    focal_film_height: Float,
    area_focal_film: Float,
    area_lens: Float,
    lens_radius: Float,
    focal_distance: Float,
}

impl ThinLensCamera {
    pub fn new(
        film_aspect: Float,
        pos: Point3f,
        dst: Point3f,
        up: Vector3f,
        fov: Float,
        lens_radius: Float,
        focal_distance: Float,
    ) -> Result<ThinLensCamera> {
        if fov <= 0.0 || fov >= PI {
            return Err(Error::InvalidValue {
                name: "fov",
                reason: format!("must lie in (0, pi), got {}", fov),
            });
        }
        if focal_distance <= 0.0 {
            return Err(Error::InvalidValue {
                name: "focal_distance",
                reason: "must be positive".to_string(),
            });
        }
        if lens_radius < 0.0 {
            return Err(Error::InvalidValue {
                name: "lens_radius",
                reason: "must be non-negative".to_string(),
            });
        }
        let dir = (dst - pos).normalize();
        let x = up.cross(&dir);
        if x.length_squared() == 0.0 {
            return Err(Error::InvalidValue {
                name: "up",
                reason: "parallel to the view direction".to_string(),
            });
        }
        let x = x.normalize();
        let y = dir.cross(&x);

        let focal_film_height = 2.0 * focal_distance * (fov / 2.0).tan();
        let focal_film_width = film_aspect * focal_film_height;
        let area_lens = if lens_radius > 0.0 {
            PI * lens_radius * lens_radius
        } else {
            1.0
        };

        Ok(ThinLensCamera {
            pos,
            dir,
            frame: Frame::new(x, y, dir),
            focal_film_width,
            focal_film_height,
            area_focal_film: focal_film_width * focal_film_height,
            area_lens,
            lens_radius,
            focal_distance,
        })
    }

    fn to_world_point(&self, local: Vector3f) -> Point3f {
        self.pos + self.frame.from_local(&local)
    }

    fn to_local_point(&self, world: Point3f) -> Vector3f {
        self.frame.to_local(&(world - self.pos))
    }

    pub fn sample_we(&self, film_coord: Point2f, aperture: Point2f) -> CameraSampleWe {
        let focal_film_pos = Vector3f::new(
            (0.5 - film_coord.x) * self.focal_film_width,
            (film_coord.y - 0.5) * self.focal_film_height,
            self.focal_distance,
        );
        let disk = sample_uniform_disk_concentric(aperture);
        let lens_pos = Vector3f::new(
            self.lens_radius * disk.x,
            self.lens_radius * disk.y,
            0.0,
        );
        let pos = self.to_world_point(lens_pos);
        let dir = self.frame.from_local(&(focal_film_pos - lens_pos)).normalize();
        CameraSampleWe {
            pos,
            dir,
            nor: Normal3f::from(self.dir),
            we: Spectrum::splat(1.0),
        }
    }

    pub fn generate_ray(&self, film_coord: Point2f, aperture: Point2f) -> Ray {
        let s = self.sample_we(film_coord, aperture);
        Ray::new(s.pos, s.dir)
    }

    pub fn eval_we(&self, pos_on_cam: Point3f, pos_to_out: Vector3f) -> CameraEvalWe {
        let lens_pos = self.to_local_point(pos_on_cam);
        let local_dir = self.frame.to_local(&pos_to_out).normalize();
        if local_dir.z <= 0.0 {
            return CameraEvalWe {
                we: Spectrum::BLACK,
                film_coord: Point2f::ZERO,
            };
        }
        let focal_film_pos = lens_pos + (self.focal_distance / local_dir.z) * local_dir;
        let film_coord = Point2f::new(
            0.5 - focal_film_pos.x / self.focal_film_width,
            0.5 + focal_film_pos.y / self.focal_film_height,
        );
        let cos2_theta = local_dir.z * local_dir.z;
        let we = self.focal_distance * self.focal_distance
            / (self.area_focal_film * self.area_lens * cos2_theta * cos2_theta);
        CameraEvalWe {
            we: Spectrum::splat(we),
            film_coord,
        }
    }

    pub fn pdf_we(&self, _pos_on_cam: Point3f, pos_to_out: Vector3f) -> CameraWePdf {
        let local_dir = self.frame.to_local(&pos_to_out).normalize();
        if local_dir.z <= 0.0 {
            return CameraWePdf {
                pdf_pos: 1.0 / self.area_lens,
                pdf_dir: 0.0,
            };
        }
        let cos_theta = local_dir.z;
        CameraWePdf {
            pdf_pos: 1.0 / self.area_lens,
            pdf_dir: self.focal_distance * self.focal_distance
                / (self.area_focal_film * cos_theta * cos_theta * cos_theta),
        }
    }

    pub fn sample_wi(&self, ref_p: Point3f, u: Point2f) -> Option<CameraWiSample> {
        let local_ref = self.to_local_point(ref_p);
        let disk = sample_uniform_disk_concentric(u);
        let lens_pos = Vector3f::new(
            self.lens_radius * disk.x,
            self.lens_radius * disk.y,
            0.0,
        );
        let local_dir = (local_ref - lens_pos).normalize();
        if local_dir.z <= 0.0 {
            return None;
        }
        let pos_on_cam = self.to_world_point(lens_pos);
        let ref_to_pos = pos_on_cam - ref_p;
        let eval = self.eval_we(pos_on_cam, -ref_to_pos);
        if eval.we.is_black() {
            return None;
        }
        let pdf = ref_to_pos.length_squared() / (local_dir.z * self.area_lens);
        Some(CameraWiSample {
            pos: pos_on_cam,
            nor: Normal3f::from(self.dir),
            ref_to_pos,
            we: eval.we,
            pdf,
            film_coord: eval.film_coord,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn test_camera(lens_radius: Float) -> ThinLensCamera {
        ThinLensCamera::new(
            16.0 / 9.0,
            Point3f::new(0.0, -4.0, 1.0),
            Point3f::new(0.0, 0.0, 1.0),
            Vector3f::Z,
            (60.0 as Float).to_radians(),
            lens_radius,
            4.0,
        )
        .unwrap()
    }

    #[test]
    fn eval_we_inverts_sample_we() {
        let cam = test_camera(0.0);
        let coord = Point2f::new(0.3, 0.7);
        let s = cam.sample_we(coord, Point2f::new(0.5, 0.5));
        let e = cam.eval_we(s.pos, s.dir);
        assert_approx_eq!(Float, e.film_coord.x, coord.x, epsilon = 1e-4);
        assert_approx_eq!(Float, e.film_coord.y, coord.y, epsilon = 1e-4);
        assert!(!e.we.is_black());
    }

    #[test]
    fn sample_wi_projects_to_visible_film_point() {
        let cam = test_camera(0.1);
        let p = Point3f::new(0.5, 0.0, 1.0);
        let wi = cam.sample_wi(p, Point2f::new(0.3, 0.6)).unwrap();
        assert!(wi.pdf > 0.0);
        assert!(wi.film_coord.x > 0.0 && wi.film_coord.x < 1.0);
        assert!(wi.film_coord.y > 0.0 && wi.film_coord.y < 1.0);
    }

    #[test]
    fn points_behind_lens_are_rejected() {
        let cam = test_camera(0.1);
        let behind = Point3f::new(0.0, -8.0, 1.0);
        assert!(cam.sample_wi(behind, Point2f::new(0.5, 0.5)).is_none());
    }

    #[test]
    fn invalid_parameters_fail_construction() {
        assert!(ThinLensCamera::new(
            1.0,
            Point3f::ZERO,
            Point3f::new(0.0, 1.0, 0.0),
            Vector3f::Z,
            0.0,
            0.0,
            1.0
        )
        .is_err());
        assert!(ThinLensCamera::new(
            1.0,
            Point3f::ZERO,
            Point3f::new(0.0, 1.0, 0.0),
            Vector3f::new(0.0, 1.0, 0.0),
            1.0,
            0.0,
            1.0
        )
        .is_err());
    }
}
