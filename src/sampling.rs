use crate::float::{Float, INV_4PI, INV_PI, PI, PI_OVER_2, TWO_PI};
use crate::math::safe_sqrt;
use crate::vecmath::{Point2f, Vector3f};

pub fn balance_heuristic(nf: Float, f_pdf: Float, ng: Float, g_pdf: Float) -> Float {
    (nf * f_pdf) / (nf * f_pdf + ng * g_pdf)
}

pub fn power_heuristic(nf: Float, f_pdf: Float, ng: Float, g_pdf: Float) -> Float {
    let f = nf * f_pdf;
    let g = ng * g_pdf;
    if f * f == Float::INFINITY {
        return 1.0;
    }
    (f * f) / (f * f + g * g)
}

pub fn sample_uniform_disk_concentric(u: Point2f) -> Point2f {
    let u_offset = 2.0 * u - Point2f::new(1.0, 1.0);
    if u_offset.x == 0.0 && u_offset.y == 0.0 {
        return Point2f::ZERO;
    }
    let (r, theta) = if u_offset.x.abs() > u_offset.y.abs() {
        (u_offset.x, (PI / 4.0) * (u_offset.y / u_offset.x))
    } else {
        (
            u_offset.y,
            PI_OVER_2 - (PI / 4.0) * (u_offset.x / u_offset.y),
        )
    };
    Point2f::new(r * theta.cos(), r * theta.sin())
}

pub fn sample_cosine_hemisphere(u: Point2f) -> Vector3f {
    let d = sample_uniform_disk_concentric(u);
    let z = safe_sqrt(1.0 - d.x * d.x - d.y * d.y);
    Vector3f::new(d.x, d.y, z)
}

pub fn cosine_hemisphere_pdf(cos_theta: Float) -> Float {
    cos_theta * INV_PI
}

pub fn sample_uniform_sphere(u: Point2f) -> Vector3f {
    let z = 1.0 - 2.0 * u.x;
    let r = safe_sqrt(1.0 - z * z);
    let phi = TWO_PI * u.y;
    Vector3f::new(r * phi.cos(), r * phi.sin(), z)
}

pub fn uniform_sphere_pdf() -> Float {
    INV_4PI
}

pub fn sample_uniform_hemisphere(u: Point2f) -> Vector3f {
    let z = u.x;
    let r = safe_sqrt(1.0 - z * z);
    let phi = TWO_PI * u.y;
    Vector3f::new(r * phi.cos(), r * phi.sin(), z)
}

pub fn uniform_hemisphere_pdf() -> Float {
    1.0 / TWO_PI
}

/// Barycentric coordinates of a uniform sample on a triangle.
pub fn sample_uniform_triangle(u: Point2f) -> (Float, Float, Float) {
    let su = u.x.sqrt();
    let b0 = 1.0 - su;
    let b1 = u.y * su;
    (b0, b1, 1.0 - b0 - b1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{IndependentSampler, SamplerI};
    use float_cmp::assert_approx_eq;

    #[test]
    fn balance_weights_sum_to_one() {
        let cases = [(0.7, 0.1), (2.0, 3.5), (1e-3, 10.0)];
        for (pa, pb) in cases {
            let wa = balance_heuristic(1.0, pa, 1.0, pb);
            let wb = balance_heuristic(1.0, pb, 1.0, pa);
            assert_approx_eq!(Float, wa + wb, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn cosine_hemisphere_stays_above_surface() {
        let mut sampler = IndependentSampler::new(7);
        for _ in 0..256 {
            let w = sample_cosine_hemisphere(sampler.get_2d());
            assert!(w.z >= 0.0);
            assert_approx_eq!(Float, w.length(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn uniform_sphere_is_unit_length() {
        let mut sampler = IndependentSampler::new(11);
        for _ in 0..256 {
            let w = sample_uniform_sphere(sampler.get_2d());
            assert_approx_eq!(Float, w.length(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn triangle_barycentrics_are_valid() {
        let mut sampler = IndependentSampler::new(13);
        for _ in 0..256 {
            let (b0, b1, b2) = sample_uniform_triangle(sampler.get_2d());
            assert!(b0 >= 0.0 && b1 >= 0.0 && b2 >= -1e-6);
            assert_approx_eq!(Float, b0 + b1 + b2, 1.0, epsilon = 1e-5);
        }
    }
}
