use crate::error::{Error, Result};
use crate::float::Float;
use crate::math::sqr;
use crate::paramset::ParamSet;
use crate::vecmath::Point2f;

pub trait FilterI {
    fn radius(&self) -> Float;

    /// Reconstruction weight at offset `p` from the sample position.
    fn evaluate(&self, p: Point2f) -> Float;
}

#[derive(Debug, Clone)]
pub enum Filter {
    Box(BoxFilter),
    Gaussian(GaussianFilter),
}

impl Filter {
    pub fn create(name: &str, params: &ParamSet) -> Result<Filter> {
        match name {
            "box" => {
                let radius = params.get_float("radius", 0.5);
                if radius <= 0.0 {
                    return Err(Error::InvalidValue {
                        name: "radius",
                        reason: "must be positive".to_string(),
                    });
                }
                Ok(Filter::Box(BoxFilter { radius }))
            }
            "gaussian" => {
                let radius = params.get_float("radius", 1.5);
                let sigma = params.get_float("sigma", 0.5);
                if radius <= 0.0 || sigma <= 0.0 {
                    return Err(Error::InvalidValue {
                        name: "radius",
                        reason: "radius and sigma must be positive".to_string(),
                    });
                }
                Ok(Filter::Gaussian(GaussianFilter::new(radius, sigma)))
            }
            _ => Err(Error::UnknownType {
                kind: "filter",
                name: name.to_string(),
            }),
        }
    }
}

impl FilterI for Filter {
    fn radius(&self) -> Float {
        match self {
            Filter::Box(f) => f.radius(),
            Filter::Gaussian(f) => f.radius(),
        }
    }

    fn evaluate(&self, p: Point2f) -> Float {
        match self {
            Filter::Box(f) => f.evaluate(p),
            Filter::Gaussian(f) => f.evaluate(p),
        }
    }
}

/// Equal weight over a square support. With radius 0.5 no sample
/// crosses a pixel boundary, which is what makes renders reproducible
/// across task merge orders.
#[derive(Debug, Clone)]
pub struct BoxFilter {
    pub radius: Float,
}

impl FilterI for BoxFilter {
    fn radius(&self) -> Float {
        self.radius
    }

    fn evaluate(&self, p: Point2f) -> Float {
        if p.x.abs() <= self.radius && p.y.abs() <= self.radius {
            1.0
        } else {
            0.0
        }
    }
}

/// Truncated Gaussian, offset so the weight falls to zero exactly at
/// the support boundary.
#[derive(Debug, Clone)]
pub struct GaussianFilter {
    radius: Float,
    sigma: Float,
    edge: Float,
}

impl GaussianFilter {
    pub fn new(radius: Float, sigma: Float) -> GaussianFilter {
        GaussianFilter {
            radius,
            sigma,
            edge: gaussian(radius, sigma),
        }
    }
}

fn gaussian(x: Float, sigma: Float) -> Float {
    (-sqr(x) / (2.0 * sqr(sigma))).exp()
}

impl FilterI for GaussianFilter {
    fn radius(&self) -> Float {
        self.radius
    }

    fn evaluate(&self, p: Point2f) -> Float {
        let gx = (gaussian(p.x, self.sigma) - self.edge).max(0.0);
        let gy = (gaussian(p.y, self.sigma) - self.edge).max(0.0);
        gx * gy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn box_filter_is_flat_inside_support() {
        let f = BoxFilter { radius: 0.5 };
        assert_eq!(f.evaluate(Point2f::new(0.2, -0.4)), 1.0);
        assert_eq!(f.evaluate(Point2f::new(0.6, 0.0)), 0.0);
    }

    #[test]
    fn gaussian_vanishes_at_support_edge() {
        let f = GaussianFilter::new(1.5, 0.5);
        assert_approx_eq!(Float, f.evaluate(Point2f::new(1.5, 0.0)), 0.0, epsilon = 1e-6);
        assert!(f.evaluate(Point2f::ZERO) > 0.0);
    }

    #[test]
    fn factory_validates_radius() {
        assert!(Filter::create("box", &ParamSet::new().set_float("radius", -1.0)).is_err());
        assert!(Filter::create("box", &ParamSet::new()).is_ok());
    }
}
