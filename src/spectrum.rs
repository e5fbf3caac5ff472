use auto_ops::{impl_op_ex, impl_op_ex_commutative};

use crate::float::Float;

/// Tristimulus radiance/throughput value. The whole pipeline works in
/// linear RGB.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Spectrum {
    pub r: Float,
    pub g: Float,
    pub b: Float,
}

impl Spectrum {
    pub const BLACK: Spectrum = Spectrum {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn new(r: Float, g: Float, b: Float) -> Spectrum {
        Spectrum { r, g, b }
    }

    pub fn splat(v: Float) -> Spectrum {
        Spectrum { r: v, g: v, b: v }
    }

    pub fn is_black(&self) -> bool {
        self.r <= 0.0 && self.g <= 0.0 && self.b <= 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite()
    }

    /// Rec. 709 luminance.
    pub fn luminance(&self) -> Float {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }

    pub fn max_component(&self) -> Float {
        self.r.max(self.g).max(self.b)
    }

    pub fn average(&self) -> Float {
        (self.r + self.g + self.b) / 3.0
    }

    pub fn clamp_zero(&self) -> Spectrum {
        Spectrum {
            r: self.r.max(0.0),
            g: self.g.max(0.0),
            b: self.b.max(0.0),
        }
    }

    pub fn lerp(t: Float, a: &Spectrum, b: &Spectrum) -> Spectrum {
        (1.0 - t) * a + t * b
    }
}

impl_op_ex!(+ |a: &Spectrum, b: &Spectrum| -> Spectrum {
    Spectrum::new(a.r + b.r, a.g + b.g, a.b + b.b)
});
impl_op_ex!(-|a: &Spectrum, b: &Spectrum| -> Spectrum {
    Spectrum::new(a.r - b.r, a.g - b.g, a.b - b.b)
});
impl_op_ex!(*|a: &Spectrum, b: &Spectrum| -> Spectrum {
    Spectrum::new(a.r * b.r, a.g * b.g, a.b * b.b)
});
impl_op_ex_commutative!(*|a: &Spectrum, s: Float| -> Spectrum {
    Spectrum::new(a.r * s, a.g * s, a.b * s)
});
impl_op_ex!(/ |a: &Spectrum, s: Float| -> Spectrum {
    Spectrum::new(a.r / s, a.g / s, a.b / s)
});
impl_op_ex!(/ |a: &Spectrum, b: &Spectrum| -> Spectrum {
    Spectrum::new(a.r / b.r, a.g / b.g, a.b / b.b)
});
impl_op_ex!(+= |a: &mut Spectrum, b: &Spectrum| { a.r += b.r; a.g += b.g; a.b += b.b; });
impl_op_ex!(*= |a: &mut Spectrum, b: &Spectrum| { a.r *= b.r; a.g *= b.g; a.b *= b.b; });
impl_op_ex!(*= |a: &mut Spectrum, s: Float| { a.r *= s; a.g *= s; a.b *= s; });
impl_op_ex!(/= |a: &mut Spectrum, s: Float| { a.r /= s; a.g /= s; a.b /= s; });

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn black_detection() {
        assert!(Spectrum::BLACK.is_black());
        assert!(!Spectrum::new(0.0, 0.1, 0.0).is_black());
    }

    #[test]
    fn luminance_of_white_is_one() {
        assert_approx_eq!(Float, Spectrum::splat(1.0).luminance(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn non_finite_detected() {
        assert!(!Spectrum::new(Float::NAN, 0.0, 0.0).is_finite());
        assert!(!Spectrum::new(0.0, Float::INFINITY, 0.0).is_finite());
        assert!(Spectrum::splat(2.0).is_finite());
    }
}
