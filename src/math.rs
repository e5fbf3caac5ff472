use crate::float::Float;

pub fn sqr(x: Float) -> Float {
    x * x
}

pub fn lerp(t: Float, a: Float, b: Float) -> Float {
    (1.0 - t) * a + t * b
}

pub fn safe_sqrt(x: Float) -> Float {
    x.max(0.0).sqrt()
}

pub fn safe_acos(x: Float) -> Float {
    x.clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(0.0, 2.0, 8.0), 2.0);
        assert_eq!(lerp(1.0, 2.0, 8.0), 8.0);
        assert_eq!(lerp(0.5, 2.0, 8.0), 5.0);
    }

    #[test]
    fn safe_sqrt_clamps_negative() {
        assert_eq!(safe_sqrt(-1e-6), 0.0);
        assert_eq!(safe_sqrt(4.0), 2.0);
    }
}
