#[cfg(not(feature = "use-f64"))]
pub type Float = f32;
#[cfg(feature = "use-f64")]
pub type Float = f64;

#[cfg(not(feature = "use-f64"))]
pub use std::f32::consts::PI;
#[cfg(feature = "use-f64")]
pub use std::f64::consts::PI;

pub const INV_PI: Float = 1.0 / PI;
pub const INV_2PI: Float = 1.0 / (2.0 * PI);
pub const INV_4PI: Float = 1.0 / (4.0 * PI);
pub const PI_OVER_2: Float = PI / 2.0;
pub const TWO_PI: Float = 2.0 * PI;

/// Offset applied along rays spawned from surfaces to dodge
/// self-intersection.
pub const EPS: Float = 3e-4;
