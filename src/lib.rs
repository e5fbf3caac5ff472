pub mod arena;
pub mod bounds;
pub mod bsdf;
pub mod bvh;
pub mod bxdf;
pub mod camera;
pub mod error;
pub mod film;
pub mod filter;
pub mod float;
pub mod frame;
pub mod interaction;
pub mod light;
pub mod material;
pub mod math;
pub mod options;
pub mod paramset;
pub mod ray;
pub mod render;
pub mod renderer;
pub mod reporter;
pub mod sampler;
pub mod sampling;
pub mod scene;
pub mod shape;
pub mod spectrum;
pub mod texture;
pub mod vec2d;
pub mod vecmath;

// For convenience, re-export.
pub use error::{Error, Result};
pub use float::Float;
