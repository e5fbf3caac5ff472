//! Multithreaded tile renderers. A renderer owns the worker pool and
//! the progress/cancellation plumbing; the per-sample work is delegated
//! to an [`Integrator`](crate::render::Integrator) or to the particle
//! tracer.

pub mod particle;
pub mod perpixel;
pub mod tiles;

use std::sync::atomic::AtomicBool;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::film::{Film, RenderTarget};
use crate::options::{ParticleParams, RendererConfig};
use crate::paramset::ParamSet;
use crate::render::Integrator;
use crate::reporter::Reporter;
use crate::scene::Scene;

pub use particle::ParticleRenderer;
pub use perpixel::PerPixelRenderer;

pub trait RendererI {
    /// Consumes `film`, runs until finished or `cancel` is raised, and
    /// develops the final images. Cancellation develops whatever was
    /// merged so far; the render fails only when every task failed.
    /// Individual task panics are tolerated.
    fn render(
        &self,
        scene: &Scene,
        film: Film,
        reporter: &mut Reporter,
        cancel: &AtomicBool,
    ) -> Result<RenderTarget>;
}

pub enum Renderer {
    PerPixel(PerPixelRenderer),
    Particle(ParticleRenderer),
}

impl Renderer {
    pub fn create(name: &str, params: &ParamSet) -> Result<Renderer> {
        match name {
            "native" | "pt" | "mis" | "bdpt" => {
                let config = RendererConfig::from_params(params)?;
                let integrator = Integrator::create(name, params)?;
                Ok(Renderer::PerPixel(PerPixelRenderer::new(config, integrator)))
            }
            "particle" => {
                let config = RendererConfig::from_params(params)?;
                let particle = ParticleParams::from_params(params)?;
                Ok(Renderer::Particle(ParticleRenderer::new(config, particle)))
            }
            _ => Err(Error::UnknownType {
                kind: "renderer",
                name: name.to_string(),
            }),
        }
    }
}

impl RendererI for Renderer {
    fn render(
        &self,
        scene: &Scene,
        film: Film,
        reporter: &mut Reporter,
        cancel: &AtomicBool,
    ) -> Result<RenderTarget> {
        match self {
            Renderer::PerPixel(r) => r.render(scene, film, reporter, cancel),
            Renderer::Particle(r) => r.render(scene, film, reporter, cancel),
        }
    }
}

/// A panicking task can poison a shared lock; rendering carries on with
/// whatever the buffer holds.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_renderer_name_is_rejected() {
        assert!(Renderer::create("radiosity", &ParamSet::new()).is_err());
    }

    #[test]
    fn known_renderer_names_construct() {
        for name in ["native", "pt", "mis", "bdpt", "particle"] {
            assert!(Renderer::create(name, &ParamSet::new()).is_ok(), "{}", name);
        }
    }
}
