use crate::error::{Error, Result};
use crate::float::Float;
use crate::paramset::ParamSet;

/// Settings shared by every renderer: worker pool shape, task
/// granularity and sampler seeding.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Zero means one worker per logical CPU.
    pub worker_count: usize,
    /// Side length of the square pixel tiles handed to workers.
    pub task_grid_size: i32,
    pub spp: usize,
    pub seed: u64,
    pub use_time_seed: bool,
}

impl RendererConfig {
    pub fn from_params(params: &ParamSet) -> Result<RendererConfig> {
        let task_grid_size = params.get_int("task_grid_size", 32) as i32;
        if task_grid_size <= 0 {
            return Err(Error::InvalidValue {
                name: "task_grid_size",
                reason: "must be positive".to_string(),
            });
        }
        let spp = params.get_int("spp", 16);
        if spp <= 0 {
            return Err(Error::InvalidValue {
                name: "spp",
                reason: "must be positive".to_string(),
            });
        }
        Ok(RendererConfig {
            worker_count: params.get_int("worker_count", 0).max(0) as usize,
            task_grid_size,
            spp: spp as usize,
            seed: params.get_int("seed", 42) as u64,
            use_time_seed: params.get_bool("use_time_seed", false),
        })
    }

    pub fn resolved_worker_count(&self) -> usize {
        if self.worker_count == 0 {
            num_cpus::get().max(1)
        } else {
            self.worker_count
        }
    }

    pub fn resolved_seed(&self) -> u64 {
        if self.use_time_seed {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(self.seed)
        } else {
            self.seed
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            worker_count: 0,
            task_grid_size: 32,
            spp: 16,
            seed: 42,
            use_time_seed: false,
        }
    }
}

/// Depth and Russian-roulette settings for the unidirectional path
/// tracers.
#[derive(Debug, Copy, Clone)]
pub struct PathTracingParams {
    /// Depth before Russian roulette may terminate a path.
    pub min_depth: usize,
    pub max_depth: usize,
    /// Continuation probability once roulette is active.
    pub cont_prob: Float,
}

impl PathTracingParams {
    pub fn from_params(params: &ParamSet) -> Result<PathTracingParams> {
        let min_depth = params.get_int("min_depth", 5);
        let max_depth = params.get_int("max_depth", 10);
        let cont_prob = params.get_float("cont_prob", 0.9);
        if min_depth < 1 {
            return Err(Error::InvalidValue {
                name: "min_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        if max_depth < min_depth {
            return Err(Error::InvalidValue {
                name: "max_depth",
                reason: "must be at least min_depth".to_string(),
            });
        }
        if cont_prob <= 0.0 || cont_prob > 1.0 {
            return Err(Error::InvalidValue {
                name: "cont_prob",
                reason: "must lie in (0, 1]".to_string(),
            });
        }
        Ok(PathTracingParams {
            min_depth: min_depth as usize,
            max_depth: max_depth as usize,
            cont_prob,
        })
    }
}

impl Default for PathTracingParams {
    fn default() -> Self {
        PathTracingParams {
            min_depth: 5,
            max_depth: 10,
            cont_prob: 0.9,
        }
    }
}

/// Subpath length limits for the bidirectional tracer.
#[derive(Debug, Copy, Clone)]
pub struct BdptParams {
    pub max_camera_vertices: usize,
    pub max_light_vertices: usize,
}

impl BdptParams {
    pub fn from_params(params: &ParamSet) -> Result<BdptParams> {
        let cam = params.get_int("max_camera_vertices", 8);
        let lht = params.get_int("max_light_vertices", 8);
        if cam < 2 {
            return Err(Error::InvalidValue {
                name: "max_camera_vertices",
                reason: "must be at least 2".to_string(),
            });
        }
        if lht < 1 {
            return Err(Error::InvalidValue {
                name: "max_light_vertices",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(BdptParams {
            max_camera_vertices: cam as usize,
            max_light_vertices: lht as usize,
        })
    }
}

impl Default for BdptParams {
    fn default() -> Self {
        BdptParams {
            max_camera_vertices: 8,
            max_light_vertices: 8,
        }
    }
}

/// Settings for the light-to-camera particle tracer. The forward pass
/// traces `particle_task_count * particles_per_task` light paths; the
/// backward pass fills the non-splat channels with a plain camera walk.
#[derive(Debug, Copy, Clone)]
pub struct ParticleParams {
    pub walk: PathTracingParams,
    pub particle_task_count: usize,
    pub particles_per_task: usize,
}

impl ParticleParams {
    pub fn from_params(params: &ParamSet) -> Result<ParticleParams> {
        let walk = PathTracingParams::from_params(params)?;
        let tasks = params.get_int("particle_task_count", 128);
        let per_task = params.get_int("particles_per_task", 1000);
        if tasks < 1 || per_task < 1 {
            return Err(Error::InvalidValue {
                name: "particle_task_count",
                reason: "task and particle counts must be positive".to_string(),
            });
        }
        Ok(ParticleParams {
            walk,
            particle_task_count: tasks as usize,
            particles_per_task: per_task as usize,
        })
    }
}

impl Default for ParticleParams {
    fn default() -> Self {
        ParticleParams {
            walk: PathTracingParams::default(),
            particle_task_count: 128,
            particles_per_task: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_ordering_is_validated() {
        let p = ParamSet::new().set_int("min_depth", 6).set_int("max_depth", 3);
        assert!(PathTracingParams::from_params(&p).is_err());
    }

    #[test]
    fn continuation_probability_range_is_validated() {
        let p = ParamSet::new().set_float("cont_prob", 0.0);
        assert!(PathTracingParams::from_params(&p).is_err());
        let p = ParamSet::new().set_float("cont_prob", 1.0);
        assert!(PathTracingParams::from_params(&p).is_ok());
    }

    #[test]
    fn defaults_parse_from_empty_params() {
        assert!(RendererConfig::from_params(&ParamSet::new()).is_ok());
        assert!(BdptParams::from_params(&ParamSet::new()).is_ok());
        assert!(ParticleParams::from_params(&ParamSet::new()).is_ok());
    }
}
