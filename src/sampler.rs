use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::float::Float;
use crate::paramset::ParamSet;
use crate::vecmath::Point2f;

pub trait SamplerI {
    fn get_1d(&mut self) -> Float;
    fn get_2d(&mut self) -> Point2f;
    fn get_3d(&mut self) -> [Float; 3];
    fn get_5d(&mut self) -> [Float; 5];

    /// Derives a statistically independent stream from this sampler's
    /// base seed and an integer offset. Rendering clones one stream per
    /// task (offset = task index) so a fixed partition replays the same
    /// per-task samples regardless of worker scheduling.
    fn clone_with_seed(&self, offset: u64) -> Sampler;
}

#[derive(Debug, Clone)]
pub enum Sampler {
    Independent(IndependentSampler),
}

impl Sampler {
    pub fn create(name: &str, params: &ParamSet) -> Result<Sampler> {
        match name {
            "independent" | "native" => {
                let seed = params.get_int("seed", 42) as u64;
                Ok(Sampler::Independent(IndependentSampler::new(seed)))
            }
            _ => Err(crate::error::Error::UnknownType {
                kind: "sampler",
                name: name.to_string(),
            }),
        }
    }
}

impl SamplerI for Sampler {
    fn get_1d(&mut self) -> Float {
        match self {
            Sampler::Independent(s) => s.get_1d(),
        }
    }

    fn get_2d(&mut self) -> Point2f {
        match self {
            Sampler::Independent(s) => s.get_2d(),
        }
    }

    fn get_3d(&mut self) -> [Float; 3] {
        match self {
            Sampler::Independent(s) => s.get_3d(),
        }
    }

    fn get_5d(&mut self) -> [Float; 5] {
        match self {
            Sampler::Independent(s) => s.get_5d(),
        }
    }

    fn clone_with_seed(&self, offset: u64) -> Sampler {
        match self {
            Sampler::Independent(s) => s.clone_with_seed(offset),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndependentSampler {
    /// Base seed kept around so derived streams mix from it rather than
    /// from the current rng state.
    seed: u64,
    rng: SmallRng,
}

impl IndependentSampler {
    pub fn new(seed: u64) -> IndependentSampler {
        IndependentSampler {
            seed,
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl SamplerI for IndependentSampler {
    fn get_1d(&mut self) -> Float {
        self.rng.gen()
    }

    fn get_2d(&mut self) -> Point2f {
        Point2f {
            x: self.rng.gen(),
            y: self.rng.gen(),
        }
    }

    fn get_3d(&mut self) -> [Float; 3] {
        [self.rng.gen(), self.rng.gen(), self.rng.gen()]
    }

    fn get_5d(&mut self) -> [Float; 5] {
        [
            self.rng.gen(),
            self.rng.gen(),
            self.rng.gen(),
            self.rng.gen(),
            self.rng.gen(),
        ]
    }

    fn clone_with_seed(&self, offset: u64) -> Sampler {
        // SplitMix64-style mix keeps nearby offsets decorrelated.
        let mixed = self
            .seed
            .wrapping_add(offset.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        Sampler::Independent(IndependentSampler::new(mixed))
    }
}
