use arrayvec::ArrayVec;

use crate::bxdf::{Bxdf, BxdfFlags, BxdfI, TransportMode};
use crate::float::Float;
use crate::frame::Frame;
use crate::interaction::SurfaceInteraction;
use crate::spectrum::Spectrum;
use crate::vecmath::{Normal3f, Point2f, Vector3f};

pub const MAX_BSDF_LOBES: usize = 8;

/// Result of sampling the aggregate BSDF; `wi` is in world space.
#[derive(Debug, Copy, Clone)]
pub struct BsdfSample {
    pub f: Spectrum,
    pub wi: Vector3f,
    pub pdf: Float,
    pub flags: BxdfFlags,
}

impl BsdfSample {
    pub fn is_specular(&self) -> bool {
        self.flags.is_specular()
    }
}

/// Sum of BxDF lobes bound to one shading point. Instances are
/// arena-allocated by materials and die with the worker's arena.
///
/// Sampling picks a lobe uniformly at random; the aggregate pdf of a
/// non-delta direction is the arithmetic mean of all matching lobes'
/// pdfs, while a sampled delta lobe scales its own discrete pdf by
/// `1/match_count`.
pub struct Bsdf {
    lobes: ArrayVec<Bxdf, MAX_BSDF_LOBES>,
    frame: Frame,
    ng: Normal3f,
}

impl Bsdf {
    pub fn new(si: &SurfaceInteraction) -> Bsdf {
        Bsdf {
            lobes: ArrayVec::new(),
            frame: si.shading_frame(),
            ng: si.n,
        }
    }

    pub fn add(&mut self, lobe: Bxdf) {
        self.lobes.push(lobe);
    }

    /// Drains the lobes; used by composite materials that re-scale and
    /// re-host child lobes.
    pub fn take_lobes(&mut self) -> ArrayVec<Bxdf, MAX_BSDF_LOBES> {
        std::mem::take(&mut self.lobes)
    }

    pub fn flags(&self) -> BxdfFlags {
        self.lobes
            .iter()
            .fold(BxdfFlags::empty(), |acc, l| acc | l.flags())
    }

    /// True when every lobe is a Dirac distribution; such a surface
    /// cannot be connected to by light sampling.
    pub fn is_delta(&self) -> bool {
        !self.lobes.is_empty() && self.lobes.iter().all(|l| l.flags().is_specular())
    }

    pub fn geometric_normal(&self) -> Normal3f {
        self.ng
    }

    pub fn albedo(&self) -> Spectrum {
        self.lobes
            .iter()
            .fold(Spectrum::BLACK, |acc, l| acc + l.albedo())
    }

    pub fn f(
        &self,
        wo_world: &Vector3f,
        wi_world: &Vector3f,
        mode: TransportMode,
        filter: BxdfFlags,
    ) -> Spectrum {
        let wo = self.frame.to_local(wo_world);
        let wi = self.frame.to_local(wi_world);
        if wo.z == 0.0 {
            return Spectrum::BLACK;
        }
        self.lobes
            .iter()
            .filter(|l| l.flags().matches(filter))
            .fold(Spectrum::BLACK, |acc, l| acc + l.f(wo, wi, mode))
    }

    pub fn sample_f(
        &self,
        wo_world: &Vector3f,
        uc: Float,
        u: Point2f,
        mode: TransportMode,
        filter: BxdfFlags,
    ) -> Option<BsdfSample> {
        let wo = self.frame.to_local(wo_world);
        if wo.z == 0.0 {
            return None;
        }
        let matching: ArrayVec<&Bxdf, MAX_BSDF_LOBES> = self
            .lobes
            .iter()
            .filter(|l| l.flags().matches(filter))
            .collect();
        let count = matching.len();
        if count == 0 {
            return None;
        }

        let idx = ((uc * count as Float) as usize).min(count - 1);
        // Remap the selection sample to [0,1) for the chosen lobe.
        let uc_remapped = uc * count as Float - idx as Float;
        let chosen = matching[idx];
        let s = chosen.sample_f(wo, uc_remapped, u, mode)?;
        if s.f.is_black() || s.pdf <= 0.0 {
            return None;
        }

        let (f, pdf) = if s.is_specular() {
            (s.f, s.pdf / count as Float)
        } else {
            let f = matching
                .iter()
                .fold(Spectrum::BLACK, |acc, l| acc + l.f(wo, s.wi, mode));
            let pdf = matching
                .iter()
                .map(|l| l.pdf(wo, s.wi, mode))
                .sum::<Float>()
                / count as Float;
            (f, pdf)
        };
        if pdf <= 0.0 {
            return None;
        }

        Some(BsdfSample {
            f,
            wi: self.frame.from_local(&s.wi),
            pdf,
            flags: s.flags,
        })
    }

    pub fn pdf(
        &self,
        wo_world: &Vector3f,
        wi_world: &Vector3f,
        mode: TransportMode,
        filter: BxdfFlags,
    ) -> Float {
        let wo = self.frame.to_local(wo_world);
        let wi = self.frame.to_local(wi_world);
        if wo.z == 0.0 {
            return 0.0;
        }
        let mut count = 0;
        let mut sum = 0.0;
        for lobe in self.lobes.iter().filter(|l| l.flags().matches(filter)) {
            count += 1;
            sum += lobe.pdf(wo, wi, mode);
        }
        if count == 0 {
            0.0
        } else {
            sum / count as Float
        }
    }
}
