//! Particle/origin binding strategy: which pre-replicative origins are
//! "in proximity" of a particle, the order in which origins and particles
//! are considered, and whether an attempt succeeds.

use rand::distributions::Bernoulli;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::origin::OriginIdx;
use crate::particle::ParticleIdx;
use crate::vec3::Vec3;

/// Pure capability set governing particle/origin binding.
pub trait BindingBehavior {
    /// Whether `granule_pos` is within binding range of `particle_pos`.
    fn in_proximity(&self, particle_pos: Vec3, granule_pos: Vec3) -> bool;

    /// Shuffles the order origins are tried in, so no origin is
    /// systematically favored when several are in proximity at once.
    fn shuffle_origins(&mut self, origins: &mut [OriginIdx]);

    /// Shuffles the order particles are processed in each iteration, so no
    /// particle is systematically favored when several compete for the
    /// same origin.
    fn shuffle_particles(&mut self, particles: &mut [ParticleIdx]);

    /// Whether a single attempt to bind succeeds.
    fn check_binding(&mut self) -> bool;
}

/// Chebyshev (L-infinity) proximity test plus a per-attempt Bernoulli trial;
/// shuffling is uniform Fisher-Yates on the same RNG used for binding trials.
pub struct ProbabilisticBindingBehavior {
    d_bind: f64,
    p_bind: Bernoulli,
    rng: StdRng,
}

impl ProbabilisticBindingBehavior {
    pub fn new(d_bind: f64, p_bind: f64) -> Self {
        Self::with_rng(d_bind, p_bind, StdRng::from_entropy())
    }

    pub fn with_seed(d_bind: f64, p_bind: f64, seed: u64) -> Self {
        Self::with_rng(d_bind, p_bind, StdRng::seed_from_u64(seed))
    }

    fn with_rng(d_bind: f64, p_bind: f64, rng: StdRng) -> Self {
        ProbabilisticBindingBehavior { d_bind, p_bind: Bernoulli::new(p_bind), rng }
    }
}

impl BindingBehavior for ProbabilisticBindingBehavior {
    fn in_proximity(&self, particle_pos: Vec3, granule_pos: Vec3) -> bool {
        let d = particle_pos - granule_pos;
        d.x.abs().max(d.y.abs()).max(d.z.abs()) <= self.d_bind
    }

    fn shuffle_origins(&mut self, origins: &mut [OriginIdx]) {
        origins.shuffle(&mut self.rng);
    }

    fn shuffle_particles(&mut self, particles: &mut [ParticleIdx]) {
        particles.shuffle(&mut self.rng);
    }

    fn check_binding(&mut self) -> bool {
        self.rng.sample(self.p_bind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proximity_uses_chebyshev_distance() {
        let b = ProbabilisticBindingBehavior::with_seed(1.0, 0.5, 1);
        assert!(b.in_proximity(Vec3::new(0., 0., 0.), Vec3::new(1.0, 1.0, 0.)));
        assert!(!b.in_proximity(Vec3::new(0., 0., 0.), Vec3::new(1.1, 0., 0.)));
    }

    #[test]
    fn shuffle_preserves_elements() {
        let mut b = ProbabilisticBindingBehavior::with_seed(1.0, 0.5, 9);
        let mut origins = [OriginIdx(0), OriginIdx(1), OriginIdx(2), OriginIdx(3)];
        b.shuffle_origins(&mut origins);
        let mut sorted = origins;
        sorted.sort_by_key(|idx| idx.0);
        assert_eq!(sorted, [OriginIdx(0), OriginIdx(1), OriginIdx(2), OriginIdx(3)]);
    }

    #[test]
    fn certainty_always_binds() {
        let mut b = ProbabilisticBindingBehavior::with_seed(1.0, 1.0, 4);
        for _ in 0..50 {
            assert!(b.check_binding());
        }
    }
}
