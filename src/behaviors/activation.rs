//! Particle activation strategy: whether a particle starts active, whether
//! an inactive particle near the SPB switches on, and whether an active
//! particle at the nuclear periphery switches back off.

use rand::distributions::Bernoulli;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Pure capability set governing the active/inactive state of a particle.
pub trait ActivationBehavior {
    /// Whether a freshly constructed particle starts active.
    fn is_active_initially(&mut self) -> bool;

    /// Whether an inactive particle currently in the SPB switches on this
    /// iteration.
    fn check_spb_activation(&mut self) -> bool;

    /// Whether an active particle currently at the periphery switches off
    /// this iteration.
    fn check_periphery_inactivation(&mut self) -> bool;
}

/// `isActiveInitially = !spbActivationEnabled`; SPB activation is a
/// Bernoulli trial, periphery inactivation a constant flag (deterministic
/// once the particle is actually at the periphery).
pub struct ProbabilisticActivationBehavior {
    spb_activation_enabled: bool,
    periphery_inactivation_enabled: bool,
    p_spb_activation: Bernoulli,
    rng: StdRng,
}

impl ProbabilisticActivationBehavior {
    pub fn new(p_spb_activation: f64, spb_activation_enabled: bool, periphery_inactivation_enabled: bool) -> Self {
        Self::with_rng(p_spb_activation, spb_activation_enabled, periphery_inactivation_enabled, StdRng::from_entropy())
    }

    pub fn with_seed(p_spb_activation: f64, spb_activation_enabled: bool, periphery_inactivation_enabled: bool, seed: u64) -> Self {
        Self::with_rng(p_spb_activation, spb_activation_enabled, periphery_inactivation_enabled, StdRng::seed_from_u64(seed))
    }

    fn with_rng(p_spb_activation: f64, spb_activation_enabled: bool, periphery_inactivation_enabled: bool, rng: StdRng) -> Self {
        ProbabilisticActivationBehavior {
            spb_activation_enabled,
            periphery_inactivation_enabled,
            p_spb_activation: Bernoulli::new(p_spb_activation),
            rng,
        }
    }
}

impl ActivationBehavior for ProbabilisticActivationBehavior {
    fn is_active_initially(&mut self) -> bool {
        !self.spb_activation_enabled
    }

    fn check_spb_activation(&mut self) -> bool {
        self.rng.sample(self.p_spb_activation)
    }

    fn check_periphery_inactivation(&mut self) -> bool {
        self.periphery_inactivation_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spb_disabled_starts_particles_active() {
        let mut b = ProbabilisticActivationBehavior::with_seed(0.5, false, true);
        assert!(b.is_active_initially());
    }

    #[test]
    fn spb_enabled_starts_particles_inactive() {
        let mut b = ProbabilisticActivationBehavior::with_seed(0.5, true, true);
        assert!(!b.is_active_initially());
    }

    #[test]
    fn periphery_inactivation_is_a_constant_flag() {
        let mut on = ProbabilisticActivationBehavior::with_seed(0., true, true);
        let mut off = ProbabilisticActivationBehavior::with_seed(0., true, false);
        for _ in 0..10 {
            assert!(on.check_periphery_inactivation());
            assert!(!off.check_periphery_inactivation());
        }
    }

    #[test]
    fn zero_probability_spb_activation_never_fires() {
        let mut b = ProbabilisticActivationBehavior::with_seed(0., true, true);
        for _ in 0..50 {
            assert!(!b.check_spb_activation());
        }
    }
}
