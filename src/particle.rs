//! Activation factors ("particles") that diffuse through the nuclear volume
//! and bind pre-replicative origins.

use crate::origin::OriginIdx;
use crate::vec3::Vec3;

/// Stable index into `Simulation::particles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticleIdx(pub usize);

#[derive(Debug, Clone)]
pub struct Particle {
    active: bool,
    pos: Vec3,
    bound_origin: Option<OriginIdx>,
    pre_origins_in_proximity: Vec<OriginIdx>,
    previous_pre_origins_in_proximity: Vec<OriginIdx>,
}

impl Particle {
    pub fn new(active: bool, pos: Vec3) -> Self {
        Particle {
            active,
            pos,
            bound_origin: None,
            pre_origins_in_proximity: Vec::new(),
            previous_pre_origins_in_proximity: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn pos(&self) -> Vec3 {
        self.pos
    }

    pub fn set_pos(&mut self, pos: Vec3) {
        self.pos = pos;
    }

    pub fn bound_origin(&self) -> Option<OriginIdx> {
        self.bound_origin
    }

    pub fn set_bound_origin(&mut self, origin: Option<OriginIdx>) {
        self.bound_origin = origin;
    }

    /// Swaps the current proximity list into `previous` and clears the
    /// current one, so the binding step can suppress immediate re-trials
    /// against origins that were already tried last iteration.
    pub fn clear_pre_origins_in_proximity(&mut self) {
        std::mem::swap(&mut self.pre_origins_in_proximity, &mut self.previous_pre_origins_in_proximity);
        self.pre_origins_in_proximity.clear();
    }

    pub fn add_pre_origin_in_proximity(&mut self, origin: OriginIdx) {
        self.pre_origins_in_proximity.push(origin);
    }

    pub fn pre_origins_in_proximity(&self) -> &[OriginIdx] {
        &self.pre_origins_in_proximity
    }

    pub fn previous_pre_origins_in_proximity(&self) -> &[OriginIdx] {
        &self.previous_pre_origins_in_proximity
    }
}
