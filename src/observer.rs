//! Read-only lifecycle callbacks fired synchronously by [`crate::simulation::Simulation::run`].
//!
//! Observers never mutate simulation state; they only ever see `&Simulation`
//! views. Each method has a no-op default so an observer can subscribe to
//! just the events it cares about.

use crate::origin::{Origin, OriginIdx};
use crate::particle::ParticleIdx;
use crate::simulation::Simulation;
use crate::vec3::Vec3;

pub trait SimulationObserver {
    fn on_simulation_started(&mut self, _sim: &Simulation) {}

    fn on_iteration_completed(&mut self, _sim: &Simulation) {}

    fn on_particle_diffused(&mut self, _sim: &Simulation, _particle: ParticleIdx, _from: Vec3, _to: Vec3) {}

    fn on_particle_activation_changed(&mut self, _sim: &Simulation, _particle: ParticleIdx, _active: bool) {}

    fn on_particle_binding_changed(&mut self, _sim: &Simulation, _particle: ParticleIdx, _origin: Option<OriginIdx>) {}

    fn on_origin_fired(&mut self, _sim: &Simulation, _origin: OriginIdx, _time: f64) {}

    fn on_origin_replicated(&mut self, _sim: &Simulation, _origin: OriginIdx, _time: f64) {}
}

/// Aggregates, per origin id, the number of times it actively fired across
/// one or more runs and the sum of the firing times — the statistics a
/// batch of replicates needs to compute a mean firing time per origin.
///
/// Passive (cascade) activations never call `on_origin_fired`, so those are
/// excluded from these counts: only origins that actually bind a particle
/// and fire are tallied.
#[derive(Debug, Default)]
pub struct MultiSimulationObserver {
    counts: std::collections::HashMap<String, u32>,
    time_sums: std::collections::HashMap<String, f64>,
}

impl MultiSimulationObserver {
    pub fn new() -> Self {
        MultiSimulationObserver { counts: std::collections::HashMap::new(), time_sums: std::collections::HashMap::new() }
    }

    /// Returns the active-fire count for each of `origins`, in the same
    /// order, defaulting to 0 for an origin that never fired.
    pub fn origin_firing_counts(&self, origins: &[Origin]) -> Vec<u32> {
        origins.iter().map(|o| *self.counts.get(o.id()).unwrap_or(&0)).collect()
    }

    /// Returns the sum of active firing times for each of `origins`, in
    /// the same order, defaulting to 0.0 for an origin that never fired.
    pub fn origin_firing_time_sums(&self, origins: &[Origin]) -> Vec<f64> {
        origins.iter().map(|o| *self.time_sums.get(o.id()).unwrap_or(&0.)).collect()
    }
}

impl SimulationObserver for MultiSimulationObserver {
    fn on_origin_fired(&mut self, sim: &Simulation, origin: OriginIdx, time: f64) {
        let id = sim.origins()[origin.0].id().to_string();
        *self.counts.entry(id.clone()).or_insert(0) += 1;
        *self.time_sums.entry(id).or_insert(0.) += time;
    }
}
