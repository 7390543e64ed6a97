//! The event loop: ties chromosomes, origins, and particles together with
//! a set of strategy behaviors and drives the stochastic simulation to
//! completion.
//!
//! This implements the general multi-particle path throughout; the
//! single-mobile-particle fast path is a pure performance optimization
//! that is behaviorally subsumed by shuffling a one-element order, so it
//! is not duplicated here (see DESIGN.md).

use log::{debug, trace};

use crate::behaviors::{ActivationBehavior, BindingBehavior, DiffusionBehavior};
use crate::chromosome::{Chromosome, ChromosomeIdx};
use crate::error::SimError;
use crate::observer::SimulationObserver;
use crate::origin::{self, Origin, OriginData, OriginIdx, OriginState};
use crate::particle::{Particle, ParticleIdx};
use crate::vec3::Vec3;

/// Owns the full simulation state (chromosomes, origins, particles) plus
/// the pluggable behaviors and observers that drive it. Built once per
/// replicate; `run()` consumes virtual time until no pre-replicative
/// origin remains and every fork has finished.
pub struct Simulation {
    chromosomes: Vec<Chromosome>,
    origins: Vec<Origin>,
    particles: Vec<Particle>,

    v_fork: f64,
    t_current: f64,

    diffusion: Option<Box<dyn DiffusionBehavior>>,
    activation: Option<Box<dyn ActivationBehavior>>,
    binding: Option<Box<dyn BindingBehavior>>,

    observers: Vec<Box<dyn SimulationObserver>>,
}

impl Simulation {
    /// Builds the chromosome/origin arena: resolves each origin's
    /// chromosome by matching `chromosome_id` against `Chromosome::id`,
    /// initializes its granule pointer, and links the same-contig neighbor
    /// graph. `v_fork` is the fork propagation speed (bp/s), shared by
    /// every origin.
    pub fn new(chromosomes: Vec<Chromosome>, origin_data: Vec<OriginData>, v_fork: f64) -> Result<Self, SimError> {
        let mut seen_chromosome_ids = std::collections::HashSet::new();
        for c in &chromosomes {
            if !seen_chromosome_ids.insert(c.id().to_string()) {
                return Err(SimError::DuplicateChromosomeId { id: c.id().to_string() });
            }
        }

        let mut seen_origin_ids = std::collections::HashSet::new();
        let mut origins = Vec::with_capacity(origin_data.len());
        for data in origin_data {
            if !seen_origin_ids.insert(data.id.clone()) {
                return Err(SimError::DuplicateOriginId { id: data.id });
            }
            let chromosome_idx = chromosomes
                .iter()
                .position(|c| c.id() == data.chromosome_id)
                .map(ChromosomeIdx)
                .ok_or_else(|| SimError::UnknownChromosome {
                    origin_id: data.id.clone(),
                    chromosome_id: data.chromosome_id.clone(),
                })?;
            let mut o = Origin::new(data);
            o.initialize_chromosome(chromosome_idx, &chromosomes[chromosome_idx.0])?;
            origins.push(o);
        }
        origin::link_neighbor_origins(&mut origins, &chromosomes)?;

        Ok(Simulation {
            chromosomes,
            origins,
            particles: Vec::new(),
            v_fork,
            t_current: 0.,
            diffusion: None,
            activation: None,
            binding: None,
            observers: Vec::new(),
        })
    }

    pub fn set_diffusion_behavior(&mut self, behavior: Box<dyn DiffusionBehavior>) {
        self.diffusion = Some(behavior);
    }

    pub fn set_activation_behavior(&mut self, behavior: Box<dyn ActivationBehavior>) {
        self.activation = Some(behavior);
    }

    pub fn set_binding_behavior(&mut self, behavior: Box<dyn BindingBehavior>) {
        self.binding = Some(behavior);
    }

    pub fn register_observer(&mut self, observer: Box<dyn SimulationObserver>) {
        self.observers.push(observer);
    }

    pub fn clear_observers(&mut self) {
        self.observers.clear();
    }

    /// Populates the particle pool: `n` particles at random in-domain
    /// positions, each starting active per `is_active_initially`.
    pub fn initialize_particles(&mut self, n: usize) -> Result<(), SimError> {
        if self.diffusion.is_none() || self.activation.is_none() {
            return Err(SimError::InvalidInput(
                "diffusion and activation behaviors must be set before initializing particles".to_string(),
            ));
        }
        self.particles.clear();
        for _ in 0..n {
            let pos = self.diffusion.as_mut().expect("checked above").random_position();
            let active = self.activation.as_mut().expect("checked above").is_active_initially();
            self.particles.push(Particle::new(active, pos));
        }
        Ok(())
    }

    pub fn t_current(&self) -> f64 {
        self.t_current
    }

    pub fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    pub fn origins(&self) -> &[Origin] {
        &self.origins
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    fn any_pre_replicative(&self) -> bool {
        self.origins.iter().any(|o| o.state() == OriginState::Pre)
    }

    /// Fires the origin at `idx`: transitions it to `ReplLR` and links the
    /// replicating neighbor graph. Exposed directly (in addition to being
    /// reachable through `run`) so tests and external drivers can seed a
    /// known state.
    pub fn fire_origin(&mut self, idx: OriginIdx, t_fire: f64) -> Result<(), SimError> {
        origin::fire(&mut self.origins, idx, t_fire);
        debug!("origin {} fired at t={}", self.origins[idx.0].id(), t_fire);
        self.notify_origin_fired(idx, t_fire);
        Ok(())
    }

    fn notify_origin_fired(&mut self, idx: OriginIdx, t_fire: f64) {
        let mut observers = std::mem::take(&mut self.observers);
        for observer in &mut observers {
            observer.on_origin_fired(self, idx, t_fire);
        }
        self.observers = observers;
    }

    fn notify_origin_replicated(&mut self, idx: OriginIdx, t: f64) {
        debug!("origin {} replicated through t={}", self.origins[idx.0].id(), t);
        let mut observers = std::mem::take(&mut self.observers);
        for observer in &mut observers {
            observer.on_origin_replicated(self, idx, t);
        }
        self.observers = observers;
    }

    fn notify_particle_diffused(&mut self, particle: ParticleIdx, from: Vec3, to: Vec3) {
        trace!("particle {} diffused {:?} -> {:?}", particle.0, from, to);
        let mut observers = std::mem::take(&mut self.observers);
        for observer in &mut observers {
            observer.on_particle_diffused(self, particle, from, to);
        }
        self.observers = observers;
    }

    fn notify_particle_activation_changed(&mut self, particle: ParticleIdx, active: bool) {
        trace!("particle {} activation -> {}", particle.0, active);
        let mut observers = std::mem::take(&mut self.observers);
        for observer in &mut observers {
            observer.on_particle_activation_changed(self, particle, active);
        }
        self.observers = observers;
    }

    fn notify_particle_binding_changed(&mut self, particle: ParticleIdx, origin: Option<OriginIdx>) {
        trace!("particle {} binding -> {:?}", particle.0, origin.map(|o| o.0));
        let mut observers = std::mem::take(&mut self.observers);
        for observer in &mut observers {
            observer.on_particle_binding_changed(self, particle, origin);
        }
        self.observers = observers;
    }

    fn notify_iteration_completed(&mut self) {
        trace!("iteration completed at t={}", self.t_current);
        let mut observers = std::mem::take(&mut self.observers);
        for observer in &mut observers {
            observer.on_iteration_completed(self);
        }
        self.observers = observers;
    }

    fn notify_simulation_started(&mut self) {
        debug!("simulation started with {} origins, {} particles", self.origins.len(), self.particles.len());
        let mut observers = std::mem::take(&mut self.observers);
        for observer in &mut observers {
            observer.on_simulation_started(self);
        }
        self.observers = observers;
    }

    fn replicating_origins(&self) -> Vec<OriginIdx> {
        self.origins
            .iter()
            .enumerate()
            .filter(|(_, o)| matches!(o.state(), OriginState::ReplLR | OriginState::ReplL | OriginState::ReplR))
            .map(|(i, _)| OriginIdx(i))
            .collect()
    }

    /// Earliest next fork collision across all replicating origins; used
    /// by the time-skip optimization when no particle is mobile but
    /// pre-replicative origins remain (so binding may yet resume once a
    /// particle is released).
    fn next_collision(&self) -> Result<Option<(OriginIdx, f64)>, SimError> {
        let mut best: Option<(OriginIdx, f64)> = None;
        for idx in self.replicating_origins() {
            let t = origin::min_collision_time(&self.origins, &self.chromosomes, idx, self.v_fork)?;
            if best.map_or(true, |(_, bt)| t < bt) {
                best = Some((idx, t));
            }
        }
        Ok(best)
    }

    /// Advances the fork(s) of a replicating origin up to `t`, releasing
    /// any particle whose origin's right fork just completed a collision.
    /// Notifies `OriginReplicated` only if the origin's state actually
    /// changed (a pure passive-activation sweep with no completed
    /// collision does not count as a replication event).
    fn advance_origin(&mut self, idx: OriginIdx, t: f64) -> Result<(), SimError> {
        let state_before = self.origins[idx.0].state();
        if matches!(state_before, OriginState::ReplLR | OriginState::ReplL) {
            origin::replicate_left(&mut self.origins, &self.chromosomes, idx, t, self.v_fork)?;
        }
        let state_after_left = self.origins[idx.0].state();
        if matches!(state_after_left, OriginState::ReplLR | OriginState::ReplR) {
            let (_, release_pos) = origin::replicate_right(&mut self.origins, &self.chromosomes, idx, t, self.v_fork)?;
            if let Some(pos) = release_pos {
                if let Some(bound) = self.origins[idx.0].bound_particle() {
                    self.particles[bound.0].set_pos(pos);
                    self.particles[bound.0].set_bound_origin(None);
                    self.origins[idx.0].set_bound_particle(None);
                    self.notify_particle_binding_changed(bound, None);
                }
            }
        }
        if self.origins[idx.0].state() != state_before {
            self.notify_origin_replicated(idx, t);
        }
        Ok(())
    }

    /// Diffuses an unbound particle, updates its activation state, and (if
    /// active) attempts to bind a pre-replicative origin in proximity.
    fn step_particle(&mut self, idx: ParticleIdx) -> Result<(), SimError> {
        let from = self.particles[idx.0].pos();
        let mut to = self.diffusion.as_mut().expect("diffusion behavior set").diffuse(from);
        if !self.diffusion.as_ref().expect("diffusion behavior set").in_domain(to) {
            to = self.diffusion.as_mut().expect("diffusion behavior set").reflect(to)?;
        }
        self.particles[idx.0].set_pos(to);
        self.notify_particle_diffused(idx, from, to);

        if !self.particles[idx.0].is_active() {
            let in_spb = self.diffusion.as_ref().expect("diffusion behavior set").in_spb(to);
            if in_spb && self.activation.as_mut().expect("activation behavior set").check_spb_activation() {
                self.particles[idx.0].set_active(true);
                self.notify_particle_activation_changed(idx, true);
            }
        } else if self.diffusion.as_ref().expect("diffusion behavior set").in_periphery(to) {
            if self.activation.as_mut().expect("activation behavior set").check_periphery_inactivation() {
                self.particles[idx.0].set_active(false);
                self.particles[idx.0].clear_pre_origins_in_proximity();
                self.notify_particle_activation_changed(idx, false);
                return Ok(());
            }
        }

        if !self.particles[idx.0].is_active() {
            return Ok(());
        }

        self.try_bind_particle(idx)
    }

    /// Rescans proximity (the full candidate set, independent of the
    /// previous iteration's set), then attempts binding in shuffled order,
    /// skipping any candidate that was already in proximity (and thus
    /// already tried) last iteration.
    fn try_bind_particle(&mut self, idx: ParticleIdx) -> Result<(), SimError> {
        self.particles[idx.0].clear_pre_origins_in_proximity();
        let previous = self.particles[idx.0].previous_pre_origins_in_proximity().to_vec();
        let pos = self.particles[idx.0].pos();

        let binding = self.binding.as_ref().expect("binding behavior set");
        let mut candidates: Vec<OriginIdx> = self
            .origins
            .iter()
            .enumerate()
            .filter(|(_, o)| o.state() == OriginState::Pre && o.chromosome_granule_pos().map_or(false, |p| binding.in_proximity(pos, p)))
            .map(|(i, _)| OriginIdx(i))
            .collect();

        for c in &candidates {
            self.particles[idx.0].add_pre_origin_in_proximity(*c);
        }

        self.binding.as_mut().expect("binding behavior set").shuffle_origins(&mut candidates);

        for candidate in candidates {
            if previous.contains(&candidate) {
                continue;
            }
            if self.origins[candidate.0].state() != OriginState::Pre {
                continue;
            }
            let binds = self.binding.as_mut().expect("binding behavior set").check_binding();
            if binds {
                self.particles[idx.0].set_bound_origin(Some(candidate));
                self.origins[candidate.0].set_bound_particle(Some(idx));
                self.notify_particle_binding_changed(idx, Some(candidate));
                self.fire_origin(candidate, self.t_current)?;
                break;
            }
        }
        Ok(())
    }

    /// Runs exactly one iteration of the main loop (time step, diffusion,
    /// activation, binding, fork progression) or, if no particle is
    /// mobile, the time-skip jump straight to the next fork collision.
    /// Returns `true` if at least one pre-replicative origin remains
    /// afterwards (i.e. the caller should keep stepping). Public so tests
    /// and external drivers can observe intermediate state; `run` is
    /// simply a loop over this followed by the termination phase.
    pub fn step(&mut self) -> Result<bool, SimError> {
        if self.diffusion.is_none() || self.activation.is_none() || self.binding.is_none() {
            return Err(SimError::InvalidInput(
                "diffusion, activation, and binding behaviors must all be set before step()".to_string(),
            ));
        }

        let any_mobile = self.particles.iter().any(|p| p.bound_origin().is_none());

        if !any_mobile {
            return match self.next_collision()? {
                Some((idx, t)) => {
                    self.t_current = t;
                    self.advance_origin(idx, t)?;
                    self.notify_iteration_completed();
                    Ok(self.any_pre_replicative())
                }
                // Nothing mobile and nothing left to collide: no further
                // progress is possible (e.g. zero particles).
                None => Ok(false),
            };
        }

        let dt = self.diffusion.as_mut().expect("diffusion behavior set").time_step();
        self.t_current += dt;

        let mut order: Vec<ParticleIdx> = (0..self.particles.len()).map(ParticleIdx).collect();
        self.binding.as_mut().expect("binding behavior set").shuffle_particles(&mut order);
        for idx in order {
            if self.particles[idx.0].bound_origin().is_none() {
                self.step_particle(idx)?;
            }
        }

        for idx in self.replicating_origins() {
            self.advance_origin(idx, self.t_current)?;
        }

        self.notify_iteration_completed();
        Ok(self.any_pre_replicative())
    }

    /// Runs the simulation to completion: repeatedly diffuses, activates,
    /// and binds particles, advancing replication forks, until no
    /// pre-replicative origin remains and every fork has finished.
    pub fn run(&mut self) -> Result<(), SimError> {
        if self.diffusion.is_none() || self.activation.is_none() || self.binding.is_none() {
            return Err(SimError::InvalidInput(
                "diffusion, activation, and binding behaviors must all be set before run()".to_string(),
            ));
        }
        self.notify_simulation_started();

        while self.any_pre_replicative() {
            if !self.step()? {
                break;
            }
        }

        let mut remaining = self.replicating_origins();
        let mut max_times = Vec::with_capacity(remaining.len());
        for idx in &remaining {
            max_times.push(origin::max_collision_time(&self.origins, &self.chromosomes, *idx, self.v_fork)?);
        }
        let mut order: Vec<usize> = (0..remaining.len()).collect();
        order.sort_by(|&a, &b| max_times[a].partial_cmp(&max_times[b]).unwrap());
        remaining = order.into_iter().map(|i| remaining[i]).collect();

        for idx in remaining {
            let t = origin::max_collision_time(&self.origins, &self.chromosomes, idx, self.v_fork)?;
            self.t_current = t;
            self.advance_origin(idx, t)?;
        }

        Ok(())
    }
}
