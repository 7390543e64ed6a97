//! Replication origins: state machine, neighbor graph, and the fork
//! collision-time arithmetic that drives replication without requiring a
//! diffusion step for every virtual time increment.
//!
//! Origins live in a single arena (`Vec<Origin>` owned by `Simulation`) and
//! refer to each other through stable `OriginIdx` indices rather than
//! pointers, so the neighbor graph (including the cyclic `leftReplOrigin` /
//! `rightReplOrigin` back-links established on firing) has no lifetime or
//! aliasing hazards.

use crate::chromosome::{Chromosome, ChromosomeIdx};
use crate::error::SimError;
use crate::particle::ParticleIdx;
use crate::vec3::Vec3;

/// Stable index into `Simulation::origins`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OriginIdx(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginState {
    /// Pre-replicative; can still be fired.
    Pre,
    /// Passively replicated; will never fire (terminal).
    Pass,
    /// Replicative in both directions.
    ReplLR,
    /// Replicative towards the left only (right fork already finished).
    ReplL,
    /// Replicative towards the right only (left fork already finished).
    ReplR,
    /// Finished replication (terminal).
    Post,
}

/// Plain data used to construct an [`Origin`]; the shape the (external,
/// out-of-scope) CSV loader is expected to produce.
#[derive(Debug, Clone)]
pub struct OriginData {
    pub id: String,
    pub chromosome_id: String,
    pub pos: u64,
}

impl OriginData {
    pub fn new(id: impl Into<String>, chromosome_id: impl Into<String>, pos: u64) -> Self {
        OriginData { id: id.into(), chromosome_id: chromosome_id.into(), pos }
    }
}

#[derive(Debug, Clone)]
pub struct Origin {
    id: String,
    chromosome_id: String,
    pos: u64,

    state: OriginState,
    firing_time: f64,
    bound_particle: Option<ParticleIdx>,

    chromosome: Option<ChromosomeIdx>,
    chromosome_granule_pos: Option<Vec3>,

    // immediate same-contig neighbors by bp, fixed for the run
    left_origin: Option<OriginIdx>,
    right_origin: Option<OriginIdx>,

    // next still-Pre neighbor in each direction, consumed by passive cascades
    next_left_pass_origin: Option<OriginIdx>,
    next_right_pass_origin: Option<OriginIdx>,

    // nearest currently-replicating origin on each side, set on firing
    left_repl_origin: Option<OriginIdx>,
    right_repl_origin: Option<OriginIdx>,
}

impl Origin {
    pub fn new(data: OriginData) -> Self {
        Origin {
            id: data.id,
            chromosome_id: data.chromosome_id,
            pos: data.pos,
            state: OriginState::Pre,
            firing_time: 0.,
            bound_particle: None,
            chromosome: None,
            chromosome_granule_pos: None,
            left_origin: None,
            right_origin: None,
            next_left_pass_origin: None,
            next_right_pass_origin: None,
            left_repl_origin: None,
            right_repl_origin: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn chromosome_id(&self) -> &str {
        &self.chromosome_id
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn state(&self) -> OriginState {
        self.state
    }

    pub fn firing_time(&self) -> f64 {
        self.firing_time
    }

    pub fn bound_particle(&self) -> Option<ParticleIdx> {
        self.bound_particle
    }

    pub fn set_bound_particle(&mut self, particle: Option<ParticleIdx>) {
        self.bound_particle = particle;
    }

    pub fn chromosome(&self) -> Option<ChromosomeIdx> {
        self.chromosome
    }

    pub fn chromosome_granule_pos(&self) -> Option<Vec3> {
        self.chromosome_granule_pos
    }

    pub fn left_origin(&self) -> Option<OriginIdx> {
        self.left_origin
    }

    pub fn right_origin(&self) -> Option<OriginIdx> {
        self.right_origin
    }

    /// Resolves this origin's chromosome pointer and granule position; called
    /// once during `Simulation` construction.
    pub fn initialize_chromosome(&mut self, idx: ChromosomeIdx, chromosome: &Chromosome) -> Result<(), SimError> {
        self.chromosome = Some(idx);
        self.chromosome_granule_pos = Some(chromosome.find_granule(self.pos)?.pos);
        Ok(())
    }
}

/// Links every origin's immediate same-contig, same-chromosome neighbors and
/// initializes the passive-activation cascade pointers to the same values.
/// Runs once at construction, over the whole arena.
pub(crate) fn link_neighbor_origins(origins: &mut [Origin], chromosomes: &[Chromosome]) -> Result<(), SimError> {
    let n = origins.len();
    for i in 0..n {
        let (chromosome_id, pos, chromosome_idx) = {
            let o = &origins[i];
            (o.chromosome_id.clone(), o.pos, o.chromosome)
        };
        let chromosome_idx = match chromosome_idx {
            Some(idx) => idx,
            None => continue,
        };
        let chromosome = &chromosomes[chromosome_idx.0];

        let mut left_best: Option<(usize, u64)> = None;
        let mut right_best: Option<(usize, u64)> = None;
        for j in 0..n {
            if i == j {
                continue;
            }
            let other = &origins[j];
            if other.chromosome_id != chromosome_id || !chromosome.in_same_contig(other.pos, pos) {
                continue;
            }
            if other.pos < pos && left_best.map_or(true, |(_, p)| other.pos > p) {
                left_best = Some((j, other.pos));
            }
            if other.pos > pos && right_best.map_or(true, |(_, p)| other.pos < p) {
                right_best = Some((j, other.pos));
            }
        }
        origins[i].left_origin = left_best.map(|(j, _)| OriginIdx(j));
        origins[i].right_origin = right_best.map(|(j, _)| OriginIdx(j));
        origins[i].next_left_pass_origin = origins[i].left_origin;
        origins[i].next_right_pass_origin = origins[i].right_origin;
    }
    Ok(())
}

fn find_left_repl_origin(origins: &[Origin], start: Option<OriginIdx>) -> Option<OriginIdx> {
    let mut cur = start;
    while let Some(idx) = cur {
        let o = &origins[idx.0];
        if o.state == OriginState::ReplLR || o.state == OriginState::ReplR {
            return Some(idx);
        }
        cur = o.left_origin;
    }
    None
}

fn find_right_repl_origin(origins: &[Origin], start: Option<OriginIdx>) -> Option<OriginIdx> {
    let mut cur = start;
    while let Some(idx) = cur {
        let o = &origins[idx.0];
        if o.state == OriginState::ReplLR || o.state == OriginState::ReplL {
            return Some(idx);
        }
        cur = o.right_origin;
    }
    None
}

/// Fires the origin at `idx`: transitions `Pre -> ReplLR`, records the firing
/// time, and establishes the (possibly symmetric) `leftReplOrigin` /
/// `rightReplOrigin` links with the nearest currently-replicating neighbor on
/// each side.
pub(crate) fn fire(origins: &mut [Origin], idx: OriginIdx, t_fire: f64) {
    origins[idx.0].firing_time = t_fire;
    origins[idx.0].state = OriginState::ReplLR;

    let left_start = origins[idx.0].left_origin;
    let left_repl = find_left_repl_origin(origins, left_start);
    origins[idx.0].left_repl_origin = left_repl;
    if let Some(left_repl) = left_repl {
        origins[left_repl.0].right_repl_origin = Some(idx);
    }

    let right_start = origins[idx.0].right_origin;
    let right_repl = find_right_repl_origin(origins, right_start);
    origins[idx.0].right_repl_origin = right_repl;
    if let Some(right_repl) = right_repl {
        origins[right_repl.0].left_repl_origin = Some(idx);
    }
}

fn left_collision_time(origins: &[Origin], chromosomes: &[Chromosome], idx: OriginIdx, v_fork: f64) -> Result<f64, SimError> {
    let o = &origins[idx.0];
    match o.left_repl_origin {
        Some(lr) => {
            let l = &origins[lr.0];
            Ok((o.firing_time + l.firing_time + (o.pos as f64 - l.pos as f64) / v_fork) / 2.)
        }
        None => {
            let chromosome = &chromosomes[o.chromosome.expect("origin chromosome initialized").0];
            let contig = chromosome.find_contig(o.pos)?;
            Ok(o.firing_time + (o.pos as f64 - contig.start as f64) / v_fork)
        }
    }
}

fn right_collision_time(origins: &[Origin], chromosomes: &[Chromosome], idx: OriginIdx, v_fork: f64) -> Result<f64, SimError> {
    let o = &origins[idx.0];
    match o.right_repl_origin {
        Some(rr) => {
            let r = &origins[rr.0];
            Ok((o.firing_time + r.firing_time + (r.pos as f64 - o.pos as f64) / v_fork) / 2.)
        }
        None => {
            let chromosome = &chromosomes[o.chromosome.expect("origin chromosome initialized").0];
            let contig = chromosome.find_contig(o.pos)?;
            Ok(o.firing_time + (contig.end as f64 - o.pos as f64) / v_fork)
        }
    }
}

/// Returns the time of the first collision (left or right) for a replicating
/// origin; the legal sides depend on its current state.
pub(crate) fn min_collision_time(origins: &[Origin], chromosomes: &[Chromosome], idx: OriginIdx, v_fork: f64) -> Result<f64, SimError> {
    match origins[idx.0].state {
        OriginState::ReplL => left_collision_time(origins, chromosomes, idx, v_fork),
        OriginState::ReplR => right_collision_time(origins, chromosomes, idx, v_fork),
        OriginState::ReplLR => {
            let l = left_collision_time(origins, chromosomes, idx, v_fork)?;
            let r = right_collision_time(origins, chromosomes, idx, v_fork)?;
            Ok(l.min(r))
        }
        _ => Err(SimError::NotReplicating { id: origins[idx.0].id.clone() }),
    }
}

/// Returns the time of the last collision (left or right) for a replicating
/// origin; the legal sides depend on its current state.
pub(crate) fn max_collision_time(origins: &[Origin], chromosomes: &[Chromosome], idx: OriginIdx, v_fork: f64) -> Result<f64, SimError> {
    match origins[idx.0].state {
        OriginState::ReplL => left_collision_time(origins, chromosomes, idx, v_fork),
        OriginState::ReplR => right_collision_time(origins, chromosomes, idx, v_fork),
        OriginState::ReplLR => {
            let l = left_collision_time(origins, chromosomes, idx, v_fork)?;
            let r = right_collision_time(origins, chromosomes, idx, v_fork)?;
            Ok(l.max(r))
        }
        _ => Err(SimError::NotReplicating { id: origins[idx.0].id.clone() }),
    }
}

/// Advances the left fork of a replicating origin. Returns the number of
/// origins passively activated by the sweep. Never emits a particle release
/// position: the original model's asymmetry is preserved — the bound
/// particle is only ever released to the right (see DESIGN.md).
pub(crate) fn replicate_left(origins: &mut [Origin], chromosomes: &[Chromosome], idx: OriginIdx, t_current: f64, v_fork: f64) -> Result<u32, SimError> {
    let left_collision_time = left_collision_time(origins, chromosomes, idx, v_fork)?;
    let (firing_time, pos, state) = {
        let o = &origins[idx.0];
        (o.firing_time, o.pos as i64, o.state)
    };

    let mut left_pos = pos - ((t_current - firing_time) * v_fork).floor() as i64;
    if left_collision_time <= t_current {
        left_pos = pos - ((left_collision_time - firing_time) * v_fork).floor() as i64;
        origins[idx.0].state = match state {
            OriginState::ReplLR => OriginState::ReplR,
            _ => OriginState::Post,
        };
    }

    let mut n_passivated = 0u32;
    loop {
        let next = origins[idx.0].next_left_pass_origin;
        let next = match next {
            Some(n) => n,
            None => break,
        };
        let (next_pos, next_state) = {
            let o = &origins[next.0];
            (o.pos as i64, o.state)
        };
        if next_pos < left_pos || next_state != OriginState::Pre {
            break;
        }
        let self_firing_time = origins[idx.0].firing_time;
        let self_pos = origins[idx.0].pos as f64;
        origins[next.0].state = OriginState::Pass;
        origins[next.0].firing_time = self_firing_time + (self_pos - next_pos as f64) / v_fork;
        let advance = origins[next.0].left_origin;
        origins[idx.0].next_left_pass_origin = advance;
        n_passivated += 1;
    }
    Ok(n_passivated)
}

/// Advances the right fork of a replicating origin. Returns the number of
/// origins passively activated by the sweep plus, if the right fork
/// collided against an opposing origin, the granule position at which the
/// bound particle should be released.
pub(crate) fn replicate_right(
    origins: &mut [Origin],
    chromosomes: &[Chromosome],
    idx: OriginIdx,
    t_current: f64,
    v_fork: f64,
) -> Result<(u32, Option<Vec3>), SimError> {
    let right_collision_time = right_collision_time(origins, chromosomes, idx, v_fork)?;
    let (firing_time, pos, state, right_repl) = {
        let o = &origins[idx.0];
        (o.firing_time, o.pos as i64, o.state, o.right_repl_origin)
    };

    let mut right_pos = pos + ((t_current - firing_time) * v_fork).floor() as i64;
    let mut release_pos = None;
    if right_collision_time <= t_current {
        right_pos = pos + ((right_collision_time - firing_time) * v_fork).floor() as i64;
        origins[idx.0].state = match state {
            OriginState::ReplLR => OriginState::ReplL,
            _ => OriginState::Post,
        };
        if right_repl.is_some() {
            let chromosome_idx = origins[idx.0].chromosome.expect("origin chromosome initialized");
            let chromosome = &chromosomes[chromosome_idx.0];
            release_pos = Some(chromosome.find_granule(right_pos.max(0) as u64)?.pos);
        }
    }

    let mut n_passivated = 0u32;
    loop {
        let next = origins[idx.0].next_right_pass_origin;
        let next = match next {
            Some(n) => n,
            None => break,
        };
        let (next_pos, next_state) = {
            let o = &origins[next.0];
            (o.pos as i64, o.state)
        };
        if next_pos > right_pos || next_state != OriginState::Pre {
            break;
        }
        let self_firing_time = origins[idx.0].firing_time;
        let self_pos = origins[idx.0].pos as f64;
        origins[next.0].state = OriginState::Pass;
        origins[next.0].firing_time = self_firing_time + (next_pos as f64 - self_pos) / v_fork;
        let advance = origins[next.0].right_origin;
        origins[idx.0].next_right_pass_origin = advance;
        n_passivated += 1;
    }
    Ok((n_passivated, release_pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chromosome::{ChromosomeData, Contig, Granule};

    fn chromosome_with_granules(n: usize) -> Chromosome {
        let granules = (0..n).map(|i| Granule { pos: Vec3::new(i as f64, 0., 0.) }).collect();
        Chromosome::new(ChromosomeData::new("chr1", vec![Contig { start: 0, end: (n as u64) * crate::chromosome::GRANULE_SIZE }], granules)).unwrap()
    }

    fn make_origin(id: &str, pos: u64, chromosome_idx: ChromosomeIdx, chromosome: &Chromosome) -> Origin {
        let mut o = Origin::new(OriginData::new(id, "chr1", pos));
        o.initialize_chromosome(chromosome_idx, chromosome).unwrap();
        o
    }

    #[test]
    fn single_origin_symmetric_collision_with_contig_edges() {
        let chromosomes = vec![chromosome_with_granules(10)];
        let mut origins = vec![make_origin("A", 17500, ChromosomeIdx(0), &chromosomes[0])];
        link_neighbor_origins(&mut origins, &chromosomes).unwrap();

        fire(&mut origins, OriginIdx(0), 0.);
        let v = 100.;
        assert_eq!(left_collision_time(&origins, &chromosomes, OriginIdx(0), v).unwrap(), 175.);
        assert_eq!(right_collision_time(&origins, &chromosomes, OriginIdx(0), v).unwrap(), 175.);

        let (n_pass, _) = replicate_right(&mut origins, &chromosomes, OriginIdx(0), 175., v).unwrap();
        assert_eq!(n_pass, 0);
        assert_eq!(origins[0].state(), OriginState::ReplL);

        replicate_left(&mut origins, &chromosomes, OriginIdx(0), 175., v).unwrap();
        assert_eq!(origins[0].state(), OriginState::Post);
    }

    #[test]
    fn passive_activation_sets_firing_time() {
        let chromosomes = vec![chromosome_with_granules(6)];
        let mut origins = vec![
            make_origin("A", 1000, ChromosomeIdx(0), &chromosomes[0]),
            make_origin("B", 9000, ChromosomeIdx(0), &chromosomes[0]),
        ];
        link_neighbor_origins(&mut origins, &chromosomes).unwrap();

        fire(&mut origins, OriginIdx(0), 0.);
        let v = 100.;
        let (n_pass, _) = replicate_right(&mut origins, &chromosomes, OriginIdx(0), 80., v).unwrap();
        assert_eq!(n_pass, 1);
        assert_eq!(origins[1].state(), OriginState::Pass);
        assert_eq!(origins[1].firing_time(), 80.);
    }

    #[test]
    fn opposing_origins_collide_at_midpoint() {
        let chromosomes = vec![chromosome_with_granules(6)];
        let mut origins = vec![
            make_origin("A", 1000, ChromosomeIdx(0), &chromosomes[0]),
            make_origin("B", 9000, ChromosomeIdx(0), &chromosomes[0]),
        ];
        link_neighbor_origins(&mut origins, &chromosomes).unwrap();

        fire(&mut origins, OriginIdx(0), 0.);
        fire(&mut origins, OriginIdx(1), 20.);

        let v = 100.;
        let t = right_collision_time(&origins, &chromosomes, OriginIdx(0), v).unwrap();
        assert_eq!(t, 50.);

        let (_, release_pos) = replicate_right(&mut origins, &chromosomes, OriginIdx(0), 50., v).unwrap();
        assert_eq!(origins[0].state(), OriginState::ReplL);
        let release_pos = release_pos.expect("right collision releases a particle position");
        assert_eq!(release_pos, Vec3::new(1., 0., 0.)); // granule floor(6000/3500) == 1
    }
}
