//! Scenario-level integration tests exercising the full `Simulation` loop
//! against the concrete examples worked out by hand in the kernel's
//! collision-time arithmetic (single origin, passive activation, and a pair
//! of opposing forks colliding at their bp/time midpoint).

use approx::assert_relative_eq;

use dna_replication_sim::behaviors::{
    IsotropicDiffusionBehavior, ProbabilisticActivationBehavior, ProbabilisticBindingBehavior,
};
use dna_replication_sim::{
    Chromosome, ChromosomeData, Contig, Granule, OriginData, OriginIdx, OriginState, Simulation, Vec3,
};

fn granules(n: usize) -> Vec<Granule> {
    (0..n).map(|i| Granule { pos: Vec3::new(i as f64, 0., 0.) }).collect()
}

fn behaviors(seed: u64) -> (IsotropicDiffusionBehavior, ProbabilisticActivationBehavior, ProbabilisticBindingBehavior) {
    let _ = pretty_env_logger::try_init();
    (
        IsotropicDiffusionBehavior::with_seed(0.05, 0.01, 2., 5., 0.2, 1.8, seed),
        ProbabilisticActivationBehavior::with_seed(1.0, false, true, seed + 1),
        ProbabilisticBindingBehavior::with_seed(10., 1.0, seed + 2),
    )
}

/// Scenario 1: a single origin with no neighbors on a single contig fires
/// once bound and runs to `Post` with both forks completing at the contig
/// edges at the analytically predicted time.
#[test]
fn single_origin_runs_to_completion_at_contig_edges() {
    let chromosome = Chromosome::new(ChromosomeData::new(
        "chr1",
        vec![Contig { start: 0, end: 35000 }],
        granules(10),
    ))
    .unwrap();
    let origins = vec![OriginData::new("A", "chr1", 17500)];
    let mut sim = Simulation::new(vec![chromosome], origins, 100.).unwrap();

    let (diffusion, activation, binding) = behaviors(1);
    sim.set_diffusion_behavior(Box::new(diffusion));
    sim.set_activation_behavior(Box::new(activation));
    sim.set_binding_behavior(Box::new(binding));
    sim.initialize_particles(1).unwrap();

    sim.run().unwrap();

    assert_eq!(sim.origins()[0].state(), OriginState::Post);
    let firing_time = sim.origins()[0].firing_time();
    assert_relative_eq!(sim.t_current(), firing_time + 175., epsilon = 1e-9);
}

/// Scenario 2: an origin fired at t=0 passively activates its one neighbor
/// once its right fork sweeps past it; the passivated origin's firing time
/// equals the time the fork would have reached it.
#[test]
fn passive_activation_sets_neighbor_firing_time() {
    let chromosome = Chromosome::new(ChromosomeData::new(
        "chr1",
        vec![Contig { start: 0, end: 20000 }],
        granules(6),
    ))
    .unwrap();
    let origins = vec![OriginData::new("A", "chr1", 1000), OriginData::new("B", "chr1", 9000)];
    let mut sim = Simulation::new(vec![chromosome], origins, 100.).unwrap();
    sim.fire_origin(OriginIdx(0), 0.).unwrap();

    let (diffusion, activation, binding) = behaviors(10);
    sim.set_diffusion_behavior(Box::new(diffusion));
    sim.set_activation_behavior(Box::new(activation));
    sim.set_binding_behavior(Box::new(binding));
    sim.initialize_particles(0).unwrap();

    sim.run().unwrap();

    assert_eq!(sim.origins()[1].state(), OriginState::Pass);
    assert_relative_eq!(sim.origins()[1].firing_time(), 80., epsilon = 1e-9);
}

/// Scenario 3: two origins fired at different times collide at the
/// bp/time midpoint predicted by the closed-form collision arithmetic, and
/// both reach a terminal state with no pre-replicative origins left.
#[test]
fn opposing_origins_collide_at_predicted_midpoint() {
    let chromosome = Chromosome::new(ChromosomeData::new(
        "chr1",
        vec![Contig { start: 0, end: 20000 }],
        granules(6),
    ))
    .unwrap();
    let origins = vec![OriginData::new("A", "chr1", 1000), OriginData::new("B", "chr1", 9000)];
    let mut sim = Simulation::new(vec![chromosome], origins, 100.).unwrap();
    sim.fire_origin(OriginIdx(0), 0.).unwrap();
    sim.fire_origin(OriginIdx(1), 20.).unwrap();

    let (diffusion, activation, binding) = behaviors(20);
    sim.set_diffusion_behavior(Box::new(diffusion));
    sim.set_activation_behavior(Box::new(activation));
    sim.set_binding_behavior(Box::new(binding));
    sim.initialize_particles(0).unwrap();

    sim.run().unwrap();

    assert_eq!(sim.origins()[0].state(), OriginState::Post);
    assert_eq!(sim.origins()[1].state(), OriginState::Post);
    assert_relative_eq!(sim.t_current(), 50., epsilon = 1e-9);
}

/// Many origins, many particles: every origin must end in `Pass` or `Post`
/// and none left `Pre`, regardless of shuffling order (testable property 1
/// and 8 of the spec).
#[test]
fn many_origins_all_terminate_pass_or_post() {
    let n_origins = 12;
    let spacing = 3000u64;
    let origins: Vec<OriginData> = (0..n_origins)
        .map(|i| OriginData::new(format!("O{i}"), "chr1", 1000 + i as u64 * spacing))
        .collect();
    let chromosome = Chromosome::new(ChromosomeData::new(
        "chr1",
        vec![Contig { start: 0, end: 1000 + n_origins as u64 * spacing + 1000 }],
        granules(20),
    ))
    .unwrap();
    let mut sim = Simulation::new(vec![chromosome], origins, 50.).unwrap();

    let (diffusion, activation, binding) = behaviors(99);
    sim.set_diffusion_behavior(Box::new(diffusion));
    sim.set_activation_behavior(Box::new(activation));
    sim.set_binding_behavior(Box::new(binding));
    sim.initialize_particles(4).unwrap();

    sim.run().unwrap();

    let terminal = sim
        .origins()
        .iter()
        .filter(|o| matches!(o.state(), OriginState::Pass | OriginState::Post))
        .count();
    assert_eq!(terminal, n_origins);
}
