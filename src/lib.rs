//! Stochastic discrete-event simulation kernel for eukaryotic DNA replication.
//!
//! Particles diffuse through a nuclear volume and bind pre-replicative
//! origins embedded in 3D chromosome structures; bound origins fire
//! bidirectional replication forks that propagate along the chromosome's
//! base-pair coordinate, passively activating origins they sweep past, until
//! no pre-replicative origin remains.

pub mod behaviors;
pub mod chromosome;
pub mod error;
pub mod observer;
pub mod origin;
pub mod particle;
pub mod simulation;
pub mod vec3;

pub use chromosome::{Chromosome, ChromosomeData, ChromosomeIdx, Contig, Granule};
pub use error::SimError;
pub use observer::{MultiSimulationObserver, SimulationObserver};
pub use origin::{Origin, OriginData, OriginIdx, OriginState};
pub use particle::{Particle, ParticleIdx};
pub use simulation::Simulation;
pub use vec3::Vec3;
