//! Fatal error conditions raised by the simulation kernel.
//!
//! All variants are fatal: the kernel does not retry and has no local
//! recovery path. A batch driver running many replicates externally treats
//! a worker returning `Err` as a failed replicate and may reassign it.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("position {pos} does not belong to any contig")]
    NoContigForPosition { pos: u64 },

    #[error("position {pos} does not belong to any granule")]
    NoGranuleForPosition { pos: u64 },

    #[error("origin {id} is not in a replicative state")]
    NotReplicating { id: String },

    #[error("reflection expansion produced no new in-domain candidate; check that granule positions lie within the diffusion domain")]
    ReflectionImpossible,

    #[error("duplicate chromosome id: {id}")]
    DuplicateChromosomeId { id: String },

    #[error("duplicate origin id: {id}")]
    DuplicateOriginId { id: String },

    #[error("origin {origin_id} references unknown chromosome {chromosome_id}")]
    UnknownChromosome { origin_id: String, chromosome_id: String },

    #[error("chromosome {id} has invalid contigs: {reason}")]
    InvalidContigs { id: String, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
