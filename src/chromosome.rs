//! Chromosomes: contigs (sequenced bp intervals) plus a fixed-step chain of
//! 3D granule positions. Immutable after construction.

use crate::error::SimError;
use crate::vec3::Vec3;

/// Base pairs represented by a single granule.
pub const GRANULE_SIZE: u64 = 3500;

/// Stable index into `Simulation::chromosomes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChromosomeIdx(pub usize);

/// A sequenced region `[start, end]` (inclusive, in base pairs) within which
/// replication is simulated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contig {
    pub start: u64,
    pub end: u64,
}

/// A 3D point representing a `GRANULE_SIZE`-bp stretch of the genome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Granule {
    pub pos: Vec3,
}

/// Plain data used to construct a [`Chromosome`]; the shape the (external,
/// out-of-scope) CSV loader is expected to produce.
#[derive(Debug, Clone)]
pub struct ChromosomeData {
    pub id: String,
    pub contigs: Vec<Contig>,
    pub granules: Vec<Granule>,
}

impl ChromosomeData {
    pub fn new(id: impl Into<String>, contigs: Vec<Contig>, granules: Vec<Granule>) -> Self {
        ChromosomeData { id: id.into(), contigs, granules }
    }
}

#[derive(Debug, Clone)]
pub struct Chromosome {
    data: ChromosomeData,
}

impl Chromosome {
    /// Validates and wraps the supplied data: contigs must be sorted
    /// ascending, pairwise disjoint, and each must satisfy `start <= end`.
    pub fn new(data: ChromosomeData) -> Result<Self, SimError> {
        let mut prev_end: Option<u64> = None;
        for contig in &data.contigs {
            if contig.start > contig.end {
                return Err(SimError::InvalidContigs {
                    id: data.id.clone(),
                    reason: format!("contig start {} > end {}", contig.start, contig.end),
                });
            }
            if let Some(prev_end) = prev_end {
                if contig.start <= prev_end {
                    return Err(SimError::InvalidContigs {
                        id: data.id.clone(),
                        reason: "contigs are not sorted and disjoint".to_string(),
                    });
                }
            }
            prev_end = Some(contig.end);
        }
        Ok(Chromosome { data })
    }

    pub fn id(&self) -> &str {
        &self.data.id
    }

    pub fn contigs(&self) -> &[Contig] {
        &self.data.contigs
    }

    pub fn granules(&self) -> &[Granule] {
        &self.data.granules
    }

    /// Linear scan over the (few) sorted contigs; contigs are typically
    /// dozens per chromosome so this is simpler and faster in practice than
    /// a tree structure.
    pub fn find_contig(&self, pos: u64) -> Result<&Contig, SimError> {
        self.data
            .contigs
            .iter()
            .find(|c| c.start <= pos && pos <= c.end)
            .ok_or(SimError::NoContigForPosition { pos })
    }

    pub fn find_granule(&self, pos: u64) -> Result<&Granule, SimError> {
        let idx = (pos / GRANULE_SIZE) as usize;
        self.data.granules.get(idx).ok_or(SimError::NoGranuleForPosition { pos })
    }

    pub fn in_same_contig(&self, pos1: u64, pos2: u64) -> bool {
        self.data
            .contigs
            .iter()
            .any(|c| c.start <= pos1 && pos1 <= c.end && c.start <= pos2 && pos2 <= c.end)
    }
}
