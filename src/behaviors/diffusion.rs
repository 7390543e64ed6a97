//! Particle diffusion strategy: supplies time steps, random in-domain
//! positions, domain/SPB/periphery predicates, the diffusion step itself,
//! and boundary reflection.

use nalgebra::{Matrix3, Vector3};
use rand::distributions::Exp;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::SimError;
use crate::vec3::Vec3;

/// Pure capability set for particle diffusion; dispatched a handful of
/// times per particle per iteration, so a `dyn` trait object is fine (see
/// DESIGN.md).
pub trait DiffusionBehavior {
    /// The next time step ("delta_t"), in seconds.
    fn time_step(&mut self) -> f64;

    /// A random 3D position within the domain.
    fn random_position(&mut self) -> Vec3;

    fn in_domain(&self, pos: Vec3) -> bool;

    fn in_spb(&self, pos: Vec3) -> bool;

    fn in_periphery(&self, pos: Vec3) -> bool;

    /// The next position after one diffusion step (may leave the domain).
    fn diffuse(&mut self, pos: Vec3) -> Vec3;

    /// Reflects an out-of-domain position back into the domain.
    fn reflect(&mut self, pos: Vec3) -> Result<Vec3, SimError>;
}

const DIFFUSION_MOVES: [Vec3; 7] = [
    Vec3 { x: 0., y: 0., z: 0. },
    Vec3 { x: 1., y: 0., z: 0. },
    Vec3 { x: -1., y: 0., z: 0. },
    Vec3 { x: 0., y: 1., z: 0. },
    Vec3 { x: 0., y: -1., z: 0. },
    Vec3 { x: 0., y: 0., z: 1. },
    Vec3 { x: 0., y: 0., z: -1. },
];

const REFLECTION_MOVES: [Vec3; 26] = [
    Vec3 { x: 0., y: 0., z: 1. }, Vec3 { x: 0., y: 0., z: -1. },
    Vec3 { x: 0., y: 1., z: 0. }, Vec3 { x: 0., y: 1., z: 1. }, Vec3 { x: 0., y: 1., z: -1. },
    Vec3 { x: 0., y: -1., z: 0. }, Vec3 { x: 0., y: -1., z: 1. }, Vec3 { x: 0., y: -1., z: -1. },
    Vec3 { x: 1., y: 0., z: 0. }, Vec3 { x: 1., y: 0., z: 1. }, Vec3 { x: 1., y: 0., z: -1. },
    Vec3 { x: 1., y: 1., z: 0. }, Vec3 { x: 1., y: 1., z: 1. }, Vec3 { x: 1., y: 1., z: -1. },
    Vec3 { x: 1., y: -1., z: 0. }, Vec3 { x: 1., y: -1., z: 1. }, Vec3 { x: 1., y: -1., z: -1. },
    Vec3 { x: -1., y: 0., z: 0. }, Vec3 { x: -1., y: 0., z: 1. }, Vec3 { x: -1., y: 0., z: -1. },
    Vec3 { x: -1., y: 1., z: 0. }, Vec3 { x: -1., y: 1., z: 1. }, Vec3 { x: -1., y: 1., z: -1. },
    Vec3 { x: -1., y: -1., z: 0. }, Vec3 { x: -1., y: -1., z: 1. }, Vec3 { x: -1., y: -1., z: -1. },
];

/// Isotropic diffusion in a spherical domain (nucleus minus nucleolus) with
/// grid-based boundary reflection.
///
/// Nucleus = ball of radius `r` at the origin. Nucleolus = ball of radius
/// `r` centered at `(x_nucl, 0, 0)`. SPB (optional) = ball of radius
/// `r_spb` on the nucleus surface at `-x`. Periphery = domain points at
/// least `r_periphery` from the nucleus center, excluding the SPB.
pub struct IsotropicDiffusionBehavior {
    h: f64,
    d: f64,
    r: f64,
    x_nucl: f64,
    r_spb: f64,
    r_periphery: f64,
    rng: StdRng,
}

impl IsotropicDiffusionBehavior {
    /// `h`: diffusion step size (um). `d`: diffusion coefficient (um^2/s).
    /// `r`: nucleus radius (um). `x_nucl`: nucleolus center x-offset (um).
    /// `r_spb`: SPB radius (um). `r_periphery`: periphery threshold radius (um).
    pub fn new(h: f64, d: f64, r: f64, x_nucl: f64, r_spb: f64, r_periphery: f64) -> Self {
        Self::with_rng(h, d, r, x_nucl, r_spb, r_periphery, StdRng::from_entropy())
    }

    /// Constructs with an explicit RNG seed, for deterministic replay.
    pub fn with_seed(h: f64, d: f64, r: f64, x_nucl: f64, r_spb: f64, r_periphery: f64, seed: u64) -> Self {
        Self::with_rng(h, d, r, x_nucl, r_spb, r_periphery, StdRng::seed_from_u64(seed))
    }

    fn with_rng(h: f64, d: f64, r: f64, x_nucl: f64, r_spb: f64, r_periphery: f64, rng: StdRng) -> Self {
        IsotropicDiffusionBehavior { h, d, r, x_nucl, r_spb, r_periphery, rng }
    }

    fn in_nucleus(&self, pos: Vec3) -> bool {
        pos.length_squared() <= self.r * self.r
    }

    fn in_nucleolus(&self, pos: Vec3) -> bool {
        (pos - Vec3::new(self.x_nucl, 0., 0.)).length_squared() <= self.r * self.r
    }

    fn reflect_expand(&self, candidates: &mut Vec<Vec3>, start_idx: usize) -> Result<usize, SimError> {
        let old_size = candidates.len();
        for i in start_idx..old_size {
            let base = candidates[i];
            for mv in REFLECTION_MOVES.iter() {
                let candidate = base + *mv * self.h;
                if self.in_domain(candidate) && !candidates[0..old_size].contains(&candidate) {
                    candidates.push(candidate);
                }
            }
        }
        if candidates.len() == old_size {
            return Err(SimError::ReflectionImpossible);
        }
        Ok(old_size)
    }

    fn reflect_sort(&self, candidates: &mut [Vec3], ref_pos: Vec3, start_idx: usize) {
        if self.in_nucleolus(ref_pos) {
            candidates[start_idx..].sort_by(|a, b| {
                (ref_pos - *a).length_squared().partial_cmp(&(ref_pos - *b).length_squared()).unwrap()
            });
        } else {
            let neg_ref = -ref_pos;
            candidates[start_idx..].sort_by(|a, b| a.dot(&neg_ref).partial_cmp(&b.dot(&neg_ref)).unwrap());
        }
    }
}

/// Solves `C w = rhs` for the 3x3 system with columns `c0, c1, c2`; `None`
/// if the matrix is (numerically) rank-deficient.
fn solve_3x3(c0: Vec3, c1: Vec3, c2: Vec3, rhs: Vec3) -> Option<Vec3> {
    let m = Matrix3::from_columns(&[
        Vector3::new(c0.x, c0.y, c0.z),
        Vector3::new(c1.x, c1.y, c1.z),
        Vector3::new(c2.x, c2.y, c2.z),
    ]);
    let b = Vector3::new(rhs.x, rhs.y, rhs.z);
    m.qr().solve(&b).map(|w| Vec3::new(w.x, w.y, w.z))
}

impl DiffusionBehavior for IsotropicDiffusionBehavior {
    fn time_step(&mut self) -> f64 {
        let lambda = 6. * self.d / (self.h * self.h);
        self.rng.sample(Exp::new(lambda))
    }

    fn random_position(&mut self) -> Vec3 {
        loop {
            let pos = Vec3::new(
                self.rng.gen_range(-self.r, self.r),
                self.rng.gen_range(-self.r, self.r),
                self.rng.gen_range(-self.r, self.r),
            );
            if self.in_domain(pos) {
                return pos;
            }
        }
    }

    fn in_domain(&self, pos: Vec3) -> bool {
        self.in_nucleus(pos) && !self.in_nucleolus(pos)
    }

    fn in_spb(&self, pos: Vec3) -> bool {
        (pos + Vec3::new(self.r - self.r_spb, 0., 0.)).length_squared() <= self.r_spb * self.r_spb
    }

    fn in_periphery(&self, pos: Vec3) -> bool {
        if self.in_spb(pos) || !self.in_domain(pos) {
            return false;
        }
        pos.length_squared() >= self.r_periphery * self.r_periphery
    }

    fn diffuse(&mut self, pos: Vec3) -> Vec3 {
        let idx = self.rng.gen_range(0, DIFFUSION_MOVES.len());
        pos + DIFFUSION_MOVES[idx] * self.h
    }

    fn reflect(&mut self, pos: Vec3) -> Result<Vec3, SimError> {
        // find at least three in-domain candidates close to `pos`
        let mut candidates: Vec<Vec3> = vec![pos];
        let mut old_size;
        loop {
            old_size = self.reflect_expand(&mut candidates, 0)?;
            self.reflect_sort(&mut candidates, pos, old_size);
            if candidates.len() > 3 {
                break;
            }
        }

        let mut third_idx = 3;
        loop {
            if solve_3x3(candidates[1], candidates[2], candidates[third_idx], pos).is_some() {
                break;
            }
            third_idx += 1;
            if third_idx == candidates.len() {
                old_size = self.reflect_expand(&mut candidates, old_size)?;
                self.reflect_sort(&mut candidates, pos, old_size);
            }
        }

        let w = solve_3x3(candidates[1], candidates[2], candidates[third_idx], pos)
            .expect("rank checked above");
        let coef = [w.x.abs(), w.y.abs(), w.z.abs()];
        let mut cdf = [0f64; 3];
        let mut cumsum = 0.;
        for i in 0..3 {
            cumsum += coef[i];
            cdf[i] = cumsum;
        }
        let sample = self.rng.gen_range(0., cumsum);
        let candidate_idx = cdf.iter().position(|&c| c > sample).unwrap_or(2);
        let chosen = if candidate_idx == 2 { third_idx } else { candidate_idx + 1 };
        Ok(candidates[chosen])
    }
}
