//! Pluggable strategies (the only parts of the kernel with randomness or
//! domain-specific geometry baked in). Each is a trait plus one concrete
//! implementation modeled on a particular biophysical assumption; a
//! `Simulation` holds them as trait objects so alternate models can be
//! substituted without touching the event loop.

mod activation;
mod binding;
mod diffusion;

pub use activation::{ActivationBehavior, ProbabilisticActivationBehavior};
pub use binding::{BindingBehavior, ProbabilisticBindingBehavior};
pub use diffusion::{DiffusionBehavior, IsotropicDiffusionBehavior};
