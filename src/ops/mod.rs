//! Genetic operators and the fitness abstraction.
//!
//! Recombination and mutation work on flat gene slices produced by
//! [`crate::ParameterSpace::encode`], so they stay independent of the
//! weight layout. Selection works on a ranking of survivors ordered from the
//! fittest down.

pub mod crossover;
pub mod fitness;
pub mod mutation;
pub mod selection;

pub use crossover::{
    BlendAlphaRecombination, RecombinationKind, RecombinationOperator, UniformRecombination,
};
pub use fitness::FitnessFunction;
pub use mutation::{GaussianNeighbour, MutationOperator};
pub use selection::{RankBiasedSelection, SelectionOperator};

use rand::RngCore;
use std::f64::consts::PI;

/// Uniform draw from `[0, 1)`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn random_unit(rng: &mut dyn RngCore) -> f64 {
    let value = rng.next_u64() as f64;
    value / (u64::MAX as f64 + 1.0)
}

/// Standard normal draw (Box–Muller).
pub(crate) fn normal_sample(rng: &mut dyn RngCore) -> f64 {
    let u1 = loop {
        let sample = random_unit(rng);
        if sample > 0.0 {
            break sample;
        }
    };
    let u2 = random_unit(rng);
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
