//! Recombination operators producing one child from two parents.

use super::random_unit;
use crate::error::ConfigError;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Produces a child gene vector by mixing genes from two parents.
///
/// # Examples
/// ```
/// use hrd_trainer::ops::RecombinationOperator;
/// use rand::thread_rng;
///
/// struct TakeFirst;
///
/// impl RecombinationOperator for TakeFirst {
///     fn recombine(&self, parent_a: &[f64], _parent_b: &[f64], _rng: &mut dyn rand::RngCore) -> Vec<f64> {
///         parent_a.to_vec()
///     }
/// }
///
/// let child = TakeFirst.recombine(&[0.0, 1.0], &[2.0, 3.0], &mut thread_rng());
/// assert_eq!(child, vec![0.0, 1.0]);
/// ```
pub trait RecombinationOperator: Send + Sync {
    /// Returns the child of `parent_a` and `parent_b`. Out-of-range genes are
    /// clamped by the caller.
    fn recombine(&self, parent_a: &[f64], parent_b: &[f64], rng: &mut dyn RngCore) -> Vec<f64>;
}

impl<T: RecombinationOperator + ?Sized> RecombinationOperator for &T {
    fn recombine(&self, parent_a: &[f64], parent_b: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        (**self).recombine(parent_a, parent_b, rng)
    }
}

impl<T: RecombinationOperator + ?Sized> RecombinationOperator for Box<T> {
    fn recombine(&self, parent_a: &[f64], parent_b: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        (**self).recombine(parent_a, parent_b, rng)
    }
}

impl<T: RecombinationOperator + ?Sized> RecombinationOperator for Arc<T> {
    fn recombine(&self, parent_a: &[f64], parent_b: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        (**self).recombine(parent_a, parent_b, rng)
    }
}

/// Takes every gene from parent A when a uniform draw is below one half,
/// otherwise from parent B.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformRecombination;

impl RecombinationOperator for UniformRecombination {
    fn recombine(&self, parent_a: &[f64], parent_b: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        parent_a
            .iter()
            .zip(parent_b.iter())
            .map(|(&gene_a, &gene_b)| {
                if random_unit(rng) < 0.5 {
                    gene_a
                } else {
                    gene_b
                }
            })
            .collect()
    }
}

/// Blend crossover with configurable α parameter; every child gene is drawn
/// from the parents' interval widened by α on both sides.
#[derive(Debug, Clone)]
pub struct BlendAlphaRecombination {
    alpha: f64,
}

impl BlendAlphaRecombination {
    /// Creates a new BLX-α operator.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidRange`] when `alpha` is negative or not
    /// finite.
    pub fn new(alpha: f64) -> Result<Self, ConfigError> {
        if !(alpha.is_finite() && alpha >= 0.0) {
            return Err(ConfigError::InvalidRange {
                name: "blend_alpha".to_string(),
                min: alpha,
                max: f64::INFINITY,
            });
        }
        Ok(Self { alpha })
    }

    fn sample_gene(&self, value_a: f64, value_b: f64, rng: &mut dyn RngCore) -> f64 {
        let min = value_a.min(value_b);
        let max = value_a.max(value_b);
        let range = max - min;
        let lower = min - self.alpha * range;
        let upper = max + self.alpha * range;
        lower + random_unit(rng) * (upper - lower)
    }
}

impl RecombinationOperator for BlendAlphaRecombination {
    fn recombine(&self, parent_a: &[f64], parent_b: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        parent_a
            .iter()
            .zip(parent_b.iter())
            .map(|(&value_a, &value_b)| self.sample_gene(value_a, value_b, rng))
            .collect()
    }
}

/// Recombination rule selected in the settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RecombinationKind {
    /// [`UniformRecombination`].
    Uniform,
    /// [`BlendAlphaRecombination`] with the given α.
    Blend {
        /// Widening factor of the parents' interval.
        alpha: f64,
    },
}

impl Default for RecombinationKind {
    fn default() -> Self {
        Self::Uniform
    }
}

impl RecombinationKind {
    /// Instantiates the operator.
    ///
    /// # Errors
    /// Propagates [`BlendAlphaRecombination::new`] validation errors.
    pub fn build(self) -> Result<Box<dyn RecombinationOperator>, ConfigError> {
        Ok(match self {
            Self::Uniform => Box::new(UniformRecombination),
            Self::Blend { alpha } => Box::new(BlendAlphaRecombination::new(alpha)?),
        })
    }
}
