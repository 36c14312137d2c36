//! Mutation operators producing a neighbour of a gene vector.

use super::normal_sample;
use crate::core::ParameterSpace;
use crate::error::ConfigError;
use rand::RngCore;
use std::sync::Arc;

/// Applies a mutation to a gene vector and returns the mutant.
///
/// # Examples
/// ```
/// use hrd_trainer::ops::MutationOperator;
/// use rand::thread_rng;
///
/// struct AddOne;
///
/// impl MutationOperator for AddOne {
///     fn mutate(&self, parent: &[f64], _rng: &mut dyn rand::RngCore) -> Vec<f64> {
///         parent.iter().map(|value| value + 1.0).collect()
///     }
/// }
///
/// assert_eq!(AddOne.mutate(&[0.0, 1.0], &mut thread_rng()), vec![1.0, 2.0]);
/// ```
pub trait MutationOperator: Send + Sync {
    /// Mutates the provided genes.
    fn mutate(&self, parent: &[f64], rng: &mut dyn RngCore) -> Vec<f64>;
}

impl<T: MutationOperator + ?Sized> MutationOperator for &T {
    fn mutate(&self, parent: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        (**self).mutate(parent, rng)
    }
}

impl<T: MutationOperator + ?Sized> MutationOperator for Box<T> {
    fn mutate(&self, parent: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        (**self).mutate(parent, rng)
    }
}

impl<T: MutationOperator + ?Sized> MutationOperator for Arc<T> {
    fn mutate(&self, parent: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        (**self).mutate(parent, rng)
    }
}

/// Gaussian perturbation of every gene with per-gene clamping.
///
/// The standard deviation of gene `i` is `step * (upper[i] - lower[i])`, so a
/// single step size moves weights with very different ranges comparably.
#[derive(Debug, Clone)]
pub struct GaussianNeighbour {
    sigmas: Vec<f64>,
    lower_bounds: Vec<f64>,
    upper_bounds: Vec<f64>,
}

impl GaussianNeighbour {
    /// Creates an operator over explicit gene bounds.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the bounds mismatch or `step` is negative.
    pub fn new(
        lower_bounds: Vec<f64>,
        upper_bounds: Vec<f64>,
        step: f64,
    ) -> Result<Self, ConfigError> {
        if !(step.is_finite() && step >= 0.0) {
            return Err(ConfigError::InvalidMutationStep(step));
        }
        if lower_bounds.len() != upper_bounds.len() {
            return Err(ConfigError::InvalidRange {
                name: "gene bounds".to_string(),
                min: lower_bounds.len() as f64,
                max: upper_bounds.len() as f64,
            });
        }
        let sigmas = lower_bounds
            .iter()
            .zip(upper_bounds.iter())
            .map(|(lower, upper)| step * (upper - lower))
            .collect();
        Ok(Self {
            sigmas,
            lower_bounds,
            upper_bounds,
        })
    }

    /// Perturbs every gene of `space` with `step`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidMutationStep`] for a negative step.
    pub fn for_space(space: &ParameterSpace, step: f64) -> Result<Self, ConfigError> {
        Self::new(
            space.lower_bounds().to_vec(),
            space.upper_bounds().to_vec(),
            step,
        )
    }
}

impl MutationOperator for GaussianNeighbour {
    fn mutate(&self, parent: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        let mut child = parent.to_vec();
        for (idx, gene) in child.iter_mut().enumerate() {
            if idx >= self.sigmas.len() {
                break;
            }
            let perturbation = normal_sample(rng) * self.sigmas[idx];
            *gene = (*gene + perturbation).clamp(self.lower_bounds[idx], self.upper_bounds[idx]);
        }
        child
    }
}
