//! Fitness abstraction evaluated by the trainer.

use crate::core::{Fitness, ScoringWeights};
use crate::error::TrainingResult;
use std::sync::Arc;

/// Scores one weight configuration.
///
/// Implementations must be pure functions of the weights and their own
/// immutable data: the trainer memoises the result on the individual and
/// never asks twice.
///
/// # Examples
/// ```
/// use hrd_trainer::ops::FitnessFunction;
/// use hrd_trainer::{Fitness, ScoringWeights, TrainingResult};
///
/// struct PreferDomains;
///
/// impl FitnessFunction for PreferDomains {
///     fn evaluate(&self, weights: &ScoringWeights) -> TrainingResult<Fitness> {
///         Ok(Fitness {
///             avg_evaluation_score: weights.domain_similarity_weight,
///             avg_true_positive_rate: 0.0,
///             avg_false_positive_rate: 0.0,
///             avg_ontology_score: None,
///         })
///     }
/// }
///
/// let fitness = PreferDomains.evaluate(&ScoringWeights::default()).unwrap();
/// assert_eq!(fitness.avg_evaluation_score, 0.5);
/// ```
pub trait FitnessFunction {
    /// Evaluates `weights` over the whole corpus.
    ///
    /// # Errors
    /// Any error is fatal for the training run.
    fn evaluate(&self, weights: &ScoringWeights) -> TrainingResult<Fitness>;
}

impl<T: FitnessFunction + ?Sized> FitnessFunction for &T {
    fn evaluate(&self, weights: &ScoringWeights) -> TrainingResult<Fitness> {
        (**self).evaluate(weights)
    }
}

impl<T: FitnessFunction + ?Sized> FitnessFunction for Box<T> {
    fn evaluate(&self, weights: &ScoringWeights) -> TrainingResult<Fitness> {
        (**self).evaluate(weights)
    }
}

impl<T: FitnessFunction + ?Sized> FitnessFunction for Arc<T> {
    fn evaluate(&self, weights: &ScoringWeights) -> TrainingResult<Fitness> {
        (**self).evaluate(weights)
    }
}
