//! Per-generation statistics of a training run.

use super::Population;
use serde::{Deserialize, Serialize};

/// Time series recorded once per generation.
///
/// # Examples
/// ```
/// use hrd_trainer::TrainingStats;
/// let stats = TrainingStats::new();
/// assert_eq!(stats.generations(), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    /// Best score of the population after evaluation.
    pub best_score: Vec<f64>,
    /// Mean score of the evaluated population.
    pub mean_score: Vec<f64>,
    /// Gene diversity of the evaluated population.
    pub population_diversity: Vec<f64>,
}

impl TrainingStats {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded generations.
    #[must_use]
    pub fn generations(&self) -> usize {
        self.best_score.len()
    }

    /// Appends the statistics of an evaluated population.
    pub fn record(&mut self, population: &Population) {
        self.best_score.push(
            population
                .best()
                .and_then(super::Individual::score)
                .unwrap_or(0.0),
        );
        self.mean_score.push(population.mean_score());
        self.population_diversity.push(population.diversity());
    }
}

pub(crate) fn population_diversity_by<'a, F>(size: usize, mut at: F) -> f64
where
    F: FnMut(usize) -> &'a [f64],
{
    if size == 0 {
        return 0.0;
    }
    let dimensions = at(0).len();
    if dimensions == 0 {
        return 0.0;
    }
    let mut means = vec![0.0; dimensions];
    #[allow(clippy::cast_precision_loss)]
    let population_size = size as f64;
    for idx in 0..size {
        for (dimension, value) in at(idx).iter().enumerate() {
            means[dimension] += *value;
        }
    }
    for mean in &mut means {
        *mean /= population_size;
    }
    let mut total_variance = 0.0;
    for idx in 0..size {
        for (dimension, value) in at(idx).iter().enumerate() {
            let diff = value - means[dimension];
            total_variance += (diff * diff) / population_size;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let dimensions = dimensions as f64;
    (total_variance / dimensions).sqrt()
}
