//! Population primitives of the genetic trainer.
//!
//! A [`Population`] is an arena of [`Individual`]s with stable ids assigned
//! in insertion order. Rankings are derived views: positions sorted by score
//! descending with ties broken by ascending id, so equal scores never merge
//! distinct individuals.

pub mod experiment;
mod parameters;

pub use experiment::TrainingStats;
pub use parameters::{
    DatabaseWeights, Fitness, Origin, ParameterBounds, ParameterSet, ParameterSpace,
    ScoringWeights, WeightRange,
};

use crate::error::TrainingResult;
use experiment::population_diversity_by;
use std::cmp::Ordering;

/// Stable identifier of an individual within one run.
pub type IndividualId = u64;

/// A parameter set together with its id and flattened genes.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    id: IndividualId,
    set: ParameterSet,
    genes: Vec<f64>,
}

impl Individual {
    /// Id assigned on insertion.
    #[must_use]
    pub fn id(&self) -> IndividualId {
        self.id
    }

    /// The parameter set.
    #[must_use]
    pub fn set(&self) -> &ParameterSet {
        &self.set
    }

    /// Genes of the parameter set in [`ParameterSpace`] order.
    #[must_use]
    pub fn genes(&self) -> &[f64] {
        &self.genes
    }

    /// Memoised score, if evaluated.
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        self.set.score()
    }

    fn cmp_rank(&self, other: &Self) -> Ordering {
        other
            .set
            .cmp_fitness(&self.set)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// The individuals of one generation.
///
/// # Examples
/// ```
/// use hrd_trainer::{ParameterBounds, ParameterSet, ParameterSpace, Population};
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let space = ParameterSpace::new(["swissprot"], ParameterBounds::default()).unwrap();
/// let mut population = Population::new(space.clone());
/// let mut rng = StdRng::seed_from_u64(1);
/// for _ in 0..3 {
///     population.push(ParameterSet::random(&space, &mut rng)).unwrap();
/// }
/// assert_eq!(population.len(), 3);
/// assert_eq!(population.unscored().len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Population {
    space: ParameterSpace,
    individuals: Vec<Individual>,
    next_id: IndividualId,
}

impl Population {
    /// Creates an empty population laid out by `space`.
    #[must_use]
    pub fn new(space: ParameterSpace) -> Self {
        Self {
            space,
            individuals: Vec::new(),
            next_id: 0,
        }
    }

    /// Gene layout of the individuals.
    #[must_use]
    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    /// Number of individuals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    /// Whether the population holds no individual.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Individuals in arena order.
    #[must_use]
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    /// Whether an individual with exactly these genes exists.
    #[must_use]
    pub fn contains_genes(&self, genes: &[f64]) -> bool {
        self.individuals
            .iter()
            .any(|individual| individual.genes == genes)
    }

    /// Adds `set` unless an identical weight vector is already present.
    /// Returns the new id, or `None` for a duplicate.
    ///
    /// # Errors
    /// Returns [`crate::TrainingError::MissingDatabaseWeights`] when `set`
    /// lacks a database of the space.
    pub fn insert(&mut self, set: ParameterSet) -> TrainingResult<Option<IndividualId>> {
        let genes = self.space.encode(set.weights())?;
        if self.contains_genes(&genes) {
            return Ok(None);
        }
        Ok(Some(self.push_genes(set, genes)))
    }

    /// Adds `set` unconditionally.
    ///
    /// # Errors
    /// Returns [`crate::TrainingError::MissingDatabaseWeights`] when `set`
    /// lacks a database of the space.
    pub fn push(&mut self, set: ParameterSet) -> TrainingResult<IndividualId> {
        let genes = self.space.encode(set.weights())?;
        Ok(self.push_genes(set, genes))
    }

    fn push_genes(&mut self, set: ParameterSet, genes: Vec<f64>) -> IndividualId {
        let id = self.next_id;
        self.next_id += 1;
        self.individuals.push(Individual { id, set, genes });
        id
    }

    /// Arena positions of the individuals without memoised fitness.
    #[must_use]
    pub fn unscored(&self) -> Vec<usize> {
        self.individuals
            .iter()
            .enumerate()
            .filter(|(_, individual)| individual.set.fitness().is_none())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Memoises `fitness` on the individual at arena position `idx`.
    pub fn set_fitness(&mut self, idx: usize, fitness: Fitness) {
        if let Some(individual) = self.individuals.get_mut(idx) {
            individual.set.set_fitness(fitness);
        }
    }

    /// Arena positions ordered from the fittest down; ties go to the older
    /// individual.
    #[must_use]
    pub fn ranking(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.individuals.len()).collect();
        order.sort_by(|&lhs, &rhs| self.individuals[lhs].cmp_rank(&self.individuals[rhs]));
        order
    }

    /// Keeps the `count` fittest individuals, reordered by rank.
    pub fn retain_fittest(&mut self, count: usize) {
        let order = self.ranking();
        let mut slots: Vec<Option<Individual>> = std::mem::take(&mut self.individuals)
            .into_iter()
            .map(Some)
            .collect();
        self.individuals = order
            .into_iter()
            .take(count)
            .filter_map(|idx| slots[idx].take())
            .collect();
    }

    /// The fittest individual.
    #[must_use]
    pub fn best(&self) -> Option<&Individual> {
        self.individuals
            .iter()
            .min_by(|lhs, rhs| lhs.cmp_rank(rhs))
    }

    /// Mean score of the evaluated individuals, zero when none is.
    #[must_use]
    pub fn mean_score(&self) -> f64 {
        let scores: Vec<f64> = self
            .individuals
            .iter()
            .filter_map(Individual::score)
            .collect();
        if scores.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = scores.len() as f64;
        scores.iter().sum::<f64>() / count
    }

    /// Root mean squared deviation of the genes from their centroid.
    #[must_use]
    pub fn diversity(&self) -> f64 {
        population_diversity_by(self.individuals.len(), |idx| {
            self.individuals[idx].genes.as_slice()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> ParameterSpace {
        ParameterSpace::new(["swissprot"], ParameterBounds::default()).unwrap()
    }

    fn weights(domain: f64) -> ScoringWeights {
        let mut weights = ScoringWeights {
            domain_similarity_weight: domain,
            ..ScoringWeights::default()
        };
        weights.databases.insert(
            "swissprot".into(),
            DatabaseWeights {
                weight: 10.0,
                description_score_bit_score_weight: 0.5,
            },
        );
        weights
    }

    fn fitness(score: f64) -> Fitness {
        Fitness {
            avg_evaluation_score: score,
            avg_true_positive_rate: 0.0,
            avg_false_positive_rate: 0.0,
            avg_ontology_score: None,
        }
    }

    #[test]
    fn insert_rejects_identical_weights() {
        let mut population = Population::new(space());
        assert_eq!(population.insert(ParameterSet::seed(weights(0.3), &space())).unwrap(), Some(0));
        assert_eq!(population.insert(ParameterSet::seed(weights(0.3), &space())).unwrap(), None);
        assert_eq!(population.push(ParameterSet::seed(weights(0.3), &space())).unwrap(), 1);
        assert_eq!(population.len(), 2);
    }

    #[test]
    fn ranking_breaks_ties_by_id() {
        let mut population = Population::new(space());
        for (domain, score) in [(0.1, 0.5), (0.2, 0.9), (0.3, 0.5), (0.4, 0.1)] {
            population.push(ParameterSet::seed(weights(domain), &space())).unwrap();
            let idx = population.len() - 1;
            population.set_fitness(idx, fitness(score));
        }
        assert_eq!(population.ranking(), vec![1, 0, 2, 3]);
        assert_eq!(population.best().unwrap().id(), 1);
    }

    #[test]
    fn retain_fittest_drops_near_ties_below_the_cut() {
        let mut population = Population::new(space());
        let scores = [0.10, 0.90, 0.80, 0.80 - 1e-12, 0.20, 0.30, 0.40, 0.05, 0.60, 0.70];
        for (idx, score) in scores.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let domain = idx as f64 / 10.0;
            population.push(ParameterSet::seed(weights(domain), &space())).unwrap();
            population.set_fitness(idx, fitness(*score));
        }
        population.retain_fittest(2);
        let kept: Vec<_> = population.individuals().iter().map(Individual::id).collect();
        assert_eq!(kept, vec![1, 2]);

        population.retain_fittest(1);
        assert_eq!(population.individuals()[0].id(), 1);
    }

    #[test]
    fn unscored_and_mean_track_fitness() {
        let mut population = Population::new(space());
        population.push(ParameterSet::seed(weights(0.1), &space())).unwrap();
        population.push(ParameterSet::seed(weights(0.2), &space())).unwrap();
        assert_eq!(population.unscored(), vec![0, 1]);
        assert_eq!(population.mean_score(), 0.0);
        population.set_fitness(1, fitness(0.4));
        assert_eq!(population.unscored(), vec![0]);
        assert!((population.mean_score() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn diversity_vanishes_for_clones() {
        let mut population = Population::new(space());
        population.push(ParameterSet::seed(weights(0.3), &space())).unwrap();
        population.push(ParameterSet::seed(weights(0.3), &space())).unwrap();
        assert_eq!(population.diversity(), 0.0);
        population.push(ParameterSet::seed(weights(0.9), &space())).unwrap();
        assert!(population.diversity() > 0.0);
    }
}
