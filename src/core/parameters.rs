//! Scoring weights, the parameter sets built from them and the gene layout
//! used by the genetic operators.
//!
//! A [`ParameterSet`] is what the trainer breeds. Its [`ScoringWeights`] use
//! the same serde representation as the seed weights in
//! [`crate::TrainerSettings`], so an optimised set can be written straight
//! back into a settings file.

use crate::error::{ConfigError, TrainingError, TrainingResult};
use crate::ops::{MutationOperator, RecombinationOperator};
use rand::distributions::Uniform;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};

/// Number of genes that do not depend on the database list.
const GLOBAL_GENES: usize = 4;
/// Number of genes contributed by every database.
const GENES_PER_DATABASE: usize = 2;
/// Token weights summing to one within this tolerance are left untouched, so
/// normalising twice yields identical weights.
const NORMALIZED_TOLERANCE: f64 = 1e-12;

/// Inclusive range of valid values for one weight.
///
/// # Examples
/// ```
/// use hrd_trainer::WeightRange;
/// let range = WeightRange::new(0.0, 1.0);
/// assert!(range.contains(0.5));
/// assert_eq!(range.clamp(2.0), 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightRange {
    /// Smallest valid value.
    pub min: f64,
    /// Largest valid value.
    pub max: f64,
}

impl WeightRange {
    /// Creates a range from its bounds.
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `value` lies within the range.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Clamps `value` into the range.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min > self.max {
            return Err(ConfigError::InvalidRange {
                name: name.to_string(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    fn validate_token_share(&self) -> Result<(), ConfigError> {
        self.validate("token_score_weight")?;
        if self.min < 0.0 || 3.0 * self.min > 1.0 || 3.0 * self.max < 1.0 {
            return Err(ConfigError::InfeasibleTokenRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Valid ranges of every tunable weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterBounds {
    /// Range shared by the three token score weights.
    pub token_score_weight: WeightRange,
    /// Range of the domain similarity blend factor.
    pub domain_similarity_weight: WeightRange,
    /// Range of each database weight.
    pub database_weight: WeightRange,
    /// Range of each database's description score bit score weight.
    pub description_score_bit_score_weight: WeightRange,
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self {
            token_score_weight: WeightRange::new(0.0, 1.0),
            domain_similarity_weight: WeightRange::new(0.0, 1.0),
            database_weight: WeightRange::new(1.0, 100.0),
            description_score_bit_score_weight: WeightRange::new(0.0, 1.0),
        }
    }
}

/// Weights attached to one source database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseWeights {
    /// Trust placed in hits from this database when aggregating tokens.
    pub weight: f64,
    /// Share of the relative bit score added to a description's score.
    pub description_score_bit_score_weight: f64,
}

/// The tunable weights of the scoring pipeline.
///
/// The three token score weights are kept normalised to sum to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Weight of the cumulative bit score in a token's score.
    pub token_score_bit_score_weight: f64,
    /// Weight of the cumulative database score in a token's score.
    pub token_score_database_score_weight: f64,
    /// Weight of the cumulative overlap score in a token's score.
    pub token_score_overlap_score_weight: f64,
    /// Blend factor of domain architecture similarity.
    pub domain_similarity_weight: f64,
    /// Per-database weights keyed by database name.
    pub databases: BTreeMap<String, DatabaseWeights>,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            token_score_bit_score_weight: 0.468,
            token_score_database_score_weight: 0.2098,
            token_score_overlap_score_weight: 0.3221,
            domain_similarity_weight: 0.5,
            databases: BTreeMap::new(),
        }
    }
}

impl ScoringWeights {
    /// Returns the weights of `database`.
    ///
    /// # Errors
    /// Returns [`TrainingError::MissingDatabaseWeights`] for an unknown name.
    pub fn database(&self, database: &str) -> TrainingResult<&DatabaseWeights> {
        self.databases
            .get(database)
            .ok_or_else(|| TrainingError::MissingDatabaseWeights(database.to_string()))
    }

    /// Projects the token score weights onto `range` so they sum to one.
    ///
    /// Weights are clamped into `range`, then the unpinned ones are rescaled
    /// to fill the remaining share; a weight pushed out of `range` by the
    /// rescale is pinned to the violated bound and the rest rescaled again.
    /// All-zero weights are spread evenly. Weights already within `range` and
    /// summing to one are left untouched.
    ///
    /// `range` must admit a solution, as checked by [`ParameterSpace::new`].
    ///
    /// # Examples
    /// ```
    /// use hrd_trainer::{ScoringWeights, WeightRange};
    ///
    /// let mut weights = ScoringWeights {
    ///     token_score_bit_score_weight: 0.9,
    ///     token_score_database_score_weight: 0.0,
    ///     token_score_overlap_score_weight: 0.0,
    ///     ..ScoringWeights::default()
    /// };
    /// weights.normalize_token_weights(WeightRange::new(0.2, 1.0));
    /// assert!((weights.token_score_bit_score_weight - 0.6).abs() < 1e-12);
    /// assert!((weights.token_score_overlap_score_weight - 0.2).abs() < 1e-12);
    /// ```
    pub fn normalize_token_weights(&mut self, range: WeightRange) {
        let mut values = [
            self.token_score_bit_score_weight,
            self.token_score_database_score_weight,
            self.token_score_overlap_score_weight,
        ]
        .map(|value| {
            if value.is_finite() {
                range.clamp(value)
            } else {
                range.min
            }
        });
        let sum: f64 = values.iter().sum();
        let unchanged = values[0] == self.token_score_bit_score_weight
            && values[1] == self.token_score_database_score_weight
            && values[2] == self.token_score_overlap_score_weight;
        if unchanged && (sum - 1.0).abs() <= NORMALIZED_TOLERANCE {
            return;
        }

        let mut pinned = [false; 3];
        for _ in 0..values.len() {
            let pinned_sum: f64 = (0..3).filter(|&i| pinned[i]).map(|i| values[i]).sum();
            let free: Vec<usize> = (0..3).filter(|&i| !pinned[i]).collect();
            if free.is_empty() {
                break;
            }
            let share = 1.0 - pinned_sum;
            let free_sum: f64 = free.iter().map(|&i| values[i]).sum();
            #[allow(clippy::cast_precision_loss)]
            let even = share / free.len() as f64;
            for &i in &free {
                values[i] = if free_sum > 0.0 {
                    values[i] * share / free_sum
                } else {
                    even
                };
            }
            let mut moved = false;
            for &i in &free {
                if !range.contains(values[i]) {
                    values[i] = range.clamp(values[i]);
                    pinned[i] = true;
                    moved = true;
                }
            }
            if !moved {
                break;
            }
        }

        self.token_score_bit_score_weight = values[0];
        self.token_score_database_score_weight = values[1];
        self.token_score_overlap_score_weight = values[2];
    }
}

/// Lineage of a parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Weights supplied by the settings.
    Seed,
    /// Child of two survivors.
    Offspring,
    /// Neighbour of a survivor.
    Mutant,
    /// Drawn uniformly from the parameter space.
    Random,
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Seed => "seed",
            Self::Offspring => "offspring",
            Self::Mutant => "mutant",
            Self::Random => "random",
        };
        f.write_str(name)
    }
}

/// Memoised result of evaluating a parameter set over the whole corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Fitness {
    /// Mean per-entity evaluation score; the value the trainer maximises.
    pub avg_evaluation_score: f64,
    /// Mean token true-positive rate.
    pub avg_true_positive_rate: f64,
    /// Mean token false-positive rate.
    pub avg_false_positive_rate: f64,
    /// Mean ontology annotation score, when ontology evaluation is enabled.
    pub avg_ontology_score: Option<f64>,
}

/// One individual of the trainer's population.
///
/// # Examples
/// ```
/// use hrd_trainer::{Fitness, Origin, ParameterBounds, ParameterSet, ParameterSpace, ScoringWeights};
///
/// let space = ParameterSpace::new(["swissprot"], ParameterBounds::default()).unwrap();
/// let mut seed = ParameterSet::seed(ScoringWeights::default(), &space);
/// assert_eq!(seed.origin(), Origin::Seed);
/// assert!(seed.score().is_none());
///
/// seed.set_fitness(Fitness {
///     avg_evaluation_score: 0.4,
///     avg_true_positive_rate: 0.5,
///     avg_false_positive_rate: 0.1,
///     avg_ontology_score: None,
/// });
/// let copy = seed.clone_unscored();
/// assert_eq!(copy.weights(), seed.weights());
/// assert!(copy.score().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSet {
    weights: ScoringWeights,
    origin: Origin,
    fitness: Option<Fitness>,
}

impl ParameterSet {
    /// Wraps weights supplied by the caller as the run's seed, projecting the
    /// token score weights onto the token range of `space`.
    #[must_use]
    pub fn seed(mut weights: ScoringWeights, space: &ParameterSpace) -> Self {
        weights.normalize_token_weights(space.bounds().token_score_weight);
        Self {
            weights,
            origin: Origin::Seed,
            fitness: None,
        }
    }

    fn from_genes(space: &ParameterSpace, genes: &[f64], origin: Origin) -> Self {
        Self {
            weights: space.decode(genes),
            origin,
            fitness: None,
        }
    }

    /// Draws every weight uniformly from its range.
    pub fn random<R: Rng + ?Sized>(space: &ParameterSpace, rng: &mut R) -> Self {
        let mut genes = Vec::with_capacity(space.dimensions());
        for (&lower, &upper) in space.lower_bounds().iter().zip(space.upper_bounds()) {
            genes.push(rng.sample(Uniform::new_inclusive(lower, upper)));
        }
        Self::from_genes(space, &genes, Origin::Random)
    }

    /// Returns the weights.
    #[must_use]
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Returns the lineage tag.
    #[must_use]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Returns the memoised fitness, if evaluated.
    #[must_use]
    pub fn fitness(&self) -> Option<&Fitness> {
        self.fitness.as_ref()
    }

    /// Returns the mean evaluation score, if evaluated.
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        self.fitness.map(|fitness| fitness.avg_evaluation_score)
    }

    /// Memoises the evaluation result.
    pub fn set_fitness(&mut self, fitness: Fitness) {
        self.fitness = Some(fitness);
    }

    /// Deep copy of the weights and origin without the memoised fitness.
    #[must_use]
    pub fn clone_unscored(&self) -> Self {
        Self {
            weights: self.weights.clone(),
            origin: self.origin,
            fitness: None,
        }
    }

    /// Produces one child of `self` and `other`.
    ///
    /// # Errors
    /// Returns [`TrainingError::MissingDatabaseWeights`] when either parent
    /// lacks a database of `space`.
    pub fn recombine(
        &self,
        other: &Self,
        space: &ParameterSpace,
        operator: &dyn RecombinationOperator,
        rng: &mut dyn RngCore,
    ) -> TrainingResult<Self> {
        let genes_a = space.encode(&self.weights)?;
        let genes_b = space.encode(&other.weights)?;
        let child = operator.recombine(&genes_a, &genes_b, rng);
        Ok(Self::from_genes(space, &child, Origin::Offspring))
    }

    /// Produces a perturbed copy of `self`.
    ///
    /// # Errors
    /// Returns [`TrainingError::MissingDatabaseWeights`] when `self` lacks a
    /// database of `space`.
    pub fn neighbour(
        &self,
        space: &ParameterSpace,
        operator: &dyn MutationOperator,
        rng: &mut dyn RngCore,
    ) -> TrainingResult<Self> {
        let genes = space.encode(&self.weights)?;
        let mutated = operator.mutate(&genes, rng);
        Ok(Self::from_genes(space, &mutated, Origin::Mutant))
    }

    /// Orders parameter sets by mean evaluation score. Unscored sets rank
    /// below every scored one.
    #[must_use]
    pub fn cmp_fitness(&self, other: &Self) -> Ordering {
        let lhs = self.score().unwrap_or(f64::NEG_INFINITY);
        let rhs = other.score().unwrap_or(f64::NEG_INFINITY);
        lhs.total_cmp(&rhs)
    }
}

/// Gene layout of the parameter sets for a fixed list of databases.
///
/// Genes are ordered as the three token score weights, the domain similarity
/// weight, then `weight` and `description_score_bit_score_weight` for every
/// database in name order.
#[derive(Debug, Clone)]
pub struct ParameterSpace {
    databases: Vec<String>,
    bounds: ParameterBounds,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl ParameterSpace {
    /// Creates the layout for `databases` (sorted and deduplicated).
    ///
    /// # Errors
    /// Returns [`ConfigError`] when no database is given or a range is
    /// invalid.
    pub fn new<I, S>(databases: I, bounds: ParameterBounds) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let databases: Vec<String> = databases
            .into_iter()
            .map(Into::into)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if databases.is_empty() {
            return Err(ConfigError::NoDatabases);
        }
        bounds.token_score_weight.validate_token_share()?;
        bounds
            .domain_similarity_weight
            .validate("domain_similarity_weight")?;
        bounds.database_weight.validate("database_weight")?;
        bounds
            .description_score_bit_score_weight
            .validate("description_score_bit_score_weight")?;

        let mut ranges = vec![
            bounds.token_score_weight,
            bounds.token_score_weight,
            bounds.token_score_weight,
            bounds.domain_similarity_weight,
        ];
        for _ in &databases {
            ranges.push(bounds.database_weight);
            ranges.push(bounds.description_score_bit_score_weight);
        }
        Ok(Self {
            databases,
            bounds,
            lower: ranges.iter().map(|range| range.min).collect(),
            upper: ranges.iter().map(|range| range.max).collect(),
        })
    }

    /// Database names in gene order.
    #[must_use]
    pub fn databases(&self) -> &[String] {
        &self.databases
    }

    /// Configured weight ranges.
    #[must_use]
    pub fn bounds(&self) -> &ParameterBounds {
        &self.bounds
    }

    /// Number of genes.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        GLOBAL_GENES + GENES_PER_DATABASE * self.databases.len()
    }

    /// Lower bound of every gene.
    #[must_use]
    pub fn lower_bounds(&self) -> &[f64] {
        &self.lower
    }

    /// Upper bound of every gene.
    #[must_use]
    pub fn upper_bounds(&self) -> &[f64] {
        &self.upper
    }

    /// Flattens `weights` into genes.
    ///
    /// # Errors
    /// Returns [`TrainingError::MissingDatabaseWeights`] when a database of
    /// the space is absent from `weights`.
    pub fn encode(&self, weights: &ScoringWeights) -> TrainingResult<Vec<f64>> {
        let mut genes = Vec::with_capacity(self.dimensions());
        genes.push(weights.token_score_bit_score_weight);
        genes.push(weights.token_score_database_score_weight);
        genes.push(weights.token_score_overlap_score_weight);
        genes.push(weights.domain_similarity_weight);
        for database in &self.databases {
            let entry = weights.database(database)?;
            genes.push(entry.weight);
            genes.push(entry.description_score_bit_score_weight);
        }
        Ok(genes)
    }

    /// Rebuilds weights from genes, clamping every gene into its range and
    /// normalising the token score weights.
    #[must_use]
    pub fn decode(&self, genes: &[f64]) -> ScoringWeights {
        let gene = |idx: usize| {
            genes
                .get(idx)
                .copied()
                .unwrap_or(self.lower[idx])
                .clamp(self.lower[idx], self.upper[idx])
        };
        let mut databases = BTreeMap::new();
        for (offset, database) in self.databases.iter().enumerate() {
            let base = GLOBAL_GENES + GENES_PER_DATABASE * offset;
            databases.insert(
                database.clone(),
                DatabaseWeights {
                    weight: gene(base),
                    description_score_bit_score_weight: gene(base + 1),
                },
            );
        }
        let mut weights = ScoringWeights {
            token_score_bit_score_weight: gene(0),
            token_score_database_score_weight: gene(1),
            token_score_overlap_score_weight: gene(2),
            domain_similarity_weight: gene(3),
            databases,
        };
        weights.normalize_token_weights(self.bounds.token_score_weight);
        weights
    }

    /// Rejects seed weights that miss a database or leave a range. Token
    /// weights are checked before normalisation.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingSeedDatabase`] or
    /// [`ConfigError::SeedOutOfRange`].
    pub fn check_seed(&self, weights: &ScoringWeights) -> Result<(), ConfigError> {
        let check = |name: String, value: f64, range: WeightRange| {
            if range.contains(value) {
                Ok(())
            } else {
                Err(ConfigError::SeedOutOfRange {
                    name,
                    value,
                    min: range.min,
                    max: range.max,
                })
            }
        };
        let token = self.bounds.token_score_weight;
        check(
            "token_score_bit_score_weight".into(),
            weights.token_score_bit_score_weight,
            token,
        )?;
        check(
            "token_score_database_score_weight".into(),
            weights.token_score_database_score_weight,
            token,
        )?;
        check(
            "token_score_overlap_score_weight".into(),
            weights.token_score_overlap_score_weight,
            token,
        )?;
        check(
            "domain_similarity_weight".into(),
            weights.domain_similarity_weight,
            self.bounds.domain_similarity_weight,
        )?;
        for database in &self.databases {
            let entry = weights
                .databases
                .get(database)
                .ok_or_else(|| ConfigError::MissingSeedDatabase(database.clone()))?;
            check(
                format!("{database}.weight"),
                entry.weight,
                self.bounds.database_weight,
            )?;
            check(
                format!("{database}.description_score_bit_score_weight"),
                entry.description_score_bit_score_weight,
                self.bounds.description_score_bit_score_weight,
            )?;
        }
        Ok(())
    }
}
