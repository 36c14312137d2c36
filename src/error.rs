//! Error types shared by the scoring pipeline and the trainer.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type TrainingResult<T> = Result<T, TrainingError>;

/// Errors that abort a training run or a single fitness evaluation.
///
/// Every variant is fatal for the run: a partially scored population cannot
/// be ranked meaningfully, so nothing is retried.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// A domain identifier annotated on an entity or candidate has no weight
    /// in the domain table.
    #[error("no domain weight for {domain} (annotated on {accession})")]
    MissingDomainWeight {
        /// Accession of the entity or candidate carrying the annotation.
        accession: String,
        /// Domain identifier without a weight.
        domain: String,
    },
    /// The reference set holds no description for an evaluated entity.
    #[error("no reference description for entity {entity}")]
    MissingReference {
        /// Accession of the entity.
        entity: String,
    },
    /// Ontology evaluation is enabled but the entity has no reference terms.
    #[error("no reference ontology annotations for entity {entity}")]
    MissingReferenceAnnotations {
        /// Accession of the entity.
        entity: String,
    },
    /// The reference description contains no words at all.
    #[error("reference description for entity {entity} is malformed: {reason}")]
    MalformedReference {
        /// Accession of the entity.
        entity: String,
        /// Short explanation.
        reason: String,
    },
    /// A configured database has no weights in the parameter set.
    #[error("parameter set has no weights for database {0}")]
    MissingDatabaseWeights(String),
    /// Settings failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The parallel evaluator could not start its runtime.
    #[error("failed to initialize evaluation runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// A training output writer failed.
    #[error("failed to write training output: {0}")]
    Output(#[from] std::io::Error),
    /// An evaluation task panicked or was cancelled.
    #[error("evaluation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors produced while loading or validating [`crate::TrainerSettings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The YAML document could not be parsed.
    #[error("invalid settings document: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// The population size was zero.
    #[error("population size must be greater than zero (received {0})")]
    InvalidPopulationSize(usize),
    /// The number of generations was zero.
    #[error("number of generations must be positive (received {0})")]
    InvalidGenerationCount(usize),
    /// A generational rate was outside `[0, 1]`.
    #[error("{name} must be within [0, 1] (received {value})")]
    InvalidRate {
        /// Name of the rate.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
    /// The mutation step was negative or not finite.
    #[error("mutation step must be a non-negative number (received {0})")]
    InvalidMutationStep(f64),
    /// The survival rate keeps nobody alive.
    #[error("survival rate {rate} keeps no individual of a population of {population_size}")]
    NoSurvivors {
        /// Configured survival rate.
        rate: f64,
        /// Configured population size.
        population_size: usize,
    },
    /// Survivors, offspring and mutants do not fit into the population.
    #[error(
        "{survivors} survivors + {offspring} offspring + {mutants} mutants exceed population size {population_size}"
    )]
    RatesExceedPopulation {
        /// Number of survivors per generation.
        survivors: usize,
        /// Number of offspring per generation.
        offspring: usize,
        /// Number of mutants per generation.
        mutants: usize,
        /// Configured population size.
        population_size: usize,
    },
    /// A weight range has `min > max` or a non-finite bound.
    #[error("invalid range for {name}: [{min}, {max}]")]
    InvalidRange {
        /// Name of the weight.
        name: String,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// Three token weights within the range cannot sum to one, or the range
    /// admits negative weights.
    #[error("token weight range [{min}, {max}] cannot hold three non-negative weights summing to one")]
    InfeasibleTokenRange {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// A seed weight lies outside its configured range.
    #[error("seed weight {name} = {value} lies outside [{min}, {max}]")]
    SeedOutOfRange {
        /// Name of the weight.
        name: String,
        /// Offending value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// No database names were configured.
    #[error("at least one database must be configured")]
    NoDatabases,
    /// A configured database has no seed weights.
    #[error("seed parameters have no entry for database {0}")]
    MissingSeedDatabase(String),
    /// The parallel evaluator was asked for zero concurrent tasks.
    #[error("max concurrency must be at least one")]
    InvalidConcurrency,
}
