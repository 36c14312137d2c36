//! Settings of a training run.
//!
//! Every field has a default, so a settings document only needs to name the
//! databases and their seed weights:
//!
//! ```
//! use hrd_trainer::TrainerSettings;
//!
//! let settings = TrainerSettings::from_yaml_str(
//!     r"
//! population_size: 10
//! generations: 5
//! databases: [swissprot]
//! seed_parameters:
//!   databases:
//!     swissprot:
//!       weight: 53.0
//!       description_score_bit_score_weight: 2.0e-1
//! ",
//! )
//! .unwrap();
//! assert_eq!(settings.survivor_count(), 2);
//! ```

use crate::core::{ParameterBounds, ParameterSpace, ScoringWeights};
use crate::error::ConfigError;
use crate::ops::RecombinationKind;
use crate::scoring::ScoringOptions;
use serde::{Deserialize, Serialize};

/// Knobs of the genetic trainer and the scoring pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerSettings {
    /// Individuals per generation.
    pub population_size: usize,
    /// Number of generations to run.
    pub generations: usize,
    /// Share of the population kept after ranking.
    pub survival_rate: f64,
    /// Share of the population produced by recombination.
    pub offspring_rate: f64,
    /// Share of the population produced by mutation.
    pub mutant_rate: f64,
    /// Standard deviation of a mutation relative to each weight's range.
    pub mutation_step: f64,
    /// Seed of the run's random number generator.
    pub rng_seed: Option<u64>,
    /// Concurrent evaluations; `None` evaluates sequentially.
    pub max_concurrency: Option<usize>,
    /// Names of the searched databases.
    pub databases: Vec<String>,
    /// Valid range of every weight.
    pub bounds: ParameterBounds,
    /// Weights of the seed individual.
    pub seed_parameters: ScoringWeights,
    /// Recombination rule.
    pub recombination: RecombinationKind,
    /// Scoring pipeline switches.
    pub scoring: ScoringOptions,
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            population_size: 100,
            generations: 100,
            survival_rate: 0.2,
            offspring_rate: 0.2,
            mutant_rate: 0.2,
            mutation_step: 0.1,
            rng_seed: None,
            max_concurrency: None,
            databases: Vec::new(),
            bounds: ParameterBounds::default(),
            seed_parameters: ScoringWeights::default(),
            recombination: RecombinationKind::default(),
            scoring: ScoringOptions::default(),
        }
    }
}

fn share(population_size: usize, rate: f64) -> usize {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let count = (population_size as f64 * rate).round() as usize;
    count
}

fn check_rate(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRate { name, value })
    }
}

impl TrainerSettings {
    /// Parses settings from a YAML document.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed documents.
    pub fn from_yaml_str(document: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(document)?)
    }

    /// Individuals kept after ranking.
    #[must_use]
    pub fn survivor_count(&self) -> usize {
        share(self.population_size, self.survival_rate)
    }

    /// Individuals produced by recombination.
    #[must_use]
    pub fn offspring_count(&self) -> usize {
        share(self.population_size, self.offspring_rate)
    }

    /// Individuals produced by mutation.
    #[must_use]
    pub fn mutant_count(&self) -> usize {
        share(self.population_size, self.mutant_rate)
    }

    /// Gene layout of the configured databases.
    ///
    /// # Errors
    /// Returns [`ConfigError`] without databases or with invalid bounds.
    pub fn parameter_space(&self) -> Result<ParameterSpace, ConfigError> {
        ParameterSpace::new(self.databases.iter().cloned(), self.bounds.clone())
    }

    /// Checks sizes, rates, bounds and seed weights.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::InvalidPopulationSize(self.population_size));
        }
        if self.generations == 0 {
            return Err(ConfigError::InvalidGenerationCount(self.generations));
        }
        check_rate("survival_rate", self.survival_rate)?;
        check_rate("offspring_rate", self.offspring_rate)?;
        check_rate("mutant_rate", self.mutant_rate)?;
        if !(self.mutation_step.is_finite() && self.mutation_step >= 0.0) {
            return Err(ConfigError::InvalidMutationStep(self.mutation_step));
        }
        if self.max_concurrency == Some(0) {
            return Err(ConfigError::InvalidConcurrency);
        }

        let survivors = self.survivor_count();
        if survivors == 0 {
            return Err(ConfigError::NoSurvivors {
                rate: self.survival_rate,
                population_size: self.population_size,
            });
        }
        let offspring = self.offspring_count();
        let mutants = self.mutant_count();
        if survivors + offspring + mutants > self.population_size {
            return Err(ConfigError::RatesExceedPopulation {
                survivors,
                offspring,
                mutants,
                population_size: self.population_size,
            });
        }

        self.recombination.build()?;
        let space = self.parameter_space()?;
        space.check_seed(&self.seed_parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DatabaseWeights;

    fn settings() -> TrainerSettings {
        let mut settings = TrainerSettings {
            population_size: 10,
            databases: vec!["swissprot".into()],
            ..TrainerSettings::default()
        };
        settings.seed_parameters.databases.insert(
            "swissprot".into(),
            DatabaseWeights {
                weight: 50.0,
                description_score_bit_score_weight: 0.5,
            },
        );
        settings
    }

    #[test]
    fn defaults_validate_with_a_seeded_database() {
        settings().validate().unwrap();
    }

    #[test]
    fn counts_round_to_nearest() {
        let mut settings = settings();
        assert_eq!(settings.survivor_count(), 2);
        settings.population_size = 13;
        assert_eq!(settings.offspring_count(), 3);
        settings.mutant_rate = 0.25;
        settings.population_size = 10;
        assert_eq!(settings.mutant_count(), 3);
    }

    #[test]
    fn rejects_empty_population_and_generations() {
        let mut settings = settings();
        settings.population_size = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidPopulationSize(0))
        ));
        settings.population_size = 10;
        settings.generations = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidGenerationCount(0))
        ));
    }

    #[test]
    fn rejects_rates_outside_unit_interval() {
        let mut settings = settings();
        settings.offspring_rate = 1.5;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidRate {
                name: "offspring_rate",
                ..
            })
        ));
    }

    #[test]
    fn rejects_populations_without_survivors() {
        let mut settings = settings();
        settings.survival_rate = 0.01;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::NoSurvivors { .. })
        ));
    }

    #[test]
    fn rejects_overfull_generations() {
        let mut settings = settings();
        settings.survival_rate = 0.5;
        settings.offspring_rate = 0.4;
        settings.mutant_rate = 0.2;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::RatesExceedPopulation { .. })
        ));
    }

    #[test]
    fn rejects_seed_outside_bounds() {
        let mut settings = settings();
        settings.seed_parameters.domain_similarity_weight = 1.5;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::SeedOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_missing_databases() {
        let mut settings = settings();
        settings.databases.push("trembl".into());
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::MissingSeedDatabase(name)) if name == "trembl"
        ));
        settings.databases.clear();
        assert!(matches!(settings.validate(), Err(ConfigError::NoDatabases)));
    }

    #[test]
    fn parses_recombination_and_scoring_options() {
        let settings = TrainerSettings::from_yaml_str(
            r"
databases: [swissprot, trembl]
max_concurrency: 4
recombination:
  kind: blend
  alpha: 0.3
scoring:
  evaluate_ontology: true
  token_blacklist: [putative]
",
        )
        .unwrap();
        assert_eq!(settings.max_concurrency, Some(4));
        assert_eq!(settings.recombination, RecombinationKind::Blend { alpha: 0.3 });
        assert!(settings.scoring.evaluate_ontology);
        assert!(settings.scoring.domain_architecture_similarity);
        assert_eq!(settings.scoring.token_blacklist.len(), 1);
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = TrainerSettings::from_yaml_str("population_size: [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
