#![warn(missing_docs)]

//! Training of the weights that drive human-readable description scoring.
//!
//! Candidate descriptions of a query protein come from homology-search hits.
//! The [`scoring`] pipeline tokenises them, blends bit scores, database trust,
//! alignment overlap and domain architecture similarity into a score per
//! description, and selects the best one. A [`GeneticTrainer`] breeds
//! [`ParameterSet`]s of those weights and keeps the set whose selections agree
//! best with a reference annotation.
//!
//! ```
//! use hrd_trainer::{
//!     CandidateHit, Corpus, DomainTable, Entity, GeneticTrainer, ReferenceSet, TrainerSettings,
//! };
//! use std::sync::Arc;
//!
//! let mut entity = Entity::new("Q1", 120);
//! entity.add_hit("swissprot", CandidateHit::new("P1", "ABC transporter", 80.0));
//! entity.add_hit("swissprot", CandidateHit::new("P2", "Serine kinase", 40.0));
//! let corpus: Corpus = [entity].into_iter().collect();
//!
//! let mut references = ReferenceSet::new();
//! references.insert_description("Q1", "ABC transporter");
//!
//! let settings = TrainerSettings::from_yaml_str(
//!     r"
//! population_size: 10
//! generations: 3
//! rng_seed: 7
//! databases: [swissprot]
//! seed_parameters:
//!   databases:
//!     swissprot: { weight: 50.0, description_score_bit_score_weight: 0.5 }
//! ",
//! )
//! .unwrap();
//!
//! let mut trainer = GeneticTrainer::from_settings(
//!     settings,
//!     Arc::new(corpus),
//!     Arc::new(DomainTable::new()),
//!     Arc::new(references),
//! )
//! .unwrap();
//! let mut rng = trainer.rng();
//! let report = trainer.run(&mut rng).unwrap();
//! assert!(report.best.score().unwrap() <= report.avg_max_evaluation_score + 1e-12);
//! ```

mod config;
pub mod core;
pub mod error;
pub mod model;
pub mod ops;
pub mod output;
pub mod parallel;
pub mod scoring;
pub mod trainer;

pub use crate::config::TrainerSettings;
pub use crate::core::{
    DatabaseWeights, Fitness, Individual, IndividualId, Origin, ParameterBounds, ParameterSet,
    ParameterSpace, Population, ScoringWeights, TrainingStats, WeightRange,
};
pub use crate::error::{ConfigError, TrainingError, TrainingResult};
pub use crate::model::{CandidateHit, Corpus, DomainTable, Entity, ReferenceSet};
pub use crate::trainer::{GeneticTrainer, GeneticTrainerBuilder, TrainingReport};
