//! Description scoring and evaluation.
//!
//! For every entity the pipeline builds a domain vector space, tokenises the
//! candidate descriptions, aggregates token scores, scores each description
//! and selects the best one. The selection is then compared with the
//! reference annotation.

mod description;
mod evaluation;
mod pipeline;
mod token;
mod vector_space;

pub use description::{description_scores, select_best};
pub use evaluation::{f_measure, EntityEvaluation, TokenRates};
pub use pipeline::{Assignment, EvaluationContext, ScoringOptions, ScoringPipeline};
pub use token::{tokenize, TokenScores};
pub use vector_space::{
    build_basis, compute_domain_similarity_scores, cosine_similarity, project, DomainScores,
};
