//! The full scoring and evaluation pass run for every fitness evaluation.

use super::{
    compute_domain_similarity_scores, description_scores, f_measure, select_best, tokenize,
    DomainScores, EntityEvaluation, TokenRates, TokenScores,
};
use crate::core::{Fitness, ScoringWeights};
use crate::error::{TrainingError, TrainingResult};
use crate::model::{CandidateHit, Corpus, DomainTable, Entity, ReferenceSet};
use crate::ops::FitnessFunction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Tokens dropped from every description before scoring.
const DEFAULT_TOKEN_BLACKLIST: &[&str] = &[
    "a",
    "and",
    "fragment",
    "homolog",
    "like",
    "of",
    "predicted",
    "probable",
    "protein",
    "putative",
    "similar",
    "the",
    "to",
    "uncharacterized",
];

/// Switches and constants of the scoring pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringOptions {
    /// Blend domain architecture similarity into token and description
    /// scores.
    pub domain_architecture_similarity: bool,
    /// Also compare ontology terms of the selected hit with the reference.
    pub evaluate_ontology: bool,
    /// Lower-case tokens ignored in every description.
    pub token_blacklist: BTreeSet<String>,
    /// `beta` of the description F-measure.
    pub f_measure_beta: f64,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            domain_architecture_similarity: true,
            evaluate_ontology: false,
            token_blacklist: DEFAULT_TOKEN_BLACKLIST
                .iter()
                .map(|token| (*token).to_string())
                .collect(),
            f_measure_beta: 1.0,
        }
    }
}

/// Scratch values of one entity, reused across the entities of an
/// evaluation.
///
/// Every vector is aligned with [`Entity::candidates`].
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    domain_scores: DomainScores,
    candidate_tokens: Vec<BTreeSet<String>>,
    token_scores: TokenScores,
    description_scores: Vec<Option<f64>>,
    selected: Option<usize>,
}

impl EvaluationContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.domain_scores = DomainScores::default();
        self.candidate_tokens.clear();
        self.description_scores.clear();
        self.selected = None;
    }

    /// Domain vectors and similarities of the last scored entity.
    #[must_use]
    pub fn domain_scores(&self) -> &DomainScores {
        &self.domain_scores
    }

    /// Token sets of the last scored entity's candidates.
    #[must_use]
    pub fn candidate_tokens(&self) -> &[BTreeSet<String>] {
        &self.candidate_tokens
    }

    /// Token scores of the last scored entity.
    #[must_use]
    pub fn token_scores(&self) -> &TokenScores {
        &self.token_scores
    }

    /// Description scores of the last scored entity's candidates.
    #[must_use]
    pub fn description_scores(&self) -> &[Option<f64>] {
        &self.description_scores
    }

    /// Position of the selected candidate of the last scored entity.
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }
}

/// Description chosen for one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    /// Accession of the entity.
    pub entity: String,
    /// Database of the selected hit.
    pub database: String,
    /// Accession of the selected hit.
    pub accession: String,
    /// Description of the selected hit.
    pub description: String,
    /// Description score of the selected hit.
    pub score: f64,
}

/// Scores a corpus under arbitrary weights and evaluates the result against
/// the reference set.
///
/// All inputs are shared read-only, so one pipeline can serve concurrent
/// evaluations; each call allocates its own [`EvaluationContext`].
#[derive(Debug, Clone)]
pub struct ScoringPipeline {
    corpus: Arc<Corpus>,
    domains: Arc<DomainTable>,
    references: Arc<ReferenceSet>,
    options: ScoringOptions,
}

impl ScoringPipeline {
    /// Creates a pipeline over shared inputs.
    #[must_use]
    pub fn new(
        corpus: Arc<Corpus>,
        domains: Arc<DomainTable>,
        references: Arc<ReferenceSet>,
        options: ScoringOptions,
    ) -> Self {
        Self {
            corpus,
            domains,
            references,
            options,
        }
    }

    /// The scored entities.
    #[must_use]
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    fn domain_weight(&self, weights: &ScoringWeights) -> f64 {
        if self.options.domain_architecture_similarity {
            weights.domain_similarity_weight
        } else {
            0.0
        }
    }

    /// Scores every candidate of `entity` into `context` and returns the
    /// position of the selected one.
    ///
    /// # Errors
    /// Returns [`TrainingError::MissingDomainWeight`] or
    /// [`TrainingError::MissingDatabaseWeights`] on incomplete inputs.
    pub fn score_entity(
        &self,
        entity: &Entity,
        weights: &ScoringWeights,
        context: &mut EvaluationContext,
    ) -> TrainingResult<Option<usize>> {
        context.reset();
        let domain_weight = self.domain_weight(weights);
        if self.options.domain_architecture_similarity {
            compute_domain_similarity_scores(entity, &self.domains, &mut context.domain_scores)?;
        } else {
            context.domain_scores.similarities = vec![0.0; entity.candidate_count()];
        }
        context.candidate_tokens.extend(
            entity
                .candidates()
                .map(|(_, hit)| tokenize(hit.description(), &self.options.token_blacklist)),
        );
        context.token_scores.measure(
            entity,
            &context.candidate_tokens,
            &context.domain_scores.similarities,
            weights,
            domain_weight,
        )?;
        context.description_scores = description_scores(
            entity,
            &context.candidate_tokens,
            &context.domain_scores.similarities,
            &context.token_scores,
            weights,
            domain_weight,
        )?;
        context.selected = select_best(&context.description_scores);
        Ok(context.selected)
    }

    fn reference_tokens(&self, entity: &Entity) -> TrainingResult<BTreeSet<String>> {
        let description = self.references.description(entity.accession()).ok_or_else(|| {
            TrainingError::MissingReference {
                entity: entity.accession().to_string(),
            }
        })?;
        // Only blacklisted tokens is a valid, uninformative reference.
        if tokenize(description, &BTreeSet::new()).is_empty() {
            return Err(TrainingError::MalformedReference {
                entity: entity.accession().to_string(),
                reason: format!("no words in {description:?}"),
            });
        }
        Ok(tokenize(description, &self.options.token_blacklist))
    }

    fn reference_terms(&self, entity: &Entity) -> TrainingResult<&BTreeSet<String>> {
        self.references
            .ontology_terms(entity.accession())
            .ok_or_else(|| TrainingError::MissingReferenceAnnotations {
                entity: entity.accession().to_string(),
            })
    }

    /// Scores `entity` and compares its selected description with the
    /// reference.
    ///
    /// # Errors
    /// Besides the errors of [`ScoringPipeline::score_entity`], returns
    /// [`TrainingError::MissingReference`],
    /// [`TrainingError::MalformedReference`] and, with ontology evaluation
    /// enabled, [`TrainingError::MissingReferenceAnnotations`].
    pub fn evaluate_entity(
        &self,
        entity: &Entity,
        weights: &ScoringWeights,
        context: &mut EvaluationContext,
    ) -> TrainingResult<EntityEvaluation> {
        let reference = self.reference_tokens(entity)?;
        let selected = self.score_entity(entity, weights, context)?;
        let hit: Option<&CandidateHit> =
            selected.and_then(|idx| entity.candidates().nth(idx).map(|(_, hit)| hit));

        let no_tokens = BTreeSet::new();
        let assigned = selected.map_or(&no_tokens, |idx| &context.candidate_tokens[idx]);
        let mut universe: BTreeSet<String> =
            context.candidate_tokens.iter().flatten().cloned().collect();
        universe.extend(reference.iter().cloned());

        let ontology_score = if self.options.evaluate_ontology {
            let reference_terms = self.reference_terms(entity)?;
            let assigned_terms = hit.map_or(&no_tokens, CandidateHit::ontology_terms);
            Some(f_measure(
                assigned_terms,
                reference_terms,
                self.options.f_measure_beta,
            ))
        } else {
            None
        };

        Ok(EntityEvaluation {
            evaluation_score: f_measure(assigned, &reference, self.options.f_measure_beta),
            rates: TokenRates::measure(assigned, &reference, &universe),
            ontology_score,
        })
    }

    /// Evaluates `weights` over the whole corpus reusing `context`.
    ///
    /// # Errors
    /// Propagates the first error of [`ScoringPipeline::evaluate_entity`].
    pub fn evaluate_with(
        &self,
        weights: &ScoringWeights,
        context: &mut EvaluationContext,
    ) -> TrainingResult<Fitness> {
        let mut evaluation = 0.0;
        let mut true_positive = 0.0;
        let mut false_positive = 0.0;
        let mut ontology = 0.0;
        for entity in self.corpus.entities() {
            let result = self.evaluate_entity(entity, weights, context)?;
            evaluation += result.evaluation_score;
            true_positive += result.rates.true_positive_rate;
            false_positive += result.rates.false_positive_rate;
            ontology += result.ontology_score.unwrap_or(0.0);
        }

        let entities = self.corpus.len().max(1);
        #[allow(clippy::cast_precision_loss)]
        let count = entities as f64;
        let fitness = Fitness {
            avg_evaluation_score: evaluation / count,
            avg_true_positive_rate: true_positive / count,
            avg_false_positive_rate: false_positive / count,
            avg_ontology_score: self.options.evaluate_ontology.then_some(ontology / count),
        };
        debug!(
            entities = self.corpus.len(),
            score = fitness.avg_evaluation_score,
            tpr = fitness.avg_true_positive_rate,
            fpr = fitness.avg_false_positive_rate,
            "evaluated parameter set"
        );
        Ok(fitness)
    }

    /// Mean over entities of the best evaluation score any single candidate
    /// description would reach. Entities without candidates contribute zero.
    ///
    /// # Errors
    /// Returns [`TrainingError::MissingReference`] or
    /// [`TrainingError::MalformedReference`] on incomplete references.
    pub fn avg_max_evaluation_score(&self) -> TrainingResult<f64> {
        let mut sum = 0.0;
        for entity in self.corpus.entities() {
            let reference = self.reference_tokens(entity)?;
            let best = entity
                .candidates()
                .map(|(_, hit)| {
                    let tokens = tokenize(hit.description(), &self.options.token_blacklist);
                    f_measure(&tokens, &reference, self.options.f_measure_beta)
                })
                .fold(0.0, f64::max);
            sum += best;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.corpus.len().max(1) as f64;
        Ok(sum / count)
    }

    /// Selects a description for every entity of the corpus under `weights`.
    /// Entities without a usable candidate are left out.
    ///
    /// # Errors
    /// Propagates the errors of [`ScoringPipeline::score_entity`].
    pub fn assign_descriptions(&self, weights: &ScoringWeights) -> TrainingResult<Vec<Assignment>> {
        let mut context = EvaluationContext::new();
        let mut assignments = Vec::new();
        for entity in self.corpus.entities() {
            let Some(idx) = self.score_entity(entity, weights, &mut context)? else {
                continue;
            };
            if let Some((database, hit)) = entity.candidates().nth(idx) {
                assignments.push(Assignment {
                    entity: entity.accession().to_string(),
                    database: database.to_string(),
                    accession: hit.accession().to_string(),
                    description: hit.description().to_string(),
                    score: context.description_scores[idx].unwrap_or(0.0),
                });
            }
        }
        Ok(assignments)
    }
}

impl FitnessFunction for ScoringPipeline {
    fn evaluate(&self, weights: &ScoringWeights) -> TrainingResult<Fitness> {
        let mut context = EvaluationContext::new();
        self.evaluate_with(weights, &mut context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DatabaseWeights;

    fn weights() -> ScoringWeights {
        let mut weights = ScoringWeights::default();
        for name in ["swissprot", "trembl"] {
            weights.databases.insert(
                name.into(),
                DatabaseWeights {
                    weight: 50.0,
                    description_score_bit_score_weight: 0.5,
                },
            );
        }
        weights
    }

    fn pipeline(options: ScoringOptions) -> ScoringPipeline {
        let mut table = DomainTable::new();
        table.insert_domain("IPR1", 1.0);
        table.insert_domain("IPR2", 1.0);
        table.annotate("P1", "IPR1");
        table.annotate("T1", "IPR2");

        let mut first = Entity::new("Q1", 200).with_domains(["IPR1"]);
        first.add_hit(
            "swissprot",
            CandidateHit::new("P1", "ABC transporter", 100.0)
                .with_alignment(1, 200, 1, 200, 200)
                .with_ontology_terms(["GO:0005524"]),
        );
        first.add_hit(
            "trembl",
            CandidateHit::new("T1", "Serine kinase", 60.0)
                .with_alignment(1, 100, 1, 100, 300)
                .with_ontology_terms(["GO:0004672"]),
        );
        let second = Entity::new("Q2", 100);

        let mut references = ReferenceSet::new();
        references.insert_description("Q1", "ABC transporter ATP-binding");
        references.insert_description("Q2", "Heat shock");
        references.insert_ontology_terms("Q1", ["GO:0005524"]);
        references.insert_ontology_terms("Q2", ["GO:0006950"]);

        ScoringPipeline::new(
            Arc::new([first, second].into_iter().collect()),
            Arc::new(table),
            Arc::new(references),
            options,
        )
    }

    #[test]
    fn selects_the_consistent_candidate() {
        let pipeline = pipeline(ScoringOptions::default());
        let mut context = EvaluationContext::new();
        let entity = &pipeline.corpus().entities()[0];
        let selected = pipeline.score_entity(entity, &weights(), &mut context).unwrap();
        assert_eq!(selected, Some(0));
        assert_eq!(context.domain_scores().similarities, vec![1.0, 0.0]);
        assert!(context.token_scores().is_informative("transporter"));
    }

    #[test]
    fn fitness_averages_over_entities() {
        let pipeline = pipeline(ScoringOptions::default());
        let fitness = pipeline.evaluate(&weights()).unwrap();
        // Q1: assigned {abc, transporter} vs {abc, transporter, atp, binding}.
        let q1 = 2.0 * 1.0 * 0.5 / 1.5;
        assert!((fitness.avg_evaluation_score - q1 / 2.0).abs() < 1e-12);
        assert!((fitness.avg_true_positive_rate - 0.25).abs() < 1e-12);
        assert_eq!(fitness.avg_false_positive_rate, 0.0);
        assert_eq!(fitness.avg_ontology_score, None);
    }

    #[test]
    fn ontology_scores_are_optional() {
        let options = ScoringOptions {
            evaluate_ontology: true,
            ..ScoringOptions::default()
        };
        let fitness = pipeline(options).evaluate(&weights()).unwrap();
        assert_eq!(fitness.avg_ontology_score, Some(0.5));
    }

    #[test]
    fn rescoring_is_deterministic() {
        let pipeline = pipeline(ScoringOptions::default());
        let first = pipeline.evaluate(&weights()).unwrap();
        let second = pipeline.evaluate(&weights().clone()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn disabling_domains_skips_the_vector_space() {
        let options = ScoringOptions {
            domain_architecture_similarity: false,
            ..ScoringOptions::default()
        };
        let pipeline = pipeline(options);
        let mut context = EvaluationContext::new();
        let entity = &pipeline.corpus().entities()[0];
        pipeline.score_entity(entity, &weights(), &mut context).unwrap();
        assert!(context.domain_scores().basis.is_empty());
        assert_eq!(context.domain_scores().similarities, vec![0.0, 0.0]);
    }

    #[test]
    fn missing_reference_is_fatal() {
        let pipeline = pipeline(ScoringOptions::default());
        let mut context = EvaluationContext::new();
        let stranger = Entity::new("Q404", 10);
        let err = pipeline
            .evaluate_entity(&stranger, &weights(), &mut context)
            .unwrap_err();
        assert!(matches!(err, TrainingError::MissingReference { .. }));
    }

    fn single_reference_pipeline(reference: &str) -> ScoringPipeline {
        let mut entity = Entity::new("Q1", 100);
        entity.add_hit("swissprot", CandidateHit::new("P1", "Uncharacterized protein", 80.0));
        entity.add_hit("trembl", CandidateHit::new("T1", "Serine kinase", 60.0));
        let mut references = ReferenceSet::new();
        references.insert_description("Q1", reference);
        ScoringPipeline::new(
            Arc::new([entity].into_iter().collect()),
            Arc::new(DomainTable::new()),
            Arc::new(references),
            ScoringOptions::default(),
        )
    }

    #[test]
    fn blacklisted_reference_scores_zero() {
        let pipeline = single_reference_pipeline("Uncharacterized protein");
        let fitness = pipeline.evaluate(&weights()).unwrap();
        assert_eq!(fitness.avg_evaluation_score, 0.0);
        assert_eq!(fitness.avg_true_positive_rate, 0.0);
        assert_eq!(pipeline.avg_max_evaluation_score().unwrap(), 0.0);
    }

    #[test]
    fn reference_without_words_is_malformed() {
        let pipeline = single_reference_pipeline(" -- ");
        let err = pipeline.evaluate(&weights()).unwrap_err();
        assert!(matches!(err, TrainingError::MalformedReference { .. }));
        assert!(matches!(
            pipeline.avg_max_evaluation_score(),
            Err(TrainingError::MalformedReference { .. })
        ));
    }

    #[test]
    fn missing_ontology_reference_is_fatal() {
        let mut references = ReferenceSet::new();
        references.insert_description("Q1", "kinase");
        let pipeline = ScoringPipeline::new(
            Arc::new([Entity::new("Q1", 10)].into_iter().collect()),
            Arc::new(DomainTable::new()),
            Arc::new(references),
            ScoringOptions {
                evaluate_ontology: true,
                ..ScoringOptions::default()
            },
        );
        let err = pipeline.evaluate(&weights()).unwrap_err();
        assert!(matches!(err, TrainingError::MissingReferenceAnnotations { .. }));
    }

    #[test]
    fn empty_corpus_scores_zero() {
        let pipeline = ScoringPipeline::new(
            Arc::new(Corpus::new()),
            Arc::new(DomainTable::new()),
            Arc::new(ReferenceSet::new()),
            ScoringOptions::default(),
        );
        let fitness = pipeline.evaluate(&weights()).unwrap();
        assert_eq!(fitness.avg_evaluation_score, 0.0);
        assert_eq!(pipeline.avg_max_evaluation_score().unwrap(), 0.0);
    }

    #[test]
    fn avg_max_score_uses_the_best_candidate() {
        let pipeline = pipeline(ScoringOptions::default());
        let q1 = 2.0 * 1.0 * 0.5 / 1.5;
        assert!((pipeline.avg_max_evaluation_score().unwrap() - q1 / 2.0).abs() < 1e-12);
    }

    #[test]
    fn assignments_skip_entities_without_candidates() {
        let pipeline = pipeline(ScoringOptions::default());
        let assignments = pipeline.assign_descriptions(&weights()).unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].entity, "Q1");
        assert_eq!(assignments[0].accession, "P1");
        assert_eq!(assignments[0].description, "ABC transporter");
    }
}
