//! Genetic optimisation of the scoring weights.
//!
//! Construct the trainer through [`GeneticTrainer::builder`] (any
//! [`PopulationEvaluator`]) or [`GeneticTrainer::from_settings`] (the scoring
//! pipeline over shared inputs), then call [`GeneticTrainer::run`] with a
//! random number generator.
//!
//! Each generation evaluates the unscored individuals, keeps the fittest
//! survivors, recombines and mutates rank-biased survivors, and refills the
//! population with random individuals.

use crate::config::TrainerSettings;
use crate::core::{ParameterSet, ParameterSpace, Population, TrainingStats};
use crate::error::{ConfigError, TrainingResult};
use crate::model::{Corpus, DomainTable, ReferenceSet};
use crate::ops::{
    GaussianNeighbour, MutationOperator, RankBiasedSelection, RecombinationOperator,
    SelectionOperator,
};
use crate::output::{FinalReport, GenerationReport, TracingOutput, TrainerOutput};
use crate::parallel::{PipelineEvaluator, PopulationEvaluator};
use crate::scoring::ScoringPipeline;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Attempts allowed per requested offspring or mutant.
const ATTEMPTS_PER_SLOT: usize = 3;

/// Outcome of [`GeneticTrainer::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    /// Best parameter set of the run, with its fitness.
    pub best: ParameterSet,
    /// Generation in which the best set was found.
    pub generation_found: usize,
    /// Mean over entities of the best score a single candidate could reach.
    pub avg_max_evaluation_score: f64,
    /// Per-generation statistics.
    pub stats: TrainingStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Breeding {
    added: usize,
    attempts: usize,
}

/// Builder returned by [`GeneticTrainer::builder`].
pub struct GeneticTrainerBuilder<E, O = TracingOutput> {
    settings: TrainerSettings,
    evaluator: E,
    output: O,
    selection: Option<Box<dyn SelectionOperator>>,
    recombination: Option<Box<dyn RecombinationOperator>>,
    mutation: Option<Box<dyn MutationOperator>>,
    avg_max_evaluation_score: f64,
}

impl<E, O> GeneticTrainerBuilder<E, O>
where
    E: PopulationEvaluator,
    O: TrainerOutput,
{
    /// Replaces the parent selection operator.
    #[must_use]
    pub fn selection(mut self, operator: impl SelectionOperator + 'static) -> Self {
        self.selection = Some(Box::new(operator));
        self
    }

    /// Replaces the recombination operator chosen in the settings.
    #[must_use]
    pub fn recombination(mut self, operator: impl RecombinationOperator + 'static) -> Self {
        self.recombination = Some(Box::new(operator));
        self
    }

    /// Replaces the Gaussian neighbour operator.
    #[must_use]
    pub fn mutation(mut self, operator: impl MutationOperator + 'static) -> Self {
        self.mutation = Some(Box::new(operator));
        self
    }

    /// Records the average maximum achievable evaluation score for the final
    /// report.
    #[must_use]
    pub fn avg_max_evaluation_score(mut self, score: f64) -> Self {
        self.avg_max_evaluation_score = score;
        self
    }

    /// Replaces the progress sink.
    #[must_use]
    pub fn output<P: TrainerOutput>(self, output: P) -> GeneticTrainerBuilder<E, P> {
        GeneticTrainerBuilder {
            settings: self.settings,
            evaluator: self.evaluator,
            output,
            selection: self.selection,
            recombination: self.recombination,
            mutation: self.mutation,
            avg_max_evaluation_score: self.avg_max_evaluation_score,
        }
    }

    /// Validates the settings and finalises the trainer.
    ///
    /// # Errors
    /// Returns [`crate::TrainingError::Config`] for invalid settings.
    pub fn build(self) -> TrainingResult<GeneticTrainer<E, O>> {
        self.settings.validate()?;
        let space = self.settings.parameter_space()?;
        let recombination = match self.recombination {
            Some(operator) => operator,
            None => self.settings.recombination.build()?,
        };
        let mutation: Box<dyn MutationOperator> = match self.mutation {
            Some(operator) => operator,
            None => Box::new(GaussianNeighbour::for_space(
                &space,
                self.settings.mutation_step,
            )?),
        };
        let selection: Box<dyn SelectionOperator> = match self.selection {
            Some(operator) => operator,
            None => Box::new(RankBiasedSelection),
        };
        Ok(GeneticTrainer {
            settings: self.settings,
            space,
            evaluator: self.evaluator,
            output: self.output,
            selection,
            recombination,
            mutation,
            avg_max_evaluation_score: self.avg_max_evaluation_score,
        })
    }
}

/// Generational genetic trainer over [`ParameterSet`]s.
pub struct GeneticTrainer<E, O = TracingOutput> {
    settings: TrainerSettings,
    space: ParameterSpace,
    evaluator: E,
    output: O,
    selection: Box<dyn SelectionOperator>,
    recombination: Box<dyn RecombinationOperator>,
    mutation: Box<dyn MutationOperator>,
    avg_max_evaluation_score: f64,
}

impl<E> GeneticTrainer<E, TracingOutput>
where
    E: PopulationEvaluator,
{
    /// Creates a builder using the default operators and [`TracingOutput`].
    #[must_use]
    pub fn builder(settings: TrainerSettings, evaluator: E) -> GeneticTrainerBuilder<E> {
        GeneticTrainerBuilder {
            settings,
            evaluator,
            output: TracingOutput,
            selection: None,
            recombination: None,
            mutation: None,
            avg_max_evaluation_score: 0.0,
        }
    }
}

impl GeneticTrainer<PipelineEvaluator, TracingOutput> {
    /// Creates a trainer that scores `corpus` with the pipeline configured in
    /// `settings`, in parallel when `max_concurrency` is set.
    ///
    /// # Errors
    /// Returns [`crate::TrainingError::Config`] for invalid settings and the
    /// reference errors of
    /// [`ScoringPipeline::avg_max_evaluation_score`].
    pub fn from_settings(
        settings: TrainerSettings,
        corpus: Arc<Corpus>,
        domains: Arc<DomainTable>,
        references: Arc<ReferenceSet>,
    ) -> TrainingResult<Self> {
        settings.validate()?;
        let pipeline = ScoringPipeline::new(corpus, domains, references, settings.scoring.clone());
        let avg_max = pipeline.avg_max_evaluation_score()?;
        let evaluator = PipelineEvaluator::new(pipeline, settings.max_concurrency)?;
        GeneticTrainer::builder(settings, evaluator)
            .avg_max_evaluation_score(avg_max)
            .build()
    }
}

impl<E, O> GeneticTrainer<E, O>
where
    E: PopulationEvaluator,
    O: TrainerOutput,
{
    /// The validated settings.
    #[must_use]
    pub fn settings(&self) -> &TrainerSettings {
        &self.settings
    }

    /// Gene layout of the configured databases.
    #[must_use]
    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    /// Random number generator seeded from the settings, or from entropy when
    /// no seed is configured.
    #[must_use]
    pub fn rng(&self) -> StdRng {
        match self.settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Runs all generations and returns the best parameter set.
    ///
    /// # Errors
    /// The first evaluation or output error aborts the run.
    pub fn run<R: Rng>(&mut self, rng: &mut R) -> TrainingResult<TrainingReport> {
        let mut population = Population::new(self.space.clone());
        population.push(ParameterSet::seed(
            self.settings.seed_parameters.clone(),
            &self.space,
        ))?;
        self.refill(&mut population, rng)?;

        let mut best: Option<(ParameterSet, usize)> = None;
        let mut stats = TrainingStats::new();
        for generation in 1..=self.settings.generations {
            self.evaluate(&mut population)?;
            stats.record(&population);
            let mean_score = population.mean_score();
            let diversity = population.diversity();

            let Some(top) = population.best().map(|individual| individual.set().clone()) else {
                break;
            };
            let top_score = top.score().unwrap_or(0.0);
            let previous = best.as_ref().and_then(|(set, _)| set.score());
            let score_delta = previous.map_or(0.0, |score| top_score - score);
            if previous.map_or(true, |score| top_score > score) {
                best = Some((top, generation));
            }

            self.breed(&mut population, rng)?;

            if let Some((best_set, _)) = &best {
                self.output.write_generation(&GenerationReport {
                    generation,
                    best: best_set.clone(),
                    score_delta,
                    origin: best_set.origin(),
                    mean_score,
                    diversity,
                    population_size: population.len(),
                })?;
            }
        }

        let Some((best, generation_found)) = best else {
            return Err(ConfigError::InvalidGenerationCount(self.settings.generations).into());
        };
        let final_report = FinalReport {
            best: best.clone(),
            avg_max_evaluation_score: self.avg_max_evaluation_score,
            generation_found,
        };
        self.output.write_final(&final_report)?;
        Ok(TrainingReport {
            best,
            generation_found,
            avg_max_evaluation_score: self.avg_max_evaluation_score,
            stats,
        })
    }

    fn evaluate(&mut self, population: &mut Population) -> TrainingResult<()> {
        let pending = population.unscored();
        if pending.is_empty() {
            return Ok(());
        }
        let batch: Vec<_> = pending
            .iter()
            .map(|&idx| population.individuals()[idx].set().weights().clone())
            .collect();
        let fitness = self.evaluator.evaluate_batch(&batch)?;
        for (idx, result) in pending.into_iter().zip(fitness) {
            population.set_fitness(idx, result);
        }
        debug!(evaluated = batch.len(), "evaluated unscored individuals");
        Ok(())
    }

    fn breed<R: Rng>(&self, population: &mut Population, rng: &mut R) -> TrainingResult<()> {
        let survivors = self.settings.survivor_count();
        let offspring = self.settings.offspring_count();
        let mutants = self.settings.mutant_count();

        population.retain_fittest(survivors);
        let ranked: Vec<ParameterSet> = population
            .individuals()
            .iter()
            .map(|individual| individual.set().clone())
            .collect();

        let recombined = self.recombine(population, &ranked, survivors + offspring, rng)?;
        if recombined.added < offspring {
            info!(
                offspring = recombined.added,
                attempts = recombined.attempts,
                "recombination exhausted, survivors have converged"
            );
        }
        let mutated = self.mutate(population, &ranked, survivors + offspring + mutants, rng)?;
        if mutated.added < mutants {
            info!(
                mutants = mutated.added,
                attempts = mutated.attempts,
                "mutation exhausted"
            );
        }
        self.refill(population, rng)
    }

    fn recombine<R: Rng>(
        &self,
        population: &mut Population,
        ranked: &[ParameterSet],
        target: usize,
        rng: &mut R,
    ) -> TrainingResult<Breeding> {
        let mut breeding = Breeding::default();
        if ranked.len() < 2 {
            return Ok(breeding);
        }
        let budget = ATTEMPTS_PER_SLOT * target.saturating_sub(ranked.len());
        while population.len() < target && breeding.attempts < budget {
            breeding.attempts += 1;
            let Some((mama, papa)) = self.selection.select_distinct_pair(ranked.len(), rng) else {
                break;
            };
            let (Some(mama), Some(papa)) = (ranked.get(mama), ranked.get(papa)) else {
                continue;
            };
            let child = mama.recombine(papa, &self.space, &*self.recombination, rng)?;
            if population.insert(child)?.is_some() {
                breeding.added += 1;
            }
        }
        Ok(breeding)
    }

    fn mutate<R: Rng>(
        &self,
        population: &mut Population,
        ranked: &[ParameterSet],
        target: usize,
        rng: &mut R,
    ) -> TrainingResult<Breeding> {
        let mut breeding = Breeding::default();
        let budget = ATTEMPTS_PER_SLOT * target.saturating_sub(population.len());
        while population.len() < target && breeding.attempts < budget {
            breeding.attempts += 1;
            let Some(rank) = self.selection.select_rank(ranked.len(), rng) else {
                break;
            };
            let Some(parent) = ranked.get(rank) else {
                continue;
            };
            let mutant = parent.neighbour(&self.space, &*self.mutation, rng)?;
            if population.insert(mutant)?.is_some() {
                breeding.added += 1;
            }
        }
        Ok(breeding)
    }

    fn refill<R: Rng>(&self, population: &mut Population, rng: &mut R) -> TrainingResult<()> {
        while population.len() < self.settings.population_size {
            population.push(ParameterSet::random(&self.space, rng))?;
        }
        Ok(())
    }
}
