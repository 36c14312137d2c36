//! Batch evaluation of parameter sets.
//!
//! Every [`FitnessFunction`] evaluates a batch sequentially through the
//! blanket [`PopulationEvaluator`] impl. [`ParallelEvaluator`] spreads a batch
//! over blocking tasks of a Tokio runtime; the fitness function is shared
//! behind an `Arc` and every task builds its own evaluation scratch.

use crate::core::{Fitness, ScoringWeights};
use crate::error::{ConfigError, TrainingError, TrainingResult};
use crate::ops::FitnessFunction;
use crate::scoring::ScoringPipeline;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinSet;
use tracing::debug;

/// Evaluates a batch of weight configurations.
pub trait PopulationEvaluator {
    /// Returns one fitness per entry of `batch`, in the same order.
    ///
    /// # Errors
    /// The first evaluation error aborts the batch.
    fn evaluate_batch(&mut self, batch: &[ScoringWeights]) -> TrainingResult<Vec<Fitness>>;
}

impl<T> PopulationEvaluator for T
where
    T: FitnessFunction,
{
    fn evaluate_batch(&mut self, batch: &[ScoringWeights]) -> TrainingResult<Vec<Fitness>> {
        let mut fitness = Vec::with_capacity(batch.len());
        for weights in batch {
            fitness.push(self.evaluate(weights)?);
        }
        Ok(fitness)
    }
}

type PendingEvaluations = JoinSet<TrainingResult<(usize, Fitness)>>;

/// Evaluates batches concurrently on a multi-threaded Tokio runtime.
///
/// # Examples
/// ```
/// use hrd_trainer::ops::FitnessFunction;
/// use hrd_trainer::parallel::{ParallelEvaluator, PopulationEvaluator};
/// use hrd_trainer::{Fitness, ScoringWeights, TrainingResult};
///
/// struct DomainWeight;
///
/// impl FitnessFunction for DomainWeight {
///     fn evaluate(&self, weights: &ScoringWeights) -> TrainingResult<Fitness> {
///         Ok(Fitness {
///             avg_evaluation_score: weights.domain_similarity_weight,
///             ..Fitness::default()
///         })
///     }
/// }
///
/// let mut evaluator = ParallelEvaluator::with_max_concurrency(DomainWeight, 2).unwrap();
/// let batch = vec![ScoringWeights::default(); 3];
/// let fitness = evaluator.evaluate_batch(&batch).unwrap();
/// assert_eq!(fitness.len(), 3);
/// ```
pub struct ParallelEvaluator<F>
where
    F: FitnessFunction + Send + Sync + 'static,
{
    fitness: Arc<F>,
    runtime: Runtime,
    max_tasks: usize,
}

impl<F> ParallelEvaluator<F>
where
    F: FitnessFunction + Send + Sync + 'static,
{
    /// Creates an evaluator running at most `max_tasks` evaluations at once.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidConcurrency`] for zero tasks and
    /// [`TrainingError::Runtime`] when the runtime cannot start.
    pub fn with_max_concurrency(fitness: F, max_tasks: usize) -> TrainingResult<Self> {
        Self::from_shared(Arc::new(fitness), max_tasks)
    }

    /// Like [`ParallelEvaluator::with_max_concurrency`] for a fitness function
    /// that is already shared.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidConcurrency`] for zero tasks and
    /// [`TrainingError::Runtime`] when the runtime cannot start.
    pub fn from_shared(fitness: Arc<F>, max_tasks: usize) -> TrainingResult<Self> {
        if max_tasks == 0 {
            return Err(ConfigError::InvalidConcurrency.into());
        }
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(TrainingError::Runtime)?;
        Ok(Self {
            fitness,
            runtime,
            max_tasks,
        })
    }

    async fn evaluate_all(&self, batch: &[ScoringWeights]) -> TrainingResult<Vec<Fitness>> {
        let mut pending = PendingEvaluations::new();
        let mut fitness = vec![Fitness::default(); batch.len()];
        for (idx, weights) in batch.iter().enumerate() {
            // A slot frees as soon as any evaluation finishes.
            if pending.len() >= self.max_tasks {
                Self::resolve_next(&mut pending, &mut fitness).await?;
            }
            let function = Arc::clone(&self.fitness);
            let weights = weights.clone();
            pending.spawn_blocking(move || -> TrainingResult<(usize, Fitness)> {
                let result = function.evaluate(&weights)?;
                Ok((idx, result))
            });
        }
        while !pending.is_empty() {
            Self::resolve_next(&mut pending, &mut fitness).await?;
        }
        Ok(fitness)
    }

    async fn resolve_next(
        pending: &mut PendingEvaluations,
        fitness: &mut [Fitness],
    ) -> TrainingResult<()> {
        if let Some(joined) = pending.join_next().await {
            let (idx, result) = joined??;
            if let Some(slot) = fitness.get_mut(idx) {
                *slot = result;
            }
        }
        Ok(())
    }
}

impl<F> PopulationEvaluator for ParallelEvaluator<F>
where
    F: FitnessFunction + Send + Sync + 'static,
{
    fn evaluate_batch(&mut self, batch: &[ScoringWeights]) -> TrainingResult<Vec<Fitness>> {
        debug!(batch = batch.len(), max_tasks = self.max_tasks, "parallel evaluation");
        self.runtime.block_on(self.evaluate_all(batch))
    }
}

/// Evaluator of a [`ScoringPipeline`] chosen by the configured concurrency.
pub enum PipelineEvaluator {
    /// Evaluates in the calling thread.
    Sequential(ScoringPipeline),
    /// Evaluates on a Tokio runtime.
    Parallel(ParallelEvaluator<ScoringPipeline>),
}

impl PipelineEvaluator {
    /// Sequential without `max_concurrency`, parallel otherwise.
    ///
    /// # Errors
    /// Propagates [`ParallelEvaluator::with_max_concurrency`] errors.
    pub fn new(pipeline: ScoringPipeline, max_concurrency: Option<usize>) -> TrainingResult<Self> {
        Ok(match max_concurrency {
            None => Self::Sequential(pipeline),
            Some(max_tasks) => {
                Self::Parallel(ParallelEvaluator::with_max_concurrency(pipeline, max_tasks)?)
            }
        })
    }
}

impl PopulationEvaluator for PipelineEvaluator {
    fn evaluate_batch(&mut self, batch: &[ScoringWeights]) -> TrainingResult<Vec<Fitness>> {
        match self {
            Self::Sequential(pipeline) => pipeline.evaluate_batch(batch),
            Self::Parallel(evaluator) => evaluator.evaluate_batch(batch),
        }
    }
}
