//! Progress and result reporting of a training run.

use crate::core::{Origin, ParameterSet};
use crate::error::TrainingResult;
use serde::Serialize;
use tracing::info;

/// Snapshot handed to [`TrainerOutput::write_generation`] after every
/// generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    /// One-based generation index.
    pub generation: usize,
    /// Best parameter set found so far.
    pub best: ParameterSet,
    /// Top score of this generation minus the previous best score.
    pub score_delta: f64,
    /// Lineage of the best parameter set.
    pub origin: Origin,
    /// Mean score of the evaluated population.
    pub mean_score: f64,
    /// Gene diversity of the evaluated population.
    pub diversity: f64,
    /// Individuals in the population bred for the next generation.
    pub population_size: usize,
}

/// Result handed to [`TrainerOutput::write_final`] once training ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalReport {
    /// Best parameter set of the run.
    pub best: ParameterSet,
    /// Mean over entities of the best score a single candidate could reach.
    pub avg_max_evaluation_score: f64,
    /// Generation in which the best set was found.
    pub generation_found: usize,
}

/// Sink for training progress.
pub trait TrainerOutput {
    /// Called once per generation.
    ///
    /// # Errors
    /// A failing writer aborts the run.
    fn write_generation(&mut self, report: &GenerationReport) -> TrainingResult<()>;

    /// Called once after the last generation.
    ///
    /// # Errors
    /// A failing writer aborts the run.
    fn write_final(&mut self, report: &FinalReport) -> TrainingResult<()>;
}

impl<T: TrainerOutput + ?Sized> TrainerOutput for &mut T {
    fn write_generation(&mut self, report: &GenerationReport) -> TrainingResult<()> {
        (**self).write_generation(report)
    }

    fn write_final(&mut self, report: &FinalReport) -> TrainingResult<()> {
        (**self).write_final(report)
    }
}

impl<T: TrainerOutput + ?Sized> TrainerOutput for Box<T> {
    fn write_generation(&mut self, report: &GenerationReport) -> TrainingResult<()> {
        (**self).write_generation(report)
    }

    fn write_final(&mut self, report: &FinalReport) -> TrainingResult<()> {
        (**self).write_final(report)
    }
}

/// Logs progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingOutput;

impl TrainerOutput for TracingOutput {
    fn write_generation(&mut self, report: &GenerationReport) -> TrainingResult<()> {
        info!(
            generation = report.generation,
            best_score = report.best.score().unwrap_or(0.0),
            delta = report.score_delta,
            origin = %report.origin,
            mean_score = report.mean_score,
            diversity = report.diversity,
            population_size = report.population_size,
            "generation finished"
        );
        Ok(())
    }

    fn write_final(&mut self, report: &FinalReport) -> TrainingResult<()> {
        let fitness = report.best.fitness().copied().unwrap_or_default();
        info!(
            generation_found = report.generation_found,
            best_score = fitness.avg_evaluation_score,
            true_positive_rate = fitness.avg_true_positive_rate,
            false_positive_rate = fitness.avg_false_positive_rate,
            avg_max_evaluation_score = report.avg_max_evaluation_score,
            "training finished"
        );
        Ok(())
    }
}

/// Keeps every report in memory.
///
/// # Examples
/// ```
/// use hrd_trainer::output::{FinalReport, RecordingOutput, TrainerOutput};
/// use hrd_trainer::{ParameterBounds, ParameterSet, ParameterSpace, ScoringWeights};
///
/// let space = ParameterSpace::new(["swissprot"], ParameterBounds::default()).unwrap();
/// let mut output = RecordingOutput::default();
/// output
///     .write_final(&FinalReport {
///         best: ParameterSet::seed(ScoringWeights::default(), &space),
///         avg_max_evaluation_score: 0.8,
///         generation_found: 3,
///     })
///     .unwrap();
/// assert_eq!(output.final_report.unwrap().generation_found, 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    /// Reports of the finished generations.
    pub generations: Vec<GenerationReport>,
    /// Final report, once written.
    pub final_report: Option<FinalReport>,
}

impl TrainerOutput for RecordingOutput {
    fn write_generation(&mut self, report: &GenerationReport) -> TrainingResult<()> {
        self.generations.push(report.clone());
        Ok(())
    }

    fn write_final(&mut self, report: &FinalReport) -> TrainingResult<()> {
        self.final_report = Some(report.clone());
        Ok(())
    }
}
