//! Agreement of assigned annotations with the reference.

use std::collections::BTreeSet;

/// Weighted harmonic mean of precision and recall of `assigned` against
/// `reference`.
///
/// `beta > 1` favours recall. Returns zero when either set is empty or they
/// share nothing.
///
/// # Examples
/// ```
/// use hrd_trainer::scoring::f_measure;
/// use std::collections::BTreeSet;
///
/// let assigned: BTreeSet<String> = ["abc", "transporter"].iter().map(|t| t.to_string()).collect();
/// let reference: BTreeSet<String> = ["abc", "transporter", "atpase"].iter().map(|t| t.to_string()).collect();
/// assert!((f_measure(&assigned, &reference, 1.0) - 0.8).abs() < 1e-12);
/// ```
#[must_use]
pub fn f_measure(assigned: &BTreeSet<String>, reference: &BTreeSet<String>, beta: f64) -> f64 {
    if assigned.is_empty() || reference.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let shared = assigned.intersection(reference).count() as f64;
    if shared == 0.0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let precision = shared / assigned.len() as f64;
    #[allow(clippy::cast_precision_loss)]
    let recall = shared / reference.len() as f64;
    let beta_squared = beta * beta;
    (1.0 + beta_squared) * precision * recall / (beta_squared * precision + recall)
}

/// Token level true and false positive rates of one assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TokenRates {
    /// Share of reference tokens that were assigned.
    pub true_positive_rate: f64,
    /// Share of non-reference tokens that were assigned.
    pub false_positive_rate: f64,
}

impl TokenRates {
    /// Computes the rates of `assigned` against `reference`.
    ///
    /// `universe` holds every token the entity could have been assigned; its
    /// tokens in neither `assigned` nor `reference` are the true negatives.
    #[must_use]
    pub fn measure(
        assigned: &BTreeSet<String>,
        reference: &BTreeSet<String>,
        universe: &BTreeSet<String>,
    ) -> Self {
        let true_positives = assigned.intersection(reference).count();
        let false_positives = assigned.difference(reference).count();
        let true_negatives = universe
            .iter()
            .filter(|token| !assigned.contains(*token) && !reference.contains(*token))
            .count();
        Self {
            true_positive_rate: rate(true_positives, reference.len()),
            false_positive_rate: rate(false_positives, false_positives + true_negatives),
        }
    }
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let value = count as f64 / total as f64;
    value
}

/// Evaluation of the description selected for one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EntityEvaluation {
    /// F-measure of the assigned against the reference description tokens.
    pub evaluation_score: f64,
    /// Token true and false positive rates.
    pub rates: TokenRates,
    /// F-measure of the assigned against the reference ontology terms.
    pub ontology_score: Option<f64>,
}
