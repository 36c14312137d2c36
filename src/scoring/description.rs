//! Description scores and best candidate selection.

use super::TokenScores;
use crate::core::ScoringWeights;
use crate::error::TrainingResult;
use crate::model::Entity;
use std::collections::BTreeSet;

fn relative(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

/// Scores every candidate description of `entity`.
///
/// The result is aligned with [`Entity::candidates`]; candidates without
/// tokens, or beyond the end of `candidate_tokens`, get `None` and are never
/// selected. A description scores its lexical
/// score plus the database specific share of its relative bit score plus the
/// domain weighted share of its relative domain similarity.
///
/// # Errors
/// Returns [`crate::TrainingError::MissingDatabaseWeights`] for a hit from a
/// database without weights.
pub fn description_scores(
    entity: &Entity,
    candidate_tokens: &[BTreeSet<String>],
    domain_similarities: &[f64],
    token_scores: &TokenScores,
    weights: &ScoringWeights,
    domain_weight: f64,
) -> TrainingResult<Vec<Option<f64>>> {
    let mut max_bit_score = 0.0_f64;
    let mut max_domain_similarity = 0.0_f64;
    for (idx, (_, hit)) in entity.candidates().enumerate() {
        if candidate_tokens.get(idx).map_or(true, BTreeSet::is_empty) {
            continue;
        }
        max_bit_score = max_bit_score.max(hit.bit_score());
        max_domain_similarity =
            max_domain_similarity.max(domain_similarities.get(idx).copied().unwrap_or(0.0));
    }

    let mut scores = Vec::with_capacity(candidate_tokens.len());
    for (idx, (database, hit)) in entity.candidates().enumerate() {
        let Some(tokens) = candidate_tokens.get(idx).filter(|tokens| !tokens.is_empty()) else {
            scores.push(None);
            continue;
        };
        let bit_weight = weights.database(database)?.description_score_bit_score_weight;
        let similarity = domain_similarities.get(idx).copied().unwrap_or(0.0);
        let score = token_scores.lexical_score(tokens)
            + bit_weight * relative(hit.bit_score(), max_bit_score)
            + domain_weight * relative(similarity, max_domain_similarity);
        scores.push(Some(score));
    }
    Ok(scores)
}

/// Position of the highest scoring candidate; the first one wins ties.
///
/// # Examples
/// ```
/// use hrd_trainer::scoring::select_best;
/// assert_eq!(select_best(&[Some(0.2), None, Some(0.7), Some(0.7)]), Some(2));
/// assert_eq!(select_best(&[None, None]), None);
/// ```
#[must_use]
pub fn select_best(scores: &[Option<f64>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, score) in scores.iter().enumerate() {
        let Some(score) = *score else { continue };
        match best {
            Some((_, high)) if score <= high => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}
