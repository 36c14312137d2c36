//! Domain architecture similarity in a per-entity vector space.
//!
//! The axes of the space are the distinct domain identifiers annotated on an
//! entity and its candidate hits, in lexicographic order. Entities and hits
//! are projected onto these axes using the information-content weight of each
//! domain, and compared by cosine similarity.

use crate::error::{TrainingError, TrainingResult};
use crate::model::{DomainTable, Entity};
use std::collections::BTreeSet;

/// Sorted, deduplicated domain identifiers of `entity` and all its hits.
///
/// Hits without an entry in `table` contribute nothing; neither does an
/// entity without domains.
#[must_use]
pub fn build_basis(entity: &Entity, table: &DomainTable) -> Vec<String> {
    let mut basis: BTreeSet<&str> = entity.domains().iter().map(String::as_str).collect();
    for (_, hit) in entity.candidates() {
        if let Some(domains) = table.domains_of(hit.accession()) {
            basis.extend(domains.iter().map(String::as_str));
        }
    }
    basis.into_iter().map(str::to_owned).collect()
}

/// Projects the domains annotated on `accession` onto `basis`.
///
/// Index `i` holds the weight of `basis[i]` when `domains` contains it and
/// zero otherwise.
///
/// # Errors
/// Returns [`TrainingError::MissingDomainWeight`] when an annotated domain of
/// the basis has no weight in `table`.
pub fn project(
    accession: &str,
    domains: &BTreeSet<String>,
    basis: &[String],
    table: &DomainTable,
) -> TrainingResult<Vec<f64>> {
    let mut vector = Vec::with_capacity(basis.len());
    for domain in basis {
        if domains.contains(domain) {
            let weight = table
                .weight(domain)
                .ok_or_else(|| TrainingError::MissingDomainWeight {
                    accession: accession.to_string(),
                    domain: domain.clone(),
                })?;
            vector.push(weight);
        } else {
            vector.push(0.0);
        }
    }
    Ok(vector)
}

/// Cosine of the angle between `a` and `b`.
///
/// Returns exactly zero when either vector has zero magnitude.
///
/// # Examples
/// ```
/// use hrd_trainer::scoring::cosine_similarity;
/// assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
/// assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
/// ```
#[must_use]
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut magnitude_a = 0.0;
    let mut magnitude_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        magnitude_a += x * x;
        magnitude_b += y * y;
    }
    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (magnitude_a.sqrt() * magnitude_b.sqrt());
    if similarity.is_finite() {
        similarity
    } else {
        0.0
    }
}

/// Domain vectors and similarities of one entity's candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainScores {
    /// Axes of the vector space.
    pub basis: Vec<String>,
    /// Projection of the entity.
    pub entity_vector: Vec<f64>,
    /// Projection of every candidate, in [`Entity::candidates`] order.
    pub candidate_vectors: Vec<Vec<f64>>,
    /// Cosine similarity of every candidate to the entity.
    pub similarities: Vec<f64>,
}

impl DomainScores {
    /// Largest candidate similarity, zero without candidates.
    #[must_use]
    pub fn max_similarity(&self) -> f64 {
        self.similarities.iter().copied().fold(0.0, f64::max)
    }

    fn clear(&mut self) {
        self.basis.clear();
        self.entity_vector.clear();
        self.candidate_vectors.clear();
        self.similarities.clear();
    }
}

/// Builds the vector space of `entity` and scores every candidate against
/// the entity, overwriting `scores`.
///
/// # Errors
/// Propagates [`TrainingError::MissingDomainWeight`] from [`project`].
pub fn compute_domain_similarity_scores(
    entity: &Entity,
    table: &DomainTable,
    scores: &mut DomainScores,
) -> TrainingResult<()> {
    scores.clear();
    scores.basis = build_basis(entity, table);
    scores.entity_vector = project(entity.accession(), entity.domains(), &scores.basis, table)?;
    let no_domains = BTreeSet::new();
    for (_, hit) in entity.candidates() {
        let domains = table.domains_of(hit.accession()).unwrap_or(&no_domains);
        let vector = project(hit.accession(), domains, &scores.basis, table)?;
        scores
            .similarities
            .push(cosine_similarity(&scores.entity_vector, &vector));
        scores.candidate_vectors.push(vector);
    }
    Ok(())
}
