//! Input data of the scoring pipeline.
//!
//! Everything here is built once by upstream parsers and only read while
//! training. Transient scores never live on these types; see
//! [`crate::scoring::EvaluationContext`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A homology-search hit proposing a description for an entity.
///
/// # Examples
/// ```
/// use hrd_trainer::CandidateHit;
/// let hit = CandidateHit::new("P12345", "Cytochrome P450 monooxygenase", 230.0)
///     .with_alignment(1, 100, 11, 110, 200);
/// assert!((hit.overlap_score(200) - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateHit {
    accession: String,
    description: String,
    bit_score: f64,
    query_start: u32,
    query_end: u32,
    subject_start: u32,
    subject_end: u32,
    subject_length: u32,
    ontology_terms: BTreeSet<String>,
}

impl CandidateHit {
    /// Creates a hit without alignment coordinates or ontology terms.
    #[must_use]
    pub fn new(accession: impl Into<String>, description: impl Into<String>, bit_score: f64) -> Self {
        Self {
            accession: accession.into(),
            description: description.into(),
            bit_score,
            query_start: 0,
            query_end: 0,
            subject_start: 0,
            subject_end: 0,
            subject_length: 0,
            ontology_terms: BTreeSet::new(),
        }
    }

    /// Sets the one-based inclusive alignment coordinates.
    #[must_use]
    pub fn with_alignment(
        mut self,
        query_start: u32,
        query_end: u32,
        subject_start: u32,
        subject_end: u32,
        subject_length: u32,
    ) -> Self {
        self.query_start = query_start;
        self.query_end = query_end;
        self.subject_start = subject_start;
        self.subject_end = subject_end;
        self.subject_length = subject_length;
        self
    }

    /// Sets the ontology terms annotated on the hit.
    #[must_use]
    pub fn with_ontology_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ontology_terms = terms.into_iter().map(Into::into).collect();
        self
    }

    /// Accession of the hit.
    #[must_use]
    pub fn accession(&self) -> &str {
        &self.accession
    }

    /// Free-text description of the hit.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Alignment bit score.
    #[must_use]
    pub fn bit_score(&self) -> f64 {
        self.bit_score
    }

    /// Ontology terms annotated on the hit.
    #[must_use]
    pub fn ontology_terms(&self) -> &BTreeSet<String> {
        &self.ontology_terms
    }

    /// Mean of query and subject coverage, each clamped to `[0, 1]`.
    #[must_use]
    pub fn overlap_score(&self, query_length: u32) -> f64 {
        let query = coverage(self.query_start, self.query_end, query_length);
        let subject = coverage(self.subject_start, self.subject_end, self.subject_length);
        (query + subject) / 2.0
    }
}

fn coverage(start: u32, end: u32, length: u32) -> f64 {
    if length == 0 || end < start || start == 0 {
        return 0.0;
    }
    let covered = f64::from(end - start + 1);
    (covered / f64::from(length)).clamp(0.0, 1.0)
}

/// A query protein with its candidate hits.
///
/// # Examples
/// ```
/// use hrd_trainer::{CandidateHit, Entity};
/// let mut entity = Entity::new("Q1", 300).with_domains(["IPR000001"]);
/// entity.add_hit("swissprot", CandidateHit::new("P1", "Kinase", 120.0));
/// entity.add_hit("trembl", CandidateHit::new("T1", "Putative kinase", 90.0));
/// assert_eq!(entity.candidate_count(), 2);
/// assert_eq!(entity.candidates().next().unwrap().0, "swissprot");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    accession: String,
    sequence_length: u32,
    hits: BTreeMap<String, Vec<CandidateHit>>,
    domains: BTreeSet<String>,
}

impl Entity {
    /// Creates an entity without hits or domains.
    #[must_use]
    pub fn new(accession: impl Into<String>, sequence_length: u32) -> Self {
        Self {
            accession: accession.into(),
            sequence_length,
            hits: BTreeMap::new(),
            domains: BTreeSet::new(),
        }
    }

    /// Sets the domain identifiers annotated on the entity.
    #[must_use]
    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a hit found in `database`.
    pub fn add_hit(&mut self, database: impl Into<String>, hit: CandidateHit) {
        self.hits.entry(database.into()).or_default().push(hit);
    }

    /// Accession of the entity.
    #[must_use]
    pub fn accession(&self) -> &str {
        &self.accession
    }

    /// Length of the query sequence.
    #[must_use]
    pub fn sequence_length(&self) -> u32 {
        self.sequence_length
    }

    /// Domain identifiers annotated on the entity.
    #[must_use]
    pub fn domains(&self) -> &BTreeSet<String> {
        &self.domains
    }

    /// All hits with their database, databases in name order and hits in
    /// insertion order. Candidate positions used by the scorers follow this
    /// order.
    pub fn candidates(&self) -> impl Iterator<Item = (&str, &CandidateHit)> {
        self.hits
            .iter()
            .flat_map(|(database, hits)| hits.iter().map(move |hit| (database.as_str(), hit)))
    }

    /// Number of hits across all databases.
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.hits.values().map(Vec::len).sum()
    }
}

/// The entities scored in every fitness evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    entities: Vec<Entity>,
}

impl Corpus {
    /// Creates an empty corpus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity.
    pub fn push(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    /// Entities in insertion order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the corpus holds no entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl FromIterator<Entity> for Corpus {
    fn from_iter<T: IntoIterator<Item = Entity>>(iter: T) -> Self {
        Self {
            entities: iter.into_iter().collect(),
        }
    }
}

/// Read-only domain annotation lookup shared by all evaluations.
///
/// # Examples
/// ```
/// use hrd_trainer::DomainTable;
/// let mut table = DomainTable::new();
/// table.insert_domain("IPR000001", 2.5);
/// table.annotate("P1", "IPR000001");
/// assert_eq!(table.weight("IPR000001"), Some(2.5));
/// assert!(table.domains_of("P1").unwrap().contains("IPR000001"));
/// assert!(table.domains_of("P2").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainTable {
    weights: HashMap<String, f64>,
    accession_domains: HashMap<String, BTreeSet<String>>,
}

impl DomainTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a domain and its information-content weight.
    pub fn insert_domain(&mut self, domain: impl Into<String>, weight: f64) {
        self.weights.insert(domain.into(), weight);
    }

    /// Records that the hit `accession` carries `domain`.
    pub fn annotate(&mut self, accession: impl Into<String>, domain: impl Into<String>) {
        self.accession_domains
            .entry(accession.into())
            .or_default()
            .insert(domain.into());
    }

    /// Weight of `domain`, if registered.
    #[must_use]
    pub fn weight(&self, domain: &str) -> Option<f64> {
        self.weights.get(domain).copied()
    }

    /// Domains annotated on the hit `accession`.
    #[must_use]
    pub fn domains_of(&self, accession: &str) -> Option<&BTreeSet<String>> {
        self.accession_domains.get(accession)
    }

    /// Number of registered domains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether no domain is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Ground truth the selected descriptions are compared against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSet {
    descriptions: HashMap<String, String>,
    ontology_terms: HashMap<String, BTreeSet<String>>,
}

impl ReferenceSet {
    /// Creates an empty reference set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reference description of `entity`.
    pub fn insert_description(&mut self, entity: impl Into<String>, description: impl Into<String>) {
        self.descriptions.insert(entity.into(), description.into());
    }

    /// Sets the reference ontology terms of `entity`.
    pub fn insert_ontology_terms<I, S>(&mut self, entity: impl Into<String>, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ontology_terms
            .insert(entity.into(), terms.into_iter().map(Into::into).collect());
    }

    /// Reference description of `entity`.
    #[must_use]
    pub fn description(&self, entity: &str) -> Option<&str> {
        self.descriptions.get(entity).map(String::as_str)
    }

    /// Reference ontology terms of `entity`.
    #[must_use]
    pub fn ontology_terms(&self, entity: &str) -> Option<&BTreeSet<String>> {
        self.ontology_terms.get(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_without_alignment_is_zero() {
        let hit = CandidateHit::new("P1", "Kinase", 10.0);
        assert_eq!(hit.overlap_score(100), 0.0);
    }

    #[test]
    fn overlap_is_clamped() {
        let hit = CandidateHit::new("P1", "Kinase", 10.0).with_alignment(1, 400, 1, 50, 50);
        assert_eq!(hit.overlap_score(100), 1.0);
    }

    #[test]
    fn candidates_follow_database_name_order() {
        let mut entity = Entity::new("Q1", 100);
        entity.add_hit("trembl", CandidateHit::new("T1", "a", 1.0));
        entity.add_hit("swissprot", CandidateHit::new("S1", "b", 1.0));
        entity.add_hit("swissprot", CandidateHit::new("S2", "c", 1.0));
        let order: Vec<_> = entity.candidates().map(|(_, hit)| hit.accession()).collect();
        assert_eq!(order, vec!["S1", "S2", "T1"]);
    }

    #[test]
    fn corpus_collects_entities() {
        let corpus: Corpus = vec![Entity::new("Q1", 10), Entity::new("Q2", 20)]
            .into_iter()
            .collect();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.entities()[1].accession(), "Q2");
    }
}
