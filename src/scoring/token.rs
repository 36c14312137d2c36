//! Token level aggregation over an entity's candidate descriptions.

use crate::core::ScoringWeights;
use crate::error::TrainingResult;
use crate::model::Entity;
use std::collections::{BTreeSet, HashMap};

/// Share of the highest token score a token must exceed to be informative.
const INFORMATIVE_TOKEN_THRESHOLD: f64 = 0.5;

/// Lower-cased alphanumeric tokens of `text` that are not blacklisted.
///
/// # Examples
/// ```
/// use hrd_trainer::scoring::tokenize;
/// use std::collections::BTreeSet;
///
/// let blacklist: BTreeSet<String> = ["protein".to_string()].into_iter().collect();
/// let tokens = tokenize("Putative ABC-transporter protein", &blacklist);
/// assert_eq!(tokens.into_iter().collect::<Vec<_>>(), vec!["abc", "putative", "transporter"]);
/// ```
#[must_use]
pub fn tokenize(text: &str, blacklist: &BTreeSet<String>) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .filter(|token| !blacklist.contains(token))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Signals {
    bit_score: f64,
    database_score: f64,
    overlap_score: f64,
    domain_similarity: f64,
}

impl Signals {
    fn add(&mut self, other: &Self) {
        self.bit_score += other.bit_score;
        self.database_score += other.database_score;
        self.overlap_score += other.overlap_score;
        self.domain_similarity += other.domain_similarity;
    }
}

fn ratio(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total
    } else {
        0.0
    }
}

/// Token scores of one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenScores {
    scores: HashMap<String, f64>,
    high_score: f64,
}

impl TokenScores {
    /// Aggregates the candidates of `entity` into token scores, overwriting
    /// `self`.
    ///
    /// `candidate_tokens` and `domain_similarities` are aligned with
    /// [`Entity::candidates`]; `domain_weight` blends the domain signal in and
    /// is zero when domain scoring is off. Candidates without tokens, or
    /// beyond the end of `candidate_tokens`, are ignored.
    ///
    /// # Errors
    /// Returns [`crate::TrainingError::MissingDatabaseWeights`] for a hit from
    /// a database without weights.
    pub fn measure(
        &mut self,
        entity: &Entity,
        candidate_tokens: &[BTreeSet<String>],
        domain_similarities: &[f64],
        weights: &ScoringWeights,
        domain_weight: f64,
    ) -> TrainingResult<()> {
        self.scores.clear();
        self.high_score = 0.0;

        let mut cumulative: HashMap<&str, Signals> = HashMap::new();
        let mut total = Signals::default();
        for (idx, (database, hit)) in entity.candidates().enumerate() {
            let Some(tokens) = candidate_tokens.get(idx).filter(|tokens| !tokens.is_empty())
            else {
                continue;
            };
            let database_weight = weights.database(database)?.weight;
            let signals = Signals {
                bit_score: hit.bit_score() * database_weight,
                database_score: database_weight,
                overlap_score: hit.overlap_score(entity.sequence_length()) * database_weight,
                domain_similarity: domain_similarities.get(idx).copied().unwrap_or(0.0),
            };
            total.add(&signals);
            for token in tokens {
                cumulative.entry(token.as_str()).or_default().add(&signals);
            }
        }

        for (token, signals) in cumulative {
            let lexical = weights.token_score_bit_score_weight
                * ratio(signals.bit_score, total.bit_score)
                + weights.token_score_database_score_weight
                    * ratio(signals.database_score, total.database_score)
                + weights.token_score_overlap_score_weight
                    * ratio(signals.overlap_score, total.overlap_score);
            let score = (1.0 - domain_weight) * lexical
                + domain_weight * ratio(signals.domain_similarity, total.domain_similarity);
            if score > self.high_score {
                self.high_score = score;
            }
            self.scores.insert(token.to_string(), score);
        }
        Ok(())
    }

    /// Score of `token`, zero when unseen.
    #[must_use]
    pub fn score(&self, token: &str) -> f64 {
        self.scores.get(token).copied().unwrap_or(0.0)
    }

    /// Highest token score of the entity.
    #[must_use]
    pub fn high_score(&self) -> f64 {
        self.high_score
    }

    /// Whether `token` scores above half the highest token score.
    #[must_use]
    pub fn is_informative(&self, token: &str) -> bool {
        self.high_score > 0.0 && self.score(token) > INFORMATIVE_TOKEN_THRESHOLD * self.high_score
    }

    /// Lexical score of a description with the given tokens: the informative
    /// tokens' scores relative to the highest score, scaled by the share of
    /// informative tokens.
    #[must_use]
    pub fn lexical_score(&self, tokens: &BTreeSet<String>) -> f64 {
        if tokens.is_empty() || self.high_score <= 0.0 {
            return 0.0;
        }
        let mut informative = 0_usize;
        let mut sum = 0.0;
        for token in tokens {
            if self.is_informative(token) {
                informative += 1;
                sum += self.score(token) / self.high_score;
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let correction = informative as f64 / tokens.len() as f64;
        sum * correction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DatabaseWeights;
    use crate::model::CandidateHit;

    fn weights() -> ScoringWeights {
        let mut weights = ScoringWeights {
            token_score_bit_score_weight: 1.0,
            token_score_database_score_weight: 0.0,
            token_score_overlap_score_weight: 0.0,
            domain_similarity_weight: 0.0,
            databases: Default::default(),
        };
        weights.databases.insert(
            "swissprot".into(),
            DatabaseWeights {
                weight: 1.0,
                description_score_bit_score_weight: 0.5,
            },
        );
        weights
    }

    fn entity() -> Entity {
        let mut entity = Entity::new("Q1", 100);
        entity.add_hit("swissprot", CandidateHit::new("P1", "kinase alpha", 30.0));
        entity.add_hit("swissprot", CandidateHit::new("P2", "kinase beta", 10.0));
        entity
    }

    fn tokens(entity: &Entity) -> Vec<BTreeSet<String>> {
        entity
            .candidates()
            .map(|(_, hit)| tokenize(hit.description(), &BTreeSet::new()))
            .collect()
    }

    #[test]
    fn tokenize_drops_punctuation_and_blacklist() {
        let blacklist: BTreeSet<String> = ["putative".to_string()].into_iter().collect();
        let tokens = tokenize("  Putative, DNA-binding  protein 2 ", &blacklist);
        let expected: BTreeSet<String> = ["dna", "binding", "protein", "2"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn bit_score_shares_drive_token_scores() {
        let entity = entity();
        let mut scores = TokenScores::default();
        scores
            .measure(&entity, &tokens(&entity), &[0.0, 0.0], &weights(), 0.0)
            .unwrap();
        assert!((scores.score("kinase") - 1.0).abs() < 1e-12);
        assert!((scores.score("alpha") - 0.75).abs() < 1e-12);
        assert!((scores.score("beta") - 0.25).abs() < 1e-12);
        assert_eq!(scores.high_score(), scores.score("kinase"));
        assert!(scores.is_informative("alpha"));
        assert!(!scores.is_informative("beta"));
    }

    #[test]
    fn candidates_beyond_the_token_slice_are_ignored() {
        let entity = entity();
        let mut candidate_tokens = tokens(&entity);
        candidate_tokens.truncate(1);
        let mut scores = TokenScores::default();
        scores
            .measure(&entity, &candidate_tokens, &[], &weights(), 0.0)
            .unwrap();
        assert!((scores.score("kinase") - 1.0).abs() < 1e-12);
        assert_eq!(scores.score("beta"), 0.0);
    }

    #[test]
    fn domain_weight_blends_domain_similarity() {
        let entity = entity();
        let mut scores = TokenScores::default();
        scores
            .measure(&entity, &tokens(&entity), &[0.0, 1.0], &weights(), 1.0)
            .unwrap();
        assert_eq!(scores.score("alpha"), 0.0);
        assert!((scores.score("beta") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn lexical_score_rewards_informative_tokens() {
        let entity = entity();
        let candidate_tokens = tokens(&entity);
        let mut scores = TokenScores::default();
        scores
            .measure(&entity, &candidate_tokens, &[0.0, 0.0], &weights(), 0.0)
            .unwrap();
        let first = scores.lexical_score(&candidate_tokens[0]);
        let second = scores.lexical_score(&candidate_tokens[1]);
        assert!((first - 1.75).abs() < 1e-12);
        assert!((second - 0.5).abs() < 1e-12);
        assert_eq!(scores.lexical_score(&BTreeSet::new()), 0.0);
    }

    #[test]
    fn unknown_database_is_an_error() {
        let mut entity = Entity::new("Q1", 100);
        entity.add_hit("pdb", CandidateHit::new("X1", "kinase", 1.0));
        let candidate_tokens = tokens(&entity);
        let mut scores = TokenScores::default();
        assert!(scores
            .measure(&entity, &candidate_tokens, &[0.0], &weights(), 0.0)
            .is_err());
    }
}
