//! Candidate pairs and the scopes they are decided in

use crate::score::ScoreInterval;
use serde::{Deserialize, Serialize};
use std::fmt;

const RDFS_CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#class";
const RDF_PROPERTY: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#property";

/// Opaque reference to an RDF class or property (an IRI upstream).
/// Only ever compared for equality and, for tie-breaking, lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRef(String);

impl EntityRef {
    pub fn new(iri: impl Into<String>) -> Self {
        Self(iri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EntityRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to the vocabulary (ontology) an entity is defined by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VocabularyRef(String);

impl VocabularyRef {
    pub fn new(iri: impl Into<String>) -> Self {
        Self(iri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VocabularyRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for VocabularyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Class,
    Property,
}

impl EntityKind {
    /// Accepts `class`/`property`, the `rdfs:Class`/`rdf:Property` CURIEs and
    /// their full IRIs, case-insensitively.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "class" | "rdfs:class" | RDFS_CLASS => Some(EntityKind::Class),
            "property" | "rdf:property" | RDF_PROPERTY => Some(EntityKind::Property),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Class => f.write_str("class"),
            EntityKind::Property => f.write_str("property"),
        }
    }
}

/// One (vocabulary pair, entity kind) partition. Each scope gets its own
/// ledger and matching.
///
/// The vocabulary pair is unordered: `new` stores the lexicographically
/// greater vocabulary first, so `(X, Y)` and `(Y, X)` name the same scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeKey {
    pub kind: EntityKind,
    pub vocabulary_a: VocabularyRef,
    pub vocabulary_b: VocabularyRef,
}

impl ScopeKey {
    pub fn new(vocabulary_1: VocabularyRef, vocabulary_2: VocabularyRef, kind: EntityKind) -> Self {
        let (vocabulary_a, vocabulary_b) = if vocabulary_1 >= vocabulary_2 {
            (vocabulary_1, vocabulary_2)
        } else {
            (vocabulary_2, vocabulary_1)
        };
        Self {
            kind,
            vocabulary_a,
            vocabulary_b,
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {} ({})", self.vocabulary_a, self.vocabulary_b, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePair {
    pub entity_a: EntityRef,
    pub entity_b: EntityRef,
    pub score: ScoreInterval,
}

impl CandidatePair {
    pub fn new(entity_a: impl Into<EntityRef>, entity_b: impl Into<EntityRef>, score: ScoreInterval) -> Self {
        Self {
            entity_a: entity_a.into(),
            entity_b: entity_b.into(),
            score,
        }
    }

    /// The confidence floor used for ranking.
    pub fn floor(&self) -> f64 {
        self.score.lower
    }

    pub fn is_self_pair(&self) -> bool {
        self.entity_a == self.entity_b
    }
}

/// A candidate pair tagged with the scope it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedCandidate {
    pub scope: ScopeKey,
    pub pair: CandidatePair,
}

impl ScopedCandidate {
    /// Build a candidate from two (entity, vocabulary) sides. The sides are
    /// oriented to follow the scope's vocabulary order, so `entity_a` always
    /// belongs to `scope.vocabulary_a`.
    pub fn new(
        entity_1: EntityRef,
        vocabulary_1: VocabularyRef,
        entity_2: EntityRef,
        vocabulary_2: VocabularyRef,
        kind: EntityKind,
        score: ScoreInterval,
    ) -> Self {
        let swap = vocabulary_1 < vocabulary_2;
        let scope = ScopeKey::new(vocabulary_1, vocabulary_2, kind);
        let pair = if swap {
            CandidatePair::new(entity_2, entity_1, score)
        } else {
            CandidatePair::new(entity_1, entity_2, score)
        };
        Self { scope, pair }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score() -> ScoreInterval {
        ScoreInterval::new(0.8, 0.81).unwrap()
    }

    #[test]
    fn test_scope_key_is_unordered() {
        let x = ScopeKey::new("http://x.org/".into(), "http://y.org/".into(), EntityKind::Class);
        let y = ScopeKey::new("http://y.org/".into(), "http://x.org/".into(), EntityKind::Class);
        assert_eq!(x, y);
        assert_eq!(x.vocabulary_a.as_str(), "http://y.org/");
    }

    #[test]
    fn test_scope_key_separates_kinds() {
        let c = ScopeKey::new("x".into(), "y".into(), EntityKind::Class);
        let p = ScopeKey::new("x".into(), "y".into(), EntityKind::Property);
        assert_ne!(c, p);
        assert!(c < p);
    }

    #[test]
    fn test_scoped_candidate_orients_entities() {
        let c = ScopedCandidate::new(
            "x#Person".into(),
            "x".into(),
            "y#Human".into(),
            "y".into(),
            EntityKind::Class,
            score(),
        );
        assert_eq!(c.scope.vocabulary_a.as_str(), "y");
        assert_eq!(c.pair.entity_a.as_str(), "y#Human");
        assert_eq!(c.pair.entity_b.as_str(), "x#Person");
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(EntityKind::parse("Class"), Some(EntityKind::Class));
        assert_eq!(EntityKind::parse("rdfs:Class"), Some(EntityKind::Class));
        assert_eq!(
            EntityKind::parse("http://www.w3.org/1999/02/22-rdf-syntax-ns#Property"),
            Some(EntityKind::Property)
        );
        assert_eq!(EntityKind::parse("individual"), None);
    }

    #[test]
    fn test_self_pair_detection() {
        assert!(CandidatePair::new("a", "a", score()).is_self_pair());
        assert!(!CandidatePair::new("a", "b", score()).is_self_pair());
    }
}
