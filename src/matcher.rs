//! Greedy Conflict-Resolving Matcher
//!
//! Decides one scope's candidates in a single pass, highest confidence floor
//! first. An entity is claimed by the first accepted pair that mentions it;
//! later pairs touching claimed entities only get through when both of their
//! entities were claimed within the slack tolerance of the new floor.

use crate::candidate::{CandidatePair, EntityRef};
use crate::config::{AlignmentConfig, TieBreak};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Absorbs float noise so a gap of exactly `slack` is always outside the window.
const SLACK_EPSILON: f64 = 1e-9;

/// Per-scope record of claimed entities and the floor they were claimed at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    claims: HashMap<EntityRef, f64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity: &EntityRef) -> Option<f64> {
        self.claims.get(entity).copied()
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.claims.contains_key(entity)
    }

    /// Record a claim unless the entity already has one. Returns whether the
    /// entity was newly claimed; existing claims are never overwritten.
    pub fn claim(&mut self, entity: &EntityRef, floor: f64) -> bool {
        if self.claims.contains_key(entity) {
            return false;
        }
        self.claims.insert(entity.clone(), floor);
        true
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityRef, f64)> + '_ {
        self.claims.iter().map(|(e, &s)| (e, s))
    }
}

/// Accepted pairs of one scope, in acceptance order, without duplicates.
#[derive(Debug, Clone, Default)]
pub struct Matching {
    pairs: Vec<CandidatePair>,
    seen: HashSet<(EntityRef, EntityRef)>,
}

impl Matching {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the unordered pair is already in the matching.
    fn insert(&mut self, pair: &CandidatePair) -> bool {
        let key = if pair.entity_a <= pair.entity_b {
            (pair.entity_a.clone(), pair.entity_b.clone())
        } else {
            (pair.entity_b.clone(), pair.entity_a.clone())
        };
        if !self.seen.insert(key) {
            return false;
        }
        self.pairs.push(pair.clone());
        true
    }

    pub fn contains(&self, a: &EntityRef, b: &EntityRef) -> bool {
        let key = if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        self.seen.contains(&key)
    }

    pub fn pairs(&self) -> &[CandidatePair] {
        &self.pairs
    }

    pub fn into_pairs(self) -> Vec<CandidatePair> {
        self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Exactly one side is already claimed
    OneSideClaimed,
    /// Both sides are claimed but at least one claim is too far above the floor
    SlackExceeded,
    /// Both sides name the same entity
    SelfPair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Fresh,
    Slack,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStats {
    pub seen: usize,
    pub fresh: usize,
    pub slack: usize,
    /// All rejections; the counters below break it down by reason
    pub rejected: usize,
    pub rejected_one_side: usize,
    pub rejected_slack: usize,
    pub rejected_self_pair: usize,
}

impl MatchStats {
    fn record_rejection(&mut self, reason: RejectReason) {
        self.rejected += 1;
        match reason {
            RejectReason::OneSideClaimed => self.rejected_one_side += 1,
            RejectReason::SlackExceeded => self.rejected_slack += 1,
            RejectReason::SelfPair => self.rejected_self_pair += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub matching: Matching,
    pub ledger: Ledger,
    pub stats: MatchStats,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GreedyMatcher {
    pub slack: f64,
    pub tie_break: TieBreak,
}

impl Default for GreedyMatcher {
    fn default() -> Self {
        Self::from_config(&AlignmentConfig::default())
    }
}

impl GreedyMatcher {
    pub fn new(slack: f64, tie_break: TieBreak) -> Self {
        Self { slack, tie_break }
    }

    pub fn from_config(config: &AlignmentConfig) -> Self {
        Self::new(config.slack, config.tie_break)
    }

    /// Decide one scope with a fresh ledger.
    pub fn run(&self, candidates: &[CandidatePair]) -> MatchOutcome {
        self.run_with_ledger(candidates, Ledger::new())
    }

    /// Decide one scope against `ledger`, handing the ledger back with the
    /// matching once the pass is over.
    pub fn run_with_ledger(&self, candidates: &[CandidatePair], mut ledger: Ledger) -> MatchOutcome {
        let mut matching = Matching::new();
        let mut stats = MatchStats::default();

        for pair in self.ranked(candidates) {
            stats.seen += 1;
            match self.evaluate(pair, &ledger) {
                Decision::Fresh => {
                    ledger.claim(&pair.entity_a, pair.floor());
                    ledger.claim(&pair.entity_b, pair.floor());
                    matching.insert(pair);
                    stats.fresh += 1;
                }
                Decision::Slack => {
                    matching.insert(pair);
                    stats.slack += 1;
                }
                Decision::Rejected(reason) => stats.record_rejection(reason),
            }
        }

        MatchOutcome {
            matching,
            ledger,
            stats,
        }
    }

    /// Candidates by descending floor. Ties follow the configured tie-break;
    /// the sort is stable so `InputOrder` keeps supplied order.
    pub fn ranked<'a>(&self, candidates: &'a [CandidatePair]) -> Vec<&'a CandidatePair> {
        let mut ranked: Vec<&CandidatePair> = candidates.iter().collect();
        ranked.sort_by(|x, y| {
            y.score.cmp_floor(&x.score).then_with(|| match self.tie_break {
                TieBreak::Lexicographic => (&x.entity_a, &x.entity_b).cmp(&(&y.entity_a, &y.entity_b)),
                TieBreak::InputOrder => Ordering::Equal,
            })
        });
        ranked
    }

    /// Apply the acceptance rule to one pair without mutating anything.
    pub fn evaluate(&self, pair: &CandidatePair, ledger: &Ledger) -> Decision {
        if pair.is_self_pair() {
            return Decision::Rejected(RejectReason::SelfPair);
        }

        match (ledger.get(&pair.entity_a), ledger.get(&pair.entity_b)) {
            (None, None) => Decision::Fresh,
            (Some(claim_a), Some(claim_b)) => {
                if self.within_slack(claim_a, pair.floor()) && self.within_slack(claim_b, pair.floor()) {
                    Decision::Slack
                } else {
                    Decision::Rejected(RejectReason::SlackExceeded)
                }
            }
            _ => Decision::Rejected(RejectReason::OneSideClaimed),
        }
    }

    /// Strict: a gap of exactly `slack` is outside the window.
    ///
    /// Floors are expected on the rounding grid (ingestion always rounds).
    /// Gaps within `1e-9` below `slack` count as equal to it, so unrounded
    /// floors that close in on the boundary are rejected.
    pub fn within_slack(&self, claimed: f64, floor: f64) -> bool {
        claimed - floor < self.slack - SLACK_EPSILON
    }
}
