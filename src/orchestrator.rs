//! Alignment Orchestrator - runs the matcher once per scope
//!
//! Candidates are grouped by (vocabulary pair, entity kind). Every scope is
//! decided with its own ledger, so scopes can run sequentially or on worker
//! tasks and still produce the same report.

use crate::candidate::{CandidatePair, EntityKind, EntityRef, ScopeKey, ScopedCandidate};
use crate::config::AlignmentConfig;
use crate::error::{NexusError, Result};
use crate::matcher::{GreedyMatcher, MatchOutcome, MatchStats};
use crate::score::ScoreInterval;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// An accepted equivalence, ready for the result sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedPair {
    pub entity_a: EntityRef,
    pub entity_b: EntityRef,
    pub kind: EntityKind,
    pub score: ScoreInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeSummary {
    pub scope: ScopeKey,
    #[serde(flatten)]
    pub stats: MatchStats,
    /// Distinct pairs in the scope's matching
    pub matched: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentTotals {
    pub scopes: usize,
    pub candidates: usize,
    pub self_pairs_dropped: usize,
    pub accepted: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub totals: AlignmentTotals,
    pub scopes: Vec<ScopeSummary>,
    pub accepted: Vec<AcceptedPair>,
}

impl AlignmentReport {
    pub fn accepted_of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &AcceptedPair> + '_ {
        self.accepted.iter().filter(move |p| p.kind == kind)
    }
}

impl fmt::Display for AlignmentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Alignment run {} ({})", self.run_id, self.generated_at.to_rfc3339())?;
        writeln!(
            f,
            "  {} scopes, {} candidates, {} accepted, {} rejected, {} self-pairs dropped",
            self.totals.scopes,
            self.totals.candidates,
            self.totals.accepted,
            self.totals.rejected,
            self.totals.self_pairs_dropped
        )?;
        for summary in &self.scopes {
            writeln!(
                f,
                "  {}: {} seen, {} fresh, {} slack, {} rejected ({} one side claimed, {} over slack)",
                summary.scope,
                summary.stats.seen,
                summary.stats.fresh,
                summary.stats.slack,
                summary.stats.rejected,
                summary.stats.rejected_one_side,
                summary.stats.rejected_slack
            )?;
        }
        Ok(())
    }
}

/// Candidates partitioned by scope, in scope order.
#[derive(Debug, Clone, Default)]
pub struct ScopedCandidates {
    pub scopes: BTreeMap<ScopeKey, Vec<CandidatePair>>,
    pub self_pairs_dropped: usize,
}

/// Partition candidates by scope, dropping self-pairs.
pub fn group_by_scope(candidates: impl IntoIterator<Item = ScopedCandidate>) -> ScopedCandidates {
    let mut grouped = ScopedCandidates::default();
    for candidate in candidates {
        if candidate.pair.is_self_pair() {
            warn!(
                "Dropping self-pair {} in scope {}",
                candidate.pair.entity_a, candidate.scope
            );
            grouped.self_pairs_dropped += 1;
            continue;
        }
        grouped
            .scopes
            .entry(candidate.scope)
            .or_insert_with(Vec::new)
            .push(candidate.pair);
    }
    grouped
}

pub struct AlignmentOrchestrator {
    matcher: GreedyMatcher,
}

impl AlignmentOrchestrator {
    pub fn new(config: &AlignmentConfig) -> Self {
        Self {
            matcher: GreedyMatcher::from_config(config),
        }
    }

    /// Decide every scope in turn.
    pub fn align(&self, candidates: impl IntoIterator<Item = ScopedCandidate>) -> AlignmentReport {
        let grouped = group_by_scope(candidates);
        let self_pairs = grouped.self_pairs_dropped;

        let outcomes: Vec<(ScopeKey, MatchOutcome)> = grouped
            .scopes
            .into_iter()
            .map(|(scope, pairs)| {
                let outcome = self.matcher.run(&pairs);
                (scope, outcome)
            })
            .collect();

        build_report(outcomes, self_pairs)
    }

    /// Decide scopes on blocking worker tasks. A scope's pass is strictly
    /// sequential; only whole scopes run side by side.
    pub async fn align_parallel(
        &self,
        candidates: impl IntoIterator<Item = ScopedCandidate>,
    ) -> Result<AlignmentReport> {
        let grouped = group_by_scope(candidates);
        let self_pairs = grouped.self_pairs_dropped;

        let mut tasks = JoinSet::new();
        for (scope, pairs) in grouped.scopes {
            let matcher = self.matcher;
            tasks.spawn_blocking(move || {
                let outcome = matcher.run(&pairs);
                (scope, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let (scope, outcome) = joined.map_err(|e| NexusError::Task(e.to_string()))?;
            outcomes.push((scope, outcome));
        }
        outcomes.sort_by(|(x, _), (y, _)| x.cmp(y));

        Ok(build_report(outcomes, self_pairs))
    }

    /// Decide sequentially or on worker tasks.
    pub async fn run(
        &self,
        candidates: impl IntoIterator<Item = ScopedCandidate>,
        parallel: bool,
    ) -> Result<AlignmentReport> {
        if parallel {
            self.align_parallel(candidates).await
        } else {
            Ok(self.align(candidates))
        }
    }
}

/// `outcomes` must already be in scope order.
fn build_report(outcomes: Vec<(ScopeKey, MatchOutcome)>, self_pairs_dropped: usize) -> AlignmentReport {
    let mut totals = AlignmentTotals {
        scopes: outcomes.len(),
        self_pairs_dropped,
        ..Default::default()
    };
    let mut scopes = Vec::with_capacity(outcomes.len());
    let mut accepted = Vec::new();

    for (scope, outcome) in outcomes {
        debug!(
            "Scope {}: {} candidates, {} fresh, {} slack, {} rejected",
            scope, outcome.stats.seen, outcome.stats.fresh, outcome.stats.slack, outcome.stats.rejected
        );
        totals.candidates += outcome.stats.seen;
        totals.rejected += outcome.stats.rejected;
        totals.accepted += outcome.matching.len();

        scopes.push(ScopeSummary {
            scope: scope.clone(),
            stats: outcome.stats,
            matched: outcome.matching.len(),
        });
        accepted.extend(outcome.matching.into_pairs().into_iter().map(|pair| AcceptedPair {
            entity_a: pair.entity_a,
            entity_b: pair.entity_b,
            kind: scope.kind,
            score: pair.score,
        }));
    }

    info!(
        "Aligned {} scopes: {} of {} candidates accepted",
        totals.scopes, totals.accepted, totals.candidates
    );

    AlignmentReport {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        totals,
        scopes,
        accepted,
    }
}
