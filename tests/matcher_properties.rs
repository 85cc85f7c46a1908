use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use vocab_nexus::matcher::Decision;
use vocab_nexus::{CandidatePair, GreedyMatcher, Ledger, ScoreInterval};

fn random_candidates(rng: &mut StdRng, n: usize) -> Vec<CandidatePair> {
    (0..n)
        .map(|_| {
            let a = format!("x#e{}", rng.gen_range(0..12));
            let b = format!("y#e{}", rng.gen_range(0..12));
            let k: u32 = rng.gen_range(0..50);
            let lower = (50 + k) as f64 / 100.0;
            let upper = (51 + k) as f64 / 100.0;
            CandidatePair::new(a.as_str(), b.as_str(), ScoreInterval::new(lower, upper).unwrap())
        })
        .collect()
}

fn accepted_set(pairs: &[CandidatePair]) -> HashSet<(String, String)> {
    pairs
        .iter()
        .map(|p| (p.entity_a.to_string(), p.entity_b.to_string()))
        .collect()
}

#[test]
fn test_lexicographic_result_ignores_input_order() {
    let matcher = GreedyMatcher::default();
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..20 {
        let mut candidates = random_candidates(&mut rng, 60);
        let expected = accepted_set(matcher.run(&candidates).matching.pairs());
        for _ in 0..5 {
            candidates.shuffle(&mut rng);
            let got = accepted_set(matcher.run(&candidates).matching.pairs());
            assert_eq!(expected, got);
        }
    }
}

#[test]
fn test_every_accepted_entity_is_claimed_once_at_its_first_floor() {
    let matcher = GreedyMatcher::default();
    let mut rng = StdRng::seed_from_u64(11);

    for _ in 0..20 {
        let candidates = random_candidates(&mut rng, 80);
        let outcome = matcher.run(&candidates);

        // the first accepted pair (in ranked order) mentioning an entity fixes its claim
        let mut first_floor: HashMap<String, f64> = HashMap::new();
        for pair in outcome.matching.pairs() {
            first_floor.entry(pair.entity_a.to_string()).or_insert(pair.floor());
            first_floor.entry(pair.entity_b.to_string()).or_insert(pair.floor());
        }

        assert_eq!(outcome.ledger.len(), first_floor.len());
        for (entity, claim) in outcome.ledger.iter() {
            assert_eq!(first_floor.get(entity.as_str()).copied(), Some(claim));
        }

        // later acceptances never sit above an entity's claim
        for pair in outcome.matching.pairs() {
            assert!(outcome.ledger.get(&pair.entity_a).unwrap() >= pair.floor());
            assert!(outcome.ledger.get(&pair.entity_b).unwrap() >= pair.floor());
        }
    }
}

#[test]
fn test_replaying_decisions_reproduces_the_ledger() {
    let matcher = GreedyMatcher::default();
    let mut rng = StdRng::seed_from_u64(23);
    let candidates = random_candidates(&mut rng, 100);
    let outcome = matcher.run(&candidates);

    let mut ledger = Ledger::new();
    let mut accepted = 0;
    for pair in matcher.ranked(&candidates) {
        match matcher.evaluate(pair, &ledger) {
            Decision::Fresh => {
                assert!(ledger.claim(&pair.entity_a, pair.floor()));
                assert!(ledger.claim(&pair.entity_b, pair.floor()));
                accepted += 1;
            }
            Decision::Slack => accepted += 1,
            Decision::Rejected(_) => {}
        }
    }

    assert_eq!(ledger, outcome.ledger);
    assert_eq!(accepted, outcome.stats.fresh + outcome.stats.slack);
}
