// Property-based tests for training and matching.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use proptest::prelude::*;
use orglink_linkage::classifier::{train_signatures, ErrorBudget};
use orglink_linkage::model::{LabelTable, MatchLabel, Record, SimilaritySignature};
use orglink_linkage::{find_matches, MatchOptions};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn config_64() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(64),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

const EPS: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Skewed towards a handful of signatures so most of the universe stays unseen.
fn arb_signature() -> impl Strategy<Value = SimilaritySignature> {
    prop_oneof![
        3 => (0usize..4),
        1 => (0usize..SimilaritySignature::COUNT),
    ]
    .prop_map(|i| SimilaritySignature::from_index(i).unwrap())
}

fn arb_examples() -> impl Strategy<Value = Vec<SimilaritySignature>> {
    prop::collection::vec(arb_signature(), 1..60)
}

fn arb_rate() -> impl Strategy<Value = f64> {
    prop_oneof![
        1 => Just(0.0),
        1 => Just(1.0),
        4 => 0.0..=1.0f64,
    ]
}

fn arb_label() -> impl Strategy<Value = MatchLabel> {
    prop_oneof![
        Just(MatchLabel::Match),
        Just(MatchLabel::NonMatch),
        Just(MatchLabel::MaybeMatch),
    ]
}

fn arb_table() -> impl Strategy<Value = LabelTable> {
    prop::collection::vec(arb_label(), SimilaritySignature::COUNT).prop_map(|labels| {
        LabelTable::from_entries(SimilaritySignature::ALL.iter().copied().zip(labels)).unwrap()
    })
}

fn arb_record(id: i64) -> impl Strategy<Value = Record> {
    let names = prop::sample::select(vec![
        "acme inc",
        "acme incorporated",
        "acme",
        "zenith widgets",
        "blue sky farms",
        "blue sky farm",
    ]);
    let cities = prop::sample::select(vec!["chicago", "chicago heights", "peoria", "urbana"]);
    let zips = prop::sample::select(vec!["60601", "61602", ""]);
    (names, cities, zips).prop_map(move |(n, c, z)| Record {
        id,
        org_name: n.to_string(),
        city: c.to_string(),
        zip: z.to_string(),
    })
}

fn arb_dataset(base: i64, max_len: usize) -> impl Strategy<Value = Vec<Record>> {
    (0..=max_len).prop_flat_map(move |len| {
        (0..len)
            .map(|i| arb_record(base + i as i64))
            .collect::<Vec<_>>()
    })
}

fn budget(fp: f64, fneg: f64) -> ErrorBudget {
    ErrorBudget::new(fp, fneg).unwrap()
}

fn match_set(table: &LabelTable) -> HashSet<SimilaritySignature> {
    table
        .iter()
        .filter(|(_, l)| *l == MatchLabel::Match)
        .map(|(s, _)| s)
        .collect()
}

fn pair_ids(pairs: &[orglink_linkage::LinkedPair]) -> Vec<(i64, i64)> {
    pairs.iter().map(|m| (m.left.id, m.right.id)).collect()
}

// ---------------------------------------------------------------------------
// Training properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn table_is_total(m in arb_examples(), n in arb_examples(), fp in arb_rate(), fneg in arb_rate()) {
        let model = train_signatures(&m, &n, &budget(fp, fneg)).unwrap();
        let keys: HashSet<_> = model.table.iter().map(|(s, _)| s).collect();
        prop_assert_eq!(keys.len(), SimilaritySignature::COUNT);
        for sig in SimilaritySignature::ALL {
            prop_assert!(keys.contains(&sig));
        }
    }

    #[test]
    fn budgets_are_respected(m in arb_examples(), n in arb_examples(), fp in arb_rate(), fneg in arb_rate()) {
        let model = train_signatures(&m, &n, &budget(fp, fneg)).unwrap();
        let mut fp_mass = 0.0;
        let mut fn_mass = 0.0;
        for entry in &model.ranking {
            match model.table.get(entry.signature) {
                MatchLabel::Match => fp_mass += entry.p_nonmatch,
                MatchLabel::NonMatch => fn_mass += entry.p_match,
                MatchLabel::MaybeMatch => {}
            }
        }
        prop_assert!(fp_mass <= fp + EPS, "fp mass {} > {}", fp_mass, fp);
        prop_assert!(fn_mass <= fneg + EPS, "fn mass {} > {}", fn_mass, fneg);
    }

    #[test]
    fn raising_fp_budget_never_removes_a_match(
        m in arb_examples(),
        n in arb_examples(),
        a in arb_rate(),
        b in arb_rate(),
        fneg in arb_rate(),
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let low = train_signatures(&m, &n, &budget(lo, fneg)).unwrap();
        let high = train_signatures(&m, &n, &budget(hi, fneg)).unwrap();
        let low_set = match_set(&low.table);
        let high_set = match_set(&high.table);
        prop_assert!(low_set.is_subset(&high_set));
    }

    #[test]
    fn unseen_signatures_stay_maybe(m in arb_examples(), n in arb_examples(), fp in arb_rate(), fneg in arb_rate()) {
        let model = train_signatures(&m, &n, &budget(fp, fneg)).unwrap();
        let seen: HashSet<_> = m.iter().chain(n.iter()).copied().collect();
        for (sig, label) in model.table.iter() {
            if !seen.contains(&sig) {
                prop_assert_eq!(label, MatchLabel::MaybeMatch);
            }
        }
    }

    #[test]
    fn training_is_deterministic(m in arb_examples(), n in arb_examples(), fp in arb_rate(), fneg in arb_rate()) {
        let first = train_signatures(&m, &n, &budget(fp, fneg)).unwrap();
        let second = train_signatures(&m, &n, &budget(fp, fneg)).unwrap();
        prop_assert_eq!(first.table, second.table);
    }
}

// ---------------------------------------------------------------------------
// Matching properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_64())]

    #[test]
    fn blocking_never_pairs_different_cities(
        left in arb_dataset(0, 12),
        right in arb_dataset(1000, 12),
        table in arb_table(),
    ) {
        let opts = MatchOptions { block_on_city: true, ..MatchOptions::default() };
        let blocked = find_matches(&left, &right, &table, &opts);
        prop_assert!(blocked.matches.iter().all(|m| m.left.city == m.right.city));

        let open = find_matches(&left, &right, &table, &MatchOptions::default());
        let filtered: Vec<_> = open
            .matches
            .iter()
            .filter(|m| m.left.city == m.right.city)
            .cloned()
            .collect();
        prop_assert_eq!(blocked.matches, filtered);
    }

    #[test]
    fn cap_is_respected(
        left in arb_dataset(0, 12),
        right in arb_dataset(1000, 12),
        table in arb_table(),
        k in 0usize..40,
        block_on_city in any::<bool>(),
    ) {
        let open = find_matches(
            &left,
            &right,
            &table,
            &MatchOptions { block_on_city, ..MatchOptions::default() },
        );
        let capped = find_matches(
            &left,
            &right,
            &table,
            &MatchOptions { max_matches: Some(k), block_on_city, parallel: false },
        );
        prop_assert_eq!(capped.matches.len(), k.min(open.matches.len()));
        prop_assert_eq!(pair_ids(&capped.matches), pair_ids(&open.matches[..capped.matches.len()]));
        // Truncated exactly when the scan stopped short of the full candidate set.
        prop_assert_eq!(capped.truncated, capped.candidates_evaluated < open.candidates_evaluated);
    }

    #[test]
    fn unblocked_scan_evaluates_full_cross_product(
        left in arb_dataset(0, 12),
        right in arb_dataset(1000, 12),
        table in arb_table(),
    ) {
        let out = find_matches(&left, &right, &table, &MatchOptions::default());
        prop_assert_eq!(out.candidates_evaluated, left.len() * right.len());
        for m in &out.matches {
            prop_assert_eq!(table.get(m.signature), MatchLabel::Match);
        }
    }

    #[test]
    fn parallel_equals_sequential(
        left in arb_dataset(0, 40),
        right in arb_dataset(1000, 12),
        table in arb_table(),
        cap in prop::option::of(0usize..30),
        block_on_city in any::<bool>(),
    ) {
        let seq = MatchOptions { max_matches: cap, block_on_city, parallel: false };
        let par = MatchOptions { parallel: true, ..seq };
        let a = find_matches(&left, &right, &table, &seq);
        let b = find_matches(&left, &right, &table, &par);
        prop_assert_eq!(pair_ids(&a.matches), pair_ids(&b.matches));
        prop_assert_eq!(a.truncated, b.truncated);
    }
}
