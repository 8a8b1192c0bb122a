//! Training: derive a total [`LabelTable`] from labeled example pairs.
//!
//! Every signature is scored by the likelihood ratio
//! `P(signature | match) / P(signature | non-match)` and the 18 signatures
//! are ranked by it. A forward pass from the top of the ranking labels
//! signatures `Match` while the accumulated non-match mass (the false-positive
//! rate) stays within budget; a backward pass from the bottom labels them
//! `NonMatch` while the accumulated match mass (the false-negative rate) stays
//! within budget. Whatever neither pass claims stays `MaybeMatch`.
//!
//! The two passes are independent. With generous budgets both can claim the
//! same signature; the backward pass runs second and its label stands.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::error::LinkageError;
use crate::model::{LabelTable, LabeledPair, MatchLabel, Record, SimilaritySignature};
use crate::similarity::compute;

// ---------------------------------------------------------------------------
// Budget
// ---------------------------------------------------------------------------

/// Caller-specified error-rate tolerances, both within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorBudget {
    max_false_positives: f64,
    max_false_negatives: f64,
}

impl ErrorBudget {
    pub fn new(max_false_positives: f64, max_false_negatives: f64) -> Result<Self, LinkageError> {
        Ok(Self {
            max_false_positives: check_rate("max_false_positives", max_false_positives)?,
            max_false_negatives: check_rate("max_false_negatives", max_false_negatives)?,
        })
    }

    pub fn max_false_positives(&self) -> f64 {
        self.max_false_positives
    }

    pub fn max_false_negatives(&self) -> f64 {
        self.max_false_negatives
    }
}

fn check_rate(name: &'static str, value: f64) -> Result<f64, LinkageError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(LinkageError::InvalidBudget { name, value })
    }
}

// ---------------------------------------------------------------------------
// Record lookup
// ---------------------------------------------------------------------------

/// Id → record lookup over one dataset.
pub struct RecordIndex<'a> {
    dataset: &'static str,
    by_id: HashMap<i64, &'a Record>,
}

impl<'a> RecordIndex<'a> {
    pub fn new(dataset: &'static str, records: &'a [Record]) -> Result<Self, LinkageError> {
        let mut by_id = HashMap::with_capacity(records.len());
        for record in records {
            if by_id.insert(record.id, record).is_some() {
                return Err(LinkageError::DuplicateRecordId { dataset, id: record.id });
            }
        }
        Ok(Self { dataset, by_id })
    }

    pub fn get(&self, id: i64) -> Result<&'a Record, LinkageError> {
        self.by_id.get(&id).copied().ok_or(LinkageError::UnknownRecordId {
            dataset: self.dataset,
            id,
        })
    }

}

// ---------------------------------------------------------------------------
// Counting
// ---------------------------------------------------------------------------

/// Per-signature occurrence counts for both classes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureCounts {
    matches: [usize; SimilaritySignature::COUNT],
    non_matches: [usize; SimilaritySignature::COUNT],
    total_matches: usize,
    total_non_matches: usize,
}

impl SignatureCounts {
    pub fn from_signatures<M, N>(match_sigs: M, non_match_sigs: N) -> Self
    where
        M: IntoIterator<Item = SimilaritySignature>,
        N: IntoIterator<Item = SimilaritySignature>,
    {
        let mut counts = Self::default();
        for sig in match_sigs {
            counts.matches[sig.index()] += 1;
            counts.total_matches += 1;
        }
        for sig in non_match_sigs {
            counts.non_matches[sig.index()] += 1;
            counts.total_non_matches += 1;
        }
        counts
    }

    pub fn match_count(&self, signature: SimilaritySignature) -> usize {
        self.matches[signature.index()]
    }

    pub fn non_match_count(&self, signature: SimilaritySignature) -> usize {
        self.non_matches[signature.index()]
    }

    pub fn total_matches(&self) -> usize {
        self.total_matches
    }

    pub fn total_non_matches(&self) -> usize {
        self.total_non_matches
    }

    fn likelihood(&self, signature: SimilaritySignature) -> SignatureLikelihood {
        let p_match = fraction(self.match_count(signature), self.total_matches);
        let p_nonmatch = fraction(self.non_match_count(signature), self.total_non_matches);
        SignatureLikelihood {
            signature,
            p_match,
            p_nonmatch,
            key: RankKey::new(p_match, p_nonmatch),
        }
    }
}

fn fraction(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Resolve each labeled pair to its records and compute the signature.
pub fn signatures_for(
    left: &RecordIndex<'_>,
    right: &RecordIndex<'_>,
    pairs: &[LabeledPair],
) -> Result<Vec<SimilaritySignature>, LinkageError> {
    pairs
        .iter()
        .map(|pair| Ok(compute(left.get(pair.left_id)?, right.get(pair.right_id)?)))
        .collect()
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Likelihood-ratio sort key.
///
/// `Saturated` stands in for "`p_match` over zero non-match mass": with a
/// positive `p_match` it outranks every finite ratio, and saturated keys order
/// among themselves by `p_match`. A saturated key with `p_match == 0` (a
/// signature never observed) carries no evidence and ranks as `Ratio(0.0)`.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RankKey {
    Ratio(f64),
    Saturated(f64),
}

impl RankKey {
    pub fn new(p_match: f64, p_nonmatch: f64) -> Self {
        if p_nonmatch > 0.0 {
            Self::Ratio(p_match / p_nonmatch)
        } else {
            Self::Saturated(p_match)
        }
    }

    fn tier(&self) -> (u8, f64) {
        match *self {
            Self::Saturated(p) if p > 0.0 => (1, p),
            Self::Saturated(_) => (0, 0.0),
            Self::Ratio(r) => (0, r),
        }
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let (tier_a, value_a) = self.tier();
        let (tier_b, value_b) = other.tier();
        tier_a.cmp(&tier_b).then_with(|| value_a.total_cmp(&value_b))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankKey {}

/// Empirical likelihoods of one signature under each class.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SignatureLikelihood {
    pub signature: SimilaritySignature,
    pub p_match: f64,
    pub p_nonmatch: f64,
    pub key: RankKey,
}

impl SignatureLikelihood {
    /// Seen at least once in either class.
    pub fn is_observed(&self) -> bool {
        self.p_match > 0.0 || self.p_nonmatch > 0.0
    }
}

/// All 18 signatures, most match-like first. Ties keep canonical order.
pub fn rank(counts: &SignatureCounts) -> Vec<SignatureLikelihood> {
    let mut ranked: Vec<SignatureLikelihood> = SimilaritySignature::ALL
        .iter()
        .map(|sig| counts.likelihood(*sig))
        .collect();
    ranked.sort_by(|a, b| b.key.cmp(&a.key));
    ranked
}

// ---------------------------------------------------------------------------
// Labeling
// ---------------------------------------------------------------------------

/// Run the forward (`Match`) and backward (`NonMatch`) passes over a ranking.
pub fn assign_labels(ranked: &[SignatureLikelihood], budget: &ErrorBudget) -> LabelTable {
    let mut table = LabelTable::new();
    forward_pass(&mut table, ranked, budget.max_false_positives);
    backward_pass(&mut table, ranked, budget.max_false_negatives);
    table
}

/// Label from the top while the accumulated non-match mass fits `limit`.
/// Unobserved signatures are stepped over, not treated as the end of the walk.
fn forward_pass(table: &mut LabelTable, ranked: &[SignatureLikelihood], limit: f64) {
    let mut fp_mass = 0.0;
    for entry in ranked.iter().filter(|e| e.is_observed()) {
        if fp_mass + entry.p_nonmatch > limit {
            break;
        }
        table.set(entry.signature, MatchLabel::Match);
        fp_mass += entry.p_nonmatch;
    }
}

/// Label from the bottom while the accumulated match mass fits `limit`.
fn backward_pass(table: &mut LabelTable, ranked: &[SignatureLikelihood], limit: f64) {
    let mut fn_mass = 0.0;
    for entry in ranked.iter().rev().filter(|e| e.is_observed()) {
        if fn_mass + entry.p_match > limit {
            break;
        }
        if table.get(entry.signature) == MatchLabel::Match {
            log::debug!(
                "signature {} claimed by both passes, labeling non_match",
                entry.signature
            );
        }
        table.set(entry.signature, MatchLabel::NonMatch);
        fn_mass += entry.p_match;
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Outcome of a training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainedModel {
    pub table: LabelTable,
    pub ranking: Vec<SignatureLikelihood>,
    pub match_examples: usize,
    pub non_match_examples: usize,
}

/// Train from labeled id pairs resolved against both datasets.
pub fn train(
    left: &RecordIndex<'_>,
    right: &RecordIndex<'_>,
    matches: &[LabeledPair],
    non_matches: &[LabeledPair],
    budget: &ErrorBudget,
) -> Result<TrainedModel, LinkageError> {
    check_examples(matches.len(), non_matches.len())?;
    let match_sigs = signatures_for(left, right, matches)?;
    let non_match_sigs = signatures_for(left, right, non_matches)?;
    train_signatures(&match_sigs, &non_match_sigs, budget)
}

/// Train from precomputed signatures.
pub fn train_signatures(
    match_sigs: &[SimilaritySignature],
    non_match_sigs: &[SimilaritySignature],
    budget: &ErrorBudget,
) -> Result<TrainedModel, LinkageError> {
    check_examples(match_sigs.len(), non_match_sigs.len())?;

    let counts =
        SignatureCounts::from_signatures(match_sigs.iter().copied(), non_match_sigs.iter().copied());
    let ranking = rank(&counts);
    for (pos, entry) in ranking.iter().enumerate() {
        log::debug!(
            "rank {:>2}: {} p_match={:.4} p_nonmatch={:.4}",
            pos + 1,
            entry.signature,
            entry.p_match,
            entry.p_nonmatch
        );
    }

    let table = assign_labels(&ranking, budget);
    log::info!(
        "trained label table from {} matches / {} non-matches: {} match, {} non_match, {} maybe_match",
        counts.total_matches(),
        counts.total_non_matches(),
        table.count(MatchLabel::Match),
        table.count(MatchLabel::NonMatch),
        table.count(MatchLabel::MaybeMatch),
    );

    Ok(TrainedModel {
        table,
        ranking,
        match_examples: counts.total_matches(),
        non_match_examples: counts.total_non_matches(),
    })
}

fn check_examples(matches: usize, non_matches: usize) -> Result<(), LinkageError> {
    if matches == 0 {
        return Err(LinkageError::NoTrainingExamples { class: "matches" });
    }
    if non_matches == 0 {
        return Err(LinkageError::NoTrainingExamples { class: "non-matches" });
    }
    Ok(())
}
