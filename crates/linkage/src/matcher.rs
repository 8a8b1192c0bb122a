use std::collections::HashMap;

use rayon::prelude::*;

use crate::model::{LabelTable, LinkedPair, MatchLabel, Record};
use crate::similarity::compute;

/// Outer rows handed to each worker per parallel wave.
const WAVE_ROWS_PER_THREAD: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Stop once this many matches have been emitted. `None` is unbounded.
    pub max_matches: Option<usize>,
    /// Only evaluate pairs whose `city` fields are exactly equal.
    pub block_on_city: bool,
    /// Evaluate outer rows on the rayon pool.
    pub parallel: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MatchOutput {
    pub matches: Vec<LinkedPair>,
    pub candidates_evaluated: usize,
    /// `true` when the cap stopped the scan with candidates left unevaluated.
    pub truncated: bool,
}

/// Classify candidate pairs of `left × right` and return those labeled `Match`.
///
/// Candidates are visited outer over `left`, inner over `right`, in slice
/// order, and results come back in that order. With `max_matches` set the
/// scan stops at the cap. The parallel path returns exactly the same
/// sequence; it only short-circuits per wave, so `candidates_evaluated` can
/// be larger.
pub fn find_matches(
    left: &[Record],
    right: &[Record],
    table: &LabelTable,
    options: &MatchOptions,
) -> MatchOutput {
    log::info!(
        "matching {} x {} records (block_on_city={}, parallel={}, max_matches={:?})",
        left.len(),
        right.len(),
        options.block_on_city,
        options.parallel,
        options.max_matches,
    );

    let source = CandidateSource::new(right, options.block_on_city);
    let output = if options.max_matches == Some(0) {
        MatchOutput {
            truncated: left.iter().any(|l| source.candidates(l).next().is_some()),
            ..MatchOutput::default()
        }
    } else if options.parallel {
        match_parallel(left, right, table, &source, options.max_matches)
    } else {
        match_sequential(left, right, table, &source, options.max_matches)
    };

    log::info!(
        "evaluated {} candidate pairs, {} matches{}",
        output.candidates_evaluated,
        output.matches.len(),
        if output.truncated { " (stopped at cap)" } else { "" },
    );
    output
}

fn match_sequential(
    left: &[Record],
    right: &[Record],
    table: &LabelTable,
    source: &CandidateSource<'_>,
    cap: Option<usize>,
) -> MatchOutput {
    let mut out = MatchOutput::default();
    for (i, left_rec) in left.iter().enumerate() {
        let remaining = cap.map(|c| c - out.matches.len());
        let row = evaluate_row(left_rec, right, source.candidates(left_rec), table, remaining);
        out.candidates_evaluated += row.evaluated;
        out.matches.extend(row.matches);
        if cap.is_some_and(|c| out.matches.len() >= c) {
            if let Some(&pos) = row.positions.last() {
                out.truncated = source.any_after(left, i, pos);
            }
            break;
        }
    }
    out
}

fn match_parallel(
    left: &[Record],
    right: &[Record],
    table: &LabelTable,
    source: &CandidateSource<'_>,
    cap: Option<usize>,
) -> MatchOutput {
    let wave = rayon::current_num_threads().max(1) * WAVE_ROWS_PER_THREAD;
    let mut out = MatchOutput::default();

    for (w, rows) in left.chunks(wave).enumerate() {
        let remaining = cap.map(|c| c - out.matches.len());
        let outcomes: Vec<RowOutcome> = rows
            .par_iter()
            .map(|left_rec| {
                evaluate_row(left_rec, right, source.candidates(left_rec), table, remaining)
            })
            .collect();

        // Merge back in row order, then truncate at the cap.
        for (k, row) in outcomes.into_iter().enumerate() {
            let before = out.matches.len();
            out.candidates_evaluated += row.evaluated;
            out.matches.extend(row.matches);
            if let Some(c) = cap {
                if out.matches.len() >= c {
                    out.matches.truncate(c);
                    if let Some(&pos) = row.positions.get(c - before - 1) {
                        out.truncated = source.any_after(left, w * wave + k, pos);
                    }
                    return out;
                }
            }
        }
    }
    out
}

struct RowOutcome {
    matches: Vec<LinkedPair>,
    /// Right-side position of each match.
    positions: Vec<usize>,
    evaluated: usize,
}

/// Evaluate one outer record against its candidates, stopping after `limit` matches.
fn evaluate_row(
    left_rec: &Record,
    right: &[Record],
    candidates: Candidates<'_>,
    table: &LabelTable,
    limit: Option<usize>,
) -> RowOutcome {
    let mut matches = Vec::new();
    let mut positions = Vec::new();
    let mut evaluated = 0;

    for j in candidates {
        let right_rec = &right[j];
        evaluated += 1;
        let signature = compute(left_rec, right_rec);
        if table.get(signature) == MatchLabel::Match {
            matches.push(LinkedPair {
                left: left_rec.clone(),
                right: right_rec.clone(),
                signature,
            });
            positions.push(j);
            if limit.is_some_and(|l| matches.len() >= l) {
                break;
            }
        }
    }

    RowOutcome {
        matches,
        positions,
        evaluated,
    }
}

// ---------------------------------------------------------------------------
// Candidate generation
// ---------------------------------------------------------------------------

/// Inner-loop positions for each outer record.
///
/// With blocking, right records are bucketed by city once; each bucket holds
/// ascending positions, so the visit order matches a filtered full scan.
struct CandidateSource<'a> {
    right_len: usize,
    by_city: Option<HashMap<&'a str, Vec<usize>>>,
}

impl<'a> CandidateSource<'a> {
    fn new(right: &'a [Record], block_on_city: bool) -> Self {
        let by_city = block_on_city.then(|| {
            let mut index: HashMap<&'a str, Vec<usize>> = HashMap::new();
            for (j, rec) in right.iter().enumerate() {
                index.entry(rec.city.as_str()).or_default().push(j);
            }
            index
        });
        Self {
            right_len: right.len(),
            by_city,
        }
    }

    fn candidates(&self, left_rec: &Record) -> Candidates<'_> {
        match &self.by_city {
            None => Candidates::All(0..self.right_len),
            Some(index) => Candidates::Blocked(
                index
                    .get(left_rec.city.as_str())
                    .map(|v| v.as_slice())
                    .unwrap_or(&[])
                    .iter(),
            ),
        }
    }
}

impl CandidateSource<'_> {
    /// Whether any candidate follows position `pos` of outer row `row` in scan order.
    fn any_after(&self, left: &[Record], row: usize, pos: usize) -> bool {
        self.candidates(&left[row]).any(|j| j > pos)
            || left[row + 1..]
                .iter()
                .any(|l| self.candidates(l).next().is_some())
    }
}

enum Candidates<'s> {
    All(std::ops::Range<usize>),
    Blocked(std::slice::Iter<'s, usize>),
}

impl Iterator for Candidates<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            Self::All(range) => range.next(),
            Self::Blocked(iter) => iter.next().copied(),
        }
    }
}
