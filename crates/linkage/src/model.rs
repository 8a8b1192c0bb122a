use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use crate::classifier::SignatureLikelihood;
use crate::error::LinkageError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One canonical organization record from either dataset.
///
/// Produced by the cleaning step (see [`crate::normalize`]); the engine never
/// mutates or re-normalizes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub org_name: String,
    pub city: String,
    /// Five characters when present, empty otherwise.
    pub zip: String,
}

/// A labeled training example: `left_id` indexes dataset A, `right_id` dataset B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabeledPair {
    pub left_id: i64,
    pub right_id: i64,
}

/// Pre-loaded datasets plus labeled examples.
pub struct LinkageInput {
    pub left: Vec<Record>,
    pub right: Vec<Record>,
    pub matches: Vec<LabeledPair>,
    pub non_matches: Vec<LabeledPair>,
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

/// Discretized string-similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityBucket {
    High,
    Medium,
    Low,
}

impl SimilarityBucket {
    pub const ALL: [SimilarityBucket; 3] = [Self::High, Self::Medium, Self::Low];

    fn ordinal(self) -> usize {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

impl std::fmt::Display for SimilarityBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// The similarity of a record pair reduced to three discrete features.
///
/// The universe is closed: 3 name buckets × 3 city buckets × 2 zip outcomes.
/// [`SimilaritySignature::index`] maps each signature onto `0..COUNT` in the
/// canonical enumeration order (name outermost, `zip_match = true` first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimilaritySignature {
    pub name_similarity: SimilarityBucket,
    pub city_similarity: SimilarityBucket,
    pub zip_match: bool,
}

impl SimilaritySignature {
    pub const COUNT: usize = 18;

    pub const ALL: [SimilaritySignature; Self::COUNT] = {
        let mut all = [SimilaritySignature {
            name_similarity: SimilarityBucket::High,
            city_similarity: SimilarityBucket::High,
            zip_match: true,
        }; Self::COUNT];
        let mut i = 0;
        while i < Self::COUNT {
            all[i] = Self::decode(i);
            i += 1;
        }
        all
    };

    pub fn new(name: SimilarityBucket, city: SimilarityBucket, zip_match: bool) -> Self {
        Self {
            name_similarity: name,
            city_similarity: city,
            zip_match,
        }
    }

    pub fn index(&self) -> usize {
        self.name_similarity.ordinal() * 6
            + self.city_similarity.ordinal() * 2
            + if self.zip_match { 0 } else { 1 }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        (index < Self::COUNT).then(|| Self::decode(index))
    }

    const fn decode(index: usize) -> Self {
        const BUCKETS: [SimilarityBucket; 3] = SimilarityBucket::ALL;
        Self {
            name_similarity: BUCKETS[index / 6],
            city_similarity: BUCKETS[(index / 2) % 3],
            zip_match: index % 2 == 0,
        }
    }
}

impl std::fmt::Display for SimilaritySignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.name_similarity, self.city_similarity, self.zip_match
        )
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLabel {
    Match,
    NonMatch,
    MaybeMatch,
}

impl std::fmt::Display for MatchLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Match => write!(f, "match"),
            Self::NonMatch => write!(f, "non_match"),
            Self::MaybeMatch => write!(f, "maybe_match"),
        }
    }
}

/// Total mapping from every [`SimilaritySignature`] to a [`MatchLabel`].
///
/// Backed by a fixed array indexed by [`SimilaritySignature::index`], so a
/// lookup can never miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelTable {
    labels: [MatchLabel; SimilaritySignature::COUNT],
}

impl LabelTable {
    /// Every signature labeled `MaybeMatch`.
    pub fn new() -> Self {
        Self {
            labels: [MatchLabel::MaybeMatch; SimilaritySignature::COUNT],
        }
    }

    /// Rebuild a table from explicit entries. Every signature must appear
    /// exactly once.
    pub fn from_entries<I>(entries: I) -> Result<Self, LinkageError>
    where
        I: IntoIterator<Item = (SimilaritySignature, MatchLabel)>,
    {
        let mut slots: [Option<MatchLabel>; SimilaritySignature::COUNT] =
            [None; SimilaritySignature::COUNT];
        let mut total = 0usize;
        for (signature, label) in entries {
            total += 1;
            slots[signature.index()] = Some(label);
        }

        let distinct = slots.iter().filter(|s| s.is_some()).count();
        if distinct != SimilaritySignature::COUNT || total != SimilaritySignature::COUNT {
            return Err(LinkageError::SignatureCount {
                expected: SimilaritySignature::COUNT,
                found: distinct,
            });
        }

        let mut table = Self::new();
        for (i, slot) in slots.iter().enumerate() {
            if let Some(label) = slot {
                table.labels[i] = *label;
            }
        }
        Ok(table)
    }

    pub fn get(&self, signature: SimilaritySignature) -> MatchLabel {
        self.labels[signature.index()]
    }

    pub(crate) fn set(&mut self, signature: SimilaritySignature, label: MatchLabel) {
        self.labels[signature.index()] = label;
    }

    /// `(signature, label)` in canonical enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (SimilaritySignature, MatchLabel)> + '_ {
        SimilaritySignature::ALL
            .iter()
            .map(move |sig| (*sig, self.labels[sig.index()]))
    }

    pub fn count(&self, label: MatchLabel) -> usize {
        self.labels.iter().filter(|l| **l == label).count()
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct LabelEntry {
    name_similarity: SimilarityBucket,
    city_similarity: SimilarityBucket,
    zip_match: bool,
    label: MatchLabel,
}

impl Serialize for LabelTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.labels.len()))?;
        for (sig, label) in self.iter() {
            seq.serialize_element(&LabelEntry {
                name_similarity: sig.name_similarity,
                city_similarity: sig.city_similarity,
                zip_match: sig.zip_match,
                label,
            })?;
        }
        seq.end()
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// A candidate pair the label table classified as `Match`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedPair {
    pub left: Record,
    pub right: Record,
    pub signature: SimilaritySignature,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct LabelCounts {
    pub r#match: usize,
    pub non_match: usize,
    pub maybe_match: usize,
}

impl LabelCounts {
    pub fn from_table(table: &LabelTable) -> Self {
        Self {
            r#match: table.count(MatchLabel::Match),
            non_match: table.count(MatchLabel::NonMatch),
            maybe_match: table.count(MatchLabel::MaybeMatch),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkageSummary {
    pub left_records: usize,
    pub right_records: usize,
    pub match_examples: usize,
    pub non_match_examples: usize,
    pub signature_labels: LabelCounts,
    pub candidates_evaluated: usize,
    pub matches_found: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkageMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub max_false_positives: f64,
    pub max_false_negatives: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_matches: Option<usize>,
    pub block_on_city: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkageResult {
    pub meta: LinkageMeta,
    pub summary: LinkageSummary,
    pub label_table: LabelTable,
    pub ranking: Vec<SignatureLikelihood>,
    pub matches: Vec<LinkedPair>,
}
