use crate::model::{Record, SimilarityBucket, SimilaritySignature};

/// Scores at or above this are `High`.
pub const HIGH_THRESHOLD: f64 = 0.95;
/// Scores at or above this (and below [`HIGH_THRESHOLD`]) are `Medium`.
pub const MEDIUM_THRESHOLD: f64 = 0.80;

/// Jaro-Winkler similarity in `[0, 1]`. An empty side scores 0.
pub fn score(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::jaro_winkler(a, b)
}

pub fn bucket_for_score(score: f64) -> SimilarityBucket {
    if score >= HIGH_THRESHOLD {
        SimilarityBucket::High
    } else if score >= MEDIUM_THRESHOLD {
        SimilarityBucket::Medium
    } else {
        SimilarityBucket::Low
    }
}

/// Reduce a record pair to its similarity signature.
pub fn compute(a: &Record, b: &Record) -> SimilaritySignature {
    SimilaritySignature {
        name_similarity: bucket_for_score(score(&a.org_name, &b.org_name)),
        city_similarity: bucket_for_score(score(&a.city, &b.city)),
        zip_match: a.zip == b.zip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: i64, name: &str, city: &str, zip: &str) -> Record {
        Record {
            id,
            org_name: name.into(),
            city: city.into(),
            zip: zip.into(),
        }
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(bucket_for_score(0.97), SimilarityBucket::High);
        assert_eq!(bucket_for_score(0.95), SimilarityBucket::High);
        assert_eq!(bucket_for_score(0.9499), SimilarityBucket::Medium);
        assert_eq!(bucket_for_score(0.85), SimilarityBucket::Medium);
        assert_eq!(bucket_for_score(0.80), SimilarityBucket::Medium);
        assert_eq!(bucket_for_score(0.7999), SimilarityBucket::Low);
        assert_eq!(bucket_for_score(0.5), SimilarityBucket::Low);
        assert_eq!(bucket_for_score(0.0), SimilarityBucket::Low);
    }

    #[test]
    fn identical_records_are_high_high_match() {
        let a = rec(1, "acme inc", "chicago", "60601");
        let b = rec(2, "acme inc", "chicago", "60601");
        let sig = compute(&a, &b);
        assert_eq!(sig.name_similarity, SimilarityBucket::High);
        assert_eq!(sig.city_similarity, SimilarityBucket::High);
        assert!(sig.zip_match);
    }

    #[test]
    fn common_prefix_is_boosted() {
        // "acme inc" is a full prefix of "acme incorporated": Jaro ~0.82, Winkler ~0.89
        let s = score("acme inc", "acme incorporated");
        assert!(s > 0.85 && s < 0.95, "score was {s}");
        assert_eq!(bucket_for_score(s), SimilarityBucket::Medium);
    }

    #[test]
    fn unrelated_names_are_low() {
        let a = rec(1, "acme inc", "chicago", "60601");
        let b = rec(2, "zenith widgets", "peoria", "61602");
        let sig = compute(&a, &b);
        assert_eq!(sig.name_similarity, SimilarityBucket::Low);
        assert_eq!(sig.city_similarity, SimilarityBucket::Low);
        assert!(!sig.zip_match);
    }

    #[test]
    fn empty_zips_only_equal_each_other() {
        let a = rec(1, "acme", "chicago", "");
        let b = rec(2, "acme", "chicago", "");
        let c = rec(3, "acme", "chicago", "60601");
        assert!(compute(&a, &b).zip_match);
        assert!(!compute(&a, &c).zip_match);
    }

    #[test]
    fn empty_field_scores_zero() {
        assert_eq!(score("", "chicago"), 0.0);
        assert_eq!(score("", ""), 0.0);
    }

    #[test]
    fn score_is_symmetric_for_plain_names() {
        let ab = score("springfield", "springfeld");
        let ba = score("springfeld", "springfield");
        assert!((ab - ba).abs() < 1e-12);
    }
}
