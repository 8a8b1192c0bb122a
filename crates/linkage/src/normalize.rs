//! Canonicalization of raw registry fields into [`Record`]s.

use regex::{Regex, RegexBuilder};

use crate::error::LinkageError;
use crate::model::Record;

pub const ZIP_LEN: usize = 5;

/// Trim surrounding whitespace and lowercase.
pub fn normalize_text(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalized text truncated to the five-digit ZIP (drops any ZIP+4 suffix).
pub fn normalize_zip(raw: &str) -> String {
    normalize_text(raw).chars().take(ZIP_LEN).collect()
}

pub fn normalize_record(id: i64, org_name: &str, city: &str, zip: &str) -> Record {
    Record {
        id,
        org_name: normalize_text(org_name),
        city: normalize_text(city),
        zip: normalize_zip(zip),
    }
}

/// Drops records whose organization name is a known non-entity
/// (e.g. "self employed").
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    patterns: Vec<Regex>,
}

impl NameFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, LinkageError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p.as_ref())
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        LinkageError::ConfigValidation(format!(
                            "invalid exclude_names pattern '{}': {e}",
                            p.as_ref()
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn excludes(&self, org_name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(org_name))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
