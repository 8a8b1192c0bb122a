use serde::Deserialize;

use crate::classifier::ErrorBudget;
use crate::error::LinkageError;
use crate::matcher::MatchOptions;
use crate::normalize::NameFilter;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LinkageConfig {
    pub name: String,
    /// Dataset A (outer loop when matching).
    pub left: DatasetConfig,
    /// Dataset B (inner loop when matching).
    pub right: DatasetConfig,
    pub training: TrainingConfig,
    pub budget: BudgetConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub file: String,
    pub columns: ColumnMapping,
    /// Case-insensitive regexes; matching organization names are dropped.
    #[serde(default)]
    pub exclude_names: Vec<String>,
}

impl DatasetConfig {
    pub fn name_filter(&self) -> Result<NameFilter, LinkageError> {
        NameFilter::new(&self.exclude_names)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    pub id: String,
    pub org_name: String,
    pub city: String,
    pub zip: String,
}

// ---------------------------------------------------------------------------
// Training
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// CSV of known matching pairs.
    pub matches: String,
    /// CSV of known non-matching pairs.
    pub non_matches: String,
    #[serde(default = "default_left_id")]
    pub left_id: String,
    #[serde(default = "default_right_id")]
    pub right_id: String,
}

fn default_left_id() -> String {
    "left_id".into()
}

fn default_right_id() -> String {
    "right_id".into()
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BudgetConfig {
    pub max_false_positives: f64,
    pub max_false_negatives: f64,
}

// ---------------------------------------------------------------------------
// Matching + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MatchingConfig {
    /// Omitted = unbounded.
    #[serde(default)]
    pub max_matches: Option<i64>,
    #[serde(default)]
    pub block_on_city: bool,
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LinkageConfig {
    pub fn from_toml(input: &str) -> Result<Self, LinkageError> {
        let config: LinkageConfig =
            toml::from_str(input).map_err(|e| LinkageError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LinkageError> {
        self.error_budget()?;
        self.match_options()?;

        for (side, dataset) in [("left", &self.left), ("right", &self.right)] {
            if dataset.file.trim().is_empty() {
                return Err(LinkageError::ConfigValidation(format!(
                    "{side}: file must not be empty"
                )));
            }
            let cols = &dataset.columns;
            for (field, column) in [
                ("id", &cols.id),
                ("org_name", &cols.org_name),
                ("city", &cols.city),
                ("zip", &cols.zip),
            ] {
                if column.trim().is_empty() {
                    return Err(LinkageError::ConfigValidation(format!(
                        "{side}.columns.{field} must not be empty"
                    )));
                }
            }
            dataset.name_filter()?;
        }

        if self.training.matches.trim().is_empty() || self.training.non_matches.trim().is_empty() {
            return Err(LinkageError::ConfigValidation(
                "training.matches and training.non_matches are required".into(),
            ));
        }

        Ok(())
    }

    pub fn error_budget(&self) -> Result<ErrorBudget, LinkageError> {
        ErrorBudget::new(
            self.budget.max_false_positives,
            self.budget.max_false_negatives,
        )
    }

    pub fn match_options(&self) -> Result<MatchOptions, LinkageError> {
        let max_matches = match self.matching.max_matches {
            None => None,
            Some(n) if n < 0 => return Err(LinkageError::InvalidMaxMatches(n)),
            Some(n) => Some(
                usize::try_from(n).map_err(|_| LinkageError::InvalidMaxMatches(n))?,
            ),
        };
        Ok(MatchOptions {
            max_matches,
            block_on_city: self.matching.block_on_city,
            parallel: self.matching.parallel,
        })
    }
}
