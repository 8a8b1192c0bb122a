use crate::classifier::{self, RecordIndex, TrainedModel};
use crate::config::{DatasetConfig, LinkageConfig, TrainingConfig};
use crate::error::LinkageError;
use crate::matcher::find_matches;
use crate::model::{
    LabelCounts, LabeledPair, LinkageInput, LinkageMeta, LinkageResult, LinkageSummary, Record,
};
use crate::normalize::normalize_record;

/// Train once, match once. Returns the label table, ranking, and matches.
pub fn run(config: &LinkageConfig, input: &LinkageInput) -> Result<LinkageResult, LinkageError> {
    let budget = config.error_budget()?;
    let options = config.match_options()?;

    let model = train_only(config, input)?;
    let output = find_matches(&input.left, &input.right, &model.table, &options);

    let summary = LinkageSummary {
        left_records: input.left.len(),
        right_records: input.right.len(),
        match_examples: model.match_examples,
        non_match_examples: model.non_match_examples,
        signature_labels: LabelCounts::from_table(&model.table),
        candidates_evaluated: output.candidates_evaluated,
        matches_found: output.matches.len(),
        truncated: output.truncated,
    };

    Ok(LinkageResult {
        meta: LinkageMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            max_false_positives: budget.max_false_positives(),
            max_false_negatives: budget.max_false_negatives(),
            max_matches: options.max_matches,
            block_on_city: options.block_on_city,
        },
        summary,
        label_table: model.table,
        ranking: model.ranking,
        matches: output.matches,
    })
}

/// Train the label table without matching.
pub fn train_only(
    config: &LinkageConfig,
    input: &LinkageInput,
) -> Result<TrainedModel, LinkageError> {
    let budget = config.error_budget()?;
    let left = RecordIndex::new("left", &input.left)?;
    let right = RecordIndex::new("right", &input.right)?;
    classifier::train(&left, &right, &input.matches, &input.non_matches, &budget)
}

fn column_index(headers: &csv::StringRecord, dataset: &str, name: &str) -> Result<usize, LinkageError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| LinkageError::MissingColumn {
            dataset: dataset.into(),
            column: name.into(),
        })
}

fn parse_id(dataset: &str, raw: &str) -> Result<i64, LinkageError> {
    raw.trim().parse().map_err(|_| LinkageError::IdParse {
        dataset: dataset.into(),
        value: raw.into(),
    })
}

/// Load CSV rows into canonical Records, applying the column mapping and
/// the dataset's name filter.
pub fn load_csv_records(
    dataset: &str,
    csv_data: &str,
    dataset_config: &DatasetConfig,
) -> Result<Vec<Record>, LinkageError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| LinkageError::Io(e.to_string()))?
        .clone();

    let col = &dataset_config.columns;
    let id_idx = column_index(&headers, dataset, &col.id)?;
    let name_idx = column_index(&headers, dataset, &col.org_name)?;
    let city_idx = column_index(&headers, dataset, &col.city)?;
    let zip_idx = column_index(&headers, dataset, &col.zip)?;

    let filter = dataset_config.name_filter()?;
    let mut records = Vec::new();
    let mut dropped = 0usize;

    for row in reader.records() {
        let row = row.map_err(|e| LinkageError::Io(e.to_string()))?;
        let id = parse_id(dataset, row.get(id_idx).unwrap_or(""))?;
        let record = normalize_record(
            id,
            row.get(name_idx).unwrap_or(""),
            row.get(city_idx).unwrap_or(""),
            row.get(zip_idx).unwrap_or(""),
        );

        if filter.excludes(&record.org_name) {
            log::debug!("{dataset}: dropping record {} ('{}')", record.id, record.org_name);
            dropped += 1;
            continue;
        }
        records.push(record);
    }

    log::info!(
        "{dataset}: loaded {} records ({} dropped by name filter)",
        records.len(),
        dropped
    );
    Ok(records)
}

/// Load labeled `(left_id, right_id)` pairs.
pub fn load_labeled_pairs(
    label: &str,
    csv_data: &str,
    training: &TrainingConfig,
) -> Result<Vec<LabeledPair>, LinkageError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| LinkageError::Io(e.to_string()))?
        .clone();
    let left_idx = column_index(&headers, label, &training.left_id)?;
    let right_idx = column_index(&headers, label, &training.right_id)?;

    let mut pairs = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| LinkageError::Io(e.to_string()))?;
        pairs.push(LabeledPair {
            left_id: parse_id(label, row.get(left_idx).unwrap_or(""))?,
            right_id: parse_id(label, row.get(right_idx).unwrap_or(""))?,
        });
    }

    log::info!("{label}: loaded {} labeled pairs", pairs.len());
    Ok(pairs)
}
