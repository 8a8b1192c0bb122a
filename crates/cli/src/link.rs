//! `orglink run | train | validate`: config-driven record linkage.

use std::path::{Path, PathBuf};

use orglink_linkage::engine::{load_csv_records, load_labeled_pairs, train_only};
use orglink_linkage::{LinkageConfig, LinkageError, LinkageInput};

use crate::exit_codes::{linkage_exit_code, EXIT_CONFIG, EXIT_ERROR, EXIT_IO};
use crate::CliError;

/// Flag overrides for `orglink run`. `None` keeps the config value.
#[derive(Debug)]
pub struct RunOverrides {
    pub max_matches: Option<i64>,
    pub block_on_city: Option<bool>,
    pub parallel: Option<bool>,
}

fn link_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn engine_err(err: LinkageError) -> CliError {
    let hint = match &err {
        LinkageError::UnknownRecordId { .. } => {
            Some("check that the labeled pair was not removed by exclude_names".to_string())
        }
        LinkageError::NoTrainingExamples { .. } => {
            Some("both training files need at least one row".to_string())
        }
        _ => None,
    };
    CliError { code: linkage_exit_code(&err), message: err.to_string(), hint }
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| link_err(EXIT_IO, format!("cannot read {}: {e}", path.display())))
}

fn load_config(config_path: &Path) -> Result<LinkageConfig, CliError> {
    log::info!("config: {}", config_path.display());
    let config_str = read_file(config_path)?;
    LinkageConfig::from_toml(&config_str).map_err(engine_err)
}

/// Load both datasets and both training files, resolved relative to the
/// config file's directory.
fn load_input(config_path: &Path, config: &LinkageConfig) -> Result<LinkageInput, CliError> {
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let left_csv = read_file(&base_dir.join(&config.left.file))?;
    let right_csv = read_file(&base_dir.join(&config.right.file))?;
    let matches_csv = read_file(&base_dir.join(&config.training.matches))?;
    let non_matches_csv = read_file(&base_dir.join(&config.training.non_matches))?;

    Ok(LinkageInput {
        left: load_csv_records("left", &left_csv, &config.left).map_err(engine_err)?,
        right: load_csv_records("right", &right_csv, &config.right).map_err(engine_err)?,
        matches: load_labeled_pairs("matches", &matches_csv, &config.training)
            .map_err(engine_err)?,
        non_matches: load_labeled_pairs("non_matches", &non_matches_csv, &config.training)
            .map_err(engine_err)?,
    })
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    overrides: RunOverrides,
) -> Result<(), CliError> {
    let mut config = load_config(&config_path)?;

    if let Some(n) = overrides.max_matches {
        config.matching.max_matches = Some(n);
    }
    if let Some(block) = overrides.block_on_city {
        config.matching.block_on_city = block;
    }
    if let Some(parallel) = overrides.parallel {
        config.matching.parallel = parallel;
    }
    config.validate().map_err(engine_err)?;

    let input = load_input(&config_path, &config)?;
    let result = orglink_linkage::run(&config, &input).map_err(engine_err)?;

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| link_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    // --output wins over [output].json from the config
    let output_path = output_file.or_else(|| {
        config.output.json.as_ref().map(|p| {
            config_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(p)
        })
    });
    if let Some(ref path) = output_path {
        std::fs::write(path, &json_str)
            .map_err(|e| link_err(EXIT_IO, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    let s = &result.summary;
    eprintln!(
        "{}: {} x {} records, {} candidates evaluated, {} matches{}",
        result.meta.config_name,
        s.left_records,
        s.right_records,
        s.candidates_evaluated,
        s.matches_found,
        if s.truncated { " (stopped at max_matches)" } else { "" },
    );
    eprintln!(
        "signatures: {} match, {} non-match, {} maybe (trained on {} + {} examples)",
        s.signature_labels.r#match,
        s.signature_labels.non_match,
        s.signature_labels.maybe_match,
        s.match_examples,
        s.non_match_examples,
    );

    Ok(())
}

// ---------------------------------------------------------------------------
// train
// ---------------------------------------------------------------------------

pub fn cmd_train(config_path: PathBuf, json_output: bool) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let input = load_input(&config_path, &config)?;
    let model = train_only(&config, &input).map_err(engine_err)?;

    if json_output {
        let json_str = serde_json::to_string_pretty(&model)
            .map_err(|e| link_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    println!(
        "{:>4}  {:<28} {:>8} {:>10}  {}",
        "rank", "signature", "p_match", "p_nonmatch", "label"
    );
    for (pos, entry) in model.ranking.iter().enumerate() {
        println!(
            "{:>4}  {:<28} {:>8.4} {:>10.4}  {}",
            pos + 1,
            entry.signature.to_string(),
            entry.p_match,
            entry.p_nonmatch,
            model.table.get(entry.signature),
        );
    }
    eprintln!(
        "trained on {} matches, {} non-matches",
        model.match_examples, model.non_match_examples
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = read_file(&config_path)?;
    match LinkageConfig::from_toml(&config_str) {
        Ok(config) => {
            eprintln!(
                "valid: {} (left: {}, right: {})",
                config.name, config.left.file, config.right.file
            );
            Ok(())
        }
        Err(e) => {
            let code = linkage_exit_code(&e);
            Err(CliError {
                code,
                message: format!("invalid config: {e}"),
                hint: (code == EXIT_CONFIG)
                    .then(|| "see [left], [right], [training] and [budget] sections".to_string()),
            })
        }
    }
}
