//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ClassifierKind, DetectorBlueprint, SourceConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    stop_line_count: usize,
    debounce_threshold: u32,
    classifier: String,
    source: String,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let source = match &blueprint.source {
                SourceConfig::Mock(_) => "mock".to_string(),
                SourceConfig::Replay(replay) => format!("replay ({})", replay.path.display()),
            };

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    stop_line_count: blueprint.detector.stop_line_positions.len(),
                    debounce_threshold: blueprint.detector.debounce.threshold,
                    classifier: format!("{:?}", blueprint.classifier.kind),
                    source,
                    sink_count: blueprint.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &DetectorBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - publications will be discarded".to_string());
    }

    if blueprint.detector.debounce.threshold == 1 {
        warnings.push("debounce.threshold is 1 - every raw color is promoted".to_string());
    }

    let positions = &blueprint.detector.stop_line_positions;
    for (i, position) in positions.iter().enumerate() {
        if positions[..i].contains(position) {
            warnings.push(format!(
                "Stop line {} duplicates an earlier position ({}, {})",
                i, position.x, position.y
            ));
        }
    }

    match &blueprint.source {
        SourceConfig::Replay(replay) => {
            if !replay.path.exists() {
                warnings.push(format!(
                    "Replay file {} does not exist yet",
                    replay.path.display()
                ));
            }
            if blueprint.classifier.kind == ClassifierKind::GroundTruth {
                warnings.push(
                    "ground_truth classifier needs `lights` records in the replay, otherwise every frame is UNKNOWN"
                        .to_string(),
                );
            }
        }
        SourceConfig::Mock(simulation) => {
            if simulation.speed_mps == 0.0 {
                warnings.push("source.speed_mps is 0 - the vehicle never moves".to_string());
            }
            if simulation.noise_rate > 0.0
                && blueprint.classifier.kind == ClassifierKind::GroundTruth
            {
                warnings.push(
                    "source.noise_rate has no effect with the ground_truth classifier".to_string(),
                );
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Stop lines: {}", summary.stop_line_count);
            println!("  Debounce threshold: {}", summary.debounce_threshold);
            println!("  Classifier: {}", summary.classifier);
            println!("  Source: {}", summary.source);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
