//! Configuration validation
//!
//! Rules:
//! - field-level ranges declared on the contract types (`Validate` derive)
//! - stop-line positions are finite
//! - the fixed classifier has a non-empty label sequence
//! - the drive source is usable (route not empty, replay path set)
//! - sink names are unique

use std::collections::HashSet;

use ::validator::Validate;
use contracts::{ClassifierKind, ContractError, DetectorBlueprint, SinkType, SourceConfig};

/// Validate a DetectorBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &DetectorBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_stop_lines(blueprint)?;
    validate_classifier(blueprint)?;
    validate_source(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// Declarative field checks
fn validate_fields(blueprint: &DetectorBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("fields", e.to_string()))
}

fn validate_stop_lines(blueprint: &DetectorBlueprint) -> Result<(), ContractError> {
    for (idx, position) in blueprint.detector.stop_line_positions.iter().enumerate() {
        if !position.is_finite() {
            return Err(ContractError::config_validation(
                format!("detector.stop_line_positions[{idx}]"),
                format!("position must be finite, got ({}, {})", position.x, position.y),
            ));
        }
    }
    Ok(())
}

fn validate_classifier(blueprint: &DetectorBlueprint) -> Result<(), ContractError> {
    let classifier = &blueprint.classifier;
    if classifier.kind == ClassifierKind::Fixed && classifier.sequence.is_empty() {
        return Err(ContractError::config_validation(
            "classifier.sequence",
            "fixed classifier requires a non-empty sequence",
        ));
    }
    Ok(())
}

fn validate_source(blueprint: &DetectorBlueprint) -> Result<(), ContractError> {
    match &blueprint.source {
        SourceConfig::Mock(sim) => {
            sim.validate()
                .map_err(|e| ContractError::config_validation("source", e.to_string()))?;

            let points = sim.route.points();
            if points.is_empty() {
                return Err(ContractError::config_validation(
                    "source.route",
                    "route must contain at least one waypoint",
                ));
            }
            if points.iter().any(|p| !p.is_finite()) {
                return Err(ContractError::config_validation(
                    "source.route",
                    "route waypoints must be finite",
                ));
            }
        }
        SourceConfig::Replay(replay) => {
            if replay.path.as_os_str().is_empty() {
                return Err(ContractError::config_validation(
                    "source.path",
                    "replay path cannot be empty",
                ));
            }
            if replay.speed_multiplier.is_nan() || replay.speed_multiplier < 0.0 {
                return Err(ContractError::config_validation(
                    "source.speed_multiplier",
                    format!(
                        "speed_multiplier must be >= 0, got {}",
                        replay.speed_multiplier
                    ),
                ));
            }
        }
    }
    Ok(())
}

fn validate_sinks(blueprint: &DetectorBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                format!("duplicate sink name '{}'", sink.name),
            ));
        }
        if sink.sink_type == SinkType::Network && !sink.params.contains_key("addr") {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].params.addr"),
                "network sink requires an 'addr' parameter",
            ));
        }
    }
    Ok(())
}
