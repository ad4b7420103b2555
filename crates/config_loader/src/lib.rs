//! # Config Loader
//!
//! Loads the detector configuration: stop-line positions, debounce policy,
//! classifier, drive source and publication sinks.
//!
//! A configuration file may point at a drive recording. A relative recording
//! path is read from the directory of the configuration file, so a config and
//! its recordings can be moved together.
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("configs/replay.toml")).unwrap();
//! println!("Stop lines: {}", blueprint.detector.stop_line_positions.len());
//! ```

mod parser;
mod validator;

pub use contracts::DetectorBlueprint;
pub use parser::ConfigFormat;

use contracts::{ContractError, SourceConfig};
use std::path::Path;

/// Detector configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a configuration file (`.toml` or `.json`)
    pub fn load_from_path(path: &Path) -> Result<DetectorBlueprint, ContractError> {
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ConfigFormat::from_extension)
            .ok_or_else(|| {
                ContractError::config_parse(format!(
                    "unsupported config format: {} (expected .toml or .json)",
                    path.display()
                ))
            })?;

        let content = std::fs::read_to_string(path)?;
        let mut blueprint = parser::parse(&content, format)?;
        if let Some(dir) = path.parent() {
            anchor_recording(&mut blueprint, dir);
        }

        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Load and validate configuration text
    ///
    /// Relative recording paths are kept as written.
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DetectorBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Re-run validation, e.g. after command-line overrides
    pub fn validate(blueprint: &DetectorBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }
}

/// Read a relative replay recording path from `config_dir`
fn anchor_recording(blueprint: &mut DetectorBlueprint, config_dir: &Path) {
    if let SourceConfig::Replay(replay) = &mut blueprint.source {
        if replay.path.is_relative() && !replay.path.as_os_str().is_empty() {
            replay.path = config_dir.join(&replay.path);
        }
    }
}
