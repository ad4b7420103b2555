//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Traffic-light waypoint detector
#[derive(Parser, Debug)]
#[command(
    name = "tl-detector",
    author,
    version,
    about = "Traffic-light waypoint detector",
    long_about = "Correlates vehicle pose, the route and camera frames into a debounced\n\
                  (stop waypoint, light state) decision per frame, and dispatches every\n\
                  decision to the configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TL_DETECTOR_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TL_DETECTOR_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the detector
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "detector.toml",
        env = "TL_DETECTOR_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the debounce threshold (consecutive identical frames)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..), env = "TL_DETECTOR_THRESHOLD")]
    pub threshold: Option<u32>,

    /// Below the threshold, keep publishing the last stable decision
    #[arg(long)]
    pub hold_stable: bool,

    /// Publish waypoint -1 once the stable color is neither RED nor YELLOW
    #[arg(long)]
    pub clear_when_go: bool,

    /// Override the classifier
    #[arg(long, value_enum)]
    pub classifier: Option<ClassifierArg>,

    /// Replay a recorded drive (JSON lines) instead of the configured source
    #[arg(long, env = "TL_DETECTOR_REPLAY")]
    pub replay: Option<PathBuf>,

    /// Replay speed multiplier (0 = as fast as possible)
    #[arg(long, default_value = "1.0", requires = "replay")]
    pub replay_speed: f64,

    /// Restart the replay at end of file
    #[arg(long, requires = "replay")]
    pub replay_loop: bool,

    /// Override the simulation wall-clock speedup (mock source only)
    #[arg(long)]
    pub time_scale: Option<f64>,

    /// Maximum number of frames to process (0 = unlimited)
    #[arg(long, default_value = "0", env = "TL_DETECTOR_MAX_FRAMES")]
    pub max_frames: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "TL_DETECTOR_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Capacity of the publication channel feeding the dispatcher
    #[arg(long, default_value = "100", env = "TL_DETECTOR_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "TL_DETECTOR_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "detector.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "detector.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List every stop line
    #[arg(long)]
    pub stop_lines: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Classifier override
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassifierArg {
    PixelRatio,
    GroundTruth,
    Fixed,
}

impl From<ClassifierArg> for contracts::ClassifierKind {
    fn from(arg: ClassifierArg) -> Self {
        match arg {
            ClassifierArg::PixelRatio => Self::PixelRatio,
            ClassifierArg::GroundTruth => Self::GroundTruth,
            ClassifierArg::Fixed => Self::Fixed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_overrides_parse() {
        let cli = Cli::try_parse_from([
            "tl-detector",
            "run",
            "--config",
            "drive.toml",
            "--threshold",
            "5",
            "--hold-stable",
            "--classifier",
            "ground-truth",
            "--replay",
            "drive.jsonl",
            "--replay-speed",
            "0",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.config, PathBuf::from("drive.toml"));
        assert_eq!(args.threshold, Some(5));
        assert!(args.hold_stable);
        assert!(!args.clear_when_go);
        assert_eq!(args.classifier, Some(ClassifierArg::GroundTruth));
        assert_eq!(args.replay_speed, 0.0);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let result = Cli::try_parse_from(["tl-detector", "run", "--threshold", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_replay_options_require_replay() {
        let result = Cli::try_parse_from(["tl-detector", "run", "--replay-loop"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["tl-detector", "-q", "-v", "validate"]);
        assert!(result.is_err());
    }
}
