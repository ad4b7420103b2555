//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{DetectorBlueprint, ReplayConfig, SourceConfig};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args)?;
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after command-line overrides")?;

    info!(
        stop_lines = blueprint.detector.stop_line_positions.len(),
        threshold = blueprint.detector.debounce.threshold,
        classifier = ?blueprint.classifier.kind,
        source = source_kind(&blueprint.source),
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        max_frames: if args.max_frames == 0 {
            None
        } else {
            Some(args.max_frames)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        buffer_size: args.buffer_size.max(1),
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    let pipeline = Pipeline::new(pipeline_config);
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting detector...");

    tokio::select! {
        result = pipeline.run() => {
            match result {
                Ok(stats) => {
                    info!(
                        frames = stats.frames_processed,
                        publications = stats.publications_sent,
                        frames_dropped = stats.ingestion.frames_dropped,
                        duration_secs = stats.duration.as_secs_f64(),
                        fps = format!("{:.2}", stats.fps()),
                        "Detector completed successfully"
                    );
                    stats.print_summary();
                }
                Err(e) => {
                    return Err(e).context("Pipeline execution failed");
                }
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping detector...");
        }
    }

    info!("Traffic light detector finished");
    Ok(())
}

/// Apply command-line overrides on top of the loaded blueprint
fn apply_overrides(blueprint: &mut DetectorBlueprint, args: &RunArgs) -> Result<(), CliError> {
    let debounce = &mut blueprint.detector.debounce;
    if let Some(threshold) = args.threshold {
        info!(threshold, "Overriding debounce threshold from CLI");
        debounce.threshold = threshold;
    }
    if args.hold_stable {
        info!("Holding the stable decision below threshold");
        debounce.always_publish_candidate = false;
    }
    if args.clear_when_go {
        debounce.clear_waypoint_when_go = true;
    }

    if let Some(kind) = args.classifier {
        info!(classifier = ?kind, "Overriding classifier from CLI");
        blueprint.classifier.kind = kind.into();
    }

    if let Some(ref path) = args.replay {
        if !args.replay_speed.is_finite() || args.replay_speed < 0.0 {
            return Err(CliError::invalid_override(
                "replay-speed",
                "must be a finite value >= 0",
            ));
        }
        info!(path = %path.display(), speed = args.replay_speed, "Replaying recorded drive");
        blueprint.source = SourceConfig::Replay(ReplayConfig {
            path: path.clone(),
            speed_multiplier: args.replay_speed,
            loop_playback: args.replay_loop,
        });
    }

    if let Some(time_scale) = args.time_scale {
        if !time_scale.is_finite() || time_scale <= 0.0 {
            return Err(CliError::invalid_override("time-scale", "must be > 0"));
        }
        match &mut blueprint.source {
            SourceConfig::Mock(simulation) => simulation.time_scale = time_scale,
            SourceConfig::Replay(_) => {
                warn!("--time-scale only applies to the mock source, ignoring")
            }
        }
    }

    Ok(())
}

fn source_kind(source: &SourceConfig) -> &'static str {
    match source {
        SourceConfig::Mock(_) => "mock",
        SourceConfig::Replay(_) => "replay",
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &DetectorBlueprint) {
    let debounce = &blueprint.detector.debounce;

    println!("\n=== Configuration Summary ===\n");
    println!("Detector:");
    println!(
        "  Stop lines: {}",
        blueprint.detector.stop_line_positions.len()
    );
    println!("  Debounce threshold: {}", debounce.threshold);
    println!(
        "  Below threshold: {}",
        if debounce.always_publish_candidate {
            "publish candidate"
        } else {
            "hold stable"
        }
    );
    println!("  Clear waypoint on go: {}", debounce.clear_waypoint_when_go);
    println!("\nClassifier: {:?}", blueprint.classifier.kind);

    match &blueprint.source {
        SourceConfig::Mock(simulation) => {
            println!("\nSource: mock");
            println!("  Route waypoints: {}", simulation.route.points().len());
            println!("  Speed: {} m/s", simulation.speed_mps);
            println!("  Camera: {} Hz", simulation.camera_hz);
            println!("  Time scale: {}x", simulation.time_scale);
        }
        SourceConfig::Replay(replay) => {
            println!("\nSource: replay");
            println!("  Path: {}", replay.path.display());
            println!("  Speed: {}x", replay.speed_multiplier);
            println!("  Loop: {}", replay.loop_playback);
        }
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, ClassifierArg, Commands};
    use clap::Parser;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::ClassifierKind;

    const CONFIG: &str = r#"
[detector]
stop_line_positions = [[19.0, 0.0]]

[source]
kind = "mock"
"#;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["tl-detector", "run"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            other => panic!("expected run command, got: {other:?}"),
        }
    }

    fn blueprint() -> DetectorBlueprint {
        ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap()
    }

    #[test]
    fn test_debounce_overrides() {
        let mut blueprint = blueprint();
        let args = run_args(&["--threshold", "6", "--hold-stable", "--clear-when-go"]);
        apply_overrides(&mut blueprint, &args).unwrap();

        let debounce = blueprint.detector.debounce;
        assert_eq!(debounce.threshold, 6);
        assert!(!debounce.always_publish_candidate);
        assert!(debounce.clear_waypoint_when_go);
    }

    #[test]
    fn test_replay_override_replaces_source() {
        let mut blueprint = blueprint();
        let args = run_args(&["--replay", "drive.jsonl", "--replay-loop"]);
        apply_overrides(&mut blueprint, &args).unwrap();

        let SourceConfig::Replay(replay) = &blueprint.source else {
            panic!("expected replay source");
        };
        assert_eq!(replay.path.to_str(), Some("drive.jsonl"));
        assert_eq!(replay.speed_multiplier, 1.0);
        assert!(replay.loop_playback);
    }

    #[test]
    fn test_classifier_and_time_scale_overrides() {
        let mut blueprint = blueprint();
        let mut args = run_args(&["--classifier", "fixed", "--time-scale", "20"]);
        apply_overrides(&mut blueprint, &args).unwrap();

        assert_eq!(blueprint.classifier.kind, ClassifierKind::Fixed);
        let SourceConfig::Mock(simulation) = &blueprint.source else {
            panic!("expected mock source");
        };
        assert_eq!(simulation.time_scale, 20.0);

        args.time_scale = Some(0.0);
        assert!(matches!(
            apply_overrides(&mut blueprint, &args),
            Err(CliError::InvalidOverride { .. })
        ));
        assert_eq!(args.classifier, Some(ClassifierArg::Fixed));
    }

    #[tokio::test]
    async fn test_missing_config_reported() {
        let args = run_args(&["--config", "/nonexistent/detector.toml"]);
        let err = run_pipeline(&args).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
