//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{ClassifierConfig, DebounceConfig, DetectorBlueprint, Point2, SourceConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    detector: DetectorInfo,
    classifier: ClassifierConfig,
    source: SourceInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct DetectorInfo {
    stop_line_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_lines: Vec<Point2>,
    debounce: DebounceConfig,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum SourceInfo {
    Mock {
        route_waypoints: usize,
        closed_route: bool,
        speed_mps: f64,
        camera_hz: f64,
        pose_hz: f64,
        time_scale: f64,
        simulated_lights: usize,
        noise_rate: f64,
    },
    Replay {
        path: String,
        speed_multiplier: f64,
        loop_playback: bool,
    },
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &DetectorBlueprint, args: &InfoArgs) -> ConfigInfo {
    let stop_lines = if args.stop_lines {
        blueprint.detector.stop_line_positions.clone()
    } else {
        Vec::new()
    };

    let source = match &blueprint.source {
        SourceConfig::Mock(sim) => SourceInfo::Mock {
            route_waypoints: sim.route.points().len(),
            closed_route: sim.route.is_closed(),
            speed_mps: sim.speed_mps,
            camera_hz: sim.camera_hz,
            pose_hz: sim.pose_hz,
            time_scale: sim.time_scale,
            // Empty means one light per stop line
            simulated_lights: if sim.lights.is_empty() {
                blueprint.detector.stop_line_positions.len()
            } else {
                sim.lights.len()
            },
            noise_rate: sim.noise_rate,
        },
        SourceConfig::Replay(replay) => SourceInfo::Replay {
            path: replay.path.display().to_string(),
            speed_multiplier: replay.speed_multiplier,
            loop_playback: replay.loop_playback,
        },
    };

    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        detector: DetectorInfo {
            stop_line_count: blueprint.detector.stop_line_positions.len(),
            stop_lines,
            debounce: blueprint.detector.debounce,
        },
        classifier: blueprint.classifier.clone(),
        source,
        sinks,
    }
}

fn print_config_info(blueprint: &DetectorBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Traffic Light Detector Configuration            ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let detector = &blueprint.detector;
    let positions = &detector.stop_line_positions;
    println!("🚦 Detector");
    println!("   ├─ Version: {:?}", blueprint.version);
    if args.stop_lines {
        println!("   ├─ Stop lines ({}):", positions.len());
        for (i, position) in positions.iter().enumerate() {
            let prefix = if i == positions.len() - 1 { "└─" } else { "├─" };
            println!("   │   {} #{} ({:.2}, {:.2})", prefix, i, position.x, position.y);
        }
    } else {
        println!("   ├─ Stop lines: {}", positions.len());
    }
    let debounce = &detector.debounce;
    println!("   ├─ Debounce threshold: {}", debounce.threshold);
    println!(
        "   ├─ Below threshold: {}",
        if debounce.always_publish_candidate {
            "publish candidate"
        } else {
            "hold stable"
        }
    );
    println!("   └─ Clear waypoint on go: {}", debounce.clear_waypoint_when_go);

    let classifier = &blueprint.classifier;
    println!("\n🔎 Classifier");
    println!("   ├─ Kind: {:?}", classifier.kind);
    if classifier.sequence.is_empty() {
        println!("   └─ Pixel threshold: {}", classifier.threshold);
    } else {
        println!("   ├─ Pixel threshold: {}", classifier.threshold);
        println!("   └─ Sequence: {:?}", classifier.sequence);
    }

    match &blueprint.source {
        SourceConfig::Mock(sim) => {
            println!("\n🚗 Source (mock)");
            println!(
                "   ├─ Route: {} waypoints{}",
                sim.route.points().len(),
                if sim.route.is_closed() { ", closed" } else { "" }
            );
            println!("   ├─ Speed: {} m/s", sim.speed_mps);
            println!("   ├─ Camera: {} Hz, pose: {} Hz", sim.camera_hz, sim.pose_hz);
            println!("   ├─ Time scale: {}x", sim.time_scale);
            println!("   └─ Noise rate: {}", sim.noise_rate);
        }
        SourceConfig::Replay(replay) => {
            println!("\n📼 Source (replay)");
            println!("   ├─ Path: {}", replay.path.display());
            println!("   ├─ Speed: {}x", replay.speed_multiplier);
            println!("   └─ Loop: {}", replay.loop_playback);
        }
    }

    if !blueprint.sinks.is_empty() {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            if args.sinks {
                println!(
                    "   {} {} ({:?}, queue {}) {:?}",
                    prefix, sink.name, sink.sink_type, sink.queue_capacity, sink.params
                );
            } else {
                println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);
            }
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};
    use std::path::PathBuf;

    const CONFIG: &str = r#"
[detector]
stop_line_positions = [[19.0, 0.0], [40.0, 0.0]]

[source]
kind = "replay"
path = "drive.jsonl"
speed_multiplier = 2.0

[[sinks]]
name = "console"
sink_type = "log"
"#;

    #[test]
    fn test_info_json_shape() {
        let blueprint = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let args = InfoArgs {
            config: PathBuf::from("detector.toml"),
            json: true,
            stop_lines: true,
            sinks: false,
        };

        let info = build_config_info(&blueprint, &args);
        let value = serde_json::to_value(&info).unwrap();

        assert_eq!(value["detector"]["stop_line_count"], 2);
        assert_eq!(value["detector"]["stop_lines"][1][0], 40.0);
        assert_eq!(value["detector"]["debounce"]["threshold"], 3);
        assert_eq!(value["source"]["kind"], "replay");
        assert_eq!(value["source"]["speed_multiplier"], 2.0);
        assert!(value.get("sinks").is_none());
    }
}
