//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - contract snapshots (wire encoding of publications)
//! - shipped configuration files
//! - simulated and replayed drives through correlator and dispatcher

#[cfg(test)]
mod contract_tests {
    use contracts::{LightColor, TrafficWaypoint};

    #[test]
    fn test_publication_json_snapshot() {
        let publication = TrafficWaypoint {
            frame_id: 7,
            timestamp: 0.7,
            state: LightColor::Yellow,
            waypoint: 42,
            debounced: true,
        };
        let json = serde_json::to_value(publication).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "frame_id": 7,
                "timestamp": 0.7,
                "state": 1,
                "waypoint": 42,
                "debounced": true
            })
        );
    }

    #[test]
    fn test_no_signal_wire_value() {
        assert_eq!(TrafficWaypoint::none(0, 0.0).wire(), (4, -1));
    }
}

#[cfg(test)]
mod config_tests {
    use std::path::PathBuf;

    use config_loader::ConfigLoader;
    use contracts::{ClassifierKind, SourceConfig};

    fn config_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../configs")
            .join(name)
    }

    #[test]
    fn test_shipped_simulation_config_loads() {
        let blueprint = ConfigLoader::load_from_path(&config_path("detector.toml")).unwrap();
        assert_eq!(blueprint.detector.stop_line_positions.len(), 3);
        assert_eq!(blueprint.classifier.kind, ClassifierKind::PixelRatio);
        assert!(matches!(blueprint.source, SourceConfig::Mock(_)));
        assert_eq!(blueprint.sinks.len(), 2);
    }

    #[test]
    fn test_shipped_replay_config_loads() {
        let blueprint = ConfigLoader::load_from_path(&config_path("replay.toml")).unwrap();
        let SourceConfig::Replay(replay) = &blueprint.source else {
            panic!("expected replay source, got: {:?}", blueprint.source);
        };
        assert!(replay.path.ends_with("drive_sample.jsonl"));
        // Found next to the config, wherever the process runs from
        assert!(replay.path.exists(), "missing {}", replay.path.display());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{
        ClassifierConfig, ClassifierKind, DebounceConfig, LightColor, Point2, ReplayConfig,
        RouteSpec, SimulationConfig, SinkConfig, SinkType, StopLine, TrafficWaypoint,
    };
    use dispatcher::create_dispatcher;
    use ingestion::{IngestionPipeline, MockDriveSource, ReplayDriveSource};
    use observability::PublicationAggregator;
    use tl_detector::{build_classifier, Correlator, DetectorContext};
    use tokio::sync::mpsc;

    fn file_sink(name: &str, path: &Path, format: &str) -> SinkConfig {
        SinkConfig {
            name: name.to_string(),
            sink_type: SinkType::File,
            queue_capacity: 64,
            params: HashMap::from([
                ("path".to_string(), path.display().to_string()),
                ("format".to_string(), format.to_string()),
            ]),
        }
    }

    fn read_publications(path: &Path) -> Vec<TrafficWaypoint> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    /// End-to-end test: MockDriveSource -> Correlator -> Dispatcher
    ///
    /// Verifies the complete data flow:
    /// 1. the simulation publishes route, pose, ground truth and frames
    /// 2. the correlator turns each frame into a publication
    /// 3. the dispatcher writes every publication to a JSON lines file
    #[tokio::test]
    async fn test_e2e_mock_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("publications.jsonl");

        let stop_line = Point2::new(100.0, 0.0);
        let simulation = SimulationConfig {
            route: RouteSpec::Line {
                start: Point2::new(0.0, 0.0),
                end: Point2::new(200.0, 0.0),
                count: 21,
            },
            speed_mps: 10.0,
            time_scale: 50.0,
            ..SimulationConfig::default()
        };

        let context = Arc::new(DetectorContext::new());
        let mut ingestion = IngestionPipeline::new(context.clone());
        ingestion
            .register_source(Box::new(
                MockDriveSource::new("mock", simulation, &[stop_line]).unwrap(),
            ))
            .unwrap();

        let classifier = build_classifier(
            &ClassifierConfig {
                kind: ClassifierKind::GroundTruth,
                ..ClassifierConfig::default()
            },
            &context,
        );
        let mut correlator = Correlator::new(
            context.clone(),
            vec![StopLine {
                ordinal: 0,
                position: stop_line,
            }],
            DebounceConfig::default(),
            classifier,
        );

        let (tx, rx) = mpsc::channel::<TrafficWaypoint>(100);
        let dispatcher = create_dispatcher(vec![file_sink("jsonl", &output, "jsonl")], rx)
            .await
            .unwrap();
        let dispatcher_handle = dispatcher.spawn();

        ingestion.start_all();
        let frames = ingestion.take_receiver().unwrap();

        let target_frames = 10u64;
        let mut aggregator = PublicationAggregator::new();
        let run = async {
            while let Ok(frame) = frames.recv().await {
                let publication = correlator.on_frame(&frame);
                aggregator.update(&publication);
                tx.send(publication).await.unwrap();
                if aggregator.total >= target_frames {
                    break;
                }
            }
        };
        let result = tokio::time::timeout(Duration::from_secs(5), run).await;

        ingestion.stop_all();
        drop(tx);
        let _ = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle).await;

        assert!(result.is_ok(), "Pipeline timed out");

        let publications = read_publications(&output);
        assert_eq!(publications.len() as u64, target_frames);

        // Stop line at x=100 is waypoint 10 on a 10 m grid
        for publication in &publications {
            assert!(
                publication.waypoint == 10 || publication.waypoint == TrafficWaypoint::NO_WAYPOINT,
                "unexpected waypoint in {publication:?}"
            );
        }
        for pair in publications.windows(2) {
            assert!(pair[0].frame_id < pair[1].frame_id);
        }

        // Lights start their cycle on green; the run covers well under 8 s
        assert!(
            publications
                .iter()
                .any(|p| p.debounced && p.wire() == (LightColor::Green.code(), 10)),
            "green was never promoted: {publications:?}"
        );
        assert!(correlator.stats().promotions >= 1);
    }

    /// Replayed approach: RED x3 then GREEN with threshold 3
    #[tokio::test]
    async fn test_e2e_replay_debounce_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("drive.jsonl");
        let output = dir.path().join("publications.jsonl");

        let red = "[230,20,20]";
        let green = "[20,220,60]";
        let mut lines = vec![
            r#"{"kind":"route","timestamp":0.0,"waypoints":[[0.0,0.0],[10.0,0.0],[20.0,0.0]]}"#
                .to_string(),
            r#"{"kind":"pose","timestamp":0.0,"position":[9.0,0.0]}"#.to_string(),
        ];
        for (frame_id, fill) in [(1, red), (2, red), (3, red), (4, green)] {
            lines.push(format!(
                r#"{{"kind":"frame","timestamp":{},"frame_id":{},"width":8,"height":8,"fill":{}}}"#,
                frame_id as f64 * 0.1,
                frame_id,
                fill
            ));
        }
        std::fs::write(&recording, lines.join("\n")).unwrap();

        let source = ReplayDriveSource::load(
            "replay",
            ReplayConfig {
                path: recording,
                speed_multiplier: 1.0,
                loop_playback: false,
            },
        )
        .unwrap();
        assert_eq!(source.record_count(), 6);

        let context = Arc::new(DetectorContext::new());
        let mut ingestion = IngestionPipeline::new(context.clone());
        ingestion.register_source(Box::new(source)).unwrap();

        let classifier = build_classifier(&ClassifierConfig::default(), &context);
        let mut correlator = Correlator::new(
            context.clone(),
            vec![StopLine {
                ordinal: 0,
                position: Point2::new(19.0, 0.0),
            }],
            DebounceConfig::default(),
            classifier,
        );

        let (tx, rx) = mpsc::channel::<TrafficWaypoint>(16);
        let dispatcher = create_dispatcher(vec![file_sink("jsonl", &output, "jsonl")], rx)
            .await
            .unwrap();
        let dispatcher_handle = dispatcher.spawn();

        ingestion.start_all();
        let frames = ingestion.take_receiver().unwrap();

        let run = async {
            let mut published = 0;
            while let Ok(frame) = frames.recv().await {
                tx.send(correlator.on_frame(&frame)).await.unwrap();
                published += 1;
                if published == 4 {
                    break;
                }
            }
        };
        let result = tokio::time::timeout(Duration::from_secs(5), run).await;

        drop(tx);
        let _ = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle).await;
        assert!(result.is_ok(), "Replay timed out");
        assert_eq!(ingestion.metrics().snapshot().frames_dropped, 0);

        let publications = read_publications(&output);
        let observed: Vec<_> = publications
            .iter()
            .map(|p| (p.frame_id, p.wire(), p.debounced))
            .collect();
        assert_eq!(
            observed,
            vec![
                (1, (0, 2), false),
                (2, (0, 2), false),
                (3, (0, 2), true),
                (4, (2, 2), false),
            ]
        );
        assert_eq!(correlator.debounce().stable_color(), LightColor::Red);

        // The recording ends without looping
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ingestion.all_finished());
    }

    /// Frames before the route arrives are answered with `(-1, UNKNOWN)`
    #[tokio::test]
    async fn test_e2e_startup_guard_before_route() {
        let simulation = SimulationConfig {
            route: RouteSpec::Points {
                points: vec![Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)],
            },
            time_scale: 5.0,
            route_delay_frames: 5,
            ..SimulationConfig::default()
        };
        let stop_line = Point2::new(100.0, 0.0);

        let context = Arc::new(DetectorContext::new());
        let mut ingestion = IngestionPipeline::new(context.clone());
        ingestion
            .register_source(Box::new(
                MockDriveSource::new("mock", simulation, &[stop_line]).unwrap(),
            ))
            .unwrap();

        let classifier = build_classifier(
            &ClassifierConfig {
                kind: ClassifierKind::GroundTruth,
                ..ClassifierConfig::default()
            },
            &context,
        );
        let mut correlator = Correlator::new(
            context.clone(),
            vec![StopLine {
                ordinal: 0,
                position: stop_line,
            }],
            DebounceConfig::default(),
            classifier,
        );

        ingestion.start_all();
        let frames = ingestion.take_receiver().unwrap();

        let mut publications = Vec::new();
        let run = async {
            while let Ok(frame) = frames.recv().await {
                publications.push(correlator.on_frame(&frame));
                if publications.len() == 8 {
                    break;
                }
            }
        };
        let result = tokio::time::timeout(Duration::from_secs(5), run).await;
        ingestion.stop_all();
        assert!(result.is_ok(), "Simulation timed out");

        assert_eq!(publications[0].wire(), (4, -1));
        assert!(!publications[0].debounced);
        assert_eq!(publications.last().unwrap().waypoint, 1);
        assert!(correlator.stats().no_route >= 1);
    }

    /// Test dispatcher with multiple sink types
    #[tokio::test]
    async fn test_dispatcher_multiple_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("publications.csv");
        let (tx, rx) = mpsc::channel::<TrafficWaypoint>(10);

        let sink_configs = vec![
            SinkConfig {
                name: "log".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 50,
                params: HashMap::new(),
            },
            file_sink("csv", &csv, "csv"),
        ];

        let dispatcher = create_dispatcher(sink_configs, rx).await.unwrap();
        assert_eq!(dispatcher.metrics().len(), 2);
        let metrics = dispatcher.metrics_handles();

        let handle = dispatcher.spawn();

        for i in 0..5 {
            tx.send(TrafficWaypoint::none(i, i as f64 * 0.1))
                .await
                .unwrap();
        }
        drop(tx);

        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;

        for (name, sink) in metrics {
            assert_eq!(sink.write_count(), 5, "sink {name}");
        }

        let content = std::fs::read_to_string(&csv).unwrap();
        assert_eq!(content.lines().count(), 6);
    }
}
