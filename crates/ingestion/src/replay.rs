//! Replay drive source - plays back a recorded drive
//!
//! Reads a JSON lines file of [`DriveRecord`]s and re-emits them with their
//! original spacing (scaled by `speed_multiplier`). Frame pixels are either a
//! solid `fill` color or a raw binary file next to the recording.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{
    CameraFrame, DriveDataCallback, DriveEvent, DriveSource, ImageData, ImageFormat, Point2,
    ReplayConfig, TrafficLightState, VehiclePose,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{IngestionError, Result};

/// One line of a drive recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriveRecord {
    Pose {
        timestamp: f64,
        position: Point2,
    },
    Route {
        timestamp: f64,
        waypoints: Vec<Point2>,
    },
    Lights {
        timestamp: f64,
        lights: Vec<TrafficLightState>,
    },
    Frame {
        timestamp: f64,
        frame_id: u64,
        width: u32,
        height: u32,
        #[serde(default)]
        format: ImageFormat,
        /// Solid RGB fill
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fill: Option<[u8; 3]>,
        /// Raw pixel file, relative to the recording
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data_file: Option<String>,
    },
}

impl DriveRecord {
    pub fn timestamp(&self) -> f64 {
        match *self {
            Self::Pose { timestamp, .. }
            | Self::Route { timestamp, .. }
            | Self::Lights { timestamp, .. }
            | Self::Frame { timestamp, .. } => timestamp,
        }
    }

    /// Materialize the event; `base_dir` resolves frame data files
    fn into_event(self, base_dir: &Path, line: usize) -> Result<DriveEvent> {
        let event = match self {
            Self::Pose {
                timestamp,
                position,
            } => DriveEvent::Pose(VehiclePose {
                position,
                timestamp,
            }),
            Self::Route { waypoints, .. } => DriveEvent::Route(waypoints.into_iter().collect()),
            Self::Lights { lights, .. } => DriveEvent::TrafficLights(lights),
            Self::Frame {
                timestamp,
                frame_id,
                width,
                height,
                format,
                fill,
                data_file,
            } => {
                let image = match (fill, data_file) {
                    (_, Some(file)) => {
                        let path = base_dir.join(file);
                        let data = std::fs::read(&path)
                            .map_err(|source| IngestionError::FrameData { path, source })?;
                        ImageData {
                            width,
                            height,
                            format,
                            data: Bytes::from(data),
                        }
                    }
                    (Some(rgb), None) => ImageData::solid(width, height, format, rgb),
                    (None, None) => {
                        return Err(IngestionError::replay_record(
                            line,
                            "frame needs either `fill` or `data_file`",
                        ))
                    }
                };
                DriveEvent::Frame(CameraFrame {
                    frame_id,
                    timestamp,
                    image,
                })
            }
        };
        Ok(event)
    }
}

#[derive(Debug, Clone)]
struct TimedEvent {
    timestamp: f64,
    event: DriveEvent,
}

/// Replay drive source
pub struct ReplayDriveSource {
    source_id: String,
    events: Arc<Vec<TimedEvent>>,
    config: ReplayConfig,
    listening: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReplayDriveSource {
    /// Load and validate a recording
    ///
    /// Every record is decoded up front, so a malformed line fails here
    /// instead of halfway through playback.
    pub fn load(source_id: impl Into<String>, config: ReplayConfig) -> Result<Self> {
        let source_id = source_id.into();
        let file = File::open(&config.path).map_err(|source| IngestionError::ReplayOpen {
            path: config.path.clone(),
            source,
        })?;
        let base_dir = config
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut events = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line_no = index + 1;
            let line = line.map_err(|source| IngestionError::ReplayOpen {
                path: config.path.clone(),
                source,
            })?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let record: DriveRecord = serde_json::from_str(line)
                .map_err(|e| IngestionError::replay_record(line_no, e.to_string()))?;
            let timestamp = record.timestamp();
            if !timestamp.is_finite() {
                return Err(IngestionError::replay_record(
                    line_no,
                    "timestamp is not finite",
                ));
            }
            events.push(TimedEvent {
                timestamp,
                event: record.into_event(&base_dir, line_no)?,
            });
        }

        if events.is_empty() {
            return Err(IngestionError::ReplayEmpty { path: config.path });
        }

        // Stable: records sharing a timestamp keep file order
        events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        info!(
            source_id = %source_id,
            records = events.len(),
            path = %config.path.display(),
            "loaded drive recording"
        );

        Ok(Self {
            source_id,
            events: Arc::new(events),
            config,
            listening: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        })
    }

    pub fn record_count(&self) -> usize {
        self.events.len()
    }

    /// Recording length in seconds
    pub fn duration(&self) -> f64 {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }
}

impl DriveSource for ReplayDriveSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn listen(&self, callback: DriveDataCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let listening = self.listening.clone();
        let source_id = self.source_id.clone();
        let events = self.events.clone();
        let speed = self.config.speed_multiplier;
        let loop_playback = self.config.loop_playback;

        let handle = thread::spawn(move || {
            debug!(source_id = %source_id, "replay thread started");

            loop {
                let start_time = Instant::now();
                let first_timestamp = events.first().map_or(0.0, |e| e.timestamp);

                for timed in events.iter() {
                    if !listening.load(Ordering::Relaxed) {
                        debug!(source_id = %source_id, "replay stopped");
                        return;
                    }

                    if speed > 0.0 {
                        let offset = (timed.timestamp - first_timestamp) / speed;
                        let target = Duration::from_secs_f64(offset.max(0.0));
                        if let Some(wait) = target.checked_sub(start_time.elapsed()) {
                            thread::sleep(wait);
                        }
                    }

                    callback(timed.event.clone());
                }

                if !loop_playback {
                    info!(source_id = %source_id, "replay completed");
                    break;
                }

                debug!(source_id = %source_id, "looping replay");
            }

            listening.store(false, Ordering::SeqCst);
        });

        *self.thread_handle.lock() = Some(handle);
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.lock().take() {
            if handle.join().is_err() {
                warn!(source_id = %self.source_id, "replay thread panicked");
            }
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

impl Drop for ReplayDriveSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::LightColor;
    use std::io::Write;
    use std::sync::mpsc;

    fn write_recording(dir: &Path, lines: &[&str]) -> PathBuf {
        let path = dir.join("drive.jsonl");
        let mut file = File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    fn config(path: PathBuf) -> ReplayConfig {
        ReplayConfig {
            path,
            speed_multiplier: 0.0,
            loop_playback: false,
        }
    }

    #[test]
    fn test_record_format() {
        let record: DriveRecord = serde_json::from_str(
            r#"{"kind":"frame","timestamp":1.5,"frame_id":3,"width":2,"height":2,"fill":[255,0,0]}"#,
        )
        .unwrap();
        assert_eq!(record.timestamp(), 1.5);
        assert!(matches!(
            record,
            DriveRecord::Frame {
                format: ImageFormat::Bgra8,
                fill: Some([255, 0, 0]),
                ..
            }
        ));

        let lights: DriveRecord = serde_json::from_str(
            r#"{"kind":"lights","timestamp":0,"lights":[{"position":[1,2],"color":"yellow"}]}"#,
        )
        .unwrap();
        assert_eq!(
            lights,
            DriveRecord::Lights {
                timestamp: 0.0,
                lights: vec![TrafficLightState {
                    position: Point2::new(1.0, 2.0),
                    color: LightColor::Yellow,
                }],
            }
        );
    }

    #[test]
    fn test_load_sorts_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_recording(
            dir.path(),
            &[
                r#"{"kind":"pose","timestamp":0.2,"position":[2,0]}"#,
                "",
                r#"{"kind":"route","timestamp":0.0,"waypoints":[[0,0],[10,0]]}"#,
                r#"{"kind":"pose","timestamp":0.1,"position":[1,0]}"#,
            ],
        );

        let source = ReplayDriveSource::load("replay", config(path)).unwrap();
        assert_eq!(source.record_count(), 3);
        assert!((source.duration() - 0.2).abs() < 1e-9);
        assert!(matches!(source.events[0].event, DriveEvent::Route(_)));
        assert!(matches!(
            source.events[2].event,
            DriveEvent::Pose(VehiclePose { timestamp, .. }) if timestamp == 0.2
        ));
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_recording(
            dir.path(),
            &[
                r#"{"kind":"pose","timestamp":0.0,"position":[0,0]}"#,
                r#"{"kind":"teleport","timestamp":0.1}"#,
            ],
        );

        match ReplayDriveSource::load("replay", config(path)) {
            Err(IngestionError::ReplayRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {:?}", other.err()),
        }
    }

    #[test]
    fn test_frame_without_pixels_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_recording(
            dir.path(),
            &[r#"{"kind":"frame","timestamp":0.0,"frame_id":1,"width":2,"height":2}"#],
        );
        assert!(matches!(
            ReplayDriveSource::load("replay", config(path)),
            Err(IngestionError::ReplayRecord { line: 1, .. })
        ));
    }

    #[test]
    fn test_frame_data_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f1.raw"), [1u8, 2, 3, 4, 5, 6]).unwrap();
        let path = write_recording(
            dir.path(),
            &[
                r#"{"kind":"frame","timestamp":0.0,"frame_id":1,"width":2,"height":1,"format":"rgb8","data_file":"f1.raw"}"#,
            ],
        );

        let source = ReplayDriveSource::load("replay", config(path)).unwrap();
        match &source.events[0].event {
            DriveEvent::Frame(frame) => {
                assert_eq!(frame.image.format, ImageFormat::Rgb8);
                assert_eq!(frame.image.data.as_ref(), &[1, 2, 3, 4, 5, 6]);
            }
            other => panic!("unexpected event {}", other.kind()),
        }
    }

    #[test]
    fn test_missing_file() {
        let result = ReplayDriveSource::load("replay", config(PathBuf::from("/nonexistent/drive.jsonl")));
        assert!(matches!(result, Err(IngestionError::ReplayOpen { .. })));
    }

    #[test]
    fn test_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_recording(dir.path(), &["", "# comment only"]);
        assert!(matches!(
            ReplayDriveSource::load("replay", config(path)),
            Err(IngestionError::ReplayEmpty { .. })
        ));
    }

    #[test]
    fn test_playback_emits_every_record_then_stops() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_recording(
            dir.path(),
            &[
                r#"{"kind":"route","timestamp":0.0,"waypoints":[[0,0],[10,0]]}"#,
                r#"{"kind":"pose","timestamp":0.0,"position":[0,0]}"#,
                r#"{"kind":"frame","timestamp":0.1,"frame_id":1,"width":1,"height":1,"fill":[0,0,0]}"#,
            ],
        );
        let source = ReplayDriveSource::load("replay", config(path)).unwrap();

        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        source.listen(Arc::new(move |event: DriveEvent| {
            let _ = tx.lock().send(event.kind());
        }));

        let kinds: Vec<_> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(kinds, vec!["route", "pose", "frame"]);

        let deadline = Instant::now() + Duration::from_secs(5);
        while source.is_listening() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!source.is_listening());
    }
}
