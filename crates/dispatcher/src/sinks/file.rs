//! FileSink - appends publications to a file

use chrono::Local;
use contracts::{ContractError, PublicationSink, TrafficWaypoint};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// On-disk record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// One JSON object per line
    #[default]
    Jsonl,
    /// `frame_id,timestamp,state,waypoint,debounced` with a header row
    Csv,
}

impl FileFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Jsonl => "jsonl",
            Self::Csv => "csv",
        }
    }
}

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file
    pub path: PathBuf,
    pub format: FileFormat,
}

impl FileSinkConfig {
    /// Build from the sink's params map
    ///
    /// `path` names the file directly; otherwise a timestamped file is
    /// created under `base_path` (default `./output`).
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let format = match params.get("format").map(String::as_str) {
            Some("jsonl") | Some("json") | None => FileFormat::Jsonl,
            Some("csv") => FileFormat::Csv,
            Some(other) => return Err(format!("unknown format '{}'", other)),
        };

        let path = match params.get("path") {
            Some(path) => PathBuf::from(path),
            None => {
                let base_path = params
                    .get("base_path")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./output"));
                let stamp = Local::now().format("%Y%m%d_%H%M%S");
                base_path.join(format!("traffic_waypoint_{}.{}", stamp, format.extension()))
            }
        };

        Ok(Self { path, format })
    }
}

/// Sink that writes publications to disk
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Create the sink, truncating any existing file
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&config.path)?;
        let mut writer = BufWriter::new(file);
        if config.format == FileFormat::Csv {
            writeln!(writer, "frame_id,timestamp,state,waypoint,debounced")?;
        }

        Ok(Self {
            name: name.into(),
            config,
            writer: Some(writer),
        })
    }

    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        Self::new(name, config)
    }

    pub fn path(&self) -> &PathBuf {
        &self.config.path
    }

    fn append(&mut self, publication: &TrafficWaypoint) -> std::io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| std::io::Error::other("file already closed"))?;

        match self.config.format {
            FileFormat::Jsonl => {
                serde_json::to_writer(&mut *writer, publication)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                writeln!(writer)
            }
            FileFormat::Csv => writeln!(
                writer,
                "{},{},{},{},{}",
                publication.frame_id,
                publication.timestamp,
                publication.state.code(),
                publication.waypoint,
                publication.debounced
            ),
        }
    }

    fn persist(&mut self, publication: &TrafficWaypoint) -> Result<(), ContractError> {
        self.append(publication).map_err(|e| {
            error!(sink = %self.name, frame_id = publication.frame_id, error = %e, "write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl PublicationSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, publication),
        fields(sink = %self.name, frame_id = publication.frame_id)
    )]
    async fn write(&mut self, publication: &TrafficWaypoint) -> Result<(), ContractError> {
        self.persist(publication)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await?;
        self.writer = None;
        debug!(sink = %self.name, path = %self.config.path.display(), "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::LightColor;
    use tempfile::tempdir;

    fn publication(frame_id: u64, state: LightColor, waypoint: i64) -> TrafficWaypoint {
        TrafficWaypoint {
            frame_id,
            timestamp: 0.5,
            state,
            waypoint,
            debounced: false,
        }
    }

    #[tokio::test]
    async fn test_jsonl_lines() {
        let dir = tempdir().unwrap();
        let config = FileSinkConfig {
            path: dir.path().join("nested/out.jsonl"),
            format: FileFormat::Jsonl,
        };

        let mut sink = FileSink::new("file", config).unwrap();
        sink.write(&publication(1, LightColor::Red, 7)).await.unwrap();
        sink.write(&TrafficWaypoint::none(2, 0.6)).await.unwrap();
        sink.close().await.unwrap();

        let content = fs::read_to_string(dir.path().join("nested/out.jsonl")).unwrap();
        let lines: Vec<TrafficWaypoint> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].wire(), (0, 7));
        assert_eq!(lines[1].wire(), (4, -1));
    }

    #[tokio::test]
    async fn test_csv_rows() {
        let dir = tempdir().unwrap();
        let mut params = HashMap::new();
        params.insert("base_path".to_string(), dir.path().display().to_string());
        params.insert("format".to_string(), "csv".to_string());

        let mut sink = FileSink::from_params("csv", &params).unwrap();
        let path = sink.path().clone();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("csv"));

        sink.write(&publication(3, LightColor::Green, 11)).await.unwrap();
        sink.close().await.unwrap();

        let content = fs::read_to_string(path).unwrap();
        let rows: Vec<&str> = content.lines().collect();
        assert_eq!(rows[0], "frame_id,timestamp,state,waypoint,debounced");
        assert_eq!(rows[1], "3,0.5,2,11,false");
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let dir = tempdir().unwrap();
        let config = FileSinkConfig {
            path: dir.path().join("closed.jsonl"),
            format: FileFormat::Jsonl,
        };
        let mut sink = FileSink::new("file", config).unwrap();
        sink.close().await.unwrap();
        assert!(sink.write(&publication(1, LightColor::Red, 1)).await.is_err());
    }

    #[test]
    fn test_unknown_format_rejected() {
        let mut params = HashMap::new();
        params.insert("format".to_string(), "xml".to_string());
        assert!(FileSinkConfig::from_params(&params).is_err());
    }
}
