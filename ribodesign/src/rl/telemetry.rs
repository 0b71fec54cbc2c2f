// src/rl/telemetry.rs
//
// Episode telemetry.
//
// One JSON line per finished episode (target id, distances, final sequence
// and structure, reward). Controlled by environment variables:
// - RIBODESIGN_TELEMETRY_MODE: "off" (default), "stderr" or "jsonl"
// - RIBODESIGN_TELEMETRY_PATH: JSONL output path (jsonl mode)

use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::reward::EpisodeInfo;

/// Default JSONL path when none is configured.
pub const DEFAULT_TELEMETRY_PATH: &str = "ribodesign_episodes.jsonl";

/// One telemetry line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Episode index within the environment (1-based).
    pub episode_index: u64,
    pub reward: f64,
    #[serde(flatten)]
    pub info: EpisodeInfo,
}

/// Abstract sink for finished-episode records.
pub trait EpisodeSink {
    fn log_episode(&mut self, record: &EpisodeRecord);
}

/// Sink that discards all records.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EpisodeSink for NoopSink {
    fn log_episode(&mut self, _record: &EpisodeRecord) {}
}

/// Writes records to stderr with a `[episode]` prefix.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl EpisodeSink for StderrSink {
    fn log_episode(&mut self, record: &EpisodeRecord) {
        if let Ok(line) = serde_json::to_string(record) {
            eprintln!("[episode] {line}");
        }
    }
}

/// JSONL file sink.
pub struct JsonlSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlSink {
    /// Open `path` for appending.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            writer: BufWriter::new(file),
        })
    }
}

impl EpisodeSink for JsonlSink {
    fn log_episode(&mut self, record: &EpisodeRecord) {
        let result = serde_json::to_string(record)
            .map_err(io::Error::from)
            .and_then(|line| writeln!(self.writer, "{line}"))
            .and_then(|_| self.writer.flush());
        if let Err(e) = result {
            eprintln!(
                "[telemetry] WARN: failed to write {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

/// Sink selected from the environment.
pub enum EpisodeTelemetry {
    Off(NoopSink),
    Stderr(StderrSink),
    Jsonl(JsonlSink),
}

impl Default for EpisodeTelemetry {
    fn default() -> Self {
        EpisodeTelemetry::Off(NoopSink)
    }
}

impl EpisodeTelemetry {
    /// Build from RIBODESIGN_TELEMETRY_MODE / RIBODESIGN_TELEMETRY_PATH.
    ///
    /// Unknown modes and unopenable files fall back to `off` with a warning.
    pub fn from_env() -> Self {
        let mode = env::var("RIBODESIGN_TELEMETRY_MODE").unwrap_or_default();
        match mode.trim().to_ascii_lowercase().as_str() {
            "" | "off" => EpisodeTelemetry::Off(NoopSink),
            "stderr" => EpisodeTelemetry::Stderr(StderrSink),
            "jsonl" => {
                let path = env::var("RIBODESIGN_TELEMETRY_PATH")
                    .unwrap_or_else(|_| DEFAULT_TELEMETRY_PATH.to_string());
                match JsonlSink::create(&path) {
                    Ok(sink) => EpisodeTelemetry::Jsonl(sink),
                    Err(e) => {
                        eprintln!("[telemetry] WARN: cannot open {path}: {e}; telemetry off");
                        EpisodeTelemetry::Off(NoopSink)
                    }
                }
            }
            other => {
                eprintln!("[telemetry] WARN: unknown RIBODESIGN_TELEMETRY_MODE={other:?}; telemetry off");
                EpisodeTelemetry::Off(NoopSink)
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, EpisodeTelemetry::Off(_))
    }
}

impl EpisodeSink for EpisodeTelemetry {
    fn log_episode(&mut self, record: &EpisodeRecord) {
        match self {
            EpisodeTelemetry::Off(sink) => sink.log_episode(record),
            EpisodeTelemetry::Stderr(sink) => sink.log_episode(record),
            EpisodeTelemetry::Jsonl(sink) => sink.log_episode(record),
        }
    }
}
