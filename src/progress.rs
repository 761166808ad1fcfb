// 📝 Progress Logger - append-only, one timestamped line per stage event
//
// Line format: `YYYY-MM-DD HH:MM:SS : <message>`
// Every line is also mirrored to tracing so it shows up in diagnostics.

use crate::error::{EtlError, EtlResult};
use chrono::{Local, NaiveDateTime};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SEPARATOR: &str = " : ";

#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub timestamp: NaiveDateTime,
    pub message: String,
}

impl LogEvent {
    pub fn now(message: &str) -> Self {
        LogEvent {
            timestamp: Local::now().naive_local(),
            message: message.to_string(),
        }
    }

    pub fn to_line(&self) -> String {
        format!(
            "{}{}{}\n",
            self.timestamp.format(TIMESTAMP_FORMAT),
            SEPARATOR,
            self.message
        )
    }

    pub fn parse_line(line: &str) -> Option<Self> {
        let (stamp, message) = line.split_once(SEPARATOR)?;
        let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;

        Some(LogEvent {
            timestamp,
            message: message.trim_end_matches(['\r', '\n']).to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProgressLogger {
    path: PathBuf,
}

impl ProgressLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ProgressLogger {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event. The file is opened per call so partial progress
    /// survives an abort.
    pub fn log(&self, message: &str) -> EtlResult<LogEvent> {
        let event = LogEvent::now(message);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;

        file.write_all(event.to_line().as_bytes())
            .map_err(|source| self.io_error(source))?;

        tracing::info!(target: "progress", "{}", message);
        Ok(event)
    }

    fn io_error(&self, source: std::io::Error) -> EtlError {
        EtlError::ProgressLog {
            path: self.path.clone(),
            source,
        }
    }
}

/// Read a progress log back into events, skipping lines that don't match
/// the log format.
pub fn read_events<P: AsRef<Path>>(path: P) -> EtlResult<Vec<LogEvent>> {
    let content = fs::read_to_string(path.as_ref()).map_err(|source| EtlError::ProgressLog {
        path: path.as_ref().to_path_buf(),
        source,
    })?;

    Ok(content.lines().filter_map(LogEvent::parse_line).collect())
}
