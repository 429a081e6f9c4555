// Training trace
// Append-only JSONL log of training runs, one line per phase/epoch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::classifier::TrainingProgress;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("Trace file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed trace entry: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracePhase {
    Started,
    Epoch,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub timestamp: DateTime<Utc>,
    pub phase: TracePhase,

    /// Fraction of epochs done [0.0, 1.0]
    pub progress: f32,

    pub message: String,

    /// 1-based epoch number, epoch entries only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss: Option<f32>,
}

impl TraceEntry {
    fn new(phase: TracePhase, progress: f32, message: String) -> Self {
        TraceEntry {
            timestamp: Utc::now(),
            phase,
            progress: progress.clamp(0.0, 1.0),
            message,
            epoch: None,
            loss: None,
        }
    }

    /// Entry for one training event, stamped when it is called
    pub fn from_progress(progress: &TrainingProgress) -> Self {
        match *progress {
            TrainingProgress::Started {
                samples,
                epochs,
                batch_size,
            } => TraceEntry::new(
                TracePhase::Started,
                0.0,
                format!(
                    "Training on {} samples, {} epochs, batch size {}",
                    samples, epochs, batch_size
                ),
            ),
            TrainingProgress::Epoch {
                epoch,
                epochs,
                loss,
            } => {
                let mut entry = TraceEntry::new(
                    TracePhase::Epoch,
                    epoch as f32 / epochs.max(1) as f32,
                    format!("Epoch {} / {}", epoch, epochs),
                );
                entry.epoch = Some(epoch);
                entry.loss = Some(loss);
                entry
            }
            TrainingProgress::Completed { final_loss, .. } => {
                let mut entry =
                    TraceEntry::new(TracePhase::Completed, 1.0, "Training complete".to_string());
                entry.loss = Some(final_loss);
                entry
            }
        }
    }

    /// One newline-terminated JSONL record
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

pub struct TraceWriter {
    file_path: PathBuf,
}

impl TraceWriter {
    pub fn new(file_path: PathBuf) -> Self {
        TraceWriter { file_path }
    }

    /// Append entries, creating the file and its directory if needed
    pub fn write_batch(&self, entries: &[TraceEntry]) -> Result<(), TraceError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        let mut buffer = String::new();
        for entry in entries {
            buffer.push_str(&entry.to_json_line()?);
        }
        file.write_all(buffer.as_bytes())?;

        file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Blank lines are skipped
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    fs::read_to_string(path)?
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(TraceError::from))
        .collect()
}
