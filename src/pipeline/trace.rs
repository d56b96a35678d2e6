// Curation progress tracing
// Append-only JSONL log of the stages of each curation run

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during trace operations
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Stages of a curation run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurationStage {
    Correlation,
    Extraction,
    Density,
    Assembly,
}

impl fmt::Display for CurationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CurationStage::Correlation => "correlation",
            CurationStage::Extraction => "extraction",
            CurationStage::Density => "density",
            CurationStage::Assembly => "assembly",
        };
        f.write_str(name)
    }
}

/// One line of the trace file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// RFC 3339 creation time
    pub timestamp: String,

    /// Curation run this entry belongs to
    pub run_id: Uuid,

    pub stage: CurationStage,

    /// Progress within the stage [0.0, 1.0]
    pub progress: f32,

    pub message: String,

    /// Stage counters (tracks, candidates, windows kept)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    pub fn new(run_id: Uuid, stage: CurationStage, progress: f32, message: String) -> Self {
        TraceEntry {
            timestamp: Utc::now().to_rfc3339(),
            run_id,
            stage,
            progress: progress.clamp(0.0, 1.0),
            message,
            data: None,
        }
    }

    /// Attach structured data to the entry
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Serialize to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Appends trace entries to a JSONL file, creating it on first write
pub struct TraceWriter {
    file_path: PathBuf,
}

impl TraceWriter {
    pub fn new(file_path: PathBuf) -> Self {
        TraceWriter { file_path }
    }

    pub fn write(&self, entry: &TraceEntry) -> Result<(), TraceError> {
        self.write_batch(std::slice::from_ref(entry))
    }

    /// Write several entries with a single open and flush
    pub fn write_batch(&self, entries: &[TraceEntry]) -> Result<(), TraceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        for entry in entries {
            let json_line = entry.to_json_line()?;
            file.write_all(json_line.as_bytes())?;
        }

        file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Builds entries for one stage of one run
pub struct TraceBuilder {
    run_id: Uuid,
    stage: CurationStage,
}

impl TraceBuilder {
    pub fn stage(run_id: Uuid, stage: CurationStage) -> Self {
        TraceBuilder { run_id, stage }
    }

    /// Entry at progress 0.0
    pub fn start(&self, message: impl Into<String>) -> TraceEntry {
        self.progress(0.0, message)
    }

    pub fn progress(&self, progress: f32, message: impl Into<String>) -> TraceEntry {
        TraceEntry::new(self.run_id, self.stage, progress, message.into())
    }

    /// Entry at progress 1.0
    pub fn complete(&self, message: impl Into<String>) -> TraceEntry {
        self.progress(1.0, message)
    }
}

/// Read trace entries from a JSONL file, skipping blank lines
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(line)?);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_entry_clamps_progress() {
        let run_id = Uuid::new_v4();
        let low = TraceEntry::new(run_id, CurationStage::Density, -0.5, "low".to_string());
        let high = TraceEntry::new(run_id, CurationStage::Density, 1.5, "high".to_string());

        assert_eq!(low.progress, 0.0);
        assert_eq!(high.progress, 1.0);
        assert!(low.data.is_none());
    }

    #[test]
    fn test_builder() {
        let run_id = Uuid::new_v4();
        let builder = TraceBuilder::stage(run_id, CurationStage::Extraction);

        let start = builder.start("Extracting");
        assert_eq!(start.progress, 0.0);
        assert_eq!(start.run_id, run_id);
        assert_eq!(start.stage, CurationStage::Extraction);

        let done = builder
            .complete("Extracted")
            .with_data(serde_json::json!({ "candidates": 3 }));
        assert_eq!(done.progress, 1.0);
        assert_eq!(done.data.unwrap()["candidates"], 3);
    }

    #[test]
    fn test_stage_serialized_snake_case() {
        let entry = TraceEntry::new(Uuid::new_v4(), CurationStage::Assembly, 1.0, "done".to_string());
        let line = entry.to_json_line().unwrap();

        assert!(line.ends_with('\n'));
        assert!(line.contains(r#""stage":"assembly""#));
        assert!(!line.contains("\"data\""));
        assert_eq!(CurationStage::Correlation.to_string(), "correlation");
    }

    #[test]
    fn test_writer_appends() {
        let temp_dir = TempDir::new().unwrap();
        let trace_path = temp_dir.path().join("trace.jsonl");
        let writer = TraceWriter::new(trace_path.clone());
        let run_id = Uuid::new_v4();

        writer.write(&TraceBuilder::stage(run_id, CurationStage::Correlation).start("Start")).unwrap();
        writer
            .write_batch(&[
                TraceBuilder::stage(run_id, CurationStage::Correlation).complete("Built"),
                TraceBuilder::stage(run_id, CurationStage::Extraction).complete("Extracted"),
            ])
            .unwrap();

        let entries = read_trace_file(&trace_path).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].stage, CurationStage::Correlation);
        assert_eq!(entries[2].stage, CurationStage::Extraction);
        assert!(entries.iter().all(|e| e.run_id == run_id));
        assert_eq!(writer.path(), trace_path.as_path());
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = read_trace_file(&temp_dir.path().join("missing.jsonl"));
        assert!(matches!(result, Err(TraceError::IoError(_))));
    }
}
