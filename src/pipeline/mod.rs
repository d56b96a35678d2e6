// Curation pipeline module
// Runs loop discovery end to end and records progress

pub mod curate;
pub mod trace;

pub use curate::{curate, fingerprint_tokens, CurationReport, PipelineError, TrackLoops};
pub use trace::{read_trace_file, CurationStage, TraceBuilder, TraceEntry, TraceError, TraceWriter};
