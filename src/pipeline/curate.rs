// Curation pipeline - Finds the loops of one piece and assembles them into a new stream
// Correlation and extraction run per track; density and assembly run on the shared token stream

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use super::trace::{CurationStage, TraceBuilder, TraceEntry, TraceError, TraceWriter};
use crate::config::CurationConfig;
use crate::loops::{extract_loops, CorrelationMatrix, LoopCandidate, LoopWindow};
use crate::melody::Note;
use crate::tokens::{filter_loops_density, get_num_repeats, unify_loops};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),
}

/// Loop candidates found on one track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackLoops {
    /// Position of the track in the input
    pub track: usize,

    pub note_count: usize,

    /// Track exceeded `max_track_notes` and was not correlated
    pub skipped: bool,

    pub candidates: Vec<LoopCandidate>,
}

/// Everything produced by one curation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurationReport {
    pub run_id: Uuid,

    /// SHA-256 of the input token stream, hex encoded
    pub input_sha256: String,

    pub tracks: Vec<TrackLoops>,

    /// Windows from all tracks, first occurrence kept, before density filtering
    pub candidate_windows: Vec<LoopWindow>,

    /// Windows that passed the density filter, in discovery order
    pub accepted_windows: Vec<LoopWindow>,

    /// Assembled output stream
    pub tokens: Vec<String>,

    /// Qualifying repeat brackets already present in the input stream
    pub existing_repeats: usize,
}

impl CurationReport {
    /// True when no loop made it into the output
    pub fn is_empty(&self) -> bool {
        self.accepted_windows.is_empty()
    }
}

/// Hash a token stream; each token is terminated by a newline
pub fn fingerprint_tokens<T: AsRef<str>>(tokens: &[T]) -> String {
    let mut hasher = Sha256::new();
    for token in tokens {
        hasher.update(token.as_ref().as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Run loop discovery over every track and assemble the surviving loops
///
/// The algorithms themselves cannot fail; an error only means the trace
/// file could not be written.
pub fn curate<T: AsRef<str>>(
    tracks: &[Vec<Note>],
    tokens: &[T],
    config: &CurationConfig,
    trace: Option<&TraceWriter>,
) -> Result<CurationReport, PipelineError> {
    let run_id = Uuid::new_v4();
    let emit = |entry: TraceEntry| -> Result<(), TraceError> {
        match trace {
            Some(writer) => writer.write(&entry),
            None => Ok(()),
        }
    };

    log::info!(
        "Curation run {}: {} tracks, {} tokens",
        run_id,
        tracks.len(),
        tokens.len()
    );

    let correlation = TraceBuilder::stage(run_id, CurationStage::Correlation);
    emit(correlation.start(format!("Correlating {} tracks", tracks.len())))?;

    let mut track_loops = Vec::with_capacity(tracks.len());
    let mut candidate_windows: Vec<LoopWindow> = Vec::new();

    for (index, notes) in tracks.iter().enumerate() {
        if let Some(limit) = config.max_track_notes.filter(|&limit| notes.len() > limit) {
            log::warn!(
                "Skipping track {}: {} notes exceeds limit of {}",
                index,
                notes.len(),
                limit
            );
            track_loops.push(TrackLoops {
                track: index,
                note_count: notes.len(),
                skipped: true,
                candidates: Vec::new(),
            });
            continue;
        }

        let matrix = CorrelationMatrix::build(notes);
        let found = extract_loops(notes, &matrix, &config.loops);
        for window in &found.windows {
            if !candidate_windows.contains(window) {
                candidate_windows.push(*window);
            }
        }
        log::debug!("Track {}: {} loop candidates", index, found.len());

        track_loops.push(TrackLoops {
            track: index,
            note_count: notes.len(),
            skipped: false,
            candidates: found.candidates,
        });
    }

    let skipped = track_loops.iter().filter(|t| t.skipped).count();
    emit(
        correlation
            .complete(format!("Correlated {} tracks", tracks.len() - skipped))
            .with_data(serde_json::json!({ "tracks": tracks.len(), "skipped": skipped })),
    )?;

    let candidate_count: usize = track_loops.iter().map(|t| t.candidates.len()).sum();
    log::info!(
        "Extracted {} candidates, {} distinct windows",
        candidate_count,
        candidate_windows.len()
    );
    emit(
        TraceBuilder::stage(run_id, CurationStage::Extraction)
            .complete("Extraction finished")
            .with_data(serde_json::json!({
                "candidates": candidate_count,
                "windows": candidate_windows.len(),
            })),
    )?;

    let accepted_windows = filter_loops_density(tokens, &candidate_windows, &config.density);
    log::info!(
        "Density filter kept {} of {} windows",
        accepted_windows.len(),
        candidate_windows.len()
    );
    emit(
        TraceBuilder::stage(run_id, CurationStage::Density)
            .complete("Density filter finished")
            .with_data(serde_json::json!({
                "kept": accepted_windows.len(),
                "dropped": candidate_windows.len() - accepted_windows.len(),
            })),
    )?;

    let output = unify_loops(tokens, &accepted_windows, &config.density);
    let existing_repeats = get_num_repeats(tokens, &config.repeats);
    log::info!(
        "Assembled {} tokens; input already had {} repeat sections",
        output.len(),
        existing_repeats
    );
    emit(
        TraceBuilder::stage(run_id, CurationStage::Assembly)
            .complete("Assembly finished")
            .with_data(serde_json::json!({
                "tokens": output.len(),
                "existing_repeats": existing_repeats,
            })),
    )?;

    Ok(CurationReport {
        run_id,
        input_sha256: fingerprint_tokens(tokens),
        tracks: track_loops,
        candidate_windows,
        accepted_windows,
        tokens: output,
        existing_repeats,
    })
}
