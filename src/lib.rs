// Loopminer - Discovers repeated melodic loops in tablature and assembles them into training excerpts
// Correlation matrix over per-track notes, density filtering over the token stream

pub mod config;
pub mod loops;
pub mod melody;
pub mod pipeline;
pub mod tokens;

pub use config::{load_config, save_config, ConfigError, CurationConfig};
pub use loops::{extract_loops, CorrelationMatrix, LoopCandidate, LoopSettings, LoopWindow};
pub use melody::{build_track_notes, dominant_beats_per_bar, Note, NoteDuration, NoteKind, Pitch};
pub use pipeline::{curate, CurationReport, PipelineError};
pub use tokens::{filter_loops_density, get_num_repeats, get_repeats, unify_loops, DensitySettings, RepeatSettings};
