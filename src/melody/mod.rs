// Melody module
// Note equivalence model and song-side track input

pub mod note;
pub mod track;

pub use note::{is_all_rests, Note, NoteDuration, NoteKind, Pitch, TICKS_PER_BEAT, TICKS_PER_WHOLE};
pub use track::{
    build_track_notes, dominant_beats_per_bar, MeterHistogram, SongBeat, SongMeasure, SongTrack,
    TimeSignature, SONG_TICK_OFFSET,
};
