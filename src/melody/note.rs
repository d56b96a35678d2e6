// Melody Notes - Comparable units built from single melodic events
// Equality is exact: duration, dotting and the full pitch set must match

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Ticks in a whole note at the tablature tick resolution
pub const TICKS_PER_WHOLE: f64 = 3840.0;

/// Ticks in one quarter-note beat
pub const TICKS_PER_BEAT: f64 = 960.0;

/// A sounded position: string number and fret (or raw value for non-fretted tracks)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pitch {
    /// String number (1-indexed in tablature; 0 is reserved for the rest sentinel)
    pub string: u32,

    /// Fret number or note value on that string
    pub value: i32,
}

impl Pitch {
    /// Create a new pitch
    pub fn new(string: u32, value: i32) -> Self {
        Pitch { string, value }
    }

    /// Sentinel pitch standing in for silence
    pub fn rest_sentinel() -> Self {
        Pitch { string: 0, value: 0 }
    }
}

/// Rhythmic value of a melodic event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDuration {
    /// Denominator of the note fraction (1 = whole, 4 = quarter, 16 = sixteenth)
    pub code: u32,

    /// Dotted notes last 1.5x as long
    pub dotted: bool,
}

impl NoteDuration {
    /// Create a new duration
    pub fn new(code: u32, dotted: bool) -> Self {
        NoteDuration { code, dotted }
    }

    /// Length in ticks; a zero code is clamped to a whole note
    pub fn ticks(&self) -> f64 {
        let base = TICKS_PER_WHOLE / self.code.max(1) as f64;
        if self.dotted {
            base * 1.5
        } else {
            base
        }
    }
}

/// Whether a melodic event sounds anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// No pitches sounded
    Rest,

    /// At least one pitch sounded
    Sounded,
}

/// Canonical melodic unit used by the correlation matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Rhythmic value
    pub duration: NoteDuration,

    /// Start position in ticks, first measure at tick 0
    pub start_tick: u64,

    /// True when the note starts exactly on its measure's first tick
    pub on_bar: bool,

    /// Sounded pitches; rests hold only the sentinel pitch
    pub pitches: BTreeSet<Pitch>,

    /// Rest or sounded, kept apart from the pitch set
    pub kind: NoteKind,
}

impl Note {
    /// Build a note from one melodic event
    ///
    /// An empty pitch list produces a rest carrying the sentinel pitch set.
    pub fn new(
        duration: NoteDuration,
        start_tick: u64,
        measure_start_tick: u64,
        pitches: impl IntoIterator<Item = Pitch>,
    ) -> Self {
        let mut pitches: BTreeSet<Pitch> = pitches.into_iter().collect();
        let kind = if pitches.is_empty() {
            pitches.insert(Pitch::rest_sentinel());
            NoteKind::Rest
        } else {
            NoteKind::Sounded
        };

        Note {
            duration,
            start_tick,
            on_bar: start_tick == measure_start_tick,
            pitches,
            kind,
        }
    }

    /// Convenience constructor for a rest
    pub fn rest(duration: NoteDuration, start_tick: u64, measure_start_tick: u64) -> Self {
        Note::new(duration, start_tick, measure_start_tick, std::iter::empty())
    }

    /// Length of this note in ticks
    pub fn tick_length(&self) -> f64 {
        self.duration.ticks()
    }

    pub fn is_rest(&self) -> bool {
        self.kind == NoteKind::Rest
    }
}

// Rest tagging stays out of equality: a sounded (0, 0) matches a rest.
impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.duration.code == other.duration.code
            && self.duration.dotted == other.duration.dotted
            && self.pitches.len() == other.pitches.len()
            && self.pitches.iter().all(|p| other.pitches.contains(p))
    }
}

impl Eq for Note {}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pitches: Vec<String> = self
            .pitches
            .iter()
            .map(|p| format!("{}:{}", p.string, p.value))
            .collect();
        write!(
            f,
            "{}{} {{{}}} ({}) at {}",
            self.duration.code,
            if self.duration.dotted { "." } else { "" },
            pitches.join(", "),
            if self.is_rest() { "rest" } else { "sounded" },
            self.start_tick
        )
    }
}

/// True when every note in the slice is a rest
pub fn is_all_rests(notes: &[Note]) -> bool {
    notes.iter().all(Note::is_rest)
}
