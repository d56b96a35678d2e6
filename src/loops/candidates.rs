// Loop Candidates - Turns correlation runs into loop windows
// Seeds on minimal runs, extends along the diagonal, filters and deduplicates

use serde::{Deserialize, Serialize};

use super::correlation::CorrelationMatrix;
use crate::melody::{is_all_rests, Note, TICKS_PER_BEAT};

/// Policy parameters for loop extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    /// Run length (in notes) that seeds a candidate
    pub min_run_len: usize,

    /// Shortest acceptable loop span in beats (inclusive)
    pub min_beats: f64,

    /// Longest acceptable loop span in beats (inclusive)
    pub max_beats: f64,

    /// Minimum matched duration in beats
    pub min_rep_beats: f64,
}

impl Default for LoopSettings {
    fn default() -> Self {
        LoopSettings {
            min_run_len: 4,
            min_beats: 16.0,
            max_beats: 32.0,
            min_rep_beats: 4.0,
        }
    }
}

impl LoopSettings {
    /// Settings whose span limits are given in bars of the piece's meter
    pub fn for_meter(min_bars: u32, max_bars: u32, beats_per_bar: f64) -> Self {
        LoopSettings {
            min_beats: min_bars as f64 * beats_per_bar,
            max_beats: max_bars as f64 * beats_per_bar,
            ..LoopSettings::default()
        }
    }
}

/// A loop expressed as a half-open tick range `[start_tick, end_tick)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoopWindow {
    pub start_tick: u64,
    pub end_tick: u64,
}

impl LoopWindow {
    pub fn new(start_tick: u64, end_tick: u64) -> Self {
        LoopWindow {
            start_tick,
            end_tick,
        }
    }

    /// Check if a tick falls within this window
    pub fn contains(&self, tick: u64) -> bool {
        tick >= self.start_tick && tick < self.end_tick
    }

    pub fn length_beats(&self) -> f64 {
        self.end_tick.saturating_sub(self.start_tick) as f64 / TICKS_PER_BEAT
    }
}

/// An accepted loop: the first occurrence of a repeat, up to where the second begins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopCandidate {
    /// Index of the first note of the loop
    pub start_index: usize,

    /// Index of the first note of the repetition (exclusive loop end)
    pub end_index: usize,

    pub start_tick: u64,
    pub end_tick: u64,

    /// Duration of the matched run in beats
    pub matched_beats: f64,
}

impl LoopCandidate {
    /// Loop span in beats
    pub fn length_beats(&self) -> f64 {
        self.window().length_beats()
    }

    pub fn window(&self) -> LoopWindow {
        LoopWindow::new(self.start_tick, self.end_tick)
    }

    /// Notes making up this loop
    pub fn notes<'a>(&self, notes: &'a [Note]) -> &'a [Note] {
        &notes[self.start_index..self.end_index]
    }
}

/// How a new pattern relates to one already accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternRelation {
    /// Nothing in common
    Unrelated,

    /// The new pattern is contained in the existing one
    Substring,

    /// The existing pattern is contained in the new one
    Superstring,
}

/// Relate a new pattern to an existing one
///
/// Only the first pair of notes is probed. Matching first notes make the
/// shorter pattern a substring of the longer one; equal lengths count as a
/// superstring so the newer pattern wins.
pub fn compare_patterns(new: &[Note], existing: &[Note]) -> PatternRelation {
    match (new.first(), existing.first()) {
        (Some(a), Some(b)) if a == b => {
            if new.len() < existing.len() {
                PatternRelation::Substring
            } else {
                PatternRelation::Superstring
            }
        }
        _ => PatternRelation::Unrelated,
    }
}

/// What to do with a newly accepted pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPlacement {
    Append,
    Discard,
    Replace(usize),
}

/// Scan accepted patterns in order; the first related one decides
pub fn place_pattern<'a>(
    existing: impl IntoIterator<Item = &'a [Note]>,
    new: &[Note],
) -> LoopPlacement {
    for (i, pattern) in existing.into_iter().enumerate() {
        match compare_patterns(new, pattern) {
            PatternRelation::Substring => return LoopPlacement::Discard,
            PatternRelation::Superstring => return LoopPlacement::Replace(i),
            PatternRelation::Unrelated => {}
        }
    }
    LoopPlacement::Append
}

/// Result of loop extraction for one track
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoopExtraction {
    /// Accepted loops in acceptance order
    pub candidates: Vec<LoopCandidate>,

    /// Tick windows parallel to `candidates`
    pub windows: Vec<LoopWindow>,
}

impl LoopExtraction {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    fn place(&mut self, notes: &[Note], candidate: LoopCandidate) {
        let placement = place_pattern(
            self.candidates.iter().map(|c| c.notes(notes)),
            candidate.notes(notes),
        );

        match placement {
            LoopPlacement::Append => {
                log::debug!(
                    "Accepted loop {}..{} ({:.1} beats)",
                    candidate.start_index,
                    candidate.end_index,
                    candidate.length_beats()
                );
                self.windows.push(candidate.window());
                self.candidates.push(candidate);
            }
            LoopPlacement::Replace(i) => {
                log::debug!(
                    "Loop {}..{} supersedes loop #{}",
                    candidate.start_index,
                    candidate.end_index,
                    i
                );
                self.windows[i] = candidate.window();
                self.candidates[i] = candidate;
            }
            LoopPlacement::Discard => {
                log::debug!(
                    "Loop {}..{} already covered",
                    candidate.start_index,
                    candidate.end_index
                );
            }
        }
    }
}

/// Extract deduplicated loops from a note sequence and its correlation matrix
///
/// Algorithm:
/// 1. Seed from every cell whose run equals `min_run_len`
/// 2. Drop seeds whose tentative span lies outside `[min_beats, max_beats]`
/// 3. Extend each seed along its diagonal while the run keeps growing
/// 4. Keep loops with enough matched duration that start on a bar and are not all rests
/// 5. Deduplicate against the loops accepted so far
pub fn extract_loops(
    notes: &[Note],
    matrix: &CorrelationMatrix,
    settings: &LoopSettings,
) -> LoopExtraction {
    let mut extraction = LoopExtraction::default();

    if settings.min_run_len == 0 || notes.is_empty() || matrix.size() != notes.len() {
        return extraction;
    }

    let size = matrix.size();
    let seed_run = settings.min_run_len as u32;

    let seeds: Vec<(usize, usize)> = matrix
        .cells_with_run(seed_run)
        .into_iter()
        .filter(|&(x, y)| {
            let start_x = x + 1 - settings.min_run_len;
            let start_y = y + 1 - settings.min_run_len;
            let span = tick_span(&notes[start_x], &notes[start_y]);
            span >= settings.min_beats && span <= settings.max_beats
        })
        .collect();

    log::debug!("{} notes: {} seeds within span limits", size, seeds.len());

    for (seed_x, seed_y) in seeds {
        let (mut x, mut y) = (seed_x, seed_y);
        while x + 1 < size && y + 1 < size && matrix.run(x + 1, y + 1) > matrix.run(x, y) {
            x += 1;
            y += 1;
        }

        let run = matrix.run(x, y) as usize;
        let beginning = x + 1 - run;
        let end = y + 1 - run;
        let matched_beats = matrix.duration(x, y) / TICKS_PER_BEAT;

        if matched_beats < settings.min_rep_beats {
            continue;
        }
        if !notes[beginning].on_bar || is_all_rests(&notes[beginning..end]) {
            continue;
        }

        extraction.place(
            notes,
            LoopCandidate {
                start_index: beginning,
                end_index: end,
                start_tick: notes[beginning].start_tick,
                end_tick: notes[end].start_tick,
                matched_beats,
            },
        );
    }

    extraction
}

fn tick_span(from: &Note, to: &Note) -> f64 {
    (to.start_tick as f64 - from.start_tick as f64) / TICKS_PER_BEAT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::melody::{NoteDuration, Pitch};

    const BAR: u64 = 3840;

    /// Quarter notes from tick 0; `None` is a rest
    fn melody(frets: &[Option<i32>]) -> Vec<Note> {
        frets
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let tick = i as u64 * 960;
                Note::new(
                    NoteDuration::new(4, false),
                    tick,
                    tick - tick % BAR,
                    f.map(|v| Pitch::new(1, v)),
                )
            })
            .collect()
    }

    fn sounded(frets: impl IntoIterator<Item = i32>) -> Vec<Option<i32>> {
        frets.into_iter().map(Some).collect()
    }

    fn run_extraction(notes: &[Note], settings: &LoopSettings) -> LoopExtraction {
        let matrix = CorrelationMatrix::build(notes);
        extract_loops(notes, &matrix, settings)
    }

    fn loose_settings() -> LoopSettings {
        LoopSettings {
            min_run_len: 4,
            min_beats: 4.0,
            max_beats: 32.0,
            min_rep_beats: 4.0,
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = LoopSettings::default();
        assert_eq!(settings.min_run_len, 4);
        assert_eq!(settings.min_beats, 16.0);
        assert_eq!(settings.max_beats, 32.0);
        assert_eq!(settings.min_rep_beats, 4.0);
    }

    #[test]
    fn test_settings_for_meter() {
        let settings = LoopSettings::for_meter(4, 8, 3.0);
        assert_eq!(settings.min_beats, 12.0);
        assert_eq!(settings.max_beats, 24.0);
        assert_eq!(settings.min_run_len, 4);
    }

    #[test]
    fn test_window_helpers() {
        let window = LoopWindow::new(3840, 7680);
        assert!(window.contains(3840));
        assert!(window.contains(7679));
        assert!(!window.contains(7680));
        assert_eq!(window.length_beats(), 4.0);
    }

    #[test]
    fn test_empty_sequence() {
        let extraction = run_extraction(&[], &LoopSettings::default());
        assert!(extraction.is_empty());
        assert!(extraction.windows.is_empty());
    }

    #[test]
    fn test_four_bar_phrase_repeated_after_intro() {
        // One intro bar, then a four-bar phrase played twice
        let mut frets = sounded(100..104);
        frets.extend(sounded(0..16));
        frets.extend(sounded(0..16));
        let notes = melody(&frets);

        let extraction = run_extraction(&notes, &loose_settings());

        assert_eq!(extraction.len(), 1);
        let candidate = &extraction.candidates[0];
        assert_eq!(candidate.start_index, 4);
        assert_eq!(candidate.end_index, 20);
        assert_eq!(candidate.start_tick, BAR);
        assert_eq!(candidate.end_tick, 5 * BAR);
        assert_eq!(candidate.length_beats(), 16.0);
        assert_eq!(candidate.matched_beats, 16.0);
        assert_eq!(extraction.windows, vec![LoopWindow::new(BAR, 5 * BAR)]);
    }

    #[test]
    fn test_default_span_limits_accept_four_bars() {
        let mut frets = sounded(0..16);
        frets.extend(sounded(0..16));
        let notes = melody(&frets);

        let extraction = run_extraction(&notes, &LoopSettings::default());
        assert_eq!(extraction.windows, vec![LoopWindow::new(0, 4 * BAR)]);
    }

    #[test]
    fn test_longer_loop_supersedes_shorter_with_same_start() {
        // abcd abcd abcd: a 4-note loop is found first, then an 8-note one
        let mut frets = sounded(0..4);
        frets.extend(sounded(0..4));
        frets.extend(sounded(0..4));
        let notes = melody(&frets);

        let extraction = run_extraction(&notes, &loose_settings());

        assert_eq!(extraction.len(), 1);
        assert_eq!(extraction.candidates[0].start_index, 0);
        assert_eq!(extraction.candidates[0].end_index, 8);
        assert_eq!(extraction.windows, vec![LoopWindow::new(0, 2 * BAR)]);
    }

    #[test]
    fn test_off_bar_start_rejected() {
        // A single pickup note pushes the phrase off the bar line
        let mut frets = sounded([100]);
        frets.extend(sounded(0..16));
        frets.extend(sounded(0..16));
        let notes = melody(&frets);

        assert!(run_extraction(&notes, &loose_settings()).is_empty());
    }

    #[test]
    fn test_all_rest_loop_rejected() {
        let mut frets = vec![None; 8];
        frets.extend(sounded(0..4));
        let notes = melody(&frets);

        assert!(run_extraction(&notes, &loose_settings()).is_empty());
    }

    #[test]
    fn test_matched_duration_threshold() {
        let mut frets = sounded(0..16);
        frets.extend(sounded(0..16));
        let notes = melody(&frets);

        let settings = LoopSettings {
            min_rep_beats: 16.5,
            ..loose_settings()
        };
        assert!(run_extraction(&notes, &settings).is_empty());
    }

    #[test]
    fn test_inverted_span_limits_yield_nothing() {
        let mut frets = sounded(0..16);
        frets.extend(sounded(0..16));
        let notes = melody(&frets);

        let settings = LoopSettings {
            min_beats: 32.0,
            max_beats: 16.0,
            ..loose_settings()
        };
        assert!(run_extraction(&notes, &settings).is_empty());
    }

    #[test]
    fn test_zero_run_length_yields_nothing() {
        let notes = melody(&sounded([1, 1, 1, 1]));
        let settings = LoopSettings {
            min_run_len: 0,
            ..loose_settings()
        };
        assert!(run_extraction(&notes, &settings).is_empty());
    }

    #[test]
    fn test_compare_patterns() {
        let notes = melody(&sounded([1, 2, 3, 4, 1, 2, 3, 4, 9, 8]));
        let short = &notes[0..4];
        let long = &notes[0..8];
        let other = &notes[8..10];

        assert_eq!(compare_patterns(short, long), PatternRelation::Substring);
        assert_eq!(compare_patterns(long, short), PatternRelation::Superstring);
        assert_eq!(compare_patterns(short, short), PatternRelation::Superstring);
        assert_eq!(compare_patterns(other, long), PatternRelation::Unrelated);
        assert_eq!(compare_patterns(&[], long), PatternRelation::Unrelated);
    }

    #[test]
    fn test_compare_patterns_probes_first_note_only() {
        // Same first note, different continuation: still treated as related
        let notes = melody(&sounded([1, 2, 3, 1, 7, 7, 7, 7]));
        let first = &notes[0..3];
        let second = &notes[3..8];

        assert_eq!(compare_patterns(first, second), PatternRelation::Substring);
    }

    #[test]
    fn test_place_pattern() {
        let notes = melody(&sounded([1, 2, 3, 4, 5, 6, 7, 8, 5, 6]));
        let existing: Vec<&[Note]> = vec![&notes[0..4], &notes[4..6]];

        // different first notes -> appended
        assert_eq!(place_pattern(existing.clone(), &notes[2..4]), LoopPlacement::Append);
        // shorter with matching first note -> discarded
        assert_eq!(place_pattern(existing.clone(), &notes[0..2]), LoopPlacement::Discard);
        // longer with matching first note -> replaces in place
        assert_eq!(place_pattern(existing.clone(), &notes[4..10]), LoopPlacement::Replace(1));
        assert_eq!(place_pattern(existing, &notes[0..8]), LoopPlacement::Replace(0));
    }

    #[test]
    fn test_distinct_loops_kept_independently() {
        // Two phrases with different openings, each repeated once
        let mut frets = sounded(0..16);
        frets.extend(sounded(0..16));
        frets.extend(sounded(20..36));
        frets.extend(sounded(20..36));
        let notes = melody(&frets);

        let extraction = run_extraction(&notes, &LoopSettings::default());
        assert_eq!(
            extraction.windows,
            vec![LoopWindow::new(0, 4 * BAR), LoopWindow::new(8 * BAR, 12 * BAR)]
        );
    }
}
