// Song Tracks - Song-side input model and per-track note sequences
// Flattens tracks -> measures -> beats into one Note sequence per track

use serde::{Deserialize, Serialize};

use super::note::{Note, NoteDuration, Pitch};

/// Lead-in offset carried by raw song ticks before the first measure
pub const SONG_TICK_OFFSET: u64 = 960;

/// Musical time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Beats per bar as written
    pub numerator: u32,

    /// Note value of one written beat (4 = quarter note)
    pub denominator: u32,
}

impl TimeSignature {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        TimeSignature {
            numerator,
            denominator,
        }
    }

    /// Bar length measured in quarter-note beats (6/8 -> 3.0)
    pub fn beats_per_bar(&self) -> f64 {
        self.numerator as f64 * 4.0 / self.denominator.max(1) as f64
    }
}

/// A single beat of the first voice as supplied by the song reader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongBeat {
    /// Raw start tick, including the song lead-in offset
    pub start_tick: u64,

    /// Rhythmic value
    pub duration: NoteDuration,

    /// Sounded pitches; empty for a rest
    pub pitches: Vec<Pitch>,
}

/// A measure of one track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongMeasure {
    /// Raw start tick, including the song lead-in offset
    pub start_tick: u64,

    pub time_signature: TimeSignature,

    /// Beats of the first voice, in order
    pub beats: Vec<SongBeat>,
}

/// One instrument track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongTrack {
    pub name: String,
    pub measures: Vec<SongMeasure>,
}

/// Time signature usage counted over the first track, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeterHistogram {
    counts: Vec<(TimeSignature, usize)>,
}

impl MeterHistogram {
    pub fn new() -> Self {
        MeterHistogram::default()
    }

    /// Count one more measure in this signature
    pub fn bump(&mut self, signature: TimeSignature) {
        match self.counts.iter_mut().find(|(sig, _)| *sig == signature) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((signature, 1)),
        }
    }

    pub fn count(&self, signature: &TimeSignature) -> usize {
        self.counts
            .iter()
            .find(|(sig, _)| sig == signature)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Most used signature; ties go to the one seen first
    pub fn dominant(&self) -> Option<TimeSignature> {
        let mut best: Option<(TimeSignature, usize)> = None;
        for &(sig, count) in &self.counts {
            if best.map_or(true, |(_, best_count)| count > best_count) {
                best = Some((sig, count));
            }
        }
        best.map(|(sig, _)| sig)
    }
}

/// Build one note sequence per track plus the first track's meter histogram
pub fn build_track_notes(tracks: &[SongTrack]) -> (Vec<Vec<Note>>, MeterHistogram) {
    let mut meters = MeterHistogram::new();
    let mut track_notes = Vec::with_capacity(tracks.len());

    for (i, track) in tracks.iter().enumerate() {
        let mut notes = Vec::new();
        for measure in &track.measures {
            let measure_start = measure.start_tick.saturating_sub(SONG_TICK_OFFSET);
            for beat in &measure.beats {
                notes.push(Note::new(
                    beat.duration,
                    beat.start_tick.saturating_sub(SONG_TICK_OFFSET),
                    measure_start,
                    beat.pitches.iter().copied(),
                ));
            }
            if i == 0 {
                meters.bump(measure.time_signature);
            }
        }
        log::debug!("Track {} ({}): {} notes", i, track.name, notes.len());
        track_notes.push(notes);
    }

    (track_notes, meters)
}

/// Quarter-note beats per bar of the dominant time signature
pub fn dominant_beats_per_bar(meters: &MeterHistogram) -> Option<f64> {
    meters.dominant().map(|sig| sig.beats_per_bar())
}
