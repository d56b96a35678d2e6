// Token Stream - Membership tests over linear song tokens
// Tokens stay opaque text; only prefixes and substrings are inspected

use std::collections::BTreeMap;

pub const NEW_MEASURE: &str = "new_measure";
pub const REPEAT_OPEN: &str = "measure:repeat_open";
pub const REPEAT_CLOSE: &str = "measure:repeat_close";

const WAIT_MARKER: &str = "wait:";

pub fn is_new_measure(token: &str) -> bool {
    token == NEW_MEASURE
}

pub fn is_repeat_open(token: &str) -> bool {
    token == REPEAT_OPEN
}

pub fn is_repeat_close(token: &str) -> bool {
    token.contains(REPEAT_CLOSE)
}

/// Any repeat bracket marker
pub fn is_repeat_marker(token: &str) -> bool {
    token.contains("repeat")
}

/// Instrument prefix of a sounded-note token
pub fn note_instrument(token: &str) -> Option<&str> {
    if !token.contains("note") {
        return None;
    }
    token.split(':').next()
}

/// Ticks advanced by a `wait:<n>` token
///
/// A wait token with an unreadable count advances the clock by zero.
pub fn wait_ticks(token: &str) -> Option<u64> {
    let pos = token.find(WAIT_MARKER)?;
    let count = &token[pos + WAIT_MARKER.len()..];
    match count.parse() {
        Ok(ticks) => Some(ticks),
        Err(_) => {
            log::debug!("Ignoring malformed wait token: {}", token);
            Some(0)
        }
    }
}

/// Render a repeat-close marker with the given repeat count
pub fn repeat_close(count: u32) -> String {
    format!("{}:{}", REPEAT_CLOSE, count)
}

/// Pair every token with the clock value before its own wait is applied
pub fn timed<T: AsRef<str>>(tokens: &[T]) -> impl Iterator<Item = (u64, &str)> + '_ {
    tokens.iter().scan(0u64, |clock, token| {
        let token = token.as_ref();
        let tick = *clock;
        if let Some(ticks) = wait_ticks(token) {
            *clock = clock.saturating_add(ticks);
        }
        Some((tick, token))
    })
}

/// Running count of note tokens per instrument
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteTally {
    counts: BTreeMap<String, usize>,
}

impl NoteTally {
    pub fn new() -> Self {
        NoteTally::default()
    }

    /// Count the token if it is a sounded note
    pub fn observe(&mut self, token: &str) {
        if let Some(instrument) = note_instrument(token) {
            *self.counts.entry(instrument.to_string()).or_insert(0) += 1;
        }
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Number of distinct instruments seen
    pub fn instruments(&self) -> usize {
        self.counts.len()
    }

    pub fn count(&self, instrument: &str) -> usize {
        self.counts.get(instrument).copied().unwrap_or(0)
    }

    /// Average notes per instrument; zero when nothing was seen
    pub fn density(&self) -> f64 {
        if self.counts.is_empty() {
            return 0.0;
        }
        self.total() as f64 / self.counts.len() as f64
    }
}
