// Repeat Brackets - Extracts sections already marked as repeats in a token stream
// Nested brackets are tracked with an explicit stack of open regions

use serde::{Deserialize, Serialize};

use super::stream::{is_new_measure, is_repeat_close, is_repeat_open, NoteTally};

/// Length and density policy for explicit repeat sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatSettings {
    /// Fewest measures a kept section may span (inclusive)
    pub min_measures: usize,

    /// Most measures a kept section may span (inclusive)
    pub max_measures: usize,

    /// Required notes per instrument for every measure in the section
    pub density: f64,
}

impl Default for RepeatSettings {
    fn default() -> Self {
        RepeatSettings {
            min_measures: 4,
            max_measures: 16,
            density: 8.0,
        }
    }
}

/// A bracketed section found in the stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatRegion {
    /// Index of the `new_measure` token that opens the section
    pub start: usize,

    /// Index of the `new_measure` token of the closing measure, once resolved
    pub end: Option<usize>,

    /// Measures counted when the section closed
    pub measures: usize,

    /// Notes per instrument counted when the section closed
    pub density: f64,
}

impl RepeatRegion {
    fn open(start: usize) -> Self {
        RepeatRegion {
            start,
            end: None,
            measures: 0,
            density: 0.0,
        }
    }

    /// Closed at a position past the start of the stream
    pub fn is_resolved(&self) -> bool {
        matches!(self.end, Some(end) if end > 0)
    }

    /// Check the section against length and density limits
    pub fn qualifies(&self, settings: &RepeatSettings) -> bool {
        self.is_resolved()
            && self.measures >= settings.min_measures
            && self.measures <= settings.max_measures
            && self.density >= settings.density * self.measures as f64
    }
}

/// Left-to-right scanner state
///
/// The note tally and measure counter restart at every repeat-open and keep
/// running across closes.
#[derive(Debug, Default)]
pub struct RepeatScanner {
    tally: NoteTally,
    measures: usize,
    open: Vec<usize>,
    regions: Vec<RepeatRegion>,
}

impl RepeatScanner {
    pub fn new() -> Self {
        RepeatScanner::default()
    }

    /// Advance over the token at `i`, looking ahead up to two tokens
    pub fn step<T: AsRef<str>>(&mut self, tokens: &[T], i: usize) {
        let Some(token) = tokens.get(i).map(|t| t.as_ref()) else {
            return;
        };
        let ahead = |k: usize| tokens.get(i + k).map(|t| t.as_ref()).unwrap_or("");

        self.tally.observe(token);
        if !is_new_measure(token) {
            return;
        }

        self.measures += 1;

        if is_repeat_open(ahead(1)) {
            self.measures = 1;
            self.tally.clear();
            self.open.push(self.regions.len());
            self.regions.push(RepeatRegion::open(i));
        }

        if is_repeat_close(ahead(1)) || is_repeat_close(ahead(2)) {
            let density = self.tally.density();
            if let Some(idx) = self.open.pop() {
                self.close(idx, i, density);
            } else if self.regions.is_empty() {
                // Outermost open marker missing: the section runs from the stream start
                self.regions.push(RepeatRegion::open(0));
                self.close(self.regions.len() - 1, i, density);
            }
        }
    }

    fn close(&mut self, idx: usize, end: usize, density: f64) {
        let region = &mut self.regions[idx];
        region.end = Some(end);
        region.measures = self.measures;
        region.density = density;
    }

    /// Depth of currently open brackets
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Resolved regions in order of their opening; unterminated ones are dropped
    pub fn finish(self) -> Vec<RepeatRegion> {
        self.regions.into_iter().filter(RepeatRegion::is_resolved).collect()
    }
}

/// All resolved repeat regions of a stream
///
/// The last two tokens are never scanned since a close marker must follow
/// its measure's `new_measure` within two tokens.
pub fn scan_repeats<T: AsRef<str>>(tokens: &[T]) -> Vec<RepeatRegion> {
    let mut scanner = RepeatScanner::new();
    for i in 0..tokens.len().saturating_sub(2) {
        scanner.step(tokens, i);
    }
    if scanner.depth() > 0 {
        log::debug!("{} repeat brackets never closed", scanner.depth());
    }
    scanner.finish()
}

/// Tokens of every qualifying repeat section, concatenated in opening order
///
/// Each section runs from its opening `new_measure` through the end of its
/// closing measure.
pub fn get_repeats<T: AsRef<str>>(tokens: &[T], settings: &RepeatSettings) -> Vec<String> {
    let mut output = Vec::new();

    for region in scan_repeats(tokens) {
        if !region.qualifies(settings) {
            continue;
        }
        let Some(close) = region.end else {
            continue;
        };

        let mut end = close + 1;
        while end < tokens.len() && !is_new_measure(tokens[end].as_ref()) {
            end += 1;
        }
        if end > region.start {
            output.extend(tokens[region.start..end].iter().map(|t| t.as_ref().to_string()));
        }
    }

    output
}

/// Number of qualifying repeat sections
pub fn get_num_repeats<T: AsRef<str>>(tokens: &[T], settings: &RepeatSettings) -> usize {
    scan_repeats(tokens)
        .iter()
        .filter(|region| region.qualifies(settings))
        .count()
}
