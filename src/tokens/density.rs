// Density Filter - Rejects loop windows that are mostly silence
// Replays the token clock and compares notes per instrument to measures crossed

use serde::{Deserialize, Serialize};

use super::stream::{is_new_measure, timed, NoteTally};
use crate::loops::LoopWindow;

/// Settings for density filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensitySettings {
    /// Required notes per instrument for every measure in the window
    pub threshold: f64,
}

impl Default for DensitySettings {
    fn default() -> Self {
        DensitySettings { threshold: 3.0 }
    }
}

/// Note and measure counts inside one window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowStats {
    /// `new_measure` markers inside the window
    pub measures: usize,

    /// Note tokens inside the window, per instrument
    pub notes: NoteTally,
}

impl WindowStats {
    /// Average note count per instrument
    pub fn density(&self) -> f64 {
        self.notes.density()
    }

    /// A window with no instruments at all never passes
    pub fn passes(&self, threshold: f64) -> bool {
        self.notes.instruments() > 0 && self.density() >= threshold * self.measures as f64
    }
}

/// Count measures and notes whose clock position falls inside the window
pub fn window_stats<T: AsRef<str>>(tokens: &[T], window: &LoopWindow) -> WindowStats {
    let mut stats = WindowStats::default();

    for (tick, token) in timed(tokens).take_while(|(tick, _)| *tick < window.end_tick) {
        if !window.contains(tick) {
            continue;
        }
        if is_new_measure(token) {
            stats.measures += 1;
        }
        stats.notes.observe(token);
    }

    stats
}

/// Check a single window against the density threshold
pub fn passes_density<T: AsRef<str>>(tokens: &[T], window: &LoopWindow, settings: &DensitySettings) -> bool {
    window_stats(tokens, window).passes(settings.threshold)
}

/// Keep the windows dense enough to be worth looping, in input order
pub fn filter_loops_density<T: AsRef<str>>(
    tokens: &[T],
    windows: &[LoopWindow],
    settings: &DensitySettings,
) -> Vec<LoopWindow> {
    windows
        .iter()
        .filter(|window| {
            let stats = window_stats(tokens, window);
            let keep = stats.passes(settings.threshold);
            if !keep {
                log::debug!(
                    "Dropping sparse window {}..{}: density {:.2} over {} measures",
                    window.start_tick,
                    window.end_tick,
                    stats.density(),
                    stats.measures
                );
            }
            keep
        })
        .copied()
        .collect()
}
