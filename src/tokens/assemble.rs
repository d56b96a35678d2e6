// Loop Assembler - Stitches loop windows into one repeat-annotated token stream
// Each dense window is copied out of the song and wrapped in its own repeat bracket

use super::density::{window_stats, DensitySettings};
use super::stream::{is_new_measure, is_repeat_marker, repeat_close, timed, REPEAT_OPEN};
use crate::loops::LoopWindow;

/// Leading tokens (artist, tuning, tempo, start) copied verbatim
pub const HEADER_LEN: usize = 4;

/// Concatenate every dense window into a single stream
///
/// The output starts with the song header. Each window that passes the
/// density rule contributes its tokens with any existing repeat markers
/// removed, a repeat-open after its first `new_measure` and a single-pass
/// repeat-close after its last one. A final repeat-close follows the last
/// window. With no windows the output is just the header.
pub fn unify_loops<T: AsRef<str>>(
    tokens: &[T],
    windows: &[LoopWindow],
    settings: &DensitySettings,
) -> Vec<String> {
    let mut output: Vec<String> = tokens
        .iter()
        .take(HEADER_LEN)
        .map(|t| t.as_ref().to_string())
        .collect();

    if windows.is_empty() {
        return output;
    }

    let body = tokens.get(HEADER_LEN..).unwrap_or(&[]);

    for window in windows {
        let stats = window_stats(tokens, window);
        if !stats.passes(settings.threshold) {
            log::debug!(
                "Skipping sparse window {}..{} during assembly",
                window.start_tick,
                window.end_tick
            );
            continue;
        }

        let mut measure_idx = 0;
        for (tick, token) in timed(body).take_while(|(tick, _)| *tick < window.end_tick) {
            if !window.contains(tick) || is_repeat_marker(token) {
                continue;
            }

            output.push(token.to_string());
            if is_new_measure(token) {
                if measure_idx == 0 {
                    output.push(REPEAT_OPEN.to_string());
                }
                if measure_idx + 1 == stats.measures {
                    output.push(repeat_close(1));
                }
                measure_idx += 1;
            }
        }
    }

    output.push(repeat_close(1));
    output
}
