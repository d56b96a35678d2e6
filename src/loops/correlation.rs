// Correlation Matrix - Repeated pattern discovery over a note sequence
// Correlative-matrix technique from Hsu, Liu & Chen, "Discovering nontrivial
// repeating patterns in music data", IEEE Trans. Multimedia 3 (2001)

use crate::melody::Note;

/// Match-run matrices for one note sequence
///
/// Cell (i, j) with i < j holds the length in notes and the duration in
/// ticks of the run of matching notes ending at positions i and j. Cells on
/// or below the diagonal are always zero.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    size: usize,
    runs: Vec<u32>,
    durations: Vec<f64>,
}

impl CorrelationMatrix {
    /// Build both matrices in O(N^2) time and memory
    pub fn build(notes: &[Note]) -> Self {
        let size = notes.len();
        let mut matrix = CorrelationMatrix {
            size,
            runs: vec![0; size * size],
            durations: vec![0.0; size * size],
        };

        if size == 0 {
            return matrix;
        }

        for j in 1..size {
            if notes[0] == notes[j] {
                matrix.set(0, j, 1, notes[j].tick_length());
            }
        }

        for i in 1..size {
            for j in (i + 1)..size {
                if notes[i] == notes[j] {
                    let run = matrix.run(i - 1, j - 1) + 1;
                    let duration = matrix.duration(i - 1, j - 1) + notes[j].tick_length();
                    matrix.set(i, j, run, duration);
                }
            }
        }

        matrix
    }

    fn set(&mut self, i: usize, j: usize, run: u32, duration: f64) {
        let idx = i * self.size + j;
        self.runs[idx] = run;
        self.durations[idx] = duration;
    }

    /// Number of notes in the sequence
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Run length ending at (i, j); zero outside the matrix
    pub fn run(&self, i: usize, j: usize) -> u32 {
        if i >= self.size || j >= self.size {
            return 0;
        }
        self.runs[i * self.size + j]
    }

    /// Matched duration in ticks ending at (i, j); zero outside the matrix
    pub fn duration(&self, i: usize, j: usize) -> f64 {
        if i >= self.size || j >= self.size {
            return 0.0;
        }
        self.durations[i * self.size + j]
    }

    /// All cells holding exactly `run`, in row-major order
    pub fn cells_with_run(&self, run: u32) -> Vec<(usize, usize)> {
        let mut cells = Vec::new();
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                if self.run(i, j) == run {
                    cells.push((i, j));
                }
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::melody::{NoteDuration, Pitch};

    fn seq(frets: &[i32]) -> Vec<Note> {
        frets
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let tick = i as u64 * 960;
                Note::new(NoteDuration::new(4, false), tick, tick - tick % 3840, [Pitch::new(1, *f)])
            })
            .collect()
    }

    #[test]
    fn test_empty_sequence() {
        let matrix = CorrelationMatrix::build(&[]);
        assert!(matrix.is_empty());
        assert!(matrix.cells_with_run(1).is_empty());
        assert_eq!(matrix.run(0, 1), 0);
    }

    #[test]
    fn test_single_note() {
        let matrix = CorrelationMatrix::build(&seq(&[3]));
        assert_eq!(matrix.size(), 1);
        assert_eq!(matrix.run(0, 0), 0);
    }

    #[test]
    fn test_runs_and_durations() {
        // a b c a b c
        let notes = seq(&[1, 2, 3, 1, 2, 3]);
        let matrix = CorrelationMatrix::build(&notes);

        assert_eq!(matrix.run(0, 3), 1);
        assert_eq!(matrix.run(1, 4), 2);
        assert_eq!(matrix.run(2, 5), 3);
        assert_eq!(matrix.duration(2, 5), 2880.0);
        assert_eq!(matrix.run(0, 1), 0);
        assert_eq!(matrix.duration(0, 1), 0.0);
    }

    #[test]
    fn test_lower_triangle_unused() {
        let notes = seq(&[1, 1, 1, 1]);
        let matrix = CorrelationMatrix::build(&notes);

        for i in 0..4 {
            for j in 0..=i {
                assert_eq!(matrix.run(i, j), 0);
            }
        }
        assert_eq!(matrix.run(2, 3), 3);
    }

    #[test]
    fn test_positive_runs_are_real_matches() {
        let notes = seq(&[1, 2, 1, 2, 2, 1, 2, 1, 3, 1, 2]);
        let matrix = CorrelationMatrix::build(&notes);

        for i in 0..notes.len() {
            for j in (i + 1)..notes.len() {
                let run = matrix.run(i, j) as usize;
                if run == 0 {
                    continue;
                }
                assert_eq!(notes[i], notes[j]);
                for k in 0..run {
                    assert_eq!(notes[i - k], notes[j - k]);
                }
            }
        }
    }

    #[test]
    fn test_runs_extend_along_diagonal() {
        let notes = seq(&[4, 5, 4, 5, 4, 5, 6, 4, 5]);
        let matrix = CorrelationMatrix::build(&notes);

        for i in 0..notes.len() {
            for j in (i + 1)..notes.len() {
                let run = matrix.run(i, j);
                if run == 0 {
                    continue;
                }
                if i == 0 {
                    assert_eq!(run, 1);
                } else {
                    assert_eq!(matrix.run(i - 1, j - 1), run - 1);
                }
            }
        }
    }

    #[test]
    fn test_cells_with_run_row_major() {
        let notes = seq(&[1, 2, 1, 2, 1, 2]);
        let matrix = CorrelationMatrix::build(&notes);

        assert_eq!(matrix.cells_with_run(2), vec![(1, 3), (1, 5)]);
    }
}
