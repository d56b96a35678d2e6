// Token stream module
// Density filtering, loop assembly and repeat parsing over song tokens

pub mod assemble;
pub mod density;
pub mod repeats;
pub mod stream;

pub use assemble::{unify_loops, HEADER_LEN};
pub use density::{filter_loops_density, passes_density, window_stats, DensitySettings, WindowStats};
pub use repeats::{get_num_repeats, get_repeats, scan_repeats, RepeatRegion, RepeatScanner, RepeatSettings};
pub use stream::{repeat_close, timed, wait_ticks, NoteTally, NEW_MEASURE, REPEAT_CLOSE, REPEAT_OPEN};
