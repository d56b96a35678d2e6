// Loop discovery module
// Correlation matrix construction and loop candidate extraction

pub mod candidates;
pub mod correlation;

pub use candidates::{
    compare_patterns, extract_loops, place_pattern, LoopCandidate, LoopExtraction, LoopPlacement,
    LoopSettings, LoopWindow, PatternRelation,
};
pub use correlation::CorrelationMatrix;
