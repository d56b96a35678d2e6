// Curation configuration
// All policy parameters in one serializable structure, persisted as JSON

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::loops::LoopSettings;
use crate::tokens::{DensitySettings, RepeatSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Parameters for one curation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationConfig {
    /// Loop extraction limits
    pub loops: LoopSettings,

    /// Density filter applied to loop windows
    pub density: DensitySettings,

    /// Limits for counting repeat brackets already in the stream
    pub repeats: RepeatSettings,

    /// Tracks with more notes than this are skipped (no limit when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_track_notes: Option<usize>,
}

impl CurationConfig {
    /// Report settings that can never produce output
    ///
    /// The algorithms accept any values and simply find nothing; this is
    /// for callers that want to catch mistakes up front.
    pub fn validate(&self) -> ConfigResult<()> {
        let loops = &self.loops;
        if loops.min_run_len == 0 {
            return Err(ConfigError::Invalid("loops.min_run_len must be positive".into()));
        }
        if loops.min_beats > loops.max_beats {
            return Err(ConfigError::Invalid(format!(
                "loops.min_beats ({}) exceeds loops.max_beats ({})",
                loops.min_beats, loops.max_beats
            )));
        }
        if !self.density.threshold.is_finite() || self.density.threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "density.threshold must be a non-negative number, got {}",
                self.density.threshold
            )));
        }
        if self.repeats.min_measures > self.repeats.max_measures {
            return Err(ConfigError::Invalid(format!(
                "repeats.min_measures ({}) exceeds repeats.max_measures ({})",
                self.repeats.min_measures, self.repeats.max_measures
            )));
        }
        if self.max_track_notes == Some(0) {
            return Err(ConfigError::Invalid("max_track_notes must be positive".into()));
        }
        Ok(())
    }
}

/// Read a configuration file; missing fields take their defaults
pub fn load_config(path: &Path) -> ConfigResult<CurationConfig> {
    let contents = fs::read_to_string(path)?;
    let config: CurationConfig = serde_json::from_str(&contents)?;
    log::debug!("Loaded curation config from {}", path.display());
    Ok(config)
}

/// Write a configuration file as pretty-printed JSON
pub fn save_config(path: &Path, config: &CurationConfig) -> ConfigResult<()> {
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)?;
    Ok(())
}
