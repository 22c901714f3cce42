use serde::Deserialize;

use crate::{
    constants::{DEFAULT_BLOCK_SECONDS, DEFAULT_STATS_FRAMESIZE},
    sample::SampleType,
};

/// Engine-wide defaults, injected into each [`crate::LogicalSound`].
///
/// Every field is optional when deserializing, e.g. from a host's JSON
/// settings: `{"block_seconds": 0.5}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output type of normalized reads when none is requested.
    pub normalized_dtype: SampleType,
    /// Length of an unwindowed `iter_read` block, in seconds.
    pub block_seconds: f64,
    /// Window size used by statistics when none is given.
    pub stats_framesize: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            normalized_dtype: SampleType::F64,
            block_seconds: DEFAULT_BLOCK_SECONDS,
            stats_framesize: DEFAULT_STATS_FRAMESIZE,
        }
    }
}

impl EngineConfig {
    /// Frames in one default block at `fs`, at least one.
    pub fn block_frames(&self, fs: f64) -> u64 {
        let frames = (self.block_seconds * fs).round_ties_even();
        if frames.is_finite() && frames >= 1.0 {
            frames as u64
        } else {
            1
        }
    }
}
