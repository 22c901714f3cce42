/// Frames per window used by the streaming statistics when no window is given.
pub const DEFAULT_STATS_FRAMESIZE: u64 = 1024 * 1024;

/// Length of an `iter_read` block when no window is given, in seconds.
pub const DEFAULT_BLOCK_SECONDS: f64 = 1.0;

#[cfg(test)]
pub const AUDIO_SAMPLE_EPSILON: f64 = 1e-6;
