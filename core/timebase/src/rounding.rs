use crate::error::{TimeAxisError, TimeAxisResult};

/// Largest magnitude that converts to `i64` without saturating.
const MAX_EXACT_FRAME: f64 = 9_007_199_254_740_992.0; // 2^53

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameQuantizer;

impl FrameQuantizer {
    /// Round to the nearest integer, ties to even (`0.5 -> 0`, `1.5 -> 2`,
    /// `2.5 -> 2`, `-0.5 -> -0`).
    pub fn round_half_even(value: f64) -> f64 {
        value.round_ties_even()
    }

    /// Snap a scaled time value (`seconds * fs`) to a frame index.
    pub fn snap(scaled: f64) -> TimeAxisResult<i64> {
        if !scaled.is_finite() {
            return Err(TimeAxisError::range(format!(
                "time value does not map to a frame index ({scaled})"
            )));
        }
        let rounded = Self::round_half_even(scaled);
        if rounded.abs() > MAX_EXACT_FRAME {
            return Err(TimeAxisError::range(format!(
                "frame index {rounded} is outside the representable range"
            )));
        }
        Ok(rounded as i64)
    }

    /// Convert seconds to a frame index at sampling rate `fs`.
    pub fn seconds_to_frame(seconds: f64, fs: f64) -> TimeAxisResult<i64> {
        Self::snap(seconds * fs)
    }
}

#[cfg(test)]
mod quantizer_tests {
    use super::*;

    #[test]
    fn test_ties_round_to_even() {
        assert_eq!(FrameQuantizer::snap(0.5).unwrap(), 0);
        assert_eq!(FrameQuantizer::snap(1.5).unwrap(), 2);
        assert_eq!(FrameQuantizer::snap(2.5).unwrap(), 2);
        assert_eq!(FrameQuantizer::snap(3.5).unwrap(), 4);
        assert_eq!(FrameQuantizer::snap(-0.5).unwrap(), 0);
        assert_eq!(FrameQuantizer::snap(-1.5).unwrap(), -2);
    }

    #[test]
    fn test_quantizer_is_plain_value() {
        let quantizer = FrameQuantizer;
        let copied = quantizer;
        assert_eq!(format!("{quantizer:?}"), "FrameQuantizer");
        assert_eq!(format!("{copied:?}"), format!("{:?}", FrameQuantizer::default()));
    }

    #[test]
    fn test_non_ties_round_to_nearest() {
        assert_eq!(FrameQuantizer::snap(2.4999).unwrap(), 2);
        assert_eq!(FrameQuantizer::snap(2.5001).unwrap(), 3);
        assert_eq!(FrameQuantizer::snap(-2.6).unwrap(), -3);
    }

    #[test]
    fn test_seconds_to_frame_at_fractional_rate() {
        // 0.25 s at 22.0 Hz is 5.5 frames, which ties to 6
        assert_eq!(FrameQuantizer::seconds_to_frame(0.25, 22.0).unwrap(), 6);
        // 0.125 s at 20.0 Hz is 2.5 frames, which ties to 2
        assert_eq!(FrameQuantizer::seconds_to_frame(0.125, 20.0).unwrap(), 2);
    }

    #[test]
    fn test_non_finite_is_range_error() {
        assert!(matches!(
            FrameQuantizer::snap(f64::NAN),
            Err(TimeAxisError::Range(_))
        ));
        assert!(matches!(
            FrameQuantizer::seconds_to_frame(f64::INFINITY, 1000.0),
            Err(TimeAxisError::Range(_))
        ));
    }

    #[test]
    fn test_rounding_is_reproducible() {
        let a = FrameQuantizer::seconds_to_frame(1.234_567, 44_100.0).unwrap();
        let b = FrameQuantizer::seconds_to_frame(1.234_567, 44_100.0).unwrap();
        assert_eq!(a, b);
    }
}
