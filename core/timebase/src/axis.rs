use chrono::{NaiveDateTime, TimeDelta, Timelike};

use crate::{
    error::{TimeAxisError, TimeAxisResult},
    rounding::FrameQuantizer,
};

const NANOS_PER_SECOND: f64 = 1e9;

/// Where within a frame a time value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramePoint {
    #[default]
    Start,
    Center,
    End,
}

impl FramePoint {
    const fn offset(self) -> f64 {
        match self {
            Self::Start => 0.0,
            Self::Center => 0.5,
            Self::End => 1.0,
        }
    }
}

/// The time axis of a sampled signal: `nframes` frames at `fs` Hz.
///
/// Relative time is measured in seconds with `origintime` as time zero, so
/// frame `n` starts at `n / fs + origintime`. Absolute time is anchored at
/// `startdatetime`, the wall-clock time of frame 0, when it is known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAxis {
    fs: f64,
    nframes: u64,
    origintime: f64,
    startdatetime: Option<NaiveDateTime>,
}

impl TimeAxis {
    pub fn new(fs: f64, nframes: u64) -> TimeAxisResult<Self> {
        if !fs.is_finite() || fs <= 0.0 {
            return Err(TimeAxisError::range(format!(
                "sampling rate must be positive and finite, not {fs}"
            )));
        }
        Ok(Self {
            fs,
            nframes,
            origintime: 0.0,
            startdatetime: None,
        })
    }

    #[must_use]
    pub fn with_origintime(mut self, origintime: f64) -> Self {
        self.origintime = origintime;
        self
    }

    #[must_use]
    pub fn with_startdatetime(mut self, startdatetime: Option<NaiveDateTime>) -> Self {
        self.startdatetime = startdatetime;
        self
    }

    pub fn fs(&self) -> f64 {
        self.fs
    }

    /// Sampling period in seconds.
    pub fn dt(&self) -> f64 {
        1.0 / self.fs
    }

    pub fn nframes(&self) -> u64 {
        self.nframes
    }

    pub fn origintime(&self) -> f64 {
        self.origintime
    }

    pub fn startdatetime(&self) -> Option<NaiveDateTime> {
        self.startdatetime
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.nframes as f64 / self.fs
    }

    /// Wall-clock time of the boundary right after the last frame.
    pub fn end_datetime(&self) -> Option<NaiveDateTime> {
        self.frame_to_datetime(self.nframes, FramePoint::Start)
    }

    /// Relative time (seconds, origin-adjusted) of a point within `frame`.
    pub fn frame_to_time(&self, frame: u64, point: FramePoint) -> f64 {
        (frame as f64 + point.offset()) / self.fs + self.origintime
    }

    /// Wall-clock time of a point within `frame`, rounded to nanoseconds.
    pub fn frame_to_datetime(&self, frame: u64, point: FramePoint) -> Option<NaiveDateTime> {
        let start = self.startdatetime?;
        let seconds = (frame as f64 + point.offset()) / self.fs;
        let nanos = FrameQuantizer::round_half_even(seconds * NANOS_PER_SECOND);
        start.checked_add_signed(TimeDelta::nanoseconds(nanos as i64))
    }

    /// Frame index of a relative time: `round((time - origintime) * fs)`.
    pub fn time_to_frame(&self, time: f64) -> TimeAxisResult<i64> {
        FrameQuantizer::seconds_to_frame(time - self.origintime, self.fs)
    }

    /// Frame index of a wall-clock time: `round((datetime - startdatetime) * fs)`.
    pub fn datetime_to_frame(&self, datetime: NaiveDateTime) -> TimeAxisResult<i64> {
        let start = self.startdatetime.ok_or_else(|| {
            TimeAxisError::conflict("datetime given, but the start datetime of the sound is unknown")
        })?;
        let nanos = (datetime - start).num_nanoseconds().ok_or_else(|| {
            TimeAxisError::range(format!("{datetime} is too far from {start}"))
        })?;
        FrameQuantizer::seconds_to_frame(nanos as f64 / NANOS_PER_SECOND, self.fs)
    }

    /// Number of frames from `frame` to the next full clock hour, or 0 when
    /// `frame` falls exactly on the hour. `None` if the start is unknown.
    pub fn frames_to_next_hour(&self, frame: u64) -> Option<u64> {
        let at = self.frame_to_datetime(frame, FramePoint::Start)?;
        if at.minute() == 0 && at.second() == 0 && at.nanosecond() == 0 {
            return Some(0);
        }
        let hour = at.with_minute(0)?.with_second(0)?.with_nanosecond(0)?;
        let next = hour.checked_add_signed(TimeDelta::hours(1))?;
        let nanos = (next - at).num_nanoseconds()?;
        let frames =
            FrameQuantizer::seconds_to_frame(nanos as f64 / NANOS_PER_SECOND, self.fs).ok()?;
        u64::try_from(frames).ok()
    }
}

/// Human-readable duration, e.g. `1.50 second` or `2.00 hours`. Amounts
/// below 2 use the singular unit.
pub fn duration_string(seconds: f64) -> String {
    const INTERVALS: [(f64, &str); 6] = [
        (60.0 * 60.0 * 24.0 * 7.0, "weeks"),
        (60.0 * 60.0 * 24.0, "days"),
        (60.0 * 60.0, "hours"),
        (60.0, "minutes"),
        (1.0, "seconds"),
        (0.001, "milliseconds"),
    ];
    for (interval, unit) in INTERVALS {
        if seconds >= interval {
            let amount = seconds / interval;
            let unit = if amount < 2.0 {
                unit.trim_end_matches('s')
            } else {
                unit
            };
            return format!("{amount:.2} {unit}");
        }
    }
    format!("{:.3} millisecond", seconds / 0.001)
}
