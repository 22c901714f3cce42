use std::ops::Range;

use chrono::NaiveDateTime;

use crate::{
    axis::{FramePoint, TimeAxis},
    error::{TimeAxisError, TimeAxisResult},
};

/// A validated frame range `[start, end)` with `0 <= start <= end <= nframes`.
///
/// Only obtainable through [`TimeAxis::resolve`] or [`TimeAxis::frames`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Episode {
    start: u64,
    end: u64,
}

impl Episode {
    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<u64> {
        self.start..self.end
    }

    /// Narrow to `[start, end)`, which must lie within this episode.
    pub fn sub(&self, start: u64, end: u64) -> TimeAxisResult<Self> {
        if start > end || start < self.start || end > self.end {
            return Err(TimeAxisError::range(format!(
                "[{start}, {end}) is not within episode [{}, {})",
                self.start, self.end
            )));
        }
        Ok(Self { start, end })
    }
}

/// A possibly ambiguous episode request: at most one start and at most one
/// end specifier are allowed, which is checked when the query is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpisodeQuery {
    pub start_frame: Option<i64>,
    pub start_time: Option<f64>,
    pub start_datetime: Option<NaiveDateTime>,
    pub end_frame: Option<i64>,
    pub end_time: Option<f64>,
    pub end_datetime: Option<NaiveDateTime>,
}

impl EpisodeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn start_frame(mut self, frame: i64) -> Self {
        self.start_frame = Some(frame);
        self
    }

    #[must_use]
    pub fn start_time(mut self, time: f64) -> Self {
        self.start_time = Some(time);
        self
    }

    #[must_use]
    pub fn start_datetime(mut self, datetime: NaiveDateTime) -> Self {
        self.start_datetime = Some(datetime);
        self
    }

    #[must_use]
    pub fn end_frame(mut self, frame: i64) -> Self {
        self.end_frame = Some(frame);
        self
    }

    #[must_use]
    pub fn end_time(mut self, time: f64) -> Self {
        self.end_time = Some(time);
        self
    }

    #[must_use]
    pub fn end_datetime(mut self, datetime: NaiveDateTime) -> Self {
        self.end_datetime = Some(datetime);
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Frame(i64),
    Time(f64),
    DateTime(NaiveDateTime),
}

fn single_bound(
    which: &str,
    frame: Option<i64>,
    time: Option<f64>,
    datetime: Option<NaiveDateTime>,
) -> TimeAxisResult<Option<Bound>> {
    let given = [frame.is_some(), time.is_some(), datetime.is_some()]
        .into_iter()
        .filter(|&g| g)
        .count();
    if given > 1 {
        return Err(TimeAxisError::conflict(format!(
            "at most one {which} parameter (frame, time or datetime) may be given, got {given}"
        )));
    }
    Ok(frame
        .map(Bound::Frame)
        .or_else(|| time.map(Bound::Time))
        .or_else(|| datetime.map(Bound::DateTime)))
}

impl TimeAxis {
    fn bound_to_frame(&self, bound: Bound) -> TimeAxisResult<i64> {
        match bound {
            Bound::Frame(frame) => Ok(frame),
            Bound::Time(time) => self.time_to_frame(time),
            Bound::DateTime(datetime) => self.datetime_to_frame(datetime),
        }
    }

    /// Resolve a query to an [`Episode`]. A missing start is frame 0, a
    /// missing end is `nframes`.
    pub fn resolve(&self, query: &EpisodeQuery) -> TimeAxisResult<Episode> {
        let start = single_bound(
            "start",
            query.start_frame,
            query.start_time,
            query.start_datetime,
        )?;
        let end = single_bound("end", query.end_frame, query.end_time, query.end_datetime)?;

        let startframe = match start {
            Some(bound) => self.bound_to_frame(bound)?,
            None => 0,
        };
        let endframe = match end {
            Some(bound) => Some(self.bound_to_frame(bound)?),
            None => None,
        };

        let startframe = u64::try_from(startframe).map_err(|_| {
            TimeAxisError::range(format!("start frame ({startframe}) should be >= 0"))
        })?;
        let endframe = match endframe {
            Some(frame) => u64::try_from(frame).map_err(|_| {
                TimeAxisError::range(format!("end frame ({frame}) should be >= 0"))
            })?,
            None => self.nframes(),
        };
        self.frames(startframe, endframe)
    }

    /// Validate a plain frame range.
    pub fn frames(&self, start: u64, end: u64) -> TimeAxisResult<Episode> {
        if start > end {
            return Err(TimeAxisError::range(format!(
                "end frame ({end}) lower than start frame ({start})"
            )));
        }
        if end > self.nframes() {
            return Err(TimeAxisError::range(format!(
                "end frame ({end}) higher than nframes ({})",
                self.nframes()
            )));
        }
        Ok(Episode { start, end })
    }

    /// The whole axis as one episode.
    pub fn full(&self) -> Episode {
        Episode {
            start: 0,
            end: self.nframes(),
        }
    }

    /// Axis of the frames in `episode`, placed so that every frame keeps its
    /// relative and wall-clock time: frame 0 of the result is frame
    /// `episode.start()` here.
    pub fn excerpt(&self, episode: &Episode) -> TimeAxisResult<Self> {
        let episode = self.frames(episode.start(), episode.end())?;
        let shift = episode.start() as f64 / self.fs();
        let startdatetime = match self.startdatetime() {
            Some(_) => Some(
                self.frame_to_datetime(episode.start(), FramePoint::Start)
                    .ok_or_else(|| {
                        TimeAxisError::range(format!(
                            "start of frame {} is not a representable datetime",
                            episode.start()
                        ))
                    })?,
            ),
            None => None,
        };
        Ok(Self::new(self.fs(), episode.len())?
            .with_origintime(self.origintime() + shift)
            .with_startdatetime(startdatetime))
    }
}

#[cfg(test)]
mod episode_tests {
    use chrono::NaiveDate;

    use super::*;

    fn axis() -> TimeAxis {
        TimeAxis::new(1000.0, 10_000).unwrap()
    }

    fn at(h: u32, m: u32, s: u32, milli: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, 15)
            .unwrap()
            .and_hms_milli_opt(h, m, s, milli)
            .unwrap()
    }

    #[test]
    fn test_defaults_cover_whole_axis() {
        let episode = axis().resolve(&EpisodeQuery::new()).unwrap();
        assert_eq!(episode.range(), 0..10_000);
        assert_eq!(episode, axis().full());
    }

    #[test]
    fn test_frame_bounds() {
        let episode = axis()
            .resolve(&EpisodeQuery::new().start_frame(400).end_frame(700))
            .unwrap();
        assert_eq!((episode.start(), episode.end()), (400, 700));
        assert_eq!(episode.len(), 300);
    }

    #[test]
    fn test_conflicting_start_parameters() {
        let result = axis().resolve(&EpisodeQuery::new().start_frame(10).start_time(1.0));
        assert!(matches!(result, Err(TimeAxisError::ParameterConflict(_))));
    }

    #[test]
    fn test_conflicting_end_parameters() {
        let result = axis().resolve(&EpisodeQuery::new().end_time(2.0).end_frame(5));
        assert!(matches!(result, Err(TimeAxisError::ParameterConflict(_))));
    }

    #[test]
    fn test_start_time_alone_resolves_to_rounded_frame() {
        let episode = axis().resolve(&EpisodeQuery::new().start_time(1.0)).unwrap();
        assert_eq!(episode.start(), 1000);
        assert_eq!(episode.end(), 10_000);
    }

    #[test]
    fn test_time_respects_origin() {
        let axis = axis().with_origintime(0.5);
        let episode = axis
            .resolve(&EpisodeQuery::new().start_time(1.0).end_time(2.0))
            .unwrap();
        assert_eq!(episode.range(), 500..1500);
    }

    #[test]
    fn test_half_frame_times_tie_to_even() {
        let axis = TimeAxis::new(2.0, 100).unwrap();
        // 1.25 s * 2 Hz = 2.5 frames -> 2; 1.75 s * 2 Hz = 3.5 frames -> 4
        let episode = axis
            .resolve(&EpisodeQuery::new().start_time(1.25).end_time(1.75))
            .unwrap();
        assert_eq!(episode.range(), 2..4);
    }

    #[test]
    fn test_datetime_bounds() {
        let axis = axis().with_startdatetime(Some(at(10, 0, 0, 0)));
        let episode = axis
            .resolve(
                &EpisodeQuery::new()
                    .start_datetime(at(10, 0, 1, 0))
                    .end_datetime(at(10, 0, 2, 500)),
            )
            .unwrap();
        assert_eq!(episode.range(), 1000..2500);
    }

    #[test]
    fn test_datetime_without_known_start() {
        let result = axis().resolve(&EpisodeQuery::new().start_datetime(at(10, 0, 0, 0)));
        assert!(matches!(result, Err(TimeAxisError::ParameterConflict(_))));
    }

    #[test]
    fn test_negative_start_is_range_error() {
        let result = axis().resolve(&EpisodeQuery::new().start_frame(-1));
        assert!(matches!(result, Err(TimeAxisError::Range(_))));
        let result = axis().resolve(&EpisodeQuery::new().start_time(-0.5));
        assert!(matches!(result, Err(TimeAxisError::Range(_))));
    }

    #[test]
    fn test_negative_end_is_reported_as_negative() {
        match axis().resolve(&EpisodeQuery::new().end_frame(-3)) {
            Err(TimeAxisError::Range(message)) => {
                assert_eq!(message, "end frame (-3) should be >= 0");
            }
            other => panic!("expected a range error, got {other:?}"),
        }
    }

    #[test]
    fn test_inverted_and_overlong_ranges() {
        let inverted = axis().resolve(&EpisodeQuery::new().start_frame(20).end_frame(10));
        assert!(matches!(inverted, Err(TimeAxisError::Range(_))));

        let overlong = axis().resolve(&EpisodeQuery::new().end_frame(10_001));
        assert!(matches!(overlong, Err(TimeAxisError::Range(_))));

        let negative_end = axis().resolve(&EpisodeQuery::new().end_frame(-3));
        assert!(matches!(negative_end, Err(TimeAxisError::Range(_))));
    }

    #[test]
    fn test_empty_episode_is_valid() {
        let episode = axis()
            .resolve(&EpisodeQuery::new().start_frame(10_000))
            .unwrap();
        assert!(episode.is_empty());
    }

    #[test]
    fn test_excerpt_keeps_frame_times() {
        let parent = axis()
            .with_origintime(-2.0)
            .with_startdatetime(Some(at(9, 59, 59, 500)));
        let episode = parent.frames(1_500, 4_000).unwrap();
        let excerpt = parent.excerpt(&episode).unwrap();

        assert_eq!(excerpt.nframes(), 2_500);
        assert_eq!(excerpt.fs(), 1000.0);
        assert_eq!(excerpt.startdatetime(), Some(at(10, 0, 1, 0)));
        assert_eq!(excerpt.end_datetime(), parent.frame_to_datetime(4_000, FramePoint::Start));
        for frame in [0, 1, 2_499] {
            let own = excerpt.frame_to_time(frame, FramePoint::Start);
            let original = parent.frame_to_time(frame + 1_500, FramePoint::Start);
            assert!((own - original).abs() < 1e-9, "{own} != {original}");
        }
        assert_eq!(excerpt.time_to_frame(-0.5).unwrap(), 0);

        let unanchored = axis().excerpt(&episode).unwrap();
        assert_eq!(unanchored.startdatetime(), None);
        assert_eq!(unanchored.origintime(), 1.5);

        let foreign = TimeAxis::new(1000.0, 20_000).unwrap().frames(9_000, 12_000).unwrap();
        assert!(matches!(axis().excerpt(&foreign), Err(TimeAxisError::Range(_))));
    }

    #[test]
    fn test_sub_episode_must_be_contained() {
        let episode = axis().frames(100, 200).unwrap();
        assert_eq!(episode.sub(120, 150).unwrap().range(), 120..150);
        assert!(episode.sub(90, 150).is_err());
        assert!(episode.sub(150, 201).is_err());
        assert!(episode.sub(160, 150).is_err());
    }
}
