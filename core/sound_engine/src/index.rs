use log::{debug, trace};

use std::sync::Arc;

use crate::{
    error::{SoundError, SoundResult},
    sample::SampleType,
    segment::{Segment, SegmentSource},
};

/// A frame interval not covered by any segment. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub offset: u64,
    pub length: u64,
}

impl Gap {
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// Where an absolute frame falls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Inside segment `index`, at `local` frames from its start.
    Segment { index: usize, local: u64 },
    /// In the gap that ends where segment `index` begins.
    GapBefore { index: usize },
    /// In the gap after the last segment.
    GapAfterLast,
}

/// One step of a read plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStep {
    ReadSegment {
        segment: usize,
        local_start: u64,
        local_end: u64,
    },
    FillGap { length: u64 },
}

impl PlanStep {
    pub fn len(&self) -> u64 {
        match *self {
            Self::ReadSegment {
                local_start,
                local_end,
                ..
            } => local_end - local_start,
            Self::FillGap { length } => length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered, non-overlapping segments laid out over `[0, nframes)`.
///
/// Frames not covered by a segment are gaps and read as zeros. An index is
/// immutable once built; [`SegmentIndex::with_segment`] returns a new one.
#[derive(Debug, Clone)]
pub struct SegmentIndex {
    segments: Vec<Segment>,
    nframes: u64,
    nchannels: usize,
    dtype: SampleType,
}

fn end_of(i: usize, segment: &Segment) -> SoundResult<u64> {
    segment.checked_end().ok_or_else(|| {
        SoundError::consistency(format!(
            "segment {i} at offset {} with {} frames ends past the last addressable frame",
            segment.offset(),
            segment.len()
        ))
    })
}

impl SegmentIndex {
    /// Index ending at the end of the last segment.
    pub fn new(segments: Vec<Segment>) -> SoundResult<Self> {
        let nframes = match segments.last() {
            Some(last) => end_of(segments.len() - 1, last)?,
            None => 0,
        };
        Self::with_nframes(segments, nframes)
    }

    /// Index of `sources` laid end to end: each segment starts where the
    /// previous one ends, so the result has no gaps.
    pub fn contiguous(sources: Vec<Arc<dyn SegmentSource>>) -> SoundResult<Self> {
        let mut segments = Vec::with_capacity(sources.len());
        let mut offset = 0;
        for (i, source) in sources.into_iter().enumerate() {
            let segment = Segment::new(offset, source);
            offset = end_of(i, &segment)?;
            segments.push(segment);
        }
        Self::new(segments)
    }

    /// Index of `nframes` frames; anything after the last segment is a gap.
    pub fn with_nframes(segments: Vec<Segment>, nframes: u64) -> SoundResult<Self> {
        let first = segments
            .first()
            .ok_or_else(|| SoundError::consistency("a sound needs at least one segment"))?;
        let nchannels = first.info().nchannels;
        let dtype = first.info().dtype;

        for (i, segment) in segments.iter().enumerate() {
            end_of(i, segment)?;
            if segment.is_empty() {
                return Err(SoundError::consistency(format!(
                    "segment {i} at offset {} has no frames",
                    segment.offset()
                )));
            }
            let info = segment.info();
            if info.nchannels != nchannels || info.dtype != dtype {
                return Err(SoundError::consistency(format!(
                    "segment {i} has {} channel(s) of {}, expected {nchannels} channel(s) of {dtype}",
                    info.nchannels, info.dtype
                )));
            }
        }
        for (i, pair) in segments.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.offset() <= prev.offset() {
                return Err(SoundError::consistency(format!(
                    "segment {} at offset {} does not come after offset {}",
                    i + 1,
                    next.offset(),
                    prev.offset()
                )));
            }
            if prev.end() > next.offset() {
                return Err(SoundError::consistency(format!(
                    "segment {i} ends at {} but segment {} starts at {}",
                    prev.end(),
                    i + 1,
                    next.offset()
                )));
            }
        }
        let last_end = segments.last().map_or(0, Segment::end);
        if nframes < last_end {
            return Err(SoundError::consistency(format!(
                "{nframes} frames cannot hold segments ending at {last_end}"
            )));
        }

        let index = Self {
            segments,
            nframes,
            nchannels,
            dtype,
        };
        debug!(
            "indexed {} segment(s) over {nframes} frames, {} gap(s)",
            index.segments.len(),
            index.gaps().len()
        );
        Ok(index)
    }

    /// New index with `segment` added in offset order.
    pub fn with_segment(&self, segment: Segment) -> SoundResult<Self> {
        let nframes = self.nframes.max(end_of(self.segments.len(), &segment)?);
        let mut segments = self.segments.clone();
        segments.push(segment);
        segments.sort_by_key(Segment::offset);
        Self::with_nframes(segments, nframes)
    }

    pub fn nframes(&self) -> u64 {
        self.nframes
    }

    pub fn nchannels(&self) -> usize {
        self.nchannels
    }

    pub fn dtype(&self) -> SampleType {
        self.dtype
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn nsegments(&self) -> usize {
        self.segments.len()
    }

    /// `(offset, end)` of each segment.
    pub fn segment_bounds(&self) -> Vec<(u64, u64)> {
        self.segments.iter().map(|s| (s.offset(), s.end())).collect()
    }

    pub fn gaps(&self) -> Vec<Gap> {
        let mut gaps = Vec::new();
        let mut covered = 0;
        for segment in &self.segments {
            if segment.offset() > covered {
                gaps.push(Gap {
                    offset: covered,
                    length: segment.offset() - covered,
                });
            }
            covered = segment.end();
        }
        if self.nframes > covered {
            gaps.push(Gap {
                offset: covered,
                length: self.nframes - covered,
            });
        }
        gaps
    }

    pub fn is_fragmented(&self) -> bool {
        !self.gaps().is_empty()
    }

    pub fn locate(&self, frame: u64) -> SoundResult<Location> {
        if frame >= self.nframes {
            return Err(SoundError::range(format!(
                "frame {frame} is beyond the last frame {}",
                self.nframes
            )));
        }
        let after = self.segments.partition_point(|s| s.offset() <= frame);
        let Some(index) = after.checked_sub(1) else {
            return Ok(Location::GapBefore { index: 0 });
        };
        let segment = &self.segments[index];
        if frame < segment.end() {
            Ok(Location::Segment {
                index,
                local: frame - segment.offset(),
            })
        } else if after < self.segments.len() {
            Ok(Location::GapBefore { index: after })
        } else {
            Ok(Location::GapAfterLast)
        }
    }

    /// Steps covering `[start, end)` exactly once, in increasing frame order.
    pub fn plan(&self, start: u64, end: u64) -> SoundResult<Vec<PlanStep>> {
        if start > end || end > self.nframes {
            return Err(SoundError::range(format!(
                "[{start}, {end}) is not within [0, {})",
                self.nframes
            )));
        }
        let mut steps = Vec::new();
        let mut position = start;
        let mut next = self.segments.partition_point(|s| s.end() <= start);

        while position < end {
            let step = match self.segments.get(next) {
                Some(segment) if segment.offset() <= position => {
                    let stop = segment.end().min(end);
                    let step = PlanStep::ReadSegment {
                        segment: next,
                        local_start: position - segment.offset(),
                        local_end: stop - segment.offset(),
                    };
                    next += 1;
                    step
                }
                Some(segment) => PlanStep::FillGap {
                    length: segment.offset().min(end) - position,
                },
                None => PlanStep::FillGap {
                    length: end - position,
                },
            };
            trace!("plan step at frame {position}: {step:?}");
            position += step.len();
            steps.push(step);
        }
        debug!("planned [{start}, {end}) in {} step(s)", steps.len());
        Ok(steps)
    }
}

#[cfg(test)]
mod segment_index_tests {
    use std::sync::Arc;

    use super::*;
    use crate::{sample::Frames, segment::array::ArraySource};

    fn segment(offset: u64, nframes: usize) -> Segment {
        segment_of(offset, Frames::zeros(SampleType::I16, nframes, 2))
    }

    fn segment_of(offset: u64, frames: Frames) -> Segment {
        Segment::new(offset, Arc::new(ArraySource::new(frames)))
    }

    fn gapped() -> SegmentIndex {
        SegmentIndex::new(vec![segment(0, 500), segment(600, 400)]).unwrap()
    }

    #[test]
    fn test_plan_across_gap() {
        let steps = gapped().plan(400, 700).unwrap();
        assert_eq!(
            steps,
            vec![
                PlanStep::ReadSegment {
                    segment: 0,
                    local_start: 400,
                    local_end: 500
                },
                PlanStep::FillGap { length: 100 },
                PlanStep::ReadSegment {
                    segment: 1,
                    local_start: 0,
                    local_end: 100
                },
            ]
        );
    }

    #[test]
    fn test_plan_tiles_every_range() {
        let segments = vec![segment(100, 50), segment(150, 10), segment(300, 20)];
        let index = SegmentIndex::with_nframes(segments, 400).unwrap();
        for start in 0..=400 {
            for end in start..=400 {
                let steps = index.plan(start, end).unwrap();
                let mut position = start;
                for (i, step) in steps.iter().enumerate() {
                    assert!(!step.is_empty(), "[{start}, {end}) step {i} is empty");
                    if let PlanStep::ReadSegment {
                        segment,
                        local_start,
                        ..
                    } = *step
                    {
                        assert_eq!(
                            index.segments()[segment].offset() + local_start,
                            position,
                            "[{start}, {end}) step {i} does not start where the previous ended"
                        );
                    }
                    position += step.len();
                }
                assert_eq!(position, end, "[{start}, {end}) is not covered exactly");
                assert!(
                    steps.windows(2).all(|pair| !matches!(
                        pair,
                        [PlanStep::FillGap { .. }, PlanStep::FillGap { .. }]
                    )),
                    "[{start}, {end}) has adjacent gap fills"
                );
            }
        }
        // leading and trailing gaps are one step each
        let steps = index.plan(0, 400).unwrap();
        assert_eq!(steps.first(), Some(&PlanStep::FillGap { length: 100 }));
        assert_eq!(steps.last(), Some(&PlanStep::FillGap { length: 80 }));
        assert_eq!(steps.len(), 6);
    }

    #[test]
    fn test_plan_rejects_out_of_range() {
        let index = gapped();
        assert!(matches!(index.plan(0, 1001), Err(SoundError::Range(_))));
        assert!(matches!(index.plan(10, 5), Err(SoundError::Range(_))));
    }

    #[test]
    fn test_locate() {
        let segments = vec![segment(100, 50), segment(300, 20)];
        let index = SegmentIndex::with_nframes(segments, 400).unwrap();
        assert_eq!(index.locate(0).unwrap(), Location::GapBefore { index: 0 });
        assert_eq!(
            index.locate(149).unwrap(),
            Location::Segment {
                index: 0,
                local: 49
            }
        );
        assert_eq!(index.locate(150).unwrap(), Location::GapBefore { index: 1 });
        assert_eq!(
            index.locate(300).unwrap(),
            Location::Segment { index: 1, local: 0 }
        );
        assert_eq!(index.locate(399).unwrap(), Location::GapAfterLast);
        assert!(matches!(index.locate(400), Err(SoundError::Range(_))));
    }

    #[test]
    fn test_gaps_and_fragmentation() {
        let index = gapped();
        assert_eq!(
            index.gaps(),
            vec![Gap {
                offset: 500,
                length: 100
            }]
        );
        assert!(index.is_fragmented());
        assert_eq!(index.segment_bounds(), vec![(0, 500), (600, 1000)]);

        let chunked = SegmentIndex::new(vec![segment(0, 10), segment(10, 10)]).unwrap();
        assert!(!chunked.is_fragmented());
        assert_eq!(chunked.nframes(), 20);
    }

    #[test]
    fn test_nframes_is_segments_plus_gaps() {
        let index = SegmentIndex::with_nframes(vec![segment(7, 3), segment(20, 5)], 40).unwrap();
        let covered: u64 = index.segments().iter().map(Segment::len).sum();
        let gaps: u64 = index.gaps().iter().map(|g| g.length).sum();
        assert_eq!(covered + gaps, index.nframes());
    }

    #[test]
    fn test_rejects_inconsistent_layouts() {
        let overlapping = SegmentIndex::new(vec![segment(0, 100), segment(50, 100)]);
        assert!(matches!(overlapping, Err(SoundError::Consistency(_))));

        let misordered = SegmentIndex::new(vec![segment(200, 10), segment(0, 10)]);
        assert!(matches!(misordered, Err(SoundError::Consistency(_))));

        assert!(matches!(
            SegmentIndex::new(Vec::new()),
            Err(SoundError::Consistency(_))
        ));
        assert!(matches!(
            SegmentIndex::new(vec![segment(0, 0)]),
            Err(SoundError::Consistency(_))
        ));

        let mono = segment_of(100, Frames::zeros(SampleType::I16, 10, 1));
        assert!(matches!(
            SegmentIndex::new(vec![segment(0, 10), mono]),
            Err(SoundError::Consistency(_))
        ));

        let floats = segment_of(100, Frames::zeros(SampleType::F32, 10, 2));
        assert!(matches!(
            SegmentIndex::new(vec![segment(0, 10), floats]),
            Err(SoundError::Consistency(_))
        ));

        assert!(matches!(
            SegmentIndex::with_nframes(vec![segment(0, 10)], 5),
            Err(SoundError::Consistency(_))
        ));
    }

    #[test]
    fn test_rejects_segment_ending_past_u64() {
        let tail = || segment(u64::MAX - 5, 10);
        assert!(matches!(
            SegmentIndex::new(vec![tail()]),
            Err(SoundError::Consistency(_))
        ));
        assert!(matches!(
            SegmentIndex::with_nframes(vec![segment(0, 10), tail()], u64::MAX),
            Err(SoundError::Consistency(_))
        ));
        assert!(matches!(
            gapped().with_segment(tail()),
            Err(SoundError::Consistency(_))
        ));
    }

    #[test]
    fn test_contiguous_places_sources_end_to_end() {
        let sources: Vec<Arc<dyn SegmentSource>> = [30, 5, 12]
            .into_iter()
            .map(|n| {
                Arc::new(ArraySource::new(Frames::zeros(SampleType::I16, n, 2)))
                    as Arc<dyn SegmentSource>
            })
            .collect();
        let index = SegmentIndex::contiguous(sources).unwrap();
        assert_eq!(index.segment_bounds(), vec![(0, 30), (30, 35), (35, 47)]);
        assert_eq!(index.nframes(), 47);
        assert!(!index.is_fragmented());

        assert!(matches!(
            SegmentIndex::contiguous(Vec::new()),
            Err(SoundError::Consistency(_))
        ));
    }

    #[test]
    fn test_with_segment_keeps_order() {
        let index = SegmentIndex::new(vec![segment(600, 400)]).unwrap();
        let index = index.with_segment(segment(0, 500)).unwrap();
        assert_eq!(index.segment_bounds(), vec![(0, 500), (600, 1000)]);

        assert!(index.with_segment(segment(450, 100)).is_err());
        let longer = index.with_segment(segment(1200, 10)).unwrap();
        assert_eq!(longer.nframes(), 1210);
    }
}
