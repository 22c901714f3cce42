pub mod array;
pub mod segment_id;
pub mod wav;

use std::{fmt, sync::Arc};

use log::trace;

use crate::{
    error::{ReaderError, SegmentFailure},
    sample::{Frames, SampleType},
    segment::segment_id::SegmentId,
};

/// Shape and encoding of a segment source, fixed for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceInfo {
    pub nframes: u64,
    pub nchannels: usize,
    pub dtype: SampleType,
    /// Native sampling rate, for sources that record one.
    pub samplerate: Option<f64>,
}

/// A readable store of frames: an audio file, an array store, ...
///
/// Sources are shared between sounds and readers, so every read acquires its
/// own [`SegmentHandle`] through [`SegmentSource::open`].
pub trait SegmentSource: Send + Sync + fmt::Debug {
    fn info(&self) -> SourceInfo;

    /// Acquire a handle positioned at frame 0. The handle is released when
    /// dropped.
    fn open(&self) -> Result<Box<dyn SegmentHandle + '_>, ReaderError>;
}

/// An open, positioned reader over one source.
pub trait SegmentHandle {
    fn seek(&mut self, frame: u64) -> Result<(), ReaderError>;

    /// Read up to `nframes` frames from the current position. Returns fewer
    /// only at the end of the stream, never more.
    fn read_frames(&mut self, nframes: u64) -> Result<Frames, ReaderError>;
}

/// Holds a handle for the duration of one read and logs its release on
/// every exit path.
struct ScopedHandle<'a> {
    segment: SegmentId,
    inner: Box<dyn SegmentHandle + 'a>,
}

impl<'a> ScopedHandle<'a> {
    fn open(segment: SegmentId, source: &'a dyn SegmentSource) -> Result<Self, ReaderError> {
        let inner = source.open()?;
        trace!("opened segment {segment}");
        Ok(Self { segment, inner })
    }
}

impl Drop for ScopedHandle<'_> {
    fn drop(&mut self) {
        trace!("released segment {}", self.segment);
    }
}

/// A source placed at an absolute frame offset of a logical sound.
#[derive(Debug, Clone)]
pub struct Segment {
    id: SegmentId,
    offset: u64,
    info: SourceInfo,
    source: Arc<dyn SegmentSource>,
}

impl Segment {
    pub fn new(offset: u64, source: Arc<dyn SegmentSource>) -> Self {
        Self {
            id: SegmentId::new(),
            offset,
            info: source.info(),
            source,
        }
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> u64 {
        self.info.nframes
    }

    pub fn is_empty(&self) -> bool {
        self.info.nframes == 0
    }

    /// First frame after this segment. Saturates at `u64::MAX`; a
    /// [`crate::SegmentIndex`] never holds a segment whose end overflows.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.info.nframes)
    }

    /// First frame after this segment, `None` if it does not fit in `u64`.
    pub fn checked_end(&self) -> Option<u64> {
        self.offset.checked_add(self.info.nframes)
    }

    pub fn info(&self) -> SourceInfo {
        self.info
    }

    pub fn source(&self) -> &Arc<dyn SegmentSource> {
        &self.source
    }

    /// Read local frames `[start, end)`, which must lie within the segment.
    /// Anything other than exactly `end - start` frames of the segment's
    /// shape and type is a failure.
    pub(crate) fn read(&self, start: u64, end: u64) -> Result<Frames, SegmentFailure> {
        let requested = end - start;
        let mut handle = ScopedHandle::open(self.id, self.source.as_ref())?;
        handle.inner.seek(start)?;
        let frames = handle.inner.read_frames(requested)?;

        if frames.dtype() != self.info.dtype || frames.nchannels() != self.info.nchannels {
            return Err(ReaderError::corrupt(format!(
                "expected {}-channel {} frames, got {}-channel {} frames",
                self.info.nchannels,
                self.info.dtype,
                frames.nchannels(),
                frames.dtype()
            ))
            .into());
        }
        let received = frames.nframes() as u64;
        if received != requested {
            return Err(SegmentFailure::ShortRead {
                requested,
                received,
            });
        }
        Ok(frames)
    }
}


#[cfg(test)]
mod segment_tests {
    use std::sync::atomic::Ordering;

    use super::{test_sources::FlakySource, *};
    use crate::segment::array::ArraySource;

    fn ramp_source(nframes: i16) -> Arc<dyn SegmentSource> {
        let frames = Frames::from_samples(1, (0..nframes).collect()).unwrap();
        Arc::new(ArraySource::new(frames))
    }

    #[test]
    fn test_segment_geometry() {
        let segment = Segment::new(600, ramp_source(400));
        assert_eq!(segment.offset(), 600);
        assert_eq!(segment.len(), 400);
        assert_eq!(segment.end(), 1000);
        assert_eq!(segment.info().dtype, SampleType::I16);
    }

    #[test]
    fn test_segment_ids_are_unique() {
        let source = ramp_source(10);
        let a = Segment::new(0, Arc::clone(&source));
        let b = Segment::new(0, source);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_read_local_range() {
        let segment = Segment::new(600, ramp_source(400));
        let frames = segment.read(10, 14).unwrap();
        assert_eq!(frames.samples::<i16>().unwrap(), &[10, 11, 12, 13]);
    }

    #[test]
    fn test_short_read_is_reported_and_handle_released() {
        let mut flaky = FlakySource::wrap(ramp_source(100));
        flaky.truncate_to = Some(5);
        let handles = Arc::clone(&flaky.open_handles);
        let segment = Segment::new(0, Arc::new(flaky));

        let result = segment.read(0, 20);
        assert!(matches!(
            result,
            Err(SegmentFailure::ShortRead {
                requested: 20,
                received: 5
            })
        ));
        assert_eq!(handles.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handle_released_after_success() {
        let flaky = FlakySource::wrap(ramp_source(100));
        let handles = Arc::clone(&flaky.open_handles);
        let segment = Segment::new(0, Arc::new(flaky));

        segment.read(0, 100).unwrap();
        segment.read(50, 60).unwrap();
        assert_eq!(handles.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_open_failure_is_reader_error() {
        let mut flaky = FlakySource::wrap(ramp_source(100));
        flaky.fail_open = true;
        let segment = Segment::new(0, Arc::new(flaky));
        assert!(matches!(
            segment.read(0, 10),
            Err(SegmentFailure::Reader(ReaderError::Unreadable(_)))
        ));
    }
}
