use crate::{
    error::ReaderError,
    sample::Frames,
    segment::{SegmentHandle, SegmentSource, SourceInfo},
};

/// Random-access array store held in memory.
///
/// Fixed length, dtype and channel count; any frame range can be sliced
/// directly, and reads never return more frames than requested.
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySource {
    frames: Frames,
}

impl ArraySource {
    pub fn new(frames: Frames) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &Frames {
        &self.frames
    }

    /// Frames `[start, end)`, truncated at the end of the array.
    pub fn slice(&self, start: u64, end: u64) -> Frames {
        self.frames.slice(to_index(start), to_index(end))
    }
}

fn to_index(frame: u64) -> usize {
    usize::try_from(frame).unwrap_or(usize::MAX)
}

struct ArrayHandle<'a> {
    source: &'a ArraySource,
    position: u64,
}

impl SegmentHandle for ArrayHandle<'_> {
    fn seek(&mut self, frame: u64) -> Result<(), ReaderError> {
        self.position = frame.min(self.source.frames.nframes() as u64);
        Ok(())
    }

    fn read_frames(&mut self, nframes: u64) -> Result<Frames, ReaderError> {
        let end = self.position.saturating_add(nframes);
        let frames = self.source.slice(self.position, end);
        self.position += frames.nframes() as u64;
        Ok(frames)
    }
}

impl SegmentSource for ArraySource {
    fn info(&self) -> SourceInfo {
        SourceInfo {
            nframes: self.frames.nframes() as u64,
            nchannels: self.frames.nchannels(),
            dtype: self.frames.dtype(),
            samplerate: None,
        }
    }

    fn open(&self) -> Result<Box<dyn SegmentHandle + '_>, ReaderError> {
        Ok(Box::new(ArrayHandle {
            source: self,
            position: 0,
        }))
    }
}
