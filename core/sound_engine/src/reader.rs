use std::iter::FusedIterator;

use log::debug;
use timebase::{Episode, TimeAxis, WindowSpec, Windows};

use crate::{
    config::EngineConfig,
    error::{SoundError, SoundResult},
    index::{PlanStep, SegmentIndex},
    sample::{Frames, SampleType},
};

/// Which channels a read returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChannelSelection {
    #[default]
    All,
    /// Explicit channel indices, in output order.
    Indices(Vec<usize>),
}

impl ChannelSelection {
    /// The selected channel indices of an `nchannels` sound.
    pub fn indices(&self, nchannels: usize) -> SoundResult<Vec<usize>> {
        match self {
            Self::All => Ok((0..nchannels).collect()),
            Self::Indices(indices) if indices.is_empty() => {
                Err(SoundError::range("no channels selected"))
            }
            Self::Indices(indices) => {
                if let Some(&bad) = indices.iter().find(|&&c| c >= nchannels) {
                    return Err(SoundError::range(format!(
                        "channel {bad} does not exist in a {nchannels}-channel sound"
                    )));
                }
                Ok(indices.clone())
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub channels: ChannelSelection,
    /// Output sample type; the stored type when `None`.
    pub dtype: Option<SampleType>,
    /// Scale integer samples to audio float range.
    pub normalize: bool,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn channels(mut self, channels: Vec<usize>) -> Self {
        self.channels = ChannelSelection::Indices(channels);
        self
    }

    #[must_use]
    pub fn dtype(mut self, dtype: SampleType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }
}

/// Frames `[start, end)` of a sound, read in one piece or as one window of
/// an iterated read.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub start: u64,
    pub end: u64,
    pub frames: Frames,
    /// Where `frames` sit in time: frame 0 of this axis is frame `start` of
    /// the sound. `None` when the reader was built without a time axis.
    pub axis: Option<TimeAxis>,
}

/// Stitches segment reads and gap fills into contiguous frame buffers.
#[derive(Debug, Clone, Copy)]
pub struct VirtualReader<'a> {
    index: &'a SegmentIndex,
    config: &'a EngineConfig,
    axis: Option<&'a TimeAxis>,
}

impl<'a> VirtualReader<'a> {
    pub fn new(index: &'a SegmentIndex, config: &'a EngineConfig) -> Self {
        Self {
            index,
            config,
            axis: None,
        }
    }

    /// Place every [`Block`] on `axis`, which must span the frames of the
    /// index.
    #[must_use]
    pub fn with_axis(mut self, axis: &'a TimeAxis) -> Self {
        self.axis = Some(axis);
        self
    }

    /// The sample type `options` produce, or `Dtype` if the stored type
    /// cannot get there. See [`SampleType::can_cast_to`] for what a plain
    /// conversion allows.
    pub fn output_type(&self, options: &ReadOptions) -> SoundResult<SampleType> {
        let stored = self.index.dtype();
        if options.normalize {
            let target = options.dtype.unwrap_or(self.config.normalized_dtype);
            if stored.is_float() {
                return Err(SoundError::dtype(format!(
                    "normalization applies to integer samples, these are {stored}"
                )));
            }
            if !target.is_float() {
                return Err(SoundError::dtype(format!(
                    "normalized samples must be f32 or f64, not {target}"
                )));
            }
            return Ok(target);
        }
        match options.dtype {
            None => Ok(stored),
            Some(target) if stored.can_cast_to(target) => Ok(target),
            Some(target) => Err(SoundError::dtype(format!(
                "{stored} samples cannot be read as {target} without loss"
            ))),
        }
    }

    /// Frames of `episode`, with gaps filled with zeros.
    pub fn read(&self, episode: &Episode, options: &ReadOptions) -> SoundResult<Frames> {
        let channels = options.channels.indices(self.index.nchannels())?;
        self.output_type(options)?;
        self.read_range(episode.start(), episode.end(), &channels, options)
    }

    /// Like [`VirtualReader::read`], keeping the episode bounds and time
    /// placement with the frames.
    pub fn read_block(&self, episode: &Episode, options: &ReadOptions) -> SoundResult<Block> {
        let frames = self.read(episode, options)?;
        Ok(Block {
            start: episode.start(),
            end: episode.end(),
            frames,
            axis: self.place(episode.start(), episode.end())?,
        })
    }

    /// Read `episode` one window at a time.
    pub fn iter_read(
        &self,
        episode: &Episode,
        windows: &WindowSpec,
        options: &ReadOptions,
    ) -> SoundResult<WindowedRead<'a>> {
        let channels = options.channels.indices(self.index.nchannels())?;
        self.output_type(options)?;
        let windows = windows.plan(self.index.nframes(), episode.start(), episode.end())?;
        Ok(WindowedRead {
            reader: *self,
            windows,
            channels,
            options: options.clone(),
            done: false,
        })
    }

    fn place(&self, start: u64, end: u64) -> SoundResult<Option<TimeAxis>> {
        let Some(axis) = self.axis else {
            return Ok(None);
        };
        let episode = axis.frames(start, end)?;
        Ok(Some(axis.excerpt(&episode)?))
    }

    fn read_range(
        &self,
        start: u64,
        end: u64,
        channels: &[usize],
        options: &ReadOptions,
    ) -> SoundResult<Frames> {
        let steps = self.index.plan(start, end)?;
        let nframes = to_usize(end - start)?;
        let mut frames = Frames::with_capacity(self.index.dtype(), nframes, self.index.nchannels());

        for step in steps {
            match step {
                PlanStep::ReadSegment {
                    segment,
                    local_start,
                    local_end,
                } => {
                    let source = &self.index.segments()[segment];
                    let read = source.read(local_start, local_end).map_err(|failure| {
                        SoundError::SegmentRead {
                            index: segment,
                            id: source.id(),
                            failure,
                        }
                    })?;
                    frames.append(&read)?;
                }
                PlanStep::FillGap { length } => frames.push_zeros(to_usize(length)?),
            }
        }

        if !channels.iter().copied().eq(0..self.index.nchannels()) {
            frames = frames.select_channels(channels)?;
        }
        if options.normalize {
            let target = options.dtype.unwrap_or(self.config.normalized_dtype);
            return frames.normalized(target);
        }
        match options.dtype {
            Some(target) => frames.cast(target),
            None => Ok(frames),
        }
    }
}

fn to_usize(nframes: u64) -> SoundResult<usize> {
    usize::try_from(nframes)
        .map_err(|_| SoundError::range(format!("{nframes} frames do not fit in memory")))
}

/// Lazy windowed read. Each call to `next` reads exactly one window; after
/// the first error the iterator is exhausted.
#[derive(Debug, Clone)]
pub struct WindowedRead<'a> {
    reader: VirtualReader<'a>,
    windows: Windows,
    channels: Vec<usize>,
    options: ReadOptions,
    done: bool,
}

impl Iterator for WindowedRead<'_> {
    type Item = SoundResult<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some((start, end)) = self.windows.next() else {
            self.done = true;
            return None;
        };
        let block = self
            .reader
            .read_range(start, end, &self.channels, &self.options)
            .and_then(|frames| {
                Ok(Block {
                    start,
                    end,
                    frames,
                    axis: self.reader.place(start, end)?,
                })
            });
        match block {
            Ok(block) => Some(Ok(block)),
            Err(err) => {
                debug!("windowed read stopped at [{start}, {end}): {err}");
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for WindowedRead<'_> {}
