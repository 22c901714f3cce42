use std::{fmt, path::Path, sync::Arc};

use chrono::NaiveDateTime;
use log::{debug, warn};
use serde_json::Value;
use timebase::{
    Episode, EpisodeQuery, TimeAxis, WindowSpec, duration_string, rounding::FrameQuantizer,
};

use crate::{
    config::EngineConfig,
    error::{SoundError, SoundResult},
    index::SegmentIndex,
    metadata::{MetadataStore, UserMetadata},
    reader::{Block, ReadOptions, VirtualReader, WindowedRead},
    sample::{Frames, SampleType},
    segment::{Segment, SegmentSource, wav::WavSource},
};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Time-axis attributes and user metadata of a sound.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundParams {
    pub fs: f64,
    pub origintime: f64,
    pub startdatetime: Option<NaiveDateTime>,
    pub metadata: UserMetadata,
}

impl SoundParams {
    pub fn new(fs: f64) -> Self {
        Self {
            fs,
            origintime: 0.0,
            startdatetime: None,
            metadata: UserMetadata::new(),
        }
    }

    #[must_use]
    pub fn with_origintime(mut self, origintime: f64) -> Self {
        self.origintime = origintime;
        self
    }

    #[must_use]
    pub fn with_startdatetime(mut self, startdatetime: NaiveDateTime) -> Self {
        self.startdatetime = Some(startdatetime);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// One logical sound stitched from segments and gaps on a single time axis.
///
/// The layout is fixed at construction. Reads never mutate the sound, so a
/// `LogicalSound` can be shared between threads and read concurrently.
#[derive(Debug, Clone)]
pub struct LogicalSound {
    index: SegmentIndex,
    axis: TimeAxis,
    metadata: UserMetadata,
    config: Arc<EngineConfig>,
}

impl LogicalSound {
    pub fn new(index: SegmentIndex, params: SoundParams) -> SoundResult<Self> {
        Self::with_config(index, params, Arc::new(EngineConfig::default()))
    }

    pub fn with_config(
        index: SegmentIndex,
        params: SoundParams,
        config: Arc<EngineConfig>,
    ) -> SoundResult<Self> {
        let axis = TimeAxis::new(params.fs, index.nframes())?
            .with_origintime(params.origintime)
            .with_startdatetime(params.startdatetime);

        for (i, segment) in index.segments().iter().enumerate() {
            if let Some(rate) = segment.info().samplerate {
                if (rate - params.fs).abs() > f64::EPSILON * params.fs {
                    warn!(
                        "segment {i} ({}) was recorded at {rate} Hz, the sound runs at {} Hz",
                        segment.id(),
                        params.fs
                    );
                }
            }
        }

        let sound = Self {
            index,
            axis,
            metadata: params.metadata,
            config,
        };
        debug!("built {sound} from {} segment(s)", sound.index.nsegments());
        Ok(sound)
    }

    /// Sound ending at the end of its last segment.
    pub fn from_segments(segments: Vec<Segment>, params: SoundParams) -> SoundResult<Self> {
        Self::new(SegmentIndex::new(segments)?, params)
    }

    /// Sound made of WAV files recorded back to back, in the given order.
    /// The sampling rate is taken from the files, which must agree on it as
    /// well as on channel count and sample type.
    pub fn from_wav_files<P: AsRef<Path>>(
        paths: &[P],
        origintime: f64,
        startdatetime: Option<NaiveDateTime>,
    ) -> SoundResult<Self> {
        let mut sources: Vec<Arc<dyn SegmentSource>> = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let source = WavSource::open_path(path).map_err(|failure| SoundError::Open {
                path: path.to_path_buf(),
                failure,
            })?;
            sources.push(Arc::new(source));
        }
        let first = sources
            .first()
            .ok_or_else(|| SoundError::consistency("no WAV files given"))?
            .info();
        for (i, source) in sources.iter().enumerate().skip(1) {
            let info = source.info();
            if info.samplerate != first.samplerate {
                return Err(SoundError::consistency(format!(
                    "{} is recorded at {:?} Hz, {} at {:?} Hz",
                    paths[i].as_ref().display(),
                    info.samplerate,
                    paths[0].as_ref().display(),
                    first.samplerate
                )));
            }
        }
        let fs = first
            .samplerate
            .ok_or_else(|| SoundError::consistency("WAV files carry no sampling rate"))?;

        let mut params = SoundParams::new(fs).with_origintime(origintime);
        params.startdatetime = startdatetime;
        Self::new(SegmentIndex::contiguous(sources)?, params)
    }

    /// Sound whose time axis and metadata come from `store`. The sampling
    /// rate is required; a missing origin time is 0.
    pub fn from_store(index: SegmentIndex, store: &dyn MetadataStore) -> SoundResult<Self> {
        let fs = store
            .fs()
            .ok_or_else(|| SoundError::consistency("metadata store has no sampling rate"))?;
        let params = SoundParams {
            fs,
            origintime: store.origintime().unwrap_or(0.0),
            startdatetime: store.startdatetime(),
            metadata: store.user_metadata(),
        };
        Self::new(index, params)
    }

    /// New sound with `segment` added to the layout.
    pub fn with_segment(&self, segment: Segment) -> SoundResult<Self> {
        let params = SoundParams {
            fs: self.fs(),
            origintime: self.origintime(),
            startdatetime: self.startdatetime(),
            metadata: self.metadata.clone(),
        };
        Self::with_config(
            self.index.with_segment(segment)?,
            params,
            Arc::clone(&self.config),
        )
    }

    pub fn nframes(&self) -> u64 {
        self.index.nframes()
    }

    pub fn nchannels(&self) -> usize {
        self.index.nchannels()
    }

    pub fn dtype(&self) -> SampleType {
        self.index.dtype()
    }

    pub fn fs(&self) -> f64 {
        self.axis.fs()
    }

    pub fn dt(&self) -> f64 {
        self.axis.dt()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.axis.duration()
    }

    pub fn origintime(&self) -> f64 {
        self.axis.origintime()
    }

    pub fn startdatetime(&self) -> Option<NaiveDateTime> {
        self.axis.startdatetime()
    }

    pub fn enddatetime(&self) -> Option<NaiveDateTime> {
        self.axis.end_datetime()
    }

    pub fn metadata(&self) -> &UserMetadata {
        &self.metadata
    }

    pub fn segments(&self) -> &[Segment] {
        self.index.segments()
    }

    pub fn index(&self) -> &SegmentIndex {
        &self.index
    }

    pub fn time_axis(&self) -> &TimeAxis {
        &self.axis
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_fragmented(&self) -> bool {
        self.index.is_fragmented()
    }

    pub fn episode(&self, query: &EpisodeQuery) -> SoundResult<Episode> {
        Ok(self.axis.resolve(query)?)
    }

    pub fn full_episode(&self) -> Episode {
        self.axis.full()
    }

    /// Reader over this sound. Its blocks are placed on the sound's time
    /// axis.
    pub fn reader(&self) -> VirtualReader<'_> {
        VirtualReader::new(&self.index, &self.config).with_axis(&self.axis)
    }

    pub fn read(&self, episode: &Episode, options: &ReadOptions) -> SoundResult<Frames> {
        self.reader().read(episode, options)
    }

    /// Frames of `episode` together with their own time axis, whose frame 0
    /// keeps the relative and wall-clock time it has in this sound.
    pub fn read_excerpt(&self, episode: &Episode, options: &ReadOptions) -> SoundResult<Block> {
        self.reader().read_block(episode, options)
    }

    /// Read `episode` in windows; without a window spec, in blocks of
    /// [`EngineConfig::block_seconds`].
    pub fn iter_read(
        &self,
        episode: &Episode,
        windows: Option<&WindowSpec>,
        options: &ReadOptions,
    ) -> SoundResult<WindowedRead<'_>> {
        let default = WindowSpec::new(self.config.block_frames(self.fs()));
        self.reader()
            .iter_read(episode, windows.unwrap_or(&default), options)
    }

    /// Hour-long windows over `episode` whose boundaries fall on the clock
    /// hour: the first window runs up to the next full hour.
    pub fn hour_aligned_windows(&self, episode: &Episode) -> SoundResult<WindowSpec> {
        if self.startdatetime().is_none() {
            return Err(SoundError::ParameterConflict(
                "hour alignment needs the start datetime of the sound".to_owned(),
            ));
        }
        let hour = FrameQuantizer::seconds_to_frame(SECONDS_PER_HOUR, self.fs())?;
        let hour = u64::try_from(hour)
            .map_err(|_| SoundError::range(format!("an hour is {hour} frames at {} Hz", self.fs())))?
            .max(1);
        let first = self
            .axis
            .frames_to_next_hour(episode.start())
            .ok_or_else(|| {
                SoundError::range(format!(
                    "frame {} has no representable wall-clock time",
                    episode.start()
                ))
            })?
            .min(episode.len());
        Ok(WindowSpec::new(hour).with_first_framesize(first))
    }
}

impl fmt::Display for LogicalSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nchannels = self.nchannels();
        let plural = if nchannels == 1 { "" } else { "s" };
        write!(
            f,
            "LogicalSound <{}, {} Hz, {nchannels} channel{plural}, {}>",
            duration_string(self.duration()),
            self.fs(),
            self.dtype()
        )
    }
}
