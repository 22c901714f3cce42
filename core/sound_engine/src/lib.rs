//! Segmented sound engine: many stored segments, placed at frame offsets
//! and separated by gaps, read as one continuous multichannel sound.
//!
//! Gaps read as zeros. Reads are planned with [`SegmentIndex::plan`] and
//! executed by a [`VirtualReader`], either at once or window by window.

pub mod config;
pub mod constants;
pub mod error;
pub mod index;
pub mod metadata;
pub mod reader;
pub mod sample;
pub mod segment;
pub mod sound;
pub mod stats;

pub use config::EngineConfig;
pub use error::{ReaderError, SegmentFailure, SoundError, SoundResult};
pub use index::{Gap, Location, PlanStep, SegmentIndex};
pub use metadata::{MemoryMetadataStore, MetadataStore, UserMetadata};
pub use reader::{Block, ChannelSelection, ReadOptions, VirtualReader, WindowedRead};
pub use sample::{Frames, Sample, SampleData, SampleType};
pub use segment::{
    Segment, SegmentHandle, SegmentSource, SourceInfo, array::ArraySource, segment_id::SegmentId,
    wav::WavSource,
};
pub use sound::{LogicalSound, SoundParams};
pub use timebase::{Episode, EpisodeQuery, FramePoint, TimeAxis, WindowSpec};
