use std::{io, path::PathBuf};

use thiserror::Error;
use timebase::TimeAxisError;

use crate::segment::segment_id::SegmentId;

pub type SoundResult<T> = Result<T, SoundError>;

#[derive(Debug, Error)]
pub enum SoundError {
    /// Ambiguous start/end specification.
    #[error("parameter conflict: {0}")]
    ParameterConflict(String),

    /// Out-of-bounds, inverted or empty range.
    #[error("range error: {0}")]
    Range(String),

    /// Overlapping, misordered or mismatched segments.
    #[error("inconsistent segments: {0}")]
    Consistency(String),

    /// A segment could not deliver the frames the plan asked for.
    #[error("segment {index} ({id}) failed: {failure}")]
    SegmentRead {
        index: usize,
        id: SegmentId,
        #[source]
        failure: SegmentFailure,
    },

    /// A segment store could not be opened while building a sound.
    #[error("cannot open {}: {failure}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        failure: ReaderError,
    },

    /// Requested sample type is not reachable from the stored one.
    #[error("dtype error: {0}")]
    Dtype(String),

    #[error("failed to write WAV segment: {0}")]
    Write(#[from] hound::Error),
}

impl SoundError {
    pub fn range(message: impl Into<String>) -> Self {
        Self::Range(message.into())
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency(message.into())
    }

    pub fn dtype(message: impl Into<String>) -> Self {
        Self::Dtype(message.into())
    }
}

impl From<TimeAxisError> for SoundError {
    fn from(value: TimeAxisError) -> Self {
        match value {
            TimeAxisError::ParameterConflict(message) => Self::ParameterConflict(message),
            TimeAxisError::Range(message) => Self::Range(message),
        }
    }
}

#[derive(Debug, Error)]
pub enum SegmentFailure {
    #[error("returned {received} of {requested} frames")]
    ShortRead { requested: u64, received: u64 },

    #[error(transparent)]
    Reader(#[from] ReaderError),
}

/// Failure reported by an external segment reader.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The store could not be opened or read at all.
    #[error("unreadable: {0}")]
    Unreadable(#[from] io::Error),

    /// The store was readable but its content is malformed or truncated.
    #[error("corrupt or truncated data: {0}")]
    Corrupt(String),
}

impl ReaderError {
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt(message.into())
    }
}

impl From<hound::Error> for ReaderError {
    fn from(value: hound::Error) -> Self {
        match value {
            hound::Error::IoError(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                Self::Corrupt(err.to_string())
            }
            hound::Error::IoError(err) => Self::Unreadable(err),
            hound::Error::Unsupported => Self::Unreadable(io::Error::new(
                io::ErrorKind::Unsupported,
                "unsupported WAV encoding",
            )),
            other => Self::Corrupt(other.to_string()),
        }
    }
}
