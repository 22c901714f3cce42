use thiserror::Error;

pub type TimeAxisResult<T> = Result<T, TimeAxisError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeAxisError {
    /// More than one start or end specifier, or a specifier that cannot be
    /// interpreted on this axis.
    #[error("parameter conflict: {0}")]
    ParameterConflict(String),

    /// Out-of-bounds, inverted or otherwise invalid frame range.
    #[error("range error: {0}")]
    Range(String),
}

impl TimeAxisError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::ParameterConflict(message.into())
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::Range(message.into())
    }
}
