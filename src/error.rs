use thiserror::Error;

/// Errors surfaced by the pipeline and its stages.
///
/// Stage functions return these directly; `PipelineController` is the
/// single place that turns one into a state transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// Background capture could not complete (source ran dry or failed
    /// mid-burst). Retryable by the caller.
    #[error("background capture failed: {0}")]
    Capture(String),

    /// The frame source failed while running: device disconnect, decode
    /// failure, or a stalled read. Fatal to the current session.
    #[error("frame source error: {0}")]
    Device(String),

    /// Internal consistency failure: a frame or mask did not match the
    /// session dimensions. Should not occur with a correct setup.
    #[error("dimension mismatch: expected {expected_width}x{expected_height}, got {actual_width}x{actual_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// The background model was consulted before any capture succeeded.
    #[error("background model not initialized")]
    NotInitialized,

    /// A configured color range has a lower bound above its upper bound.
    #[error("invalid color range: lower {lower:?} exceeds upper {upper:?} on some channel")]
    InvalidColorRange {
        lower: (u8, u8, u8),
        upper: (u8, u8, u8),
    },

    /// A kernel size, warmup count, or frame rate setting is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The output sink rejected a frame.
    #[error("output sink error: {0}")]
    Sink(String),
}

impl PipelineError {
    pub(crate) fn dimension_mismatch(expected: (u32, u32), actual: (u32, u32)) -> Self {
        PipelineError::DimensionMismatch {
            expected_width: expected.0,
            expected_height: expected.1,
            actual_width: actual.0,
            actual_height: actual.1,
        }
    }
}
