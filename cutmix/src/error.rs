use thiserror::Error;

/// Errors returned by a [`FeatureStore`](crate::FeatureStore).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeatureLoadError {
    #[error("feature matrix not found: {0}")]
    NotFound(String),

    #[error("frame span [{start}, {start}+{num_frames}) exceeds {available} stored frames of {key}")]
    SpanOutOfRange {
        key: String,
        start: usize,
        num_frames: usize,
        available: usize,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors returned by cut composition and query operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MixError {
    #[error("offset {offset}s is out of bounds (limit {limit}s)")]
    OutOfBoundsOffset { offset: f64, limit: f64 },

    #[error("unknown segment id: {0}")]
    UnknownSegmentId(String),

    #[error("composite {composite} references unresolved cut {cut_id}")]
    UnresolvedReference { composite: String, cut_id: String },

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("feature load failed: {0}")]
    FeatureLoad(#[from] FeatureLoadError),

    #[error("invalid duration: {0}s")]
    InvalidDuration(f64),

    #[error("label span {id} [{start}s, +{duration}s] does not fit a segment of {segment_duration}s")]
    InvalidLabelSpan {
        id: String,
        start: f64,
        duration: f64,
        segment_duration: f64,
    },

    #[error("segment {id} nests more than {limit} composites deep")]
    NestingTooDeep { id: String, limit: usize },

    #[error("composite {0} has no tracks")]
    EmptyComposite(String),

    #[error("invalid frame shift: {0}s")]
    InvalidFrameShift(f64),

    #[error("invalid overlay policy: max offset {0}s")]
    InvalidOverlayPolicy(f64),

    #[error("composite {composite} recorded {recorded}s for cut {cut_id}, which resolves to {resolved}s")]
    TrackDurationMismatch {
        composite: String,
        cut_id: String,
        recorded: f64,
        resolved: f64,
    },
}
