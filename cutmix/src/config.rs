use serde::{Deserialize, Serialize};

use crate::MixError;

/// Default frame shift: 10ms, the Kaldi convention.
pub const DEFAULT_FRAME_SHIFT: f64 = 0.01;

/// Decides which overlay offsets are accepted at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OverlayPolicy {
    /// The overlaid cut must start no later than the end of the reference
    /// cut: `0 <= offset <= reference.duration`.
    #[default]
    StartWithinReference,
    /// Any offset up to the given number of seconds.
    MaxOffset(f64),
    /// Any finite, non-negative offset.
    Unbounded,
}

impl OverlayPolicy {
    /// Returns the largest accepted offset for a reference of the given duration.
    pub fn limit(&self, reference_duration: f64) -> f64 {
        match *self {
            OverlayPolicy::StartWithinReference => reference_duration,
            OverlayPolicy::MaxOffset(max) => max,
            OverlayPolicy::Unbounded => f64::INFINITY,
        }
    }

    /// Checks `offset` against this policy.
    pub fn check(&self, offset: f64, reference_duration: f64) -> Result<(), MixError> {
        let limit = self.limit(reference_duration);
        if !offset.is_finite() || offset < 0.0 || offset > limit {
            return Err(MixError::OutOfBoundsOffset { offset, limit });
        }
        Ok(())
    }
}

/// Corpus-wide mixing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    /// Seconds represented by one feature matrix row.
    pub frame_shift: f64,

    /// Offset policy applied by [`Segment::overlay_with_policy`](crate::Segment::overlay_with_policy).
    pub overlay_policy: OverlayPolicy,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            frame_shift: DEFAULT_FRAME_SHIFT,
            overlay_policy: OverlayPolicy::default(),
        }
    }
}

impl MixConfig {
    pub fn with_frame_shift(mut self, frame_shift: f64) -> Self {
        self.frame_shift = frame_shift;
        self
    }

    pub fn with_overlay_policy(mut self, policy: OverlayPolicy) -> Self {
        self.overlay_policy = policy;
        self
    }

    /// Rejects a non-positive or non-finite frame shift and a negative or
    /// NaN [`OverlayPolicy::MaxOffset`].
    pub fn validate(&self) -> Result<(), MixError> {
        if !self.frame_shift.is_finite() || self.frame_shift <= 0.0 {
            return Err(MixError::InvalidFrameShift(self.frame_shift));
        }
        if let OverlayPolicy::MaxOffset(max) = self.overlay_policy {
            if max.is_nan() || max < 0.0 {
                return Err(MixError::InvalidOverlayPolicy(max));
            }
        }
        Ok(())
    }
}
