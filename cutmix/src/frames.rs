//! Conversion between seconds and feature-matrix rows.
//!
//! Every conversion in the crate goes through [`seconds_to_frames`] so that
//! the total frame count of a composite and the row range of each of its
//! tracks are rounded the same way.

use serde::{Deserialize, Serialize};

/// Converts seconds to a frame count, rounding half away from zero.
///
/// Negative or non-finite inputs map to 0.
pub fn seconds_to_frames(seconds: f64, frame_shift: f64) -> usize {
    let frames = (seconds / frame_shift).round();
    if frames.is_finite() && frames > 0.0 {
        frames as usize
    } else {
        0
    }
}

/// Converts a frame count back to seconds.
pub fn frames_to_seconds(frames: usize, frame_shift: f64) -> f64 {
    frames as f64 * frame_shift
}

/// A contiguous range of feature rows `[start, start + num_frames)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FrameSpan {
    pub start: usize,
    pub num_frames: usize,
}

impl FrameSpan {
    pub fn new(start: usize, num_frames: usize) -> Self {
        Self { start, num_frames }
    }

    /// Builds the span covering `[start, start + duration)` seconds.
    pub fn from_seconds(start: f64, duration: f64, frame_shift: f64) -> Self {
        Self {
            start: seconds_to_frames(start, frame_shift),
            num_frames: seconds_to_frames(duration, frame_shift),
        }
    }

    /// Exclusive end row.
    pub fn end(&self) -> usize {
        self.start + self.num_frames
    }

    pub fn is_empty(&self) -> bool {
        self.num_frames == 0
    }
}
