//! Time-aligned labels (transcript segments, speaker turns) attached to a cut.

use serde::{Deserialize, Serialize};

/// An immutable label covering `[start, start + duration)` seconds of its
/// owning segment.
///
/// Shifting or clipping always derives a new span; the payload fields are
/// carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSpan {
    pub id: String,
    pub recording_id: String,
    pub start: f64,
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl LabelSpan {
    pub fn new(
        id: impl Into<String>,
        recording_id: impl Into<String>,
        start: f64,
        duration: f64,
    ) -> Self {
        Self {
            id: id.into(),
            recording_id: recording_id.into(),
            start,
            duration,
            channel: None,
            text: None,
            speaker: None,
            language: None,
        }
    }

    pub fn with_channel(mut self, channel: u32) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Returns a copy moved later in time by `offset` seconds.
    pub fn shift(&self, offset: f64) -> Self {
        Self {
            start: self.start + offset,
            ..self.clone()
        }
    }

    /// Intersects the span with `[window_start, window_start + window_duration)`
    /// and re-expresses it relative to the window start.
    ///
    /// Returns `None` when the overlap has no positive length.
    pub fn clip(&self, window_start: f64, window_duration: f64) -> Option<Self> {
        let window_end = window_start + window_duration;
        let start = self.start.max(window_start);
        let end = self.end().min(window_end);
        if end <= start {
            return None;
        }
        Some(Self {
            start: start - window_start,
            duration: end - start,
            ..self.clone()
        })
    }

    /// Whether the span lies inside a segment of `segment_duration` seconds.
    pub(crate) fn fits(&self, segment_duration: f64) -> bool {
        const EPS: f64 = 1e-9;
        self.start.is_finite()
            && self.duration.is_finite()
            && self.start >= 0.0
            && self.duration > 0.0
            && self.end() <= segment_duration + EPS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_keeps_payload() {
        let span = LabelSpan::new("sup-1", "rec", 0.5, 6.0)
            .with_text("hello")
            .with_speaker("spk-a");
        let shifted = span.shift(10.0);
        assert_eq!(shifted.start, 10.5);
        assert_eq!(shifted.duration, 6.0);
        assert_eq!(shifted.text.as_deref(), Some("hello"));
        assert_eq!(shifted.speaker.as_deref(), Some("spk-a"));
        // The original is untouched.
        assert_eq!(span.start, 0.5);
    }

    #[test]
    fn clip_inside_partial_and_outside() {
        let span = LabelSpan::new("s", "rec", 2.0, 4.0); // [2, 6)

        let inside = span.clip(1.0, 8.0).unwrap();
        assert_eq!((inside.start, inside.duration), (1.0, 4.0));

        let head = span.clip(4.0, 5.0).unwrap();
        assert_eq!((head.start, head.duration), (0.0, 2.0));

        let tail = span.clip(0.0, 3.0).unwrap();
        assert_eq!((tail.start, tail.duration), (2.0, 1.0));

        assert!(span.clip(6.0, 1.0).is_none());
        assert!(span.clip(0.0, 2.0).is_none());
    }

    #[test]
    fn fits_segment() {
        assert!(LabelSpan::new("s", "r", 7.0, 3.0).fits(10.0));
        assert!(!LabelSpan::new("s", "r", 7.0, 3.5).fits(10.0));
        assert!(!LabelSpan::new("s", "r", -0.1, 1.0).fits(10.0));
        assert!(!LabelSpan::new("s", "r", 1.0, 0.0).fits(10.0));
    }

    #[test]
    fn serde_skips_empty_payload() {
        let span = LabelSpan::new("sup-1", "rec", 0.5, 6.0);
        let json = serde_json::to_string(&span).unwrap();
        assert!(!json.contains("text"));
        let back: LabelSpan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, span);
    }
}
