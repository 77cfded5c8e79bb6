//! Leaf and composite cuts, and the append/overlay algebra over them.
//!
//! Composition never touches a registry: a [`Track`] records only the
//! ingredient id, where it starts, its gain and its duration at the time
//! the track was made. Label spans and features are resolved later through
//! [`Segment::bind`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{MixConfig, OverlayPolicy};
use crate::frames::seconds_to_frames;
use crate::label::LabelSpan;
use crate::store::FeatureReference;
use crate::MixError;

const EPS: f64 = 1e-9;

/// Deepest chain of composites a query follows before giving up. A
/// manifest that makes a composite contain itself hits this limit.
pub const MAX_NESTING: usize = 64;

fn check_duration(duration: f64) -> Result<(), MixError> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(MixError::InvalidDuration(duration));
    }
    Ok(())
}

/// A cut backed directly by a recording and its extracted features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLeafSegment")]
pub struct LeafSegment {
    id: String,
    /// Offset of this cut within the recording (and its feature matrix).
    start: f64,
    duration: f64,
    features: FeatureReference,
    #[serde(default)]
    label_spans: Vec<LabelSpan>,
}

/// Manifest form of a [`LeafSegment`], checked by [`LeafSegment::new`].
#[derive(Deserialize)]
struct RawLeafSegment {
    id: String,
    start: f64,
    duration: f64,
    features: FeatureReference,
    #[serde(default)]
    label_spans: Vec<LabelSpan>,
}

impl TryFrom<RawLeafSegment> for LeafSegment {
    type Error = MixError;

    fn try_from(raw: RawLeafSegment) -> Result<Self, Self::Error> {
        LeafSegment::new(raw.id, raw.start, raw.duration, raw.features, raw.label_spans)
    }
}

impl LeafSegment {
    /// Creates a leaf cut. Every label span must lie inside `[0, duration]`.
    pub fn new(
        id: impl Into<String>,
        start: f64,
        duration: f64,
        features: FeatureReference,
        label_spans: Vec<LabelSpan>,
    ) -> Result<Self, MixError> {
        check_duration(duration)?;
        if !start.is_finite() || start < 0.0 {
            return Err(MixError::OutOfBoundsOffset {
                offset: start,
                limit: f64::INFINITY,
            });
        }
        if let Some(bad) = label_spans.iter().find(|s| !s.fits(duration)) {
            return Err(MixError::InvalidLabelSpan {
                id: bad.id.clone(),
                start: bad.start,
                duration: bad.duration,
                segment_duration: duration,
            });
        }
        Ok(Self {
            id: id.into(),
            start,
            duration,
            features,
            label_spans,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn features(&self) -> &FeatureReference {
        &self.features
    }

    pub fn label_spans(&self) -> &[LabelSpan] {
        &self.label_spans
    }

    /// Cuts out `[offset, offset + duration)` of this segment as a new leaf.
    ///
    /// Label spans are clipped to the window and re-based on it; spans
    /// entirely outside the window are dropped. The new id is derived from
    /// this one and the window bounds.
    pub fn truncate(&self, offset: f64, duration: f64) -> Result<Self, MixError> {
        check_duration(duration)?;
        if !offset.is_finite() || offset < 0.0 || offset + duration > self.duration + EPS {
            return Err(MixError::OutOfBoundsOffset {
                offset,
                limit: self.duration,
            });
        }
        let duration = duration.min(self.duration - offset);
        let label_spans = self
            .label_spans
            .iter()
            .filter_map(|s| s.clip(offset, duration))
            .collect();
        Ok(Self {
            id: format!("{}_{:.3}_{:.3}", self.id, offset, duration),
            start: self.start + offset,
            duration,
            features: self.features.clone(),
            label_spans,
        })
    }
}

/// One ingredient of a composite: a cut id placed at `offset` seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    cut_id: String,
    offset: f64,
    /// Duration of the ingredient when the track was created.
    duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gain: Option<f32>,
}

impl Track {
    pub fn new(cut_id: impl Into<String>, offset: f64, duration: f64) -> Self {
        Self {
            cut_id: cut_id.into(),
            offset,
            duration,
            gain: None,
        }
    }

    /// Scales the ingredient's feature rows by `gain` when mixed.
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = Some(gain);
        self
    }

    pub fn cut_id(&self) -> &str {
        &self.cut_id
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn gain(&self) -> Option<f32> {
        self.gain
    }

    /// End of the ingredient within the composite.
    pub fn end(&self) -> f64 {
        self.offset + self.duration
    }
}

/// A cut made of tracks that reference other cuts by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCompositeSegment")]
pub struct CompositeSegment {
    id: String,
    tracks: Vec<Track>,
}

#[derive(Deserialize)]
struct RawCompositeSegment {
    id: String,
    tracks: Vec<Track>,
}

impl TryFrom<RawCompositeSegment> for CompositeSegment {
    type Error = MixError;

    fn try_from(raw: RawCompositeSegment) -> Result<Self, Self::Error> {
        CompositeSegment::new(raw.id, raw.tracks)
    }
}

impl CompositeSegment {
    /// Creates a composite from raw tracks, e.g. as read from a manifest.
    pub fn new(id: impl Into<String>, tracks: Vec<Track>) -> Result<Self, MixError> {
        let id = id.into();
        if tracks.is_empty() {
            return Err(MixError::EmptyComposite(id));
        }
        for track in &tracks {
            if !track.offset.is_finite() || track.offset < 0.0 {
                return Err(MixError::OutOfBoundsOffset {
                    offset: track.offset,
                    limit: f64::INFINITY,
                });
            }
            check_duration(track.duration)?;
        }
        Ok(Self { id, tracks })
    }

    /// Replaces the generated id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// The end of the latest-ending track.
    pub fn duration(&self) -> f64 {
        self.tracks.iter().map(Track::end).fold(0.0, f64::max)
    }
}

/// Either kind of cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Leaf(LeafSegment),
    Composite(CompositeSegment),
}

impl From<LeafSegment> for Segment {
    fn from(leaf: LeafSegment) -> Self {
        Segment::Leaf(leaf)
    }
}

impl From<CompositeSegment> for Segment {
    fn from(composite: CompositeSegment) -> Self {
        Segment::Composite(composite)
    }
}

impl Segment {
    pub fn id(&self) -> &str {
        match self {
            Segment::Leaf(leaf) => leaf.id(),
            Segment::Composite(composite) => composite.id(),
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            Segment::Leaf(leaf) => leaf.duration(),
            Segment::Composite(composite) => composite.duration(),
        }
    }

    /// Number of feature rows this cut spans at the given frame shift.
    pub fn num_frames(&self, frame_shift: f64) -> usize {
        seconds_to_frames(self.duration(), frame_shift)
    }

    pub fn as_leaf(&self) -> Option<&LeafSegment> {
        match self {
            Segment::Leaf(leaf) => Some(leaf),
            Segment::Composite(_) => None,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeSegment> {
        match self {
            Segment::Leaf(_) => None,
            Segment::Composite(composite) => Some(composite),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Segment::Composite(_))
    }

    /// Tracks that stand for `self` inside a new composite. A composite
    /// contributes its own tracks so the mixing tree stays flat.
    fn base_tracks(&self) -> Vec<Track> {
        match self {
            Segment::Leaf(leaf) => vec![Track::new(leaf.id(), 0.0, leaf.duration())],
            Segment::Composite(composite) => composite.tracks.clone(),
        }
    }

    fn compose(&self, other: Track) -> CompositeSegment {
        let mut tracks = self.base_tracks();
        tracks.push(other);
        CompositeSegment {
            id: uuid::Uuid::new_v4().to_string(),
            tracks,
        }
    }

    /// Places `other` right after `self`.
    pub fn append(&self, other: &Segment) -> CompositeSegment {
        let offset = self.duration();
        let mixed = self.compose(Track::new(other.id(), offset, other.duration()));
        debug!(
            id = %mixed.id,
            base = %self.id(),
            other = %other.id(),
            offset,
            duration = mixed.duration(),
            "cutmix: append"
        );
        mixed
    }

    /// Mixes `other` into `self`, starting `offset_other_by` seconds in,
    /// under the default [`OverlayPolicy`].
    pub fn overlay(
        &self,
        other: &Segment,
        offset_other_by: f64,
        gain: Option<f32>,
    ) -> Result<CompositeSegment, MixError> {
        self.overlay_with_policy(other, offset_other_by, gain, OverlayPolicy::default())
    }

    /// Like [`overlay`](Self::overlay), using the policy from `config`.
    pub fn overlay_with_config(
        &self,
        other: &Segment,
        offset_other_by: f64,
        gain: Option<f32>,
        config: &MixConfig,
    ) -> Result<CompositeSegment, MixError> {
        self.overlay_with_policy(other, offset_other_by, gain, config.overlay_policy)
    }

    /// Like [`overlay`](Self::overlay), with an explicit offset policy.
    pub fn overlay_with_policy(
        &self,
        other: &Segment,
        offset_other_by: f64,
        gain: Option<f32>,
        policy: OverlayPolicy,
    ) -> Result<CompositeSegment, MixError> {
        policy.check(offset_other_by, self.duration())?;

        let mut track = Track::new(other.id(), offset_other_by, other.duration());
        track.gain = gain;
        let mixed = self.compose(track);
        debug!(
            id = %mixed.id,
            base = %self.id(),
            other = %other.id(),
            offset = offset_other_by,
            duration = mixed.duration(),
            "cutmix: overlay"
        );
        Ok(mixed)
    }
}
