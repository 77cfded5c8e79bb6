//! Frame-accurate feature materialization for bound segments.
//!
//! A leaf's rows come straight from the [`FeatureStore`]. A composite is
//! mixed: every track's matrix is loaded (recursively for nested
//! composites), scaled by the track gain, and added into a zeroed
//! accumulator at the track's frame offset. Rows no track covers stay zero.

use std::sync::Arc;

use ndarray::{s, Array2};
use tracing::debug;

use crate::bind::BoundSegment;
use crate::config::MixConfig;
use crate::frames::{seconds_to_frames, FrameSpan};
use crate::segment::{CompositeSegment, LeafSegment, Track};
use crate::store::{FeatureMatrix, FeatureStore};
use crate::{MixError, Segment};

/// Materializes feature matrices at a fixed frame shift.
///
/// Holds no per-segment state: every call recomputes from the store, and
/// one aligner can serve any number of threads and bindings.
#[derive(Clone)]
pub struct FeatureAligner {
    store: Arc<dyn FeatureStore>,
    frame_shift: f64,
}

impl std::fmt::Debug for FeatureAligner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureAligner")
            .field("frame_shift", &self.frame_shift)
            .finish()
    }
}

impl FeatureAligner {
    /// Creates an aligner reading leaf features from `store`.
    pub fn new<S: FeatureStore + 'static>(store: S, config: &MixConfig) -> Result<Self, MixError> {
        Self::with_shared_store(Arc::new(store), config)
    }

    /// Creates an aligner over an already shared store.
    pub fn with_shared_store(
        store: Arc<dyn FeatureStore>,
        config: &MixConfig,
    ) -> Result<Self, MixError> {
        config.validate()?;
        Ok(Self {
            store,
            frame_shift: config.frame_shift,
        })
    }

    pub fn frame_shift(&self) -> f64 {
        self.frame_shift
    }

    /// Returns the `[frames, dims]` matrix covering the whole segment.
    ///
    /// For a composite the row count is `round(duration / frame_shift)` with
    /// the duration resolved through the bound resolver, raised if a track's
    /// rounded offset plus its rows reaches further. Fails with
    /// [`MixError::TrackDurationMismatch`] when a track no longer matches its
    /// ingredient.
    /// Either the complete matrix is returned or the first error met.
    pub fn load_features(&self, segment: &BoundSegment<'_>) -> Result<FeatureMatrix, MixError> {
        self.materialize(segment, 0)
    }

    /// Row count [`load_features`](Self::load_features) produces, computed
    /// without touching the store.
    pub fn num_frames(&self, segment: &BoundSegment<'_>) -> Result<usize, MixError> {
        self.frames_of(segment, 0)
    }

    /// Feature dimensionality, probed through the first leaf reached.
    pub fn num_features(&self, segment: &BoundSegment<'_>) -> Result<usize, MixError> {
        let mut current = *segment;
        let mut depth = 0;
        loop {
            let composite = match current.segment() {
                Segment::Leaf(leaf) => return Ok(self.load_leaf(leaf)?.ncols()),
                Segment::Composite(composite) => composite,
            };
            current.check_depth(depth)?;
            let first = composite
                .tracks()
                .first()
                .ok_or_else(|| MixError::EmptyComposite(composite.id().to_string()))?;
            current = current.ingredient(first.cut_id())?;
            depth += 1;
        }
    }

    fn materialize(
        &self,
        segment: &BoundSegment<'_>,
        depth: usize,
    ) -> Result<FeatureMatrix, MixError> {
        match segment.segment() {
            Segment::Leaf(leaf) => self.load_leaf(leaf),
            Segment::Composite(composite) => {
                segment.check_depth(depth)?;
                self.mix(segment, composite, depth)
            }
        }
    }

    fn load_leaf(&self, leaf: &LeafSegment) -> Result<FeatureMatrix, MixError> {
        let span = FrameSpan::from_seconds(leaf.start(), leaf.duration(), self.frame_shift);
        let features = self.store.load(leaf.features(), span)?;
        debug!(
            id = %leaf.id(),
            key = %leaf.features().storage_key,
            start = span.start,
            frames = features.nrows(),
            dims = features.ncols(),
            "cutmix: loaded leaf features"
        );
        Ok(features)
    }

    fn mix(
        &self,
        segment: &BoundSegment<'_>,
        composite: &CompositeSegment,
        depth: usize,
    ) -> Result<FeatureMatrix, MixError> {
        let mut end = 0.0_f64;
        let mut total_frames = 0;
        let mut dims: Option<usize> = None;
        let mut parts = Vec::with_capacity(composite.len());

        for track in composite.tracks() {
            let ingredient = segment.ingredient(track.cut_id())?;
            let duration = self.checked_duration(composite, track, &ingredient)?;
            end = end.max(track.offset() + duration);
            let features = self.materialize(&ingredient, depth + 1)?;

            match dims {
                None => dims = Some(features.ncols()),
                Some(expected) if expected != features.ncols() => {
                    return Err(MixError::DimensionMismatch {
                        expected,
                        got: features.ncols(),
                    });
                }
                Some(_) => {}
            }

            let frame_offset = seconds_to_frames(track.offset(), self.frame_shift);
            total_frames = total_frames.max(frame_offset + features.nrows());
            parts.push((frame_offset, track.gain().unwrap_or(1.0), features));
        }

        let total_frames = total_frames.max(seconds_to_frames(end, self.frame_shift));
        let mut mixed = Array2::<f32>::zeros((total_frames, dims.unwrap_or(0)));
        for (frame_offset, gain, features) in &parts {
            let end = frame_offset + features.nrows();
            mixed
                .slice_mut(s![*frame_offset..end, ..])
                .scaled_add(*gain, features);
        }

        debug!(
            id = %composite.id(),
            tracks = parts.len(),
            frames = total_frames,
            dims = mixed.ncols(),
            "cutmix: mixed composite features"
        );
        Ok(mixed)
    }

    fn frames_of(&self, segment: &BoundSegment<'_>, depth: usize) -> Result<usize, MixError> {
        let composite = match segment.segment() {
            Segment::Leaf(leaf) => {
                return Ok(seconds_to_frames(leaf.duration(), self.frame_shift));
            }
            Segment::Composite(composite) => composite,
        };
        segment.check_depth(depth)?;
        let mut end = 0.0_f64;
        let mut total = 0;
        for track in composite.tracks() {
            let ingredient = segment.ingredient(track.cut_id())?;
            let duration = self.checked_duration(composite, track, &ingredient)?;
            end = end.max(track.offset() + duration);
            let frame_offset = seconds_to_frames(track.offset(), self.frame_shift);
            total = total.max(frame_offset + self.frames_of(&ingredient, depth + 1)?);
        }
        Ok(total.max(seconds_to_frames(end, self.frame_shift)))
    }

    /// Resolved duration of a track's ingredient. A track whose recorded
    /// duration is more than one frame off would leave a silent gap or
    /// drop rows, so it is an error.
    fn checked_duration(
        &self,
        composite: &CompositeSegment,
        track: &Track,
        ingredient: &BoundSegment<'_>,
    ) -> Result<f64, MixError> {
        let resolved = ingredient.duration()?;
        if (resolved - track.duration()).abs() > self.frame_shift {
            return Err(MixError::TrackDurationMismatch {
                composite: composite.id().to_string(),
                cut_id: track.cut_id().to_string(),
                recorded: track.duration(),
                resolved,
            });
        }
        Ok(resolved)
    }
}
