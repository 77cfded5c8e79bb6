use std::collections::HashMap;

use tracing::warn;

use crate::{MixError, Segment};

/// Resolves cut ids stored in tracks to concrete segments.
///
/// Implementations must be safe for concurrent reads.
/// Use [`SegmentRegistry`] for the in-memory arena.
pub trait SegmentResolver: Send + Sync {
    /// Returns the segment registered under `id`, or
    /// [`MixError::UnknownSegmentId`].
    fn resolve(&self, id: &str) -> Result<&Segment, MixError>;
}

/// Owns every segment of a corpus, keyed by id.
///
/// Populated once (typically by a manifest reader), then only read.
#[derive(Debug, Default, Clone)]
pub struct SegmentRegistry {
    cuts: HashMap<String, Segment>,
}

impl SegmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `segment` under its own id, returning the segment it replaced.
    pub fn insert(&mut self, segment: impl Into<Segment>) -> Option<Segment> {
        let segment = segment.into();
        let id = segment.id().to_string();
        let previous = self.cuts.insert(id.clone(), segment);
        if previous.is_some() {
            warn!(id = %id, "cutmix: segment already registered, replaced");
        }
        previous
    }

    pub fn get(&self, id: &str) -> Option<&Segment> {
        self.cuts.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cuts.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Registered ids, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.cuts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.cuts.values()
    }
}

impl SegmentResolver for SegmentRegistry {
    fn resolve(&self, id: &str) -> Result<&Segment, MixError> {
        self.cuts
            .get(id)
            .ok_or_else(|| MixError::UnknownSegmentId(id.to_string()))
    }
}

impl<S: Into<Segment>> Extend<S> for SegmentRegistry {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for segment in iter {
            self.insert(segment);
        }
    }
}

impl<S: Into<Segment>> FromIterator<S> for SegmentRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut registry = Self::new();
        registry.extend(iter);
        registry
    }
}
