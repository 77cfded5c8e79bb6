use std::collections::HashMap;
use std::sync::Arc;

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::frames::FrameSpan;
use crate::FeatureLoadError;

/// A `[frames, dims]` feature matrix.
pub type FeatureMatrix = Array2<f32>;

/// Identifies a leaf cut's pre-extracted (or producible) features in a
/// [`FeatureStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureReference {
    /// Key understood by the store (a path, a CAS hash, a table row...).
    pub storage_key: String,
}

impl FeatureReference {
    pub fn new(storage_key: impl Into<String>) -> Self {
        Self {
            storage_key: storage_key.into(),
        }
    }
}

/// Loads feature rows for a leaf cut.
///
/// Implementations must be safe for concurrent use. Any I/O, caching, or
/// retrying belongs to the implementation; the mixing engine treats `load`
/// as a plain synchronous call.
/// Use [`MemoryFeatureStore`] for in-memory storage (testing/ephemeral).
pub trait FeatureStore: Send + Sync {
    /// Returns the rows `[span.start, span.end())` of the referenced matrix.
    fn load(
        &self,
        reference: &FeatureReference,
        span: FrameSpan,
    ) -> Result<FeatureMatrix, FeatureLoadError>;
}

impl<S: FeatureStore + ?Sized> FeatureStore for Arc<S> {
    fn load(
        &self,
        reference: &FeatureReference,
        span: FrameSpan,
    ) -> Result<FeatureMatrix, FeatureLoadError> {
        (**self).load(reference, span)
    }
}

impl<S: FeatureStore + ?Sized> FeatureStore for &S {
    fn load(
        &self,
        reference: &FeatureReference,
        span: FrameSpan,
    ) -> Result<FeatureMatrix, FeatureLoadError> {
        (**self).load(reference, span)
    }
}

/// In-memory [`FeatureStore`] implementation.
///
/// Populated up front, then only read.
#[derive(Debug, Default, Clone)]
pub struct MemoryFeatureStore {
    matrices: HashMap<String, FeatureMatrix>,
}

impl MemoryFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a matrix under `storage_key`, returning the one it replaced.
    pub fn insert(
        &mut self,
        storage_key: impl Into<String>,
        features: FeatureMatrix,
    ) -> Option<FeatureMatrix> {
        self.matrices.insert(storage_key.into(), features)
    }

    pub fn contains(&self, storage_key: &str) -> bool {
        self.matrices.contains_key(storage_key)
    }

    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }
}

impl FeatureStore for MemoryFeatureStore {
    fn load(
        &self,
        reference: &FeatureReference,
        span: FrameSpan,
    ) -> Result<FeatureMatrix, FeatureLoadError> {
        let key = &reference.storage_key;
        let stored = self
            .matrices
            .get(key)
            .ok_or_else(|| FeatureLoadError::NotFound(key.clone()))?;

        let available = stored.nrows();
        if span.end() > available {
            return Err(FeatureLoadError::SpanOutOfRange {
                key: key.clone(),
                start: span.start,
                num_frames: span.num_frames,
                available,
            });
        }
        Ok(stored.slice(s![span.start..span.end(), ..]).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(rows: usize, cols: usize) -> FeatureMatrix {
        Array2::from_shape_fn((rows, cols), |(r, c)| (r * cols + c) as f32)
    }

    #[test]
    fn memory_store_slices_span() {
        let mut store = MemoryFeatureStore::new();
        assert!(store.insert("feats-a", ramp(10, 3)).is_none());
        assert!(store.contains("feats-a"));
        assert_eq!(store.len(), 1);

        let rows = store
            .load(&FeatureReference::new("feats-a"), FrameSpan::new(2, 3))
            .unwrap();
        assert_eq!(rows.dim(), (3, 3));
        assert_eq!(rows[[0, 0]], 6.0);
        assert_eq!(rows[[2, 2]], 14.0);
    }

    #[test]
    fn memory_store_missing_key() {
        let store = MemoryFeatureStore::new();
        let err = store
            .load(&FeatureReference::new("nope"), FrameSpan::new(0, 1))
            .unwrap_err();
        assert_eq!(err, FeatureLoadError::NotFound("nope".to_string()));
    }

    #[test]
    fn memory_store_span_out_of_range() {
        let mut store = MemoryFeatureStore::new();
        store.insert("feats-a", ramp(10, 3));
        let err = store
            .load(&FeatureReference::new("feats-a"), FrameSpan::new(8, 3))
            .unwrap_err();
        assert!(matches!(
            err,
            FeatureLoadError::SpanOutOfRange { available: 10, start: 8, num_frames: 3, .. }
        ));
    }

    #[test]
    fn arc_store_delegates() {
        let mut store = MemoryFeatureStore::new();
        store.insert("feats-a", ramp(4, 2));
        let shared: Arc<dyn FeatureStore> = Arc::new(store);
        let rows = shared
            .load(&FeatureReference::new("feats-a"), FrameSpan::new(0, 4))
            .unwrap();
        assert_eq!(rows.nrows(), 4);
    }
}
