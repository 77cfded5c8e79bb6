//! A segment paired with the resolver its track ids are looked up in.

use crate::aligner::FeatureAligner;
use crate::registry::SegmentResolver;
use crate::segment::MAX_NESTING;
use crate::store::FeatureMatrix;
use crate::{LabelSpan, MixError, Segment};

impl Segment {
    /// Pairs this segment with `resolver` for label and feature queries.
    ///
    /// Nothing is looked up until a query runs.
    pub fn bind<'a>(&'a self, resolver: &'a dyn SegmentResolver) -> BoundSegment<'a> {
        BoundSegment {
            segment: self,
            resolver,
        }
    }
}

/// A view of a [`Segment`] whose track ids resolve through a
/// [`SegmentResolver`].
///
/// Cheap to copy. Queries are recomputed on every call.
#[derive(Clone, Copy)]
pub struct BoundSegment<'a> {
    segment: &'a Segment,
    resolver: &'a dyn SegmentResolver,
}

impl std::fmt::Debug for BoundSegment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundSegment")
            .field("id", &self.segment.id())
            .field("composite", &self.segment.is_composite())
            .finish()
    }
}

impl<'a> BoundSegment<'a> {
    pub fn segment(&self) -> &'a Segment {
        self.segment
    }

    pub fn resolver(&self) -> &'a dyn SegmentResolver {
        self.resolver
    }

    pub fn id(&self) -> &'a str {
        self.segment.id()
    }

    /// Duration as resolved through this view: the latest end of any
    /// track, using each ingredient's resolved duration rather than the
    /// one recorded on the track.
    pub fn duration(&self) -> Result<f64, MixError> {
        self.resolved_duration(0)
    }

    fn resolved_duration(&self, depth: usize) -> Result<f64, MixError> {
        let composite = match self.segment {
            Segment::Leaf(leaf) => return Ok(leaf.duration()),
            Segment::Composite(composite) => composite,
        };
        self.check_depth(depth)?;
        let mut end = 0.0_f64;
        for track in composite.tracks() {
            let duration = self.ingredient(track.cut_id())?.resolved_duration(depth + 1)?;
            end = end.max(track.offset() + duration);
        }
        Ok(end)
    }

    /// The same segment viewed through another resolver. Existing views
    /// are unaffected.
    pub fn rebind<'b>(&self, resolver: &'b dyn SegmentResolver) -> BoundSegment<'b>
    where
        'a: 'b,
    {
        BoundSegment {
            segment: self.segment,
            resolver,
        }
    }

    /// Binds the ingredient a track refers to with this view's resolver.
    pub(crate) fn ingredient(&self, cut_id: &str) -> Result<BoundSegment<'a>, MixError> {
        let segment = self.resolver.resolve(cut_id).map_err(|err| match err {
            MixError::UnknownSegmentId(cut_id) => MixError::UnresolvedReference {
                composite: self.segment.id().to_string(),
                cut_id,
            },
            other => other,
        })?;
        Ok(BoundSegment {
            segment,
            resolver: self.resolver,
        })
    }

    /// Fails once a query has descended through `depth` composites.
    pub(crate) fn check_depth(&self, depth: usize) -> Result<(), MixError> {
        if depth > MAX_NESTING {
            return Err(MixError::NestingTooDeep {
                id: self.segment.id().to_string(),
                limit: MAX_NESTING,
            });
        }
        Ok(())
    }

    /// Label spans of every ingredient, shifted to composite time and
    /// ordered by start. Overlapping spans are all kept.
    pub fn label_spans(&self) -> Result<Vec<LabelSpan>, MixError> {
        let mut spans = Vec::new();
        self.collect_spans(0.0, 0, &mut spans)?;
        // Stable: spans starting together keep track order.
        spans.sort_by(|a, b| a.start.total_cmp(&b.start));
        Ok(spans)
    }

    fn collect_spans(
        &self,
        shift: f64,
        depth: usize,
        out: &mut Vec<LabelSpan>,
    ) -> Result<(), MixError> {
        let composite = match self.segment {
            Segment::Leaf(leaf) => {
                out.extend(leaf.label_spans().iter().map(|span| span.shift(shift)));
                return Ok(());
            }
            Segment::Composite(composite) => composite,
        };
        self.check_depth(depth)?;
        for track in composite.tracks() {
            self.ingredient(track.cut_id())?
                .collect_spans(shift + track.offset(), depth + 1, out)?;
        }
        Ok(())
    }

    /// Materializes the feature matrix, see [`FeatureAligner::load_features`].
    pub fn load_features(&self, aligner: &FeatureAligner) -> Result<FeatureMatrix, MixError> {
        aligner.load_features(self)
    }

    /// Row count of [`load_features`](Self::load_features) at the aligner's frame shift.
    pub fn num_frames(&self, aligner: &FeatureAligner) -> Result<usize, MixError> {
        aligner.num_frames(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompositeSegment, FeatureReference, LeafSegment, SegmentRegistry, Track};

    fn leaf(id: &str, duration: f64, spans: Vec<LabelSpan>) -> Segment {
        LeafSegment::new(id, 0.0, duration, FeatureReference::new(id), spans)
            .unwrap()
            .into()
    }

    #[test]
    fn leaf_binding_ignores_resolver() {
        let a = leaf("a", 2.0, vec![LabelSpan::new("s", "rec", 0.0, 1.0)]);
        let empty = SegmentRegistry::new();
        let spans = a.bind(&empty).label_spans().unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(a.bind(&empty).duration().unwrap(), 2.0);
    }

    #[test]
    fn unresolved_track_fails_at_query_time() {
        let a = leaf("a", 2.0, Vec::new());
        let b = leaf("b", 2.0, Vec::new());
        let mixed: Segment = a.append(&b).with_id("ab").into();

        let mut registry = SegmentRegistry::new();
        registry.insert(a);
        assert!(matches!(
            mixed.bind(&registry).duration(),
            Err(MixError::UnresolvedReference { .. })
        ));
        let err = mixed.bind(&registry).label_spans().unwrap_err();
        assert_eq!(
            err,
            MixError::UnresolvedReference {
                composite: "ab".to_string(),
                cut_id: "b".to_string(),
            }
        );
    }

    #[test]
    fn spans_sorted_by_start() {
        let a = leaf(
            "a",
            10.0,
            vec![
                LabelSpan::new("sup-1", "rec", 0.5, 6.0),
                LabelSpan::new("sup-2", "rec", 7.0, 2.0),
            ],
        );
        let b = leaf("b", 10.0, vec![LabelSpan::new("sup-3", "rec", 3.0, 2.5)]);
        let mixed: Segment = a.overlay(&b, 0.0, None).unwrap().into();
        let registry: SegmentRegistry = [a, b].into_iter().collect();

        let ids: Vec<String> = mixed
            .bind(&registry)
            .label_spans()
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["sup-1", "sup-3", "sup-2"]);
    }

    #[test]
    fn nested_composites_shift_cumulatively() {
        let a = leaf("a", 4.0, vec![LabelSpan::new("sa", "rec", 1.0, 1.0)]);
        let b = leaf("b", 4.0, vec![LabelSpan::new("sb", "rec", 1.0, 1.0)]);
        let ab: Segment = a.append(&b).with_id("ab").into();
        let c = leaf("c", 2.0, Vec::new());
        let cab: Segment = c.append(&ab).into();
        let registry: SegmentRegistry = [a, b, ab, c].into_iter().collect();

        let starts: Vec<f64> = cab
            .bind(&registry)
            .label_spans()
            .unwrap()
            .iter()
            .map(|s| s.start)
            .collect();
        assert_eq!(starts, vec![3.0, 7.0]);
    }

    #[test]
    fn self_referencing_composite_is_rejected() {
        let looped: Segment = CompositeSegment::new("loop", vec![Track::new("loop", 0.0, 1.0)])
            .unwrap()
            .into();
        let registry: SegmentRegistry = [looped.clone()].into_iter().collect();
        assert!(matches!(
            looped.bind(&registry).label_spans(),
            Err(MixError::NestingTooDeep { limit: MAX_NESTING, .. })
        ));
    }

    #[test]
    fn duration_follows_resolved_ingredients() {
        let a = leaf("a", 10.0, Vec::new());
        let b = leaf("b", 10.0, Vec::new());
        let ab: Segment = a.append(&b).with_id("ab").into();
        assert_eq!(ab.duration(), 20.0);

        let short_b = leaf("b", 5.0, Vec::new());
        let mut registry: SegmentRegistry = [a, short_b].into_iter().collect();
        assert_eq!(ab.bind(&registry).duration().unwrap(), 15.0);

        let c = leaf("c", 1.0, Vec::new());
        let cab: Segment = c.append(&ab).into();
        registry.extend([ab, c]);
        assert_eq!(cab.bind(&registry).duration().unwrap(), 16.0);
    }

    #[test]
    fn rebind_switches_resolver() {
        let a = leaf("a", 1.0, vec![LabelSpan::new("first", "rec", 0.0, 1.0)]);
        let b = leaf("b", 1.0, Vec::new());
        let mixed: Segment = a.append(&b).with_id("ab").into();
        let first: SegmentRegistry = [a, b.clone()].into_iter().collect();
        let renamed = leaf("a", 1.0, vec![LabelSpan::new("second", "rec", 0.5, 0.5)]);
        let second: SegmentRegistry = [renamed, b].into_iter().collect();

        let view = mixed.bind(&first);
        let other = view.rebind(&second);
        assert_eq!(view.label_spans().unwrap()[0].id, "first");
        assert_eq!(other.label_spans().unwrap()[0].id, "second");
        assert_eq!(view.label_spans().unwrap()[0].id, "first");
    }
}
