//! Cut mixing and feature alignment for speech training corpora.
//!
//! # Architecture
//!
//! Cuts compose without a registry; queries resolve through one:
//!
//! 1. [`Segment::append`] / [`Segment::overlay`]: two cuts -> a
//!    [`CompositeSegment`] of id-only [`Track`]s
//! 2. [`Segment::bind`]: segment + [`SegmentResolver`] -> [`BoundSegment`]
//! 3. [`BoundSegment::label_spans`]: ingredient labels shifted to composite time
//! 4. [`FeatureAligner::load_features`]: ingredient matrices summed at their
//!    frame offsets into one `[frames, dims]` matrix
//!
//! # Example
//!
//! ```
//! use cutmix::{
//!     FeatureAligner, FeatureReference, LabelSpan, LeafSegment, MemoryFeatureStore,
//!     MixConfig, Segment, SegmentRegistry,
//! };
//! use ndarray::Array2;
//!
//! let speech: Segment = LeafSegment::new(
//!     "speech",
//!     0.0,
//!     2.0,
//!     FeatureReference::new("feats/speech"),
//!     vec![LabelSpan::new("sup-1", "rec-1", 0.5, 1.0)],
//! )?
//! .into();
//! let noise: Segment =
//!     LeafSegment::new("noise", 0.0, 1.0, FeatureReference::new("feats/noise"), vec![])?.into();
//!
//! let mixed: Segment = speech.overlay(&noise, 0.5, Some(0.3))?.into();
//! assert_eq!(mixed.duration(), 2.0);
//!
//! let mut store = MemoryFeatureStore::new();
//! store.insert("feats/speech", Array2::ones((200, 80)));
//! store.insert("feats/noise", Array2::ones((100, 80)));
//! let registry: SegmentRegistry = [speech, noise].into_iter().collect();
//!
//! let aligner = FeatureAligner::new(store, &MixConfig::default())?;
//! let bound = mixed.bind(&registry);
//! assert_eq!(bound.label_spans()?[0].start, 0.5);
//! assert_eq!(bound.load_features(&aligner)?.dim(), (200, 80));
//! # Ok::<(), cutmix::MixError>(())
//! ```
//!
//! # Offsets
//!
//! Overlay offsets are checked when the composite is built, against an
//! [`OverlayPolicy`]. The default accepts offsets from 0 up to the duration
//! of the cut being overlaid onto.

mod aligner;
mod bind;
mod config;
mod error;
pub mod frames;
mod label;
mod registry;
mod segment;
mod store;

pub use aligner::FeatureAligner;
pub use bind::BoundSegment;
pub use config::{MixConfig, OverlayPolicy, DEFAULT_FRAME_SHIFT};
pub use error::{FeatureLoadError, MixError};
pub use frames::FrameSpan;
pub use label::LabelSpan;
pub use registry::{SegmentRegistry, SegmentResolver};
pub use segment::{CompositeSegment, LeafSegment, Segment, Track, MAX_NESTING};
pub use store::{FeatureMatrix, FeatureReference, FeatureStore, MemoryFeatureStore};
