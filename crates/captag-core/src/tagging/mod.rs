//! Tag classification with WD-style ONNX taggers.
//!
//! The model emits one probability per catalog row; the scorer thresholds
//! those into an ordered tag list.

pub mod catalog;
pub mod frequency;
pub mod preprocess;
pub mod scorer;
pub mod tagger;

pub use catalog::{parse_tag_list, CatalogLayout, TagCatalog, TagReplacement, TagTransforms};
pub use frequency::TagFrequency;
pub use scorer::{RatingPlacement, ResolvedThresholds, ScoredTags, TagScorer, ThresholdConfig};
pub use tagger::{TagPredictor, WdTagger, CATALOG_FILENAME, MODEL_FILENAME};
