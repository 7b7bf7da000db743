//! Image captioning pipeline components.
//!
//! - **discovery**: Find image files in directories
//! - **decode**: Load and decode images, enforcing size limits
//! - **runner**: Run the tagger and caption model for one image

pub mod decode;
pub mod discovery;
pub mod runner;

// Re-exports for convenient access
pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use runner::{
    CaptionMethod, CaptionOptions, CaptionRunner, CaptionStage, ImageReport, Pass, RunMode,
    StageOutcome, TaggerStage,
};
