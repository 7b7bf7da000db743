//! captag core - batch image captioning library.
//!
//! Runs a tag classifier and/or a vision-language model over image
//! collections and writes one caption file per image per model.
//!
//! # Architecture
//!
//! ```text
//! Discover → Decode → Tagger (ONNX) → Scorer → Tag file
//!                   ↘ Caption provider (HTTP) → Caption file
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use captag_core::pipeline::{CaptionRunner, Pass, TaggerStage};
//! use captag_core::{CaptionPathResolver, Config, ImageDecoder, TagFrequency};
//!
//! #[tokio::main]
//! async fn main() -> captag_core::Result<()> {
//!     let config = Config::load()?;
//!     let runner = CaptionRunner::new(
//!         CaptionPathResolver::new("./images", None),
//!         ImageDecoder::new(config.limits.clone()),
//!         config.run.mode,
//!     )
//!     .with_tagger(TaggerStage::load(&config)?);
//!
//!     let mut freq = TagFrequency::new();
//!     let report = runner
//!         .process("./images/cat.png".as_ref(), Pass::All, Some(&mut freq))
//!         .await?;
//!     println!("{:?}", report.tags);
//!     Ok(())
//! }
//! ```

pub mod caption;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod tagging;

// Re-exports for convenient access
pub use config::Config;
pub use error::{CaptagError, ConfigError, PipelineError, PipelineResult, Result};
pub use output::{CaptionPathResolver, CaptionWriter, FileAction, FileDecision};
pub use pipeline::{CaptionMethod, CaptionRunner, ImageDecoder, ImageReport, RunMode};
pub use tagging::{TagFrequency, TagScorer};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
