//! Caption file placement and write policy.

pub mod path;
pub mod policy;

pub use path::{normalize_extension, CaptionPathResolver};
pub use policy::{merge, CaptionWriter, FileAction, FileDecision};
