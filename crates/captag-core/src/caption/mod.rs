//! Vision-language caption generation.
//!
//! Provides a provider abstraction over HTTP caption backends (Ollama and
//! OpenAI-compatible servers), prompt assembly and image encoding.

pub mod encode;
pub(crate) mod ollama;
pub(crate) mod openai;
pub mod prompt;
pub mod provider;

pub use encode::encode_for_caption;
pub use prompt::build_user_prompt;
pub use provider::{
    clean_caption, CaptionProvider, CaptionProviderFactory, CaptionRequest, CaptionResponse,
    ImageInput,
};

/// Provider names accepted in `caption.provider`.
pub const KNOWN_PROVIDERS: &[&str] = &["ollama", "openai"];
