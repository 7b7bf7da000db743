//! Caption provider trait and request/response types.
//!
//! Defines the interface that every vision-language backend implements, plus
//! the factory that creates the right provider from config.

use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;

use crate::config::CaptionConfig;
use crate::error::PipelineError;

/// Base64-encoded image ready to send to a caption API.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg")
    pub media_type: String,
}

impl ImageInput {
    /// Create an `ImageInput` from raw bytes and a format identifier
    /// ("jpeg", "png", "webp", "gif").
    pub fn from_bytes(bytes: &[u8], format: &str) -> Self {
        let media_type = match format {
            "jpeg" | "jpg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            other => {
                tracing::warn!("Unknown image format '{other}', defaulting to image/jpeg");
                "image/jpeg"
            }
        };

        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_string(),
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// A request to caption one image.
#[derive(Debug, Clone)]
pub struct CaptionRequest {
    pub image: ImageInput,
    /// System prompt; omitted from the call when empty
    pub system: String,
    /// User prompt
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// The response from a caption call.
#[derive(Debug, Clone)]
pub struct CaptionResponse {
    /// Generated caption, already cleaned
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Number of tokens used (input + output), if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all caption providers implement.
///
/// Uses `async_trait` so providers can live behind `Box<dyn CaptionProvider>`.
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// Provider name for logging (e.g., "ollama").
    fn name(&self) -> &str;

    /// Check whether the provider is configured and reachable.
    async fn is_available(&self) -> bool;

    /// Generate a caption for the given request.
    async fn generate(&self, request: &CaptionRequest) -> Result<CaptionResponse, PipelineError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Tidy raw model output into a single-line caption.
///
/// Trims, drops a trailing `<|eot_id|>` marker, removes repeated sentences
/// (first occurrence kept) and strips line breaks.
pub fn clean_caption(raw: &str) -> String {
    let text = raw.trim();
    let text = text.strip_suffix("<|eot_id|>").unwrap_or(text).trim_end();

    let mut seen: Vec<&str> = Vec::new();
    for sentence in text.split('.') {
        if !seen.contains(&sentence) {
            seen.push(sentence);
        }
    }
    seen.join(".").replace(['\r', '\n'], "")
}

/// Factory that creates the configured provider.
pub struct CaptionProviderFactory;

impl CaptionProviderFactory {
    /// Create the provider named by `config.provider`.
    ///
    /// `model_override` replaces the provider's configured model.
    pub fn create(
        config: &CaptionConfig,
        model_override: Option<&str>,
    ) -> Result<Box<dyn CaptionProvider>, PipelineError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        match config.provider.as_str() {
            "ollama" => {
                let cfg = &config.ollama;
                let model = model_override.unwrap_or(&cfg.model);
                Ok(Box::new(super::ollama::OllamaProvider::new(
                    &cfg.endpoint,
                    model,
                    timeout,
                )))
            }
            "openai" => {
                let cfg = &config.openai;
                let api_key = resolve_env_var(&cfg.api_key);
                if api_key.is_none() {
                    tracing::warn!(
                        "No API key for {}, sending requests without authorization",
                        cfg.endpoint
                    );
                }
                let model = model_override.unwrap_or(&cfg.model);
                Ok(Box::new(super::openai::OpenAiProvider::new(
                    &cfg.endpoint,
                    api_key,
                    model,
                    timeout,
                )))
            }
            other => Err(PipelineError::Llm {
                message: format!("Unknown caption provider: {other}"),
                status_code: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_input_from_bytes() {
        let input = ImageInput::from_bytes(&[0xFF, 0xD8, 0xFF], "jpeg");
        assert_eq!(input.media_type, "image/jpeg");
        assert!(!input.data.is_empty());

        let png = ImageInput::from_bytes(&[0x89, 0x50], "png");
        assert_eq!(png.media_type, "image/png");
    }

    #[test]
    fn test_image_input_data_url() {
        let input = ImageInput::from_bytes(&[1, 2, 3], "jpeg");
        assert_eq!(input.data_url(), "data:image/jpeg;base64,AQID");
    }

    #[test]
    fn test_resolve_env_var() {
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        assert_eq!(resolve_env_var(""), None);
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_CAPTAG_123}"), None);
    }

    #[test]
    fn test_clean_caption_strips_marker_and_newlines() {
        assert_eq!(
            clean_caption("  A cat on a mat.\nIt sleeps.<|eot_id|>\n"),
            "A cat on a mat.It sleeps."
        );
    }

    #[test]
    fn test_clean_caption_drops_repeated_sentences() {
        assert_eq!(
            clean_caption("A red car. A red car. A red car"),
            "A red car. A red car"
        );
        assert_eq!(clean_caption("One.One.Two."), "One.Two.");
    }

    #[test]
    fn test_factory_creates_known_providers() {
        let mut config = CaptionConfig::default();
        let provider = CaptionProviderFactory::create(&config, None).unwrap();
        assert_eq!(provider.name(), "ollama");

        config.provider = "openai".to_string();
        config.openai.api_key = String::new();
        let provider = CaptionProviderFactory::create(&config, Some("local-model")).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.timeout(), Duration::from_secs(config.timeout_secs));
    }

    #[test]
    fn test_factory_rejects_unknown_provider() {
        let config = CaptionConfig {
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        assert!(CaptionProviderFactory::create(&config, None).is_err());
    }
}
