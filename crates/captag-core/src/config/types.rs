//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::caption::prompt::{DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_PROMPT, DEFAULT_USER_PROMPT_WITH_TAGS};
use crate::error::ConfigError;
use crate::output::FileAction;
use crate::pipeline::{CaptionMethod, RunMode};
use crate::tagging::{
    parse_tag_list, CatalogLayout, RatingPlacement, TagReplacement, TagTransforms,
    ThresholdConfig,
};

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where models are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.captag/models"),
        }
    }
}

/// Input discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Descend into subdirectories of the input directory
    pub recursive: bool,

    /// Image file extensions to pick up (case-insensitive)
    pub supported_formats: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            supported_formats: ["jpg", "jpeg", "png", "webp", "bmp", "gif", "tiff", "tif", "avif"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 10000,
        }
    }
}

/// Caption file placement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write caption files under this directory instead of next to the images,
    /// mirroring the input tree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_dir: Option<PathBuf>,
}

/// Which models run, and how their passes are ordered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// tags, caption or both
    pub method: CaptionMethod,

    /// sync (per image) or queue (tag pass, then caption pass)
    pub mode: RunMode,
}

/// Tag classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    /// Model name, also the directory under `model_dir` and the Hugging Face repo name
    pub model: String,

    /// Catalog layout. Inferred from the model name when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<CatalogLayout>,

    /// Square input size, used when the model input shape is dynamic
    pub image_size: u32,

    /// Fallback threshold for categories without their own
    pub threshold: f32,

    /// Threshold for general tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general_threshold: Option<f32>,

    /// Threshold for character tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_threshold: Option<f32>,

    /// Separator between tags in the caption file
    pub caption_separator: String,

    /// Tags never written, regardless of score
    pub undesired_tags: Vec<String>,

    /// Tags moved to the head of the caption when present
    pub always_first_tags: Vec<String>,

    /// Where the rating tag goes: none, first or last
    pub rating: RatingPlacement,

    /// Put character tags before general tags
    pub character_tags_first: bool,

    /// Expand `name_(series)` into `name, series`
    pub character_tag_expand: bool,

    /// Replace underscores with spaces (kaomoji excluded)
    pub remove_underscore: bool,

    /// `source,target;source2,target2`, with `\,` and `\;` escapes
    pub tag_replacement: String,

    /// Count tag occurrences over the run and report them at the end
    pub tags_frequency: bool,

    /// Caption file extension
    pub caption_extension: String,

    /// What to do when the caption file already exists
    pub file_action: FileAction,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            model: "wd-eva02-large-tagger-v3".to_string(),
            layout: None,
            image_size: 448,
            threshold: 0.35,
            general_threshold: None,
            character_threshold: None,
            caption_separator: ", ".to_string(),
            undesired_tags: vec![],
            always_first_tags: vec![],
            rating: RatingPlacement::None,
            character_tags_first: false,
            character_tag_expand: false,
            remove_underscore: true,
            tag_replacement: String::new(),
            tags_frequency: false,
            caption_extension: ".txt".to_string(),
            file_action: FileAction::Overwrite,
        }
    }
}

impl TaggerConfig {
    /// Resolve the catalog layout, inferring from the model name when unset.
    pub fn layout(&self) -> CatalogLayout {
        self.layout
            .unwrap_or_else(|| CatalogLayout::infer_from_model(&self.model))
    }

    /// Build scoring thresholds and flags.
    pub fn thresholds(&self) -> ThresholdConfig {
        ThresholdConfig {
            general: self.general_threshold,
            character: self.character_threshold,
            fallback: self.threshold,
            rating: self.rating,
            character_first: self.character_tags_first,
            always_first: self.always_first_tags.clone(),
            undesired: self.undesired_tags.iter().cloned().collect(),
            separator: self.caption_separator.clone(),
        }
    }

    /// Build catalog load-time transforms.
    pub fn transforms(&self) -> Result<TagTransforms, ConfigError> {
        Ok(TagTransforms {
            expand_character_tags: self.character_tag_expand,
            remove_underscore: self.remove_underscore,
            replacements: TagReplacement::parse_list(&self.tag_replacement)?,
            separator: self.caption_separator.clone(),
        })
    }

    /// Set undesired tags from a separator-delimited string.
    pub fn set_undesired_tags(&mut self, list: &str) {
        self.undesired_tags = parse_tag_list(list, &self.caption_separator);
    }

    /// Set always-first tags from a separator-delimited string.
    pub fn set_always_first_tags(&mut self, list: &str) {
        self.always_first_tags = parse_tag_list(list, &self.caption_separator);
    }
}

/// Vision-language caption model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Provider name: "ollama" or "openai"
    pub provider: String,

    /// System prompt
    pub system_prompt: String,

    /// User prompt used when no tags are available
    pub user_prompt: String,

    /// User prompt used with tags; `{tags}` is replaced, or tags are appended
    pub user_prompt_with_tags: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Longest edge of the image sent to the model
    pub image_size: u32,

    /// Caption file extension
    pub caption_extension: String,

    /// What to do when the caption file already exists
    pub file_action: FileAction,

    /// In caption-only runs, read tags from existing tag caption files
    pub read_tag_captions: bool,

    /// Never include tags in the prompt
    pub without_tags: bool,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Ollama settings
    pub ollama: OllamaConfig,

    /// OpenAI-compatible server settings
    pub openai: OpenAiConfig,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_prompt: DEFAULT_USER_PROMPT.to_string(),
            user_prompt_with_tags: DEFAULT_USER_PROMPT_WITH_TAGS.to_string(),
            temperature: 0.5,
            max_tokens: 300,
            image_size: 1024,
            caption_extension: ".caption".to_string(),
            file_action: FileAction::Overwrite,
            read_tag_captions: false,
            without_tags: false,
            timeout_secs: 120,
            ollama: OllamaConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

/// Ollama configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama API endpoint
    pub endpoint: String,

    /// Model name
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2-vision".to_string(),
        }
    }
}

/// OpenAI-compatible server configuration (OpenAI, vLLM, llama.cpp server).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Base URL up to and including the API version
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax; may be empty for local servers)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,

    /// Also write logs to a file for each run
    pub save_logs: bool,

    /// Where log files go. Defaults to the caption dir, else the input's parent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            save_logs: false,
            log_dir: None,
        }
    }
}
