//! Per-image orchestration of the tagger and caption model.
//!
//! The runner decides which caption files an image still needs, decodes the
//! image at most once, runs the enabled models and hands their output to the
//! caption file policy. The batch loop above it owns iteration and progress.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::decode::ImageDecoder;
use crate::caption::{
    build_user_prompt, encode_for_caption, CaptionProvider, CaptionProviderFactory,
    CaptionRequest,
};
use crate::config::{CaptionConfig, Config};
use crate::error::{CaptagError, PipelineError};
use crate::output::{normalize_extension, CaptionPathResolver, CaptionWriter, FileAction, FileDecision};
use crate::tagging::{TagCatalog, TagFrequency, TagPredictor, TagScorer, WdTagger};

/// Which models a run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionMethod {
    #[default]
    Tags,
    Caption,
    Both,
}

impl CaptionMethod {
    pub fn uses_tagger(self) -> bool {
        matches!(self, Self::Tags | Self::Both)
    }

    pub fn uses_captioner(self) -> bool {
        matches!(self, Self::Caption | Self::Both)
    }
}

/// How the two models are interleaved when both run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Tag then caption each image before moving on
    #[default]
    Sync,
    /// Tag every image, then caption every image
    Queue,
}

/// Which stages one call to [`CaptionRunner::process`] may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    All,
    TagsOnly,
    CaptionOnly,
}

impl std::fmt::Display for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::TagsOnly => "tags",
            Self::CaptionOnly => "caption",
        };
        f.write_str(name)
    }
}

/// What happened to one caption file.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Written {
        path: PathBuf,
        decision: FileDecision,
        text: String,
    },
    /// File existed and the action is `skip`; the model did not run
    Skipped { path: PathBuf },
}

impl StageOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Written { path, .. } | Self::Skipped { path } => path,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// Result of processing one image.
#[derive(Debug, Clone)]
pub struct ImageReport {
    pub path: PathBuf,
    pub tags: Option<StageOutcome>,
    pub caption: Option<StageOutcome>,
}

impl ImageReport {
    /// True when every stage that ran was skipped.
    pub fn all_skipped(&self) -> bool {
        [&self.tags, &self.caption]
            .into_iter()
            .flatten()
            .all(StageOutcome::is_skipped)
    }
}

/// Tagger, scorer and tag file settings.
pub struct TaggerStage {
    predictor: Box<dyn TagPredictor>,
    scorer: TagScorer,
    extension: String,
    action: FileAction,
}

impl TaggerStage {
    pub fn new(
        predictor: Box<dyn TagPredictor>,
        scorer: TagScorer,
        extension: &str,
        action: FileAction,
    ) -> Self {
        Self {
            predictor,
            scorer,
            extension: normalize_extension(extension),
            action,
        }
    }

    /// Load the configured tagger and its catalog from the model directory.
    ///
    /// Missing model files or a malformed catalog are fatal.
    pub fn load(config: &Config) -> Result<Self, CaptagError> {
        let tagger_dir = config.tagger_dir();
        let (model_path, catalog_path) = WdTagger::files(&tagger_dir);
        for required in [&model_path, &catalog_path] {
            if !required.exists() {
                return Err(PipelineError::ModelNotFound {
                    path: required.clone(),
                }
                .into());
            }
        }

        let tagger = &config.tagger;
        let catalog = TagCatalog::load(&catalog_path, tagger.layout(), &tagger.transforms()?)?;
        tracing::info!("Loading tagger model {}", tagger.model);
        let predictor = WdTagger::load(&model_path, tagger.image_size, catalog.len())?;
        let scorer = TagScorer::new(catalog, tagger.thresholds());

        Ok(Self::new(
            Box::new(predictor),
            scorer,
            &tagger.caption_extension,
            tagger.file_action,
        ))
    }

    pub fn scorer(&self) -> &TagScorer {
        &self.scorer
    }
}

/// Prompt and file settings for the caption stage.
#[derive(Debug, Clone)]
pub struct CaptionOptions {
    pub system_prompt: String,
    pub user_prompt: String,
    pub user_prompt_with_tags: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub image_size: u32,
    pub extension: String,
    pub action: FileAction,
    /// Tag file extension, for reading tags written earlier
    pub tag_extension: String,
    pub read_tag_captions: bool,
    pub without_tags: bool,
}

impl CaptionOptions {
    pub fn from_config(caption: &CaptionConfig, tag_extension: &str) -> Self {
        Self {
            system_prompt: caption.system_prompt.clone(),
            user_prompt: caption.user_prompt.clone(),
            user_prompt_with_tags: caption.user_prompt_with_tags.clone(),
            max_tokens: caption.max_tokens,
            temperature: caption.temperature,
            image_size: caption.image_size,
            extension: normalize_extension(&caption.caption_extension),
            action: caption.file_action,
            tag_extension: normalize_extension(tag_extension),
            read_tag_captions: caption.read_tag_captions,
            without_tags: caption.without_tags,
        }
    }
}

/// Caption provider plus its options.
pub struct CaptionStage {
    provider: Box<dyn CaptionProvider>,
    options: CaptionOptions,
}

impl CaptionStage {
    pub fn new(provider: Box<dyn CaptionProvider>, options: CaptionOptions) -> Self {
        Self { provider, options }
    }

    /// Create the configured provider. `model_override` replaces its model.
    pub fn load(config: &Config, model_override: Option<&str>) -> Result<Self, CaptagError> {
        let provider = CaptionProviderFactory::create(&config.caption, model_override)?;
        tracing::info!("Using caption provider {}", provider.name());
        let options = CaptionOptions::from_config(&config.caption, &config.tagger.caption_extension);
        Ok(Self::new(provider, options))
    }

    pub fn provider(&self) -> &dyn CaptionProvider {
        self.provider.as_ref()
    }
}

/// Runs the enabled stages for one image at a time.
pub struct CaptionRunner {
    tagger: Option<TaggerStage>,
    captioner: Option<CaptionStage>,
    resolver: CaptionPathResolver,
    decoder: ImageDecoder,
    writer: CaptionWriter,
    mode: RunMode,
}

impl CaptionRunner {
    pub fn new(resolver: CaptionPathResolver, decoder: ImageDecoder, mode: RunMode) -> Self {
        Self {
            tagger: None,
            captioner: None,
            resolver,
            decoder,
            writer: CaptionWriter,
            mode,
        }
    }

    pub fn with_tagger(mut self, stage: TaggerStage) -> Self {
        self.tagger = Some(stage);
        self
    }

    pub fn with_captioner(mut self, stage: CaptionStage) -> Self {
        self.captioner = Some(stage);
        self
    }

    pub fn tagger(&self) -> Option<&TaggerStage> {
        self.tagger.as_ref()
    }

    pub fn captioner(&self) -> Option<&CaptionStage> {
        self.captioner.as_ref()
    }

    /// Passes the batch loop should make over the image list.
    ///
    /// Queue mode with both stages splits the run into a tag pass and a
    /// caption pass; everything else is one pass.
    pub fn passes(&self) -> Vec<Pass> {
        if self.mode == RunMode::Queue && self.tagger.is_some() && self.captioner.is_some() {
            vec![Pass::TagsOnly, Pass::CaptionOnly]
        } else {
            vec![Pass::All]
        }
    }

    /// Process one image.
    ///
    /// Stages whose caption file exists with action `skip` do not run; when
    /// no stage is left the image is never decoded.
    pub async fn process(
        &self,
        path: &Path,
        pass: Pass,
        freq: Option<&mut TagFrequency>,
    ) -> Result<ImageReport, PipelineError> {
        let mut report = ImageReport {
            path: path.to_path_buf(),
            tags: None,
            caption: None,
        };

        let tag_job = match &self.tagger {
            Some(stage) if pass != Pass::CaptionOnly => {
                let file = self.resolver.prepare(path, &stage.extension)?;
                if skip_existing(&file, stage.action) {
                    tracing::warn!("Tag file {:?} already exists, skipping tagger", file);
                    report.tags = Some(StageOutcome::Skipped { path: file });
                    None
                } else {
                    Some((stage, file))
                }
            }
            _ => None,
        };

        let caption_job = match &self.captioner {
            Some(stage) if pass != Pass::TagsOnly => {
                let file = self.resolver.prepare(path, &stage.options.extension)?;
                if skip_existing(&file, stage.options.action) {
                    tracing::warn!("Caption file {:?} already exists, skipping caption model", file);
                    report.caption = Some(StageOutcome::Skipped { path: file });
                    None
                } else {
                    Some((stage, file))
                }
            }
            _ => None,
        };

        if tag_job.is_none() && caption_job.is_none() {
            return Ok(report);
        }

        let decoded = self.decoder.decode(path)?;

        let mut tag_text = None;
        if let Some((stage, file)) = tag_job {
            let probs = stage.predictor.predict(&decoded.image, path)?;
            let scored = stage.scorer.score(&probs, freq);
            tracing::debug!("Rating tags: {}", scored.rating_text);
            tracing::debug!("Character tags: {}", scored.character_text);
            tracing::debug!("General tags: {}", scored.general_text);

            let decision = self.writer.write(&file, &scored.text, stage.action)?;
            report.tags = Some(StageOutcome::Written {
                path: file,
                decision,
                text: scored.text.clone(),
            });
            tag_text = Some(scored.text);
        }

        if let Some((stage, file)) = caption_job {
            let options = &stage.options;
            let prompt_tags = if options.without_tags {
                None
            } else if tag_text.is_some() {
                tag_text
            } else if self.tagger.is_some() || options.read_tag_captions {
                self.read_tag_file(path, &options.tag_extension)
            } else {
                None
            };

            let image = encode_for_caption(&decoded.image, options.image_size, path)?;
            let prompt = build_user_prompt(
                &options.user_prompt,
                &options.user_prompt_with_tags,
                prompt_tags.as_deref(),
            );
            tracing::debug!("Caption prompt: {}", prompt);

            let request = CaptionRequest {
                image,
                system: options.system_prompt.clone(),
                prompt,
                max_tokens: options.max_tokens,
                temperature: options.temperature,
            };
            let response = stage.provider.generate(&request).await?;
            tracing::debug!(
                "{} caption in {}ms ({:?} tokens)",
                response.model,
                response.latency_ms,
                response.tokens_used
            );

            let decision = self.writer.write(&file, &response.text, options.action)?;
            report.caption = Some(StageOutcome::Written {
                path: file,
                decision,
                text: response.text,
            });
        }

        Ok(report)
    }

    /// Drop loaded models, logging the unload.
    pub fn unload(self) {
        if let Some(stage) = self.tagger {
            tracing::info!("Unloading tagger");
            drop(stage);
        }
        if let Some(stage) = self.captioner {
            tracing::info!("Releasing caption provider {}", stage.provider.name());
            drop(stage);
        }
    }

    fn read_tag_file(&self, image: &Path, extension: &str) -> Option<String> {
        let file = self.resolver.resolve(image, extension);
        match std::fs::read_to_string(&file) {
            Ok(text) => {
                tracing::debug!("Loaded tags from {:?}", file);
                Some(text)
            }
            Err(e) => {
                tracing::warn!("Tag file {:?} not readable ({e}), captioning without tags", file);
                None
            }
        }
    }
}

fn skip_existing(file: &Path, action: FileAction) -> bool {
    action == FileAction::Skip && file.exists()
}
