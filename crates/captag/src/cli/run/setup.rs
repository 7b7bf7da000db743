//! Runner setup: config overrides and model loading.

use captag_core::pipeline::{CaptionStage, TaggerStage};
use captag_core::{CaptionPathResolver, CaptionRunner, Config, ImageDecoder};

use super::RunArgs;

/// Fold command-line flags into the loaded configuration.
pub fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if args.recursive {
        config.input.recursive = true;
    }
    if let Some(dir) = &args.caption_dir {
        config.output.caption_dir = Some(dir.clone());
    }
    if let Some(method) = args.method {
        config.run.method = method.into();
    }
    if let Some(mode) = args.mode {
        config.run.mode = mode.into();
    }

    let tagger = &mut config.tagger;
    if let Some(model) = &args.tagger_model {
        tagger.model = model.clone();
    }
    if let Some(action) = args.tags_action {
        tagger.file_action = action.into();
    }
    if let Some(threshold) = args.threshold {
        tagger.threshold = threshold;
    }
    if let Some(threshold) = args.general_threshold {
        tagger.general_threshold = Some(threshold);
    }
    if let Some(threshold) = args.character_threshold {
        tagger.character_threshold = Some(threshold);
    }
    if args.character_first {
        tagger.character_tags_first = true;
    }
    if let Some(rating) = args.rating {
        tagger.rating = rating.into();
    }
    if let Some(list) = &args.undesired_tags {
        tagger.set_undesired_tags(list);
    }
    if let Some(list) = &args.always_first_tags {
        tagger.set_always_first_tags(list);
    }
    if args.tags_frequency {
        tagger.tags_frequency = true;
    }

    let caption = &mut config.caption;
    if let Some(provider) = args.provider {
        caption.provider = provider.to_string();
    }
    if let Some(action) = args.caption_action {
        caption.file_action = action.into();
    }
    if args.without_tags {
        caption.without_tags = true;
    }
    if args.read_tag_captions {
        caption.read_tag_captions = true;
    }
}

/// Assemble the per-image runner, loading every model the method needs.
///
/// A model that fails to load aborts the run before any image is touched.
pub fn build_runner(config: &Config, args: &RunArgs) -> anyhow::Result<CaptionRunner> {
    let resolver = CaptionPathResolver::new(&args.input, config.caption_dir());
    let decoder = ImageDecoder::new(config.limits.clone());
    let mut runner = CaptionRunner::new(resolver, decoder, config.run.mode);

    let method = config.run.method;
    if method.uses_tagger() {
        let stage = TaggerStage::load(config).map_err(|e| {
            anyhow::anyhow!(
                "{e}\n\n  Hint: Run `captag models download --model {}` first.",
                config.tagger.model
            )
        })?;
        tracing::info!("Tagger loaded ({} tags)", stage.scorer().catalog().len());
        runner = runner.with_tagger(stage);
    }
    if method.uses_captioner() {
        let stage = CaptionStage::load(config, args.llm_model.as_deref())?;
        runner = runner.with_captioner(stage);
    }

    Ok(runner)
}
