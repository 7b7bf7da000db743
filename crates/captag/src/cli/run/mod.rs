//! The `captag run` command: tag and/or caption a file or directory.

mod batch;
mod setup;
pub mod types;

pub use types::{Action, Method, Mode, Provider, Rating};

use captag_core::pipeline::FileDiscovery;
use captag_core::Config;
use clap::Args;
use std::path::PathBuf;

use batch::{print_summary, report_frequency, run_batch};
use setup::{apply_overrides, build_runner};

/// Arguments for the `run` command.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Image file or directory to caption
    #[arg(required = true)]
    pub input: PathBuf,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Which models to run
    #[arg(short, long, value_enum)]
    pub method: Option<Method>,

    /// Order of the two models when both run
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Write caption files here instead of next to each image
    #[arg(long)]
    pub caption_dir: Option<PathBuf>,

    /// What to do with an existing tag file
    #[arg(long, value_enum)]
    pub tags_action: Option<Action>,

    /// What to do with an existing caption file
    #[arg(long, value_enum)]
    pub caption_action: Option<Action>,

    /// Fallback threshold for tags without a category threshold
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Threshold for general tags
    #[arg(long)]
    pub general_threshold: Option<f32>,

    /// Threshold for character tags
    #[arg(long)]
    pub character_threshold: Option<f32>,

    /// Put character tags before general tags
    #[arg(long)]
    pub character_first: bool,

    /// Include the top rating tag at the start or end
    #[arg(long, value_enum)]
    pub rating: Option<Rating>,

    /// Tags never to write, separated by the caption separator
    #[arg(long)]
    pub undesired_tags: Option<String>,

    /// Tags to move to the front when present, separated by the caption separator
    #[arg(long)]
    pub always_first_tags: Option<String>,

    /// Report how often each tag was written
    #[arg(long)]
    pub tags_frequency: bool,

    /// Tagger model directory name under the model dir
    #[arg(long)]
    pub tagger_model: Option<String>,

    /// Caption provider
    #[arg(long, value_enum)]
    pub provider: Option<Provider>,

    /// Caption model name (provider-specific)
    #[arg(long)]
    pub llm_model: Option<String>,

    /// Never put tags into the caption prompt
    #[arg(long)]
    pub without_tags: bool,

    /// Read tags for the caption prompt from existing tag files
    #[arg(long)]
    pub read_tag_captions: bool,
}

/// Execute the run command.
pub async fn execute(args: RunArgs, mut config: Config) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            args.input
        );
    }

    apply_overrides(&mut config, &args);
    config.check()?;

    let files = FileDiscovery::new(config.input.clone()).discover(&args.input);
    if files.is_empty() {
        tracing::warn!("No supported image files found at {:?}", args.input);
        return Ok(());
    }
    tracing::info!(
        "Found {} image(s) ({:.1} MB) to caption",
        files.len(),
        FileDiscovery::total_size(&files) as f64 / 1_000_000.0
    );

    let runner = build_runner(&config, &args)?;
    if let Some(stage) = runner.captioner() {
        if !stage.provider().is_available().await {
            tracing::warn!(
                "Caption provider {} is not reachable, caption requests will likely fail",
                stage.provider().name()
            );
        }
    }

    let track_frequency = config.tagger.tags_frequency && runner.tagger().is_some();
    let (stats, frequency) = run_batch(&runner, &files, track_frequency).await;
    runner.unload();

    print_summary(&stats);
    if let Some(freq) = frequency {
        report_frequency(&freq);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        run: RunArgs,
    }

    #[test]
    fn test_run_args_defaults_leave_config_alone() {
        let args = RunArgs::default();
        assert!(args.method.is_none());
        assert!(args.mode.is_none());
        assert!(args.threshold.is_none());
        assert!(!args.character_first);
        assert!(!args.without_tags);
    }

    #[test]
    fn test_run_args_parse_enums() {
        let cli = TestCli::try_parse_from([
            "captag",
            "./images",
            "--method",
            "both",
            "--mode",
            "queue",
            "--tags-action",
            "skip",
            "--rating",
            "last",
            "--provider",
            "openai",
        ])
        .unwrap();
        assert!(matches!(cli.run.method, Some(Method::Both)));
        assert!(matches!(cli.run.mode, Some(Mode::Queue)));
        assert!(matches!(cli.run.tags_action, Some(Action::Skip)));
        assert!(matches!(cli.run.rating, Some(Rating::Last)));
        assert!(matches!(cli.run.provider, Some(Provider::Openai)));
    }

    #[test]
    fn test_run_args_reject_unknown_method() {
        assert!(TestCli::try_parse_from(["captag", "./images", "--method", "wd"]).is_err());
    }

    #[tokio::test]
    async fn test_missing_input_is_an_error() {
        let args = RunArgs {
            input: PathBuf::from("/definitely/not/here"),
            ..Default::default()
        };
        let err = execute(args, Config::default()).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_empty_directory_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = RunArgs {
            input: dir.path().to_path_buf(),
            ..Default::default()
        };
        execute(args, Config::default()).await.unwrap();
    }
}
