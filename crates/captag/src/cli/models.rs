//! The `captag models` command for managing tagger models.

use captag_core::tagging::{CATALOG_FILENAME, MODEL_FILENAME};
use captag_core::Config;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download a WD tagger model and its tag catalog
    Download {
        /// Model to download (defaults to the configured tagger model)
        #[arg(long)]
        model: Option<String>,
    },

    /// List known tagger models and their install status
    List,

    /// Show model directory path
    Path,
}

const HF_REPO_OWNER: &str = "SmilingWolf";

/// WD tagger models published on Hugging Face.
pub const KNOWN_TAGGERS: &[&str] = &[
    "wd-eva02-large-tagger-v3",
    "wd-vit-large-tagger-v3",
    "wd-vit-tagger-v3",
    "wd-swinv2-tagger-v3",
    "wd-convnext-tagger-v3",
    "wd-v1-4-moat-tagger-v2",
    "wd-v1-4-swinv2-tagger-v2",
    "wd-v1-4-convnext-tagger-v2",
    "wd-v1-4-convnextv2-tagger-v2",
    "wd-v1-4-vit-tagger-v2",
];

/// Install status of one tagger directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    Ready,
    Partial,
    Missing,
}

impl ModelStatus {
    fn label(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Partial => "incomplete",
            Self::Missing => "not installed",
        }
    }
}

/// Check whether both tagger files exist under `model_dir/name`.
pub fn model_status(model_dir: &Path, name: &str) -> ModelStatus {
    let dir = model_dir.join(name);
    let present = [MODEL_FILENAME, CATALOG_FILENAME]
        .iter()
        .filter(|file| dir.join(file).exists())
        .count();
    match present {
        2 => ModelStatus::Ready,
        0 => ModelStatus::Missing,
        _ => ModelStatus::Partial,
    }
}

/// Remote URL of one file in a tagger repository.
pub fn model_file_url(model: &str, file: &str) -> String {
    format!("https://huggingface.co/{HF_REPO_OWNER}/{model}/resolve/main/{file}")
}

/// Download the model and catalog for `model`, keeping files already present.
pub async fn download_tagger(
    model: &str,
    model_dir: &Path,
    client: &reqwest::Client,
) -> anyhow::Result<PathBuf> {
    let dest_dir = model_dir.join(model);
    std::fs::create_dir_all(&dest_dir)?;

    for file in [CATALOG_FILENAME, MODEL_FILENAME] {
        let dest = dest_dir.join(file);
        if dest.exists() {
            tracing::info!("{} already exists at {:?}", file, dest);
            continue;
        }

        let url = model_file_url(model, file);
        tracing::info!("Downloading {}...", file);
        tracing::info!("  Source: {}", url);
        tracing::info!("  Destination: {:?}", dest);

        if let Err(e) = download_file(client, &url, &dest).await {
            let _ = std::fs::remove_file(&dest);
            return Err(e);
        }

        let file_size = std::fs::metadata(&dest)?.len();
        tracing::info!(
            "  {} complete ({:.1} MB)",
            file,
            file_size as f64 / (1024.0 * 1024.0)
        );
    }

    Ok(dest_dir)
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        ModelsCommand::Download { model } => {
            let model = model.unwrap_or_else(|| config.tagger.model.clone());
            if !KNOWN_TAGGERS.contains(&model.as_str()) {
                tracing::warn!(
                    "{model} is not a known tagger; trying {HF_REPO_OWNER}/{model} anyway"
                );
            }

            let client = reqwest::Client::new();
            let dir = download_tagger(&model, &config.model_dir(), &client).await?;
            tracing::info!("Tagger {} ready in {:?}", model, dir);
        }

        ModelsCommand::List => {
            let model_dir = config.model_dir();
            println!("Tagger models:");
            println!("  Directory: {}\n", model_dir.display());

            for name in KNOWN_TAGGERS {
                let status = model_status(&model_dir, name);
                let default_marker = if *name == config.tagger.model {
                    "  (default)"
                } else {
                    ""
                };
                println!("    - {:32} {:14}{}", name, status.label(), default_marker);
            }

            if !KNOWN_TAGGERS.contains(&config.tagger.model.as_str()) {
                let status = model_status(&model_dir, &config.tagger.model);
                println!(
                    "    - {:32} {:14}  (default, custom)",
                    config.tagger.model,
                    status.label()
                );
            }
        }

        ModelsCommand::Path => {
            println!("{}", config.model_dir().display());
        }
    }

    Ok(())
}

/// Download a file from a URL to a local path, streaming to disk.
async fn download_file(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<()> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    let total_size = response.content_length();
    if let Some(size) = total_size {
        tracing::info!("  Size: {:.1} MB", size as f64 / (1024.0 * 1024.0));
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(total) = total_size {
            if downloaded % (50 * 1024 * 1024) < chunk.len() as u64 {
                tracing::info!(
                    "  Progress: {:.0}%",
                    downloaded as f64 / total as f64 * 100.0
                );
            }
        }
    }

    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_file_url_points_at_main_branch() {
        assert_eq!(
            model_file_url("wd-vit-tagger-v3", "selected_tags.csv"),
            "https://huggingface.co/SmilingWolf/wd-vit-tagger-v3/resolve/main/selected_tags.csv"
        );
    }

    #[test]
    fn test_model_status_reflects_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let name = "wd-vit-tagger-v3";
        assert_eq!(model_status(dir.path(), name), ModelStatus::Missing);

        let model_dir = dir.path().join(name);
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join(CATALOG_FILENAME), "tag_id,name,category\n").unwrap();
        assert_eq!(model_status(dir.path(), name), ModelStatus::Partial);

        std::fs::write(model_dir.join(MODEL_FILENAME), b"onnx").unwrap();
        assert_eq!(model_status(dir.path(), name), ModelStatus::Ready);
    }

    #[test]
    fn test_default_tagger_is_known() {
        let config = Config::default();
        assert!(KNOWN_TAGGERS.contains(&config.tagger.model.as_str()));
    }

    #[tokio::test]
    async fn test_existing_files_are_not_downloaded_again() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("wd-vit-tagger-v3");
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join(CATALOG_FILENAME), "kept").unwrap();
        std::fs::write(model_dir.join(MODEL_FILENAME), "kept").unwrap();

        // Both files exist, so no request is made.
        let client = reqwest::Client::new();
        let out = download_tagger("wd-vit-tagger-v3", dir.path(), &client)
            .await
            .unwrap();
        assert_eq!(out, model_dir);
        assert_eq!(std::fs::read_to_string(model_dir.join(MODEL_FILENAME)).unwrap(), "kept");
    }
}
