//! Batch loop: one pass (or a tag pass and a caption pass) over the image
//! list with a progress bar, per-image error logging and a summary.

use std::time::{Duration, Instant};

use captag_core::pipeline::{DiscoveredFile, Pass, StageOutcome};
use captag_core::{CaptionRunner, ImageReport, TagFrequency};

/// Counters collected over every pass of a run.
#[derive(Debug, Default)]
pub struct BatchStats {
    pub succeeded: u64,
    pub skipped: u64,
    pub failed: u64,
    pub tag_files: u64,
    pub caption_files: u64,
    pub elapsed: Duration,
}

impl BatchStats {
    /// Count one processed image.
    pub fn record(&mut self, report: &ImageReport) {
        if report.all_skipped() {
            self.skipped += 1;
        } else {
            self.succeeded += 1;
        }
        if matches!(report.tags, Some(StageOutcome::Written { .. })) {
            self.tag_files += 1;
        }
        if matches!(report.caption, Some(StageOutcome::Written { .. })) {
            self.caption_files += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.succeeded + self.skipped + self.failed
    }
}

/// Run every pass the runner asks for over `files`.
///
/// Returns the counters and, when `track_frequency` is set, the tag counts.
pub async fn run_batch(
    runner: &CaptionRunner,
    files: &[DiscoveredFile],
    track_frequency: bool,
) -> (BatchStats, Option<TagFrequency>) {
    let mut stats = BatchStats::default();
    let mut freq = track_frequency.then(TagFrequency::new);
    let start_time = Instant::now();

    let passes = runner.passes();
    for pass in &passes {
        if passes.len() > 1 {
            tracing::info!("Starting {} pass", pass);
        }
        let progress = create_progress_bar(files.len() as u64, *pass);
        let pass_start = Instant::now();
        let mut done: u64 = 0;

        for file in files {
            match runner.process(&file.path, *pass, freq.as_mut()).await {
                Ok(report) => stats.record(&report),
                Err(e) => {
                    stats.failed += 1;
                    progress.suspend(|| tracing::error!("Failed: {:?} - {}", file.path, e));
                }
            }

            done += 1;
            progress.inc(1);
            let elapsed = pass_start.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                progress.set_message(format!("{:.1} img/sec", done as f64 / elapsed));
            }
        }

        progress.finish_and_clear();
    }

    stats.elapsed = start_time.elapsed();
    (stats, freq)
}

fn create_progress_bar(total: u64, pass: Pass) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} {prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_prefix(pass.to_string());
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after the batch.
pub fn print_summary(stats: &BatchStats) {
    let secs = stats.elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        (stats.succeeded + stats.failed) as f64 / secs
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", stats.succeeded);
    if stats.failed > 0 {
        eprintln!("    Failed:       {:>8}", stats.failed);
    }
    if stats.skipped > 0 {
        eprintln!("    Skipped:      {:>8}", stats.skipped);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Tag files:    {:>8}", stats.tag_files);
    eprintln!("    Captions:     {:>8}", stats.caption_files);
    eprintln!("    Total:        {:>8}", stats.total());
    eprintln!("    Duration:     {:>7.1}s", secs);
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ====================================");
}

/// Log every tag with its count, most frequent first.
pub fn report_frequency(freq: &TagFrequency) {
    if freq.is_empty() {
        tracing::info!("No tags were written");
        return;
    }
    tracing::info!("Tag frequencies ({} distinct tags):", freq.len());
    for (tag, count) in freq.sorted() {
        tracing::info!("{tag}: {count}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use captag_core::config::LimitsConfig;
    use captag_core::error::PipelineError;
    use captag_core::output::FileDecision;
    use captag_core::pipeline::TaggerStage;
    use captag_core::tagging::{CatalogLayout, TagCatalog, TagPredictor, ThresholdConfig};
    use captag_core::{CaptionPathResolver, FileAction, ImageDecoder, RunMode, TagScorer};
    use image::{DynamicImage, RgbImage};
    use std::path::{Path, PathBuf};

    struct CatPredictor;

    impl TagPredictor for CatPredictor {
        fn predict(&self, _image: &DynamicImage, _path: &Path) -> Result<Vec<f32>, PipelineError> {
            Ok(vec![0.9, 0.95, 0.2])
        }
    }

    fn runner(root: &Path, action: FileAction) -> CaptionRunner {
        let catalog = TagCatalog::from_parts(
            vec!["general".into()],
            vec!["cat".into(), "dog".into()],
            vec![],
            CatalogLayout::Categorized,
        );
        let stage = TaggerStage::new(
            Box::new(CatPredictor),
            TagScorer::new(catalog, ThresholdConfig::default()),
            ".txt",
            action,
        );
        CaptionRunner::new(
            CaptionPathResolver::new(root, None),
            ImageDecoder::new(LimitsConfig::default()),
            RunMode::Sync,
        )
        .with_tagger(stage)
    }

    fn discovered(path: PathBuf) -> DiscoveredFile {
        DiscoveredFile { path, size: 0 }
    }

    #[test]
    fn test_stats_count_written_and_skipped() {
        let mut stats = BatchStats::default();
        stats.record(&ImageReport {
            path: PathBuf::from("a.png"),
            tags: Some(StageOutcome::Written {
                path: PathBuf::from("a.txt"),
                decision: FileDecision::Create,
                text: "cat".to_string(),
            }),
            caption: Some(StageOutcome::Skipped {
                path: PathBuf::from("a.caption"),
            }),
        });
        stats.record(&ImageReport {
            path: PathBuf::from("b.png"),
            tags: Some(StageOutcome::Skipped {
                path: PathBuf::from("b.txt"),
            }),
            caption: None,
        });

        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.tag_files, 1);
        assert_eq!(stats.caption_files, 0);
        assert_eq!(stats.total(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_image_is_counted_and_loop_continues() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("a_bad.png");
        std::fs::write(&bad, b"not an image").unwrap();
        let good = dir.path().join("b_good.png");
        RgbImage::new(4, 4).save(&good).unwrap();

        let runner = runner(dir.path(), FileAction::Overwrite);
        let files = vec![discovered(bad.clone()), discovered(good.clone())];
        let (stats, freq) = run_batch(&runner, &files, true).await;

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.succeeded, 1);
        assert!(!bad.with_extension("txt").exists());
        assert_eq!(std::fs::read_to_string(good.with_extension("txt")).unwrap(), "cat");

        let freq = freq.unwrap();
        assert_eq!(freq.get("cat"), 1);
        assert_eq!(freq.get("dog"), 0);
    }

    #[tokio::test]
    async fn test_existing_files_are_skipped_without_decoding() {
        let dir = tempfile::tempdir().unwrap();
        // Not a decodable image: the skip must happen before decoding.
        let image = dir.path().join("c.png");
        std::fs::write(&image, b"junk").unwrap();
        std::fs::write(image.with_extension("txt"), "old").unwrap();

        let runner = runner(dir.path(), FileAction::Skip);
        let (stats, freq) = run_batch(&runner, &[discovered(image.clone())], false).await;

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 0);
        assert!(freq.is_none());
        assert_eq!(std::fs::read_to_string(image.with_extension("txt")).unwrap(), "old");
    }
}
