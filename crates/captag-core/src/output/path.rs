//! Where an image's caption file lives.

use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Maps image paths to caption file paths.
///
/// Without a save directory, captions sit next to their images. With one, the
/// image's path relative to the data root is mirrored under it.
#[derive(Debug, Clone)]
pub struct CaptionPathResolver {
    data_root: PathBuf,
    data_root_is_file: bool,
    save_dir: Option<PathBuf>,
}

impl CaptionPathResolver {
    /// `data_root` is the run input, a directory or a single image.
    pub fn new(data_root: impl Into<PathBuf>, save_dir: Option<PathBuf>) -> Self {
        let data_root = data_root.into();
        let data_root_is_file = data_root.is_file();
        Self {
            data_root,
            data_root_is_file,
            save_dir,
        }
    }

    /// Like `new`, but without touching the filesystem.
    pub fn with_root_kind(
        data_root: impl Into<PathBuf>,
        data_root_is_file: bool,
        save_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            data_root: data_root.into(),
            data_root_is_file,
            save_dir,
        }
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn save_dir(&self) -> Option<&Path> {
        self.save_dir.as_deref()
    }

    /// Caption path for `image` with `extension`. Pure.
    pub fn resolve(&self, image: &Path, extension: &str) -> PathBuf {
        let extension = normalize_extension(extension);

        let Some(save_dir) = &self.save_dir else {
            return image.with_extension(extension.trim_start_matches('.'));
        };

        let relative = if self.data_root_is_file {
            None
        } else {
            image.strip_prefix(&self.data_root).ok()
        };

        let stem = image
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = format!("{stem}{extension}");

        match relative.and_then(Path::parent) {
            Some(parent) => save_dir.join(parent).join(file_name),
            None => save_dir.join(file_name),
        }
    }

    /// Resolve and create missing parent directories.
    pub fn prepare(&self, image: &Path, extension: &str) -> Result<PathBuf, PipelineError> {
        let path = self.resolve(image, extension);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| PipelineError::CaptionFile {
                    path: path.clone(),
                    source,
                })?;
                tracing::debug!("Created caption directory {:?}", parent);
            }
        }
        Ok(path)
    }
}

/// Ensure the extension starts with a single `.`.
pub fn normalize_extension(extension: &str) -> String {
    format!(".{}", extension.trim().trim_start_matches('.'))
}
