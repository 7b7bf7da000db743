//! What happens when a caption file already exists.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::PipelineError;

/// Configured behavior for an existing caption file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    /// Leave the existing file alone (checked before inference)
    Skip,
    #[default]
    Overwrite,
    /// `old + new`, no separator
    Append,
    /// `new + old`, no separator
    Prepend,
}

impl std::fmt::Display for FileAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Skip => "skip",
            Self::Overwrite => "overwrite",
            Self::Append => "append",
            Self::Prepend => "prepend",
        };
        f.write_str(name)
    }
}

/// What the writer will do to a caption file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDecision {
    /// File is absent: write the caption
    Create,
    /// File exists and is left untouched
    Keep,
    Replace,
    Append,
    Prepend,
}

impl FileDecision {
    pub fn plan(exists: bool, action: FileAction) -> Self {
        if !exists {
            return Self::Create;
        }
        match action {
            FileAction::Skip => Self::Keep,
            FileAction::Overwrite => Self::Replace,
            FileAction::Append => Self::Append,
            FileAction::Prepend => Self::Prepend,
        }
    }

    /// Whether the caption file is written at all.
    pub fn writes(self) -> bool {
        self != Self::Keep
    }
}

impl std::fmt::Display for FileDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Create => "created",
            Self::Keep => "kept",
            Self::Replace => "overwritten",
            Self::Append => "appended",
            Self::Prepend => "prepended",
        };
        f.write_str(name)
    }
}

/// Final file content for `caption`, or `None` when the file stays untouched.
pub fn merge(existing: Option<&str>, caption: &str, action: FileAction) -> Option<String> {
    match (FileDecision::plan(existing.is_some(), action), existing) {
        (FileDecision::Keep, _) => None,
        (FileDecision::Append, Some(old)) => Some(format!("{old}{caption}")),
        (FileDecision::Prepend, Some(old)) => Some(format!("{caption}{old}")),
        _ => Some(caption.to_string()),
    }
}

/// Applies a `FileAction` to caption files on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptionWriter;

impl CaptionWriter {
    /// Write `caption` to `path` according to `action`.
    ///
    /// At most one read (prepend) and one write. No trailing newline is added.
    pub fn write(
        &self,
        path: &Path,
        caption: &str,
        action: FileAction,
    ) -> Result<FileDecision, PipelineError> {
        let decision = FileDecision::plan(path.exists(), action);
        let io_err = |source: std::io::Error| PipelineError::CaptionFile {
            path: path.to_path_buf(),
            source,
        };

        match decision {
            FileDecision::Keep => {
                tracing::warn!("Caption file {:?} already exists, skipping", path);
            }
            FileDecision::Create => {
                std::fs::write(path, caption).map_err(io_err)?;
            }
            FileDecision::Replace => {
                tracing::warn!("Caption file {:?} already exists, overwriting", path);
                std::fs::write(path, caption).map_err(io_err)?;
            }
            FileDecision::Append => {
                tracing::warn!("Caption file {:?} already exists, appending", path);
                let mut file = OpenOptions::new()
                    .append(true)
                    .open(path)
                    .map_err(io_err)?;
                file.write_all(caption.as_bytes()).map_err(io_err)?;
            }
            FileDecision::Prepend => {
                tracing::warn!("Caption file {:?} already exists, prepending", path);
                let existing = std::fs::read_to_string(path).map_err(io_err)?;
                let merged = merge(Some(&existing), caption, action).unwrap_or_default();
                std::fs::write(path, merged).map_err(io_err)?;
            }
        }

        if decision.writes() {
            tracing::debug!("Caption {} at {:?}: {}", decision, path, caption);
        }
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_without_file_always_creates() {
        for action in [
            FileAction::Skip,
            FileAction::Overwrite,
            FileAction::Append,
            FileAction::Prepend,
        ] {
            assert_eq!(FileDecision::plan(false, action), FileDecision::Create);
        }
    }

    #[test]
    fn test_plan_with_file() {
        assert_eq!(FileDecision::plan(true, FileAction::Skip), FileDecision::Keep);
        assert_eq!(
            FileDecision::plan(true, FileAction::Overwrite),
            FileDecision::Replace
        );
        assert_eq!(
            FileDecision::plan(true, FileAction::Append),
            FileDecision::Append
        );
        assert_eq!(
            FileDecision::plan(true, FileAction::Prepend),
            FileDecision::Prepend
        );
    }

    #[test]
    fn test_merge_content() {
        assert_eq!(merge(None, "new", FileAction::Skip).as_deref(), Some("new"));
        assert_eq!(merge(Some("old"), "new", FileAction::Skip), None);
        assert_eq!(
            merge(Some("old"), "new", FileAction::Overwrite).as_deref(),
            Some("new")
        );
        assert_eq!(
            merge(Some("old"), "new", FileAction::Append).as_deref(),
            Some("oldnew")
        );
        assert_eq!(
            merge(Some("old"), "new", FileAction::Prepend).as_deref(),
            Some("newold")
        );
    }

    #[test]
    fn test_writer_append_is_byte_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "cat, dog\n").unwrap();

        let decision = CaptionWriter
            .write(&path, "sky", FileAction::Append)
            .unwrap();
        assert_eq!(decision, FileDecision::Append);
        assert_eq!(std::fs::read(&path).unwrap(), b"cat, dog\nsky");
    }

    #[test]
    fn test_writer_prepend_and_skip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "old").unwrap();

        CaptionWriter
            .write(&path, "new", FileAction::Prepend)
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "newold");

        let decision = CaptionWriter.write(&path, "zzz", FileAction::Skip).unwrap();
        assert_eq!(decision, FileDecision::Keep);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "newold");
    }

    #[test]
    fn test_writer_creates_without_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.txt");

        let decision = CaptionWriter
            .write(&path, "1girl, solo", FileAction::Skip)
            .unwrap();
        assert_eq!(decision, FileDecision::Create);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1girl, solo");
    }

    #[test]
    fn test_writer_reports_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("c.txt");
        let err = CaptionWriter
            .write(&path, "x", FileAction::Overwrite)
            .unwrap_err();
        assert!(matches!(err, PipelineError::CaptionFile { .. }));
    }
}
