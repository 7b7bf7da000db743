//! CLI enum types for the run command: method, mode, file action, rating, provider.

use captag_core::tagging::RatingPlacement;
use captag_core::{CaptionMethod, FileAction, RunMode};
use clap::ValueEnum;

/// Which models to run.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Method {
    /// Tag classifier only
    Tags,
    /// Vision-language caption model only
    Caption,
    /// Both models
    Both,
}

impl From<Method> for CaptionMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Tags => CaptionMethod::Tags,
            Method::Caption => CaptionMethod::Caption,
            Method::Both => CaptionMethod::Both,
        }
    }
}

/// How the two models are ordered.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Mode {
    /// Tag and caption each image before the next
    Sync,
    /// Tag every image first, then caption every image
    Queue,
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Sync => RunMode::Sync,
            Mode::Queue => RunMode::Queue,
        }
    }
}

/// What to do with an existing caption file.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Action {
    Skip,
    Overwrite,
    Append,
    Prepend,
}

impl From<Action> for FileAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Skip => FileAction::Skip,
            Action::Overwrite => FileAction::Overwrite,
            Action::Append => FileAction::Append,
            Action::Prepend => FileAction::Prepend,
        }
    }
}

/// Where to put the rating tag.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Rating {
    First,
    Last,
}

impl From<Rating> for RatingPlacement {
    fn from(rating: Rating) -> Self {
        match rating {
            Rating::First => RatingPlacement::First,
            Rating::Last => RatingPlacement::Last,
        }
    }
}

/// Supported caption providers.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Provider {
    /// Local Ollama instance
    Ollama,
    /// OpenAI or an OpenAI-compatible server
    Openai,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Ollama => write!(f, "ollama"),
            Provider::Openai => write!(f, "openai"),
        }
    }
}
