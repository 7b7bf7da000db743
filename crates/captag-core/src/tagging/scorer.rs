//! Turns a probability vector into an ordered, thresholded tag list.
//!
//! The vector is aligned to the catalog: rating `[0, R)`, general
//! `[R, R+G)`, character `[R+G, R+G+C)`. Each category has its own threshold;
//! the rating category instead contributes its single most likely tag.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::catalog::{CatalogLayout, TagCatalog};
use super::frequency::TagFrequency;

/// Where the rating tag goes in the combined caption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingPlacement {
    #[default]
    None,
    First,
    Last,
}

/// Scoring thresholds and ordering flags.
#[derive(Debug, Clone)]
pub struct ThresholdConfig {
    pub general: Option<f32>,
    pub character: Option<f32>,
    /// Used for any category without its own threshold
    pub fallback: f32,
    pub rating: RatingPlacement,
    pub character_first: bool,
    pub always_first: Vec<String>,
    pub undesired: HashSet<String>,
    pub separator: String,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            general: None,
            character: None,
            fallback: 0.35,
            rating: RatingPlacement::None,
            character_first: false,
            always_first: vec![],
            undesired: HashSet::new(),
            separator: ", ".to_string(),
        }
    }
}

/// Effective per-category thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedThresholds {
    pub general: f32,
    pub character: f32,
}

impl ThresholdConfig {
    /// Fill unset thresholds from the fallback. Uncategorized catalogs
    /// always use the fallback.
    pub fn resolve(&self, layout: CatalogLayout) -> ResolvedThresholds {
        match layout {
            CatalogLayout::Categorized => ResolvedThresholds {
                general: self.general.unwrap_or(self.fallback),
                character: self.character.unwrap_or(self.fallback),
            },
            CatalogLayout::GeneralOnly => ResolvedThresholds {
                general: self.fallback,
                character: self.fallback,
            },
        }
    }
}

/// Scoring result for one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoredTags {
    /// Combined, ordered tag sequence
    pub tags: Vec<String>,
    /// `tags` joined by the separator
    pub text: String,
    pub rating_text: String,
    pub character_text: String,
    pub general_text: String,
}

/// Applies thresholds and ordering rules against a fixed catalog.
pub struct TagScorer {
    catalog: TagCatalog,
    config: ThresholdConfig,
    thresholds: ResolvedThresholds,
}

impl TagScorer {
    pub fn new(catalog: TagCatalog, config: ThresholdConfig) -> Self {
        let thresholds = config.resolve(catalog.layout());
        tracing::debug!(
            "Tag thresholds: general={}, character={}",
            thresholds.general,
            thresholds.character
        );
        Self {
            catalog,
            config,
            thresholds,
        }
    }

    pub fn catalog(&self) -> &TagCatalog {
        &self.catalog
    }

    pub fn thresholds(&self) -> ResolvedThresholds {
        self.thresholds
    }

    pub fn separator(&self) -> &str {
        &self.config.separator
    }

    /// Score one probability vector.
    ///
    /// Tags written to the combined sequence are counted in `freq` when given.
    pub fn score(&self, probs: &[f32], mut freq: Option<&mut TagFrequency>) -> ScoredTags {
        let rating_len = self.catalog.rating().len();
        let general_len = self.catalog.general().len();

        let mut tags: Vec<String> = Vec::new();
        let mut general_tags: Vec<&str> = Vec::new();
        let mut character_tags: Vec<&str> = Vec::new();
        let mut rating_text = String::new();

        let general_probs = probs.iter().skip(rating_len);
        for (name, &p) in self.catalog.general().iter().zip(general_probs) {
            if p.is_nan() || p < self.thresholds.general || self.is_undesired(name) {
                continue;
            }
            general_tags.push(name);
            if push_unique(&mut tags, name, false) {
                record(&mut freq, name);
            }
        }

        let character_probs = probs.iter().skip(rating_len + general_len);
        for (name, &p) in self.catalog.character().iter().zip(character_probs) {
            if p.is_nan() || p < self.thresholds.character || self.is_undesired(name) {
                continue;
            }
            character_tags.push(name);
            if push_unique(&mut tags, name, self.config.character_first) {
                record(&mut freq, name);
            }
        }

        if self.config.rating != RatingPlacement::None && self.catalog.layout().has_categories() {
            if let Some(name) = self.top_rating(probs) {
                if !self.is_undesired(name) {
                    rating_text = name.to_string();
                    let front = self.config.rating == RatingPlacement::First;
                    if push_unique(&mut tags, name, front) {
                        record(&mut freq, name);
                    }
                }
            }
        }

        // Promote in reverse so the head ends up in declared order.
        for tag in self.config.always_first.iter().rev() {
            if let Some(pos) = tags.iter().position(|t| t == tag) {
                let promoted = tags.remove(pos);
                tags.insert(0, promoted);
            }
        }

        let separator = self.config.separator.as_str();
        ScoredTags {
            text: tags.join(separator),
            general_text: general_tags.join(separator),
            character_text: character_tags.join(separator),
            rating_text,
            tags,
        }
    }

    fn is_undesired(&self, tag: &str) -> bool {
        self.config.undesired.contains(tag)
    }

    /// Most likely rating tag; the first maximum wins ties. NaN scores never win.
    fn top_rating(&self, probs: &[f32]) -> Option<&str> {
        let mut best: Option<(&str, f32)> = None;
        for (name, &p) in self.catalog.rating().iter().zip(probs) {
            if p.is_nan() {
                continue;
            }
            match best {
                Some((_, best_p)) if p <= best_p => {}
                _ => best = Some((name.as_str(), p)),
            }
        }
        best.map(|(name, _)| name)
    }
}

fn push_unique(tags: &mut Vec<String>, tag: &str, front: bool) -> bool {
    if tags.iter().any(|t| t == tag) {
        return false;
    }
    if front {
        tags.insert(0, tag.to_string());
    } else {
        tags.push(tag.to_string());
    }
    true
}

fn record(freq: &mut Option<&mut TagFrequency>, tag: &str) {
    if let Some(freq) = freq {
        freq.record(tag);
    }
}
