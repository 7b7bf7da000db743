//! Tag catalog loading for the tag classifier.
//!
//! The catalog is a CSV table (`selected_tags.csv`) with a
//! `tag_id|id, name, category` header. Rows are split into rating (`9`),
//! character (`4`) and general (`0`) tags, keeping file order, which is the
//! order of the model's output vector.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Underscore-bearing tags that must keep their underscores.
pub const KAOMOJIS: &[&str] = &[
    "0_0", "(o)_(o)", "+_+", "+_-", "._.", "<o>_<o>", "<|>_<|>", "=_=", ">_<", "3_3", "6_9",
    ">_o", "@_@", "^_^", "o_o", "u_u", "x_x", "|_|", "||_||",
];

const CATEGORY_GENERAL: &str = "0";
const CATEGORY_CHARACTER: &str = "4";
const CATEGORY_RATING: &str = "9";

/// How catalog rows map onto the model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogLayout {
    /// Rating, general and character segments (WD tagger family)
    Categorized,
    /// Every row is a general tag
    GeneralOnly,
}

impl CatalogLayout {
    /// WD taggers (`wd-*`) carry rating and character tags; other families don't.
    pub fn infer_from_model(model: &str) -> Self {
        if model.to_lowercase().starts_with("wd") {
            Self::Categorized
        } else {
            Self::GeneralOnly
        }
    }

    pub fn has_categories(self) -> bool {
        matches!(self, Self::Categorized)
    }
}

/// One `source -> target` tag rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagReplacement {
    pub source: String,
    pub target: String,
}

impl TagReplacement {
    /// Parse `source,target;source2,target2`.
    ///
    /// `\,` and `\;` stand for literal commas and semicolons inside tag names.
    /// Empty entries are ignored; any other entry must have exactly two parts.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, ConfigError> {
        const COMMA: char = '\u{1}';
        const SEMI: char = '\u{2}';

        let escaped = list.replace("\\,", &COMMA.to_string()).replace("\\;", &SEMI.to_string());
        let unescape = |s: &str| s.replace(COMMA, ",").replace(SEMI, ";");

        let mut replacements = Vec::new();
        for entry in escaped.split(';') {
            if entry.trim().is_empty() {
                continue;
            }
            let parts: Vec<&str> = entry.split(',').collect();
            if parts.len() != 2 {
                return Err(ConfigError::TagReplacement(list.to_string()));
            }
            replacements.push(Self {
                source: unescape(parts[0]),
                target: unescape(parts[1]),
            });
        }
        Ok(replacements)
    }
}

/// Text transforms applied once, at catalog load time.
#[derive(Debug, Clone)]
pub struct TagTransforms {
    /// `name_(series)` becomes `name{separator}series`
    pub expand_character_tags: bool,
    /// `_` becomes ` ` for tags longer than three characters, kaomoji excepted
    pub remove_underscore: bool,
    pub replacements: Vec<TagReplacement>,
    pub separator: String,
}

impl Default for TagTransforms {
    fn default() -> Self {
        Self {
            expand_character_tags: false,
            remove_underscore: false,
            replacements: vec![],
            separator: ", ".to_string(),
        }
    }
}

/// Ordered tag names for each category.
#[derive(Debug, Clone)]
pub struct TagCatalog {
    rating: Vec<String>,
    general: Vec<String>,
    character: Vec<String>,
    layout: CatalogLayout,
}

impl TagCatalog {
    /// Build a catalog directly from its segments.
    ///
    /// For `GeneralOnly`, rating and character segments are discarded.
    pub fn from_parts(
        rating: Vec<String>,
        general: Vec<String>,
        character: Vec<String>,
        layout: CatalogLayout,
    ) -> Self {
        match layout {
            CatalogLayout::Categorized => Self {
                rating,
                general,
                character,
                layout,
            },
            CatalogLayout::GeneralOnly => Self {
                rating: vec![],
                general,
                character: vec![],
                layout,
            },
        }
    }

    /// Read, parse and transform a catalog file.
    pub fn load(
        path: &Path,
        layout: CatalogLayout,
        transforms: &TagTransforms,
    ) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::CatalogRead {
                path: path.to_path_buf(),
                message: "file not found".to_string(),
            });
        }
        tracing::info!("Loading tags from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut catalog = Self::parse(&content, layout, path)?;
        catalog.apply(transforms);

        tracing::debug!(
            "Catalog: {} rating, {} general, {} character tags",
            catalog.rating.len(),
            catalog.general.len(),
            catalog.character.len()
        );
        Ok(catalog)
    }

    /// Parse catalog CSV content. `path` is only used in error messages.
    pub fn parse(content: &str, layout: CatalogLayout, path: &Path) -> Result<Self, ConfigError> {
        let mut lines = content
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty());

        let header_line = lines.next().unwrap_or_default();
        let header = split_csv_line(header_line.trim_start_matches('\u{feff}'));
        let header_ok = header.len() >= 3
            && (header[0] == "tag_id" || header[0] == "id")
            && header[1] == "name"
            && header[2] == "category";
        if !header_ok {
            return Err(ConfigError::CatalogHeader {
                path: path.to_path_buf(),
                header,
            });
        }

        let mut rating = Vec::new();
        let mut general = Vec::new();
        let mut character = Vec::new();

        for (line_no, line) in lines.enumerate() {
            let row = split_csv_line(line);
            if row.len() < 3 {
                return Err(ConfigError::CatalogRead {
                    path: PathBuf::from(path),
                    message: format!("row {} has {} column(s), expected 3", line_no + 2, row.len()),
                });
            }
            let name = row[1].clone();
            match layout {
                CatalogLayout::GeneralOnly => general.push(name),
                CatalogLayout::Categorized => match row[2].as_str() {
                    CATEGORY_RATING => rating.push(name),
                    CATEGORY_CHARACTER => character.push(name),
                    CATEGORY_GENERAL => general.push(name),
                    _ => {}
                },
            }
        }

        Ok(Self::from_parts(rating, general, character, layout))
    }

    /// Apply load-time transforms: expansion, underscore removal, replacement.
    pub fn apply(&mut self, transforms: &TagTransforms) {
        let categorized = self.layout.has_categories();

        if transforms.expand_character_tags {
            if categorized {
                tracing::info!(
                    "Character tag expansion enabled: `name_(series)` becomes `name{}series`",
                    transforms.separator
                );
                for tag in &mut self.character {
                    *tag = expand_character_tag(tag, &transforms.separator);
                }
            } else {
                tracing::warn!("Catalog has no character tags, skipping character tag expansion");
            }
        }

        if transforms.remove_underscore {
            tracing::debug!("Replacing `_` with ` ` in tag names");
            for tag in self
                .rating
                .iter_mut()
                .chain(self.general.iter_mut())
                .chain(self.character.iter_mut())
            {
                *tag = remove_underscore(tag);
            }
        }

        for replacement in &transforms.replacements {
            tracing::info!("Replacing tag: {} -> {}", replacement.source, replacement.target);
            let slot = self
                .general
                .iter_mut()
                .chain(self.character.iter_mut())
                .chain(self.rating.iter_mut())
                .find(|t| **t == replacement.source);
            match slot {
                Some(tag) => *tag = replacement.target.clone(),
                None => tracing::warn!("Tag to replace not found in catalog: {}", replacement.source),
            }
        }
    }

    pub fn rating(&self) -> &[String] {
        &self.rating
    }

    pub fn general(&self) -> &[String] {
        &self.general
    }

    pub fn character(&self) -> &[String] {
        &self.character
    }

    pub fn layout(&self) -> CatalogLayout {
        self.layout
    }

    /// Total number of tags, equal to the expected model output length.
    pub fn len(&self) -> usize {
        self.rating.len() + self.general.len() + self.character.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split a tag list on the trimmed separator, dropping blanks.
///
/// Falls back to whitespace when the separator is only whitespace.
pub fn parse_tag_list(list: &str, separator: &str) -> Vec<String> {
    let sep = separator.trim();
    let parts: Vec<&str> = if sep.is_empty() {
        list.split_whitespace().collect()
    } else {
        list.split(sep).collect()
    };
    parts
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

fn expand_character_tag(tag: &str, separator: &str) -> String {
    if !tag.ends_with(')') {
        return tag.to_string();
    }
    let Some(open) = tag.rfind('(') else {
        return tag.to_string();
    };
    let name = &tag[..open];
    let name = name.strip_suffix('_').unwrap_or(name);
    let series = tag[open + 1..].replace(')', "");
    format!("{name}{separator}{series}")
}

fn remove_underscore(tag: &str) -> String {
    if tag.chars().count() > 3 && !KAOMOJIS.contains(&tag) {
        tag.replace('_', " ")
    } else {
        tag.to_string()
    }
}

/// Minimal CSV field splitter: commas, double-quoted fields, `""` escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "tag_id,name,category,count\n\
        9999999,general,9,807691\n\
        9999998,sensitive,9,3447665\n\
        470575,1girl,0,4225150\n\
        212816,solo,0,3414163\n\
        1,^_^,0,10\n\
        1709,long_hair,0,2898315\n\
        2,hatsune_miku_(vocaloid),4,100\n\
        3,\"tohsaka_rin\",4,50\n";

    fn parse(layout: CatalogLayout) -> TagCatalog {
        TagCatalog::parse(SAMPLE, layout, Path::new("selected_tags.csv")).unwrap()
    }

    #[test]
    fn test_parse_splits_categories_in_file_order() {
        let catalog = parse(CatalogLayout::Categorized);
        assert_eq!(catalog.rating(), ["general", "sensitive"]);
        assert_eq!(catalog.general(), ["1girl", "solo", "^_^", "long_hair"]);
        assert_eq!(catalog.character(), ["hatsune_miku_(vocaloid)", "tohsaka_rin"]);
        assert_eq!(catalog.len(), 8);
    }

    #[test]
    fn test_general_only_treats_every_row_as_general() {
        let catalog = parse(CatalogLayout::GeneralOnly);
        assert!(catalog.rating().is_empty());
        assert!(catalog.character().is_empty());
        assert_eq!(catalog.general().len(), 8);
    }

    #[test]
    fn test_id_header_variant_accepted() {
        let content = "id,name,category\n1,cat,0\n";
        let catalog =
            TagCatalog::parse(content, CatalogLayout::Categorized, Path::new("t.csv")).unwrap();
        assert_eq!(catalog.general(), ["cat"]);
    }

    #[test]
    fn test_bad_header_is_fatal() {
        let content = "name,tag_id,category\ncat,1,0\n";
        let err = TagCatalog::parse(content, CatalogLayout::Categorized, Path::new("t.csv"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::CatalogHeader { .. }));
    }

    #[test]
    fn test_short_row_is_fatal() {
        let content = "tag_id,name,category\n1,cat\n";
        let err = TagCatalog::parse(content, CatalogLayout::Categorized, Path::new("t.csv"))
            .unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_remove_underscore_spares_kaomoji_and_short_tags() {
        let mut catalog = parse(CatalogLayout::Categorized);
        catalog.apply(&TagTransforms {
            remove_underscore: true,
            ..Default::default()
        });
        assert_eq!(catalog.general(), ["1girl", "solo", "^_^", "long hair"]);
        assert_eq!(catalog.character()[0], "hatsune miku (vocaloid)");
    }

    #[test]
    fn test_character_expansion_runs_before_underscore_removal() {
        let mut catalog = parse(CatalogLayout::Categorized);
        catalog.apply(&TagTransforms {
            expand_character_tags: true,
            remove_underscore: true,
            ..Default::default()
        });
        assert_eq!(catalog.character(), ["hatsune miku, vocaloid", "tohsaka rin"]);
    }

    #[test]
    fn test_replacement_prefers_general_then_character() {
        let mut catalog = parse(CatalogLayout::Categorized);
        catalog.apply(&TagTransforms {
            replacements: TagReplacement::parse_list("1girl,1woman;tohsaka_rin,rin").unwrap(),
            ..Default::default()
        });
        assert_eq!(catalog.general()[0], "1woman");
        assert_eq!(catalog.character()[1], "rin");
    }

    #[test]
    fn test_replacement_parse_handles_escapes() {
        let list = TagReplacement::parse_list("a\\,b,c\\;d;;x,y").unwrap();
        assert_eq!(
            list,
            vec![
                TagReplacement {
                    source: "a,b".into(),
                    target: "c;d".into()
                },
                TagReplacement {
                    source: "x".into(),
                    target: "y".into()
                },
            ]
        );
        assert!(TagReplacement::parse_list("").unwrap().is_empty());
    }

    #[test]
    fn test_replacement_parse_rejects_wrong_arity() {
        assert!(TagReplacement::parse_list("lonely").is_err());
        assert!(TagReplacement::parse_list("a,b,c").is_err());
    }

    #[test]
    fn test_expand_without_open_paren_is_unchanged() {
        assert_eq!(expand_character_tag("smile)", ", "), "smile)");
        assert_eq!(expand_character_tag("plain", ", "), "plain");
    }

    #[test]
    fn test_parse_tag_list() {
        assert_eq!(parse_tag_list("a, b ,, c", ", "), vec!["a", "b", "c"]);
        assert_eq!(parse_tag_list("a b", " "), vec!["a", "b"]);
        assert!(parse_tag_list("", ", ").is_empty());
    }

    #[test]
    fn test_infer_layout_from_model_name() {
        assert_eq!(
            CatalogLayout::infer_from_model("WD-vit-tagger-v3"),
            CatalogLayout::Categorized
        );
        assert_eq!(
            CatalogLayout::infer_from_model("joytag"),
            CatalogLayout::GeneralOnly
        );
    }

    #[test]
    fn test_load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selected_tags.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let catalog =
            TagCatalog::load(&path, CatalogLayout::Categorized, &TagTransforms::default()).unwrap();
        assert_eq!(catalog.len(), 8);

        let missing = TagCatalog::load(
            &dir.path().join("nope.csv"),
            CatalogLayout::Categorized,
            &TagTransforms::default(),
        );
        assert!(matches!(missing, Err(ConfigError::CatalogRead { .. })));
    }
}
