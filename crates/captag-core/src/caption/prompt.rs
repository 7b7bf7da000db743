//! Prompt defaults and assembly.

/// Placeholder replaced by the image's tag text.
pub const TAGS_PLACEHOLDER: &str = "{tags}";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert at describing images. \
Look at the people and their clothing and actions, the objects and how they are placed, \
the setting and lighting, and any visible text or watermarks. \
Describe what is there objectively and accurately.";

pub const DEFAULT_USER_PROMPT: &str = "Describe this image in one cohesive paragraph. \
Be accurate and concise, focus on the most relevant details, and do not use line breaks.";

pub const DEFAULT_USER_PROMPT_WITH_TAGS: &str = "Describe this image in one cohesive paragraph. \
Be accurate and concise, focus on the most relevant details, and do not use line breaks. \
These tags were detected in the image and may help: {tags}";

/// Pick and fill the user prompt.
///
/// With tag text, `with_tags` is used and `{tags}` substituted, or the tags are
/// appended when the template has no placeholder. Otherwise `plain` is used.
pub fn build_user_prompt(plain: &str, with_tags: &str, tags: Option<&str>) -> String {
    match tags.map(str::trim).filter(|t| !t.is_empty()) {
        Some(tags) if with_tags.contains(TAGS_PLACEHOLDER) => {
            with_tags.replace(TAGS_PLACEHOLDER, tags)
        }
        Some(tags) => format!("{with_tags}{tags}"),
        None => plain.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_substituted() {
        let prompt = build_user_prompt("plain", "Tags: {tags}.", Some("cat, dog"));
        assert_eq!(prompt, "Tags: cat, dog.");
    }

    #[test]
    fn test_tags_appended_without_placeholder() {
        let prompt = build_user_prompt("plain", "Hints: ", Some("cat"));
        assert_eq!(prompt, "Hints: cat");
    }

    #[test]
    fn test_no_tags_uses_plain_prompt() {
        assert_eq!(build_user_prompt("plain", "{tags}", None), "plain");
        assert_eq!(build_user_prompt("plain", "{tags}", Some("  ")), "plain");
    }

    #[test]
    fn test_default_template_has_placeholder() {
        assert!(DEFAULT_USER_PROMPT_WITH_TAGS.contains(TAGS_PLACEHOLDER));
    }
}
