//! Configuration validation with range checks.

use crate::caption::KNOWN_PROVIDERS;
use crate::error::ConfigError;
use crate::tagging::TagReplacement;

use super::Config;

fn check_probability(name: &str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be between 0.0 and 1.0"
        )));
    }
    Ok(())
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }

        let tagger = &self.tagger;
        check_probability("tagger.threshold", tagger.threshold)?;
        if let Some(t) = tagger.general_threshold {
            check_probability("tagger.general_threshold", t)?;
        }
        if let Some(t) = tagger.character_threshold {
            check_probability("tagger.character_threshold", t)?;
        }
        if tagger.caption_separator.is_empty() {
            return Err(ConfigError::ValidationError(
                "tagger.caption_separator must not be empty".into(),
            ));
        }
        if tagger.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "tagger.image_size must be > 0".into(),
            ));
        }
        if tagger.caption_extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::ValidationError(
                "tagger.caption_extension must not be empty".into(),
            ));
        }
        TagReplacement::parse_list(&tagger.tag_replacement)?;

        let caption = &self.caption;
        if !KNOWN_PROVIDERS.contains(&caption.provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "caption.provider must be one of {:?}",
                KNOWN_PROVIDERS
            )));
        }
        if caption.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "caption.max_tokens must be > 0".into(),
            ));
        }
        if caption.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "caption.image_size must be > 0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&caption.temperature) {
            return Err(ConfigError::ValidationError(
                "caption.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if caption.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "caption.timeout_secs must be > 0".into(),
            ));
        }
        if caption.caption_extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::ValidationError(
                "caption.caption_extension must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_thresholds() {
        let mut config = Config::default();
        config.tagger.general_threshold = Some(1.5);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("general_threshold"));

        let mut config = Config::default();
        config.tagger.character_threshold = Some(-0.1);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("character_threshold"));
    }

    #[test]
    fn test_validate_rejects_empty_separator() {
        let mut config = Config::default();
        config.tagger.caption_separator = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("caption_separator"));
    }

    #[test]
    fn test_validate_rejects_malformed_replacement() {
        let mut config = Config::default();
        config.tagger.tag_replacement = "a,b,c".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::TagReplacement(_)));
    }

    #[test]
    fn test_validate_rejects_unknown_provider() {
        let mut config = Config::default();
        config.caption.provider = "carrier-pigeon".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("caption.provider"));
    }

    #[test]
    fn test_validate_rejects_zero_max_tokens() {
        let mut config = Config::default();
        config.caption.max_tokens = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_tokens"));
    }

    #[test]
    fn test_validate_rejects_bare_dot_extension() {
        let mut config = Config::default();
        config.caption.caption_extension = ".".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("caption.caption_extension"));
    }
}
