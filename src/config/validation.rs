use crate::config::types::{
    CategoryEntry, Config, FetchConfig, OrchestratorConfig, PlatformConfig, ValidationConfig,
};
use crate::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetch_config(&config.fetch)?;
    validate_orchestrator_config(&config.orchestrator)?;
    validate_platforms(&config.platforms)?;
    validate_categories(&config.categories, &config.default_category)?;
    validate_rule_bounds(&config.validation)?;
    Ok(())
}

/// Validates requester configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.delay_min_ms > config.delay_max_ms {
        return Err(ConfigError::Validation(format!(
            "delay-min-ms ({}) must not exceed delay-max-ms ({})",
            config.delay_min_ms, config.delay_max_ms
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(
            "max-retries must be >= 1".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agents.is_empty() || config.user_agents.iter().any(|ua| ua.trim().is_empty())
    {
        return Err(ConfigError::Validation(
            "user-agents must be a non-empty list of non-empty strings".to_string(),
        ));
    }

    Ok(())
}

/// Validates orchestrator configuration
fn validate_orchestrator_config(config: &OrchestratorConfig) -> Result<(), ConfigError> {
    if config.max_parallel_platforms < 1 {
        return Err(ConfigError::Validation(format!(
            "max-parallel-platforms must be >= 1, got {}",
            config.max_parallel_platforms
        )));
    }

    if config.max_pages_per_keyword < 1 {
        return Err(ConfigError::Validation(
            "max-pages-per-keyword must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates platform entries
fn validate_platforms(platforms: &[PlatformConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for platform in platforms {
        if platform.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "platform id cannot be empty".to_string(),
            ));
        }

        if !seen.insert(platform.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate platform id '{}'",
                platform.id
            )));
        }

        if platform.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "platform '{}' must have a display name",
                platform.id
            )));
        }

        let url = Url::parse(&platform.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid base-url for platform '{}': {}",
                platform.id, e
            ))
        })?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::InvalidUrl(format!(
                "base-url for platform '{}' must be http(s), got '{}'",
                platform.id,
                url.scheme()
            )));
        }

        if !platform.search_path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "search-path for platform '{}' must start with '/'",
                platform.id
            )));
        }

        if platform.page_size < 1 {
            return Err(ConfigError::Validation(format!(
                "page-size for platform '{}' must be >= 1",
                platform.id
            )));
        }
    }

    Ok(())
}

/// Validates the category table
fn validate_categories(
    categories: &[CategoryEntry],
    default_category: &str,
) -> Result<(), ConfigError> {
    if default_category.trim().is_empty() {
        return Err(ConfigError::Validation(
            "default-category cannot be empty".to_string(),
        ));
    }

    for entry in categories {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category name cannot be empty".to_string(),
            ));
        }

        if entry.keywords.iter().any(|k| k.is_empty()) {
            return Err(ConfigError::Validation(format!(
                "category '{}' contains an empty keyword",
                entry.name
            )));
        }
    }

    Ok(())
}

/// Validates rule bounds and compiles the title patterns once
fn validate_rule_bounds(config: &ValidationConfig) -> Result<(), ConfigError> {
    if config.title_min_length > config.title_max_length {
        return Err(ConfigError::Validation(
            "title-min-length must not exceed title-max-length".to_string(),
        ));
    }

    if config.content_min_length > config.content_max_length {
        return Err(ConfigError::Validation(
            "content-min-length must not exceed content-max-length".to_string(),
        ));
    }

    for pattern in &config.title_patterns {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("title pattern '{}': {}", pattern, e))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_inverted_delay_range_rejected() {
        let mut config = Config::default();
        config.fetch.delay_min_ms = 5000;
        config.fetch.delay_max_ms = 100;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let mut config = Config::default();
        config.fetch.max_retries = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_user_agent_pool_rejected() {
        let mut config = Config::default();
        config.fetch.user_agents.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_duplicate_platform_ids_rejected() {
        let mut config = Config::default();
        let first = config.platforms[0].clone();
        config.platforms.push(first);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let mut config = Config::default();
        config.platforms[0].base_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_bad_title_pattern_rejected() {
        let mut config = Config::default();
        config.validation.title_patterns = vec!["[unclosed".to_string()];
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_zero_pool_rejected() {
        let mut config = Config::default();
        config.orchestrator.max_parallel_platforms = 0;
        assert!(validate(&config).is_err());
    }
}
