use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid retrieval limit: {0}. Must be at least 1")]
    InvalidLimit(usize),

    #[error("Invalid fusion weight: {0}. Must be between 0.0 and 1.0")]
    InvalidWeight(f32),

    #[error("Fusion weights sum to {0}. At least one weight must be positive")]
    ZeroWeights(f32),

    #[error("Invalid max_hops: {0}. Must be between 1 and 4")]
    InvalidMaxHops(usize),

    #[error("Invalid cache capacity: {0}. Must be at least 1")]
    InvalidCacheCapacity(usize),

    #[error("Invalid cache TTL: {0}s. Must be positive")]
    InvalidCacheTtl(u64),

    #[error("Invalid max_turns: {0}. Must be at least 1")]
    InvalidMaxTurns(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid max_tokens: {0}. Must be at least 1")]
    InvalidMaxTokens(u32),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .attest/config.yaml (project config)
    /// 3. .attest/local.yaml (project local overrides, optional)
    /// 4. Environment variables (ATTEST_* prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.attest/) so multiple
    /// corpora on one machine can use different settings.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".attest/config.yaml"))
            .merge(Yaml::file(".attest/local.yaml"))
            .merge(Env::prefixed("ATTEST_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.retrieval.limit == 0 {
            return Err(ConfigError::InvalidLimit(config.retrieval.limit));
        }

        for weight in [
            config.retrieval.semantic_weight,
            config.retrieval.keyword_weight,
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::InvalidWeight(weight));
            }
        }

        let weight_sum = config.retrieval.semantic_weight + config.retrieval.keyword_weight;
        if weight_sum <= 0.0 {
            return Err(ConfigError::ZeroWeights(weight_sum));
        }

        if !(1..=4).contains(&config.retrieval.max_hops) {
            return Err(ConfigError::InvalidMaxHops(config.retrieval.max_hops));
        }

        if config.cache.capacity == 0 {
            return Err(ConfigError::InvalidCacheCapacity(config.cache.capacity));
        }

        if config.cache.ttl_secs == 0 {
            return Err(ConfigError::InvalidCacheTtl(config.cache.ttl_secs));
        }

        if config.conversation.max_turns == 0 {
            return Err(ConfigError::InvalidMaxTurns(config.conversation.max_turns));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.completion.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens(config.completion.max_tokens));
        }

        if config.completion.model.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Completion model cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.retrieval.limit, 5);
        assert_eq!(config.cache.capacity, 1000);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
retrieval:
  limit: 8
  semantic_weight: 0.6
  keyword_weight: 0.4
  max_hops: 3
cache:
  capacity: 50
  ttl_secs: 30
logging:
  level: debug
  format: pretty
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.retrieval.limit, 8);
        assert!((config.retrieval.semantic_weight - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.retrieval.max_hops, 3);
        assert_eq!(config.cache.capacity, 50);
        assert_eq!(config.cache.ttl_secs, 30);
        assert_eq!(config.logging.level, "debug");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "retrieval:\n  limit: 3\ncache:\n  capacity: 7").unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.retrieval.limit, 3);
        assert_eq!(config.cache.capacity, 7);
        // Untouched sections keep defaults.
        assert_eq!(config.conversation.max_turns, 10);
    }

    fn config_with_retrieval(retrieval: crate::domain::models::RetrievalConfig) -> Config {
        Config {
            retrieval,
            ..Config::default()
        }
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let config = config_with_retrieval(crate::domain::models::RetrievalConfig {
            limit: 0,
            ..Default::default()
        });
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLimit(0)),
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range_weight() {
        let config = config_with_retrieval(crate::domain::models::RetrievalConfig {
            semantic_weight: 1.5,
            ..Default::default()
        });
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidWeight(_)),
        ));
    }

    #[test]
    fn test_validate_rejects_zero_weights() {
        let config = config_with_retrieval(crate::domain::models::RetrievalConfig {
            semantic_weight: 0.0,
            keyword_weight: 0.0,
            ..Default::default()
        });
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ZeroWeights(_)),
        ));
    }

    #[test]
    fn test_validate_rejects_bad_max_hops() {
        let config = config_with_retrieval(crate::domain::models::RetrievalConfig {
            max_hops: 9,
            ..Default::default()
        });
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxHops(9)),
        ));
    }

    #[test]
    fn test_validate_rejects_bad_log_level() {
        let config = Config {
            logging: crate::domain::models::LoggingConfig {
                level: "verbose".to_string(),
                ..Default::default()
            },
            ..Config::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_)),
        ));
    }

    #[test]
    fn test_validate_rejects_zero_cache_capacity() {
        let config = Config {
            cache: crate::domain::models::CacheConfig {
                capacity: 0,
                ..Default::default()
            },
            ..Config::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidCacheCapacity(0)),
        ));
    }
}
