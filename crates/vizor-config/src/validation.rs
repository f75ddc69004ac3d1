//! Configuration validation module.
//!
//! Every rule runs and every failure is collected, so a broken deployment
//! reports all of its problems at once instead of one per restart.

use crate::{AppConfig, CacheType};
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// JWT secret is too short (minimum 32 bytes).
    JwtSecretTooShort { actual: usize, minimum: usize },
    /// A cache block is set to the null placeholder.
    NullCacheBackend { name: String },
    /// Sentinel mode without any sentinel nodes.
    MissingSentinels,
    /// Sentinel mode without a master service name.
    MissingMasterName,
    /// Port number is invalid (must be 1-65535).
    InvalidPort { name: String, value: u16 },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Timeout value must be positive.
    NonPositiveTimeout { name: String, value: f64 },
    /// Stream retention limit must be positive.
    InvalidStreamLimit { name: String },
    /// Cookie name must not be empty.
    EmptyCookieName,
    /// Component class name must not be empty.
    EmptyClassName { name: String },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JwtSecretTooShort { actual, minimum } => {
                write!(
                    f,
                    "JWT secret too short: {} bytes (minimum {})",
                    actual, minimum
                )
            }
            Self::NullCacheBackend { name } => {
                write!(
                    f,
                    "Cache backend '{}' must be configured and non-null to enable async queries",
                    name
                )
            }
            Self::MissingSentinels => {
                write!(f, "Sentinel cache requires at least one sentinel node")
            }
            Self::MissingMasterName => {
                write!(f, "Sentinel cache requires a master name")
            }
            Self::InvalidPort { name, value } => {
                write!(f, "Invalid port for {}: {} (must be 1-65535)", name, value)
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::NonPositiveTimeout { name, value } => {
                write!(f, "Timeout '{}' must be positive, got {}", name, value)
            }
            Self::InvalidStreamLimit { name } => {
                write!(f, "Stream limit '{}' must be positive", name)
            }
            Self::EmptyCookieName => {
                write!(f, "JWT cookie name must not be empty")
            }
            Self::EmptyClassName { name } => {
                write!(f, "Class name '{}' must not be empty", name)
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result of configuration validation containing all errors found.
#[derive(Debug)]
pub struct ValidationResult {
    errors: Vec<ConfigValidationError>,
}

impl ValidationResult {
    fn new() -> Self {
        Self { errors: Vec::new() }
    }

    fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the validation errors.
    pub fn errors(&self) -> &[ConfigValidationError] {
        &self.errors
    }

    /// Converts to Result, returning Err with all errors if any exist.
    pub fn into_result(self) -> Result<(), Vec<ConfigValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Minimum JWT secret length in bytes.
    pub const MIN_JWT_SECRET_LENGTH: usize = 32;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut result = ValidationResult::new();

        Self::validate_async_queries(&config.async_queries, &mut result);
        Self::validate_cache(config, &mut result);
        Self::validate_ssh_tunnel(&config.ssh_tunnel, &mut result);
        Self::validate_server(&config.server, &mut result);
        Self::validate_observability(&config.observability, &mut result);

        result.into_result()
    }

    fn validate_async_queries(config: &crate::AsyncQueriesConfig, result: &mut ValidationResult) {
        if config.jwt_secret.len() < Self::MIN_JWT_SECRET_LENGTH {
            result.add_error(ConfigValidationError::JwtSecretTooShort {
                actual: config.jwt_secret.len(),
                minimum: Self::MIN_JWT_SECRET_LENGTH,
            });
        }

        if config.jwt_cookie_name.trim().is_empty() {
            result.add_error(ConfigValidationError::EmptyCookieName);
        }

        if config.stream_limit == 0 {
            result.add_error(ConfigValidationError::InvalidStreamLimit {
                name: "async_queries.stream_limit".to_string(),
            });
        }
        if config.stream_limit_firehose == 0 {
            result.add_error(ConfigValidationError::InvalidStreamLimit {
                name: "async_queries.stream_limit_firehose".to_string(),
            });
        }

        if config.manager_class.trim().is_empty() {
            result.add_error(ConfigValidationError::EmptyClassName {
                name: "async_queries.manager_class".to_string(),
            });
        }

        let url = &config.task_queue.url;
        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "task_queue".to_string(),
                message: "URL must start with redis:// or rediss://".to_string(),
            });
        } else if let Err(e) = Url::parse(url) {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "task_queue".to_string(),
                message: e.to_string(),
            });
        }
    }

    fn validate_cache(config: &AppConfig, result: &mut ValidationResult) {
        if config.cache.is_null() {
            result.add_error(ConfigValidationError::NullCacheBackend {
                name: "cache".to_string(),
            });
        }
        if config.data_cache.is_null() {
            result.add_error(ConfigValidationError::NullCacheBackend {
                name: "data_cache".to_string(),
            });
        }

        match config.cache.cache_type {
            Some(CacheType::RedisSentinel) => {
                if config.cache.sentinels.is_empty() {
                    result.add_error(ConfigValidationError::MissingSentinels);
                }
                if config
                    .cache
                    .master_name
                    .as_deref()
                    .map_or(true, |name| name.trim().is_empty())
                {
                    result.add_error(ConfigValidationError::MissingMasterName);
                }
                for sentinel in &config.cache.sentinels {
                    if sentinel.port == 0 {
                        result.add_error(ConfigValidationError::InvalidPort {
                            name: format!("cache.sentinels[{}]", sentinel.host),
                            value: 0,
                        });
                    }
                }
            }
            Some(CacheType::Redis) => {
                if config.cache.port == 0 {
                    result.add_error(ConfigValidationError::InvalidPort {
                        name: "cache.port".to_string(),
                        value: 0,
                    });
                }
            }
            Some(CacheType::Null) => {}
            None => {
                if config.legacy_redis.port == 0 {
                    result.add_error(ConfigValidationError::InvalidPort {
                        name: "legacy_redis.port".to_string(),
                        value: 0,
                    });
                }
            }
        }
    }

    fn validate_ssh_tunnel(config: &crate::SshTunnelConfig, result: &mut ValidationResult) {
        if config.timeout_sec <= 0.0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "ssh_tunnel.timeout_sec".to_string(),
                value: config.timeout_sec,
            });
        }
        if config.packet_timeout_sec <= 0.0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "ssh_tunnel.packet_timeout_sec".to_string(),
                value: config.packet_timeout_sec,
            });
        }
        if config.manager_class.trim().is_empty() {
            result.add_error(ConfigValidationError::EmptyClassName {
                name: "ssh_tunnel.manager_class".to_string(),
            });
        }
    }

    fn validate_server(config: &crate::ServerConfig, result: &mut ValidationResult) {
        if config.port == 0 {
            result.add_error(ConfigValidationError::InvalidPort {
                name: "server.port".to_string(),
                value: config.port,
            });
        }

        if config.request_timeout_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveTimeout {
                name: "server.request_timeout_secs".to_string(),
                value: 0.0,
            });
        }
    }

    fn validate_observability(config: &crate::ObservabilityConfig, result: &mut ValidationResult) {
        let level = config.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
            });
        }
    }
}

/// Formats validation errors for display.
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    let mut output = String::from("Configuration validation failed:\n");
    for (i, error) in errors.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, error));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheConfig, SentinelAddress};

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.async_queries.jwt_secret = "x".repeat(32);
        config.cache = CacheConfig {
            cache_type: Some(CacheType::Redis),
            ..CacheConfig::default()
        };
        config
    }

    #[test]
    fn test_valid_config_passes() {
        let config = valid_config();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_jwt_secret_too_short() {
        let mut config = valid_config();
        config.async_queries.jwt_secret = "x".repeat(31);

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigValidationError::JwtSecretTooShort { actual: 31, minimum: 32 }
        )));
    }

    #[test]
    fn test_null_cache_backends() {
        let mut config = valid_config();
        config.cache.cache_type = Some(CacheType::Null);
        config.data_cache.cache_type = Some(CacheType::Null);

        let errors = ConfigValidator::validate(&config).unwrap_err();
        let names: Vec<_> = errors
            .iter()
            .filter_map(|e| match e {
                ConfigValidationError::NullCacheBackend { name } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["cache", "data_cache"]);
    }

    #[test]
    fn test_sentinel_requires_nodes_and_master() {
        let mut config = valid_config();
        config.cache.cache_type = Some(CacheType::RedisSentinel);

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert!(errors.contains(&ConfigValidationError::MissingSentinels));
        assert!(errors.contains(&ConfigValidationError::MissingMasterName));

        config.cache.sentinels = vec![SentinelAddress::new("s1", 26379)];
        config.cache.master_name = Some("mymaster".to_string());
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_non_positive_ssh_timeouts() {
        let mut config = valid_config();
        config.ssh_tunnel.timeout_sec = 0.0;
        config.ssh_tunnel.packet_timeout_sec = -1.0;

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ConfigValidationError::NonPositiveTimeout { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_invalid_task_queue_url() {
        let mut config = valid_config();
        config.async_queries.task_queue.url = "http://localhost:6379".to_string();

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigValidationError::InvalidUrl { url_type, .. } if url_type == "task_queue"
        )));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = valid_config();
        config.observability.log_level = "verbose".to_string();

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigValidationError::InvalidLogLevel { .. }
        )));
    }

    #[test]
    fn test_multiple_errors() {
        let mut config = valid_config();
        config.async_queries.jwt_secret = "short".to_string();
        config.server.port = 0;
        config.async_queries.stream_limit = 0;

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert!(errors.len() >= 3);
    }

    #[test]
    fn test_format_validation_errors() {
        let errors = vec![
            ConfigValidationError::JwtSecretTooShort {
                actual: 10,
                minimum: 32,
            },
            ConfigValidationError::MissingSentinels,
        ];

        let output = format_validation_errors(&errors);
        assert!(output.contains("1. JWT secret too short"));
        assert!(output.contains("2. Sentinel cache requires"));
    }
}
