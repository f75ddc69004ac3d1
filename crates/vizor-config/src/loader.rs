//! Configuration loader with layered sources.

use crate::{format_validation_errors, AppConfig, ConfigValidator};
use config::{Config, ConfigError, Environment, File};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use vizor_core::VizorError;

/// Environment variable prefix for overrides (`VIZOR_ASYNC_QUERIES__JWT_SECRET`).
pub const ENV_PREFIX: &str = "VIZOR";

/// Loaded, validated configuration shared by start-up code.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<AppConfig>,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides
    /// 4. Environment variables with `VIZOR_` prefix
    pub fn new(config_dir: impl Into<String>) -> Result<Self, VizorError> {
        let config = Self::load_config(&config_dir.into())?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, VizorError> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    #[must_use]
    pub fn get(&self) -> AppConfig {
        AppConfig::clone(&self.config)
    }

    /// Loads and validates configuration from the specified directory.
    pub fn load_config(config_dir: &str) -> Result<AppConfig, VizorError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var("VIZOR_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        let default_path = format!("{}/default.toml", config_dir);
        if Path::new(&default_path).exists() {
            debug!("Loading default config from: {}", default_path);
            builder = builder.add_source(File::with_name(&default_path).required(false));
        }

        let env_path = format!("{}/{}.toml", config_dir, environment);
        if Path::new(&env_path).exists() {
            debug!("Loading environment config from: {}", env_path);
            builder = builder.add_source(File::with_name(&env_path).required(false));
        }

        // Not committed to version control
        let local_path = format!("{}/local.toml", config_dir);
        if Path::new(&local_path).exists() {
            debug!("Loading local config from: {}", local_path);
            builder = builder.add_source(File::with_name(&local_path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error_to_vizor_error)?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(config_error_to_vizor_error)?;

        Self::validate_config(&app_config)?;

        Ok(app_config)
    }

    fn validate_config(config: &AppConfig) -> Result<(), VizorError> {
        if config.app.environment == "production"
            && config.async_queries.jwt_secret == crate::AsyncQueriesConfig::default().jwt_secret
        {
            warn!("Using default async query JWT secret in production! This is a security risk.");
        }

        ConfigValidator::validate(config)
            .map_err(|errors| VizorError::Configuration(format_validation_errors(&errors)))
    }
}

fn config_error_to_vizor_error(err: ConfigError) -> VizorError {
    VizorError::Configuration(err.to_string())
}
