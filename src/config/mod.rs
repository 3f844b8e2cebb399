// Required external crates for configuration management and serialization
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Configuration for the tracking/registry service connection
#[derive(Debug, Deserialize, Clone)]
pub struct TrackingConfig {
    /// Base URL of the tracking service
    pub uri: String,
}

/// Configuration forwarded to the external serving process
#[derive(Debug, Deserialize, Clone)]
pub struct ServeConfig {
    /// Host address the serving process binds to
    pub host: String,
    /// Default port when the command line gives none
    pub port: u16,
    /// Environment manager for the serving process (local, virtualenv, conda)
    pub env_manager: String,
}

/// Configuration for application logging
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Optional directory for rolling log files
    pub file: Option<PathBuf>,
}

/// Main settings struct that contains all configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub tracking: TrackingConfig,
    pub serve: ServeConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Creates a new Settings instance by loading config from multiple
    /// sources in the following order of precedence (highest to lowest):
    /// 1. Environment variables prefixed with MLDEPLOY_
    /// 2. Local config file (config/local.toml) if present
    /// 3. Default config file (config/default.toml) if present
    /// 4. Built-in defaults
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::current_dir()
            .map_err(|e| ConfigError::Message(format!("Failed to get current directory: {}", e)))?
            .join("config");

        let default_config = config_dir.join("default.toml").to_string_lossy().to_string();
        let local_config = config_dir.join("local.toml").to_string_lossy().to_string();

        let settings = Config::builder()
            .set_default("tracking.uri", "http://127.0.0.1:8080")?
            .set_default("serve.host", "0.0.0.0")?
            .set_default("serve.port", 5002)?
            .set_default("serve.env_manager", "local")?
            .set_default("logging.level", "info")?
            .add_source(File::with_name(&default_config).required(false))
            .add_source(File::with_name(&local_config).required(false))
            .add_source(Environment::with_prefix("MLDEPLOY").separator("_"))
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.tracking.uri.starts_with("http://") && !self.tracking.uri.starts_with("https://") {
            return Err(ConfigError::Message(format!(
                "Tracking URI must be http(s), got: {}",
                self.tracking.uri
            )));
        }

        if self.serve.port == 0 {
            return Err(ConfigError::Message(
                "Serve port must be greater than 0".to_string(),
            ));
        }

        match self.serve.env_manager.as_str() {
            "local" | "virtualenv" | "conda" => {}
            other => {
                return Err(ConfigError::Message(format!(
                    "Invalid env_manager: {}. Must be one of: local, virtualenv, conda",
                    other
                )))
            }
        }

        match self.logging.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            _ => Err(ConfigError::Message(format!(
                "Invalid logging level: {}. Must be one of: error, warn, info, debug, trace",
                self.logging.level
            ))),
        }?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_settings() -> Settings {
        Settings {
            tracking: TrackingConfig {
                uri: "http://127.0.0.1:8080".to_string(),
            },
            serve: ServeConfig {
                host: "0.0.0.0".to_string(),
                port: 5002,
                env_manager: "local".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: None,
            },
        }
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(base_settings().validate().is_ok());
    }

    #[test]
    fn test_non_http_tracking_uri_rejected() {
        let mut settings = base_settings();
        settings.tracking.uri = "ftp://somewhere".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_port_rejected() {
        let mut settings = base_settings();
        settings.serve.port = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_unknown_env_manager_rejected() {
        let mut settings = base_settings();
        settings.serve.env_manager = "docker".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut settings = base_settings();
        settings.logging.level = "loud".to_string();
        assert!(settings.validate().is_err());
    }
}
