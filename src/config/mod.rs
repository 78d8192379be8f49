use serde::Deserialize;
use std::path::{Path, PathBuf};
use config::{Config, ConfigError, Environment, File};

use crate::predictor::TOP_K;

/// Configuration for the prediction artifacts and their shapes
#[derive(Debug, Deserialize, Clone)]
pub struct PredictorConfig {
    /// GGUF file holding the pretrained network
    pub model_path: PathBuf,
    /// JSON word -> index mapping produced at training time
    pub vocabulary_path: PathBuf,
    /// Sequence length the model was trained on
    pub max_len: usize,
    /// Model output width, equal to the vocabulary index space
    pub vocab_size: usize,
    /// How many characters before the cursor a caller passes to `predict`
    pub context_chars: usize,
}

/// Configuration for the HTTP server
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

/// Configuration for application logging
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Directory for the daily rolling log files
    pub directory: PathBuf,
}

/// Main settings struct that contains all configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub predictor: PredictorConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Loads settings from `./config`.
    ///
    /// Sources in order of precedence (highest to lowest):
    /// 1. Environment variables prefixed with NEXTWORD__ (e.g. NEXTWORD__SERVER__PORT)
    /// 2. Local config file (local.toml) if present
    /// 3. Default config file (default.toml)
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::current_dir()
            .map_err(|e| ConfigError::Message(
                format!("Failed to get current directory: {}", e)
            ))?
            .join("config");

        Self::from_dir(&config_dir)
    }

    /// Loads settings from an explicit config directory.
    pub fn from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        if !config_dir.exists() {
            return Err(ConfigError::Message(
                format!("Config directory not found at: {}", config_dir.display())
            ));
        }

        let default_config = config_dir.join("default.toml");
        if !default_config.exists() {
            return Err(ConfigError::Message(
                format!("Default configuration file not found at: {}", default_config.display())
            ));
        }

        let local_config = config_dir.join("local.toml");

        let settings = Config::builder()
            .add_source(File::from(default_config))
            .add_source(File::from(local_config).required(false))
            .add_source(Environment::with_prefix("NEXTWORD").prefix_separator("__").separator("__"))
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.predictor.max_len == 0 {
            return Err(ConfigError::Message(
                "predictor.max_len must be greater than 0".to_string()
            ));
        }

        if self.predictor.vocab_size <= TOP_K {
            return Err(ConfigError::Message(format!(
                "predictor.vocab_size must be greater than {}, got: {}",
                TOP_K, self.predictor.vocab_size
            )));
        }

        if self.predictor.context_chars == 0 {
            return Err(ConfigError::Message(
                "predictor.context_chars must be greater than 0".to_string()
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::Message(
                "Port must be between 1 and 65535, got: 0".to_string()
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            _ => Err(ConfigError::Message(
                format!("Invalid logging level: {}. Must be one of: error, warn, info, debug, trace",
                    self.logging.level)
            )),
        }?;

        if !self.logging.directory.exists() {
            std::fs::create_dir_all(&self.logging.directory).map_err(|e| {
                ConfigError::Message(format!(
                    "Failed to create log directory at {}: {}",
                    self.logging.directory.display(), e
                ))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_default(dir: &Path, body: &str) {
        fs::write(dir.join("default.toml"), body).unwrap();
    }

    fn default_body(logs: &Path) -> String {
        format!(
            r#"
[predictor]
model_path = "assets/prediction_model.gguf"
vocabulary_path = "assets/word_index.json"
max_len = 54
vocab_size = 13598
context_chars = 100

[server]
host = "127.0.0.1"
port = 8089

[logging]
level = "info"
directory = "{}"
"#,
            logs.display()
        )
    }

    #[test]
    fn test_loads_defaults_and_creates_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        write_default(dir.path(), &default_body(&logs));

        let settings = Settings::from_dir(dir.path()).unwrap();
        assert_eq!(settings.predictor.max_len, 54);
        assert_eq!(settings.predictor.vocab_size, 13598);
        assert_eq!(settings.server.port, 8089);
        assert!(logs.exists());
    }

    #[test]
    fn test_local_file_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        write_default(dir.path(), &default_body(&dir.path().join("logs")));
        fs::write(dir.path().join("local.toml"), "[server]\nport = 9000\n").unwrap();

        let settings = Settings::from_dir(dir.path()).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "127.0.0.1");
    }

    #[test]
    fn test_rejects_vocab_too_small_for_top_k() {
        let dir = tempfile::tempdir().unwrap();
        let body = default_body(&dir.path().join("logs")).replace("vocab_size = 13598", "vocab_size = 3");
        write_default(dir.path(), &body);

        let err = Settings::from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("vocab_size"));
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let dir = tempfile::tempdir().unwrap();
        let body = default_body(&dir.path().join("logs")).replace("level = \"info\"", "level = \"loud\"");
        write_default(dir.path(), &body);

        assert!(Settings::from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_missing_directory() {
        assert!(Settings::from_dir(Path::new("/no/such/config")).is_err());
    }
}
