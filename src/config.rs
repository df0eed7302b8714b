//! Configuration management with validation and defaults
//!
//! Values come from, in order: built-in defaults, an optional TOML file, then
//! `CRAPS_*` environment variables. The result is validated before use.

use crate::errors::{ConfigurationError, CrapsResult};
use crate::games::dice::{DiceSource, SeededDice, UniformDice, DEFAULT_SEED};
use crate::games::types::MAX_PLAYERS;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrapsConfig {
    pub engine: EngineConfig,
    pub dice: DiceConfig,
    pub runtime: RuntimeConfig,
    pub monitoring: MonitoringConfig,
    pub storage: StorageConfig,
}

/// Rules the engine enforces on every game
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub min_game_id_len: usize,
    pub max_retries: u8,
    /// Fixed at 2; present so a config asking for more fails loudly
    pub max_players: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_game_id_len: 3,
            max_retries: 1,
            max_players: MAX_PLAYERS,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiceMode {
    Uniform,
    Seeded,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiceConfig {
    pub mode: DiceMode,
    pub seed: Option<u32>,
}

impl Default for DiceConfig {
    fn default() -> Self {
        Self {
            mode: DiceMode::Uniform,
            seed: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Test,
    Production,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub environment: Environment,
    /// Must be set explicitly before seeded dice are accepted
    pub allow_test_randomness: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            allow_test_randomness: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: LogLevel,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub snapshot_path: Option<PathBuf>,
}

impl CrapsConfig {
    pub fn development() -> Self {
        Self {
            monitoring: MonitoringConfig {
                log_level: LogLevel::Debug,
            },
            ..Default::default()
        }
    }

    /// Reproducible dice for tests and replays
    pub fn testing(seed: u32) -> Self {
        Self {
            dice: DiceConfig {
                mode: DiceMode::Seeded,
                seed: Some(seed),
            },
            runtime: RuntimeConfig {
                environment: Environment::Test,
                allow_test_randomness: true,
            },
            ..Default::default()
        }
    }

    pub fn production() -> Self {
        Self {
            runtime: RuntimeConfig {
                environment: Environment::Production,
                allow_test_randomness: false,
            },
            monitoring: MonitoringConfig {
                log_level: LogLevel::Info,
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.engine.min_game_id_len == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "engine.min_game_id_len".to_string(),
                value: "0".to_string(),
                reason: "game ids must have at least one character".to_string(),
            });
        }

        if self.engine.max_retries == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "engine.max_retries".to_string(),
                value: "0".to_string(),
                reason: "at least one retry must be allowed".to_string(),
            });
        }

        if self.engine.max_players != MAX_PLAYERS {
            return Err(ConfigurationError::InvalidValue {
                field: "engine.max_players".to_string(),
                value: self.engine.max_players.to_string(),
                reason: format!("games are heads-up; only {} is supported", MAX_PLAYERS),
            });
        }

        if self.dice.mode == DiceMode::Seeded {
            if self.runtime.environment == Environment::Production {
                return Err(ConfigurationError::ValidationFailed(
                    "seeded dice are disabled for production".to_string(),
                ));
            }
            if !self.runtime.allow_test_randomness {
                return Err(ConfigurationError::ValidationFailed(
                    "runtime.allow_test_randomness is required for seeded dice".to_string(),
                ));
            }
        } else if self.runtime.allow_test_randomness
            && self.runtime.environment == Environment::Production
        {
            return Err(ConfigurationError::ValidationFailed(
                "runtime.allow_test_randomness must not be set in production".to_string(),
            ));
        }

        Ok(())
    }

    /// Die source this configuration asks for
    pub fn build_dice(&self) -> Result<Box<dyn DiceSource>, ConfigurationError> {
        self.validate()?;
        Ok(match self.dice.mode {
            DiceMode::Uniform => Box::new(UniformDice::new()),
            DiceMode::Seeded => Box::new(SeededDice::new(self.dice.seed.unwrap_or(DEFAULT_SEED))),
        })
    }
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> CrapsResult<CrapsConfig> {
        let mut config = match &self.config_path {
            Some(path) => Self::load_from_file(path)?,
            None => CrapsConfig::default(),
        };

        apply_overrides(&mut config, |key| env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    fn load_from_file(path: &Path) -> Result<CrapsConfig, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)))
    }

    pub fn save(&self, config: &CrapsConfig, path: &Path) -> CrapsResult<()> {
        let toml_string = toml::to_string_pretty(config).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, toml_string).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to write {}: {}", path.display(), e))
                .into()
        })
    }
}

/// Apply `CRAPS_*` overrides using `lookup` to read variables
pub fn apply_overrides<F>(config: &mut CrapsConfig, lookup: F) -> Result<(), ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("CRAPS_ENVIRONMENT") {
        config.runtime.environment = match value.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "production" | "prod" => Environment::Production,
            _ => return Err(invalid("CRAPS_ENVIRONMENT", value, "expected development, test or production")),
        };
    }

    if let Some(value) = lookup("CRAPS_ALLOW_TEST_RANDOMNESS") {
        config.runtime.allow_test_randomness = matches!(value.as_str(), "1" | "true");
    }

    if let Some(value) = lookup("CRAPS_DICE_MODE") {
        config.dice.mode = match value.to_lowercase().as_str() {
            "uniform" => DiceMode::Uniform,
            "seeded" => DiceMode::Seeded,
            _ => return Err(invalid("CRAPS_DICE_MODE", value, "expected uniform or seeded")),
        };
    }

    if let Some(value) = lookup("CRAPS_DICE_SEED") {
        let seed = value
            .parse()
            .map_err(|_| invalid("CRAPS_DICE_SEED", value.clone(), "expected a 32-bit unsigned integer"))?;
        config.dice.seed = Some(seed);
    }

    if let Some(value) = lookup("CRAPS_MAX_RETRIES") {
        config.engine.max_retries = value
            .parse()
            .map_err(|_| invalid("CRAPS_MAX_RETRIES", value.clone(), "expected an integer 1-255"))?;
    }

    if let Some(value) = lookup("CRAPS_LOG_LEVEL") {
        config.monitoring.log_level = match value.to_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => return Err(invalid("CRAPS_LOG_LEVEL", value, "unknown log level")),
        };
    }

    if let Some(value) = lookup("CRAPS_SNAPSHOT_PATH") {
        config.storage.snapshot_path = Some(PathBuf::from(value));
    }

    Ok(())
}

fn invalid(field: &str, value: String, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(CrapsConfig::default().validate().is_ok());
        assert!(CrapsConfig::development().validate().is_ok());
        assert!(CrapsConfig::testing(42).validate().is_ok());
        assert!(CrapsConfig::production().validate().is_ok());
    }

    #[test]
    fn test_seeded_dice_disabled_in_production() {
        let mut config = CrapsConfig::testing(1);
        config.runtime.environment = Environment::Production;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("disabled for production"));
    }

    #[test]
    fn test_seeded_dice_require_flag() {
        let mut config = CrapsConfig::testing(1);
        config.runtime.allow_test_randomness = false;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("required"));
        assert!(config.build_dice().is_err());
    }

    #[test]
    fn test_flag_rejected_in_production() {
        let mut config = CrapsConfig::production();
        config.runtime.allow_test_randomness = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_limits_validated() {
        let mut config = CrapsConfig::default();
        config.engine.max_players = 3;
        assert!(config.validate().is_err());

        let mut config = CrapsConfig::default();
        config.engine.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_build_seeded_dice_follows_seed() {
        let config = CrapsConfig::testing(2);
        let mut dice = config.build_dice().unwrap();
        assert_eq!(dice.next_face(), 6);
        assert_eq!(dice.next_face(), 5);
    }

    #[test]
    fn test_overrides() {
        let mut config = CrapsConfig::default();
        let lookup = lookup_from(&[
            ("CRAPS_ENVIRONMENT", "test"),
            ("CRAPS_ALLOW_TEST_RANDOMNESS", "1"),
            ("CRAPS_DICE_MODE", "seeded"),
            ("CRAPS_DICE_SEED", "19"),
            ("CRAPS_LOG_LEVEL", "trace"),
        ]);
        apply_overrides(&mut config, lookup).unwrap();

        assert_eq!(config.runtime.environment, Environment::Test);
        assert!(config.runtime.allow_test_randomness);
        assert_eq!(config.dice.mode, DiceMode::Seeded);
        assert_eq!(config.dice.seed, Some(19));
        assert_eq!(config.monitoring.log_level, LogLevel::Trace);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_override_is_reported() {
        let mut config = CrapsConfig::default();
        let err = apply_overrides(&mut config, lookup_from(&[("CRAPS_DICE_SEED", "abc")])).unwrap_err();
        match err {
            ConfigurationError::InvalidValue { field, value, .. } => {
                assert_eq!(field, "CRAPS_DICE_SEED");
                assert_eq!(value, "abc");
            }
            other => panic!("Expected invalid value, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CrapsConfig = toml::from_str(
            r#"
            [dice]
            mode = "seeded"
            seed = 123

            [runtime]
            environment = "test"
            allow_test_randomness = true
            "#,
        )
        .unwrap();
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.dice.seed, Some(123));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_config() -> CrapsResult<()> {
        let temp_file = NamedTempFile::new().unwrap();
        let original = CrapsConfig::development();

        let loader = ConfigLoader::new();
        loader.save(&original, temp_file.path())?;
        let loaded = ConfigLoader::load_from_file(temp_file.path())?;

        assert_eq!(loaded, original);
        Ok(())
    }
}
