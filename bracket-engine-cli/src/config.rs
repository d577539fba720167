use std::env;
use std::fs;
use std::io;
use std::path::Path;

use bracket_engine_core::EngineConfig;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! from_environment {
    ($config:expr, $($key:expr, $name:tt),*$(,)?) => {{
        $(
            {
                if let Ok(value) = env::var($key) {
                    match value.parse() {
                        Ok(value) => $config.$name = value,
                        Err(_) => log::warn!("Ignoring invalid value {:?} for {}", value, $key),
                    }
                }
            }
        )*
    }};
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub loglevel: LevelFilter,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_file<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let buf = fs::read(path)?;
        Ok(toml::from_slice(&buf)?)
    }

    /// Overwrites all values that are set in the environment.
    pub fn with_environment(mut self) -> Self {
        from_environment!(self, "BE_LOGLEVEL", loglevel);
        from_environment!(
            self.engine,
            "BE_MAX_BRACKETS",
            max_brackets,
            "BE_BRACKET_NAME_MAX_LENGTH",
            bracket_name_max_length,
        );

        self
    }

    /// Rejects engine defaults that no bracket could be created with.
    pub fn validate(self) -> Result<Self, ConfigError> {
        self.engine.validate()?;
        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loglevel: LevelFilter::Info,
            engine: EngineConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Engine(#[from] bracket_engine_core::config::ConfigError),
}

#[cfg(test)]
mod tests {
    use std::env;

    use bracket_engine_core::{EngineConfig, RoundMaps};
    use log::LevelFilter;

    use super::{Config, ConfigError};

    #[test]
    fn test_config_toml() {
        let config: Config = toml::from_str(
            r#"
            loglevel = "debug"

            [engine]
            max_brackets = 4
            third_place_match = true

            [engine.maps]
            count = 5
            type = "PLAY_ALL"
            "#,
        )
        .unwrap();

        assert_eq!(config.loglevel, LevelFilter::Debug);
        assert_eq!(config.engine.max_brackets, 4);
        assert!(config.engine.third_place_match);
        assert_eq!(config.engine.maps, RoundMaps::play_all(5));
        assert_eq!(
            config.engine.bracket_name_max_length,
            EngineConfig::default().bracket_name_max_length
        );

        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());

        let config: Config = toml::from_str(
            r#"
            [engine]
            swiss_round_count = 0
            "#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Engine(_))));
    }

    #[test]
    fn test_config_environment() {
        env::set_var("BE_BRACKET_NAME_MAX_LENGTH", "12");
        env::set_var("BE_MAX_BRACKETS", "many");

        let config = Config::default().with_environment();
        assert_eq!(config.engine.bracket_name_max_length, 12);
        assert_eq!(config.engine.max_brackets, EngineConfig::default().max_brackets);

        env::remove_var("BE_BRACKET_NAME_MAX_LENGTH");
        env::remove_var("BE_MAX_BRACKETS");
    }
}
