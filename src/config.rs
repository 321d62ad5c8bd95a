//! Bot configuration, read from the process environment (and a `.env` file when present).

use ::config::{ConfigError, Environment};
use dotenv::dotenv;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::commands::music::utils::playback::DEFAULT_VOLUME;
use crate::commands::music::utils::voice_manager::DEFAULT_RECONNECT_GRACE;

#[derive(Clone, Deserialize)]
pub struct Config {
    pub discord_token: String,

    #[serde(default = "default_prefix")]
    pub command_prefix: String,

    /// Gain for new players, 0.0 to 1.0
    #[serde(default = "default_volume")]
    pub default_volume: f32,

    /// Candidates requested per search
    #[serde(default = "default_search_results")]
    pub search_results: usize,

    /// How long a dropped voice connection may take to start recovering
    #[serde(default = "default_reconnect_grace", with = "humantime_serde")]
    pub reconnect_grace: Duration,

    #[serde(default = "enabled")]
    pub log_messages: bool,

    /// Register slash commands globally at startup instead of per guild via `deploy`
    #[serde(default = "enabled")]
    pub register_globally: bool,
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

fn default_search_results() -> usize {
    5
}

fn default_reconnect_grace() -> Duration {
    DEFAULT_RECONNECT_GRACE
}

fn enabled() -> bool {
    true
}

impl Config {
    /// Load `.env` into the environment, then read the configuration from it.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_env(Environment::default())
    }

    pub fn from_env(source: Environment) -> Result<Self, ConfigError> {
        let config: Self = ::config::Config::builder()
            .add_source(source.try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.discord_token.trim().is_empty() {
            return Err(ConfigError::Message("DISCORD_TOKEN is empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(ConfigError::Message(format!(
                "DEFAULT_VOLUME must be between 0.0 and 1.0, got {}",
                self.default_volume
            )));
        }
        if self.search_results == 0 {
            return Err(ConfigError::Message(
                "SEARCH_RESULTS must be at least 1".to_string(),
            ));
        }
        if self.reconnect_grace.is_zero() {
            return Err(ConfigError::Message(
                "RECONNECT_GRACE must be longer than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// The token stays out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("command_prefix", &self.command_prefix)
            .field("default_volume", &self.default_volume)
            .field("search_results", &self.search_results)
            .field("reconnect_grace", &self.reconnect_grace)
            .field("log_messages", &self.log_messages)
            .field("register_globally", &self.register_globally)
            .finish_non_exhaustive()
    }
}
