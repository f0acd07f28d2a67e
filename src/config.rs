//! # Application Configuration
//!
//! One TOML file with a section per component:
//!
//! ```toml
//! [input]
//! backend = "gpio"          # or "scripted"
//! gpio_pin = 9
//! sample_interval_ms = 50
//!
//! [channel]
//! capacity = 10
//! overflow = "drop_newest"  # or "drop_oldest"
//!
//! [output]
//! backend = "console"       # or "gpio_led"
//! led_count = 25
//! hold_timeout_ms = 3000
//! alert_step_ms = 50
//!
//! [mqtt]
//! enabled = false
//! host = "192.168.0.196"
//! topic = "/esp32/button"
//! ```
//!
//! The file is looked up at `$BUTTONLAMP_CONFIG`, falling back to
//! `<config dir>/buttonlamp/config.toml`. A missing file is not an error; every
//! field has a default matching the reference firmware.

use crate::hal::Rgb;
use crate::input::{OverflowPolicy, SamplerSettings};
use crate::mqtt::MqttConfig;
use crate::output::ConsumerSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const CONFIG_ENV_VAR: &str = "BUTTONLAMP_CONFIG";
const CONFIG_DIR: &str = "buttonlamp";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputBackend {
    #[default]
    Gpio,
    Scripted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputBackend {
    #[default]
    Console,
    GpioLed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub backend: InputBackend,
    /// BCM pin of the button, pulled up
    pub gpio_pin: u8,
    pub sample_interval_ms: u64,
    /// Length of one timestamp tick
    pub tick_ms: u64,
    /// Levels for the scripted backend, e.g. "1100011"
    pub script: String,
    pub script_repeat: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            backend: InputBackend::Gpio,
            gpio_pin: 9,
            sample_interval_ms: 50,
            tick_ms: 1,
            script: String::new(),
            script_repeat: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            overflow: OverflowPolicy::DropNewest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub backend: OutputBackend,
    pub led_count: usize,
    /// BCM pin for the gpio_led backend
    pub led_gpio_pin: u8,
    pub hold_timeout_ms: u64,
    pub alert_step_ms: u64,
    pub active_color: Rgb,
    pub alert_color: Rgb,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            backend: OutputBackend::Console,
            led_count: 25,
            led_gpio_pin: 8,
            hold_timeout_ms: 3000,
            alert_step_ms: 50,
            active_color: Rgb::new(0, 50, 0),
            alert_color: Rgb::new(50, 0, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub channel: ChannelConfig,
    pub output: OutputConfig,
    pub mqtt: MqttConfig,
    /// Seconds between the periodic stats log lines
    pub stats_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            channel: ChannelConfig::default(),
            output: OutputConfig::default(),
            mqtt: MqttConfig::default(),
            stats_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Loads and validates the config from the default location
    pub async fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path()).await
    }

    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config = if exists {
            info!("Loading configuration from {}", path.display());
            let content =
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ConfigError::Io {
                        path: path.to_path_buf(),
                        source,
                    })?;
            Self::from_toml_str(&content)?
        } else {
            warn!(
                "Config file {} does not exist, using defaults",
                path.display()
            );
            let config = Self::default();
            config.validate()?;
            config
        };

        debug!("Effective configuration: {:?}", config);
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.input.sample_interval_ms == 0 {
            return invalid("input.sample_interval_ms must be greater than 0");
        }
        if self.input.tick_ms == 0 {
            return invalid("input.tick_ms must be greater than 0");
        }
        if self.input.backend == InputBackend::Scripted && self.input.script.trim().is_empty() {
            return invalid("input.script is required for the scripted backend");
        }
        if self.channel.capacity == 0 {
            return invalid("channel.capacity must be at least 1");
        }
        if self.output.led_count == 0 {
            return invalid("output.led_count must be at least 1");
        }
        if self.output.hold_timeout_ms == 0 {
            return invalid("output.hold_timeout_ms must be greater than 0");
        }
        if self.mqtt.enabled && self.mqtt.topic.is_empty() {
            return invalid("mqtt.topic must not be empty");
        }
        if self.mqtt.enabled && self.mqtt.queue_capacity == 0 {
            return invalid("mqtt.queue_capacity must be at least 1");
        }
        Ok(())
    }

    pub fn sampler_settings(&self) -> SamplerSettings {
        SamplerSettings {
            sample_interval_ms: self.input.sample_interval_ms,
            stats_interval_secs: self.stats_interval_secs,
        }
    }

    pub fn consumer_settings(&self) -> ConsumerSettings {
        ConsumerSettings {
            hold_timeout_ms: self.output.hold_timeout_ms,
            alert_step_ms: self.output.alert_step_ms,
            active_color: self.output.active_color,
            alert_color: self.output.alert_color,
            stats_interval_secs: self.stats_interval_secs,
        }
    }
}

/// Resolves the config file location
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return PathBuf::from(path);
    }

    let mut path = dirs::config_dir().unwrap_or_else(|| {
        warn!("Could not determine config directory, using current directory");
        PathBuf::from(".")
    });
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_firmware() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.input.gpio_pin, 9);
        assert_eq!(config.input.sample_interval_ms, 50);
        assert_eq!(config.channel.capacity, 10);
        assert_eq!(config.channel.overflow, OverflowPolicy::DropNewest);
        assert_eq!(config.output.led_count, 25);
        assert_eq!(config.output.hold_timeout_ms, 3000);
        assert_eq!(config.output.alert_step_ms, 50);
        assert!(!config.mqtt.enabled);
        assert_eq!(config.mqtt.topic, "/esp32/button");
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let config = AppConfig::from_toml_str(
            r#"
            [input]
            backend = "scripted"
            script = "1100"

            [channel]
            capacity = 100
            overflow = "drop_oldest"

            [output]
            backend = "gpio_led"
            alert_color = { r = 0, g = 0, b = 80 }
            "#,
        )
        .unwrap();

        assert_eq!(config.input.backend, InputBackend::Scripted);
        assert_eq!(config.input.sample_interval_ms, 50);
        assert_eq!(config.channel.capacity, 100);
        assert_eq!(config.channel.overflow, OverflowPolicy::DropOldest);
        assert_eq!(config.output.backend, OutputBackend::GpioLed);
        assert_eq!(config.output.alert_color, Rgb::new(0, 0, 80));
        assert_eq!(config.output.active_color, Rgb::new(0, 50, 0));
        assert_eq!(config.stats_interval_secs, 60);
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let result = AppConfig::from_toml_str("[channel]\ncapacity = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn scripted_backend_needs_a_script() {
        let result = AppConfig::from_toml_str("[input]\nbackend = \"scripted\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_overflow_policy_fails_to_parse() {
        let result = AppConfig::from_toml_str("[channel]\noverflow = \"drop_random\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn settings_are_split_per_component() {
        let mut config = AppConfig::default();
        config.input.sample_interval_ms = 20;
        config.output.hold_timeout_ms = 1500;
        config.stats_interval_secs = 5;

        assert_eq!(config.sampler_settings().sample_interval_ms, 20);
        assert_eq!(config.sampler_settings().stats_interval_secs, 5);
        assert_eq!(config.consumer_settings().hold_timeout_ms, 1500);
        assert_eq!(config.consumer_settings().stats_interval_secs, 5);
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("buttonlamp-missing-config-test.toml");
        let config = AppConfig::load_from(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn reads_file_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "buttonlamp-config-test-{}.toml",
            std::process::id()
        ));
        tokio::fs::write(&path, "[output]\nled_count = 8\n")
            .await
            .unwrap();

        let config = AppConfig::load_from(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(config.output.led_count, 8);
    }
}
