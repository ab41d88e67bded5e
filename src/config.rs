//! Layered configuration.
//!
//! Settings resolve in three layers: built-in defaults, then `lsifpack.toml`
//! in the working directory, then `LSIFPACK_`-prefixed environment variables.
//! Nested fields use double underscores in the environment:
//! `LSIFPACK_CORRELATE__READER_CHANNEL_CAPACITY=1024` sets
//! `correlate.reader_channel_capacity`, and
//! `LSIFPACK_LOGGING__DEFAULT=debug` sets `logging.default`.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const CONFIG_FILE: &str = "lsifpack.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub correlate: CorrelateConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorrelateConfig {
    /// Bound on the reader-to-correlator channel.
    #[serde(default = "default_reader_channel_capacity")]
    pub reader_channel_capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default level for every module without an override.
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, keyed by target prefix.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_reader_channel_capacity() -> usize {
    crate::correlate::READER_CHANNEL_CAPACITY
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            correlate: CorrelateConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CorrelateConfig {
    fn default() -> Self {
        Self {
            reader_channel_capacity: default_reader_channel_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from defaults, `lsifpack.toml`, and the
    /// environment, in that order of precedence.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file(CONFIG_FILE))
            .extract()
            .map_err(Box::new)
    }

    fn figment<T: figment::Provider>(file: T) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(file)
            .merge(
                Env::prefixed("LSIFPACK_")
                    .map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(
            settings.correlate.reader_channel_capacity,
            crate::correlate::READER_CHANNEL_CAPACITY
        );
        assert_eq!(settings.logging.default, "warn");
        assert!(settings.logging.modules.is_empty());
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        let settings: Settings = Settings::figment(Toml::string(
            r#"
            [correlate]
            reader_channel_capacity = 64

            [logging]
            default = "info"

            [logging.modules]
            "lsifpack::correlate" = "debug"
            "#,
        ))
        .extract()
        .unwrap();

        assert_eq!(settings.correlate.reader_channel_capacity, 64);
        assert_eq!(settings.logging.default, "info");
        assert_eq!(settings.logging.modules["lsifpack::correlate"], "debug");
    }

    #[test]
    fn test_partial_file_keeps_remaining_defaults() {
        let settings: Settings = Settings::figment(Toml::string(
            "[logging]\ndefault = \"debug\"\n",
        ))
        .extract()
        .unwrap();

        assert_eq!(settings.logging.default, "debug");
        assert_eq!(
            settings.correlate.reader_channel_capacity,
            crate::correlate::READER_CHANNEL_CAPACITY
        );
    }
}
