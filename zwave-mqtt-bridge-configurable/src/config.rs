/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse config file: {0}")]
    Parse(#[from] json5::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub(crate) bridge: BridgeConfig,
    pub(crate) value_model: ValueModelConfig,
    pub(crate) mqtt: MqttConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    #[serde(default)]
    pub(crate) prefix: String,
    #[serde(default = "default_publish_on_start")]
    pub(crate) publish_on_start: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ValueModelConfig {
    pub(crate) file_path: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct MqttConfig {
    pub(crate) hostname: String,
    pub(crate) port: u16,
    pub(crate) client_id: String,
    #[serde(default = "default_keep_alive_secs")]
    pub(crate) keep_alive_secs: u64,
    #[serde(default)]
    pub(crate) username: Option<String>,
    #[serde(default)]
    pub(crate) password: Option<String>,
    #[serde(default = "default_channel_capacity")]
    pub(crate) channel_capacity: usize,
}

const MIN_KEEP_ALIVE_SECS: u64 = 5;

fn default_publish_on_start() -> bool {
    true
}

fn default_keep_alive_secs() -> u64 {
    30
}

fn default_channel_capacity() -> usize {
    64
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json5_str(&contents)
    }

    pub fn from_json5_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = json5::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bridge.prefix.ends_with('/') {
            return Err(ConfigError::Invalid(format!(
                "bridge prefix '{}' must not end with '/'",
                self.bridge.prefix
            )));
        }
        if self.mqtt.client_id.is_empty() {
            return Err(ConfigError::Invalid("mqtt client_id is empty".to_string()));
        }
        if self.mqtt.keep_alive_secs < MIN_KEEP_ALIVE_SECS {
            return Err(ConfigError::Invalid(format!(
                "mqtt keep_alive_secs must be at least {MIN_KEEP_ALIVE_SECS}"
            )));
        }
        if self.mqtt.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "mqtt channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.mqtt.username.is_some() != self.mqtt.password.is_some() {
            return Err(ConfigError::Invalid(
                "mqtt username and password must be set together".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError};

    #[test]
    fn sample_config_parses() {
        let path = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/static-configs/bridge_config.json5"
        );
        let config = Config::from_file(path).unwrap();

        assert_eq!(config.bridge.prefix, "zwave");
        assert!(config.bridge.publish_on_start);
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.username, None);
    }

    #[test]
    fn optional_fields_take_defaults() {
        let config = Config::from_json5_str(
            r#"{
                bridge: {},
                value_model: { file_path: "model.json5" },
                mqtt: { hostname: "broker", port: 1883, client_id: "bridge" },
            }"#,
        )
        .unwrap();

        assert_eq!(config.bridge.prefix, "");
        assert!(config.bridge.publish_on_start);
        assert_eq!(config.mqtt.keep_alive_secs, 30);
        assert_eq!(config.mqtt.channel_capacity, 64);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = Config::from_json5_str(
            r#"{
                bridge: { prefix: "zwave", retain: true },
                value_model: { file_path: "model.json5" },
                mqtt: { hostname: "broker", port: 1883, client_id: "bridge" },
            }"#,
        );

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn half_configured_credentials_are_invalid() {
        let result = Config::from_json5_str(
            r#"{
                bridge: {},
                value_model: { file_path: "model.json5" },
                mqtt: { hostname: "broker", port: 1883, client_id: "bridge", username: "hub" },
            }"#,
        );

        assert_eq!(
            result.unwrap_err().to_string(),
            "invalid config: mqtt username and password must be set together"
        );
    }

    #[test]
    fn trailing_slash_prefix_is_invalid() {
        let result = Config::from_json5_str(
            r#"{
                bridge: { prefix: "zwave/" },
                value_model: { file_path: "model.json5" },
                mqtt: { hostname: "broker", port: 1883, client_id: "bridge" },
            }"#,
        );

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
