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

//! Device model loaded from a JSON5 file.
//!
//! Stands in for a live device network: it answers every metadata query from the
//! nodes and values declared in the file and keeps the current text of each value
//! in memory, so inbound bus commands can be applied and read back.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{self, canonicalize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};
use zwave_mqtt_bridge::{
    MetadataError, MetadataProvider, ValueGenre, ValueKey, ValueType, ValueWriter,
};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("value model file '{path}' not readable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse value model: {0}")]
    Parse(#[from] json5::Error),
    #[error("node {node_id} on home {home_id} declared twice")]
    DuplicateNode { home_id: u32, node_id: u8 },
    #[error("value {0} declared twice")]
    DuplicateValue(ValueKey),
    #[error("initial text '{text}' of value {key} is invalid: {reason}")]
    InvalidInitialValue {
        key: ValueKey,
        text: String,
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelFile {
    #[serde(default)]
    command_classes: Vec<CommandClassEntry>,
    nodes: Vec<NodeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CommandClassEntry {
    id: u8,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeEntry {
    home_id: u32,
    node_id: u8,
    location: String,
    name: String,
    #[serde(default)]
    values: Vec<ValueEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ValueEntry {
    genre: ValueGenre,
    command_class: u8,
    #[serde(default = "first_instance")]
    instance: u8,
    index: u16,
    value_type: ValueType,
    label: String,
    #[serde(default)]
    read_only: bool,
    #[serde(default)]
    items: Vec<String>,
    value: Option<String>,
}

fn first_instance() -> u8 {
    1
}

struct NodeInfo {
    location: String,
    name: String,
}

struct ValueInfo {
    label: String,
    read_only: bool,
    items: Vec<String>,
}

pub struct StaticValueModel {
    command_classes: HashMap<u8, String>,
    nodes: BTreeMap<(u32, u8), NodeInfo>,
    values: BTreeMap<ValueKey, ValueInfo>,
    instance_counts: HashMap<(u32, u8, u8), usize>,
    current: Mutex<HashMap<ValueKey, String>>,
}

impl StaticValueModel {
    /// Loads the model from a JSON5 file.
    pub fn from_file(static_file: impl AsRef<Path>) -> Result<Self, ModelError> {
        let static_file = static_file.as_ref();
        debug!("value model file: {static_file:?}");

        let path = canonicalize(static_file).map_err(|source| ModelError::Io {
            path: static_file.to_path_buf(),
            source,
        })?;
        let data = fs::read_to_string(&path).map_err(|source| ModelError::Io {
            path: path.clone(),
            source,
        })?;

        Self::from_json5_str(&data)
    }

    pub fn from_json5_str(data: &str) -> Result<Self, ModelError> {
        let file: ModelFile = json5::from_str(data)?;

        let command_classes = file
            .command_classes
            .into_iter()
            .map(|entry| (entry.id, entry.name))
            .collect();

        let mut nodes = BTreeMap::new();
        let mut values = BTreeMap::new();
        let mut current = HashMap::new();
        let mut instances: HashMap<(u32, u8, u8), BTreeSet<u8>> = HashMap::new();

        for node in file.nodes {
            let node_key = (node.home_id, node.node_id);
            if nodes.contains_key(&node_key) {
                return Err(ModelError::DuplicateNode {
                    home_id: node.home_id,
                    node_id: node.node_id,
                });
            }

            for value in node.values {
                let key = ValueKey::new(
                    node.home_id,
                    node.node_id,
                    value.genre,
                    value.command_class,
                    value.instance,
                    value.index,
                    value.value_type,
                );
                if values.contains_key(&key) {
                    return Err(ModelError::DuplicateValue(key));
                }

                let text = match value.value {
                    Some(text) => normalize_initial(&key, &value.items, text)?,
                    None => default_text(value.value_type, &value.items),
                };
                debug!("loaded value {key} = '{text}'");

                instances
                    .entry((node.home_id, node.node_id, value.command_class))
                    .or_default()
                    .insert(value.instance);
                current.insert(key, text);
                values.insert(
                    key,
                    ValueInfo {
                        label: value.label,
                        read_only: value.read_only,
                        items: value.items,
                    },
                );
            }

            nodes.insert(
                node_key,
                NodeInfo {
                    location: node.location,
                    name: node.name,
                },
            );
        }

        let instance_counts = instances
            .into_iter()
            .map(|(class_key, seen)| (class_key, seen.len()))
            .collect();

        debug!(
            "value model loaded with {} nodes and {} values",
            nodes.len(),
            values.len()
        );

        Ok(Self {
            command_classes,
            nodes,
            values,
            instance_counts,
            current: Mutex::new(current),
        })
    }

    /// Every declared value, in key order.
    pub fn value_keys(&self) -> Vec<ValueKey> {
        self.values.keys().copied().collect()
    }

    fn current(&self) -> MutexGuard<'_, HashMap<ValueKey, String>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn node(&self, home_id: u32, node_id: u8) -> Result<&NodeInfo, MetadataError> {
        self.nodes
            .get(&(home_id, node_id))
            .ok_or(MetadataError::UnknownNode { home_id, node_id })
    }

    fn value(&self, key: &ValueKey) -> Result<&ValueInfo, MetadataError> {
        self.node(key.home_id(), key.node_id())?;
        self.values
            .get(key)
            .ok_or(MetadataError::UnknownValue(*key))
    }
}

fn normalize_initial(key: &ValueKey, items: &[String], text: String) -> Result<String, ModelError> {
    if key.value_type() == ValueType::Schedule {
        return Ok(text);
    }
    parse_text(key.value_type(), items, &text).map_err(|reason| ModelError::InvalidInitialValue {
        key: *key,
        text,
        reason,
    })
}

fn default_text(value_type: ValueType, items: &[String]) -> String {
    match value_type {
        ValueType::Bool | ValueType::Button => "False".to_string(),
        ValueType::Byte | ValueType::Short | ValueType::Int | ValueType::Decimal => {
            "0".to_string()
        }
        ValueType::List => items.first().cloned().unwrap_or_default(),
        ValueType::String | ValueType::Schedule | ValueType::Raw => String::new(),
    }
}

/// Checks `text` against the value type and returns the text the model stores.
fn parse_text(value_type: ValueType, items: &[String], text: &str) -> Result<String, String> {
    let trimmed = text.trim();
    match value_type {
        ValueType::Bool | ValueType::Button => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "on" | "1" => Ok("True".to_string()),
            "false" | "off" | "0" => Ok("False".to_string()),
            _ => Err("expected true/false, on/off or 1/0".to_string()),
        },
        ValueType::Byte => trimmed
            .parse::<u8>()
            .map(|v| v.to_string())
            .map_err(|e| format!("not a byte: {e}")),
        ValueType::Short => trimmed
            .parse::<i16>()
            .map(|v| v.to_string())
            .map_err(|e| format!("not a short: {e}")),
        ValueType::Int => trimmed
            .parse::<i32>()
            .map(|v| v.to_string())
            .map_err(|e| format!("not an int: {e}")),
        ValueType::Decimal => match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(trimmed.to_string()),
            Ok(_) => Err("decimal must be finite".to_string()),
            Err(e) => Err(format!("not a decimal: {e}")),
        },
        ValueType::List => {
            if items.is_empty() || items.iter().any(|item| item == trimmed) {
                Ok(trimmed.to_string())
            } else {
                Err(format!("expected one of {items:?}"))
            }
        }
        ValueType::String => Ok(text.to_string()),
        ValueType::Raw => {
            let bytes = trimmed
                .split_whitespace()
                .map(|token| {
                    let digits = token.trim_start_matches("0x").trim_start_matches("0X");
                    u8::from_str_radix(digits, 16)
                        .map_err(|e| format!("'{token}' is not a hex byte: {e}"))
                })
                .collect::<Result<Vec<u8>, String>>()?;
            Ok(bytes
                .iter()
                .map(|byte| format!("0x{byte:02x}"))
                .collect::<Vec<_>>()
                .join(" "))
        }
        ValueType::Schedule => Err("schedule values cannot be set from text".to_string()),
    }
}

impl MetadataProvider for StaticValueModel {
    fn is_read_only(&self, key: &ValueKey) -> Result<bool, MetadataError> {
        Ok(self.value(key)?.read_only)
    }

    fn instance_count(
        &self,
        home_id: u32,
        node_id: u8,
        command_class_id: u8,
    ) -> Result<usize, MetadataError> {
        self.node(home_id, node_id)?;
        self.instance_counts
            .get(&(home_id, node_id, command_class_id))
            .copied()
            .ok_or(MetadataError::UnknownCommandClass(command_class_id))
    }

    fn node_location(&self, home_id: u32, node_id: u8) -> Result<String, MetadataError> {
        Ok(self.node(home_id, node_id)?.location.clone())
    }

    fn node_name(&self, home_id: u32, node_id: u8) -> Result<String, MetadataError> {
        Ok(self.node(home_id, node_id)?.name.clone())
    }

    fn command_class_name(&self, command_class_id: u8) -> Result<String, MetadataError> {
        self.command_classes
            .get(&command_class_id)
            .cloned()
            .ok_or(MetadataError::UnknownCommandClass(command_class_id))
    }

    fn value_label(&self, key: &ValueKey) -> Result<String, MetadataError> {
        Ok(self.value(key)?.label.clone())
    }

    fn value_as_text(&self, key: &ValueKey) -> Result<String, MetadataError> {
        self.value(key)?;
        self.current()
            .get(key)
            .cloned()
            .ok_or(MetadataError::UnknownValue(*key))
    }
}

impl ValueWriter for StaticValueModel {
    fn set_value_from_text(&self, key: &ValueKey, text: &str) -> Result<(), MetadataError> {
        let info = self.value(key)?;
        let rejected = |reason: String| {
            warn!("rejecting '{text}' for {key}: {reason}");
            MetadataError::Rejected {
                key: *key,
                text: text.to_string(),
                reason,
            }
        };

        if info.read_only {
            return Err(rejected("value is read-only".to_string()));
        }
        let stored = parse_text(key.value_type(), &info.items, text).map_err(rejected)?;

        debug!("setting {key} to '{stored}'");
        self.current().insert(*key, stored);
        Ok(())
    }
}
