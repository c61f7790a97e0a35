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

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use tracing::debug;
use zwave_mqtt_bridge::{MetadataError, MetadataProvider, ValueKey, ValueWriter};

pub const COMMAND_CLASS_BASIC: u8 = 0x20;
pub const COMMAND_CLASS_SWITCH_BINARY: u8 = 0x25;
pub const COMMAND_CLASS_SWITCH_MULTILEVEL: u8 = 0x26;
pub const COMMAND_CLASS_SENSOR_MULTILEVEL: u8 = 0x31;
pub const COMMAND_CLASS_METER: u8 = 0x32;
pub const COMMAND_CLASS_CONFIGURATION: u8 = 0x70;

fn command_class_display_name(command_class_id: u8) -> Option<&'static str> {
    match command_class_id {
        COMMAND_CLASS_BASIC => Some("basic"),
        COMMAND_CLASS_SWITCH_BINARY => Some("switch_binary"),
        COMMAND_CLASS_SWITCH_MULTILEVEL => Some("switch_multilevel"),
        COMMAND_CLASS_SENSOR_MULTILEVEL => Some("sensor_multilevel"),
        COMMAND_CLASS_METER => Some("meter"),
        COMMAND_CLASS_CONFIGURATION => Some("configuration"),
        _ => None,
    }
}

#[derive(Default)]
struct NetworkState {
    nodes: BTreeSet<(u32, u8)>,
    read_only: HashSet<ValueKey>,
    rejecting: HashSet<ValueKey>,
    instance_counts: HashMap<(u32, u8, u8), usize>,
    values: HashMap<ValueKey, String>,
    writes: Vec<(ValueKey, String)>,
}

/// In-memory device network with deterministic naming.
///
/// Nodes report location `location_h{home}_n{node}` and name `name_h{home}_n{node}`,
/// value labels are `label{index}`. Unknown nodes fail every query.
#[derive(Default)]
pub struct MockDeviceNetwork {
    state: Mutex<NetworkState>,
}

impl MockDeviceNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes 1 and 2 on home 1; node 1 carries two instances of the binary and
    /// multilevel switch command classes.
    pub fn reference_fixture() -> Self {
        let network = Self::new();
        network.node_add(1, 1);
        network.node_add(1, 2);
        network.set_instance_count(1, 1, COMMAND_CLASS_SWITCH_BINARY, 2);
        network.set_instance_count(1, 1, COMMAND_CLASS_SWITCH_MULTILEVEL, 2);
        network
    }

    fn state(&self) -> std::sync::MutexGuard<'_, NetworkState> {
        self.state.lock().expect("mock device network lock poisoned")
    }

    pub fn node_add(&self, home_id: u32, node_id: u8) {
        self.state().nodes.insert((home_id, node_id));
    }

    pub fn node_remove_all(&self) {
        let mut state = self.state();
        state.nodes.clear();
        state.instance_counts.clear();
    }

    pub fn set_value_read_only(&self, key: ValueKey) {
        self.state().read_only.insert(key);
    }

    /// Makes writes to `key` fail with [`MetadataError::Rejected`].
    pub fn reject_writes_to(&self, key: ValueKey) {
        self.state().rejecting.insert(key);
    }

    pub fn set_instance_count(&self, home_id: u32, node_id: u8, command_class_id: u8, count: usize) {
        self.state()
            .instance_counts
            .insert((home_id, node_id, command_class_id), count);
    }

    pub fn set_value_text(&self, key: ValueKey, text: &str) {
        self.state().values.insert(key, text.to_string());
    }

    pub fn write_history(&self) -> Vec<(ValueKey, String)> {
        self.state().writes.clone()
    }

    fn ensure_node(state: &NetworkState, home_id: u32, node_id: u8) -> Result<(), MetadataError> {
        if state.nodes.contains(&(home_id, node_id)) {
            Ok(())
        } else {
            Err(MetadataError::UnknownNode { home_id, node_id })
        }
    }

    fn default_value_text(key: &ValueKey) -> String {
        format!(
            "{}:{}:{}:{}",
            key.node_id(),
            key.command_class_id(),
            key.instance(),
            key.index()
        )
    }
}

impl MetadataProvider for MockDeviceNetwork {
    fn is_read_only(&self, key: &ValueKey) -> Result<bool, MetadataError> {
        let state = self.state();
        Self::ensure_node(&state, key.home_id(), key.node_id())?;
        Ok(state.read_only.contains(key))
    }

    fn instance_count(
        &self,
        home_id: u32,
        node_id: u8,
        command_class_id: u8,
    ) -> Result<usize, MetadataError> {
        let state = self.state();
        Self::ensure_node(&state, home_id, node_id)?;
        Ok(state
            .instance_counts
            .get(&(home_id, node_id, command_class_id))
            .copied()
            .unwrap_or(1))
    }

    fn node_location(&self, home_id: u32, node_id: u8) -> Result<String, MetadataError> {
        Self::ensure_node(&self.state(), home_id, node_id)?;
        Ok(format!("location_h{home_id}_n{node_id}"))
    }

    fn node_name(&self, home_id: u32, node_id: u8) -> Result<String, MetadataError> {
        Self::ensure_node(&self.state(), home_id, node_id)?;
        Ok(format!("name_h{home_id}_n{node_id}"))
    }

    fn command_class_name(&self, command_class_id: u8) -> Result<String, MetadataError> {
        command_class_display_name(command_class_id)
            .map(str::to_string)
            .ok_or(MetadataError::UnknownCommandClass(command_class_id))
    }

    fn value_label(&self, key: &ValueKey) -> Result<String, MetadataError> {
        Self::ensure_node(&self.state(), key.home_id(), key.node_id())?;
        Ok(format!("label{}", key.index()))
    }

    fn value_as_text(&self, key: &ValueKey) -> Result<String, MetadataError> {
        let state = self.state();
        Self::ensure_node(&state, key.home_id(), key.node_id())?;
        Ok(state
            .values
            .get(key)
            .cloned()
            .unwrap_or_else(|| Self::default_value_text(key)))
    }
}

impl ValueWriter for MockDeviceNetwork {
    fn set_value_from_text(&self, key: &ValueKey, text: &str) -> Result<(), MetadataError> {
        let mut state = self.state();
        Self::ensure_node(&state, key.home_id(), key.node_id())?;
        if state.rejecting.contains(key) {
            return Err(MetadataError::Rejected {
                key: *key,
                text: text.to_string(),
                reason: "mock rejects writes to this value".to_string(),
            });
        }

        debug!("MockDeviceNetwork: setting {key} to '{text}'");
        state.values.insert(*key, text.to_string());
        state.writes.push((*key, text.to_string()));
        Ok(())
    }
}
