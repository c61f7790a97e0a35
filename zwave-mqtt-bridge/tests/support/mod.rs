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

use integration_test_utils::{MockDeviceNetwork, RecordingBusClient};
use std::collections::BTreeMap;
use std::sync::Arc;
use zwave_mqtt_bridge::{ValueBridge, ValueGenre, ValueKey, ValueType};

pub(crate) struct BridgeFixture {
    pub(crate) bridge: ValueBridge,
    pub(crate) network: Arc<MockDeviceNetwork>,
    pub(crate) bus: Arc<RecordingBusClient>,
}

pub(crate) fn make_bridge(name: &str) -> BridgeFixture {
    integration_test_utils::init_logging();

    let network = Arc::new(MockDeviceNetwork::reference_fixture());
    let bus = Arc::new(RecordingBusClient::new());
    let bridge = ValueBridge::with_value_writer(name, network.clone(), bus.clone(), network.clone());

    BridgeFixture {
        bridge,
        network,
        bus,
    }
}

pub(crate) fn user_int(node_id: u8, command_class_id: u8, instance: u8, index: u16) -> ValueKey {
    ValueKey::new(
        1,
        node_id,
        ValueGenre::User,
        command_class_id,
        instance,
        index,
        ValueType::Int,
    )
}

/// (name topic, id topic) -> value, as exercised by the reference fixture.
#[allow(dead_code)]
pub(crate) fn reference_runs(prefix: &str) -> Vec<((String, String), ValueKey)> {
    let with_prefix = |topic: &str| {
        if prefix.is_empty() {
            topic.to_string()
        } else {
            format!("{prefix}/{topic}")
        }
    };

    [
        ("location_h1_n1/name_h1_n1/basic/label1", "1/32/1", user_int(1, 0x20, 1, 1)),
        ("location_h1_n2/name_h1_n2/meter/label1", "2/50/1", user_int(2, 0x32, 1, 1)),
        (
            "location_h1_n1/name_h1_n1/switch_binary/1/label1",
            "1/37/1/1",
            user_int(1, 0x25, 1, 1),
        ),
        (
            "location_h1_n1/name_h1_n1/switch_binary/2/label1",
            "1/37/2/1",
            user_int(1, 0x25, 2, 1),
        ),
        (
            "location_h1_n1/name_h1_n1/switch_multilevel/1/label1",
            "1/38/1/1",
            user_int(1, 0x26, 1, 1),
        ),
        (
            "location_h1_n1/name_h1_n1/switch_multilevel/2/label1",
            "1/38/2/1",
            user_int(1, 0x26, 2, 1),
        ),
    ]
    .into_iter()
    .map(|(name, id, key)| ((with_prefix(name), with_prefix(id)), key))
    .collect()
}

/// Registered endpoints match `runs` and the bus subscribe history matches the
/// endpoints one to one.
#[allow(dead_code)]
pub(crate) fn assert_subscriptions(
    endpoints: &BTreeMap<String, ValueKey>,
    subscribe_history: &[String],
    runs: &[((String, String), ValueKey)],
) {
    assert_eq!(endpoints.len(), subscribe_history.len());
    assert_eq!(endpoints.len(), runs.len() * 2);

    for ((name_topic, id_topic), key) in runs {
        assert_eq!(endpoints.get(name_topic), Some(key), "missing {name_topic}");
        assert_eq!(endpoints.get(id_topic), Some(key), "missing {id_topic}");
    }

    for topic in subscribe_history {
        assert!(endpoints.contains_key(topic), "unexpected subscribe {topic}");
    }
}
