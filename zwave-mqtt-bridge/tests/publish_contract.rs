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

mod support;

use std::collections::HashMap;
use support::{make_bridge, reference_runs, user_int};
use zwave_mqtt_bridge::{BridgeError, MetadataProvider};

#[tokio::test(flavor = "multi_thread")]
async fn publish_sends_value_text_to_both_topics() {
    let fixture = make_bridge("publish");
    let runs = reference_runs("");

    for (_, key) in &runs {
        let report = fixture.bridge.publish("", key).await.expect("publish");
        assert!(report.is_ok());
    }

    let history = fixture.bus.publish_history();
    assert_eq!(history.len(), runs.len() * 2);

    let mut expected: HashMap<String, String> = HashMap::new();
    for ((name_topic, id_topic), key) in &runs {
        let payload = fixture.network.value_as_text(key).unwrap();
        expected.insert(name_topic.clone(), payload.clone());
        expected.insert(id_topic.clone(), payload);
    }
    for (topic, payload) in history {
        assert_eq!(expected.get(&topic), Some(&payload), "unexpected publish on {topic}");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn publish_does_not_require_subscription_or_writability() {
    let fixture = make_bridge("publish-read-only");
    let meter = user_int(2, 0x32, 1, 1);
    fixture.network.set_value_read_only(meter);
    fixture.network.set_value_text(meter, "1532.4");

    fixture.bridge.subscribe("zwave", &meter).await.unwrap();
    let report = fixture.bridge.publish("zwave", &meter).await.unwrap();

    assert_eq!(report.payload, "1532.4");
    assert!(fixture.bridge.list_endpoints().await.is_empty());
    assert_eq!(
        fixture.bus.publish_history(),
        vec![
            (
                "zwave/location_h1_n2/name_h1_n2/meter/label1".to_string(),
                "1532.4".to_string()
            ),
            ("zwave/2/50/1".to_string(), "1532.4".to_string()),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn publish_failure_on_one_topic_is_reported_individually() {
    let fixture = make_bridge("publish-failure");
    let key = user_int(1, 0x25, 2, 1);
    fixture
        .bus
        .fail_publish("location_h1_n1/name_h1_n1/switch_binary/2/label1");

    let report = fixture.bridge.publish("", &key).await.unwrap();

    assert!(report.name.result.is_err());
    assert!(report.id.result.is_ok());
    assert_eq!(report.id.topic, "1/37/2/1");
    assert_eq!(fixture.bus.publish_history().len(), 1);

    let err = report.into_result().unwrap_err();
    assert!(err
        .to_string()
        .starts_with("bus publish failed for topic 'location_h1_n1/name_h1_n1/switch_binary/2/label1'"));
}

#[tokio::test(flavor = "multi_thread")]
async fn publish_of_unknown_value_fails_before_any_bus_call() {
    let fixture = make_bridge("publish-unknown");

    let err = fixture
        .bridge
        .publish("", &user_int(1, 0x99, 1, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::UnknownValue { .. }));
    assert!(fixture.bus.publish_history().is_empty());
}
