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

use crate::bus::BusClient;
use crate::control_plane::subscription_manager::{SubscribeOutcome, SubscriptionManager};
use crate::data_plane::inbound_router::InboundRouter;
use crate::data_plane::publisher::{PublishReport, Publisher};
use crate::error::BridgeError;
use crate::metadata::{MetadataProvider, ValueWriter};
use crate::observability::{events, fields};
use crate::value_key::ValueKey;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

const VALUE_BRIDGE_TAG: &str = "ValueBridge:";

/// Summary of a [`ValueBridge::sync_values`] sweep.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Values with at least one registered topic after the sweep.
    pub subscribed: usize,
    /// Values skipped because of their genre or read-only status.
    pub skipped: usize,
    /// Values published to both topics without failure.
    pub published: usize,
    /// Topics unsubscribed because the model no longer derives them.
    pub stale_removed: usize,
    pub failures: Vec<(ValueKey, BridgeError)>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// [`ValueBridge`] keeps a device-value model and a publish/subscribe bus consistent.
///
/// Writable user values are subscribed under their name-based and id-based topics so
/// bus messages can drive the device, and value state is published to both topics.
/// The bridge owns its endpoint registry; call [`ValueBridge::unsubscribe_all`] to
/// tear it down.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use zwave_mqtt_bridge::{ValueBridge, ValueGenre, ValueKey, ValueType};
///
/// # pub mod fakes {
/// #     use async_trait::async_trait;
/// #     use zwave_mqtt_bridge::{BusClient, BusError, MetadataError, MetadataProvider, ValueKey};
/// #
/// #     pub struct Kitchen;
/// #
/// #     impl MetadataProvider for Kitchen {
/// #         fn is_read_only(&self, _: &ValueKey) -> Result<bool, MetadataError> { Ok(false) }
/// #         fn instance_count(&self, _: u32, _: u8, _: u8) -> Result<usize, MetadataError> { Ok(1) }
/// #         fn node_location(&self, _: u32, _: u8) -> Result<String, MetadataError> { Ok("kitchen".into()) }
/// #         fn node_name(&self, _: u32, _: u8) -> Result<String, MetadataError> { Ok("lamp".into()) }
/// #         fn command_class_name(&self, _: u8) -> Result<String, MetadataError> { Ok("switch_binary".into()) }
/// #         fn value_label(&self, _: &ValueKey) -> Result<String, MetadataError> { Ok("switch".into()) }
/// #         fn value_as_text(&self, _: &ValueKey) -> Result<String, MetadataError> { Ok("True".into()) }
/// #     }
/// #
/// #     pub struct NoopBus;
/// #
/// #     #[async_trait]
/// #     impl BusClient for NoopBus {
/// #         async fn subscribe(&self, _: &str) -> Result<(), BusError> { Ok(()) }
/// #         async fn unsubscribe(&self, _: &str) -> Result<(), BusError> { Ok(()) }
/// #         async fn publish(&self, _: &str, _: &str) -> Result<(), BusError> { Ok(()) }
/// #     }
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let bridge = ValueBridge::new("kitchen", Arc::new(fakes::Kitchen), Arc::new(fakes::NoopBus));
/// let lamp = ValueKey::new(1, 5, ValueGenre::User, 0x25, 1, 0, ValueType::Bool);
///
/// bridge.subscribe("zwave", &lamp).await.unwrap();
/// let endpoints = bridge.list_endpoints().await;
/// assert!(endpoints.contains_key("zwave/kitchen/lamp/switch_binary/switch"));
/// assert!(endpoints.contains_key("zwave/5/37/0"));
///
/// bridge.unsubscribe_all().await.unwrap();
/// assert!(bridge.list_endpoints().await.is_empty());
/// # });
/// ```
pub struct ValueBridge {
    name: String,
    subscriptions: SubscriptionManager,
    publisher: Publisher,
    inbound: InboundRouter,
}

impl ValueBridge {
    /// Creates a bridge without a write path; inbound messages are rejected.
    pub fn new(name: &str, metadata: Arc<dyn MetadataProvider>, bus: Arc<dyn BusClient>) -> Self {
        Self::build(name, metadata, bus, None)
    }

    /// Creates a bridge that applies inbound messages through `writer`.
    pub fn with_value_writer(
        name: &str,
        metadata: Arc<dyn MetadataProvider>,
        bus: Arc<dyn BusClient>,
        writer: Arc<dyn ValueWriter>,
    ) -> Self {
        Self::build(name, metadata, bus, Some(writer))
    }

    fn build(
        name: &str,
        metadata: Arc<dyn MetadataProvider>,
        bus: Arc<dyn BusClient>,
        writer: Option<Arc<dyn ValueWriter>>,
    ) -> Self {
        let name = format!("{VALUE_BRIDGE_TAG}{name}");
        debug!("{name}: created");

        Self {
            name,
            subscriptions: SubscriptionManager::new(metadata.clone(), bus.clone()),
            publisher: Publisher::new(metadata, bus),
            inbound: InboundRouter::new(writer),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers both topics of `key` and subscribes to each newly created one.
    ///
    /// Non-user and read-only values are skipped without touching the registry.
    pub async fn subscribe(
        &self,
        prefix: &str,
        key: &ValueKey,
    ) -> Result<SubscribeOutcome, BridgeError> {
        self.subscriptions.subscribe(prefix, key).await
    }

    /// Unsubscribes every registered topic of `key`, returning the removed topics.
    pub async fn unsubscribe(&self, key: &ValueKey) -> Result<Vec<String>, BridgeError> {
        self.subscriptions.unsubscribe(key).await
    }

    pub async fn unsubscribe_topic(&self, topic: &str) -> Result<Option<ValueKey>, BridgeError> {
        self.subscriptions.unsubscribe_topic(topic).await
    }

    /// Unsubscribes every registered topic and empties the registry.
    pub async fn unsubscribe_all(&self) -> Result<usize, BridgeError> {
        self.subscriptions.unsubscribe_all().await
    }

    /// Publishes the current text of `key` to both of its topics.
    pub async fn publish(&self, prefix: &str, key: &ValueKey) -> Result<PublishReport, BridgeError> {
        self.publisher.publish(prefix, key).await
    }

    pub async fn list_endpoints(&self) -> BTreeMap<String, ValueKey> {
        self.subscriptions.endpoints().await
    }

    pub async fn lookup_by_topic(&self, topic: &str) -> Option<ValueKey> {
        self.subscriptions.lookup_by_topic(topic).await
    }

    /// Applies an inbound bus message to the value registered under `topic`.
    pub async fn route_inbound(&self, topic: &str, payload: &str) -> Result<ValueKey, BridgeError> {
        let registered = self.subscriptions.lookup_by_topic(topic).await;
        self.inbound.route(topic, registered, payload)
    }

    /// Rebuilds bridge state from the live device model.
    ///
    /// Every key is subscribed (when eligible) and published. Afterwards only the
    /// topics derived from `prefix` for eligible keys stay registered: topics of
    /// values missing from `keys`, of values that became read-only or non-user, and
    /// of earlier prefixes are unsubscribed. Topics of a key whose subscribe failed
    /// are left in place. Per-value failures are collected and do not stop the sweep.
    pub async fn sync_values<I>(&self, prefix: &str, keys: I) -> SyncReport
    where
        I: IntoIterator<Item = ValueKey>,
    {
        let keys: BTreeSet<ValueKey> = keys.into_iter().collect();
        info!(
            event = events::SYNC_START,
            bridge = %self.name,
            prefix = fields::format_prefix(prefix),
            values = keys.len(),
            "synchronizing values"
        );

        let mut report = SyncReport::default();

        // Drop removed values first so their topics cannot collide with new ones.
        let registered: BTreeSet<ValueKey> = self.list_endpoints().await.into_values().collect();
        for stale in registered.difference(&keys) {
            match self.unsubscribe(stale).await {
                Ok(removed) => report.stale_removed += removed.len(),
                Err(err) => report.failures.push((*stale, err)),
            }
        }

        let mut expected: HashSet<String> = HashSet::new();
        let mut unsettled: HashSet<ValueKey> = HashSet::new();

        for key in &keys {
            match self.subscribe(prefix, key).await {
                Ok(SubscribeOutcome::Skipped(_)) => report.skipped += 1,
                Ok(SubscribeOutcome::Subscribed { created, existing }) => {
                    report.subscribed += 1;
                    expected.extend(created);
                    expected.extend(existing);
                }
                Err(err) => {
                    unsettled.insert(*key);
                    report.failures.push((*key, err));
                }
            }

            match self.publish(prefix, key).await {
                Ok(publish_report) => match publish_report.into_result() {
                    Ok(()) => report.published += 1,
                    Err(err) => report.failures.push((*key, err)),
                },
                Err(err) => report.failures.push((*key, err)),
            }
        }

        for (topic, key) in self.list_endpoints().await {
            if expected.contains(&topic) || unsettled.contains(&key) {
                continue;
            }
            debug!(
                bridge = %self.name,
                topic = %topic,
                value_key = %key,
                "dropping endpoint no longer derived from the model"
            );
            match self.unsubscribe_topic(&topic).await {
                Ok(Some(_)) => report.stale_removed += 1,
                Ok(None) => {}
                Err(err) => report.failures.push((key, err)),
            }
        }

        info!(
            event = events::SYNC_DONE,
            bridge = %self.name,
            subscribed = report.subscribed,
            skipped = report.skipped,
            published = report.published,
            stale_removed = report.stale_removed,
            failures = report.failures.len(),
            "synchronized values"
        );
        report
    }
}
