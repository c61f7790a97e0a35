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

//! Subscription orchestration: eligibility, topic registration and bus calls.

use crate::bus::BusClient;
use crate::control_plane::endpoint_registry::EndpointRegistry;
use crate::error::{BridgeError, BusOperation};
use crate::metadata::MetadataProvider;
use crate::observability::{events, fields};
use crate::topics::{build_topics, ValueMetadata};
use crate::value_key::{ValueGenre, ValueKey};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, Notify};
use tracing::{debug, warn};

const COMPONENT: &str = "subscription_manager";

/// Why a value was not subscribed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SkipReason {
    /// Only user-genre values accept inbound commands.
    NonUserGenre(ValueGenre),
    /// Read-only values are published but never subscribed.
    ReadOnly,
}

/// Result of a successful [`ValueBridge::subscribe`](crate::ValueBridge::subscribe).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SubscribeOutcome {
    Skipped(SkipReason),
    Subscribed {
        /// Topics that were absent and got a bus subscription in this call.
        created: Vec<String>,
        /// Topics that were already registered for the same value.
        existing: Vec<String>,
    },
}

#[derive(Default)]
struct RegistryState {
    endpoints: EndpointRegistry,
    /// Topics with a bus call in flight, and the value that claimed them.
    in_flight: HashMap<String, ValueKey>,
}

impl RegistryState {
    fn claim<'a>(&mut self, topics: impl IntoIterator<Item = &'a String>, key: ValueKey) {
        for topic in topics {
            self.in_flight.insert(topic.clone(), key);
        }
    }
}

/// Owns the endpoint registry and keeps it in step with bus subscriptions.
///
/// Topics are claimed under the registry guard before any bus call and released
/// once the call has settled. Bus calls run without the guard, so values with
/// disjoint topics proceed in parallel, while a claimed topic is never subscribed
/// or unsubscribed twice. Callers must drive each operation to completion.
pub(crate) struct SubscriptionManager {
    metadata: Arc<dyn MetadataProvider>,
    bus: Arc<dyn BusClient>,
    state: Mutex<RegistryState>,
    settled: Notify,
}

impl SubscriptionManager {
    pub(crate) fn new(metadata: Arc<dyn MetadataProvider>, bus: Arc<dyn BusClient>) -> Self {
        Self {
            metadata,
            bus,
            state: Mutex::new(RegistryState::default()),
            settled: Notify::new(),
        }
    }

    /// Locks the registry once `blocked` no longer holds.
    async fn lock_when<F>(&self, blocked: F) -> MutexGuard<'_, RegistryState>
    where
        F: Fn(&RegistryState) -> bool,
    {
        loop {
            let settled = self.settled.notified();
            let state = self.state.lock().await;
            if !blocked(&state) {
                return state;
            }
            drop(state);
            settled.await;
        }
    }

    /// Releases claimed topics, binding `register` to them when given.
    async fn settle(&self, claimed: &[String], register: Option<ValueKey>) {
        let mut state = self.state.lock().await;
        for topic in claimed {
            state.in_flight.remove(topic);
            if let Some(key) = register {
                state.endpoints.insert(topic.as_str(), key);
            }
        }
        drop(state);
        self.settled.notify_waiters();
    }

    /// Releases claimed topics and drops the ones in `removed` from the registry.
    async fn settle_removal(&self, claimed: &[String], removed: &[String]) {
        let mut state = self.state.lock().await;
        for topic in claimed {
            state.in_flight.remove(topic);
        }
        for topic in removed {
            state.endpoints.remove(topic);
        }
        drop(state);
        self.settled.notify_waiters();
    }

    pub(crate) async fn subscribe(
        &self,
        prefix: &str,
        key: &ValueKey,
    ) -> Result<SubscribeOutcome, BridgeError> {
        let value_key = fields::format_value_key(key);

        let genre = self
            .metadata
            .genre(key)
            .map_err(|err| BridgeError::unknown_value(key, err))?;
        if genre != ValueGenre::User {
            debug!(
                event = events::SUBSCRIBE_SKIPPED_GENRE,
                component = COMPONENT,
                value_key = %value_key,
                genre = %genre,
                "skipping non-user value"
            );
            return Ok(SubscribeOutcome::Skipped(SkipReason::NonUserGenre(genre)));
        }

        let read_only = self
            .metadata
            .is_read_only(key)
            .map_err(|err| BridgeError::unknown_value(key, err))?;
        if read_only {
            debug!(
                event = events::SUBSCRIBE_SKIPPED_READ_ONLY,
                component = COMPONENT,
                value_key = %value_key,
                "skipping read-only value"
            );
            return Ok(SubscribeOutcome::Skipped(SkipReason::ReadOnly));
        }

        let value_metadata = ValueMetadata::resolve(self.metadata.as_ref(), key).map_err(|err| {
            warn!(
                event = events::METADATA_RESOLVE_FAILED,
                component = COMPONENT,
                value_key = %value_key,
                err = %err,
                "unable to resolve topic metadata"
            );
            BridgeError::unknown_value(key, err)
        })?;
        let topics: Vec<String> = build_topics(prefix, key, &value_metadata)
            .as_array()
            .iter()
            .map(|topic| topic.to_string())
            .collect();

        let (to_create, existing) = {
            let mut state = self
                .lock_when(|state| topics.iter().any(|topic| state.in_flight.contains_key(topic)))
                .await;

            for topic in &topics {
                if let Some(existing) = state.endpoints.lookup_by_topic(topic) {
                    if existing != *key {
                        warn!(
                            event = events::SUBSCRIBE_TOPIC_COLLISION,
                            component = COMPONENT,
                            topic = %topic,
                            value_key = %value_key,
                            existing = %existing,
                            "topic already bound to another value"
                        );
                        return Err(BridgeError::TopicCollision {
                            topic: topic.clone(),
                            existing,
                            requested: *key,
                        });
                    }
                }
            }

            let (existing, to_create): (Vec<String>, Vec<String>) = topics
                .iter()
                .cloned()
                .partition(|topic| state.endpoints.contains(topic));
            state.claim(&to_create, *key);
            (to_create, existing)
        };

        for topic in &existing {
            debug!(
                event = events::SUBSCRIBE_TOPIC_EXISTS,
                component = COMPONENT,
                topic = %topic,
                value_key = %value_key,
                "topic already registered"
            );
        }

        let mut created: Vec<String> = Vec::with_capacity(to_create.len());
        for topic in &to_create {
            if let Err(err) = self.bus.subscribe(topic).await {
                warn!(
                    event = events::SUBSCRIBE_TOPIC_FAILED,
                    component = COMPONENT,
                    topic = %topic,
                    value_key = %value_key,
                    prefix = fields::format_prefix(prefix),
                    err = %err,
                    "unable to subscribe topic"
                );
                self.rollback(&created, &value_key).await;
                self.settle(&to_create, None).await;
                return Err(BridgeError::transport(BusOperation::Subscribe, topic, err));
            }

            debug!(
                event = events::SUBSCRIBE_TOPIC_OK,
                component = COMPONENT,
                topic = %topic,
                value_key = %value_key,
                "subscribed topic"
            );
            created.push(topic.clone());
        }

        self.settle(&to_create, Some(*key)).await;
        Ok(SubscribeOutcome::Subscribed { created, existing })
    }

    async fn rollback(&self, created: &[String], value_key: &str) {
        for topic in created {
            if let Err(err) = self.bus.unsubscribe(topic).await {
                warn!(
                    event = events::SUBSCRIBE_ROLLBACK,
                    component = COMPONENT,
                    topic = %topic,
                    value_key,
                    reason = fields::REASON_ROLLBACK_AFTER_SUBSCRIBE_FAILURE,
                    err = %err,
                    "unable to unsubscribe topic during rollback"
                );
            } else {
                debug!(
                    event = events::SUBSCRIBE_ROLLBACK,
                    component = COMPONENT,
                    topic = %topic,
                    value_key,
                    reason = fields::REASON_ROLLBACK_AFTER_SUBSCRIBE_FAILURE,
                    "rolled back topic"
                );
            }
        }
    }

    /// Unsubscribes every registered topic of `key`. Topics whose bus unsubscribe
    /// fails stay registered and the first failure is returned.
    pub(crate) async fn unsubscribe(&self, key: &ValueKey) -> Result<Vec<String>, BridgeError> {
        let topics = {
            let mut state = self
                .lock_when(|state| state.in_flight.values().any(|claimed| claimed == key))
                .await;
            let topics = state.endpoints.topics_for(key);
            state.claim(&topics, *key);
            topics
        };

        if topics.is_empty() {
            debug!(
                event = events::UNSUBSCRIBE_TOPIC_MISSING,
                component = COMPONENT,
                value_key = %key,
                "no registered topics for value"
            );
        }

        let mut removed = Vec::with_capacity(topics.len());
        let mut first_failure = None;

        for topic in &topics {
            match self.bus_unsubscribe(topic).await {
                Ok(()) => removed.push(topic.clone()),
                Err(err) => {
                    first_failure.get_or_insert(err);
                }
            }
        }

        self.settle_removal(&topics, &removed).await;

        match first_failure {
            Some(err) => Err(err),
            None => Ok(removed),
        }
    }

    /// Unsubscribes one topic, returning the key it was bound to.
    pub(crate) async fn unsubscribe_topic(
        &self,
        topic: &str,
    ) -> Result<Option<ValueKey>, BridgeError> {
        let claimed = [topic.to_string()];
        let key = {
            let mut state = self
                .lock_when(|state| state.in_flight.contains_key(topic))
                .await;
            let Some(key) = state.endpoints.lookup_by_topic(topic) else {
                debug!(
                    event = events::UNSUBSCRIBE_TOPIC_MISSING,
                    component = COMPONENT,
                    topic,
                    "topic not registered"
                );
                return Ok(None);
            };
            state.claim(&claimed, key);
            key
        };

        let result = self.bus_unsubscribe(topic).await;
        let removed: &[String] = if result.is_ok() { &claimed } else { &[] };
        self.settle_removal(&claimed, removed).await;

        result.map(|()| Some(key))
    }

    async fn bus_unsubscribe(&self, topic: &str) -> Result<(), BridgeError> {
        if let Err(err) = self.bus.unsubscribe(topic).await {
            warn!(
                event = events::UNSUBSCRIBE_TOPIC_FAILED,
                component = COMPONENT,
                topic,
                err = %err,
                "unable to unsubscribe topic"
            );
            return Err(BridgeError::transport(
                BusOperation::Unsubscribe,
                topic,
                err,
            ));
        }

        debug!(
            event = events::UNSUBSCRIBE_TOPIC_OK,
            component = COMPONENT,
            topic,
            "unsubscribed topic"
        );
        Ok(())
    }

    /// Unsubscribes every registered topic and clears the registry.
    ///
    /// The registry ends up empty even when some bus calls fail.
    pub(crate) async fn unsubscribe_all(&self) -> Result<usize, BridgeError> {
        let drained: Vec<String> = {
            let mut state = self.lock_when(|state| !state.in_flight.is_empty()).await;
            let drained = state.endpoints.remove_all();
            for (topic, key) in &drained {
                state.in_flight.insert(topic.clone(), *key);
            }
            drained.into_keys().collect()
        };
        let total = drained.len();
        let mut failed = 0;

        for topic in &drained {
            if let Err(err) = self.bus.unsubscribe(topic).await {
                failed += 1;
                warn!(
                    event = events::UNSUBSCRIBE_TOPIC_FAILED,
                    component = COMPONENT,
                    topic = %topic,
                    reason = fields::REASON_TEARDOWN,
                    err = %err,
                    "unable to unsubscribe topic during teardown"
                );
            }
        }

        self.settle_removal(&drained, &[]).await;

        debug!(
            event = events::UNSUBSCRIBE_ALL_DONE,
            component = COMPONENT,
            total,
            failed,
            "cleared endpoint registry"
        );

        if failed > 0 {
            return Err(BridgeError::Teardown { failed, total });
        }
        Ok(total)
    }

    pub(crate) async fn lookup_by_topic(&self, topic: &str) -> Option<ValueKey> {
        self.state.lock().await.endpoints.lookup_by_topic(topic)
    }

    pub(crate) async fn endpoints(&self) -> BTreeMap<String, ValueKey> {
        self.state.lock().await.endpoints.all()
    }
}

#[cfg(test)]
mod tests {
    use super::{SkipReason, SubscribeOutcome, SubscriptionManager};
    use crate::bus::{BusClient, BusError};
    use crate::error::{BridgeError, BusOperation};
    use crate::metadata::{MetadataError, MetadataProvider};
    use crate::value_key::{ValueGenre, ValueKey, ValueType};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct FixtureMetadata {
        read_only: HashSet<ValueKey>,
        same_label_everywhere: bool,
    }

    impl MetadataProvider for FixtureMetadata {
        fn is_read_only(&self, key: &ValueKey) -> Result<bool, MetadataError> {
            Ok(self.read_only.contains(key))
        }

        fn instance_count(&self, _: u32, _: u8, _: u8) -> Result<usize, MetadataError> {
            Ok(1)
        }

        fn node_location(&self, home_id: u32, node_id: u8) -> Result<String, MetadataError> {
            if node_id == 0 {
                return Err(MetadataError::UnknownNode { home_id, node_id });
            }
            if self.same_label_everywhere {
                return Ok("hall".to_string());
            }
            Ok(format!("location_h{home_id}_n{node_id}"))
        }

        fn node_name(&self, home_id: u32, node_id: u8) -> Result<String, MetadataError> {
            if self.same_label_everywhere {
                return Ok("sensor".to_string());
            }
            Ok(format!("name_h{home_id}_n{node_id}"))
        }

        fn command_class_name(&self, _: u8) -> Result<String, MetadataError> {
            Ok("basic".to_string())
        }

        fn value_label(&self, key: &ValueKey) -> Result<String, MetadataError> {
            Ok(format!("label{}", key.index()))
        }

        fn value_as_text(&self, _: &ValueKey) -> Result<String, MetadataError> {
            Ok("0".to_string())
        }
    }

    #[derive(Default)]
    struct CountingBus {
        subscribed: Mutex<Vec<String>>,
        unsubscribed: Mutex<Vec<String>>,
        failing_subscribe: Option<String>,
    }

    #[async_trait]
    impl BusClient for CountingBus {
        async fn subscribe(&self, topic: &str) -> Result<(), BusError> {
            if self.failing_subscribe.as_deref() == Some(topic) {
                return Err(BusError::new("subscribe rejected"));
            }
            self.subscribed.lock().unwrap().push(topic.to_string());
            Ok(())
        }

        async fn unsubscribe(&self, topic: &str) -> Result<(), BusError> {
            self.unsubscribed.lock().unwrap().push(topic.to_string());
            Ok(())
        }

        async fn publish(&self, _topic: &str, _payload: &str) -> Result<(), BusError> {
            Ok(())
        }
    }

    /// Bus whose subscribe of `gated` parks until `release` is notified.
    struct GatedBus {
        gated: String,
        entered: Notify,
        release: Notify,
        subscribed: Mutex<Vec<String>>,
    }

    impl GatedBus {
        fn new(gated: &str) -> Self {
            Self {
                gated: gated.to_string(),
                entered: Notify::new(),
                release: Notify::new(),
                subscribed: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl BusClient for GatedBus {
        async fn subscribe(&self, topic: &str) -> Result<(), BusError> {
            if topic == self.gated {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.subscribed.lock().unwrap().push(topic.to_string());
            Ok(())
        }

        async fn unsubscribe(&self, _topic: &str) -> Result<(), BusError> {
            Ok(())
        }

        async fn publish(&self, _topic: &str, _payload: &str) -> Result<(), BusError> {
            Ok(())
        }
    }

    fn basic_key(node_id: u8) -> ValueKey {
        ValueKey::new(1, node_id, ValueGenre::User, 0x20, 1, 1, ValueType::Int)
    }

    #[tokio::test]
    async fn subscribe_registers_both_topics_once() {
        let bus = Arc::new(CountingBus::default());
        let manager = SubscriptionManager::new(Arc::new(FixtureMetadata::default()), bus.clone());
        let key = basic_key(1);

        let first = manager.subscribe("", &key).await.expect("first subscribe");
        let second = manager.subscribe("", &key).await.expect("second subscribe");

        assert_eq!(
            first,
            SubscribeOutcome::Subscribed {
                created: vec![
                    "location_h1_n1/name_h1_n1/basic/label1".to_string(),
                    "1/32/1".to_string()
                ],
                existing: vec![],
            }
        );
        assert_eq!(
            second,
            SubscribeOutcome::Subscribed {
                created: vec![],
                existing: vec![
                    "location_h1_n1/name_h1_n1/basic/label1".to_string(),
                    "1/32/1".to_string()
                ],
            }
        );
        assert_eq!(bus.subscribed.lock().unwrap().len(), 2);
        assert_eq!(manager.endpoints().await.len(), 2);
    }

    #[tokio::test]
    async fn read_only_and_non_user_values_are_skipped() {
        let read_only_key = basic_key(1);
        let config_key = ValueKey::new(1, 1, ValueGenre::Config, 0x70, 1, 3, ValueType::Byte);
        let metadata = FixtureMetadata {
            read_only: HashSet::from([read_only_key]),
            ..Default::default()
        };
        let bus = Arc::new(CountingBus::default());
        let manager = SubscriptionManager::new(Arc::new(metadata), bus.clone());

        assert_eq!(
            manager.subscribe("", &read_only_key).await.unwrap(),
            SubscribeOutcome::Skipped(SkipReason::ReadOnly)
        );
        assert_eq!(
            manager.subscribe("", &config_key).await.unwrap(),
            SubscribeOutcome::Skipped(SkipReason::NonUserGenre(ValueGenre::Config))
        );
        assert!(manager.endpoints().await.is_empty());
        assert!(bus.subscribed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_subscribe_rolls_back_earlier_topics() {
        let bus = Arc::new(CountingBus {
            failing_subscribe: Some("1/32/1".to_string()),
            ..Default::default()
        });
        let manager = SubscriptionManager::new(Arc::new(FixtureMetadata::default()), bus.clone());

        let err = manager
            .subscribe("", &basic_key(1))
            .await
            .expect_err("id topic subscribe should fail");

        assert!(matches!(
            err,
            BridgeError::Transport {
                operation: BusOperation::Subscribe,
                ref topic,
                ..
            } if topic == "1/32/1"
        ));
        assert!(manager.endpoints().await.is_empty());
        assert_eq!(
            *bus.unsubscribed.lock().unwrap(),
            vec!["location_h1_n1/name_h1_n1/basic/label1".to_string()]
        );
    }

    #[tokio::test]
    async fn colliding_name_topic_is_rejected_without_overwrite() {
        let metadata = FixtureMetadata {
            same_label_everywhere: true,
            ..Default::default()
        };
        let bus = Arc::new(CountingBus::default());
        let manager = SubscriptionManager::new(Arc::new(metadata), bus.clone());

        manager.subscribe("", &basic_key(1)).await.unwrap();
        let err = manager
            .subscribe("", &basic_key(2))
            .await
            .expect_err("second node should collide on the name topic");

        assert!(matches!(err, BridgeError::TopicCollision { .. }));
        assert_eq!(
            manager.lookup_by_topic("hall/sensor/basic/label1").await,
            Some(basic_key(1))
        );
        assert_eq!(manager.lookup_by_topic("2/32/1").await, None);
        assert_eq!(bus.subscribed.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unresolvable_value_is_a_hard_failure() {
        let bus = Arc::new(CountingBus::default());
        let manager = SubscriptionManager::new(Arc::new(FixtureMetadata::default()), bus.clone());

        let err = manager
            .subscribe("", &basic_key(0))
            .await
            .expect_err("node 0 is unknown");

        assert!(matches!(err, BridgeError::UnknownValue { .. }));
        assert!(bus.subscribed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsubscribe_by_key_and_topic() {
        let bus = Arc::new(CountingBus::default());
        let manager = SubscriptionManager::new(Arc::new(FixtureMetadata::default()), bus.clone());
        manager.subscribe("", &basic_key(1)).await.unwrap();
        manager.subscribe("", &basic_key(2)).await.unwrap();

        let removed = manager.unsubscribe(&basic_key(1)).await.unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(
            manager.unsubscribe_topic("2/32/1").await.unwrap(),
            Some(basic_key(2))
        );
        assert_eq!(manager.unsubscribe_topic("2/32/1").await.unwrap(), None);

        assert_eq!(manager.endpoints().await.len(), 1);
        assert_eq!(bus.unsubscribed.lock().unwrap().len(), 3);

        assert_eq!(manager.unsubscribe_all().await.unwrap(), 1);
        assert!(manager.endpoints().await.is_empty());
        assert_eq!(bus.unsubscribed.lock().unwrap().len(), 4);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pending_bus_subscribe_only_blocks_its_own_topics() {
        let bus = Arc::new(GatedBus::new("1/32/1"));
        let manager = Arc::new(SubscriptionManager::new(
            Arc::new(FixtureMetadata::default()),
            bus.clone(),
        ));

        let pending = tokio::spawn({
            let manager = manager.clone();
            async move { manager.subscribe("", &basic_key(1)).await }
        });
        bus.entered.notified().await;

        let other = tokio::time::timeout(
            Duration::from_secs(5),
            manager.subscribe("", &basic_key(2)),
        )
        .await
        .expect("another value should subscribe while node 1 is pending")
        .unwrap();
        assert!(matches!(
            other,
            SubscribeOutcome::Subscribed { ref created, .. } if created.len() == 2
        ));
        assert_eq!(manager.lookup_by_topic("1/32/1").await, None);

        let same_value = tokio::time::timeout(
            Duration::from_millis(100),
            manager.subscribe("", &basic_key(1)),
        )
        .await;
        assert!(same_value.is_err(), "same topics must wait for the pending call");

        bus.release.notify_one();
        pending.await.unwrap().unwrap();

        assert_eq!(manager.endpoints().await.len(), 4);
        assert_eq!(bus.subscribed.lock().unwrap().len(), 4);
    }
}
