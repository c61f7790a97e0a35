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

//! Endpoint registry: active topic to value bindings.

use crate::value_key::ValueKey;
use std::collections::{BTreeMap, HashMap};

/// Result of [`EndpointRegistry::insert`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InsertOutcome {
    Inserted,
    /// The topic was already bound to the same key; nothing changed.
    AlreadyPresent,
    /// The topic was bound to another key, which has been replaced.
    Replaced(ValueKey),
}

/// Storage owner for topic to [`ValueKey`] bindings.
///
/// Topics are unique; one key owns at most one entry per naming scheme. The registry
/// has no locking of its own, its owner serializes access.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpoints: HashMap<String, ValueKey>,
}

impl EndpointRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `topic` to `key`. Re-binding the same pair is a no-op; binding a topic
    /// to a different key overwrites the previous binding.
    pub fn insert(&mut self, topic: impl Into<String>, key: ValueKey) -> InsertOutcome {
        match self.endpoints.insert(topic.into(), key) {
            None => InsertOutcome::Inserted,
            Some(previous) if previous == key => InsertOutcome::AlreadyPresent,
            Some(previous) => InsertOutcome::Replaced(previous),
        }
    }

    /// Removes the binding for `topic`, returning the key it pointed to.
    pub fn remove(&mut self, topic: &str) -> Option<ValueKey> {
        self.endpoints.remove(topic)
    }

    /// Drops every binding, returning the drained entries.
    pub fn remove_all(&mut self) -> BTreeMap<String, ValueKey> {
        self.endpoints.drain().collect()
    }

    pub fn lookup_by_topic(&self, topic: &str) -> Option<ValueKey> {
        self.endpoints.get(topic).copied()
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.endpoints.contains_key(topic)
    }

    /// Topics currently bound to `key`, in lexical order.
    pub fn topics_for(&self, key: &ValueKey) -> Vec<String> {
        let mut topics: Vec<String> = self
            .endpoints
            .iter()
            .filter(|(_, bound)| *bound == key)
            .map(|(topic, _)| topic.clone())
            .collect();
        topics.sort();
        topics
    }

    /// Snapshot of every binding.
    pub fn all(&self) -> BTreeMap<String, ValueKey> {
        self.endpoints
            .iter()
            .map(|(topic, key)| (topic.clone(), *key))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
