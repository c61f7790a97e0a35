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

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use zwave_mqtt_bridge::{BusClient, BusError};

#[derive(Default)]
struct BusState {
    subscribed: Vec<String>,
    unsubscribed: Vec<String>,
    published: Vec<(String, String)>,
    failing_subscribe: HashSet<String>,
    failing_unsubscribe: HashSet<String>,
    failing_publish: HashSet<String>,
}

/// Bus client that records every successful call and fails on request.
///
/// Failed calls are not recorded in the histories.
#[derive(Default)]
pub struct RecordingBusClient {
    state: Mutex<BusState>,
}

impl RecordingBusClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().expect("recording bus client lock poisoned")
    }

    pub fn fail_subscribe(&self, topic: &str) {
        self.state().failing_subscribe.insert(topic.to_string());
    }

    pub fn fail_unsubscribe(&self, topic: &str) {
        self.state().failing_unsubscribe.insert(topic.to_string());
    }

    pub fn fail_publish(&self, topic: &str) {
        self.state().failing_publish.insert(topic.to_string());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.failing_subscribe.clear();
        state.failing_unsubscribe.clear();
        state.failing_publish.clear();
    }

    pub fn subscribe_history(&self) -> Vec<String> {
        self.state().subscribed.clone()
    }

    pub fn unsubscribe_history(&self) -> Vec<String> {
        self.state().unsubscribed.clone()
    }

    pub fn publish_history(&self) -> Vec<(String, String)> {
        self.state().published.clone()
    }
}

#[async_trait]
impl BusClient for RecordingBusClient {
    async fn subscribe(&self, topic: &str) -> Result<(), BusError> {
        let mut state = self.state();
        if state.failing_subscribe.contains(topic) {
            debug!("RecordingBusClient: failing subscribe for {topic}");
            return Err(BusError::new(format!("subscribe refused for {topic}")));
        }
        state.subscribed.push(topic.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), BusError> {
        let mut state = self.state();
        if state.failing_unsubscribe.contains(topic) {
            debug!("RecordingBusClient: failing unsubscribe for {topic}");
            return Err(BusError::new(format!("unsubscribe refused for {topic}")));
        }
        state.unsubscribed.push(topic.to_string());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        let mut state = self.state();
        if state.failing_publish.contains(topic) {
            debug!("RecordingBusClient: failing publish for {topic}");
            return Err(BusError::new(format!("publish refused for {topic}")));
        }
        state.published.push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}
