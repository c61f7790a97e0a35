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

//! Outbound publication of current value state.

use crate::bus::{BusClient, BusError};
use crate::error::{BridgeError, BusOperation};
use crate::metadata::MetadataProvider;
use crate::observability::{events, fields};
use crate::topics::{build_topics, ValueMetadata};
use crate::value_key::ValueKey;
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "publisher";

/// Outcome of the publish call for one topic.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublishOutcome {
    pub topic: String,
    pub result: Result<(), BusError>,
}

/// Per-topic outcomes of a [`ValueBridge::publish`](crate::ValueBridge::publish) call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublishReport {
    pub payload: String,
    pub name: PublishOutcome,
    pub id: PublishOutcome,
}

impl PublishReport {
    pub fn is_ok(&self) -> bool {
        self.name.result.is_ok() && self.id.result.is_ok()
    }

    /// Collapses the report into the first failure, name topic first.
    pub fn into_result(self) -> Result<(), BridgeError> {
        for outcome in [self.name, self.id] {
            if let Err(err) = outcome.result {
                return Err(BridgeError::transport(
                    BusOperation::Publish,
                    &outcome.topic,
                    err,
                ));
            }
        }
        Ok(())
    }
}

pub(crate) struct Publisher {
    metadata: Arc<dyn MetadataProvider>,
    bus: Arc<dyn BusClient>,
}

impl Publisher {
    pub(crate) fn new(metadata: Arc<dyn MetadataProvider>, bus: Arc<dyn BusClient>) -> Self {
        Self { metadata, bus }
    }

    /// Publishes the value text of `key` to both of its topics.
    ///
    /// Genre and read-only status are not checked. A failure on one topic does not
    /// prevent the attempt on the other.
    pub(crate) async fn publish(
        &self,
        prefix: &str,
        key: &ValueKey,
    ) -> Result<PublishReport, BridgeError> {
        let value_metadata = ValueMetadata::resolve(self.metadata.as_ref(), key)
            .map_err(|err| BridgeError::unknown_value(key, err))?;
        let topics = build_topics(prefix, key, &value_metadata);
        let payload = self
            .metadata
            .value_as_text(key)
            .map_err(|err| BridgeError::unknown_value(key, err))?;

        let name = self.publish_topic(topics.name, &payload, key).await;
        let id = self.publish_topic(topics.id, &payload, key).await;

        Ok(PublishReport { payload, name, id })
    }

    async fn publish_topic(&self, topic: String, payload: &str, key: &ValueKey) -> PublishOutcome {
        let result = self.bus.publish(&topic, payload).await;

        match &result {
            Ok(()) => debug!(
                event = events::PUBLISH_OK,
                component = COMPONENT,
                topic = %topic,
                value_key = %key,
                payload = %fields::format_payload(payload),
                "published value"
            ),
            Err(err) => warn!(
                event = events::PUBLISH_FAILED,
                component = COMPONENT,
                topic = %topic,
                value_key = %key,
                err = %err,
                "unable to publish value"
            ),
        }

        PublishOutcome { topic, result }
    }
}
