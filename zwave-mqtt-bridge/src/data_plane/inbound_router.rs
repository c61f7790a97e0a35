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

//! Inbound routing of bus messages to device-model writes.

use crate::error::BridgeError;
use crate::metadata::ValueWriter;
use crate::observability::{events, fields};
use crate::value_key::ValueKey;
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "inbound_router";

pub(crate) struct InboundRouter {
    writer: Option<Arc<dyn ValueWriter>>,
}

impl InboundRouter {
    pub(crate) fn new(writer: Option<Arc<dyn ValueWriter>>) -> Self {
        Self { writer }
    }

    /// Applies `payload` to the value registered under `topic`.
    ///
    /// `registered` is the registry lookup result for `topic`.
    pub(crate) fn route(
        &self,
        topic: &str,
        registered: Option<ValueKey>,
        payload: &str,
    ) -> Result<ValueKey, BridgeError> {
        let Some(key) = registered else {
            debug!(
                event = events::INBOUND_UNROUTED,
                component = COMPONENT,
                topic,
                "no endpoint for inbound topic"
            );
            return Err(BridgeError::UnroutedTopic(topic.to_string()));
        };

        let Some(writer) = self.writer.as_ref() else {
            warn!(
                event = events::INBOUND_WRITE_FAILED,
                component = COMPONENT,
                topic,
                value_key = %key,
                reason = "no_value_writer",
                "dropping inbound message"
            );
            return Err(BridgeError::NoValueWriter(topic.to_string()));
        };

        writer.set_value_from_text(&key, payload).map_err(|err| {
            warn!(
                event = events::INBOUND_WRITE_FAILED,
                component = COMPONENT,
                topic,
                value_key = %key,
                payload = %fields::format_payload(payload),
                err = %err,
                "device rejected inbound value"
            );
            BridgeError::ValueWrite { key, source: err }
        })?;

        debug!(
            event = events::INBOUND_ROUTED,
            component = COMPONENT,
            topic,
            value_key = %key,
            payload = %fields::format_payload(payload),
            "applied inbound value"
        );
        Ok(key)
    }
}
