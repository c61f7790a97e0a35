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

//! Capability trait consumed from the message-bus client library.

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a [`BusClient`] call.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("{reason}")]
pub struct BusError {
    reason: String,
}

impl BusError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Low-level publish/subscribe operations of the bus client.
///
/// Each call is treated as a single synchronous success/failure; connection
/// management, QoS and retries stay inside the implementation.
#[async_trait]
pub trait BusClient: Send + Sync {
    async fn subscribe(&self, topic: &str) -> Result<(), BusError>;

    async fn unsubscribe(&self, topic: &str) -> Result<(), BusError>;

    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError>;
}
