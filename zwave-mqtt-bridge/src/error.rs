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

//! Failures surfaced by bridge operations.

use crate::bus::BusError;
use crate::metadata::MetadataError;
use crate::value_key::ValueKey;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Bus call that produced a [`BridgeError::Transport`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BusOperation {
    Subscribe,
    Unsubscribe,
    Publish,
}

impl Display for BusOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BusOperation::Subscribe => f.write_str("subscribe"),
            BusOperation::Unsubscribe => f.write_str("unsubscribe"),
            BusOperation::Publish => f.write_str("publish"),
        }
    }
}

/// Errors returned by the bridge.
///
/// Values that are skipped on purpose (non-user genre, read-only) are not errors; see
/// [`SubscribeOutcome`](crate::SubscribeOutcome).
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("unable to resolve metadata for {key}: {source}")]
    UnknownValue {
        key: ValueKey,
        #[source]
        source: MetadataError,
    },
    #[error("bus {operation} failed for topic '{topic}': {source}")]
    Transport {
        operation: BusOperation,
        topic: String,
        #[source]
        source: BusError,
    },
    #[error("topic '{topic}' is already bound to {existing}, refusing to bind {requested}")]
    TopicCollision {
        topic: String,
        existing: ValueKey,
        requested: ValueKey,
    },
    #[error("no endpoint registered for topic '{0}'")]
    UnroutedTopic(String),
    #[error("unable to write value {key}: {source}")]
    ValueWrite {
        key: ValueKey,
        #[source]
        source: MetadataError,
    },
    #[error("no value writer configured for inbound topic '{0}'")]
    NoValueWriter(String),
    #[error("{failed} of {total} topics failed to unsubscribe during teardown")]
    Teardown { failed: usize, total: usize },
}

impl BridgeError {
    pub(crate) fn unknown_value(key: &ValueKey, source: MetadataError) -> Self {
        BridgeError::UnknownValue { key: *key, source }
    }

    pub(crate) fn transport(operation: BusOperation, topic: &str, source: BusError) -> Self {
        BridgeError::Transport {
            operation,
            topic: topic.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BridgeError, BusOperation};
    use crate::bus::BusError;
    use crate::metadata::MetadataError;
    use crate::value_key::{ValueGenre, ValueKey, ValueType};
    use std::error::Error;

    #[test]
    fn transport_error_exposes_display_and_source() {
        let error = BridgeError::transport(
            BusOperation::Subscribe,
            "1/32/1",
            BusError::new("broker unavailable"),
        );

        assert_eq!(
            error.to_string(),
            "bus subscribe failed for topic '1/32/1': broker unavailable"
        );
        assert!(error.source().is_some());
    }

    #[test]
    fn unknown_value_display_names_the_key() {
        let key = ValueKey::new(1, 9, ValueGenre::User, 0x20, 1, 1, ValueType::Int);
        let error = BridgeError::unknown_value(
            &key,
            MetadataError::UnknownNode {
                home_id: 1,
                node_id: 9,
            },
        );

        assert_eq!(
            error.to_string(),
            "unable to resolve metadata for h1/n9/user/cc32/i1/x1/int: unknown node 9 on home 1"
        );
    }

    #[test]
    fn teardown_error_display_is_stable() {
        let error = BridgeError::Teardown {
            failed: 1,
            total: 4,
        };

        assert_eq!(
            error.to_string(),
            "1 of 4 topics failed to unsubscribe during teardown"
        );
        assert!(error.source().is_none());
    }
}
