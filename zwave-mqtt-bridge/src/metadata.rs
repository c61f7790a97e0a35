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

//! Capability traits consumed from the device-network library.

use crate::value_key::{ValueGenre, ValueKey};
use thiserror::Error;

/// Lookup failures reported by a [`MetadataProvider`] or [`ValueWriter`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum MetadataError {
    #[error("unknown node {node_id} on home {home_id}")]
    UnknownNode { home_id: u32, node_id: u8 },
    #[error("unknown command class {0}")]
    UnknownCommandClass(u8),
    #[error("unknown value {0}")]
    UnknownValue(ValueKey),
    #[error("value {key} rejected '{text}': {reason}")]
    Rejected {
        key: ValueKey,
        text: String,
        reason: String,
    },
}

/// Read side of the device model.
///
/// Every query is answered from the live model. Implementations report
/// [`MetadataError`] when a node, command class or value cannot be resolved.
pub trait MetadataProvider: Send + Sync {
    /// Genre of the value. Defaults to the genre carried by the key itself.
    fn genre(&self, key: &ValueKey) -> Result<ValueGenre, MetadataError> {
        Ok(key.genre())
    }

    fn is_read_only(&self, key: &ValueKey) -> Result<bool, MetadataError>;

    /// Number of instances of `command_class_id` present on the node.
    fn instance_count(
        &self,
        home_id: u32,
        node_id: u8,
        command_class_id: u8,
    ) -> Result<usize, MetadataError>;

    fn node_location(&self, home_id: u32, node_id: u8) -> Result<String, MetadataError>;

    fn node_name(&self, home_id: u32, node_id: u8) -> Result<String, MetadataError>;

    fn command_class_name(&self, command_class_id: u8) -> Result<String, MetadataError>;

    fn value_label(&self, key: &ValueKey) -> Result<String, MetadataError>;

    fn value_as_text(&self, key: &ValueKey) -> Result<String, MetadataError>;
}

/// Write side of the device model, used to apply inbound bus commands.
pub trait ValueWriter: Send + Sync {
    fn set_value_from_text(&self, key: &ValueKey, text: &str) -> Result<(), MetadataError>;
}
