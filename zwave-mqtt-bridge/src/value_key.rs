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

//! Composite identifier for a single device value.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Classification of a device value.
///
/// Only [`ValueGenre::User`] values are bridged for inbound commands; the other
/// genres describe controller-internal state.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueGenre {
    Basic,
    User,
    Config,
    System,
}

/// Payload type of a device value. Carried through, never interpreted.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Byte,
    Decimal,
    Int,
    List,
    Schedule,
    Short,
    String,
    Button,
    Raw,
}

///
/// [`ValueKey`] identifies exactly one value exposed by the device network.
///
/// Keys are plain `Copy` descriptors built by callers for each operation; two keys are
/// equal only when every field matches.
///
/// # Examples
///
/// ```
/// use zwave_mqtt_bridge::{ValueGenre, ValueKey, ValueType};
///
/// let key = ValueKey::new(1, 1, ValueGenre::User, 0x20, 1, 1, ValueType::Int);
/// assert_eq!(key.command_class_id(), 32);
/// assert_eq!(key.to_string(), "h1/n1/user/cc32/i1/x1/int");
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ValueKey {
    home_id: u32,
    node_id: u8,
    genre: ValueGenre,
    command_class_id: u8,
    instance: u8,
    index: u16,
    value_type: ValueType,
}

impl ValueKey {
    pub fn new(
        home_id: u32,
        node_id: u8,
        genre: ValueGenre,
        command_class_id: u8,
        instance: u8,
        index: u16,
        value_type: ValueType,
    ) -> Self {
        Self {
            home_id,
            node_id,
            genre,
            command_class_id,
            instance,
            index,
            value_type,
        }
    }

    pub fn home_id(&self) -> u32 {
        self.home_id
    }

    pub fn node_id(&self) -> u8 {
        self.node_id
    }

    pub fn genre(&self) -> ValueGenre {
        self.genre
    }

    pub fn command_class_id(&self) -> u8 {
        self.command_class_id
    }

    pub fn instance(&self) -> u8 {
        self.instance
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }
}

impl Display for ValueGenre {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let genre = match self {
            ValueGenre::Basic => "basic",
            ValueGenre::User => "user",
            ValueGenre::Config => "config",
            ValueGenre::System => "system",
        };
        f.write_str(genre)
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let value_type = match self {
            ValueType::Bool => "bool",
            ValueType::Byte => "byte",
            ValueType::Decimal => "decimal",
            ValueType::Int => "int",
            ValueType::List => "list",
            ValueType::Schedule => "schedule",
            ValueType::Short => "short",
            ValueType::String => "string",
            ValueType::Button => "button",
            ValueType::Raw => "raw",
        };
        f.write_str(value_type)
    }
}

impl Display for ValueKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "h{}/n{}/{}/cc{}/i{}/x{}/{}",
            self.home_id,
            self.node_id,
            self.genre,
            self.command_class_id,
            self.instance,
            self.index,
            self.value_type
        )
    }
}
