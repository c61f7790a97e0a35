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

use crate::metadata::{MetadataError, MetadataProvider};
use crate::value_key::ValueKey;

const TOPIC_SEPARATOR: &str = "/";

/// Snapshot of the metadata that feeds topic construction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValueMetadata {
    pub location: String,
    pub name: String,
    pub command_class_name: String,
    pub label: String,
    pub instance_count: usize,
}

impl ValueMetadata {
    /// Queries `provider` for everything [`build_topics`] needs about `key`.
    pub fn resolve(
        provider: &dyn MetadataProvider,
        key: &ValueKey,
    ) -> Result<Self, MetadataError> {
        Ok(Self {
            location: provider.node_location(key.home_id(), key.node_id())?,
            name: provider.node_name(key.home_id(), key.node_id())?,
            command_class_name: provider.command_class_name(key.command_class_id())?,
            label: provider.value_label(key)?,
            instance_count: provider.instance_count(
                key.home_id(),
                key.node_id(),
                key.command_class_id(),
            )?,
        })
    }

    fn is_multi_instance(&self) -> bool {
        self.instance_count > 1
    }
}

/// The two topics a value is exposed under.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TopicPair {
    /// `[prefix/]location/name/command_class[/instance]/label`
    pub name: String,
    /// `[prefix/]node_id/command_class_id[/instance]/index`
    pub id: String,
}

impl TopicPair {
    /// Name-based topic first, id-based topic second.
    pub fn as_array(&self) -> [&str; 2] {
        [self.name.as_str(), self.id.as_str()]
    }
}

fn join_topic(prefix: &str, segments: Vec<String>) -> String {
    let mut topic = String::new();
    if !prefix.is_empty() {
        topic.push_str(prefix);
        topic.push_str(TOPIC_SEPARATOR);
    }
    topic.push_str(&segments.join(TOPIC_SEPARATOR));
    topic
}

/// Builds the name-based and id-based topics for `key`.
///
/// Names and labels are used verbatim; callers keep them topic-safe.
pub fn build_topics(prefix: &str, key: &ValueKey, metadata: &ValueMetadata) -> TopicPair {
    let instance = metadata
        .is_multi_instance()
        .then(|| key.instance().to_string());

    let mut name_segments = vec![
        metadata.location.clone(),
        metadata.name.clone(),
        metadata.command_class_name.clone(),
    ];
    name_segments.extend(instance.clone());
    name_segments.push(metadata.label.clone());

    let mut id_segments = vec![
        key.node_id().to_string(),
        key.command_class_id().to_string(),
    ];
    id_segments.extend(instance);
    id_segments.push(key.index().to_string());

    TopicPair {
        name: join_topic(prefix, name_segments),
        id: join_topic(prefix, id_segments),
    }
}
