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

//! Canonical structured field keys and value-format helpers.

use crate::value_key::ValueKey;

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const TOPIC: &str = "topic";
pub const VALUE_KEY: &str = "value_key";
pub const PREFIX: &str = "prefix";
pub const ERR: &str = "err";
pub const REASON: &str = "reason";

pub const NONE: &str = "none";
pub const REASON_ROLLBACK_AFTER_SUBSCRIBE_FAILURE: &str = "rollback_after_subscribe_failure";
pub const REASON_TEARDOWN: &str = "teardown";

/// Renders a prefix for log fields, using [`NONE`] for the empty prefix.
pub fn format_prefix(prefix: &str) -> &str {
    if prefix.is_empty() {
        NONE
    } else {
        prefix
    }
}

pub fn format_value_key(key: &ValueKey) -> String {
    key.to_string()
}

/// Truncated payload rendering so large values do not flood log lines.
pub fn format_payload(payload: &str) -> String {
    const MAX_PAYLOAD_CHARS: usize = 64;

    if payload.chars().count() <= MAX_PAYLOAD_CHARS {
        payload.to_string()
    } else {
        let truncated: String = payload.chars().take(MAX_PAYLOAD_CHARS).collect();
        format!("{truncated}...")
    }
}
