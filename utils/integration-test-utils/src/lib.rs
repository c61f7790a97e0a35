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

mod mock_device_network;
pub use mock_device_network::{
    MockDeviceNetwork, COMMAND_CLASS_BASIC, COMMAND_CLASS_CONFIGURATION, COMMAND_CLASS_METER,
    COMMAND_CLASS_SENSOR_MULTILEVEL, COMMAND_CLASS_SWITCH_BINARY, COMMAND_CLASS_SWITCH_MULTILEVEL,
};
mod recording_bus_client;
pub use recording_bus_client::RecordingBusClient;

use tracing_subscriber::EnvFilter;

/// Installs a test-friendly `tracing` subscriber once per process.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
