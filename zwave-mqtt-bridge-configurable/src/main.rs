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

mod config;
mod mqtt_bus;

use crate::config::Config;
use crate::mqtt_bus::{InboundMessage, MqttBusClient};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use value_model_static_file::StaticValueModel;
use zwave_mqtt_bridge::{MetadataProvider, PublishReport, ValueBridge};

#[derive(Parser)]
#[command()]
struct BridgeArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
    /// Overrides the topic prefix from the config file.
    #[arg(short, long)]
    prefix: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    info!("Started zwave-mqtt-bridge-configurable");

    let args = BridgeArgs::parse();
    let mut config = Config::from_file(&args.config)?;
    if let Some(prefix) = args.prefix {
        config.bridge.prefix = prefix.trim_end_matches('/').to_string();
    }
    let prefix = config.bridge.prefix.clone();

    let model = Arc::new(StaticValueModel::from_file(&config.value_model.file_path)?);

    let (bus, eventloop) = MqttBusClient::new(&config.mqtt);
    let bus = Arc::new(bus);
    let (inbound_tx, mut inbound_rx) = mpsc::channel(config.mqtt.channel_capacity);
    tokio::spawn(mqtt_bus::run_event_loop(eventloop, inbound_tx));

    let bridge = ValueBridge::with_value_writer(
        "zwave-mqtt-bridge",
        model.clone(),
        bus.clone(),
        model.clone(),
    );

    if config.bridge.publish_on_start {
        let report = bridge.sync_values(&prefix, model.value_keys()).await;
        for (key, err) in &report.failures {
            warn!("{}: startup sync failed for {key}: {err}", bridge.name());
        }
    } else {
        for key in model.value_keys() {
            if let Err(err) = bridge.subscribe(&prefix, &key).await {
                warn!("{}: unable to subscribe {key}: {err}", bridge.name());
            }
        }
    }

    loop {
        tokio::select! {
            message = inbound_rx.recv() => {
                let Some(message) = message else {
                    warn!("{}: MQTT event loop stopped", bridge.name());
                    break;
                };
                handle_inbound(&bridge, model.as_ref(), &prefix, message).await;
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    error!("{}: unable to listen for shutdown signal: {err}", bridge.name());
                }
                info!("{}: shutting down", bridge.name());
                break;
            }
        }
    }

    let teardown = bridge.unsubscribe_all().await;
    bus.disconnect().await;

    let released = teardown?;
    info!("{}: released {released} topics", bridge.name());
    Ok(())
}

/// Applies one inbound message and republishes the value it changed.
async fn handle_inbound(
    bridge: &ValueBridge,
    model: &StaticValueModel,
    prefix: &str,
    message: InboundMessage,
) {
    if let Some(key) = bridge.lookup_by_topic(&message.topic).await {
        // Our own publishes come back on the topics we subscribe to.
        if model.value_as_text(&key).ok().as_deref() == Some(message.payload.as_str()) {
            debug!(
                "{}: ignoring unchanged value on {}",
                bridge.name(),
                message.topic
            );
            return;
        }
    }

    let key = match bridge.route_inbound(&message.topic, &message.payload).await {
        Ok(key) => key,
        Err(err) => {
            warn!("{}: {err}", bridge.name());
            return;
        }
    };

    let published = bridge
        .publish(prefix, &key)
        .await
        .and_then(PublishReport::into_result);
    if let Err(err) = published {
        warn!("{}: unable to publish {key} after write: {err}", bridge.name());
    }
}
