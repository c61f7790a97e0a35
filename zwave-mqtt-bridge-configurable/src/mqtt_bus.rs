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

//! [`BusClient`] over an MQTT broker connection.

use crate::config::MqttConfig;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};
use zwave_mqtt_bridge::{BusClient, BusError};

const MAX_CONSECUTIVE_ERRORS: usize = 10;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// A message received on one of the subscribed topics.
#[derive(Debug)]
pub(crate) struct InboundMessage {
    pub(crate) topic: String,
    pub(crate) payload: String,
}

pub(crate) struct MqttBusClient {
    client: AsyncClient,
}

impl MqttBusClient {
    /// Builds the client and the event loop that must be polled for it to make progress.
    ///
    /// The session is persistent so the broker keeps our subscriptions across reconnects.
    pub(crate) fn new(config: &MqttConfig) -> (Self, EventLoop) {
        let mut options = MqttOptions::new(&config.client_id, &config.hostname, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        options.set_clean_session(false);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, eventloop) = AsyncClient::new(options, config.channel_capacity);
        (Self { client }, eventloop)
    }

    pub(crate) async fn disconnect(&self) {
        if let Err(err) = self.client.disconnect().await {
            warn!("MqttBusClient: disconnect failed: {err}");
        }
    }
}

#[async_trait]
impl BusClient for MqttBusClient {
    async fn subscribe(&self, topic: &str) -> Result<(), BusError> {
        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .map_err(|err| BusError::new(err.to_string()))
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), BusError> {
        self.client
            .unsubscribe(topic)
            .await
            .map_err(|err| BusError::new(err.to_string()))
    }

    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload.as_bytes().to_vec())
            .await
            .map_err(|err| BusError::new(err.to_string()))
    }
}

#[derive(Debug, Eq, PartialEq)]
pub(crate) enum Forwarded {
    Queued,
    Dropped,
    ReceiverGone,
}

/// Hands a message to the inbound queue without waiting.
///
/// The event loop is the only task draining the client's request queue, so it must
/// never park on a full inbound queue: the consumer publishes through that client.
pub(crate) fn forward_inbound(
    inbound: &mpsc::Sender<InboundMessage>,
    message: InboundMessage,
) -> Forwarded {
    match inbound.try_send(message) {
        Ok(()) => Forwarded::Queued,
        Err(TrySendError::Full(message)) => {
            warn!(
                "MqttBusClient: inbound queue full, dropping message on {}",
                message.topic
            );
            Forwarded::Dropped
        }
        Err(TrySendError::Closed(_)) => Forwarded::ReceiverGone,
    }
}

/// Drives the MQTT connection and forwards incoming publishes to `inbound`.
///
/// Returns once the receiver is gone or the broker keeps failing.
pub(crate) async fn run_event_loop(mut eventloop: EventLoop, inbound: mpsc::Sender<InboundMessage>) {
    let mut error_count = 0;

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                error_count = 0;
                let payload = match String::from_utf8(publish.payload.to_vec()) {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(
                            "MqttBusClient: dropping non UTF-8 payload on {}: {err}",
                            publish.topic
                        );
                        continue;
                    }
                };
                debug!("MqttBusClient: received message on {}", publish.topic);

                let message = InboundMessage {
                    topic: publish.topic,
                    payload,
                };
                if forward_inbound(&inbound, message) == Forwarded::ReceiverGone {
                    debug!("MqttBusClient: inbound receiver dropped, stopping event loop");
                    break;
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                error_count = 0;
                info!(
                    "MqttBusClient: connected, session present: {}",
                    ack.session_present
                );
            }
            Ok(_) => {
                error_count = 0;
            }
            Err(err) => {
                error_count += 1;
                if error_count >= MAX_CONSECUTIVE_ERRORS {
                    error!(
                        "MqttBusClient: {error_count} consecutive connection errors, giving up: {err}"
                    );
                    break;
                }
                warn!(
                    "MqttBusClient: connection error ({error_count}/{MAX_CONSECUTIVE_ERRORS}): {err}"
                );
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{forward_inbound, Forwarded, InboundMessage};
    use tokio::sync::mpsc;

    fn message(topic: &str) -> InboundMessage {
        InboundMessage {
            topic: topic.to_string(),
            payload: "on".to_string(),
        }
    }

    #[test]
    fn full_inbound_queue_drops_instead_of_waiting() {
        let (tx, mut rx) = mpsc::channel(1);

        assert_eq!(forward_inbound(&tx, message("zwave/1/37/1")), Forwarded::Queued);
        assert_eq!(forward_inbound(&tx, message("zwave/1/37/2")), Forwarded::Dropped);

        assert_eq!(rx.try_recv().unwrap().topic, "zwave/1/37/1");
        assert!(rx.try_recv().is_err());
        assert_eq!(forward_inbound(&tx, message("zwave/1/37/3")), Forwarded::Queued);
    }

    #[test]
    fn closed_inbound_queue_stops_forwarding() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);

        assert_eq!(
            forward_inbound(&tx, message("zwave/1/37/1")),
            Forwarded::ReceiverGone
        );
    }
}
