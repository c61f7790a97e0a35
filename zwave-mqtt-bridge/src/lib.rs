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

//! # zwave-mqtt-bridge
//!
//! `zwave-mqtt-bridge` keeps the values of a Z-Wave device network and an MQTT-style
//! publish/subscribe bus consistent.
//!
//! Each device value, identified by a [`ValueKey`], is reachable under two topics:
//!
//! - name-based: `[prefix/]location/name/command_class[/instance]/label`
//! - id-based: `[prefix/]node_id/command_class_id[/instance]/index`
//!
//! The instance segment is present only when the node carries more than one instance
//! of the command class. Writable user values are subscribed so inbound messages can
//! drive the device; any value can be published.
//!
//! ## Collaborators
//!
//! The bridge does not talk to a device network or a broker itself. It consumes two
//! narrow capabilities:
//!
//! - [`MetadataProvider`] (and optionally [`ValueWriter`]) for the device model
//! - [`BusClient`] for subscribe/unsubscribe/publish
//!
//! ## Subscription contract
//!
//! ```
//! use std::sync::Arc;
//! use zwave_mqtt_bridge::{SkipReason, SubscribeOutcome, ValueBridge, ValueGenre, ValueKey, ValueType};
//!
//! # pub mod fakes {
//! #     use async_trait::async_trait;
//! #     use std::sync::atomic::{AtomicUsize, Ordering};
//! #     use zwave_mqtt_bridge::{BusClient, BusError, MetadataError, MetadataProvider, ValueKey};
//! #
//! #     pub struct Fixture;
//! #
//! #     impl MetadataProvider for Fixture {
//! #         fn is_read_only(&self, key: &ValueKey) -> Result<bool, MetadataError> {
//! #             Ok(key.command_class_id() == 0x32)
//! #         }
//! #         fn instance_count(&self, _: u32, _: u8, _: u8) -> Result<usize, MetadataError> { Ok(1) }
//! #         fn node_location(&self, h: u32, n: u8) -> Result<String, MetadataError> { Ok(format!("location_h{h}_n{n}")) }
//! #         fn node_name(&self, h: u32, n: u8) -> Result<String, MetadataError> { Ok(format!("name_h{h}_n{n}")) }
//! #         fn command_class_name(&self, cc: u8) -> Result<String, MetadataError> {
//! #             Ok(if cc == 0x32 { "meter" } else { "basic" }.to_string())
//! #         }
//! #         fn value_label(&self, key: &ValueKey) -> Result<String, MetadataError> { Ok(format!("label{}", key.index())) }
//! #         fn value_as_text(&self, _: &ValueKey) -> Result<String, MetadataError> { Ok("0".into()) }
//! #     }
//! #
//! #     #[derive(Default)]
//! #     pub struct CountingBus(pub AtomicUsize);
//! #
//! #     #[async_trait]
//! #     impl BusClient for CountingBus {
//! #         async fn subscribe(&self, _: &str) -> Result<(), BusError> {
//! #             self.0.fetch_add(1, Ordering::SeqCst);
//! #             Ok(())
//! #         }
//! #         async fn unsubscribe(&self, _: &str) -> Result<(), BusError> { Ok(()) }
//! #         async fn publish(&self, _: &str, _: &str) -> Result<(), BusError> { Ok(()) }
//! #     }
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let bus = Arc::new(fakes::CountingBus::default());
//! let bridge = ValueBridge::new("contract", Arc::new(fakes::Fixture), bus.clone());
//!
//! let basic = ValueKey::new(1, 1, ValueGenre::User, 0x20, 1, 1, ValueType::Int);
//! let meter = ValueKey::new(1, 2, ValueGenre::User, 0x32, 1, 1, ValueType::Int);
//!
//! // Re-subscribing the same value issues no duplicate bus subscriptions.
//! bridge.subscribe("", &basic).await.unwrap();
//! bridge.subscribe("", &basic).await.unwrap();
//! assert_eq!(bus.0.load(std::sync::atomic::Ordering::SeqCst), 2);
//!
//! // Read-only values are never subscribed.
//! assert_eq!(
//!     bridge.subscribe("", &meter).await.unwrap(),
//!     SubscribeOutcome::Skipped(SkipReason::ReadOnly)
//! );
//!
//! let endpoints = bridge.list_endpoints().await;
//! assert_eq!(endpoints.len(), 2);
//! assert_eq!(endpoints.get("1/32/1"), Some(&basic));
//! assert_eq!(endpoints.get("location_h1_n1/name_h1_n1/basic/label1"), Some(&basic));
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - API facade: [`ValueBridge`]
//! - Topics: name-based and id-based topic derivation
//! - Control plane: endpoint registry and subscribe/unsubscribe lifecycle
//! - Data plane: outbound publication and inbound routing
//!
//! ## Observability model
//!
//! Library code emits `tracing` events with the canonical names in
//! [`observability::events`] and never installs a global subscriber. Binaries and
//! tests initialize `tracing_subscriber` once at process boundaries.

mod bus;
pub use bus::{BusClient, BusError};

mod control_plane;
pub use control_plane::endpoint_registry::{EndpointRegistry, InsertOutcome};
pub use control_plane::subscription_manager::{SkipReason, SubscribeOutcome};

mod data_plane;
pub use data_plane::publisher::{PublishOutcome, PublishReport};

mod error;
pub use error::{BridgeError, BusOperation};

mod metadata;
pub use metadata::{MetadataError, MetadataProvider, ValueWriter};

#[doc(hidden)]
pub mod observability;
pub mod topics;

mod value_bridge;
pub use value_bridge::{SyncReport, ValueBridge};

mod value_key;
pub use value_key::{ValueGenre, ValueKey, ValueType};
