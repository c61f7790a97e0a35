//! Topic derivation layer.
//!
//! Every bridged value is reachable under two topics: a name-based path built from
//! the node's location and name, the command-class name and the value label, and an
//! id-based path built from numeric identifiers. The `/{instance}` segment appears in
//! both only when the node carries more than one instance of the command class.
//!
//! ```
//! use zwave_mqtt_bridge::topics::{build_topics, ValueMetadata};
//! use zwave_mqtt_bridge::{ValueGenre, ValueKey, ValueType};
//!
//! let key = ValueKey::new(1, 1, ValueGenre::User, 0x25, 2, 1, ValueType::Bool);
//! let metadata = ValueMetadata {
//!     location: "location_h1_n1".to_string(),
//!     name: "name_h1_n1".to_string(),
//!     command_class_name: "switch_binary".to_string(),
//!     label: "label1".to_string(),
//!     instance_count: 2,
//! };
//!
//! let topics = build_topics("", &key, &metadata);
//! assert_eq!(topics.name, "location_h1_n1/name_h1_n1/switch_binary/2/label1");
//! assert_eq!(topics.id, "1/37/2/1");
//! ```

mod topic_builder;
pub use topic_builder::{build_topics, TopicPair, ValueMetadata};
