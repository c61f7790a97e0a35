//! Canonical structured event names used across `zwave-mqtt-bridge`.

// Subscription lifecycle events.
pub const SUBSCRIBE_SKIPPED_GENRE: &str = "subscribe_skipped_genre";
pub const SUBSCRIBE_SKIPPED_READ_ONLY: &str = "subscribe_skipped_read_only";
pub const SUBSCRIBE_TOPIC_OK: &str = "subscribe_topic_ok";
pub const SUBSCRIBE_TOPIC_EXISTS: &str = "subscribe_topic_exists";
pub const SUBSCRIBE_TOPIC_FAILED: &str = "subscribe_topic_failed";
pub const SUBSCRIBE_TOPIC_COLLISION: &str = "subscribe_topic_collision";
pub const SUBSCRIBE_ROLLBACK: &str = "subscribe_rollback";
pub const UNSUBSCRIBE_TOPIC_OK: &str = "unsubscribe_topic_ok";
pub const UNSUBSCRIBE_TOPIC_FAILED: &str = "unsubscribe_topic_failed";
pub const UNSUBSCRIBE_TOPIC_MISSING: &str = "unsubscribe_topic_missing";
pub const UNSUBSCRIBE_ALL_DONE: &str = "unsubscribe_all_done";

// Publication events.
pub const PUBLISH_OK: &str = "publish_ok";
pub const PUBLISH_FAILED: &str = "publish_failed";

// Inbound routing events.
pub const INBOUND_ROUTED: &str = "inbound_routed";
pub const INBOUND_UNROUTED: &str = "inbound_unrouted";
pub const INBOUND_WRITE_FAILED: &str = "inbound_write_failed";

// Metadata resolution and resync events.
pub const METADATA_RESOLVE_FAILED: &str = "metadata_resolve_failed";
pub const SYNC_START: &str = "sync_start";
pub const SYNC_DONE: &str = "sync_done";
