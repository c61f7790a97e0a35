//! Control-plane layer.
//!
//! Owns the endpoint registry and the subscribe/unsubscribe lifecycle that keeps it in
//! step with the bus. Registration is idempotent: re-subscribing a value issues no
//! duplicate bus calls, and a failed bus subscribe leaves no partial entries.

pub mod endpoint_registry;
pub(crate) mod subscription_manager;
