//! Data-plane layer.
//!
//! Outbound publication of value state and inbound routing of bus messages to device
//! writes. Publication is independent of registry state; inbound routing only
//! resolves topics the control plane registered.

pub(crate) mod inbound_router;
pub(crate) mod publisher;
