//! Structured logging vocabulary shared by bridge components.

pub mod events;
pub mod fields;
