//! Infrastructure adapters for external systems.

pub mod memory;
pub mod sqlite;
pub mod trigger;
