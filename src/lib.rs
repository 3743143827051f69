//! Berth
//!
//! Multi-tenant plugin lifecycle orchestration. This package re-exports
//! [`berth_core`] and hosts the workspace integration tests.

pub use berth_core::*;
