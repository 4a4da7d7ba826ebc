//! Service layer
//!
//! Services wire resolved configuration to the engine and manage its
//! lifecycle.

pub mod monitor;

pub use monitor::{MonitorService, ReloadSummary};
