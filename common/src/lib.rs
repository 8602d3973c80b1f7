//! # Volley Common
//!
//! Models shared by every crate of the workspace: scan configuration, parsed
//! targets, hosts, ports and the normalized probe outcome.

pub mod config;
pub mod error;
pub mod logging;
pub mod network;
pub mod probe;

#[doc(hidden)]
pub mod __private {
    pub use tracing;
}
