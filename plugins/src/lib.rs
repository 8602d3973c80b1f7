//! # Volley Plugins
//!
//! The plugin registry: a closed set of probe techniques, each with a name,
//! a description and a packet-construction strategy.

pub mod registry;
pub mod technique;

pub use registry::{AddressFamily, PluginDescriptor, PluginRegistry, RegistryError};
pub use technique::Technique;
