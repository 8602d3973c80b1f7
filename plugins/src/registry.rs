use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::technique::Technique;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("IPv4"),
            AddressFamily::V6 => f.write_str("IPv6"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no plugins registered")]
    Empty,
    #[error("plugin #{0} has a blank name")]
    BlankName(usize),
    #[error("plugin '{0}' has a blank description")]
    BlankDescription(String),
    #[error("plugin '{0}' is registered twice")]
    DuplicateName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub name: String,
    pub description: String,
    pub technique: Technique,
}

impl PluginDescriptor {
    pub fn family(&self) -> AddressFamily {
        self.technique.family()
    }
}

impl From<Technique> for PluginDescriptor {
    fn from(technique: Technique) -> Self {
        Self {
            name: technique.name().to_string(),
            description: technique.description().to_string(),
            technique,
        }
    }
}

/// Immutable, validated catalogue of probe plugins.
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    plugins: Vec<PluginDescriptor>,
}

impl PluginRegistry {
    pub fn new(plugins: Vec<PluginDescriptor>) -> Result<Self, RegistryError> {
        if plugins.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for (index, plugin) in plugins.iter().enumerate() {
            if plugin.name.trim().is_empty() {
                return Err(RegistryError::BlankName(index));
            }
            if plugin.description.trim().is_empty() {
                return Err(RegistryError::BlankDescription(plugin.name.clone()));
            }
            if !seen.insert(plugin.name.as_str()) {
                return Err(RegistryError::DuplicateName(plugin.name.clone()));
            }
        }

        Ok(Self { plugins })
    }

    /// Every built-in technique.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::new(Technique::ALL.into_iter().map(PluginDescriptor::from).collect())
    }

    pub fn applicable(&self, family: AddressFamily) -> Vec<&PluginDescriptor> {
        self.plugins.iter().filter(|plugin| plugin.family() == family).collect()
    }

    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.plugins.iter().find(|plugin| plugin.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
