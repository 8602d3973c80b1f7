use thiserror::Error;

/// Malformed `--target` input. Fatal before any scanning starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("no targets were given")]
    Empty,

    #[error("invalid network '{input}': {reason}")]
    InvalidNetwork { input: String, reason: String },

    #[error("network {network} holds {hosts} addresses, the limit is {limit}")]
    NetworkTooLarge {
        network: String,
        hosts: u128,
        limit: u128,
    },

    #[error("invalid host name '{0}'")]
    InvalidHost(String),
}

/// Malformed `--ports` input. Fatal before any scanning starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortError {
    #[error("no ports were given")]
    Empty,

    #[error("invalid port '{0}': expected an integer between 0 and 65535")]
    Invalid(String),
}
