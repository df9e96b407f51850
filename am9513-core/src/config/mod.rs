//! Configuration types and loaders
//!
//! Board-agnostic configuration structures. Systems are described in TOML
//! (`toml` feature) and may be stored as postcard binary data (`serde`
//! feature).

pub mod system;
pub mod types;

#[cfg(feature = "serde")]
pub mod persist;
#[cfg(feature = "toml")]
pub mod toml;

pub use system::*;
pub use types::*;

use core::fmt;

use crate::error::Error;

/// Errors raised while loading a configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// No configuration source was supplied
    NotFound,
    /// TOML text could not be parsed
    TomlParse,
    /// The configuration does not fit the output buffer
    Serialize,
    /// Binary data could not be decoded
    Deserialize,
    /// Stored data has an unexpected format version
    VersionMismatch { found: u8 },
    /// The configuration parsed but is not usable
    Invalid(Error),
}

impl From<Error> for ConfigError {
    fn from(e: Error) -> Self {
        ConfigError::Invalid(e)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotFound => f.write_str("no configuration found"),
            ConfigError::TomlParse => f.write_str("invalid TOML configuration"),
            ConfigError::Serialize => f.write_str("configuration too large to store"),
            ConfigError::Deserialize => f.write_str("stored configuration is corrupt"),
            ConfigError::VersionMismatch { found } => write!(
                f,
                "configuration version {} found, expected {}",
                found, CONFIG_VERSION
            ),
            ConfigError::Invalid(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

/// Load a configuration, trying TOML text first and falling back to binary
#[cfg(feature = "toml")]
pub fn load(toml_text: Option<&str>, binary: Option<&[u8]>) -> Result<SystemConfig, ConfigError> {
    if let Some(text) = toml_text {
        match toml::parse_config(text) {
            Ok(config) => {
                #[cfg(feature = "defmt")]
                defmt::info!("Loaded configuration from TOML");
                return Ok(config);
            }
            Err(e) => {
                if binary.is_none() {
                    return Err(e);
                }
                #[cfg(feature = "defmt")]
                defmt::warn!("Failed to load TOML config: {:?}, trying binary", e);
            }
        }
    }

    match binary {
        Some(bytes) => {
            let config = persist::decode(bytes)?;
            #[cfg(feature = "defmt")]
            defmt::info!("Loaded configuration from binary");
            Ok(config)
        }
        None => Err(ConfigError::NotFound),
    }
}
