//! Binary configuration storage
//!
//! Configurations are stored as postcard bytes. Decoding checks the format
//! version and validates the result.

use super::{ConfigError, SystemConfig, CONFIG_VERSION};

/// Serialized size budget for a full configuration
pub const MAX_CONFIG_SIZE: usize = 2048;

/// Serialize `config` into `buf`, returning the used prefix
pub fn encode<'a>(config: &SystemConfig, buf: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
    postcard::to_slice(config, buf).map_err(|_| ConfigError::Serialize)
}

/// Deserialize and validate a stored configuration
pub fn decode(bytes: &[u8]) -> Result<SystemConfig, ConfigError> {
    let config: SystemConfig = postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;

    if config.version != CONFIG_VERSION {
        return Err(ConfigError::VersionMismatch {
            found: config.version,
        });
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChipConfig, CounterSpec, TimerConfig};
    use crate::error::label;

    fn sample() -> SystemConfig {
        let mut config = SystemConfig::new();
        config
            .chips
            .push(ChipConfig::new("ctc0", 0x300, 0x4000))
            .unwrap();
        let mut t = TimerConfig {
            name: label("timer"),
            ..TimerConfig::default()
        };
        t.counters.push(CounterSpec::new("ctc0", 5)).unwrap();
        config.timers.push(t).unwrap();
        config
    }

    #[test]
    fn test_stored_config_reloads() {
        let config = sample();
        let mut buf = [0u8; MAX_CONFIG_SIZE];
        let used = encode(&config, &mut buf).unwrap();
        assert_eq!(decode(used).unwrap(), config);
    }

    #[test]
    fn test_version_mismatch() {
        let mut config = sample();
        config.version = 7;
        let mut buf = [0u8; MAX_CONFIG_SIZE];
        let used = encode(&config, &mut buf).unwrap();
        assert_eq!(
            decode(used),
            Err(ConfigError::VersionMismatch { found: 7 })
        );
    }

    #[test]
    fn test_truncated_data() {
        let mut buf = [0u8; MAX_CONFIG_SIZE];
        let len = encode(&sample(), &mut buf).unwrap().len();
        assert_eq!(decode(&buf[..len / 2]), Err(ConfigError::Deserialize));
    }

    #[test]
    fn test_buffer_too_small() {
        let mut buf = [0u8; 4];
        assert_eq!(encode(&sample(), &mut buf), Err(ConfigError::Serialize));
    }
}
