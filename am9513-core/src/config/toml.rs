//! TOML configuration parsing
//!
//! ```toml
//! version = 1
//!
//! [[chips]]
//! name = "ctc0"
//! base_address = 0x300
//! master_mode = 0x4000
//!
//! [[motors]]
//! name = "theta"
//! counters = [{ chip = "ctc0", counter = 1 }, { chip = "ctc0", counter = 2 }]
//! direction_bit = 0
//! step_frequency = 500.0
//! clock_frequency = 5000000.0
//! busy_retries = 2
//! ```

use super::{ConfigError, SystemConfig};

/// Parse and validate a TOML configuration
pub fn parse_config(input: &str) -> Result<SystemConfig, ConfigError> {
    let config: SystemConfig = ::toml::from_str(input).map_err(|_| ConfigError::TomlParse)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::error::{label, Error};

    const MINIMAL: &str = r#"
version = 1

[[chips]]
name = "ctc0"
base_address = 0x300
master_mode = 0x4000

[[motors]]
name = "theta"
counters = [{ chip = "ctc0", counter = 1 }, { chip = "ctc0", counter = 2 }]
direction_bit = 3
step_frequency = 500
clock_frequency = 5000000
busy_retries = 2

[[scalers]]
name = "i0"
counters = [{ chip = "ctc0", counter = 3 }, { chip = "ctc0", counter = 4 }]
gating_control = 0
count_source = 1

[[timers]]
name = "timer"
counters = [{ chip = "ctc0", counter = 5 }]
clock_frequency = 5e6
"#;

    #[test]
    fn test_parse_minimal_config() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.version, 1);
        assert_eq!(config.chips[0].base_address, 0x300);
        assert!(!config.chips[0].sixteen_bit_bus());

        let m = &config.motors[0];
        assert_eq!(m.name, label("theta"));
        assert_eq!(m.direction_bit, 3);
        assert_eq!(m.step_frequency, 500.0);
        assert_eq!(m.busy_retries, 2);
        assert_eq!(m.initial_position, 0);

        assert_eq!(config.scalers[0].counters.len(), 2);
        assert_eq!(config.timers[0].clock_frequency, 5.0e6);
    }

    #[test]
    fn test_parse_rejects_bad_syntax() {
        assert_eq!(
            parse_config("[[chips]\nname ="),
            Err(ConfigError::TomlParse)
        );
    }

    #[test]
    fn test_parse_runs_validation() {
        let text = MINIMAL.replace("counter = 5", "counter = 1");
        assert_eq!(
            parse_config(&text),
            Err(ConfigError::Invalid(Error::CounterInUse {
                chip: label("ctc0"),
                counter: 1,
                owner: label("theta"),
            }))
        );
    }
}
