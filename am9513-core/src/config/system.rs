//! Whole-system configuration

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::types::{ChipConfig, MotorConfig, ScalerConfig, TimerConfig, MAX_CHIPS, MAX_DEVICES};
use crate::error::Error;

/// Current configuration format version
pub const CONFIG_VERSION: u8 = 1;

/// Every chip and device in one instrument
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SystemConfig {
    /// Config version for compatibility
    pub version: u8,
    #[cfg_attr(feature = "serde", serde(default))]
    pub chips: Vec<ChipConfig, MAX_CHIPS>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub motors: Vec<MotorConfig, MAX_DEVICES>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub scalers: Vec<ScalerConfig, MAX_DEVICES>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub timers: Vec<TimerConfig, MAX_DEVICES>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemConfig {
    pub const fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            chips: Vec::new(),
            motors: Vec::new(),
            scalers: Vec::new(),
            timers: Vec::new(),
        }
    }

    /// Look up a chip by name
    pub fn chip(&self, name: &str) -> Option<&ChipConfig> {
        self.chips.iter().find(|c| c.name.as_str() == name)
    }

    /// Check the configuration as a whole
    ///
    /// Runs each device's own checks, then verifies that every counter names
    /// an existing chip, that names are unique, and that no counter is
    /// claimed by two devices.
    pub fn validate(&self) -> Result<(), Error> {
        for (i, chip) in self.chips.iter().enumerate() {
            if self.chips[..i].iter().any(|c| c.name == chip.name) {
                return Err(Error::DuplicateName {
                    name: chip.name.clone(),
                });
            }
        }

        for m in &self.motors {
            m.validate()?;
        }
        for s in &self.scalers {
            s.validate()?;
        }
        for t in &self.timers {
            t.validate()?;
        }

        let devices = || {
            let motors = self.motors.iter().map(|m| (&m.name, &m.counters[..]));
            let scalers = self.scalers.iter().map(|s| (&s.name, &s.counters[..]));
            let timers = self.timers.iter().map(|t| (&t.name, &t.counters[..]));
            motors.chain(scalers).chain(timers)
        };

        for (i, (name, _)) in devices().enumerate() {
            if devices().take(i).any(|(other, _)| other == name) {
                return Err(Error::DuplicateName { name: name.clone() });
            }
        }

        let claims = || {
            devices().flat_map(|(name, counters)| counters.iter().map(move |c| (name, c)))
        };

        for (i, (_, spec)) in claims().enumerate() {
            if self.chip(&spec.chip).is_none() {
                return Err(Error::UnknownChip {
                    name: spec.chip.clone(),
                });
            }
            if let Some((owner, _)) = claims().take(i).find(|(_, c)| *c == spec) {
                return Err(Error::CounterInUse {
                    chip: spec.chip.clone(),
                    counter: spec.counter,
                    owner: owner.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::CounterSpec;
    use crate::error::label;

    fn system() -> SystemConfig {
        let mut config = SystemConfig::new();
        config
            .chips
            .push(ChipConfig::new("ctc0", 0x300, 0x4000))
            .unwrap();

        let mut m = MotorConfig {
            name: label("theta"),
            ..MotorConfig::default()
        };
        m.counters.push(CounterSpec::new("ctc0", 1)).unwrap();
        m.counters.push(CounterSpec::new("ctc0", 2)).unwrap();
        config.motors.push(m).unwrap();

        let mut s = ScalerConfig {
            name: label("i0"),
            ..ScalerConfig::default()
        };
        s.counters.push(CounterSpec::new("ctc0", 3)).unwrap();
        s.counters.push(CounterSpec::new("ctc0", 4)).unwrap();
        config.scalers.push(s).unwrap();

        let mut t = TimerConfig {
            name: label("timer"),
            ..TimerConfig::default()
        };
        t.counters.push(CounterSpec::new("ctc0", 5)).unwrap();
        config.timers.push(t).unwrap();

        config
    }

    #[test]
    fn test_valid_system() {
        assert_eq!(system().validate(), Ok(()));
    }

    #[test]
    fn test_unknown_chip() {
        let mut config = system();
        config.timers[0].counters[0] = CounterSpec::new("ctc9", 5);
        assert_eq!(
            config.validate(),
            Err(Error::UnknownChip {
                name: label("ctc9")
            })
        );
    }

    #[test]
    fn test_counter_claimed_twice() {
        let mut config = system();
        config.timers[0].counters[0] = CounterSpec::new("ctc0", 2);
        assert_eq!(
            config.validate(),
            Err(Error::CounterInUse {
                chip: label("ctc0"),
                counter: 2,
                owner: label("theta"),
            })
        );
    }

    #[test]
    fn test_counter_listed_twice_in_one_device() {
        let mut config = system();
        config.scalers[0].counters[1] = CounterSpec::new("ctc0", 3);
        assert_eq!(
            config.validate(),
            Err(Error::CounterInUse {
                chip: label("ctc0"),
                counter: 3,
                owner: label("i0"),
            })
        );
    }

    #[test]
    fn test_duplicate_names() {
        let mut config = system();
        config.timers[0].name = label("theta");
        assert_eq!(
            config.validate(),
            Err(Error::DuplicateName {
                name: label("theta")
            })
        );

        let mut config = system();
        config
            .chips
            .push(ChipConfig::new("ctc0", 0x310, 0))
            .unwrap();
        assert!(matches!(
            config.validate(),
            Err(Error::DuplicateName { .. })
        ));
    }
}
