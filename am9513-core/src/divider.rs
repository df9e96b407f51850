//! Frequency-divider selection
//!
//! A counter clocked from one of the internal F1..F5 sources sees the input
//! clock divided by 1, 16, 256, 4096 or 65536. Given an interval expressed in
//! raw clock ticks, these functions pick the divider and the 16-bit count to
//! load.
//!
//! Two policies are used:
//!
//! - [`select_for_duty_cycle`] keeps the step pulse between 1:8 and 1:128 of
//!   the step period, so slow motors get longer pulses.
//! - [`select_for_accuracy`] uses the finest divider that still fits in 16
//!   bits, for timers.

use crate::error::Error;
use crate::mode::FrequencyScaler;

/// Smallest tick count a timer may be loaded with
pub const MIN_TIMER_TICKS: u64 = 3;

/// Chosen divider and the count to load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DividerSelection {
    pub scaler: FrequencyScaler,
    pub ticks: u16,
}

/// Round a non-negative tick count to the nearest integer
///
/// Values that are not finite or do not fit a `u64` are rejected.
pub fn round_ticks(ticks: f64) -> Result<u64, Error> {
    if !ticks.is_finite() || ticks > u64::MAX as f64 {
        return Err(Error::IntervalTooLong);
    }
    if ticks <= 0.0 {
        return Ok(0);
    }
    Ok((ticks + 0.5) as u64)
}

/// Raw clock ticks per step for a step frequency
pub fn ticks_per_step(clock_hz: f64, step_hz: f64) -> Result<u64, Error> {
    if !(step_hz > 0.0) {
        return Err(Error::InvalidStepFrequency);
    }
    if !(clock_hz > 0.0) {
        return Err(Error::InvalidClockFrequency);
    }
    round_ticks(clock_hz / step_hz)
}

/// Raw clock ticks for an interval in seconds, negative intervals treated as zero
pub fn ticks_for_interval(clock_hz: f64, seconds: f64) -> Result<u64, Error> {
    if !(clock_hz > 0.0) {
        return Err(Error::InvalidClockFrequency);
    }
    let seconds = if seconds < 0.0 { 0.0 } else { seconds };
    round_ticks(seconds * clock_hz)
}

fn scaled(scaler: FrequencyScaler, clock_ticks: u64) -> Result<DividerSelection, Error> {
    let ticks = clock_ticks / scaler.ratio() as u64;
    match u16::try_from(ticks) {
        Ok(0) => Err(Error::IntervalTooShort),
        Ok(ticks) => Ok(DividerSelection { scaler, ticks }),
        Err(_) => Err(Error::IntervalTooLong),
    }
}

/// Pick the largest divider whose scaled count still exceeds 8
pub fn select_for_duty_cycle(clock_ticks: u64) -> Result<DividerSelection, Error> {
    let scaler = FrequencyScaler::ALL
        .iter()
        .rev()
        .copied()
        .find(|s| clock_ticks > 8 * s.ratio() as u64)
        .unwrap_or(FrequencyScaler::F1);
    scaled(scaler, clock_ticks)
}

/// Pick the smallest divider under which the count fits 16 bits
///
/// Counts below [`MIN_TIMER_TICKS`] are raised to it.
pub fn select_for_accuracy(clock_ticks: u64) -> Result<DividerSelection, Error> {
    let clock_ticks = clock_ticks.max(MIN_TIMER_TICKS);
    let scaler = FrequencyScaler::ALL
        .iter()
        .copied()
        .find(|s| clock_ticks < 65536 * s.ratio() as u64)
        .unwrap_or(FrequencyScaler::F5);
    scaled(scaler, clock_ticks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_duty_cycle_thresholds() {
        let cases = [
            (128, FrequencyScaler::F1, 128),
            (129, FrequencyScaler::F2, 8),
            (2048, FrequencyScaler::F2, 128),
            (2049, FrequencyScaler::F3, 8),
            (32768, FrequencyScaler::F3, 128),
            (32769, FrequencyScaler::F4, 8),
            (524288, FrequencyScaler::F4, 128),
            (524289, FrequencyScaler::F5, 8),
        ];
        for (clock_ticks, scaler, ticks) in cases {
            assert_eq!(
                select_for_duty_cycle(clock_ticks).unwrap(),
                DividerSelection { scaler, ticks },
                "clock_ticks = {}",
                clock_ticks
            );
        }
    }

    #[test]
    fn test_duty_cycle_rejects_zero_and_overflow() {
        assert_eq!(select_for_duty_cycle(0), Err(Error::IntervalTooShort));
        assert_eq!(
            select_for_duty_cycle(65536 * 65536),
            Err(Error::IntervalTooLong)
        );
    }

    #[test]
    fn test_accuracy_minimum() {
        assert_eq!(
            select_for_accuracy(0).unwrap(),
            DividerSelection {
                scaler: FrequencyScaler::F1,
                ticks: 3
            }
        );
    }

    #[test]
    fn test_accuracy_boundaries() {
        assert_eq!(select_for_accuracy(65535).unwrap().scaler, FrequencyScaler::F1);
        assert_eq!(select_for_accuracy(65536).unwrap().scaler, FrequencyScaler::F2);
        assert_eq!(
            select_for_accuracy(268_435_456).unwrap().scaler,
            FrequencyScaler::F5
        );
        assert_eq!(
            select_for_accuracy(1 << 32),
            Err(Error::IntervalTooLong)
        );
    }

    #[test]
    fn test_ticks_per_step() {
        assert_eq!(ticks_per_step(5.0e6, 1000.0).unwrap(), 5000);
        assert_eq!(ticks_per_step(1.0e6, 3.0).unwrap(), 333_333);
        assert_eq!(ticks_per_step(1.0e6, 0.0), Err(Error::InvalidStepFrequency));
        assert_eq!(ticks_per_step(1.0e6, -5.0), Err(Error::InvalidStepFrequency));
        assert_eq!(ticks_per_step(0.0, 5.0), Err(Error::InvalidClockFrequency));
        assert_eq!(ticks_per_step(1.0e300, 1.0e-300), Err(Error::IntervalTooLong));
    }

    #[test]
    fn test_negative_interval_is_zero() {
        assert_eq!(ticks_for_interval(1.0e6, -2.0).unwrap(), 0);
        assert_eq!(ticks_for_interval(1.0e6, 0.25).unwrap(), 250_000);
    }

    proptest! {
        #[test]
        fn duty_cycle_count_in_range(clock_ticks in 1u64..(65536u64 * 65536)) {
            let sel = select_for_duty_cycle(clock_ticks).unwrap();
            prop_assert!(sel.ticks >= 1);
            let ratio = sel.scaler.ratio() as u64;
            if sel.scaler != FrequencyScaler::F1 {
                prop_assert!(clock_ticks > 8 * ratio);
            }
            if sel.scaler != FrequencyScaler::F5 {
                prop_assert!(clock_ticks <= 8 * 16 * ratio);
            }
        }

        #[test]
        fn accuracy_picks_smallest_fitting(clock_ticks in 0u64..(65536u64 * 65536)) {
            let sel = select_for_accuracy(clock_ticks).unwrap();
            prop_assert!(sel.ticks >= 3);
            let ratio = sel.scaler.ratio() as u64;
            prop_assert_eq!(sel.ticks as u64, clock_ticks.max(3) / ratio);
            if sel.scaler != FrequencyScaler::F1 {
                prop_assert!(clock_ticks.max(3) / (ratio / 16) > 65535);
            }
        }
    }
}
