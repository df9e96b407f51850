//! Countdown timer driver
//!
//! One counter counts down a preset on one of the internal F1..F5 sources.
//! Its OUT pin must be wired back to its own GATE: forcing OUT high starts
//! the count, and the toggle at terminal count closes the gate again.

use am9513_core::config::TimerConfig;
use am9513_core::divider::{select_for_accuracy, ticks_for_interval};
use am9513_core::mode::{CountSource, CounterMode, FrequencyScaler, Gating, OutputControl};
use am9513_core::traits::{Device, Timer, TimerMode};
use am9513_core::{Error, Label, Operation};
use am9513_hal::PortIo;

use crate::chip::counter::{acquire_all, release_all};
use crate::chip::{CounterRef, SharedChip};

/// Countdown timer on one Am9513 counter
pub struct Am9513Timer<'a, P> {
    name: Label,
    counter: CounterRef<'a, P>,
    clock_frequency: f64,
}

impl<'a, P: PortIo> Am9513Timer<'a, P> {
    /// Claim the timer's counter and program it
    pub fn open(config: &TimerConfig, chips: &'a [SharedChip<P>]) -> Result<Self, Error> {
        config.validate()?;
        let counter = CounterRef::resolve(&config.counters[0], chips)?;
        acquire_all(&config.name, &[counter])?;

        let timer = Self {
            name: config.name.clone(),
            counter,
            clock_frequency: config.clock_frequency,
        };
        if let Err(e) = timer.program() {
            let _ = release_all(&timer.name, &[counter]);
            return Err(e);
        }

        info!(
            "timer '{}' open on counter {=u8}",
            timer.name.as_str(),
            counter.number()
        );
        Ok(timer)
    }

    fn program(&self) -> Result<(), Error> {
        let mode = CounterMode::new()
            .gating(Gating::HighLevel)
            .source(CountSource::Frequency(FrequencyScaler::F1))
            .output(OutputControl::Toggle);
        self.counter.set_mode(mode.bits())?;
        // Keep the gate shut until started.
        self.counter.clear_tc()
    }

    /// Give the counter back
    pub fn close(self) -> Result<(), Error> {
        release_all(&self.name, &[self.counter])?;
        info!("timer '{}' closed", self.name.as_str());
        Ok(())
    }

    pub fn counter(&self) -> CounterRef<'a, P> {
        self.counter
    }

    pub fn clock_frequency(&self) -> f64 {
        self.clock_frequency
    }
}

impl<P: PortIo> Device for Am9513Timer<'_, P> {
    fn name(&self) -> &str {
        &self.name
    }
}

impl<P: PortIo> Timer for Am9513Timer<'_, P> {
    fn is_busy(&mut self) -> Result<bool, Error> {
        self.counter.output_high()
    }

    fn start(&mut self, seconds: f64) -> Result<(), Error> {
        let ticks = ticks_for_interval(self.clock_frequency, seconds)?;
        let selection = select_for_accuracy(ticks)?;
        debug!(
            "timer '{}': {=u64} clock ticks, {} x {=u16}",
            self.name.as_str(),
            ticks,
            selection.scaler,
            selection.ticks
        );

        let mode = self.counter.mode()?;
        let mode = (mode & CounterMode::SOURCE_MASK) | selection.scaler.source_bits();
        self.counter.set_mode(mode)?;
        self.counter.load(selection.ticks)?;
        self.counter.arm()?;
        // OUT is wired to GATE; raising it starts the count.
        self.counter.set_tc()
    }

    /// Stop the timer and return the time that was still left
    ///
    /// Zero once the count has run out: the counter has already reloaded
    /// its preset by then.
    fn stop(&mut self) -> Result<f64, Error> {
        self.counter.disarm()?;
        let running = self.counter.output_high()?;
        self.counter.clear_tc()?;
        if !running {
            return Ok(0.0);
        }

        let scaler = FrequencyScaler::from_mode(self.counter.mode()?)?;
        let remaining = self.counter.read()?;
        Ok(scaler.ratio() as f64 * remaining as f64 / self.clock_frequency)
    }

    fn clear(&mut self) -> Result<(), Error> {
        Err(Error::NotYetImplemented(Operation::ClearTimer))
    }

    fn read(&mut self) -> Result<f64, Error> {
        Err(Error::NotYetImplemented(Operation::ReadTimer))
    }

    fn mode(&self) -> TimerMode {
        TimerMode::Preset
    }

    fn set_mode(&mut self, mode: TimerMode) -> Result<(), Error> {
        match mode {
            TimerMode::Preset => Ok(()),
            TimerMode::Counter => Err(Error::NotYetImplemented(Operation::TimerCounterMode)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use am9513_core::config::{ChipConfig, CounterSpec};
    use am9513_core::error::label;
    use am9513_core::ErrorKind;
    use am9513_hal_sim::{GateInput, SimChip};

    use crate::chip::Am9513;

    const CLOCK: f64 = 1.0e6;

    fn chips() -> [SharedChip<SimChip>; 1] {
        let mut sim = SimChip::new(0x300);
        sim.wire_gate(4, GateInput::Output(4));
        [Am9513::open_with(&ChipConfig::new("ctc0", 0x300, 0), sim)
            .unwrap()
            .shared()]
    }

    fn config(counters: &[u8]) -> TimerConfig {
        TimerConfig {
            name: label("timer"),
            counters: counters
                .iter()
                .map(|n| CounterSpec::new("ctc0", *n))
                .collect(),
            clock_frequency: CLOCK,
        }
    }

    fn open(chips: &[SharedChip<SimChip>]) -> Am9513Timer<'_, SimChip> {
        Am9513Timer::open(&config(&[5]), chips).unwrap()
    }

    fn clock(chips: &[SharedChip<SimChip>], ticks: u64) {
        chips[0].borrow_mut().port_mut().clock(ticks);
    }

    #[test]
    fn test_open_programs_counter() {
        let chips = chips();
        let _timer = open(&chips);
        let chip = chips[0].borrow();
        let c = chip.port().counter(4);
        assert_eq!(c.mode, 0x8B02);
        assert!(!c.output);
        assert_eq!(chip.owner(4).unwrap(), Some("timer"));
    }

    #[test]
    fn test_open_rejects_bad_configs() {
        let chips = chips();
        assert_eq!(
            Am9513Timer::open(&config(&[]), &chips).err(),
            Some(Error::NoCounters)
        );
        assert_eq!(
            Am9513Timer::open(&config(&[4, 5]), &chips).err(),
            Some(Error::NotYetImplemented(Operation::MultiCounterTimer))
        );
        assert_eq!(chips[0].borrow().owner(3).unwrap(), None);
    }

    #[test]
    fn test_start_stop_reports_preset() {
        let chips = chips();
        let mut timer = open(&chips);

        timer.start(0.01).unwrap();
        assert_eq!(chips[0].borrow().port().counter(4).mode, 0x8B02);
        assert!((timer.stop().unwrap() - 0.01).abs() < 1.0 / CLOCK);

        // 1e6 ticks needs F2: 62500 counts of 16
        timer.start(1.0).unwrap();
        assert_eq!(chips[0].borrow().port().counter(4).mode, 0x8C02);
        assert!((timer.stop().unwrap() - 1.0).abs() < 16.0 / CLOCK);
    }

    #[test]
    fn test_stop_reports_time_left() {
        let chips = chips();
        let mut timer = open(&chips);

        timer.start(0.01).unwrap();
        clock(&chips, 4000);
        let left = timer.stop().unwrap();
        assert!((left - 0.006).abs() < 2.0 / CLOCK);

        // stopped: more clock changes nothing
        clock(&chips, 1000);
        assert!(!chips[0].borrow().port().counter(4).armed);
        assert!(!timer.is_busy().unwrap());
    }

    #[test]
    fn test_stop_after_expiry() {
        let chips = chips();
        let mut timer = open(&chips);

        timer.start(0.01).unwrap();
        clock(&chips, 20_000);
        assert!(!timer.is_busy().unwrap());
        assert_eq!(timer.stop().unwrap(), 0.0);

        // stopping an idle timer
        assert_eq!(timer.stop().unwrap(), 0.0);
    }

    #[test]
    fn test_failed_open_releases_counter() {
        let chips = chips();
        chips[0].borrow_mut().port_mut().fail_writes_after(0);
        assert_eq!(
            Am9513Timer::open(&config(&[5]), &chips).err(),
            Some(Error::Io(am9513_hal::HalError::Io))
        );
        assert_eq!(chips[0].borrow().owner(4).unwrap(), None);

        chips[0].borrow_mut().port_mut().clear_fault();
        let _timer = open(&chips);
    }

    #[test]
    fn test_negative_start_is_minimum_count() {
        let chips = chips();
        let mut timer = open(&chips);
        timer.start(-5.0).unwrap();
        assert_eq!(chips[0].borrow().port().counter(4).value, 3);
        assert!((timer.stop().unwrap() - 3.0 / CLOCK).abs() < 1e-12);
    }

    #[test]
    fn test_busy_until_expired() {
        let chips = chips();
        let mut timer = open(&chips);
        assert!(!timer.is_busy().unwrap());

        timer.start(10.0 / CLOCK).unwrap();
        assert!(timer.is_busy().unwrap());
        clock(&chips, 5);
        assert!(timer.is_busy().unwrap());
        clock(&chips, 20);
        assert!(!timer.is_busy().unwrap());
        assert!(!chips[0].borrow().port().counter(4).armed);
    }

    #[test]
    fn test_interval_too_long() {
        let chips = chips();
        let mut timer = open(&chips);
        // more than 65535 * 65536 ticks
        assert_eq!(timer.start(5000.0), Err(Error::IntervalTooLong));
    }

    #[test]
    fn test_unimplemented_operations() {
        let chips = chips();
        let mut timer = open(&chips);
        assert_eq!(timer.clear().unwrap_err().kind(), ErrorKind::NotYetImplemented);
        assert_eq!(timer.read().unwrap_err().kind(), ErrorKind::NotYetImplemented);
        assert_eq!(timer.mode(), TimerMode::Preset);
        timer.set_mode(TimerMode::Preset).unwrap();
        assert_eq!(
            timer.set_mode(TimerMode::Counter),
            Err(Error::NotYetImplemented(Operation::TimerCounterMode))
        );
    }

    #[test]
    fn test_close_releases_counter() {
        let chips = chips();
        let timer = open(&chips);
        timer.close().unwrap();
        assert_eq!(chips[0].borrow().owner(4).unwrap(), None);
        let _timer = open(&chips);
    }
}
