//! Event scaler driver
//!
//! Up to four 16-bit counters are chained into one wide counter, least
//! significant first. A counter that sits directly above its predecessor on
//! the same chip is fed internally from the predecessor's terminal count.
//! Any other counter is fed from its own SRC pin, which the board must wire
//! to the predecessor's OUT.

use heapless::Vec;

use am9513_core::config::{ScalerConfig, MAX_SCALER_COUNTERS};
use am9513_core::mode::{CountSource, CounterMode, Gating, OutputControl};
use am9513_core::traits::{Device, Scaler, ScalerMode};
use am9513_core::{Error, Label, Operation};
use am9513_hal::PortIo;

use crate::chip::counter::{acquire_all, release_all};
use crate::chip::register::status_bit;
use crate::chip::{CounterRef, SharedChip};

type Counters<'a, P> = Vec<CounterRef<'a, P>, MAX_SCALER_COUNTERS>;

/// Wide event counter on cascaded Am9513 counters
pub struct Am9513Scaler<'a, P> {
    name: Label,
    counters: Counters<'a, P>,
    gating: Gating,
    source: CountSource,
}

impl<'a, P: PortIo> Am9513Scaler<'a, P> {
    /// Claim the scaler's counters and program them
    pub fn open(config: &ScalerConfig, chips: &'a [SharedChip<P>]) -> Result<Self, Error> {
        config.validate()?;
        let gating = Gating::from_code(config.gating_control)?;
        let source = CountSource::from_code(config.count_source)?;

        let mut counters = Counters::new();
        for spec in &config.counters {
            let counter = CounterRef::resolve(spec, chips)?;
            counters.push(counter).map_err(|_| Error::TooManyCounters {
                max: MAX_SCALER_COUNTERS as u8,
            })?;
        }

        acquire_all(&config.name, &counters)?;

        let scaler = Self {
            name: config.name.clone(),
            counters,
            gating,
            source,
        };
        if let Err(e) = scaler.program() {
            let _ = release_all(&scaler.name, &scaler.counters);
            return Err(e);
        }

        info!(
            "scaler '{}' open, {=usize} counters",
            scaler.name.as_str(),
            scaler.counters.len()
        );
        Ok(scaler)
    }

    /// Mode register value for each counter in the chain
    fn modes(&self) -> impl Iterator<Item = u16> + '_ {
        let last = self.counters.len() - 1;
        self.counters.iter().enumerate().map(move |(n, counter)| {
            let mode = if n == 0 {
                CounterMode::new()
                    .gating(self.gating)
                    .source(self.source)
                    .repeat()
            } else {
                let prev = &self.counters[n - 1];
                let source = if prev.same_chip(counter) && prev.index() + 1 == counter.index() {
                    CountSource::TcnMinus1
                } else {
                    CountSource::Source(counter.number())
                };
                let mode = CounterMode::new().source(source);
                if n == last {
                    mode
                } else {
                    mode.repeat()
                }
            };
            // Only the top counter toggles, so its OUT latches an overflow.
            let output = if n == last {
                OutputControl::Toggle
            } else {
                OutputControl::PulseHigh
            };
            mode.count_up().output(output).bits()
        })
    }

    fn program(&self) -> Result<(), Error> {
        for (counter, mode) in self.counters.iter().zip(self.modes()) {
            debug!(
                "scaler '{}': counter {=u8} mode {=u16:#x}",
                self.name.as_str(),
                counter.number(),
                mode
            );
            counter.set_mode(mode)?;
        }
        Ok(())
    }

    /// Give the counters back
    pub fn close(self) -> Result<(), Error> {
        release_all(&self.name, &self.counters)?;
        info!("scaler '{}' closed", self.name.as_str());
        Ok(())
    }

    /// Counters in the chain, least significant first
    pub fn counters(&self) -> &[CounterRef<'a, P>] {
        &self.counters
    }

    fn disarm_all(&self) -> Result<(), Error> {
        for counter in &self.counters {
            counter.disarm()?;
        }
        Ok(())
    }

    fn first(&self) -> Result<&CounterRef<'a, P>, Error> {
        self.counters.first().ok_or(Error::NoCounters)
    }

    fn last(&self) -> Result<&CounterRef<'a, P>, Error> {
        self.counters.last().ok_or(Error::NoCounters)
    }
}

impl<P: PortIo> Device for Am9513Scaler<'_, P> {
    fn name(&self) -> &str {
        &self.name
    }
}

impl<P: PortIo> Scaler for Am9513Scaler<'_, P> {
    fn clear(&mut self) -> Result<(), Error> {
        self.disarm_all()?;
        for counter in &self.counters {
            counter.load(0)?;
        }
        self.last()?.clear_tc()?;
        // Highest first, so no carry lands before its target is armed.
        for counter in self.counters.iter().rev() {
            counter.arm()?;
        }
        debug!("scaler '{}' cleared", self.name.as_str());
        Ok(())
    }

    /// Whether the top counter's OUT is high
    ///
    /// The status byte comes from the chip of the first counter.
    fn overflow_set(&mut self) -> Result<bool, Error> {
        let bit = status_bit(self.last()?.index());
        let status = self.first()?.with(|chip, _| chip.get_status())?;
        Ok(status & bit != 0)
    }

    fn read(&mut self) -> Result<u64, Error> {
        self.disarm_all()?;
        let mut value = 0u64;
        for counter in self.counters.iter().rev() {
            value = (value << 16) | counter.read()? as u64;
        }
        Ok(value)
    }

    fn mode(&self) -> ScalerMode {
        ScalerMode::Counter
    }

    fn set_mode(&mut self, mode: ScalerMode) -> Result<(), Error> {
        match mode {
            ScalerMode::Counter => Ok(()),
            ScalerMode::Preset => Err(Error::NotYetImplemented(Operation::ScalerPresetMode)),
        }
    }
}
