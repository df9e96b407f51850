//! Stepper motor driver
//!
//! Two adjacent counters on one chip drive a constant-speed stepper:
//!
//! ```text
//!   Fn ──► low counter ──TC pulse──► high counter ──OUT──┐
//!            ▲  (step rate)           (steps left)        │
//!            └──────────── GATE (high level) ◄────────────┘
//! ```
//!
//! The low counter divides the clock down to the step rate and emits one
//! pulse per step. The high counter counts those pulses down and toggles its
//! output low when the move is done, which gates the low counter off. The
//! high counter's OUT must be wired to the low counter's GATE, and the low
//! counter's OUT drives the step input of the motor translator.
//!
//! Position is not stored in hardware. The driver remembers the destination
//! of the last move and subtracts the steps the high counter still has to go.

use am9513_core::config::MotorConfig;
use am9513_core::divider::{select_for_duty_cycle, ticks_per_step};
use am9513_core::mode::{CountSource, CounterMode, Gating, OutputControl};
use am9513_core::traits::{Device, Direction, StepperMotor};
use am9513_core::{Error, Label};
use am9513_hal::{DigitalOutput, PortIo};
use embedded_hal::delay::DelayNs;

use crate::chip::counter::{acquire_all, release_all};
use crate::chip::{CounterRef, SharedChip};

/// Largest relative move the high counter can express
pub const MAX_RELATIVE_STEPS: u64 = 65534;

/// High counter contents once a move has run to completion
const DONE: u16 = 0xFFFF;

/// Count loaded into the low counter to fire one step
///
/// 0 gives no step at all, 1 or 2 give an overlong pulse.
const SINGLE_STEP_TICKS: u16 = 4;

/// Time allowed for a single step pulse to finish
const SINGLE_STEP_SETTLE_MS: u32 = 10;

/// Stepper motor on two adjacent Am9513 counters
pub struct Am9513Motor<'a, P, D, Y> {
    name: Label,
    low: CounterRef<'a, P>,
    high: CounterRef<'a, P>,
    direction: D,
    delay: Y,
    direction_bit: u8,
    step_frequency: f64,
    clock_frequency: f64,
    busy_retries: u32,
    last_destination: i64,
    last_direction: Direction,
    busy_retries_left: u32,
}

impl<'a, P, D, Y> Am9513Motor<'a, P, D, Y>
where
    P: PortIo,
    D: DigitalOutput,
    Y: DelayNs,
{
    /// Claim the motor's counters and program them
    ///
    /// The counters stay claimed until [`Am9513Motor::close`]. If
    /// programming fails they are given back before the error is returned.
    pub fn open(
        config: &MotorConfig,
        chips: &'a [SharedChip<P>],
        direction: D,
        delay: Y,
    ) -> Result<Self, Error> {
        config.validate()?;

        let low = CounterRef::resolve(&config.counters[0], chips)?;
        let high = CounterRef::resolve(&config.counters[1], chips)?;
        if !low.same_chip(&high) {
            return Err(Error::CountersOnDifferentChips);
        }
        if high.index() != low.index() + 1 {
            return Err(Error::CountersNotAdjacent {
                low: low.number(),
                high: high.number(),
            });
        }

        acquire_all(&config.name, &[low, high])?;

        let motor = Self {
            name: config.name.clone(),
            low,
            high,
            direction,
            delay,
            direction_bit: config.direction_bit,
            step_frequency: config.step_frequency,
            clock_frequency: config.clock_frequency,
            busy_retries: config.busy_retries,
            last_destination: config.initial_position,
            last_direction: Direction::Positive,
            busy_retries_left: 0,
        };

        if let Err(e) = motor.program() {
            // The programming error is the one worth reporting.
            let _ = release_all(&motor.name, &[low, high]);
            return Err(e);
        }

        info!(
            "motor '{}' open on counters {=u8} and {=u8}",
            motor.name.as_str(),
            low.number(),
            high.number()
        );
        Ok(motor)
    }

    fn program(&self) -> Result<(), Error> {
        let ticks = ticks_per_step(self.clock_frequency, self.step_frequency)?;
        let selection = select_for_duty_cycle(ticks)?;
        debug!(
            "motor '{}': {=u64} clock ticks per step, {} x {=u16}",
            self.name.as_str(),
            ticks,
            selection.scaler,
            selection.ticks
        );

        let low_mode = CounterMode::new()
            .gating(Gating::HighLevel)
            .source(CountSource::Frequency(selection.scaler))
            .repeat()
            .output(OutputControl::PulseHigh);
        self.low.set_mode(low_mode.bits())?;
        self.low.load(selection.ticks)?;

        let high_mode = CounterMode::new()
            .falling_edge()
            .source(CountSource::TcnMinus1)
            .output(OutputControl::Toggle);
        self.high.set_mode(high_mode.bits())?;
        self.high.load(DONE)?;
        self.high.clear_tc()
    }

    /// Give the counters back
    pub fn close(self) -> Result<(), Error> {
        release_all(&self.name, &[self.low, self.high])?;
        info!("motor '{}' closed", self.name.as_str());
        Ok(())
    }

    pub fn step_frequency(&self) -> f64 {
        self.step_frequency
    }

    pub fn clock_frequency(&self) -> f64 {
        self.clock_frequency
    }

    /// Destination of the most recent move
    pub fn last_destination(&self) -> i64 {
        self.last_destination
    }

    pub fn last_direction(&self) -> Direction {
        self.last_direction
    }

    /// Low order (step rate) counter
    pub fn low_counter(&self) -> CounterRef<'a, P> {
        self.low
    }

    /// High order (step count) counter
    pub fn high_counter(&self) -> CounterRef<'a, P> {
        self.high
    }

    /// Give the direction output back
    pub fn into_direction_output(self) -> D {
        self.direction
    }

    fn disarm_both(&self) -> Result<(), Error> {
        self.low.disarm()?;
        self.high.disarm()
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), Error> {
        self.direction
            .write_bit(self.direction_bit, direction == Direction::Positive)?;
        self.last_direction = direction;
        Ok(())
    }

    /// Fold any unfinished move into `last_destination`
    ///
    /// A single step does not touch the high counter, so it must start out
    /// reporting no steps left.
    fn settle_position(&mut self, current: i64) -> Result<(), Error> {
        if current != self.last_destination {
            self.last_destination = current;
            self.high.load(DONE)?;
        }
        Ok(())
    }

    /// Fire exactly one pulse from the low counter
    ///
    /// The low counter is briefly switched to ungated one-shot counting, then
    /// its mode and load register are put back. The high counter's output
    /// gates the low counter, so it is forced low first.
    fn single_step(&mut self) -> Result<(), Error> {
        let next = self
            .last_destination
            .checked_add(self.last_direction.sign())
            .ok_or(Error::MoveTooLarge {
                steps: self.last_direction.sign(),
            })?;
        self.high.clear_tc()?;

        let saved_mode = self.low.mode()?;
        let saved_load = self.low.load_register()?;

        self.low.set_mode(saved_mode & CounterMode::SINGLE_SHOT_MASK)?;
        self.low.load(SINGLE_STEP_TICKS)?;
        self.low.arm()?;

        self.delay.delay_ms(SINGLE_STEP_SETTLE_MS);

        self.low.set_mode(saved_mode)?;
        self.low.load(saved_load)?;

        self.last_destination = next;
        trace!(
            "motor '{}' single step to {=i64}",
            self.name.as_str(),
            self.last_destination
        );
        Ok(())
    }
}

impl<P, D, Y> Device for Am9513Motor<'_, P, D, Y>
where
    P: PortIo,
    D: DigitalOutput,
    Y: DelayNs,
{
    fn name(&self) -> &str {
        &self.name
    }
}

impl<P, D, Y> StepperMotor for Am9513Motor<'_, P, D, Y>
where
    P: PortIo,
    D: DigitalOutput,
    Y: DelayNs,
{
    fn move_absolute(&mut self, destination: i64) -> Result<(), Error> {
        // Nothing may count until both counters are set up for this move.
        self.disarm_both()?;

        let current = self.position()?;
        let relative = destination.saturating_sub(current);
        let steps = relative.unsigned_abs();
        if steps > MAX_RELATIVE_STEPS {
            return Err(Error::MoveTooLarge { steps: relative });
        }

        // Loading 0 would roll the high counter over to 0xFFFF.
        if steps == 0 {
            return Ok(());
        }

        self.set_direction(Direction::of(relative))?;

        if steps == 1 {
            self.settle_position(current)?;
            return self.single_step();
        }

        // The chip emits one more step than the count loaded.
        self.high.load((steps - 1) as u16)?;
        // Reloading from 0 at the end of the move leaves 0xFFFF behind,
        // which reads as "no steps left".
        self.high.set_load_register(0)?;
        self.high.set_tc()?;

        self.last_destination = destination;
        self.busy_retries_left = 1 + self.busy_retries;

        self.high.arm()?;
        self.low.arm()?;

        debug!(
            "motor '{}' moving {=i64} steps to {=i64}",
            self.name.as_str(),
            relative,
            destination
        );
        Ok(())
    }

    fn position(&mut self) -> Result<i64, Error> {
        let hold = self.high.read()?;
        let remaining = if hold == DONE { 0 } else { hold as i64 + 1 };
        Ok(self.last_destination - self.last_direction.sign() * remaining)
    }

    fn set_position(&mut self, position: i64) -> Result<(), Error> {
        self.last_destination = position;
        self.high.load(DONE)?;
        debug!("motor '{}' position set to {=i64}", self.name.as_str(), position);
        Ok(())
    }

    /// Busy while the high counter's output is high
    ///
    /// Once the output drops, the move is only reported finished after it
    /// has been seen low on `1 + busy_retries` polls.
    fn is_busy(&mut self) -> Result<bool, Error> {
        if self.high.output_high()? {
            self.busy_retries_left = 1 + self.busy_retries;
            return Ok(true);
        }
        self.busy_retries_left = self.busy_retries_left.saturating_sub(1);
        Ok(self.busy_retries_left > 0)
    }

    fn jog(&mut self, direction: Direction) -> Result<(), Error> {
        self.disarm_both()?;
        let current = self.position()?;
        self.settle_position(current)?;
        self.set_direction(direction)?;
        self.single_step()
    }

    fn immediate_abort(&mut self) -> Result<(), Error> {
        self.disarm_both()?;
        self.low.clear_tc()?;
        self.high.clear_tc()?;
        self.busy_retries_left = 0;
        debug!("motor '{}' aborted", self.name.as_str());
        Ok(())
    }
}
