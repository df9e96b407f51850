//! Recording delay provider

use embedded_hal::delay::DelayNs;

/// Delay that returns immediately and remembers the requested time
#[derive(Debug, Default)]
pub struct SimDelay {
    total_ns: u64,
    calls: u32,
}

impl SimDelay {
    pub const fn new() -> Self {
        Self {
            total_ns: 0,
            calls: 0,
        }
    }

    /// Sum of every requested delay in nanoseconds
    pub fn total_ns(&self) -> u64 {
        self.total_ns
    }

    /// Number of delay requests
    pub fn calls(&self) -> u32 {
        self.calls
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
        self.calls += 1;
    }

    fn delay_us(&mut self, us: u32) {
        self.total_ns += us as u64 * 1_000;
        self.calls += 1;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ns += ms as u64 * 1_000_000;
        self.calls += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_requests() {
        let mut delay = SimDelay::new();
        delay.delay_ms(10);
        delay.delay_us(5);
        assert_eq!(delay.total_ns(), 10_005_000);
        assert_eq!(delay.calls(), 2);
    }
}
