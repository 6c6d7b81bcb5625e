//! Blocking delays on the SysTick timer.

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;
use embedded_hal::blocking::delay::{DelayMs, DelayUs};

use crate::rcu::Clocks;

/// SysTick is a 24-bit down counter
const MAX_RVR: u32 = 0x00FF_FFFF;

/// Number of SysTick reloads needed for `ticks`: full periods of `MAX_RVR`
/// followed by the remainder.
fn reloads(ticks: u64) -> (u64, u32) {
    let full = ticks / u64::from(MAX_RVR);
    let rest = (ticks % u64::from(MAX_RVR)) as u32;
    (full, rest)
}

fn ticks_for_us(us: u32, hclk: u32) -> u64 {
    u64::from(us) * u64::from(hclk) / 1_000_000
}

/// SysTick based delay provider
pub struct Delay {
    syst: SYST,
    hclk: u32,
}

impl Delay {
    /// Configures SysTick to count HCLK cycles
    pub fn new(mut syst: SYST, clocks: &Clocks) -> Self {
        syst.set_clock_source(SystClkSource::Core);
        Delay {
            syst,
            hclk: clocks.ahb(),
        }
    }

    /// Releases the system timer resource
    pub fn free(self) -> SYST {
        self.syst
    }

    fn wait_ticks(&mut self, rvr: u32) {
        if rvr < 2 {
            return;
        }
        self.syst.set_reload(rvr);
        self.syst.clear_current();
        self.syst.enable_counter();
        while !self.syst.has_wrapped() {}
        self.syst.disable_counter();
    }
}

impl DelayUs<u32> for Delay {
    fn delay_us(&mut self, us: u32) {
        let (full, rest) = reloads(ticks_for_us(us, self.hclk));
        for _ in 0..full {
            self.wait_ticks(MAX_RVR);
        }
        self.wait_ticks(rest);
    }
}

impl DelayUs<u16> for Delay {
    fn delay_us(&mut self, us: u16) {
        self.delay_us(u32::from(us));
    }
}

impl DelayMs<u32> for Delay {
    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.delay_us(1_000u32);
        }
    }
}

impl DelayMs<u16> for Delay {
    fn delay_ms(&mut self, ms: u16) {
        self.delay_ms(u32::from(ms));
    }
}

impl DelayMs<u8> for Delay {
    fn delay_ms(&mut self, ms: u8) {
        self.delay_ms(u32::from(ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_at_48mhz() {
        assert_eq!(ticks_for_us(1_000, 48_000_000), 48_000);
        assert_eq!(ticks_for_us(1, 48_000_000), 48);
        assert_eq!(ticks_for_us(u32::MAX, 48_000_000), 206_158_430_160);
    }

    #[test]
    fn long_waits_split_into_reloads() {
        assert_eq!(reloads(48_000), (0, 48_000));
        assert_eq!(reloads(u64::from(MAX_RVR) * 3 + 5), (3, 5));
    }
}
