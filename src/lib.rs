//! Board support for the GD32C2x1 EVAL and START boards.
//!
//! Peripheral drivers map named operations onto register bit manipulation.
//! On top of them sit the board tables (LEDs, keys, console), a WAVE parser
//! feeding an interrupt driven I2S player, and a small MIPI-DCS LCD driver.
//! The demo firmware lives in `src/bin` and needs the `rt` feature.
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod adc;
pub mod audio;
pub mod board;
pub mod delay;
pub mod exti;
pub mod gpio;
pub mod lcd;
pub mod misc;
pub mod pac;
pub mod pmu;
pub mod rcu;
pub mod rtc;
pub mod spi;
pub mod static_ref;
pub mod syscfg;
pub mod timer;
pub mod usart;
pub mod wave;
pub mod wwdgt;

#[cfg(test)]
mod testing;

#[cfg(feature = "rt")]
use defmt_rtt as _; // global logger
#[cfg(feature = "rt")]
use panic_probe as _;

#[cfg(feature = "rt")]
static COUNT: core::sync::atomic::AtomicUsize = core::sync::atomic::AtomicUsize::new(0);

#[cfg(feature = "rt")]
defmt::timestamp!("{=usize}", {
    use core::sync::atomic::Ordering;
    // NOTE(no-CAS) `timestamps` runs with interrupts disabled
    let n = COUNT.load(Ordering::Relaxed);
    COUNT.store(n + 1, Ordering::Relaxed);
    n
});
