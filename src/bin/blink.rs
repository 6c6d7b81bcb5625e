#![no_main]
#![no_std]

use cortex_m_rt::entry;
use embedded_hal::blocking::delay::DelayMs;
use gd32c2x1_bsp::board;
use gd32c2x1_bsp::delay::Delay;
use gd32c2x1_bsp::pac;
use gd32c2x1_bsp::rcu::Rcu;

#[cfg(not(feature = "board-start"))]
use gd32c2x1_bsp::board::eval::Led;
#[cfg(feature = "board-start")]
use gd32c2x1_bsp::board::start::Led;

const STEP_MS: u16 = 200;

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    let mut rcu = Rcu::new(dp.RCU);
    let clocks = rcu.clocks();
    let mut delay = Delay::new(cp.SYST, &clocks);

    for led in Led::ALL {
        board::led_init(led, &mut rcu);
    }
    defmt::info!("blinking {=usize} LEDs at {=u32} Hz", Led::ALL.len(), clocks.sys());

    loop {
        for led in Led::ALL {
            board::led_on(led);
            delay.delay_ms(STEP_MS);
            board::led_off(led);
        }
    }
}
