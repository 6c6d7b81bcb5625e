//! LED2 toggles on every press of the user key (K1 on the START board).
#![no_main]
#![no_std]

use core::cell::RefCell;

use cortex_m::interrupt::Mutex;
use cortex_m_rt::entry;
use embedded_hal::blocking::delay::DelayMs;
use gd32c2x1_bsp::board::{self, BoardKey};
use gd32c2x1_bsp::delay::Delay;
use gd32c2x1_bsp::exti::Exti;
use gd32c2x1_bsp::pac::{self, interrupt};
use gd32c2x1_bsp::rcu::Rcu;
use gd32c2x1_bsp::syscfg::Syscfg;

#[cfg(not(feature = "board-start"))]
mod bsp {
    pub use gd32c2x1_bsp::board::eval::{Key, Led};
    pub const KEY: Key = Key::User;
    pub const LED: Led = Led::Led2;
}
#[cfg(feature = "board-start")]
mod bsp {
    pub use gd32c2x1_bsp::board::start::{Key, Led};
    pub const KEY: Key = Key::K1;
    pub const LED: Led = Led::Led2;
}

static EXTI: Mutex<RefCell<Option<Exti>>> = Mutex::new(RefCell::new(None));

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();
    let mut cp = cortex_m::Peripherals::take().unwrap();

    let mut rcu = Rcu::new(dp.RCU);
    let mut delay = Delay::new(cp.SYST, &rcu.clocks());

    board::led_init(bsp::LED, &mut rcu);
    delay.delay_ms(500u16);
    board::led_on(bsp::LED);
    delay.delay_ms(500u16);
    board::led_off(bsp::LED);

    let mut syscfg = Syscfg::new(dp.SYSCFG);
    let mut exti = Exti::new(dp.EXTI);
    board::key_init_exti(bsp::KEY, &mut rcu, &mut syscfg, &mut exti);
    cortex_m::interrupt::free(|cs| EXTI.borrow(cs).replace(Some(exti)));
    board::key_nvic_enable(bsp::KEY, &mut cp.NVIC);

    defmt::info!("press the key to toggle the LED");
    loop {
        cortex_m::asm::wfi();
    }
}

fn key_pressed() {
    cortex_m::interrupt::free(|cs| {
        if let Some(exti) = EXTI.borrow(cs).borrow_mut().as_mut() {
            let line = bsp::KEY.def().line();
            if exti.interrupt_flag_get(line) {
                board::led_toggle(bsp::LED);
                exti.interrupt_flag_clear(line);
            }
        }
    });
}

#[cfg(not(feature = "board-start"))]
#[interrupt]
fn EXTI4() {
    key_pressed();
}

#[cfg(feature = "board-start")]
#[interrupt]
fn EXTI0() {
    key_pressed();
}
