//! Enters sleep mode after a first LED flash. A byte arriving on the
//! console wakes the core and the LEDs keep flashing.
#![no_main]
#![no_std]

use gd32c2x1_bsp as _;

#[rtic::app(device = gd32c2x1_bsp::pac, peripherals = true)]
mod app {
    use cortex_m::peripheral::SCB;
    use embedded_hal::blocking::delay::DelayMs;
    use embedded_hal::serial::Read;
    use gd32c2x1_bsp::board::eval::{self, Led};
    use gd32c2x1_bsp::board;
    use gd32c2x1_bsp::delay::Delay;
    use gd32c2x1_bsp::pmu::{LowPowerEntry, Pmu};
    use gd32c2x1_bsp::rcu::{Periph, Rcu};
    use gd32c2x1_bsp::usart::{Event, Usart};

    const FLASH_MS: u16 = 200;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        com: Usart,
        pmu: Pmu,
        scb: SCB,
        delay: Delay,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local, init::Monotonics) {
        let core: cortex_m::Peripherals = cx.core;
        let device = cx.device;

        let mut rcu = Rcu::new(device.RCU);
        let clocks = rcu.clocks();

        let mut com = eval::com_init(device.USART0, &mut rcu, &clocks);
        rcu.enable(Periph::Pmu);
        let pmu = Pmu::new(device.PMU);

        board::led_init(Led::Led1, &mut rcu);
        board::led_init(Led::Led2, &mut rcu);

        com.listen(Event::Rbne);
        let delay = Delay::new(core.SYST, &clocks);

        (
            Shared {},
            Local {
                com,
                pmu,
                scb: core.SCB,
                delay,
            },
            init::Monotonics(),
        )
    }

    fn flash(delay: &mut Delay) {
        board::led_on(Led::Led1);
        board::led_on(Led::Led2);
        delay.delay_ms(FLASH_MS);
        board::led_off(Led::Led1);
        board::led_off(Led::Led2);
        delay.delay_ms(FLASH_MS);
    }

    #[idle(local = [pmu, scb, delay])]
    fn idle(cx: idle::Context) -> ! {
        flash(cx.local.delay);

        defmt::info!("sleeping until a byte arrives on the console");
        cx.local.pmu.to_sleepmode(cx.local.scb, LowPowerEntry::Wfi);
        defmt::info!("awake");

        loop {
            flash(cx.local.delay);
        }
    }

    #[task(binds = USART0, local = [com])]
    fn console(cx: console::Context) {
        match cx.local.com.read() {
            Ok(byte) => defmt::debug!("received {=u8:#x}", byte),
            Err(nb::Error::Other(e)) => defmt::warn!("console: {}", e),
            Err(nb::Error::WouldBlock) => {}
        }
    }
}
