//! Loops a short WAVE clip out of I2S0. TIMER15 channel 0 provides the
//! codec master clock on PA6.
#![no_main]
#![no_std]

use gd32c2x1_bsp as _;

static CLIP: &[u8] = include_bytes!("../../assets/tone_8k_mono.wav");

#[rtic::app(device = gd32c2x1_bsp::pac, peripherals = true)]
mod app {
    use gd32c2x1_bsp::audio::{self, WavePlayer};
    use gd32c2x1_bsp::rcu::{Periph, Rcu};
    use gd32c2x1_bsp::spi::Spi;
    use gd32c2x1_bsp::timer::Timer;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        spi: Spi,
        player: WavePlayer<'static>,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local, init::Monotonics) {
        let device = cx.device;

        let mut rcu = Rcu::new(device.RCU);
        let clocks = rcu.clocks();

        audio::mck_gpio_config(&mut rcu);
        let mut mck = Timer::timer15(device.TIMER15, &mut rcu, &clocks);
        audio::mck_timer_config(&mut mck);

        audio::i2s_gpio_config(&mut rcu);
        rcu.enable(Periph::Spi0);
        let mut spi = Spi::spi0(device.SPI0);

        let mut player = match WavePlayer::new(super::CLIP) {
            Ok(player) => player,
            Err(e) => {
                defmt::error!("cannot play clip: {}", e);
                loop {
                    cortex_m::asm::wfi();
                }
            }
        };
        player.start(&mut spi, &clocks);

        (Shared {}, Local { spi, player }, init::Monotonics())
    }

    #[task(binds = SPI0, local = [spi, player])]
    fn spi0(cx: spi0::Context) {
        cx.local.player.on_transmit_empty(cx.local.spi);
    }
}
