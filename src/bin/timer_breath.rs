//! Breathing LED: TIMER0 channel 0 drives PA15 with a 2 kHz PWM whose duty
//! ramps up and down.
#![no_main]
#![no_std]

use cortex_m_rt::entry;
use embedded_hal::blocking::delay::DelayMs;
use gd32c2x1_bsp::delay::Delay;
use gd32c2x1_bsp::gpio::{self, OutputType, Pin, Port, Speed};
use gd32c2x1_bsp::pac;
use gd32c2x1_bsp::rcu::Rcu;
use gd32c2x1_bsp::timer::{
    Channel, OcMode, OcParameters, Polarity, Timer, TimerParameters,
};

/// 48 MHz / 48 = 1 MHz counter clock
const PRESCALER: u16 = 47;
/// 1 MHz / 500 = 2 kHz
const PERIOD: u16 = 499;
const STEP: i32 = 10;
const STEP_MS: u16 = 40;

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    let mut rcu = Rcu::new(dp.RCU);
    let clocks = rcu.clocks();
    let mut delay = Delay::new(cp.SYST, &clocks);

    let pin = Pin::new(Port::A, 15);
    pin.enable_clock(&mut rcu);
    pin.into_alternate(gpio::AF2, OutputType::PushPull, Speed::Level1);

    let mut timer = Timer::timer0(dp.TIMER0, &mut rcu, &clocks);
    timer.init(&TimerParameters {
        prescaler: PRESCALER,
        period: PERIOD,
        ..Default::default()
    });
    timer.channel_output_config(
        Channel::Ch0,
        &OcParameters {
            output_enable: true,
            output_nenable: true,
            polarity: Polarity::High,
            npolarity: Polarity::High,
            idle_high: false,
            nidle_high: false,
        },
    );
    timer.channel_output_pulse_value_config(Channel::Ch0, 250);
    timer.channel_output_mode_config(Channel::Ch0, OcMode::Pwm0);
    timer.channel_output_shadow_config(Channel::Ch0, false);
    timer.primary_output_config(true);
    timer.auto_reload_shadow_enable();
    timer.enable();

    let mut duty: i32 = 0;
    let mut rising = true;
    loop {
        delay.delay_ms(STEP_MS);
        if rising {
            duty += STEP;
        } else {
            duty -= STEP;
        }
        if duty > i32::from(PERIOD) + 1 {
            rising = false;
        }
        if duty <= 0 {
            rising = true;
        }
        timer.channel_output_pulse_value_config(Channel::Ch0, duty.clamp(0, 500) as u16);
    }
}
