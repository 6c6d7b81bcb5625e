//! RTC calendar on IRC32K. The date and time are printed on the console
//! every second; holding the wakeup key sets the calendar to a fixed date.
#![no_main]
#![no_std]

use core::fmt::Write;

use cortex_m_rt::entry;
use embedded_hal::blocking::delay::DelayMs;
use gd32c2x1_bsp::board::eval::{self, Key, Led};
use gd32c2x1_bsp::board;
use gd32c2x1_bsp::delay::Delay;
use gd32c2x1_bsp::pac;
use gd32c2x1_bsp::pmu::Pmu;
use gd32c2x1_bsp::rcu::{Oscillator, Periph, Rcu, RtcClockSource};
use gd32c2x1_bsp::rtc::{self, AmPm, DisplayFormat, Rtc, RtcParameters, Weekday};
use heapless::String;

/// ck_spre = 32 kHz / (0x63 + 1) / (0x13F + 1) = 1 Hz
const PRESCALER_ASYN: u8 = 0x63;
const PRESCALER_SYN: u16 = 0x13F;

const DEBOUNCE_MS: u16 = 50;

/// 2024-09-13, Friday, 12:00:00
const PRESET: RtcParameters = RtcParameters {
    year: 0x24,
    month: rtc::SEP,
    date: 0x13,
    day_of_week: Weekday::Friday,
    hour: 0x12,
    minute: 0x00,
    second: 0x00,
    factor_asyn: PRESCALER_ASYN,
    factor_syn: PRESCALER_SYN,
    am_pm: AmPm::Am,
    display_format: DisplayFormat::Hour24,
};

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    let mut rcu = Rcu::new(dp.RCU);
    let clocks = rcu.clocks();
    let mut delay = Delay::new(cp.SYST, &clocks);
    let mut com = eval::com_init(dp.USART0, &mut rcu, &clocks);

    for led in Led::ALL {
        board::led_init(led, &mut rcu);
    }
    board::key_init(Key::Wakeup, &mut rcu);

    eval::leds_set(true);
    delay.delay_ms(500u16);
    eval::leds_set(false);

    rcu.enable(Periph::Pmu);
    let mut pmu = Pmu::new(dp.PMU);
    pmu.backup_write_enable();

    rcu.osc_on(Oscillator::Irc32k);
    if let Err(e) = rcu.osc_stab_wait(Oscillator::Irc32k) {
        defmt::error!("{}", e);
        com.write_str("RCU_IRC32K rcu_osci_stab_wait timeout! \r\n");
        loop {
            cortex_m::asm::nop();
        }
    }
    rcu.rtc_clock_config(RtcClockSource::Irc32k);
    rcu.enable(Periph::Rtc);

    let mut rtc = Rtc::new(dp.RTC);
    if rtc.register_sync_wait().is_err() {
        com.write_str("RTC register sync timeout \r\n");
    }

    com.write_str("\r\n /**** RTC Calendar Demo ****/\r\n");
    com.write_str(" hold the wakeup key to set the date \r\n");

    let mut last_second = None;
    loop {
        if key_held(&mut delay) {
            if rtc.init(&PRESET).is_ok() {
                com.write_str(" calendar set \r\n");
            } else {
                com.write_str(" calendar setup failed \r\n");
            }
        }

        let now = rtc.current_time_get();
        if last_second != Some(now.second) {
            last_second = Some(now.second);

            let mut line: String<64> = String::new();
            let _ = write!(
                line,
                " 20{:02}-{:02}-{:02} {:02}:{:02}:{:02}",
                rtc::bcd_to_dec(now.year),
                rtc::bcd_to_dec(now.month),
                rtc::bcd_to_dec(now.date),
                rtc::bcd_to_dec(now.hour),
                rtc::bcd_to_dec(now.minute),
                rtc::bcd_to_dec(now.second),
            );
            com.println(&line);
        }

        delay.delay_ms(DEBOUNCE_MS);
    }
}

/// Wakeup key high on three samples 50 ms apart
fn key_held(delay: &mut Delay) -> bool {
    for _ in 0..2 {
        if !board::key_state_get(Key::Wakeup) {
            return false;
        }
        delay.delay_ms(DEBOUNCE_MS);
    }
    board::key_state_get(Key::Wakeup)
}
