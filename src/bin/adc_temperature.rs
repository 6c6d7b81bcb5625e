//! Samples the internal temperature sensor and Vrefint through the inserted
//! group once a second and prints them on the console.
#![no_main]
#![no_std]

use core::fmt::Write;

use cortex_m_rt::entry;
use embedded_hal::blocking::delay::DelayMs;
use gd32c2x1_bsp::adc::{self, Adc, Align, InsertedTrigger, InternalChannel, SampleTime, SpecialFunction};
use gd32c2x1_bsp::board::eval;
use gd32c2x1_bsp::delay::Delay;
use gd32c2x1_bsp::pac;
use gd32c2x1_bsp::rcu::{AdcClockDiv, AdcClockSource, Periph, Rcu};

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    let mut rcu = Rcu::new(dp.RCU);
    let clocks = rcu.clocks();
    let mut delay = Delay::new(cp.SYST, &clocks);

    rcu.enable(Periph::Adc);
    rcu.adc_clock_config(AdcClockSource::CkSys, AdcClockDiv::Div256);

    let mut adc = Adc::new(dp.ADC);
    adc.special_function_config(SpecialFunction::Continuous, false);
    adc.special_function_config(SpecialFunction::Scan, true);
    adc.data_alignment_config(Align::Right);
    adc.inserted_length_config(2);
    adc.inserted_channel_config(0, adc::CHANNEL_TEMPSENSOR, SampleTime::Cycles160_5);
    adc.inserted_channel_config(1, adc::CHANNEL_VREFINT, SampleTime::Cycles160_5);
    adc.inserted_trigger_source_config(InsertedTrigger::None);
    adc.inserted_trigger_enable(true);
    adc.internal_channel_config(InternalChannel::TempSensor, true);
    adc.internal_channel_config(InternalChannel::Vrefint, true);
    adc.enable();
    delay.delay_ms(1u32);

    let mut com = eval::com_init(dp.USART0, &mut rcu, &clocks);
    com.write_str("\r /**** ADC Demo ****/\r\n");

    loop {
        let [temp_raw, vref_raw, ..] = adc.convert_inserted();
        delay.delay_ms(1000u32);

        let temperature = adc::temperature_celsius(temp_raw);
        let vref = adc::voltage(vref_raw);
        defmt::debug!("raw temp {=u16} vref {=u16}", temp_raw, vref_raw);

        let _ = write!(
            com,
            "\r\n *******************\
             \r\n the temperature data is {:2.0} degrees Celsius\
             \r\n the reference voltage data is {:5.3}V\
             \r\n ******************* \r\n",
            temperature, vref
        );
    }
}
