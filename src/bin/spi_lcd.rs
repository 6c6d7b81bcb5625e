//! Draws colour bars and a diagonal on the EVAL board TFT over SPI0.
#![no_main]
#![no_std]

use cortex_m_rt::entry;
use gd32c2x1_bsp::delay::Delay;
use gd32c2x1_bsp::gpio::{self, OutputType, Pin, Port, Speed};
use gd32c2x1_bsp::lcd::{self, Lcd};
use gd32c2x1_bsp::pac;
use gd32c2x1_bsp::rcu::{Periph, Rcu};
use gd32c2x1_bsp::spi::{DeviceMode, Nss, Prescaler, Spi, SpiConfig};

const BARS: [u16; 6] = [
    lcd::RED,
    lcd::GREEN,
    lcd::BLUE,
    lcd::YELLOW,
    lcd::GRAY1,
    lcd::WHITE,
];

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    let mut rcu = Rcu::new(dp.RCU);
    let clocks = rcu.clocks();
    let mut delay = Delay::new(cp.SYST, &clocks);

    // SCK, MISO, MOSI
    for index in [5, 6, 7] {
        let pin = Pin::new(Port::A, index);
        pin.enable_clock(&mut rcu);
        pin.into_alternate(gpio::AF0, OutputType::PushPull, Speed::Level3);
    }
    let cs = Pin::new(Port::A, 8);
    let rs = Pin::new(Port::C, 7);
    let rst = Pin::new(Port::C, 6);
    cs.enable_clock(&mut rcu);
    rs.enable_clock(&mut rcu);

    rcu.enable(Periph::Spi0);
    let mut spi = Spi::spi0(dp.SPI0);
    if let Err(e) = spi.init(&SpiConfig {
        device_mode: DeviceMode::Master,
        nss: Nss::Soft,
        prescaler: Prescaler::Div2,
        ..Default::default()
    }) {
        defmt::error!("spi0 setup: {}", e);
    }
    spi.enable();

    let mut lcd = Lcd::new(
        spi,
        cs.into_push_pull_output(Speed::Level3),
        rs.into_push_pull_output(Speed::Level3),
        rst.into_push_pull_output(Speed::Level3),
    );

    if let Err(e) = draw(&mut lcd, &mut delay) {
        defmt::error!("lcd: {}", e);
    }

    loop {
        cortex_m::asm::wfi();
    }
}

fn draw<SPI, CS, RS, RST, E>(
    lcd: &mut Lcd<SPI, CS, RS, RST>,
    delay: &mut Delay,
) -> Result<(), lcd::Error<E>>
where
    SPI: embedded_hal::blocking::spi::Write<u8, Error = E>,
    CS: embedded_hal::digital::v2::OutputPin,
    RS: embedded_hal::digital::v2::OutputPin,
    RST: embedded_hal::digital::v2::OutputPin,
{
    lcd.init(delay)?;
    lcd.clear(lcd::BLACK)?;

    let bar = lcd::HEIGHT / BARS.len() as u16;
    for (i, color) in BARS.iter().enumerate() {
        let y0 = i as u16 * bar;
        lcd.fill_region(0, y0, lcd::WIDTH - 1, y0 + bar - 1, *color)?;
    }

    for i in 0..lcd::WIDTH {
        lcd.draw_point(i, i, lcd::BLACK)?;
    }
    defmt::info!("lcd demo drawn");
    Ok(())
}
