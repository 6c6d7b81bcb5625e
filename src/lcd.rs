//! 240x320 RGB565 TFT panel on SPI (MIPI-DCS command set).
//!
//! The panel takes commands with RS low and parameters/pixels with RS high,
//! both framed by CS. Pixels are sent big-endian.

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::spi::Write;
use embedded_hal::digital::v2::OutputPin;

pub const RED: u16 = 0xF800;
pub const GREEN: u16 = 0x07E0;
pub const BLUE: u16 = 0x001F;
pub const WHITE: u16 = 0xFFFF;
pub const BLACK: u16 = 0x0000;
pub const YELLOW: u16 = 0xFFE0;
pub const GRAY0: u16 = 0xEF7D;
pub const GRAY1: u16 = 0x8410;
pub const GRAY2: u16 = 0x4208;

pub const WIDTH: u16 = 240;
pub const HEIGHT: u16 = 320;

const SLPOUT: u8 = 0x11;
const DISPON: u8 = 0x29;
const CASET: u8 = 0x2A;
const RASET: u8 = 0x2B;
const RAMWR: u8 = 0x2C;
const MADCTL: u8 = 0x36;
const COLMOD: u8 = 0x3A;

/// 16 bits per pixel on the MCU interface
const COLMOD_RGB565: u8 = 0x55;
/// Portrait, RGB order
const MADCTL_PORTRAIT: u8 = 0x00;

/// Pixels per SPI write when filling
const FILL_CHUNK: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    Spi(E),
    /// A control line could not be driven
    Pin,
}

pub struct Lcd<SPI, CS, RS, RST> {
    spi: SPI,
    cs: CS,
    rs: RS,
    rst: RST,
}

impl<SPI, CS, RS, RST, E> Lcd<SPI, CS, RS, RST>
where
    SPI: Write<u8, Error = E>,
    CS: OutputPin,
    RS: OutputPin,
    RST: OutputPin,
{
    pub fn new(spi: SPI, cs: CS, rs: RS, rst: RST) -> Self {
        Lcd { spi, cs, rs, rst }
    }

    /// Hardware reset followed by sleep out, 16 bpp and display on.
    pub fn init<D: DelayMs<u16>>(&mut self, delay: &mut D) -> Result<(), Error<E>> {
        self.cs.set_high().map_err(|_| Error::Pin)?;
        self.rst.set_low().map_err(|_| Error::Pin)?;
        delay.delay_ms(100);
        self.rst.set_high().map_err(|_| Error::Pin)?;
        delay.delay_ms(50);

        self.write_command(SLPOUT)?;
        delay.delay_ms(120);
        self.write_command(COLMOD)?;
        self.write_data(&[COLMOD_RGB565])?;
        self.write_command(MADCTL)?;
        self.write_data(&[MADCTL_PORTRAIT])?;
        self.write_command(DISPON)?;
        debug!("lcd ready");
        Ok(())
    }

    fn transfer(&mut self, command: bool, bytes: &[u8]) -> Result<(), Error<E>> {
        self.cs.set_low().map_err(|_| Error::Pin)?;
        if command {
            self.rs.set_low().map_err(|_| Error::Pin)?;
        } else {
            self.rs.set_high().map_err(|_| Error::Pin)?;
        }
        let res = self.spi.write(bytes).map_err(Error::Spi);
        self.cs.set_high().map_err(|_| Error::Pin)?;
        res
    }

    pub fn write_command(&mut self, cmd: u8) -> Result<(), Error<E>> {
        self.transfer(true, &[cmd])
    }

    pub fn write_data(&mut self, data: &[u8]) -> Result<(), Error<E>> {
        self.transfer(false, data)
    }

    /// Opens a drawing window; following pixel data fills it row by row.
    pub fn set_region(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<(), Error<E>> {
        let [x0h, x0l] = x0.to_be_bytes();
        let [x1h, x1l] = x1.to_be_bytes();
        let [y0h, y0l] = y0.to_be_bytes();
        let [y1h, y1l] = y1.to_be_bytes();

        self.write_command(CASET)?;
        self.write_data(&[x0h, x0l, x1h, x1l])?;
        self.write_command(RASET)?;
        self.write_data(&[y0h, y0l, y1h, y1l])?;
        self.write_command(RAMWR)
    }

    pub fn set_xy(&mut self, x: u16, y: u16) -> Result<(), Error<E>> {
        self.set_region(x, y, x, y)
    }

    pub fn draw_point(&mut self, x: u16, y: u16, color: u16) -> Result<(), Error<E>> {
        self.set_xy(x, y)?;
        self.write_data(&color.to_be_bytes())
    }

    /// Fills the inclusive rectangle with one colour
    pub fn fill_region(
        &mut self,
        x0: u16,
        y0: u16,
        x1: u16,
        y1: u16,
        color: u16,
    ) -> Result<(), Error<E>> {
        self.set_region(x0, y0, x1, y1)?;

        let mut buf = [0u8; FILL_CHUNK * 2];
        for px in buf.chunks_exact_mut(2) {
            px.copy_from_slice(&color.to_be_bytes());
        }

        let mut remaining =
            (usize::from(x1.saturating_sub(x0)) + 1) * (usize::from(y1.saturating_sub(y0)) + 1);
        while remaining > 0 {
            let n = remaining.min(FILL_CHUNK);
            self.write_data(&buf[..n * 2])?;
            remaining -= n;
        }
        Ok(())
    }

    pub fn clear(&mut self, color: u16) -> Result<(), Error<E>> {
        self.fill_region(0, 0, WIDTH - 1, HEIGHT - 1, color)
    }

    /// Gives back the bus and the control lines
    pub fn release(self) -> (SPI, CS, RS, RST) {
        (self.spi, self.cs, self.rs, self.rst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal_mock::delay::MockNoop;
    use embedded_hal_mock::spi::{Mock as SpiMock, Transaction};

    struct NoopPin;

    impl OutputPin for NoopPin {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    fn lcd(expectations: &[Transaction]) -> Lcd<SpiMock, NoopPin, NoopPin, NoopPin> {
        Lcd::new(SpiMock::new(expectations), NoopPin, NoopPin, NoopPin)
    }

    fn region(x0: u8, y0: u8, x1: u8, y1: u8) -> Vec<Transaction> {
        vec![
            Transaction::write(vec![CASET]),
            Transaction::write(vec![0, x0, 0, x1]),
            Transaction::write(vec![RASET]),
            Transaction::write(vec![0, y0, 0, y1]),
            Transaction::write(vec![RAMWR]),
        ]
    }

    #[test]
    fn init_sequence() {
        let mut lcd = lcd(&[
            Transaction::write(vec![SLPOUT]),
            Transaction::write(vec![COLMOD]),
            Transaction::write(vec![0x55]),
            Transaction::write(vec![MADCTL]),
            Transaction::write(vec![0x00]),
            Transaction::write(vec![DISPON]),
        ]);

        lcd.init(&mut MockNoop::new()).unwrap();
        lcd.release().0.done();
    }

    #[test]
    fn draw_point_sends_pixel_big_endian() {
        let mut expected = region(10, 20, 10, 20);
        expected.push(Transaction::write(vec![0xF8, 0x00]));
        let mut lcd = lcd(&expected);

        lcd.draw_point(10, 20, RED).unwrap();
        lcd.release().0.done();
    }

    #[test]
    fn region_coordinates_above_255() {
        let mut lcd = lcd(&[
            Transaction::write(vec![CASET]),
            Transaction::write(vec![0, 0, 0, 239]),
            Transaction::write(vec![RASET]),
            Transaction::write(vec![0x01, 0x00, 0x01, 0x3F]),
            Transaction::write(vec![RAMWR]),
        ]);

        lcd.set_region(0, 256, 239, 319).unwrap();
        lcd.release().0.done();
    }

    #[test]
    fn fill_is_chunked() {
        // 6 x 6 = 36 pixels: one full chunk and 4 more
        let mut expected = region(0, 0, 5, 5);
        expected.push(Transaction::write([0x00, 0x1F].repeat(32)));
        expected.push(Transaction::write([0x00, 0x1F].repeat(4)));
        let mut lcd = lcd(&expected);

        lcd.fill_region(0, 0, 5, 5, BLUE).unwrap();
        lcd.release().0.done();
    }
}
