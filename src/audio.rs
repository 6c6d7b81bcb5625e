//! WAVE playback over I2S.
//!
//! The player owns the header parsed from an in-flash WAVE image and a read
//! cursor into its sample data. Every transmit-buffer-empty interrupt sends
//! one 16-bit sample; mono files send each sample twice so both channels
//! carry it. Playback loops at the end of the data.

use byteorder::{ByteOrder, LittleEndian};

use crate::gpio::{self, OutputType, Pin, Port, Speed};
use crate::rcu::{Clocks, Rcu};
use crate::spi::{
    Event, I2sClockPolarity, I2sFrameFormat, I2sMode, I2sStandard, InterruptFlag, Spi,
};
use crate::timer::{Channel, OcMode, OcParameters, Timer, TimerParameters};
use crate::wave::{self, WaveError, WaveFormat, CHANNEL_MONO};

/// I2S0 pins: CK, SD, WS
const I2S_CK: (Port, u8) = (Port::A, 5);
const I2S_SD: (Port, u8) = (Port::A, 7);
const I2S_WS: (Port, u8) = (Port::B, 0);
/// TIMER15_CH0
const MCK_OUT: (Port, u8) = (Port::A, 6);

const MCK_PERIOD: u16 = 41;
const MCK_PULSE: u16 = 21;

pub struct WavePlayer<'a> {
    file: &'a [u8],
    format: WaveFormat,
    /// Byte offset of the next sample from the start of the data
    index: usize,
    /// Right channel copy of the last mono sample
    held: Option<u16>,
}

impl<'a> WavePlayer<'a> {
    /// Parses the header of `file`.
    pub fn new(file: &'a [u8]) -> Result<Self, WaveError> {
        let format = wave::parse(file)?;
        Ok(WavePlayer {
            file,
            format,
            index: 0,
            held: None,
        })
    }

    pub fn format(&self) -> &WaveFormat {
        &self.format
    }

    /// Samples of the data chunk, clipped to the image
    fn data(&self) -> &'a [u8] {
        let start = self.format.data_offset.min(self.file.len());
        let end = start
            .saturating_add(self.format.data_size as usize)
            .min(self.file.len());
        &self.file[start..end]
    }

    /// Next 16-bit word for the I2S data register.
    pub fn next_sample(&mut self) -> u16 {
        if let Some(sample) = self.held.take() {
            return sample;
        }

        let data = self.data();
        if self.index + 2 > data.len() {
            self.index = 0;
            if data.len() < 2 {
                return 0;
            }
        }

        let sample = LittleEndian::read_u16(&data[self.index..]);
        self.index += 2;
        if self.format.channels == CHANNEL_MONO {
            self.held = Some(sample);
        }
        sample
    }

    /// Configures SPI0 as I2S master transmitter at the file's sample rate
    /// and enables the TBE interrupt. The I2S pins must be set up already.
    pub fn start(&mut self, spi: &mut Spi, clocks: &Clocks) {
        spi.i2s_psc_config(
            self.format.sample_rate,
            I2sFrameFormat::Dt16bCh16b,
            true,
            clocks.sys(),
        );
        spi.i2s_init(
            I2sMode::MasterTx,
            I2sStandard::Phillips,
            I2sClockPolarity::High,
        );
        spi.i2s_enable();
        spi.interrupt_enable(Event::Tbe);
        info!(
            "playing {=u32} bytes at {=u32} Hz",
            self.format.data_size,
            self.format.sample_rate
        );
    }

    /// Body of the SPI0 interrupt handler
    pub fn on_transmit_empty(&mut self, spi: &mut Spi) {
        if spi.interrupt_flag_get(InterruptFlag::Tbe) {
            let sample = self.next_sample();
            spi.data_transmit(sample);
        }
    }
}

/// Routes CK (PA5), SD (PA7) and WS (PB0) to I2S0.
pub fn i2s_gpio_config(rcu: &mut Rcu) {
    for (port, index) in [I2S_CK, I2S_SD, I2S_WS] {
        let pin = Pin::new(port, index);
        pin.enable_clock(rcu);
        pin.into_alternate(gpio::AF0, OutputType::PushPull, Speed::Level1);
    }
}

/// Drives PA6 with the PWM output of TIMER15 channel 0, standing in for
/// the I2S master clock on the codec.
pub fn mck_gpio_config(rcu: &mut Rcu) {
    let pin = Pin::new(MCK_OUT.0, MCK_OUT.1);
    pin.enable_clock(rcu);
    pin.into_alternate(gpio::AF5, OutputType::PushPull, Speed::Level1);
}

pub fn mck_timer_config<TIM>(timer: &mut Timer<TIM>) {
    timer.init(&TimerParameters {
        prescaler: 0,
        period: MCK_PERIOD,
        ..Default::default()
    });
    timer.channel_output_config(
        Channel::Ch0,
        &OcParameters {
            output_enable: true,
            ..Default::default()
        },
    );
    timer.channel_output_pulse_value_config(Channel::Ch0, MCK_PULSE);
    timer.channel_output_mode_config(Channel::Ch0, OcMode::Pwm0);
    timer.primary_output_config(true);
    timer.auto_reload_shadow_enable();
    timer.enable();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::{Instance, RegisterBlock as SpiRegs};
    use crate::testing::{fake_regs, peek, poke};
    use crate::timer::RegisterBlock as TimerRegs;
    use crate::wave::test_files::header;

    const CTL1: usize = 0x04;
    const STAT: usize = 0x08;
    const DATA: usize = 0x0C;
    const I2SCTL: usize = 0x1C;
    const I2SPSC: usize = 0x20;

    fn samples(words: &[u16]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn stereo_plays_in_order_and_wraps() {
        let file = header(2, 44_100, 16, &samples(&[1, 2, 3, 4]));
        let mut player = WavePlayer::new(&file).unwrap();

        let out: Vec<u16> = (0..6).map(|_| player.next_sample()).collect();
        assert_eq!(out, [1, 2, 3, 4, 1, 2]);
    }

    #[test]
    fn mono_sends_each_sample_twice() {
        let file = header(1, 8_000, 16, &samples(&[0x1234, 0xBEEF]));
        let mut player = WavePlayer::new(&file).unwrap();

        let out: Vec<u16> = (0..6).map(|_| player.next_sample()).collect();
        assert_eq!(out, [0x1234, 0x1234, 0xBEEF, 0xBEEF, 0x1234, 0x1234]);
    }

    #[test]
    fn data_size_beyond_image_is_clipped() {
        let mut file = header(2, 8_000, 16, &samples(&[7, 8]));
        // claims 100 bytes, three are present after trimming
        file[40..44].copy_from_slice(&100u32.to_le_bytes());
        file.pop();

        let mut player = WavePlayer::new(&file).unwrap();
        let out: Vec<u16> = (0..3).map(|_| player.next_sample()).collect();
        assert_eq!(out, [7, 7, 7]);
    }

    #[test]
    fn empty_data_sends_silence() {
        let file = header(2, 8_000, 16, &[]);
        let mut player = WavePlayer::new(&file).unwrap();
        assert_eq!(player.next_sample(), 0);
        assert_eq!(player.next_sample(), 0);
    }

    #[test]
    fn bad_header_is_reported() {
        let mut file = header(2, 8_000, 16, &[]);
        file[34] = 24;
        assert!(matches!(
            WavePlayer::new(&file),
            Err(WaveError::UnsupportedBitsPerSample)
        ));
    }

    #[test]
    fn start_configures_i2s_master_tx() {
        let regs = fake_regs::<SpiRegs>();
        let mut spi = Spi::with_regs(regs, Instance::Spi0);
        let clocks = Clocks::new(48_000_000, 48_000_000, 48_000_000);
        let file = header(1, 8_000, 16, &samples(&[5]));
        let mut player = WavePlayer::new(&file).unwrap();

        player.start(&mut spi, &clocks);

        // 48 MHz / 256 / 8 kHz = 23.4 -> DIV 11, odd, MCK out
        assert_eq!(peek(regs, I2SPSC), 11 | (1 << 8) | (1 << 9));
        // I2SSEL, I2SEN, master TX, Philips, CKPL high, 16/16
        assert_eq!(peek(regs, I2SCTL), (1 << 11) | (1 << 10) | (2 << 8) | (1 << 3));
        assert_eq!(peek(regs, CTL1), 1 << 7);

        // no TBE yet
        player.on_transmit_empty(&mut spi);
        assert_eq!(peek(regs, DATA), 0);

        poke(regs, STAT, 1 << 1);
        player.on_transmit_empty(&mut spi);
        assert_eq!(peek(regs, DATA), 5);
    }

    #[test]
    fn mck_timer_runs_pwm0() {
        let regs = fake_regs::<TimerRegs>();
        let clocks = Clocks::new(48_000_000, 48_000_000, 48_000_000);
        let mut timer = Timer::with_regs((), regs, clocks);

        mck_timer_config(&mut timer);

        assert_eq!(peek(regs, 0x2C), u32::from(MCK_PERIOD));
        assert_eq!(peek(regs, 0x34), u32::from(MCK_PULSE));
        assert_eq!(peek(regs, 0x18), 6 << 4);
        assert_eq!(peek(regs, 0x20), 1);
        assert_eq!(peek(regs, 0x44), 1 << 15);
        assert_eq!(peek(regs, 0x00), (1 << 7) | 1);
    }
}
