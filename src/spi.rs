//! Serial peripheral interface (SPI) and its I2S mode.
//!
//! SPI0 has a fixed 8/16-bit frame (FF16) and doubles as the I2S
//! interface. SPI1 has a 4..16-bit data size field, a FIFO, and quad mode.

use core::fmt;

use embedded_hal::spi::{self as hal_spi, FullDuplex, Phase, Polarity};
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

use crate::pac;
use crate::rcu::{Periph, Rcu};
use crate::static_ref::StaticRef;

register_structs! {
    pub RegisterBlock {
        (0x00 => ctl0: ReadWrite<u32, CTL0::Register>),
        (0x04 => ctl1: ReadWrite<u32, CTL1::Register>),
        (0x08 => stat: ReadWrite<u32, STAT::Register>),
        (0x0C => data: ReadWrite<u32>),
        (0x10 => crcpoly: ReadWrite<u32>),
        (0x14 => rcrc: ReadWrite<u32>),
        (0x18 => tcrc: ReadWrite<u32>),
        (0x1C => i2sctl: ReadWrite<u32, I2SCTL::Register>),
        (0x20 => i2spsc: ReadWrite<u32, I2SPSC::Register>),
        (0x24 => _reserved0),
        (0x80 => qctl: ReadWrite<u32, QCTL::Register>),
        (0x84 => @END),
    }
}

register_bitfields![u32,
    CTL0 [
        CKPH OFFSET(0) NUMBITS(1) [],
        CKPL OFFSET(1) NUMBITS(1) [],
        MSTMOD OFFSET(2) NUMBITS(1) [],
        PSC OFFSET(3) NUMBITS(3) [],
        SPIEN OFFSET(6) NUMBITS(1) [],
        LF OFFSET(7) NUMBITS(1) [],
        SWNSS OFFSET(8) NUMBITS(1) [],
        SWNSSEN OFFSET(9) NUMBITS(1) [],
        RO OFFSET(10) NUMBITS(1) [],
        /// SPI0: 16-bit frame. SPI1: 16-bit CRC.
        FF16_CRCL OFFSET(11) NUMBITS(1) [],
        CRCNT OFFSET(12) NUMBITS(1) [],
        CRCEN OFFSET(13) NUMBITS(1) [],
        BDOEN OFFSET(14) NUMBITS(1) [],
        BDEN OFFSET(15) NUMBITS(1) []
    ],
    CTL1 [
        DMAREN OFFSET(0) NUMBITS(1) [],
        DMATEN OFFSET(1) NUMBITS(1) [],
        NSSDRV OFFSET(2) NUMBITS(1) [],
        NSSP OFFSET(3) NUMBITS(1) [],
        TMOD OFFSET(4) NUMBITS(1) [],
        ERRIE OFFSET(5) NUMBITS(1) [],
        RBNEIE OFFSET(6) NUMBITS(1) [],
        TBEIE OFFSET(7) NUMBITS(1) [],
        DZ OFFSET(8) NUMBITS(4) [],
        BYTEN OFFSET(12) NUMBITS(1) [],
        RXDMA_ODD OFFSET(13) NUMBITS(1) [],
        TXDMA_ODD OFFSET(14) NUMBITS(1) []
    ],
    STAT [
        RBNE OFFSET(0) NUMBITS(1) [],
        TBE OFFSET(1) NUMBITS(1) [],
        I2SCH OFFSET(2) NUMBITS(1) [],
        TXURERR OFFSET(3) NUMBITS(1) [],
        CRCERR OFFSET(4) NUMBITS(1) [],
        CONFERR OFFSET(5) NUMBITS(1) [],
        RXORERR OFFSET(6) NUMBITS(1) [],
        TRANS OFFSET(7) NUMBITS(1) [],
        FERR OFFSET(8) NUMBITS(1) [],
        RXLVL OFFSET(9) NUMBITS(2) [],
        TXLVL OFFSET(11) NUMBITS(2) []
    ],
    I2SCTL [
        CHLEN OFFSET(0) NUMBITS(1) [],
        DTLEN OFFSET(1) NUMBITS(2) [],
        CKPL OFFSET(3) NUMBITS(1) [],
        I2SSTD OFFSET(4) NUMBITS(2) [],
        PCMSMOD OFFSET(7) NUMBITS(1) [],
        I2SOPMOD OFFSET(8) NUMBITS(2) [],
        I2SEN OFFSET(10) NUMBITS(1) [],
        I2SSEL OFFSET(11) NUMBITS(1) []
    ],
    I2SPSC [
        DIV OFFSET(0) NUMBITS(8) [],
        OF OFFSET(8) NUMBITS(1) [],
        MCKOEN OFFSET(9) NUMBITS(1) []
    ],
    QCTL [
        QMOD OFFSET(0) NUMBITS(1) [],
        QRD OFFSET(1) NUMBITS(1) [],
        IO23_DRV OFFSET(2) NUMBITS(1) []
    ]
];

/// SPI errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// SPI0 only supports 8- and 16-bit frames
    FrameSize,
    /// The operation only exists on SPI1
    Unsupported,
    /// Reception overrun
    Overrun,
    /// Configuration error, e.g. NSS pulled low while master
    ModeFault,
    /// CRC mismatch
    Crc,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::FrameSize => "frame size not supported by this SPI",
            Error::Unsupported => "operation not supported by this SPI",
            Error::Overrun => "receive overrun",
            Error::ModeFault => "configuration error",
            Error::Crc => "CRC error",
        };
        f.write_str(msg)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Instance {
    Spi0,
    Spi1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceMode {
    Master,
    Slave,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransMode {
    FullDuplex,
    ReceiveOnly,
    BidirectionalReceive,
    BidirectionalTransmit,
}

/// Data frame size. The discriminant is the CTL1 DZ encoding (bits - 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameSize {
    Bits4 = 3,
    Bits5 = 4,
    Bits6 = 5,
    Bits7 = 6,
    Bits8 = 7,
    Bits9 = 8,
    Bits10 = 9,
    Bits11 = 10,
    Bits12 = 11,
    Bits13 = 12,
    Bits14 = 13,
    Bits15 = 14,
    Bits16 = 15,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Nss {
    /// NSS level comes from the SWNSS bit
    Soft,
    /// NSS level comes from the pin
    Hard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endian {
    MsbFirst,
    LsbFirst,
}

/// PCLK divider for the master clock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    Div2 = 0,
    Div4 = 1,
    Div8 = 2,
    Div16 = 3,
    Div32 = 4,
    Div64 = 5,
    Div128 = 6,
    Div256 = 7,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SpiConfig {
    pub device_mode: DeviceMode,
    pub trans_mode: TransMode,
    pub frame_size: FrameSize,
    pub nss: Nss,
    pub endian: Endian,
    pub mode: hal_spi::Mode,
    pub prescaler: Prescaler,
}

impl Default for SpiConfig {
    fn default() -> Self {
        SpiConfig {
            device_mode: DeviceMode::Slave,
            trans_mode: TransMode::FullDuplex,
            frame_size: FrameSize::Bits8,
            nss: Nss::Hard,
            endian: Endian::MsbFirst,
            mode: hal_spi::MODE_0,
            prescaler: Prescaler::Div2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Transmit,
    Receive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dma {
    Transmit,
    Receive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CrcLength {
    Bits8,
    Bits16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Crc {
    Tx,
    Rx,
}

/// Width of CPU accesses to the SPI1 FIFO
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoAccess {
    HalfWord,
    Byte,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoLevel {
    Empty = 0,
    QuarterFull = 1,
    HalfFull = 2,
    Full = 3,
}

impl FifoLevel {
    fn from_bits(bits: u32) -> FifoLevel {
        match bits & 0x3 {
            0 => FifoLevel::Empty,
            1 => FifoLevel::QuarterFull,
            2 => FifoLevel::HalfFull,
            _ => FifoLevel::Full,
        }
    }
}

/// Status flags
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Flag {
    Rbne,
    Tbe,
    /// I2S channel side, set for the right channel
    I2sChannel,
    TxUnderrun,
    CrcError,
    ConfigError,
    RxOverrun,
    Trans,
    FormatError,
}

impl Flag {
    fn mask(self) -> u32 {
        let bit = match self {
            Flag::Rbne => 0,
            Flag::Tbe => 1,
            Flag::I2sChannel => 2,
            Flag::TxUnderrun => 3,
            Flag::CrcError => 4,
            Flag::ConfigError => 5,
            Flag::RxOverrun => 6,
            Flag::Trans => 7,
            Flag::FormatError => 8,
        };
        1 << bit
    }
}

/// Interrupt sources
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    Tbe,
    Rbne,
    Error,
}

/// Interrupt flags: a status flag whose interrupt is enabled
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptFlag {
    Tbe,
    Rbne,
    RxOverrun,
    ConfigError,
    CrcError,
    FormatError,
    TxUnderrun,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2sMode {
    SlaveTx = 0,
    SlaveRx = 1,
    MasterTx = 2,
    MasterRx = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2sStandard {
    Phillips,
    Msb,
    Lsb,
    PcmShort,
    PcmLong,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2sClockPolarity {
    Low,
    High,
}

/// Data length / channel length
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2sFrameFormat {
    Dt16bCh16b,
    Dt16bCh32b,
    Dt24bCh32b,
    Dt32bCh32b,
}

impl I2sFrameFormat {
    fn dtlen_chlen(self) -> (u32, u32) {
        match self {
            I2sFrameFormat::Dt16bCh16b => (0, 0),
            I2sFrameFormat::Dt16bCh32b => (0, 1),
            I2sFrameFormat::Dt24bCh32b => (1, 1),
            I2sFrameFormat::Dt32bCh32b => (2, 1),
        }
    }
}

/// I2S prescaler for a sample rate: the DIV field and the odd bit.
///
/// The computation is carried out in tenths and rounded. When DIV falls
/// outside 2..=255 the prescaler falls back to DIV = 2 with no odd bit.
pub fn i2s_prescaler(
    i2s_clock: u32,
    sample_rate: u32,
    format: I2sFrameFormat,
    mck_out: bool,
) -> (u8, bool) {
    const FALLBACK: (u8, bool) = (2, false);

    if sample_rate == 0 {
        return FALLBACK;
    }

    let clks = if mck_out {
        ((i2s_clock / 256) * 10) / sample_rate
    } else if format == I2sFrameFormat::Dt16bCh16b {
        ((i2s_clock / 32) * 10) / sample_rate
    } else {
        ((i2s_clock / 64) * 10) / sample_rate
    };

    let clks = (clks + 5) / 10;
    let odd = clks & 0x01;
    let div = (clks - odd) / 2;

    match u8::try_from(div) {
        Ok(div) if div >= 2 => (div, odd == 1),
        _ => FALLBACK,
    }
}

pub struct Spi {
    regs: StaticRef<RegisterBlock>,
    instance: Instance,
}

impl Spi {
    pub fn spi0(_spi: pac::SPI0) -> Self {
        Spi {
            regs: pac::SPI0::regs(),
            instance: Instance::Spi0,
        }
    }

    pub fn spi1(_spi: pac::SPI1) -> Self {
        Spi {
            regs: pac::SPI1::regs(),
            instance: Instance::Spi1,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_regs(regs: StaticRef<RegisterBlock>, instance: Instance) -> Self {
        Spi { regs, instance }
    }

    pub fn instance(&self) -> Instance {
        self.instance
    }

    /// Resets the peripheral through the RCU
    pub fn deinit(&mut self, rcu: &mut Rcu) {
        rcu.reset(match self.instance {
            Instance::Spi0 => Periph::Spi0,
            Instance::Spi1 => Periph::Spi1,
        });
    }

    /// Configures the SPI mode. SPIEN, CRCNT and CRCEN are preserved; the I2S
    /// mode is switched off.
    pub fn init(&mut self, config: &SpiConfig) -> Result<(), Error> {
        let frame = match self.instance {
            Instance::Spi0 => match config.frame_size {
                FrameSize::Bits8 => CTL0::FF16_CRCL::CLEAR,
                FrameSize::Bits16 => CTL0::FF16_CRCL::SET,
                _ => return Err(Error::FrameSize),
            },
            Instance::Spi1 => CTL0::FF16_CRCL::CLEAR,
        };

        let device = match config.device_mode {
            DeviceMode::Master => CTL0::MSTMOD::SET + CTL0::SWNSS::SET,
            DeviceMode::Slave => CTL0::MSTMOD::CLEAR + CTL0::SWNSS::CLEAR,
        };

        let trans = match config.trans_mode {
            TransMode::FullDuplex => CTL0::RO::CLEAR + CTL0::BDEN::CLEAR + CTL0::BDOEN::CLEAR,
            TransMode::ReceiveOnly => CTL0::RO::SET + CTL0::BDEN::CLEAR + CTL0::BDOEN::CLEAR,
            TransMode::BidirectionalReceive => {
                CTL0::RO::CLEAR + CTL0::BDEN::SET + CTL0::BDOEN::CLEAR
            }
            TransMode::BidirectionalTransmit => {
                CTL0::RO::CLEAR + CTL0::BDEN::SET + CTL0::BDOEN::SET
            }
        };

        let nss = match config.nss {
            Nss::Soft => CTL0::SWNSSEN::SET,
            Nss::Hard => CTL0::SWNSSEN::CLEAR,
        };

        let endian = match config.endian {
            Endian::MsbFirst => CTL0::LF::CLEAR,
            Endian::LsbFirst => CTL0::LF::SET,
        };

        let polarity = match config.mode.polarity {
            Polarity::IdleLow => CTL0::CKPL::CLEAR,
            Polarity::IdleHigh => CTL0::CKPL::SET,
        };

        let phase = match config.mode.phase {
            Phase::CaptureOnFirstTransition => CTL0::CKPH::CLEAR,
            Phase::CaptureOnSecondTransition => CTL0::CKPH::SET,
        };

        self.regs.ctl0.modify(
            device
                + trans
                + nss
                + endian
                + polarity
                + phase
                + frame
                + CTL0::PSC.val(config.prescaler as u32),
        );

        if self.instance == Instance::Spi1 {
            self.regs
                .ctl1
                .modify(CTL1::DZ.val(config.frame_size as u32));
        }

        self.regs.i2sctl.modify(I2SCTL::I2SSEL::CLEAR);

        Ok(())
    }

    pub fn enable(&mut self) {
        self.regs.ctl0.modify(CTL0::SPIEN::SET);
    }

    pub fn disable(&mut self) {
        self.regs.ctl0.modify(CTL0::SPIEN::CLEAR);
    }

    /// Selects I2S mode with the operation mode, standard and idle clock
    /// level. Data and channel length are left to `i2s_psc_config`.
    pub fn i2s_init(&mut self, mode: I2sMode, standard: I2sStandard, ckpl: I2sClockPolarity) {
        let (std, pcm_long) = match standard {
            I2sStandard::Phillips => (0, false),
            I2sStandard::Msb => (1, false),
            I2sStandard::Lsb => (2, false),
            I2sStandard::PcmShort => (3, false),
            I2sStandard::PcmLong => (3, true),
        };
        let pcmsmod = if pcm_long {
            I2SCTL::PCMSMOD::SET
        } else {
            I2SCTL::PCMSMOD::CLEAR
        };
        let ckpl = match ckpl {
            I2sClockPolarity::Low => I2SCTL::CKPL::CLEAR,
            I2sClockPolarity::High => I2SCTL::CKPL::SET,
        };

        self.regs.i2sctl.modify(
            I2SCTL::I2SSEL::SET
                + I2SCTL::I2SOPMOD.val(mode as u32)
                + I2SCTL::I2SSTD.val(std)
                + pcmsmod
                + ckpl,
        );
    }

    /// Programs the I2S prescaler for `sample_rate` from `i2s_clock`
    /// (CK_SYS) and sets the frame format.
    pub fn i2s_psc_config(
        &mut self,
        sample_rate: u32,
        format: I2sFrameFormat,
        mck_out: bool,
        i2s_clock: u32,
    ) {
        let (div, odd) = i2s_prescaler(i2s_clock, sample_rate, format, mck_out);
        debug!("i2s prescaler div={=u8} odd={=bool}", div, odd);

        let mut psc = I2SPSC::DIV.val(u32::from(div));
        if odd {
            psc += I2SPSC::OF::SET;
        }
        if mck_out {
            psc += I2SPSC::MCKOEN::SET;
        }
        self.regs.i2spsc.write(psc);

        let (dtlen, chlen) = format.dtlen_chlen();
        self.regs
            .i2sctl
            .modify(I2SCTL::DTLEN.val(dtlen) + I2SCTL::CHLEN.val(chlen));
    }

    pub fn i2s_enable(&mut self) {
        self.regs.i2sctl.modify(I2SCTL::I2SEN::SET);
    }

    pub fn i2s_disable(&mut self) {
        self.regs.i2sctl.modify(I2SCTL::I2SEN::CLEAR);
    }

    pub fn nss_output_enable(&mut self) {
        self.regs.ctl1.modify(CTL1::NSSDRV::SET);
    }

    pub fn nss_output_disable(&mut self) {
        self.regs.ctl1.modify(CTL1::NSSDRV::CLEAR);
    }

    pub fn nss_internal_high(&mut self) {
        self.regs.ctl0.modify(CTL0::SWNSS::SET);
    }

    pub fn nss_internal_low(&mut self) {
        self.regs.ctl0.modify(CTL0::SWNSS::CLEAR);
    }

    pub fn dma_enable(&mut self, dma: Dma) {
        match dma {
            Dma::Transmit => self.regs.ctl1.modify(CTL1::DMATEN::SET),
            Dma::Receive => self.regs.ctl1.modify(CTL1::DMAREN::SET),
        }
    }

    pub fn dma_disable(&mut self, dma: Dma) {
        match dma {
            Dma::Transmit => self.regs.ctl1.modify(CTL1::DMATEN::CLEAR),
            Dma::Receive => self.regs.ctl1.modify(CTL1::DMAREN::CLEAR),
        }
    }

    /// Odd number of bytes in the TX DMA transfer (SPI1 packed mode)
    pub fn transmit_odd_config(&mut self, odd: bool) {
        self.regs.ctl1.modify(CTL1::TXDMA_ODD.val(u32::from(odd)));
    }

    pub fn receive_odd_config(&mut self, odd: bool) {
        self.regs.ctl1.modify(CTL1::RXDMA_ODD.val(u32::from(odd)));
    }

    pub fn fifo_access_size_config(&mut self, access: FifoAccess) {
        match access {
            FifoAccess::HalfWord => self.regs.ctl1.modify(CTL1::BYTEN::CLEAR),
            FifoAccess::Byte => self.regs.ctl1.modify(CTL1::BYTEN::SET),
        }
    }

    /// Changes the frame size of an initialised SPI
    pub fn data_frame_format_config(&mut self, frame_size: FrameSize) -> Result<(), Error> {
        match self.instance {
            Instance::Spi0 => match frame_size {
                FrameSize::Bits8 => self.regs.ctl0.modify(CTL0::FF16_CRCL::CLEAR),
                FrameSize::Bits16 => self.regs.ctl0.modify(CTL0::FF16_CRCL::SET),
                _ => return Err(Error::FrameSize),
            },
            Instance::Spi1 => self.regs.ctl1.modify(CTL1::DZ.val(frame_size as u32)),
        }
        Ok(())
    }

    /// Data direction in bidirectional mode
    pub fn bidirectional_transfer_config(&mut self, direction: Direction) {
        match direction {
            Direction::Transmit => self.regs.ctl0.modify(CTL0::BDOEN::SET),
            Direction::Receive => self.regs.ctl0.modify(CTL0::BDOEN::CLEAR),
        }
    }

    pub fn data_transmit(&mut self, data: u16) {
        self.regs.data.set(u32::from(data));
    }

    pub fn data_receive(&mut self) -> u16 {
        (self.regs.data.get() & 0xFFFF) as u16
    }

    pub fn crc_polynomial_set(&mut self, poly: u16) {
        self.regs.crcpoly.set(u32::from(poly));
    }

    pub fn crc_polynomial_get(&self) -> u16 {
        (self.regs.crcpoly.get() & 0xFFFF) as u16
    }

    /// CRC length, SPI1 only
    pub fn crc_length_set(&mut self, length: CrcLength) -> Result<(), Error> {
        if self.instance != Instance::Spi1 {
            return Err(Error::Unsupported);
        }
        match length {
            CrcLength::Bits8 => self.regs.ctl0.modify(CTL0::FF16_CRCL::CLEAR),
            CrcLength::Bits16 => self.regs.ctl0.modify(CTL0::FF16_CRCL::SET),
        }
        Ok(())
    }

    pub fn crc_on(&mut self) {
        self.regs.ctl0.modify(CTL0::CRCEN::SET);
    }

    pub fn crc_off(&mut self) {
        self.regs.ctl0.modify(CTL0::CRCEN::CLEAR);
    }

    /// The next transferred frame is the CRC
    pub fn crc_next(&mut self) {
        self.regs.ctl0.modify(CTL0::CRCNT::SET);
    }

    pub fn crc_get(&self, crc: Crc) -> u16 {
        let value = match crc {
            Crc::Tx => self.regs.tcrc.get(),
            Crc::Rx => self.regs.rcrc.get(),
        };
        (value & 0xFFFF) as u16
    }

    pub fn crc_error_clear(&mut self) {
        self.regs.stat.modify(STAT::CRCERR::CLEAR);
    }

    pub fn ti_mode_enable(&mut self) {
        self.regs.ctl1.modify(CTL1::TMOD::SET);
    }

    pub fn ti_mode_disable(&mut self) {
        self.regs.ctl1.modify(CTL1::TMOD::CLEAR);
    }

    pub fn nssp_mode_enable(&mut self) {
        self.regs.ctl1.modify(CTL1::NSSP::SET);
    }

    pub fn nssp_mode_disable(&mut self) {
        self.regs.ctl1.modify(CTL1::NSSP::CLEAR);
    }

    fn quad(&mut self, value: tock_registers::fields::FieldValue<u32, QCTL::Register>) -> Result<(), Error> {
        if self.instance != Instance::Spi1 {
            return Err(Error::Unsupported);
        }
        self.regs.qctl.modify(value);
        Ok(())
    }

    pub fn quad_enable(&mut self) -> Result<(), Error> {
        self.quad(QCTL::QMOD::SET)
    }

    pub fn quad_disable(&mut self) -> Result<(), Error> {
        self.quad(QCTL::QMOD::CLEAR)
    }

    pub fn quad_write_enable(&mut self) -> Result<(), Error> {
        self.quad(QCTL::QRD::CLEAR)
    }

    pub fn quad_read_enable(&mut self) -> Result<(), Error> {
        self.quad(QCTL::QRD::SET)
    }

    pub fn quad_io23_output_enable(&mut self) -> Result<(), Error> {
        self.quad(QCTL::IO23_DRV::SET)
    }

    pub fn quad_io23_output_disable(&mut self) -> Result<(), Error> {
        self.quad(QCTL::IO23_DRV::CLEAR)
    }

    pub fn flag_get(&self, flag: Flag) -> bool {
        self.regs.stat.get() & flag.mask() != 0
    }

    pub fn tx_fifo_level(&self) -> FifoLevel {
        FifoLevel::from_bits(self.regs.stat.read(STAT::TXLVL))
    }

    pub fn rx_fifo_level(&self) -> FifoLevel {
        FifoLevel::from_bits(self.regs.stat.read(STAT::RXLVL))
    }

    /// Clears the format error flag. STAT is written whole with every other
    /// bit set, so only FERR is affected.
    pub fn format_error_clear(&mut self) {
        self.regs.stat.set(!Flag::FormatError.mask());
    }

    pub fn interrupt_enable(&mut self, event: Event) {
        match event {
            Event::Tbe => self.regs.ctl1.modify(CTL1::TBEIE::SET),
            Event::Rbne => self.regs.ctl1.modify(CTL1::RBNEIE::SET),
            Event::Error => self.regs.ctl1.modify(CTL1::ERRIE::SET),
        }
    }

    pub fn interrupt_disable(&mut self, event: Event) {
        match event {
            Event::Tbe => self.regs.ctl1.modify(CTL1::TBEIE::CLEAR),
            Event::Rbne => self.regs.ctl1.modify(CTL1::RBNEIE::CLEAR),
            Event::Error => self.regs.ctl1.modify(CTL1::ERRIE::CLEAR),
        }
    }

    pub fn interrupt_flag_get(&self, flag: InterruptFlag) -> bool {
        let stat = &self.regs.stat;
        let ctl1 = &self.regs.ctl1;
        match flag {
            InterruptFlag::Tbe => stat.is_set(STAT::TBE) && ctl1.is_set(CTL1::TBEIE),
            InterruptFlag::Rbne => stat.is_set(STAT::RBNE) && ctl1.is_set(CTL1::RBNEIE),
            InterruptFlag::RxOverrun => stat.is_set(STAT::RXORERR) && ctl1.is_set(CTL1::ERRIE),
            InterruptFlag::ConfigError => stat.is_set(STAT::CONFERR) && ctl1.is_set(CTL1::ERRIE),
            InterruptFlag::CrcError => stat.is_set(STAT::CRCERR) && ctl1.is_set(CTL1::ERRIE),
            InterruptFlag::FormatError => stat.is_set(STAT::FERR) && ctl1.is_set(CTL1::ERRIE),
            InterruptFlag::TxUnderrun => stat.is_set(STAT::TXURERR) && ctl1.is_set(CTL1::ERRIE),
        }
    }

    fn check_errors(&self) -> Result<(), Error> {
        let stat = &self.regs.stat;
        if stat.is_set(STAT::RXORERR) {
            Err(Error::Overrun)
        } else if stat.is_set(STAT::CONFERR) {
            Err(Error::ModeFault)
        } else if stat.is_set(STAT::CRCERR) {
            Err(Error::Crc)
        } else {
            Ok(())
        }
    }
}

impl FullDuplex<u8> for Spi {
    type Error = Error;

    fn read(&mut self) -> nb::Result<u8, Error> {
        self.check_errors()?;
        if self.regs.stat.is_set(STAT::RBNE) {
            Ok((self.regs.data.get() & 0xFF) as u8)
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    fn send(&mut self, byte: u8) -> nb::Result<(), Error> {
        self.check_errors()?;
        if self.regs.stat.is_set(STAT::TBE) {
            self.regs.data.set(u32::from(byte));
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

impl embedded_hal::blocking::spi::transfer::Default<u8> for Spi {}

impl embedded_hal::blocking::spi::write::Default<u8> for Spi {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fake_regs;

    fn master_config(frame_size: FrameSize) -> SpiConfig {
        SpiConfig {
            device_mode: DeviceMode::Master,
            trans_mode: TransMode::FullDuplex,
            frame_size,
            nss: Nss::Soft,
            endian: Endian::MsbFirst,
            mode: hal_spi::MODE_3,
            prescaler: Prescaler::Div8,
        }
    }

    #[test]
    fn prescaler_with_master_clock() {
        // 48 MHz CK_SYS, MCK on
        assert_eq!(
            i2s_prescaler(48_000_000, 8_000, I2sFrameFormat::Dt16bCh16b, true),
            (11, true)
        );
        assert_eq!(
            i2s_prescaler(48_000_000, 44_100, I2sFrameFormat::Dt16bCh16b, true),
            (2, false)
        );
    }

    #[test]
    fn prescaler_without_master_clock() {
        assert_eq!(
            i2s_prescaler(48_000_000, 8_000, I2sFrameFormat::Dt16bCh16b, false),
            (94, false)
        );
        // 32-bit channels halve the bit clock multiple
        assert_eq!(
            i2s_prescaler(48_000_000, 8_000, I2sFrameFormat::Dt24bCh32b, false),
            (47, false)
        );
    }

    #[test]
    fn prescaler_out_of_range_falls_back() {
        assert_eq!(
            i2s_prescaler(48_000_000, 192_000, I2sFrameFormat::Dt16bCh16b, true),
            (2, false)
        );
        assert_eq!(
            i2s_prescaler(48_000_000, 0, I2sFrameFormat::Dt16bCh16b, true),
            (2, false)
        );
        // DIV above 255
        assert_eq!(
            i2s_prescaler(48_000_000, 8_000, I2sFrameFormat::Dt16bCh16b, false).0,
            94
        );
        assert_eq!(
            i2s_prescaler(480_000_000, 8_000, I2sFrameFormat::Dt16bCh16b, false),
            (2, false)
        );
    }

    #[test]
    fn init_spi0_master() {
        let regs = fake_regs::<RegisterBlock>();
        let mut spi = Spi::with_regs(regs, Instance::Spi0);

        regs.ctl0.modify(CTL0::SPIEN::SET + CTL0::CRCEN::SET + CTL0::RO::SET);
        regs.i2sctl.modify(I2SCTL::I2SSEL::SET);

        assert_eq!(spi.init(&master_config(FrameSize::Bits16)), Ok(()));
        assert_eq!(
            regs.ctl0.get(),
            0b11 | (1 << 2) | (2 << 3) | (1 << 6) | (1 << 8) | (1 << 9) | (1 << 11) | (1 << 13)
        );
        assert!(!regs.i2sctl.is_set(I2SCTL::I2SSEL));
        assert_eq!(regs.ctl1.get(), 0);
    }

    #[test]
    fn init_spi0_rejects_odd_frames() {
        let regs = fake_regs::<RegisterBlock>();
        let mut spi = Spi::with_regs(regs, Instance::Spi0);

        assert_eq!(spi.init(&master_config(FrameSize::Bits12)), Err(Error::FrameSize));
        assert_eq!(regs.ctl0.get(), 0);
        assert_eq!(
            spi.data_frame_format_config(FrameSize::Bits9),
            Err(Error::FrameSize)
        );
    }

    #[test]
    fn init_spi1_sets_data_size() {
        let regs = fake_regs::<RegisterBlock>();
        let mut spi = Spi::with_regs(regs, Instance::Spi1);

        assert_eq!(spi.init(&master_config(FrameSize::Bits12)), Ok(()));
        assert_eq!(regs.ctl1.read(CTL1::DZ), 11);
        assert!(!regs.ctl0.is_set(CTL0::FF16_CRCL));

        assert_eq!(spi.data_frame_format_config(FrameSize::Bits4), Ok(()));
        assert_eq!(regs.ctl1.read(CTL1::DZ), 3);
    }

    #[test]
    fn default_config_is_slave() {
        let regs = fake_regs::<RegisterBlock>();
        let mut spi = Spi::with_regs(regs, Instance::Spi0);

        assert_eq!(spi.init(&SpiConfig::default()), Ok(()));
        assert_eq!(regs.ctl0.get(), 0);
    }

    #[test]
    fn transfer_modes() {
        let regs = fake_regs::<RegisterBlock>();
        let mut spi = Spi::with_regs(regs, Instance::Spi0);
        let mut config = SpiConfig::default();

        config.trans_mode = TransMode::BidirectionalTransmit;
        spi.init(&config).unwrap();
        assert!(regs.ctl0.is_set(CTL0::BDEN) && regs.ctl0.is_set(CTL0::BDOEN));

        spi.bidirectional_transfer_config(Direction::Receive);
        assert!(regs.ctl0.is_set(CTL0::BDEN) && !regs.ctl0.is_set(CTL0::BDOEN));

        config.trans_mode = TransMode::ReceiveOnly;
        spi.init(&config).unwrap();
        assert_eq!(regs.ctl0.get(), 1 << 10);
    }

    #[test]
    fn i2s_master_tx_setup() {
        let regs = fake_regs::<RegisterBlock>();
        let mut spi = Spi::with_regs(regs, Instance::Spi0);

        spi.i2s_psc_config(8_000, I2sFrameFormat::Dt16bCh16b, true, 48_000_000);
        spi.i2s_init(I2sMode::MasterTx, I2sStandard::Phillips, I2sClockPolarity::High);
        spi.i2s_enable();

        assert_eq!(regs.i2spsc.get(), 11 | (1 << 8) | (1 << 9));
        assert_eq!(regs.i2sctl.get(), (1 << 3) | (2 << 8) | (1 << 10) | (1 << 11));

        spi.i2s_psc_config(8_000, I2sFrameFormat::Dt32bCh32b, false, 48_000_000);
        assert_eq!(regs.i2sctl.read(I2SCTL::DTLEN), 2);
        assert!(regs.i2sctl.is_set(I2SCTL::CHLEN));
        assert_eq!(regs.i2spsc.get(), 47);
    }

    #[test]
    fn pcm_long_sets_frame_sync_mode() {
        let regs = fake_regs::<RegisterBlock>();
        let mut spi = Spi::with_regs(regs, Instance::Spi0);

        spi.i2s_init(I2sMode::SlaveRx, I2sStandard::PcmLong, I2sClockPolarity::Low);
        assert_eq!(regs.i2sctl.get(), (3 << 4) | (1 << 7) | (1 << 8) | (1 << 11));
    }

    #[test]
    fn interrupt_flag_needs_enable() {
        let regs = fake_regs::<RegisterBlock>();
        let mut spi = Spi::with_regs(regs, Instance::Spi0);

        regs.stat.modify(STAT::TBE::SET + STAT::RXORERR::SET);
        assert!(spi.flag_get(Flag::Tbe));
        assert!(!spi.interrupt_flag_get(InterruptFlag::Tbe));

        spi.interrupt_enable(Event::Tbe);
        assert!(spi.interrupt_flag_get(InterruptFlag::Tbe));
        assert!(!spi.interrupt_flag_get(InterruptFlag::RxOverrun));

        spi.interrupt_enable(Event::Error);
        assert!(spi.interrupt_flag_get(InterruptFlag::RxOverrun));

        spi.interrupt_disable(Event::Tbe);
        assert!(!spi.interrupt_flag_get(InterruptFlag::Tbe));
    }

    #[test]
    fn quad_mode_only_on_spi1() {
        let regs = fake_regs::<RegisterBlock>();
        let mut spi0 = Spi::with_regs(regs, Instance::Spi0);
        assert_eq!(spi0.quad_enable(), Err(Error::Unsupported));
        assert_eq!(spi0.crc_length_set(CrcLength::Bits16), Err(Error::Unsupported));

        let regs = fake_regs::<RegisterBlock>();
        let mut spi1 = Spi::with_regs(regs, Instance::Spi1);
        spi1.quad_enable().unwrap();
        spi1.quad_read_enable().unwrap();
        spi1.quad_io23_output_enable().unwrap();
        assert_eq!(regs.qctl.get(), 0b111);
        spi1.quad_write_enable().unwrap();
        assert_eq!(regs.qctl.get(), 0b101);
    }

    #[test]
    fn crc_registers() {
        let regs = fake_regs::<RegisterBlock>();
        let mut spi = Spi::with_regs(regs, Instance::Spi1);

        spi.crc_polynomial_set(0x1021);
        assert_eq!(spi.crc_polynomial_get(), 0x1021);
        spi.crc_on();
        spi.crc_next();
        assert!(regs.ctl0.is_set(CTL0::CRCEN) && regs.ctl0.is_set(CTL0::CRCNT));

        regs.tcrc.set(0xBEEF);
        regs.rcrc.set(0x1234);
        assert_eq!(spi.crc_get(Crc::Tx), 0xBEEF);
        assert_eq!(spi.crc_get(Crc::Rx), 0x1234);

        regs.stat.modify(STAT::CRCERR::SET + STAT::TBE::SET);
        spi.crc_error_clear();
        assert_eq!(regs.stat.get(), 1 << 1);
    }

    #[test]
    fn format_error_clear_writes_inverted_mask() {
        let regs = fake_regs::<RegisterBlock>();
        let mut spi = Spi::with_regs(regs, Instance::Spi0);

        spi.format_error_clear();
        assert_eq!(regs.stat.get(), !(1 << 8));
    }

    #[test]
    fn full_duplex_byte_io() {
        let regs = fake_regs::<RegisterBlock>();
        let mut spi = Spi::with_regs(regs, Instance::Spi0);

        assert_eq!(spi.send(0xA5), Err(nb::Error::WouldBlock));
        regs.stat.modify(STAT::TBE::SET);
        assert_eq!(spi.send(0xA5), Ok(()));
        assert_eq!(regs.data.get(), 0xA5);

        regs.stat.modify(STAT::RBNE::SET);
        regs.data.set(0x3C);
        assert_eq!(spi.read(), Ok(0x3C));

        regs.stat.modify(STAT::RXORERR::SET);
        assert_eq!(spi.read(), Err(nb::Error::Other(Error::Overrun)));
    }

    #[test]
    fn fifo_levels() {
        let regs = fake_regs::<RegisterBlock>();
        let spi = Spi::with_regs(regs, Instance::Spi1);

        regs.stat.modify(STAT::TXLVL.val(3) + STAT::RXLVL.val(1));
        assert_eq!(spi.tx_fifo_level(), FifoLevel::Full);
        assert_eq!(spi.rx_fifo_level(), FifoLevel::QuarterFull);
    }
}
