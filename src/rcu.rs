//! Reset and clock unit (RCU).
//!
//! Peripheral clock gating and reset, the oscillators, the CK_OUT0 clock
//! output and the derived bus frequencies.

use core::fmt;

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

use crate::pac;
use crate::static_ref::StaticRef;

/// IRC48M oscillator frequency
pub const IRC48M_VALUE: u32 = 48_000_000;
/// External high speed crystal frequency fitted on the boards
pub const HXTAL_VALUE: u32 = 8_000_000;
/// IRC32K oscillator frequency
pub const IRC32K_VALUE: u32 = 32_000;
/// External low speed crystal frequency
pub const LXTAL_VALUE: u32 = 32_768;

const IRC48M_STARTUP_TIMEOUT: u32 = 0x0000_0500;
const HXTAL_STARTUP_TIMEOUT: u32 = 0x0000_FFFF;
const LXTAL_STARTUP_TIMEOUT: u32 = 0x03FF_FFFF;
const IRC32K_STARTUP_TIMEOUT: u32 = 0x0000_3FFF;

register_structs! {
    pub RegisterBlock {
        (0x00 => ctl: ReadWrite<u32, CTL::Register>),
        (0x04 => cfg0: ReadWrite<u32, CFG0::Register>),
        (0x08 => int: ReadWrite<u32>),
        (0x0C => apb2rst: ReadWrite<u32>),
        (0x10 => apb1rst: ReadWrite<u32>),
        (0x14 => ahben: ReadWrite<u32>),
        (0x18 => apb2en: ReadWrite<u32>),
        (0x1C => apb1en: ReadWrite<u32>),
        (0x20 => bdctl: ReadWrite<u32, BDCTL::Register>),
        (0x24 => rstsck: ReadWrite<u32, RSTSCK::Register>),
        (0x28 => ahbrst: ReadWrite<u32>),
        (0x2C => cfg1: ReadWrite<u32>),
        (0x30 => cfg2: ReadWrite<u32, CFG2::Register>),
        (0x34 => @END),
    }
}

register_bitfields![u32,
    CTL [
        IRC48MEN OFFSET(0) NUMBITS(1) [],
        IRC48MSTB OFFSET(1) NUMBITS(1) [],
        HXTALEN OFFSET(16) NUMBITS(1) [],
        HXTALSTB OFFSET(17) NUMBITS(1) [],
        HXTALBPS OFFSET(18) NUMBITS(1) [],
        CKMEN OFFSET(19) NUMBITS(1) []
    ],
    CFG0 [
        SCS OFFSET(0) NUMBITS(2) [],
        SCSS OFFSET(2) NUMBITS(2) [
            Irc48m = 0,
            Hxtal = 1,
            Irc32k = 2,
            Lxtal = 3
        ],
        AHBPSC OFFSET(4) NUMBITS(4) [],
        APBPSC OFFSET(8) NUMBITS(3) [],
        CKOUTSEL OFFSET(24) NUMBITS(3) [],
        CKOUTDIV OFFSET(28) NUMBITS(3) []
    ],
    BDCTL [
        LXTALEN OFFSET(0) NUMBITS(1) [],
        LXTALSTB OFFSET(1) NUMBITS(1) [],
        LXTALBPS OFFSET(2) NUMBITS(1) [],
        RTCSRC OFFSET(8) NUMBITS(2) [],
        RTCEN OFFSET(15) NUMBITS(1) [],
        BKPRST OFFSET(16) NUMBITS(1) []
    ],
    RSTSCK [
        IRC32KEN OFFSET(0) NUMBITS(1) [],
        IRC32KSTB OFFSET(1) NUMBITS(1) []
    ],
    CFG2 [
        ADCPSC OFFSET(0) NUMBITS(4) [],
        ADCSEL OFFSET(8) NUMBITS(1) []
    ]
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The oscillator did not report stable before the startup timeout
    Timeout(Oscillator),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Timeout(osc) => write!(f, "{:?} did not stabilise", osc),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oscillator {
    Irc48m,
    Hxtal,
    Lxtal,
    Irc32k,
}

/// Clock-gated peripherals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Periph {
    Dma,
    Crc,
    Gpioa,
    Gpiob,
    Gpioc,
    Gpiod,
    Gpiof,
    Syscfg,
    Adc,
    Timer0,
    Spi0,
    Usart0,
    Timer15,
    Timer16,
    Timer2,
    Timer13,
    Wwdgt,
    Spi1,
    Usart1,
    I2c0,
    I2c1,
    Pmu,
    /// RTC clock gate lives in the backup domain control register
    Rtc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bus {
    Ahb,
    Apb1,
    Apb2,
    Backup,
}

impl Periph {
    fn location(self) -> (Bus, u32) {
        use Periph::*;
        match self {
            Dma => (Bus::Ahb, 0),
            Crc => (Bus::Ahb, 6),
            Gpioa => (Bus::Ahb, 17),
            Gpiob => (Bus::Ahb, 18),
            Gpioc => (Bus::Ahb, 19),
            Gpiod => (Bus::Ahb, 20),
            Gpiof => (Bus::Ahb, 22),
            Syscfg => (Bus::Apb2, 0),
            Adc => (Bus::Apb2, 9),
            Timer0 => (Bus::Apb2, 11),
            Spi0 => (Bus::Apb2, 12),
            Usart0 => (Bus::Apb2, 14),
            Timer15 => (Bus::Apb2, 17),
            Timer16 => (Bus::Apb2, 18),
            Timer2 => (Bus::Apb1, 1),
            Timer13 => (Bus::Apb1, 8),
            Wwdgt => (Bus::Apb1, 11),
            Spi1 => (Bus::Apb1, 14),
            Usart1 => (Bus::Apb1, 17),
            I2c0 => (Bus::Apb1, 21),
            I2c1 => (Bus::Apb1, 22),
            Pmu => (Bus::Apb1, 28),
            Rtc => (Bus::Backup, 15),
        }
    }
}

/// CK_OUT0 clock source
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CkOutSource {
    None = 0,
    Irc32k = 2,
    Lxtal = 3,
    CkSys = 4,
    Irc48m = 5,
    Hxtal = 6,
}

/// CK_OUT0 divider
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CkOutDiv {
    Div1 = 0,
    Div2 = 1,
    Div4 = 2,
    Div8 = 3,
    Div16 = 4,
    Div32 = 5,
    Div64 = 6,
    Div128 = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RtcClockSource {
    None = 0,
    Lxtal = 1,
    Irc32k = 2,
    HxtalDiv32 = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcClockSource {
    CkSys = 0,
    Irc48m = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcClockDiv {
    Div1 = 0,
    Div2 = 1,
    Div4 = 2,
    Div8 = 3,
    Div16 = 4,
    Div32 = 5,
    Div64 = 6,
    Div128 = 7,
    Div256 = 8,
}

/// Frozen clock frequencies
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Clocks {
    sys: u32,
    ahb: u32,
    apb: u32,
}

impl Clocks {
    #[cfg(test)]
    pub(crate) const fn new(sys: u32, ahb: u32, apb: u32) -> Self {
        Clocks { sys, ahb, apb }
    }

    /// CK_SYS in Hz
    pub fn sys(&self) -> u32 {
        self.sys
    }

    /// HCLK in Hz
    pub fn ahb(&self) -> u32 {
        self.ahb
    }

    /// PCLK in Hz
    pub fn apb(&self) -> u32 {
        self.apb
    }

    /// Clock fed into the timers.
    ///
    /// If PCLK is prescaled from HCLK, the frequency fed into the timers is
    /// doubled.
    pub fn timer(&self) -> u32 {
        if self.ahb == self.apb {
            self.apb
        } else {
            self.apb * 2
        }
    }
}

fn ahb_shift(psc: u32) -> u32 {
    match psc {
        0..=7 => 0,
        8 => 1,
        9 => 2,
        10 => 3,
        11 => 4,
        12 => 6,
        13 => 7,
        14 => 8,
        _ => 9,
    }
}

fn apb_shift(psc: u32) -> u32 {
    match psc {
        0..=3 => 0,
        4 => 1,
        5 => 2,
        6 => 3,
        _ => 4,
    }
}

pub struct Rcu {
    regs: StaticRef<RegisterBlock>,
}

impl Rcu {
    pub fn new(_rcu: pac::RCU) -> Self {
        Rcu {
            regs: pac::RCU::regs(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_regs(regs: StaticRef<RegisterBlock>) -> Self {
        Rcu { regs }
    }

    fn enable_reg(&self, bus: Bus) -> &ReadWrite<u32> {
        match bus {
            Bus::Ahb => &self.regs.ahben,
            Bus::Apb1 => &self.regs.apb1en,
            Bus::Apb2 | Bus::Backup => &self.regs.apb2en,
        }
    }

    fn reset_reg(&self, bus: Bus) -> &ReadWrite<u32> {
        match bus {
            Bus::Ahb => &self.regs.ahbrst,
            Bus::Apb1 => &self.regs.apb1rst,
            Bus::Apb2 | Bus::Backup => &self.regs.apb2rst,
        }
    }

    /// Enables the clock of a peripheral
    pub fn enable(&mut self, periph: Periph) {
        match periph.location() {
            (Bus::Backup, _) => self.regs.bdctl.modify(BDCTL::RTCEN::SET),
            (bus, bit) => {
                let reg = self.enable_reg(bus);
                reg.set(reg.get() | (1 << bit));
            }
        }
    }

    /// Disables the clock of a peripheral
    pub fn disable(&mut self, periph: Periph) {
        match periph.location() {
            (Bus::Backup, _) => self.regs.bdctl.modify(BDCTL::RTCEN::CLEAR),
            (bus, bit) => {
                let reg = self.enable_reg(bus);
                reg.set(reg.get() & !(1 << bit));
            }
        }
    }

    pub fn is_enabled(&self, periph: Periph) -> bool {
        match periph.location() {
            (Bus::Backup, _) => self.regs.bdctl.is_set(BDCTL::RTCEN),
            (bus, bit) => self.enable_reg(bus).get() & (1 << bit) != 0,
        }
    }

    /// Pulses the reset line of a peripheral. The RTC is reset together with
    /// the whole backup domain.
    pub fn reset(&mut self, periph: Periph) {
        match periph.location() {
            (Bus::Backup, _) => {
                self.regs.bdctl.modify(BDCTL::BKPRST::SET);
                self.regs.bdctl.modify(BDCTL::BKPRST::CLEAR);
            }
            (bus, bit) => {
                let reg = self.reset_reg(bus);
                reg.set(reg.get() | (1 << bit));
                reg.set(reg.get() & !(1 << bit));
            }
        }
    }

    pub fn osc_on(&mut self, osc: Oscillator) {
        match osc {
            Oscillator::Irc48m => self.regs.ctl.modify(CTL::IRC48MEN::SET),
            Oscillator::Hxtal => self.regs.ctl.modify(CTL::HXTALEN::SET),
            Oscillator::Lxtal => self.regs.bdctl.modify(BDCTL::LXTALEN::SET),
            Oscillator::Irc32k => self.regs.rstsck.modify(RSTSCK::IRC32KEN::SET),
        }
    }

    pub fn osc_off(&mut self, osc: Oscillator) {
        match osc {
            Oscillator::Irc48m => self.regs.ctl.modify(CTL::IRC48MEN::CLEAR),
            Oscillator::Hxtal => self.regs.ctl.modify(CTL::HXTALEN::CLEAR),
            Oscillator::Lxtal => self.regs.bdctl.modify(BDCTL::LXTALEN::CLEAR),
            Oscillator::Irc32k => self.regs.rstsck.modify(RSTSCK::IRC32KEN::CLEAR),
        }
    }

    /// Feeds an external clock through the crystal pin. Only the crystal
    /// oscillators have a bypass; the oscillator must be off.
    pub fn osc_bypass_mode_enable(&mut self, osc: Oscillator) {
        match osc {
            Oscillator::Hxtal => self.regs.ctl.modify(CTL::HXTALBPS::SET),
            Oscillator::Lxtal => self.regs.bdctl.modify(BDCTL::LXTALBPS::SET),
            Oscillator::Irc48m | Oscillator::Irc32k => {}
        }
    }

    pub fn osc_bypass_mode_disable(&mut self, osc: Oscillator) {
        match osc {
            Oscillator::Hxtal => self.regs.ctl.modify(CTL::HXTALBPS::CLEAR),
            Oscillator::Lxtal => self.regs.bdctl.modify(BDCTL::LXTALBPS::CLEAR),
            Oscillator::Irc48m | Oscillator::Irc32k => {}
        }
    }

    pub fn osc_is_stable(&self, osc: Oscillator) -> bool {
        match osc {
            Oscillator::Irc48m => self.regs.ctl.is_set(CTL::IRC48MSTB),
            Oscillator::Hxtal => self.regs.ctl.is_set(CTL::HXTALSTB),
            Oscillator::Lxtal => self.regs.bdctl.is_set(BDCTL::LXTALSTB),
            Oscillator::Irc32k => self.regs.rstsck.is_set(RSTSCK::IRC32KSTB),
        }
    }

    /// Waits until the oscillator reports stable, giving up after the
    /// oscillator's startup timeout.
    pub fn osc_stab_wait(&self, osc: Oscillator) -> Result<(), Error> {
        let timeout = match osc {
            Oscillator::Irc48m => IRC48M_STARTUP_TIMEOUT,
            Oscillator::Hxtal => HXTAL_STARTUP_TIMEOUT,
            Oscillator::Lxtal => LXTAL_STARTUP_TIMEOUT,
            Oscillator::Irc32k => IRC32K_STARTUP_TIMEOUT,
        };
        for _ in 0..timeout {
            if self.osc_is_stable(osc) {
                return Ok(());
            }
        }
        // one last look, the flag may have come up on the final iteration
        if self.osc_is_stable(osc) {
            Ok(())
        } else {
            warn!("oscillator startup timed out");
            Err(Error::Timeout(osc))
        }
    }

    /// Selects the CK_OUT0 source and divider
    pub fn ckout_config(&mut self, source: CkOutSource, div: CkOutDiv) {
        self.regs
            .cfg0
            .modify(CFG0::CKOUTSEL.val(source as u32) + CFG0::CKOUTDIV.val(div as u32));
    }

    /// Selects the RTC clock. The selection can only be changed after a
    /// backup domain reset.
    pub fn rtc_clock_config(&mut self, source: RtcClockSource) {
        self.regs.bdctl.modify(BDCTL::RTCSRC.val(source as u32));
    }

    pub fn adc_clock_config(&mut self, source: AdcClockSource, div: AdcClockDiv) {
        self.regs
            .cfg2
            .modify(CFG2::ADCSEL.val(source as u32) + CFG2::ADCPSC.val(div as u32));
    }

    /// Reads back the system clock switch and the bus prescalers.
    pub fn clocks(&self) -> Clocks {
        let sys = match self.regs.cfg0.read_as_enum(CFG0::SCSS) {
            Some(CFG0::SCSS::Value::Hxtal) => HXTAL_VALUE,
            Some(CFG0::SCSS::Value::Irc32k) => IRC32K_VALUE,
            Some(CFG0::SCSS::Value::Lxtal) => LXTAL_VALUE,
            Some(CFG0::SCSS::Value::Irc48m) | None => IRC48M_VALUE,
        };
        let ahb = sys >> ahb_shift(self.regs.cfg0.read(CFG0::AHBPSC));
        let apb = ahb >> apb_shift(self.regs.cfg0.read(CFG0::APBPSC));
        Clocks { sys, ahb, apb }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fake_regs;

    #[test]
    fn enable_sets_the_bus_bit() {
        let regs = fake_regs::<RegisterBlock>();
        let mut rcu = Rcu::with_regs(regs);

        rcu.enable(Periph::Gpioa);
        rcu.enable(Periph::Spi0);
        rcu.enable(Periph::Wwdgt);
        assert_eq!(regs.ahben.get(), 1 << 17);
        assert_eq!(regs.apb2en.get(), 1 << 12);
        assert_eq!(regs.apb1en.get(), 1 << 11);
        assert!(rcu.is_enabled(Periph::Spi0));

        rcu.disable(Periph::Spi0);
        assert_eq!(regs.apb2en.get(), 0);
        assert!(!rcu.is_enabled(Periph::Spi0));
    }

    #[test]
    fn rtc_gate_lives_in_backup_domain() {
        let regs = fake_regs::<RegisterBlock>();
        let mut rcu = Rcu::with_regs(regs);

        rcu.enable(Periph::Rtc);
        assert!(regs.bdctl.is_set(BDCTL::RTCEN));
        assert_eq!(regs.apb2en.get(), 0);
    }

    #[test]
    fn reset_leaves_the_line_released() {
        let regs = fake_regs::<RegisterBlock>();
        let mut rcu = Rcu::with_regs(regs);

        regs.apb1rst.set(0x8000_0000);
        rcu.reset(Periph::Wwdgt);
        assert_eq!(regs.apb1rst.get(), 0x8000_0000);
    }

    #[test]
    fn stabilisation_wait() {
        let regs = fake_regs::<RegisterBlock>();
        let mut rcu = Rcu::with_regs(regs);

        rcu.osc_on(Oscillator::Hxtal);
        assert!(regs.ctl.is_set(CTL::HXTALEN));
        assert_eq!(
            rcu.osc_stab_wait(Oscillator::Hxtal),
            Err(Error::Timeout(Oscillator::Hxtal))
        );

        regs.ctl.modify(CTL::HXTALSTB::SET);
        assert_eq!(rcu.osc_stab_wait(Oscillator::Hxtal), Ok(()));

        regs.rstsck.modify(RSTSCK::IRC32KSTB::SET);
        assert_eq!(rcu.osc_stab_wait(Oscillator::Irc32k), Ok(()));
    }

    #[test]
    fn ckout_selection() {
        let regs = fake_regs::<RegisterBlock>();
        let mut rcu = Rcu::with_regs(regs);

        rcu.ckout_config(CkOutSource::CkSys, CkOutDiv::Div4);
        assert_eq!(regs.cfg0.read(CFG0::CKOUTSEL), 4);
        assert_eq!(regs.cfg0.read(CFG0::CKOUTDIV), 2);

        rcu.ckout_config(CkOutSource::Hxtal, CkOutDiv::Div1);
        assert_eq!(regs.cfg0.get(), 6 << 24);
    }

    #[test]
    fn clock_tree_from_prescalers() {
        let regs = fake_regs::<RegisterBlock>();
        let rcu = Rcu::with_regs(regs);

        let clocks = rcu.clocks();
        assert_eq!(clocks.sys(), 48_000_000);
        assert_eq!(clocks.apb(), 48_000_000);
        assert_eq!(clocks.timer(), 48_000_000);

        // AHB /2, APB /4
        regs.cfg0.modify(CFG0::AHBPSC.val(0b1000) + CFG0::APBPSC.val(0b101));
        let clocks = rcu.clocks();
        assert_eq!(clocks.ahb(), 24_000_000);
        assert_eq!(clocks.apb(), 6_000_000);
        assert_eq!(clocks.timer(), 12_000_000);

        regs.cfg0.modify(CFG0::SCSS::Hxtal + CFG0::AHBPSC.val(0) + CFG0::APBPSC.val(0));
        assert_eq!(rcu.clocks().sys(), HXTAL_VALUE);
    }
}
