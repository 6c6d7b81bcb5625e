//! General purpose I/O.
//!
//! Pins are addressed by port and index, the way the board tables list
//! them. `Pin` is a plain handle onto the port registers; `Output` and
//! `Input` add the `embedded-hal` digital traits on top.

use core::convert::Infallible;

use embedded_hal::digital::v2::{InputPin, OutputPin, StatefulOutputPin, ToggleableOutputPin};
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::{ReadOnly, ReadWrite, WriteOnly};
use tock_registers::register_structs;

use crate::pac;
use crate::rcu::{Periph, Rcu};
use crate::static_ref::StaticRef;

register_structs! {
    pub RegisterBlock {
        (0x00 => ctl: ReadWrite<u32>),
        (0x04 => omode: ReadWrite<u32>),
        (0x08 => ospd: ReadWrite<u32>),
        (0x0C => pud: ReadWrite<u32>),
        (0x10 => istat: ReadOnly<u32>),
        (0x14 => octl: ReadWrite<u32>),
        (0x18 => bop: WriteOnly<u32>),
        (0x1C => lock: ReadWrite<u32>),
        (0x20 => afsel0: ReadWrite<u32>),
        (0x24 => afsel1: ReadWrite<u32>),
        (0x28 => bc: WriteOnly<u32>),
        (0x2C => tg: WriteOnly<u32>),
        (0x30 => @END),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    A,
    B,
    C,
    D,
    F,
}

impl Port {
    fn base(self) -> u32 {
        match self {
            Port::A => pac::GPIOA_BASE,
            Port::B => pac::GPIOB_BASE,
            Port::C => pac::GPIOC_BASE,
            Port::D => pac::GPIOD_BASE,
            Port::F => pac::GPIOF_BASE,
        }
    }

    /// Clock gate of the port
    pub fn periph(self) -> Periph {
        match self {
            Port::A => Periph::Gpioa,
            Port::B => Periph::Gpiob,
            Port::C => Periph::Gpioc,
            Port::D => Periph::Gpiod,
            Port::F => Periph::Gpiof,
        }
    }

    /// Value of this port in the SYSCFG EXTI source selection
    pub fn exti_source(self) -> u32 {
        match self {
            Port::A => 0,
            Port::B => 1,
            Port::C => 2,
            Port::D => 3,
            Port::F => 5,
        }
    }

    fn regs(self) -> StaticRef<RegisterBlock> {
        // SAFETY: fixed, aligned MMIO address of the port
        unsafe { StaticRef::new(self.base() as *const RegisterBlock) }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Input = 0,
    Output = 1,
    Alternate = 2,
    Analog = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    None = 0,
    Up = 1,
    Down = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputType {
    PushPull = 0,
    OpenDrain = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    Level0 = 0,
    Level1 = 1,
    Level2 = 2,
    Level3 = 3,
}

/// Alternate function number, 0..=7
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AltFunction(pub u8);

pub const AF0: AltFunction = AltFunction(0);
pub const AF1: AltFunction = AltFunction(1);
pub const AF2: AltFunction = AltFunction(2);
pub const AF5: AltFunction = AltFunction(5);

/// A single pin of a port.
#[derive(Clone, Copy)]
pub struct Pin {
    regs: StaticRef<RegisterBlock>,
    port: Port,
    index: u8,
}

impl Pin {
    /// `index` is taken modulo 16.
    pub fn new(port: Port, index: u8) -> Self {
        Pin {
            regs: port.regs(),
            port,
            index: index & 0x0F,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_regs(regs: StaticRef<RegisterBlock>, port: Port, index: u8) -> Self {
        Pin {
            regs,
            port,
            index: index & 0x0F,
        }
    }

    pub fn port(&self) -> Port {
        self.port
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    fn mask(&self) -> u32 {
        1 << self.index
    }

    fn write_field(reg: &ReadWrite<u32>, width: u32, index: u32, value: u32) {
        let field = (1 << width) - 1;
        let shift = index * width;
        reg.set((reg.get() & !(field << shift)) | ((value & field) << shift));
    }

    /// Enables the port clock
    pub fn enable_clock(&self, rcu: &mut Rcu) {
        rcu.enable(self.port.periph());
    }

    pub fn set_mode(&self, mode: Mode, pull: Pull) {
        let i = u32::from(self.index);
        Self::write_field(&self.regs.ctl, 2, i, mode as u32);
        Self::write_field(&self.regs.pud, 2, i, pull as u32);
    }

    pub fn set_output_options(&self, otype: OutputType, speed: Speed) {
        let i = u32::from(self.index);
        Self::write_field(&self.regs.omode, 1, i, otype as u32);
        Self::write_field(&self.regs.ospd, 2, i, speed as u32);
    }

    pub fn set_af(&self, af: AltFunction) {
        let i = u32::from(self.index);
        if i < 8 {
            Self::write_field(&self.regs.afsel0, 4, i, u32::from(af.0));
        } else {
            Self::write_field(&self.regs.afsel1, 4, i - 8, u32::from(af.0));
        }
    }

    pub fn set_high(&self) {
        self.regs.bop.set(self.mask());
    }

    pub fn set_low(&self) {
        self.regs.bc.set(self.mask());
    }

    pub fn toggle(&self) {
        self.regs.tg.set(self.mask());
    }

    /// Level on the pad
    pub fn is_high(&self) -> bool {
        self.regs.istat.get() & self.mask() != 0
    }

    /// Level the output latch drives
    pub fn is_set_high(&self) -> bool {
        self.regs.octl.get() & self.mask() != 0
    }

    pub fn into_push_pull_output(self, speed: Speed) -> Output {
        self.set_output_options(OutputType::PushPull, speed);
        self.set_mode(Mode::Output, Pull::None);
        Output { pin: self }
    }

    pub fn into_input(self, pull: Pull) -> Input {
        self.set_mode(Mode::Input, pull);
        Input { pin: self }
    }

    pub fn into_alternate(self, af: AltFunction, otype: OutputType, speed: Speed) -> Self {
        self.set_af(af);
        self.set_output_options(otype, speed);
        self.set_mode(Mode::Alternate, Pull::None);
        self
    }

    pub fn into_analog(self) -> Self {
        self.set_mode(Mode::Analog, Pull::None);
        self
    }
}

pub struct Output {
    pin: Pin,
}

impl Output {
    pub fn pin(&self) -> &Pin {
        &self.pin
    }
}

impl OutputPin for Output {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high();
        Ok(())
    }
}

impl StatefulOutputPin for Output {
    fn is_set_high(&self) -> Result<bool, Self::Error> {
        Ok(self.pin.is_set_high())
    }

    fn is_set_low(&self) -> Result<bool, Self::Error> {
        Ok(!self.pin.is_set_high())
    }
}

impl ToggleableOutputPin for Output {
    type Error = Infallible;

    fn toggle(&mut self) -> Result<(), Self::Error> {
        self.pin.toggle();
        Ok(())
    }
}

pub struct Input {
    pin: Pin,
}

impl InputPin for Input {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.pin.is_high())
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(!self.pin.is_high())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_regs, peek, poke};

    #[test]
    fn output_configuration() {
        let regs = fake_regs::<RegisterBlock>();
        regs.ctl.set(0xFFFF_FFFF);
        let pin = Pin::with_regs(regs, Port::B, 6);

        let _led = pin.into_push_pull_output(Speed::Level3);
        assert_eq!((regs.ctl.get() >> 12) & 0b11, Mode::Output as u32);
        assert_eq!(regs.ctl.get() | (0b11 << 12), 0xFFFF_FFFF);
        assert_eq!((regs.ospd.get() >> 12) & 0b11, 3);
        assert_eq!(regs.omode.get(), 0);
    }

    #[test]
    fn alternate_function_high_pins() {
        let regs = fake_regs::<RegisterBlock>();
        Pin::with_regs(regs, Port::A, 10).into_alternate(AF1, OutputType::PushPull, Speed::Level3);
        Pin::with_regs(regs, Port::A, 5).into_alternate(AF5, OutputType::PushPull, Speed::Level3);

        assert_eq!(regs.afsel1.get(), 1 << 8);
        assert_eq!(regs.afsel0.get(), 5 << 20);
        assert_eq!((regs.ctl.get() >> 20) & 0b11, Mode::Alternate as u32);
    }

    #[test]
    fn bit_operations_use_set_clear_registers() {
        let regs = fake_regs::<RegisterBlock>();
        let mut out = Pin::with_regs(regs, Port::D, 3).into_push_pull_output(Speed::Level1);

        out.set_high().unwrap();
        assert_eq!(peek(regs, 0x18), 1 << 3);
        out.set_low().unwrap();
        assert_eq!(peek(regs, 0x28), 1 << 3);
        out.toggle().unwrap();
        assert_eq!(peek(regs, 0x2C), 1 << 3);
    }

    #[test]
    fn input_reads_istat() {
        let regs = fake_regs::<RegisterBlock>();
        let input = Pin::with_regs(regs, Port::A, 0).into_input(Pull::Down);
        assert_eq!(regs.pud.get(), Pull::Down as u32);
        assert!(input.is_low().unwrap());

        poke(regs, 0x10, 0x0001);
        assert!(input.is_high().unwrap());
    }
}
