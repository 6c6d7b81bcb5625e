//! External interrupt/event controller (EXTI).
//!
//! 24 lines; lines 0..=15 follow the GPIO pin of the same number, the rest
//! are wired to internal sources. The pending register is write-1-to-clear.

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::ReadWrite;
use tock_registers::register_structs;

use crate::pac;
use crate::static_ref::StaticRef;

register_structs! {
    pub RegisterBlock {
        (0x00 => inten: ReadWrite<u32>),
        (0x04 => even: ReadWrite<u32>),
        (0x08 => rten: ReadWrite<u32>),
        (0x0C => ften: ReadWrite<u32>),
        (0x10 => swiev: ReadWrite<u32>),
        (0x14 => pd: ReadWrite<u32>),
        (0x18 => @END),
    }
}

pub const LINES: u8 = 24;

/// One EXTI line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Line(u8);

impl Line {
    pub const fn new(line: u8) -> Option<Line> {
        if line < LINES {
            Some(Line(line))
        } else {
            None
        }
    }

    /// The line a GPIO pin is routed to
    pub const fn gpio(pin: u8) -> Line {
        Line(pin & 0x0F)
    }

    pub const fn number(self) -> u8 {
        self.0
    }

    const fn mask(self) -> u32 {
        1 << self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Interrupt,
    Event,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    Rising,
    Falling,
    Both,
    None,
}

pub struct Exti {
    regs: StaticRef<RegisterBlock>,
}

impl Exti {
    pub fn new(_exti: pac::EXTI) -> Self {
        Exti {
            regs: pac::EXTI::regs(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_regs(regs: StaticRef<RegisterBlock>) -> Self {
        Exti { regs }
    }

    fn set_bits(reg: &ReadWrite<u32>, mask: u32) {
        reg.set(reg.get() | mask);
    }

    fn clear_bits(reg: &ReadWrite<u32>, mask: u32) {
        reg.set(reg.get() & !mask);
    }

    /// Returns every enable register to its reset value
    pub fn deinit(&mut self) {
        self.regs.inten.set(0);
        self.regs.even.set(0);
        self.regs.rten.set(0);
        self.regs.ften.set(0);
        self.regs.swiev.set(0);
    }

    /// Configures a line from scratch: the line is first removed from the
    /// interrupt, event and both edge registers.
    pub fn init(&mut self, line: Line, mode: Mode, trigger: Trigger) {
        let mask = line.mask();
        Self::clear_bits(&self.regs.inten, mask);
        Self::clear_bits(&self.regs.even, mask);
        Self::clear_bits(&self.regs.rten, mask);
        Self::clear_bits(&self.regs.ften, mask);

        match mode {
            Mode::Interrupt => Self::set_bits(&self.regs.inten, mask),
            Mode::Event => Self::set_bits(&self.regs.even, mask),
        }

        match trigger {
            Trigger::Rising => {
                Self::set_bits(&self.regs.rten, mask);
                Self::clear_bits(&self.regs.ften, mask);
            }
            Trigger::Falling => {
                Self::clear_bits(&self.regs.rten, mask);
                Self::set_bits(&self.regs.ften, mask);
            }
            Trigger::Both => {
                Self::set_bits(&self.regs.rten, mask);
                Self::set_bits(&self.regs.ften, mask);
            }
            Trigger::None => {}
        }
    }

    pub fn interrupt_enable(&mut self, line: Line) {
        Self::set_bits(&self.regs.inten, line.mask());
    }

    pub fn interrupt_disable(&mut self, line: Line) {
        Self::clear_bits(&self.regs.inten, line.mask());
    }

    pub fn event_enable(&mut self, line: Line) {
        Self::set_bits(&self.regs.even, line.mask());
    }

    pub fn event_disable(&mut self, line: Line) {
        Self::clear_bits(&self.regs.even, line.mask());
    }

    pub fn software_interrupt_enable(&mut self, line: Line) {
        Self::set_bits(&self.regs.swiev, line.mask());
    }

    pub fn software_interrupt_disable(&mut self, line: Line) {
        Self::clear_bits(&self.regs.swiev, line.mask());
    }

    /// Pending flag of the line
    pub fn flag_get(&self, line: Line) -> bool {
        self.regs.pd.get() & line.mask() != 0
    }

    pub fn flag_clear(&mut self, line: Line) {
        self.regs.pd.set(line.mask());
    }

    /// Pending flag of the line, whether or not its interrupt is enabled
    pub fn interrupt_flag_get(&self, line: Line) -> bool {
        self.flag_get(line)
    }

    pub fn interrupt_flag_clear(&mut self, line: Line) {
        self.regs.pd.set(line.mask());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fake_regs;

    #[test]
    fn line_bounds() {
        assert_eq!(Line::new(23).map(Line::number), Some(23));
        assert_eq!(Line::new(24), None);
        assert_eq!(Line::gpio(4).number(), 4);
    }

    #[test]
    fn init_reconfigures_the_line_only() {
        let regs = fake_regs::<RegisterBlock>();
        let mut exti = Exti::with_regs(regs);
        let line = Line::gpio(4);

        regs.even.set(0x11);
        regs.ften.set(0x11);
        regs.inten.set(0x01);

        exti.init(line, Mode::Interrupt, Trigger::Rising);
        assert_eq!(regs.inten.get(), 0x11);
        assert_eq!(regs.even.get(), 0x01);
        assert_eq!(regs.rten.get(), 0x10);
        assert_eq!(regs.ften.get(), 0x01);

        exti.init(line, Mode::Event, Trigger::Both);
        assert_eq!(regs.inten.get(), 0x01);
        assert_eq!(regs.even.get(), 0x11);
        assert_eq!(regs.rten.get(), 0x10);
        assert_eq!(regs.ften.get(), 0x11);

        exti.init(line, Mode::Interrupt, Trigger::None);
        assert_eq!(regs.rten.get(), 0);
        assert_eq!(regs.ften.get(), 0x01);
    }

    #[test]
    fn flag_clear_writes_only_the_line() {
        let regs = fake_regs::<RegisterBlock>();
        let mut exti = Exti::with_regs(regs);

        regs.pd.set(0b1_0001);
        assert!(exti.flag_get(Line::gpio(0)));
        assert!(exti.interrupt_flag_get(Line::gpio(0)));

        exti.flag_clear(Line::gpio(4));
        assert_eq!(regs.pd.get(), 0b1_0000);
    }

    #[test]
    fn interrupt_flag_follows_pending_while_masked() {
        let regs = fake_regs::<RegisterBlock>();
        let exti = Exti::with_regs(regs);

        regs.pd.set(0b1);
        regs.inten.set(0);
        assert!(exti.flag_get(Line::gpio(0)));
        assert!(exti.interrupt_flag_get(Line::gpio(0)));
        assert!(!exti.interrupt_flag_get(Line::gpio(1)));
    }

    #[test]
    fn deinit_zeroes_enables() {
        let regs = fake_regs::<RegisterBlock>();
        let mut exti = Exti::with_regs(regs);

        exti.init(Line::gpio(0), Mode::Interrupt, Trigger::Both);
        exti.software_interrupt_enable(Line::gpio(0));
        exti.deinit();
        assert_eq!(regs.inten.get(), 0);
        assert_eq!(regs.rten.get(), 0);
        assert_eq!(regs.ften.get(), 0);
        assert_eq!(regs.swiev.get(), 0);
    }
}
