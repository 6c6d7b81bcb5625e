//! Universal synchronous/asynchronous receiver transmitter (USART).
//!
//! Enough of the peripheral for an 8N1 console: baud rate, blocking writes,
//! polled or interrupt driven reads, and `core::fmt::Write` so `write!` /
//! `writeln!` work. Line endings on the console are `\r\n`.

use core::convert::Infallible;
use core::fmt;

use embedded_hal::serial;
use nb::block;
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

use crate::pac;
use crate::rcu::{Clocks, Periph, Rcu};
use crate::static_ref::StaticRef;

register_structs! {
    pub RegisterBlock {
        (0x00 => ctl0: ReadWrite<u32, CTL0::Register>),
        (0x04 => ctl1: ReadWrite<u32>),
        (0x08 => ctl2: ReadWrite<u32>),
        (0x0C => baud: ReadWrite<u32>),
        (0x10 => gp: ReadWrite<u32>),
        (0x14 => rt: ReadWrite<u32>),
        (0x18 => cmd: ReadWrite<u32>),
        (0x1C => stat: ReadWrite<u32, STAT::Register>),
        (0x20 => intc: ReadWrite<u32, INTC::Register>),
        (0x24 => rdata: ReadWrite<u32>),
        (0x28 => tdata: ReadWrite<u32>),
        (0x2C => @END),
    }
}

register_bitfields![u32,
    CTL0 [
        UEN OFFSET(0) NUMBITS(1) [],
        REN OFFSET(2) NUMBITS(1) [],
        TEN OFFSET(3) NUMBITS(1) [],
        IDLEIE OFFSET(4) NUMBITS(1) [],
        RBNEIE OFFSET(5) NUMBITS(1) [],
        TCIE OFFSET(6) NUMBITS(1) [],
        TBEIE OFFSET(7) NUMBITS(1) [],
        PCEN OFFSET(10) NUMBITS(1) [],
        WL OFFSET(12) NUMBITS(1) [],
        OVSMOD OFFSET(15) NUMBITS(1) []
    ],
    STAT [
        PERR OFFSET(0) NUMBITS(1) [],
        FERR OFFSET(1) NUMBITS(1) [],
        NERR OFFSET(2) NUMBITS(1) [],
        ORERR OFFSET(3) NUMBITS(1) [],
        IDLEF OFFSET(4) NUMBITS(1) [],
        RBNE OFFSET(5) NUMBITS(1) [],
        TC OFFSET(6) NUMBITS(1) [],
        TBE OFFSET(7) NUMBITS(1) [],
        BSY OFFSET(16) NUMBITS(1) []
    ],
    INTC [
        PEC OFFSET(0) NUMBITS(1) [],
        FEC OFFSET(1) NUMBITS(1) [],
        NEC OFFSET(2) NUMBITS(1) [],
        OREC OFFSET(3) NUMBITS(1) [],
        IDLEC OFFSET(4) NUMBITS(1) [],
        TCC OFFSET(6) NUMBITS(1) []
    ]
];

/// Serial receive errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    Framing,
    Noise,
    Overrun,
    Parity,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::Framing => "framing error",
            Error::Noise => "noise error",
            Error::Overrun => "receive overrun",
            Error::Parity => "parity error",
        };
        f.write_str(msg)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Instance {
    Usart0,
    Usart1,
}

impl Instance {
    fn periph(self) -> Periph {
        match self {
            Instance::Usart0 => Periph::Usart0,
            Instance::Usart1 => Periph::Usart1,
        }
    }
}

/// Interrupt events
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Received data ready to be read
    Rbne,
    /// Transmit data register empty
    Tbe,
    /// Transmission complete
    Tc,
    Idle,
}

/// BAUD register value for 16x oversampling: the divider is rounded to the
/// nearest integer and split into mantissa (bits 4..15) and fraction (bits
/// 0..3).
pub fn baud_divider(pclk: u32, baudrate: u32) -> u32 {
    let udiv = (pclk + baudrate / 2) / baudrate;
    (udiv & 0x0000_FFF0) | (udiv & 0x0000_000F)
}

pub struct Usart {
    regs: StaticRef<RegisterBlock>,
    instance: Instance,
}

impl Usart {
    /// Resets USART0 and sets it up for 8N1 at `baudrate`
    pub fn usart0(_usart: pac::USART0, rcu: &mut Rcu, clocks: &Clocks, baudrate: u32) -> Self {
        let mut usart = Usart {
            regs: pac::USART0::regs(),
            instance: Instance::Usart0,
        };
        usart.init(rcu, clocks, baudrate);
        usart
    }

    /// Resets USART1 and sets it up for 8N1 at `baudrate`
    pub fn usart1(_usart: pac::USART1, rcu: &mut Rcu, clocks: &Clocks, baudrate: u32) -> Self {
        let mut usart = Usart {
            regs: pac::USART1::regs(),
            instance: Instance::Usart1,
        };
        usart.init(rcu, clocks, baudrate);
        usart
    }

    #[cfg(test)]
    pub(crate) fn with_regs(regs: StaticRef<RegisterBlock>, instance: Instance) -> Self {
        Usart { regs, instance }
    }

    fn init(&mut self, rcu: &mut Rcu, clocks: &Clocks, baudrate: u32) {
        let periph = self.instance.periph();
        rcu.enable(periph);
        rcu.reset(periph);
        self.configure(clocks.apb(), baudrate);
    }

    fn configure(&mut self, pclk: u32, baudrate: u32) {
        self.regs.ctl0.modify(CTL0::UEN::CLEAR);
        self.regs.baud.set(baud_divider(pclk, baudrate));
        self.regs
            .ctl0
            .modify(CTL0::REN::SET + CTL0::TEN::SET + CTL0::UEN::SET);
    }

    pub fn instance(&self) -> Instance {
        self.instance
    }

    /// Starts listening for an `event`
    pub fn listen(&mut self, event: Event) {
        match event {
            Event::Rbne => self.regs.ctl0.modify(CTL0::RBNEIE::SET),
            Event::Tbe => self.regs.ctl0.modify(CTL0::TBEIE::SET),
            Event::Tc => self.regs.ctl0.modify(CTL0::TCIE::SET),
            Event::Idle => self.regs.ctl0.modify(CTL0::IDLEIE::SET),
        }
    }

    /// Stops listening for an `event`
    pub fn unlisten(&mut self, event: Event) {
        match event {
            Event::Rbne => self.regs.ctl0.modify(CTL0::RBNEIE::CLEAR),
            Event::Tbe => self.regs.ctl0.modify(CTL0::TBEIE::CLEAR),
            Event::Tc => self.regs.ctl0.modify(CTL0::TCIE::CLEAR),
            Event::Idle => self.regs.ctl0.modify(CTL0::IDLEIE::CLEAR),
        }
    }

    pub fn is_rx_not_empty(&self) -> bool {
        self.regs.stat.is_set(STAT::RBNE)
    }

    pub fn is_tx_empty(&self) -> bool {
        self.regs.stat.is_set(STAT::TBE)
    }

    #[inline]
    pub fn write_byte(&mut self, b: u8) {
        let _ = block!(serial::Write::write(self, b));
    }

    pub fn write_str(&mut self, s: &str) {
        for &b in s.as_bytes() {
            self.write_byte(b);
        }
    }

    /// Write string and CRLF terminator.
    #[inline]
    pub fn println(&mut self, s: &str) {
        self.write_str(s);
        self.write_str("\r\n");
    }

    /// Block until the last frame has left the shift register.
    #[inline]
    pub fn flush(&mut self) {
        let _ = block!(serial::Write::flush(self));
    }
}

impl serial::Read<u8> for Usart {
    type Error = Error;

    fn read(&mut self) -> nb::Result<u8, Error> {
        let stat = &self.regs.stat;
        let err = if stat.is_set(STAT::PERR) {
            Some((Error::Parity, INTC::PEC::SET))
        } else if stat.is_set(STAT::FERR) {
            Some((Error::Framing, INTC::FEC::SET))
        } else if stat.is_set(STAT::NERR) {
            Some((Error::Noise, INTC::NEC::SET))
        } else if stat.is_set(STAT::ORERR) {
            Some((Error::Overrun, INTC::OREC::SET))
        } else {
            None
        };

        if let Some((err, clear)) = err {
            self.regs.intc.write(clear);
            return Err(nb::Error::Other(err));
        }

        if stat.is_set(STAT::RBNE) {
            Ok((self.regs.rdata.get() & 0xFF) as u8)
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

impl serial::Write<u8> for Usart {
    type Error = Infallible;

    fn write(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        if self.regs.stat.is_set(STAT::TBE) {
            self.regs.tdata.set(u32::from(byte));
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    fn flush(&mut self) -> nb::Result<(), Infallible> {
        if self.regs.stat.is_set(STAT::TC) {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

// Implement `core::fmt::Write` so we can use `write!` / `writeln!` on `Usart`.
impl fmt::Write for Usart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Usart::write_str(self, s);
        Ok(())
    }
}
