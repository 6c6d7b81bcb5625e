//! System configuration controller: EXTI source routing.

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::ReadWrite;
use tock_registers::register_structs;

use crate::gpio::Port;
use crate::pac;
use crate::static_ref::StaticRef;

register_structs! {
    pub RegisterBlock {
        (0x00 => cfg0: ReadWrite<u32>),
        (0x04 => _reserved0),
        (0x08 => extiss: [ReadWrite<u32>; 4]),
        (0x18 => cfg2: ReadWrite<u32>),
        (0x1C => @END),
    }
}

pub struct Syscfg {
    regs: StaticRef<RegisterBlock>,
}

impl Syscfg {
    pub fn new(_syscfg: pac::SYSCFG) -> Self {
        Syscfg {
            regs: pac::SYSCFG::regs(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_regs(regs: StaticRef<RegisterBlock>) -> Self {
        Syscfg { regs }
    }

    /// Connects `port` to EXTI line `pin` (0..=15). Each EXTISS register
    /// holds four 4-bit source fields.
    pub fn exti_line_config(&mut self, port: Port, pin: u8) {
        let pin = usize::from(pin & 0x0F);
        let reg = &self.regs.extiss[pin / 4];
        let shift = (pin % 4) * 4;
        reg.set((reg.get() & !(0xF << shift)) | (port.exti_source() << shift));
    }
}
