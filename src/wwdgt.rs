//! Window watchdog timer (WWDGT).

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

use crate::pac;
use crate::rcu::{Periph, Rcu};
use crate::static_ref::StaticRef;

register_structs! {
    pub RegisterBlock {
        (0x00 => ctl: ReadWrite<u32, CTL::Register>),
        (0x04 => cfg: ReadWrite<u32, CFG::Register>),
        (0x08 => stat: ReadWrite<u32, STAT::Register>),
        (0x0C => @END),
    }
}

register_bitfields![u32,
    CTL [
        CNT OFFSET(0) NUMBITS(7) [],
        WDGTEN OFFSET(7) NUMBITS(1) []
    ],
    CFG [
        WIN OFFSET(0) NUMBITS(7) [],
        PSC_LO OFFSET(7) NUMBITS(2) [],
        EWIE OFFSET(9) NUMBITS(1) [],
        PSC_HI OFFSET(16) NUMBITS(2) []
    ],
    STAT [
        EWIF OFFSET(0) NUMBITS(1) []
    ]
];

/// Counter clock = (PCLK / 4096) / prescaler
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    Div1 = 0,
    Div2 = 1,
    Div4 = 2,
    Div8 = 3,
    Div16 = 4,
    Div32 = 5,
    Div64 = 6,
    Div128 = 7,
    Div256 = 8,
    Div512 = 9,
    Div1024 = 10,
    Div2048 = 11,
    Div4096 = 12,
    Div8192 = 13,
}

impl Prescaler {
    /// The prescaler is split over CFG bits 7..8 and 16..17
    pub fn bits(self) -> u32 {
        let v = self as u32;
        ((v & 0x3) << 7) | ((v >> 2) << 16)
    }
}

pub struct Wwdgt {
    regs: StaticRef<RegisterBlock>,
}

impl Wwdgt {
    pub fn new(_wwdgt: pac::WWDGT) -> Self {
        Wwdgt {
            regs: pac::WWDGT::regs(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_regs(regs: StaticRef<RegisterBlock>) -> Self {
        Wwdgt { regs }
    }

    pub fn deinit(&mut self, rcu: &mut Rcu) {
        rcu.reset(Periph::Wwdgt);
    }

    /// Starts the watchdog. It cannot be stopped again short of a reset.
    pub fn enable(&mut self) {
        self.regs.ctl.modify(CTL::WDGTEN::SET);
    }

    pub fn prescaler_value_config(&mut self, prescaler: Prescaler) {
        let v = prescaler as u32;
        self.regs
            .cfg
            .modify(CFG::PSC_LO.val(v & 0x3) + CFG::PSC_HI.val(v >> 2));
    }

    pub fn window_value_config(&mut self, window: u8) {
        self.regs.cfg.modify(CFG::WIN.val(u32::from(window & 0x7F)));
    }

    /// Reloads the down-counter
    pub fn counter_update(&mut self, counter: u8) {
        self.regs.ctl.write(CTL::CNT.val(u32::from(counter & 0x7F)));
    }

    pub fn config(&mut self, counter: u8, window: u8, prescaler: Prescaler) {
        self.regs.ctl.write(CTL::CNT.val(u32::from(counter & 0x7F)));
        self.regs.cfg.set(u32::from(window & 0x7F) | prescaler.bits());
    }

    /// Early wakeup flag
    pub fn flag_get(&self) -> bool {
        self.regs.stat.is_set(STAT::EWIF)
    }

    pub fn flag_clear(&mut self) {
        self.regs.stat.modify(STAT::EWIF::CLEAR);
    }

    /// Early wakeup interrupt. Only a reset disables it.
    pub fn interrupt_enable(&mut self) {
        self.regs.cfg.modify(CFG::EWIE::SET);
    }
}
