//! Power management unit (PMU).

use cortex_m::peripheral::SCB;
use tock_registers::interfaces::{ReadWriteable, Readable};
use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

use crate::pac;
use crate::static_ref::StaticRef;

register_structs! {
    pub RegisterBlock {
        (0x00 => ctl0: ReadWrite<u32, CTL0::Register>),
        (0x04 => cs0: ReadWrite<u32, CS0::Register>),
        (0x08 => @END),
    }
}

register_bitfields![u32,
    CTL0 [
        LDOLP OFFSET(0) NUMBITS(1) [],
        STBMOD OFFSET(1) NUMBITS(1) [],
        WURST OFFSET(2) NUMBITS(1) [],
        STBRST OFFSET(3) NUMBITS(1) [],
        LVDEN OFFSET(4) NUMBITS(1) [],
        LVDT OFFSET(5) NUMBITS(3) [],
        BKPWEN OFFSET(8) NUMBITS(1) []
    ],
    CS0 [
        WUF OFFSET(0) NUMBITS(1) [],
        STBF OFFSET(1) NUMBITS(1) [],
        LVDF OFFSET(2) NUMBITS(1) []
    ]
];

/// Instruction used to enter a low power mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LowPowerEntry {
    /// Wake on any enabled interrupt
    Wfi,
    /// Wake on an event
    Wfe,
}

/// LDO state during deep-sleep
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ldo {
    Normal,
    LowPower,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Flag {
    Wakeup,
    Standby,
    LowVoltage,
}

fn wait(entry: LowPowerEntry) {
    match entry {
        LowPowerEntry::Wfi => cortex_m::asm::wfi(),
        LowPowerEntry::Wfe => cortex_m::asm::wfe(),
    }
}

pub struct Pmu {
    regs: StaticRef<RegisterBlock>,
}

impl Pmu {
    pub fn new(_pmu: pac::PMU) -> Self {
        Pmu {
            regs: pac::PMU::regs(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_regs(regs: StaticRef<RegisterBlock>) -> Self {
        Pmu { regs }
    }

    /// Unlocks writes to the backup domain (RTC, RCU BDCTL)
    pub fn backup_write_enable(&mut self) {
        self.regs.ctl0.modify(CTL0::BKPWEN::SET);
    }

    pub fn backup_write_disable(&mut self) {
        self.regs.ctl0.modify(CTL0::BKPWEN::CLEAR);
    }

    pub fn flag_get(&self, flag: Flag) -> bool {
        match flag {
            Flag::Wakeup => self.regs.cs0.is_set(CS0::WUF),
            Flag::Standby => self.regs.cs0.is_set(CS0::STBF),
            Flag::LowVoltage => self.regs.cs0.is_set(CS0::LVDF),
        }
    }

    /// Clears the wake-up or standby flag
    pub fn flag_clear(&mut self, flag: Flag) {
        match flag {
            Flag::Wakeup => self.regs.ctl0.modify(CTL0::WURST::SET),
            Flag::Standby => self.regs.ctl0.modify(CTL0::STBRST::SET),
            Flag::LowVoltage => {}
        }
    }

    /// Sleep: the core clock stops, peripherals keep running.
    pub fn to_sleepmode(&mut self, scb: &mut SCB, entry: LowPowerEntry) {
        scb.clear_sleepdeep();
        wait(entry);
    }

    fn deepsleep_prepare(&mut self, ldo: Ldo) {
        self.regs.ctl0.modify(
            CTL0::STBMOD::CLEAR + CTL0::LDOLP.val(u32::from(ldo == Ldo::LowPower)),
        );
    }

    /// Deep-sleep: all clocks in the core domain stop. Returns after
    /// wake-up with SLEEPDEEP cleared again.
    pub fn to_deepsleepmode(&mut self, scb: &mut SCB, ldo: Ldo, entry: LowPowerEntry) {
        self.deepsleep_prepare(ldo);
        scb.set_sleepdeep();
        wait(entry);
        scb.clear_sleepdeep();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fake_regs;

    #[test]
    fn backup_write() {
        let regs = fake_regs::<RegisterBlock>();
        let mut pmu = Pmu::with_regs(regs);

        pmu.backup_write_enable();
        assert_eq!(regs.ctl0.get(), 1 << 8);
        pmu.backup_write_disable();
        assert_eq!(regs.ctl0.get(), 0);
    }

    #[test]
    fn deepsleep_selects_ldo() {
        let regs = fake_regs::<RegisterBlock>();
        let mut pmu = Pmu::with_regs(regs);

        regs.ctl0.modify(CTL0::STBMOD::SET + CTL0::BKPWEN::SET);
        pmu.deepsleep_prepare(Ldo::LowPower);
        assert_eq!(regs.ctl0.get(), (1 << 8) | 1);
        pmu.deepsleep_prepare(Ldo::Normal);
        assert_eq!(regs.ctl0.get(), 1 << 8);
    }

    #[test]
    fn flags() {
        let regs = fake_regs::<RegisterBlock>();
        let mut pmu = Pmu::with_regs(regs);

        regs.cs0.modify(CS0::WUF::SET);
        assert!(pmu.flag_get(Flag::Wakeup));
        assert!(!pmu.flag_get(Flag::Standby));
        pmu.flag_clear(Flag::Wakeup);
        assert!(regs.ctl0.is_set(CTL0::WURST));
    }
}
