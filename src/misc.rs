//! NVIC, SCB and SysTick helpers.
//!
//! Thin wrappers over the `cortex-m` core peripherals with the vendor's
//! priority and vector table conventions.

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{NVIC, SCB, SYST};

use crate::pac::{Interrupt, NVIC_PRIO_BITS};

pub const VECTTAB_RAM: u32 = crate::pac::SRAM_BASE;
pub const VECTTAB_FLASH: u32 = crate::pac::FLASH_BASE;

const VECTTAB_OFFSET_MASK: u32 = 0x1FFF_FF80;
const SCR_LOWPOWER_MASK: u32 = 0x16;

/// SCR low power control bits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LowPowerMode {
    /// Re-enter sleep when the last handler returns
    SleepOnExit = 0x02,
    /// Use deep-sleep rather than sleep
    DeepSleep = 0x04,
    /// Pending interrupts (even disabled ones) wake the core
    WakeByAllInt = 0x10,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SysTickSource {
    Hclk,
    HclkDiv8,
}

/// IPR byte for a vendor priority. Only the top `NVIC_PRIO_BITS` of the byte
/// are implemented.
pub fn priority_bits(priority: u8) -> u8 {
    (priority & 0x03) << (8 - NVIC_PRIO_BITS)
}

pub fn vector_table_address(base: u32, offset: u32) -> u32 {
    base | (offset & VECTTAB_OFFSET_MASK)
}

fn lowpower_bits(mode: LowPowerMode) -> u32 {
    mode as u32 & SCR_LOWPOWER_MASK
}

/// Sets the priority of `irq` and unmasks it.
pub fn nvic_irq_enable(nvic: &mut NVIC, irq: Interrupt, priority: u8) {
    // SAFETY: priority-based critical sections are not used with these
    // handlers; RTIC applications let the framework program the NVIC.
    unsafe {
        nvic.set_priority(irq, priority_bits(priority));
        NVIC::unmask(irq);
    }
}

pub fn nvic_irq_disable(irq: Interrupt) {
    NVIC::mask(irq);
}

/// Relocates the vector table
pub fn nvic_vector_table_set(scb: &mut SCB, base: u32, offset: u32) {
    // SAFETY: the caller places a valid vector table at the address
    unsafe { scb.vtor.write(vector_table_address(base, offset)) };
    cortex_m::asm::dsb();
}

pub fn nvic_system_reset() -> ! {
    SCB::sys_reset()
}

pub fn system_lowpower_set(scb: &mut SCB, mode: LowPowerMode) {
    // SAFETY: only the low power bits are touched
    unsafe { scb.scr.modify(|scr| scr | lowpower_bits(mode)) };
}

pub fn system_lowpower_reset(scb: &mut SCB, mode: LowPowerMode) {
    // SAFETY: as above
    unsafe { scb.scr.modify(|scr| scr & !lowpower_bits(mode)) };
}

pub fn systick_clksource_set(syst: &mut SYST, source: SysTickSource) {
    match source {
        SysTickSource::Hclk => syst.set_clock_source(SystClkSource::Core),
        SysTickSource::HclkDiv8 => syst.set_clock_source(SystClkSource::External),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_uses_top_two_bits() {
        assert_eq!(priority_bits(0), 0x00);
        assert_eq!(priority_bits(1), 0x40);
        assert_eq!(priority_bits(2), 0x80);
        assert_eq!(priority_bits(3), 0xC0);
        // out of range priorities wrap into 0..=3
        assert_eq!(priority_bits(6), 0x80);
    }

    #[test]
    fn vector_table_offset_is_aligned() {
        assert_eq!(vector_table_address(VECTTAB_FLASH, 0x200), 0x0800_0200);
        assert_eq!(vector_table_address(VECTTAB_FLASH, 0x27F), 0x0800_0200);
        assert_eq!(vector_table_address(VECTTAB_RAM, 0xE000_0100), 0x2000_0100);
    }

    #[test]
    fn lowpower_mask() {
        assert_eq!(lowpower_bits(LowPowerMode::SleepOnExit), 0x02);
        assert_eq!(lowpower_bits(LowPowerMode::DeepSleep), 0x04);
        assert_eq!(lowpower_bits(LowPowerMode::WakeByAllInt), 0x10);
    }
}
