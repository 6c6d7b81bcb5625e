//! Peripheral access for the GD32C2x1.
//!
//! There is no generated access crate for this part, so the memory map, the
//! interrupt numbers and the vector table live here. The register blocks
//! themselves are declared next to the driver that owns them.
//!
//! `Peripherals::take()` hands out one zero-sized token per peripheral. A
//! driver constructor consumes the token, so only one driver can own a given
//! register block. GPIO ports are not tokenised: pins are addressed through
//! the board tables (see [`crate::gpio::Port`]).

use core::marker::PhantomData;

use crate::static_ref::StaticRef;

/// Number of priority bits implemented by the NVIC.
pub const NVIC_PRIO_BITS: u8 = 2;

pub const FLASH_BASE: u32 = 0x0800_0000;
pub const SRAM_BASE: u32 = 0x2000_0000;

pub const APB1_BUS_BASE: u32 = 0x4000_0000;
pub const APB2_BUS_BASE: u32 = 0x4001_0000;
pub const AHB1_BUS_BASE: u32 = 0x4002_0000;
pub const AHB2_BUS_BASE: u32 = 0x4800_0000;

pub const TIMER2_BASE: u32 = APB1_BUS_BASE + 0x0400;
pub const TIMER13_BASE: u32 = APB1_BUS_BASE + 0x2000;
pub const RTC_BASE: u32 = APB1_BUS_BASE + 0x2800;
pub const WWDGT_BASE: u32 = APB1_BUS_BASE + 0x2C00;
pub const SPI1_BASE: u32 = APB1_BUS_BASE + 0x3800;
pub const USART1_BASE: u32 = APB1_BUS_BASE + 0x4400;
pub const PMU_BASE: u32 = APB1_BUS_BASE + 0x7000;

pub const SYSCFG_BASE: u32 = APB2_BUS_BASE;
pub const EXTI_BASE: u32 = APB2_BUS_BASE + 0x0400;
pub const ADC_BASE: u32 = APB2_BUS_BASE + 0x2400;
pub const TIMER0_BASE: u32 = APB2_BUS_BASE + 0x2C00;
pub const SPI0_BASE: u32 = SPI1_BASE + 0xF800;
pub const USART0_BASE: u32 = APB2_BUS_BASE + 0x3800;
pub const TIMER15_BASE: u32 = APB2_BUS_BASE + 0x4400;
pub const TIMER16_BASE: u32 = APB2_BUS_BASE + 0x4800;

pub const RCU_BASE: u32 = AHB1_BUS_BASE + 0x1000;

pub const GPIOA_BASE: u32 = AHB2_BUS_BASE;
pub const GPIOB_BASE: u32 = AHB2_BUS_BASE + 0x0400;
pub const GPIOC_BASE: u32 = AHB2_BUS_BASE + 0x0800;
pub const GPIOD_BASE: u32 = AHB2_BUS_BASE + 0x0C00;
pub const GPIOF_BASE: u32 = AHB2_BUS_BASE + 0x1400;

/// Device interrupt numbers.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Interrupt {
    WWDGT = 0,
    LVD = 1,
    RTC = 2,
    FMC = 3,
    RCU = 4,
    EXTI0 = 5,
    EXTI1 = 6,
    EXTI2 = 7,
    EXTI3 = 8,
    EXTI4 = 9,
    DMA_CHANNEL0 = 10,
    DMA_CHANNEL1_2 = 11,
    DMA_CHANNEL3_4 = 12,
    ADC = 13,
    TIMER0_BRK_UP_TRG_COM = 14,
    TIMER0_CHANNEL = 15,
    TIMER2 = 16,
    TIMER13 = 17,
    TIMER15 = 18,
    TIMER16 = 19,
    I2C0_EV = 20,
    I2C1_EV = 21,
    SPI0 = 22,
    SPI1 = 23,
    USART0 = 24,
    USART1 = 25,
    EXTI5_9 = 26,
    EXTI10_15 = 27,
    I2C0_ER = 28,
    I2C1_ER = 29,
}

unsafe impl cortex_m::interrupt::InterruptNumber for Interrupt {
    #[inline(always)]
    fn number(self) -> u16 {
        self as u16
    }
}

#[cfg(feature = "rt")]
pub use self::Interrupt as interrupt;
#[cfg(feature = "rt")]
pub use cortex_m_rt::interrupt;

#[cfg(feature = "rt")]
extern "C" {
    fn WWDGT();
    fn LVD();
    fn RTC();
    fn FMC();
    fn RCU();
    fn EXTI0();
    fn EXTI1();
    fn EXTI2();
    fn EXTI3();
    fn EXTI4();
    fn DMA_CHANNEL0();
    fn DMA_CHANNEL1_2();
    fn DMA_CHANNEL3_4();
    fn ADC();
    fn TIMER0_BRK_UP_TRG_COM();
    fn TIMER0_CHANNEL();
    fn TIMER2();
    fn TIMER13();
    fn TIMER15();
    fn TIMER16();
    fn I2C0_EV();
    fn I2C1_EV();
    fn SPI0();
    fn SPI1();
    fn USART0();
    fn USART1();
    fn EXTI5_9();
    fn EXTI10_15();
    fn I2C0_ER();
    fn I2C1_ER();
}

#[doc(hidden)]
pub union Vector {
    _handler: unsafe extern "C" fn(),
    _reserved: u32,
}

#[cfg(feature = "rt")]
#[doc(hidden)]
#[link_section = ".vector_table.interrupts"]
#[no_mangle]
pub static __INTERRUPTS: [Vector; 30] = [
    Vector { _handler: WWDGT },
    Vector { _handler: LVD },
    Vector { _handler: RTC },
    Vector { _handler: FMC },
    Vector { _handler: RCU },
    Vector { _handler: EXTI0 },
    Vector { _handler: EXTI1 },
    Vector { _handler: EXTI2 },
    Vector { _handler: EXTI3 },
    Vector { _handler: EXTI4 },
    Vector { _handler: DMA_CHANNEL0 },
    Vector { _handler: DMA_CHANNEL1_2 },
    Vector { _handler: DMA_CHANNEL3_4 },
    Vector { _handler: ADC },
    Vector { _handler: TIMER0_BRK_UP_TRG_COM },
    Vector { _handler: TIMER0_CHANNEL },
    Vector { _handler: TIMER2 },
    Vector { _handler: TIMER13 },
    Vector { _handler: TIMER15 },
    Vector { _handler: TIMER16 },
    Vector { _handler: I2C0_EV },
    Vector { _handler: I2C1_EV },
    Vector { _handler: SPI0 },
    Vector { _handler: SPI1 },
    Vector { _handler: USART0 },
    Vector { _handler: USART1 },
    Vector { _handler: EXTI5_9 },
    Vector { _handler: EXTI10_15 },
    Vector { _handler: I2C0_ER },
    Vector { _handler: I2C1_ER },
];

macro_rules! peripherals {
    ($($(#[$attr:meta])* $NAME:ident: $Block:ty = $base:expr,)+) => {
        $(
            $(#[$attr])*
            pub struct $NAME {
                _marker: PhantomData<*const ()>,
            }

            unsafe impl Send for $NAME {}

            impl $NAME {
                /// Pointer to the register block
                pub const PTR: *const $Block = $base as *const _;

                #[inline(always)]
                pub const fn ptr() -> *const $Block {
                    Self::PTR
                }

                pub(crate) fn regs() -> StaticRef<$Block> {
                    // SAFETY: fixed, aligned MMIO address of this peripheral
                    unsafe { StaticRef::new(Self::PTR) }
                }
            }
        )+

        /// All the device peripherals
        #[allow(non_snake_case)]
        pub struct Peripherals {
            $(pub $NAME: $NAME,)+
        }

        impl Peripherals {
            /// Returns all the peripherals *once*
            #[inline]
            pub fn take() -> Option<Self> {
                cortex_m::interrupt::free(|_| {
                    // SAFETY: the flag is only touched inside a critical section
                    if unsafe { DEVICE_PERIPHERALS } {
                        None
                    } else {
                        Some(unsafe { Peripherals::steal() })
                    }
                })
            }

            /// Unchecked version of `Peripherals::take`
            ///
            /// # Safety
            ///
            /// Each returned token grants exclusive access to its register
            /// block; the caller must not create aliases.
            #[inline]
            pub unsafe fn steal() -> Self {
                DEVICE_PERIPHERALS = true;
                Peripherals {
                    $($NAME: $NAME { _marker: PhantomData },)+
                }
            }
        }
    };
}

static mut DEVICE_PERIPHERALS: bool = false;

peripherals! {
    /// Reset and clock unit
    RCU: crate::rcu::RegisterBlock = RCU_BASE,
    /// System configuration
    SYSCFG: crate::syscfg::RegisterBlock = SYSCFG_BASE,
    /// External interrupt/event controller
    EXTI: crate::exti::RegisterBlock = EXTI_BASE,
    SPI0: crate::spi::RegisterBlock = SPI0_BASE,
    SPI1: crate::spi::RegisterBlock = SPI1_BASE,
    USART0: crate::usart::RegisterBlock = USART0_BASE,
    USART1: crate::usart::RegisterBlock = USART1_BASE,
    ADC: crate::adc::RegisterBlock = ADC_BASE,
    /// Advanced timer
    TIMER0: crate::timer::RegisterBlock = TIMER0_BASE,
    TIMER2: crate::timer::RegisterBlock = TIMER2_BASE,
    TIMER13: crate::timer::RegisterBlock = TIMER13_BASE,
    TIMER15: crate::timer::RegisterBlock = TIMER15_BASE,
    TIMER16: crate::timer::RegisterBlock = TIMER16_BASE,
    /// Real-time clock
    RTC: crate::rtc::RegisterBlock = RTC_BASE,
    /// Power management unit
    PMU: crate::pmu::RegisterBlock = PMU_BASE,
    /// Window watchdog timer
    WWDGT: crate::wwdgt::RegisterBlock = WWDGT_BASE,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spi0_sits_above_spi1() {
        assert_eq!(SPI0_BASE, 0x4001_3000);
        assert_eq!(SPI1_BASE, 0x4000_3800);
        assert_eq!(SPI0::ptr() as u32, SPI0_BASE);
    }

    #[test]
    fn interrupt_numbers() {
        use cortex_m::interrupt::InterruptNumber;

        assert_eq!(Interrupt::WWDGT.number(), 0);
        assert_eq!(Interrupt::EXTI0.number(), 5);
        assert_eq!(Interrupt::EXTI4.number(), 9);
        assert_eq!(Interrupt::SPI0.number(), 22);
        assert_eq!(Interrupt::I2C1_ER.number(), 29);
    }
}
