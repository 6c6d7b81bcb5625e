//! GD32C231F-START board.

use super::{BoardKey, BoardLed, ComDef, KeyDef, PinDef};
use crate::gpio::{self, Port};
use crate::pac::{self, Interrupt};
use crate::rcu::{Clocks, Rcu};
use crate::usart::Usart;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Led {
    Led1,
    Led2,
}

impl Led {
    pub const ALL: [Led; 2] = [Led::Led1, Led::Led2];
}

const LEDS: [PinDef; 2] = [PinDef::new(Port::B, 6), PinDef::new(Port::B, 7)];

impl BoardLed for Led {
    fn def(self) -> PinDef {
        LEDS[self as usize]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Key {
    K1,
}

const KEYS: [KeyDef; 1] = [KeyDef {
    pin: PinDef::new(Port::A, 0),
    irq: Interrupt::EXTI0,
}];

impl BoardKey for Key {
    fn def(self) -> KeyDef {
        KEYS[self as usize]
    }
}

/// USART1 on PA2 (TX) / PA3 (RX)
pub const COM: ComDef = ComDef {
    tx: PinDef::new(Port::A, 2),
    rx: PinDef::new(Port::A, 3),
    af: gpio::AF1,
};

/// Console at 115200 8N1
pub fn com_init(usart: pac::USART1, rcu: &mut Rcu, clocks: &Clocks) -> Usart {
    super::com_gpio_config(&COM, rcu);
    Usart::usart1(usart, rcu, clocks, super::COM_BAUDRATE)
}
