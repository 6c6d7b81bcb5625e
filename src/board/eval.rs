//! GD32C231C-EVAL board.

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
    Led3,
    Led4,
}

impl Led {
    pub const ALL: [Led; 4] = [Led::Led1, Led::Led2, Led::Led3, Led::Led4];
}

const LEDS: [PinDef; 4] = [
    PinDef::new(Port::D, 0),
    PinDef::new(Port::D, 1),
    PinDef::new(Port::D, 2),
    PinDef::new(Port::D, 3),
];

impl BoardLed for Led {
    fn def(self) -> PinDef {
        LEDS[self as usize]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Key {
    Wakeup,
    User,
}

const KEYS: [KeyDef; 2] = [
    KeyDef {
        pin: PinDef::new(Port::A, 0),
        irq: Interrupt::EXTI0,
    },
    KeyDef {
        pin: PinDef::new(Port::A, 4),
        irq: Interrupt::EXTI4,
    },
];

impl BoardKey for Key {
    fn def(self) -> KeyDef {
        KEYS[self as usize]
    }
}

/// USART0 on PA9 (TX) / PA10 (RX)
pub const COM: ComDef = ComDef {
    tx: PinDef::new(Port::A, 9),
    rx: PinDef::new(Port::A, 10),
    af: gpio::AF1,
};

/// Console at 115200 8N1
pub fn com_init(usart: pac::USART0, rcu: &mut Rcu, clocks: &Clocks) -> Usart {
    super::com_gpio_config(&COM, rcu);
    Usart::usart0(usart, rcu, clocks, super::COM_BAUDRATE)
}

/// Switches all four LEDs on or off
pub fn leds_set(on: bool) {
    for led in Led::ALL {
        if on {
            super::led_on(led);
        } else {
            super::led_off(led);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leds_on_port_d() {
        for (i, led) in Led::ALL.iter().enumerate() {
            assert_eq!(led.def(), PinDef::new(Port::D, i as u8));
        }
    }

    #[test]
    fn key_lines_follow_pins() {
        assert_eq!(Key::Wakeup.def().line().number(), 0);
        assert_eq!(Key::Wakeup.def().irq, Interrupt::EXTI0);
        assert_eq!(Key::User.def().line().number(), 4);
        assert_eq!(Key::User.def().irq, Interrupt::EXTI4);
    }
}
