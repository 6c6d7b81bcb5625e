//! Board tables and the LED / key / console operations shared by the
//! boards.
//!
//! Each board module names its LEDs and keys with an enum whose variants
//! index a `const` table. The generic operations here work on any board
//! through the `BoardLed` and `BoardKey` traits.

use cortex_m::peripheral::NVIC;

use crate::exti::{self, Exti, Line, Trigger};
use crate::gpio::{AltFunction, Mode, OutputType, Pin, Port, Pull, Speed};
use crate::misc;
use crate::pac::Interrupt;
use crate::rcu::{Periph, Rcu};
use crate::syscfg::Syscfg;

pub mod eval;
pub mod start;

/// Priority of the key EXTI interrupts
pub const KEY_PRIORITY: u8 = 2;
/// Console baud rate
pub const COM_BAUDRATE: u32 = 115_200;

/// A pin by port and number
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinDef {
    pub port: Port,
    pub pin: u8,
}

impl PinDef {
    pub const fn new(port: Port, pin: u8) -> Self {
        PinDef { port, pin }
    }

    pub fn pin(self) -> Pin {
        Pin::new(self.port, self.pin)
    }
}

/// A push button: its pin, the EXTI line of that pin and the line's IRQ
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyDef {
    pub pin: PinDef,
    pub irq: Interrupt,
}

impl KeyDef {
    pub fn line(&self) -> Line {
        Line::gpio(self.pin.pin)
    }
}

/// Console USART pins
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComDef {
    pub tx: PinDef,
    pub rx: PinDef,
    pub af: AltFunction,
}

pub trait BoardLed: Copy {
    fn def(self) -> PinDef;
}

pub trait BoardKey: Copy {
    fn def(self) -> KeyDef;
}

/// Push-pull output, initially off
pub fn led_init<L: BoardLed>(led: L, rcu: &mut Rcu) {
    let pin = led.def().pin();
    pin.enable_clock(rcu);
    led_setup(pin);
}

pub fn led_on<L: BoardLed>(led: L) {
    led.def().pin().set_high();
}

pub fn led_off<L: BoardLed>(led: L) {
    led.def().pin().set_low();
}

pub fn led_toggle<L: BoardLed>(led: L) {
    led.def().pin().toggle();
}

/// Key as a plain input
pub fn key_init<K: BoardKey>(key: K, rcu: &mut Rcu) {
    let pin = key.def().pin.pin();
    pin.enable_clock(rcu);
    rcu.enable(Periph::Syscfg);
    pin.set_mode(Mode::Input, Pull::None);
}

/// Key as a plain input that also raises a rising edge interrupt on its
/// EXTI line.
///
/// The IRQ is not unmasked here. Call `key_nvic_enable` afterwards to
/// enable it at `KEY_PRIORITY`, or bind the IRQ to an RTIC task, which
/// programs the NVIC itself.
pub fn key_init_exti<K: BoardKey>(key: K, rcu: &mut Rcu, syscfg: &mut Syscfg, exti: &mut Exti) {
    key_init(key, rcu);
    key_exti_setup(&key.def(), syscfg, exti);
}

/// Unmasks the key interrupt at `KEY_PRIORITY`
pub fn key_nvic_enable<K: BoardKey>(key: K, nvic: &mut NVIC) {
    misc::nvic_irq_enable(nvic, key.def().irq, KEY_PRIORITY);
}

/// Level on the key pin
pub fn key_state_get<K: BoardKey>(key: K) -> bool {
    key.def().pin.pin().is_high()
}

fn led_setup(pin: Pin) {
    pin.set_mode(Mode::Output, Pull::None);
    pin.set_output_options(OutputType::PushPull, Speed::Level1);
    pin.set_low();
}

fn key_exti_setup(key: &KeyDef, syscfg: &mut Syscfg, exti: &mut Exti) {
    let line = key.line();
    syscfg.exti_line_config(key.pin.port, key.pin.pin);
    exti.init(line, exti::Mode::Interrupt, Trigger::Rising);
    exti.interrupt_flag_clear(line);
}

fn com_pin_setup(pin: Pin, af: AltFunction) {
    pin.set_af(af);
    pin.set_mode(Mode::Alternate, Pull::Up);
    pin.set_output_options(OutputType::PushPull, Speed::Level1);
}

/// Routes the console pins to the USART
fn com_gpio_config(com: &ComDef, rcu: &mut Rcu) {
    for def in [com.tx, com.rx] {
        let pin = def.pin();
        pin.enable_clock(rcu);
        com_pin_setup(pin, com.af);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::{self, RegisterBlock as GpioRegs};
    use crate::testing::{fake_regs, peek};

    const CTL: usize = 0x00;
    const OSPD: usize = 0x08;
    const PUD: usize = 0x0C;
    const AFSEL1: usize = 0x24;
    const BC: usize = 0x28;

    #[test]
    fn led_starts_off() {
        let regs = fake_regs::<GpioRegs>();
        led_setup(Pin::with_regs(regs, Port::D, 2));

        assert_eq!(peek(regs, CTL), 1 << 4);
        assert_eq!(peek(regs, OSPD), 1 << 4);
        assert_eq!(peek(regs, BC), 1 << 2);
    }

    #[test]
    fn com_pins_alternate_pull_up() {
        let regs = fake_regs::<GpioRegs>();
        com_pin_setup(Pin::with_regs(regs, Port::A, 9), gpio::AF1);
        com_pin_setup(Pin::with_regs(regs, Port::A, 10), gpio::AF1);

        assert_eq!(peek(regs, CTL), (2 << 18) | (2 << 20));
        assert_eq!(peek(regs, PUD), (1 << 18) | (1 << 20));
        assert_eq!(peek(regs, AFSEL1), (1 << 4) | (1 << 8));
    }

    #[test]
    fn key_irq_priority() {
        assert_eq!(eval::Key::User.def().irq, Interrupt::EXTI4);
        assert_eq!(eval::Key::Wakeup.def().irq, Interrupt::EXTI0);
        assert_eq!(misc::priority_bits(KEY_PRIORITY), 0x80);
    }

    #[test]
    fn key_exti_routes_rising_edge() {
        let syscfg_regs = fake_regs::<crate::syscfg::RegisterBlock>();
        let exti_regs = fake_regs::<crate::exti::RegisterBlock>();
        let mut syscfg = Syscfg::with_regs(syscfg_regs);
        let mut exti = Exti::with_regs(exti_regs);

        let user = eval::Key::User.def();
        key_exti_setup(&user, &mut syscfg, &mut exti);

        // EXTISS1 holds lines 4..7, port A is source 0
        assert_eq!(peek(syscfg_regs, 0x0C), 0);
        // interrupt and rising edge on line 4, pending bit written to clear
        assert_eq!(peek(exti_regs, 0x00), 1 << 4);
        assert_eq!(peek(exti_regs, 0x08), 1 << 4);
        assert_eq!(peek(exti_regs, 0x0C), 0);
        assert_eq!(peek(exti_regs, 0x14), 1 << 4);
    }
}
