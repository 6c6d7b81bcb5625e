//! General purpose and advanced timers.
//!
//! A `Timer` works either as a periodic count down (`embedded-hal`
//! `CountDown`) or as a PWM generator through the channel output
//! operations.

use core::fmt;

use embedded_hal::timer::{CountDown, Periodic};
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};
use void::Void;

use crate::pac;
use crate::rcu::{Clocks, Periph, Rcu};
use crate::static_ref::StaticRef;

register_structs! {
    pub RegisterBlock {
        (0x00 => ctl0: ReadWrite<u32, CTL0::Register>),
        (0x04 => ctl1: ReadWrite<u32>),
        (0x08 => smcfg: ReadWrite<u32>),
        (0x0C => dmainten: ReadWrite<u32, DMAINTEN::Register>),
        (0x10 => intf: ReadWrite<u32, INTF::Register>),
        (0x14 => swevg: ReadWrite<u32, SWEVG::Register>),
        (0x18 => chctl0: ReadWrite<u32>),
        (0x1C => chctl1: ReadWrite<u32>),
        (0x20 => chctl2: ReadWrite<u32>),
        (0x24 => cnt: ReadWrite<u32>),
        (0x28 => psc: ReadWrite<u32>),
        (0x2C => car: ReadWrite<u32>),
        (0x30 => crep: ReadWrite<u32>),
        (0x34 => chcv: [ReadWrite<u32>; 4]),
        (0x44 => cchp: ReadWrite<u32, CCHP::Register>),
        (0x48 => dmacfg: ReadWrite<u32>),
        (0x4C => dmatb: ReadWrite<u32>),
        (0x50 => @END),
    }
}

register_bitfields![u32,
    CTL0 [
        CEN OFFSET(0) NUMBITS(1) [],
        UPDIS OFFSET(1) NUMBITS(1) [],
        UPS OFFSET(2) NUMBITS(1) [],
        SPM OFFSET(3) NUMBITS(1) [],
        DIR OFFSET(4) NUMBITS(1) [],
        CAM OFFSET(5) NUMBITS(2) [],
        ARSE OFFSET(7) NUMBITS(1) [],
        CKDIV OFFSET(8) NUMBITS(2) []
    ],
    DMAINTEN [
        UPIE OFFSET(0) NUMBITS(1) []
    ],
    INTF [
        UPIF OFFSET(0) NUMBITS(1) []
    ],
    SWEVG [
        UPG OFFSET(0) NUMBITS(1) []
    ],
    CCHP [
        POEN OFFSET(15) NUMBITS(1) []
    ]
];

/// Frequency in Hz
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hertz(pub u32);

impl From<u32> for Hertz {
    fn from(hz: u32) -> Self {
        Hertz(hz)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Faster than the timer clock
    FrequencyTooHigh,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::FrequencyTooHigh => f.write_str("frequency above timer clock"),
        }
    }
}

/// Interrupt events
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Update event, the count down ended
    Update,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Ch0 = 0,
    Ch1 = 1,
    Ch2 = 2,
    Ch3 = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlignedMode {
    Edge = 0,
    Center1 = 1,
    Center2 = 2,
    CenterBoth = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CounterDirection {
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockDivision {
    Div1 = 0,
    Div2 = 1,
    Div4 = 2,
}

/// Output compare modes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OcMode {
    Timing = 0,
    Active = 1,
    Inactive = 2,
    Toggle = 3,
    LowForced = 4,
    HighForced = 5,
    Pwm0 = 6,
    Pwm1 = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    High,
    Low,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerParameters {
    pub prescaler: u16,
    pub aligned_mode: AlignedMode,
    pub direction: CounterDirection,
    pub period: u16,
    pub clock_division: ClockDivision,
    pub repetition_counter: u8,
}

impl Default for TimerParameters {
    fn default() -> Self {
        TimerParameters {
            prescaler: 0,
            aligned_mode: AlignedMode::Edge,
            direction: CounterDirection::Up,
            period: 65535,
            clock_division: ClockDivision::Div1,
            repetition_counter: 0,
        }
    }
}

/// Channel output settings. The `n` fields configure the complementary
/// output; `output_nenable` false leaves it off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OcParameters {
    pub output_enable: bool,
    pub output_nenable: bool,
    pub polarity: Polarity,
    pub npolarity: Polarity,
    /// Output level while the primary output is off
    pub idle_high: bool,
    pub nidle_high: bool,
}

impl Default for OcParameters {
    fn default() -> Self {
        OcParameters {
            output_enable: false,
            output_nenable: false,
            polarity: Polarity::High,
            npolarity: Polarity::High,
            idle_high: false,
            nidle_high: false,
        }
    }
}

/// Prescaler and auto-reload values for an update rate of `freq` from a
/// timer clock of `tclk`.
pub fn timer_params(tclk: u32, freq: u32) -> Result<(u16, u16), Error> {
    let ticks = tclk / freq.max(1);
    if ticks == 0 {
        return Err(Error::FrequencyTooHigh);
    }

    // ticks < 2^32, so both the prescaler and the period fit in 16 bits
    let psc = ((ticks - 1) >> 16) as u16;
    let car = (ticks / (u32::from(psc) + 1) - 1) as u16;
    Ok((psc, car))
}

pub struct Timer<TIM> {
    tim: TIM,
    regs: StaticRef<RegisterBlock>,
    clocks: Clocks,
}

macro_rules! my_timers {
    ($($TIM:ident: ($tim:ident, $periph:ident),)+) => {
        $(
            impl Timer<pac::$TIM> {
                /// Enables and resets the peripheral. The counter is left
                /// stopped.
                pub fn $tim(tim: pac::$TIM, rcu: &mut Rcu, clocks: &Clocks) -> Self {
                    rcu.enable(Periph::$periph);
                    rcu.reset(Periph::$periph);

                    Timer {
                        tim,
                        regs: pac::$TIM::regs(),
                        clocks: *clocks,
                    }
                }

                /// Resets every register through the RCU
                pub fn deinit(&mut self, rcu: &mut Rcu) {
                    rcu.reset(Periph::$periph);
                }

                /// Releases the TIMER peripheral
                pub fn release(self, rcu: &mut Rcu) -> pac::$TIM {
                    self.regs.ctl0.modify(CTL0::CEN::CLEAR);
                    rcu.disable(Periph::$periph);
                    self.tim
                }
            }
        )+
    }
}

my_timers! {
    TIMER0: (timer0, Timer0),
    TIMER2: (timer2, Timer2),
    TIMER13: (timer13, Timer13),
    TIMER15: (timer15, Timer15),
    TIMER16: (timer16, Timer16),
}

impl<TIM> Timer<TIM> {
    #[cfg(test)]
    pub(crate) fn with_regs(tim: TIM, regs: StaticRef<RegisterBlock>, clocks: Clocks) -> Self {
        Timer { tim, regs, clocks }
    }

    /// Counter setup for PWM or input capture. Generates an update event so
    /// the prescaler takes effect immediately.
    pub fn init(&mut self, params: &TimerParameters) {
        self.regs.psc.set(u32::from(params.prescaler));

        let mut ctl0 = CTL0::CAM.val(params.aligned_mode as u32)
            + CTL0::CKDIV.val(params.clock_division as u32);
        if params.aligned_mode == AlignedMode::Edge {
            ctl0 += match params.direction {
                CounterDirection::Up => CTL0::DIR::CLEAR,
                CounterDirection::Down => CTL0::DIR::SET,
            };
        }
        self.regs.ctl0.modify(ctl0);

        self.regs.car.set(u32::from(params.period));
        self.regs.crep.set(u32::from(params.repetition_counter));
        self.regs.swevg.write(SWEVG::UPG::SET);
    }

    pub fn enable(&mut self) {
        self.regs.ctl0.modify(CTL0::CEN::SET);
    }

    pub fn disable(&mut self) {
        self.regs.ctl0.modify(CTL0::CEN::CLEAR);
    }

    pub fn auto_reload_shadow_enable(&mut self) {
        self.regs.ctl0.modify(CTL0::ARSE::SET);
    }

    pub fn auto_reload_shadow_disable(&mut self) {
        self.regs.ctl0.modify(CTL0::ARSE::CLEAR);
    }

    /// Main output enable of the advanced timers (TIMER0, TIMER15, TIMER16)
    pub fn primary_output_config(&mut self, enable: bool) {
        self.regs.cchp.modify(CCHP::POEN.val(u32::from(enable)));
    }

    pub fn counter_read(&self) -> u16 {
        self.regs.cnt.get() as u16
    }

    fn chctl(&self, ch: Channel) -> &ReadWrite<u32> {
        match ch {
            Channel::Ch0 | Channel::Ch1 => &self.regs.chctl0,
            Channel::Ch2 | Channel::Ch3 => &self.regs.chctl1,
        }
    }

    fn chctl_modify(&mut self, ch: Channel, mask: u32, value: u32) {
        let shift = (ch as u32 % 2) * 8;
        let reg = self.chctl(ch);
        reg.set((reg.get() & !(mask << shift)) | ((value & mask) << shift));
    }

    /// Configures `ch` as an output and sets enables, polarities and idle
    /// states.
    pub fn channel_output_config(&mut self, ch: Channel, oc: &OcParameters) {
        let ch_shift = ch as u32 * 4;
        let mut chctl2 = self.regs.chctl2.get() & !(0xF << ch_shift);
        chctl2 |= u32::from(oc.output_enable) << ch_shift;
        chctl2 |= u32::from(oc.polarity == Polarity::Low) << (ch_shift + 1);
        chctl2 |= u32::from(oc.output_nenable) << (ch_shift + 2);
        chctl2 |= u32::from(oc.npolarity == Polarity::Low) << (ch_shift + 3);
        self.regs.chctl2.set(chctl2);

        let iso_shift = 8 + ch as u32 * 2;
        let mut ctl1 = self.regs.ctl1.get() & !(0x3 << iso_shift);
        ctl1 |= u32::from(oc.idle_high) << iso_shift;
        ctl1 |= u32::from(oc.nidle_high) << (iso_shift + 1);
        self.regs.ctl1.set(ctl1);

        // channel mode: output
        self.chctl_modify(ch, 0x3, 0);
    }

    pub fn channel_output_mode_config(&mut self, ch: Channel, mode: OcMode) {
        self.chctl_modify(ch, 0x7 << 4, (mode as u32) << 4);
    }

    /// Output compare shadow register; a new pulse value takes effect at the
    /// next update event when enabled.
    pub fn channel_output_shadow_config(&mut self, ch: Channel, enable: bool) {
        self.chctl_modify(ch, 1 << 3, u32::from(enable) << 3);
    }

    pub fn channel_output_pulse_value_config(&mut self, ch: Channel, pulse: u16) {
        self.regs.chcv[ch as usize].set(u32::from(pulse));
    }

    /// Update rate of the counter. Zero stops the timer.
    pub fn set_frequency<T: Into<Hertz>>(&mut self, freq: T) -> Result<(), Error> {
        let freq = freq.into().0;
        if freq == 0 {
            self.disable();
            return Ok(());
        }

        let (psc, car) = timer_params(self.clocks.timer(), freq)?;
        self.regs.psc.set(u32::from(psc));
        self.regs.car.set(u32::from(car));
        self.enable();
        Ok(())
    }

    /// Starts listening for an `event`
    pub fn listen(&mut self, event: Event) {
        match event {
            Event::Update => self.regs.dmainten.modify(DMAINTEN::UPIE::SET),
        }
    }

    /// Stops listening for an `event`
    pub fn unlisten(&mut self, event: Event) {
        match event {
            Event::Update => self.regs.dmainten.modify(DMAINTEN::UPIE::CLEAR),
        }
    }

    pub fn interrupt_flag_clear(&mut self, event: Event) {
        match event {
            Event::Update => self.regs.intf.modify(INTF::UPIF::CLEAR),
        }
    }
}

impl<TIM> CountDown for Timer<TIM> {
    type Time = Hertz;

    /// Start the timer with a `timeout`
    fn start<T>(&mut self, timeout: T)
    where
        T: Into<Hertz>,
    {
        if let Err(e) = self.set_frequency(timeout) {
            warn!("timer not started: {}", e);
        }
    }

    /// Return `Ok` if the timer has wrapped
    /// Automatically clears the flag and restarts the time
    fn wait(&mut self) -> nb::Result<(), Void> {
        if self.regs.intf.is_set(INTF::UPIF) {
            self.regs.intf.modify(INTF::UPIF::CLEAR);
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

impl<TIM> Periodic for Timer<TIM> {}
