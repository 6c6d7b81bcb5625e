//! Real-time clock (RTC) calendar.
//!
//! Calendar fields are kept in BCD, the way the hardware stores them.
//! Registers sit in the backup domain: enable PMU backup writes before
//! touching them.

use core::fmt;

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::registers::{ReadWrite, WriteOnly};
use tock_registers::{register_bitfields, register_structs};

use crate::pac;
use crate::static_ref::StaticRef;

const UNLOCK_KEY1: u32 = 0xCA;
const UNLOCK_KEY2: u32 = 0x53;
const LOCK_KEY: u32 = 0xFF;

const INITM_TIMEOUT: u32 = 0x4000;
const RSYNF_TIMEOUT: u32 = 0x8000;

register_structs! {
    pub RegisterBlock {
        (0x00 => time: ReadWrite<u32, TIME::Register>),
        (0x04 => date: ReadWrite<u32, DATE::Register>),
        (0x08 => ctl: ReadWrite<u32, CTL::Register>),
        (0x0C => stat: ReadWrite<u32, STAT::Register>),
        (0x10 => psc: ReadWrite<u32, PSC::Register>),
        (0x14 => _reserved0),
        (0x24 => wpk: WriteOnly<u32>),
        (0x28 => @END),
    }
}

register_bitfields![u32,
    TIME [
        SC OFFSET(0) NUMBITS(7) [],
        MN OFFSET(8) NUMBITS(7) [],
        HR OFFSET(16) NUMBITS(6) [],
        PM OFFSET(22) NUMBITS(1) []
    ],
    DATE [
        DAY OFFSET(0) NUMBITS(6) [],
        MON OFFSET(8) NUMBITS(5) [],
        DOW OFFSET(13) NUMBITS(3) [],
        YR OFFSET(16) NUMBITS(8) []
    ],
    CTL [
        BPSHAD OFFSET(5) NUMBITS(1) [],
        CS OFFSET(6) NUMBITS(1) []
    ],
    STAT [
        RSYNF OFFSET(5) NUMBITS(1) [],
        INITF OFFSET(6) NUMBITS(1) [],
        INITM OFFSET(7) NUMBITS(1) []
    ],
    PSC [
        FACTOR_S OFFSET(0) NUMBITS(15) [],
        FACTOR_A OFFSET(16) NUMBITS(7) []
    ]
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// INITF never came up after requesting init mode
    InitModeTimeout,
    /// Shadow registers did not resynchronise
    SyncTimeout,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InitModeTimeout => f.write_str("RTC init mode timeout"),
            Error::SyncTimeout => f.write_str("RTC register sync timeout"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Weekday {
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
    Sunday = 7,
}

impl Weekday {
    fn from_bits(bits: u32) -> Self {
        match bits {
            1 => Weekday::Monday,
            2 => Weekday::Tuesday,
            3 => Weekday::Wednesday,
            4 => Weekday::Thursday,
            5 => Weekday::Friday,
            6 => Weekday::Saturday,
            _ => Weekday::Sunday,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AmPm {
    Am,
    Pm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayFormat {
    Hour24,
    Hour12,
}

/// BCD months
pub const JAN: u8 = 0x01;
pub const FEB: u8 = 0x02;
pub const MAR: u8 = 0x03;
pub const APR: u8 = 0x04;
pub const MAY: u8 = 0x05;
pub const JUN: u8 = 0x06;
pub const JUL: u8 = 0x07;
pub const AUG: u8 = 0x08;
pub const SEP: u8 = 0x09;
pub const OCT: u8 = 0x10;
pub const NOV: u8 = 0x11;
pub const DEC: u8 = 0x12;

/// Calendar and prescaler setup. Date and time fields are BCD.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RtcParameters {
    pub year: u8,
    pub month: u8,
    pub date: u8,
    pub day_of_week: Weekday,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub factor_asyn: u8,
    pub factor_syn: u16,
    pub am_pm: AmPm,
    pub display_format: DisplayFormat,
}

pub fn bcd_to_dec(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

pub fn dec_to_bcd(dec: u8) -> u8 {
    ((dec / 10) << 4) | (dec % 10)
}

pub struct Rtc {
    regs: StaticRef<RegisterBlock>,
}

impl Rtc {
    pub fn new(_rtc: pac::RTC) -> Self {
        Rtc {
            regs: pac::RTC::regs(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_regs(regs: StaticRef<RegisterBlock>) -> Self {
        Rtc { regs }
    }

    fn unlock(&mut self) {
        self.regs.wpk.set(UNLOCK_KEY1);
        self.regs.wpk.set(UNLOCK_KEY2);
    }

    fn lock(&mut self) {
        self.regs.wpk.set(LOCK_KEY);
    }

    /// Stops the calendar counter so it can be written.
    pub fn init_mode_enter(&mut self) -> Result<(), Error> {
        if self.regs.stat.is_set(STAT::INITF) {
            return Ok(());
        }

        self.regs.stat.modify(STAT::INITM::SET);
        for _ in 0..INITM_TIMEOUT {
            if self.regs.stat.is_set(STAT::INITF) {
                return Ok(());
            }
        }
        Err(Error::InitModeTimeout)
    }

    pub fn init_mode_exit(&mut self) {
        self.regs.stat.modify(STAT::INITM::CLEAR);
    }

    /// Waits until the shadow registers hold the calendar again. Does
    /// nothing when shadow registers are bypassed.
    pub fn register_sync_wait(&mut self) -> Result<(), Error> {
        if self.regs.ctl.is_set(CTL::BPSHAD) {
            return Ok(());
        }

        self.unlock();
        self.regs.stat.modify(STAT::RSYNF::CLEAR);

        let mut result = Err(Error::SyncTimeout);
        for _ in 0..RSYNF_TIMEOUT {
            if self.regs.stat.is_set(STAT::RSYNF) {
                result = Ok(());
                break;
            }
        }

        self.lock();
        result
    }

    /// Programs prescalers, time, date and the hour format.
    pub fn init(&mut self, p: &RtcParameters) -> Result<(), Error> {
        self.unlock();

        let result = self.init_mode_enter().and_then(|()| {
            self.regs.psc.write(
                PSC::FACTOR_S.val(u32::from(p.factor_syn))
                    + PSC::FACTOR_A.val(u32::from(p.factor_asyn)),
            );
            self.regs.time.write(
                TIME::SC.val(u32::from(p.second))
                    + TIME::MN.val(u32::from(p.minute))
                    + TIME::HR.val(u32::from(p.hour))
                    + TIME::PM.val(u32::from(p.am_pm == AmPm::Pm)),
            );
            self.regs.date.write(
                DATE::DAY.val(u32::from(p.date))
                    + DATE::MON.val(u32::from(p.month))
                    + DATE::DOW.val(p.day_of_week as u32)
                    + DATE::YR.val(u32::from(p.year)),
            );
            self.regs
                .ctl
                .modify(CTL::CS.val(u32::from(p.display_format == DisplayFormat::Hour12)));

            self.init_mode_exit();
            self.register_sync_wait()
        });

        self.lock();
        if let Err(e) = result {
            warn!("rtc init failed: {}", e);
        }
        result
    }

    /// Current calendar and prescaler settings
    pub fn current_time_get(&self) -> RtcParameters {
        let time = self.regs.time.extract();
        let date = self.regs.date.extract();
        let psc = self.regs.psc.extract();

        RtcParameters {
            year: date.read(DATE::YR) as u8,
            month: date.read(DATE::MON) as u8,
            date: date.read(DATE::DAY) as u8,
            day_of_week: Weekday::from_bits(date.read(DATE::DOW)),
            hour: time.read(TIME::HR) as u8,
            minute: time.read(TIME::MN) as u8,
            second: time.read(TIME::SC) as u8,
            factor_asyn: psc.read(PSC::FACTOR_A) as u8,
            factor_syn: psc.read(PSC::FACTOR_S) as u16,
            am_pm: if time.is_set(TIME::PM) {
                AmPm::Pm
            } else {
                AmPm::Am
            },
            display_format: if self.regs.ctl.is_set(CTL::CS) {
                DisplayFormat::Hour12
            } else {
                DisplayFormat::Hour24
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_regs, peek};

    const WPK: usize = 0x24;

    fn params() -> RtcParameters {
        RtcParameters {
            year: 0x24,
            month: SEP,
            date: 0x13,
            day_of_week: Weekday::Friday,
            hour: 0x12,
            minute: 0x00,
            second: 0x00,
            factor_asyn: 0x63,
            factor_syn: 0x13F,
            am_pm: AmPm::Am,
            display_format: DisplayFormat::Hour24,
        }
    }

    #[test]
    fn bcd() {
        assert_eq!(bcd_to_dec(0x59), 59);
        assert_eq!(dec_to_bcd(59), 0x59);
        assert_eq!(bcd_to_dec(dec_to_bcd(7)), 7);
    }

    #[test]
    fn init_writes_calendar() {
        let regs = fake_regs::<RegisterBlock>();
        let mut rtc = Rtc::with_regs(regs);
        // already in init mode, shadow registers bypassed
        regs.stat.write(STAT::INITF::SET);
        regs.ctl.write(CTL::BPSHAD::SET);

        assert_eq!(rtc.init(&params()), Ok(()));

        assert_eq!(regs.time.get(), 0x0012_0000);
        assert_eq!(regs.date.get(), 0x0024_A913);
        assert_eq!(regs.psc.get(), 0x0063_013F);
        assert!(!regs.ctl.is_set(CTL::CS));
        assert_eq!(peek(regs, WPK), LOCK_KEY);

        assert_eq!(rtc.current_time_get(), params());
    }

    #[test]
    fn init_mode_times_out() {
        let regs = fake_regs::<RegisterBlock>();
        let mut rtc = Rtc::with_regs(regs);

        assert_eq!(rtc.init(&params()), Err(Error::InitModeTimeout));
        assert!(regs.stat.is_set(STAT::INITM));
        assert_eq!(regs.time.get(), 0);
        assert_eq!(peek(regs, WPK), LOCK_KEY);
    }

    #[test]
    fn init_mode_request_keeps_status_bits() {
        let regs = fake_regs::<RegisterBlock>();
        let mut rtc = Rtc::with_regs(regs);

        regs.stat.write(STAT::RSYNF::SET);
        assert_eq!(rtc.init_mode_enter(), Err(Error::InitModeTimeout));
        assert!(regs.stat.is_set(STAT::INITM));
        assert!(regs.stat.is_set(STAT::RSYNF));
    }

    #[test]
    fn sync_wait() {
        let regs = fake_regs::<RegisterBlock>();
        let mut rtc = Rtc::with_regs(regs);

        // RSYNF cleared by the wait and never set again
        regs.stat.write(STAT::RSYNF::SET);
        assert_eq!(rtc.register_sync_wait(), Err(Error::SyncTimeout));
        assert_eq!(peek(regs, WPK), LOCK_KEY);

        regs.ctl.write(CTL::BPSHAD::SET);
        assert_eq!(rtc.register_sync_wait(), Ok(()));
    }

    #[test]
    fn twelve_hour_pm() {
        let regs = fake_regs::<RegisterBlock>();
        let mut rtc = Rtc::with_regs(regs);
        regs.stat.write(STAT::INITF::SET);
        regs.ctl.write(CTL::BPSHAD::SET);

        let p = RtcParameters {
            hour: 0x11,
            am_pm: AmPm::Pm,
            display_format: DisplayFormat::Hour12,
            ..params()
        };
        assert_eq!(rtc.init(&p), Ok(()));
        assert!(regs.time.is_set(TIME::PM));
        assert!(regs.ctl.is_set(CTL::CS));
        assert_eq!(rtc.current_time_get(), p);
    }
}
