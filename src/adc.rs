//! Analog to digital converter (ADC), inserted group.

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

use crate::pac;
use crate::static_ref::StaticRef;

/// Internal temperature sensor channel
pub const CHANNEL_TEMPSENSOR: u8 = 13;
/// Internal reference voltage channel
pub const CHANNEL_VREFINT: u8 = 14;

/// Full scale reading of the 12-bit converter
const FULL_SCALE: f32 = 4095.0;
const VDDA: f32 = 3.3;

register_structs! {
    pub RegisterBlock {
        (0x00 => stat: ReadWrite<u32>),
        (0x04 => ctl0: ReadWrite<u32, CTL0::Register>),
        (0x08 => ctl1: ReadWrite<u32, CTL1::Register>),
        (0x0C => sampt0: ReadWrite<u32>),
        (0x10 => sampt1: ReadWrite<u32>),
        (0x14 => ioff: [ReadWrite<u32>; 4]),
        (0x24 => wdht: ReadWrite<u32>),
        (0x28 => wdlt: ReadWrite<u32>),
        (0x2C => rsq0: ReadWrite<u32>),
        (0x30 => rsq1: ReadWrite<u32>),
        (0x34 => rsq2: ReadWrite<u32>),
        (0x38 => isq: ReadWrite<u32, ISQ::Register>),
        (0x3C => idata: [ReadWrite<u32>; 4]),
        (0x4C => rdata: ReadWrite<u32>),
        (0x50 => @END),
    }
}

register_bitfields![u32,
    CTL0 [
        SM OFFSET(8) NUMBITS(1) [],
        ICA OFFSET(10) NUMBITS(1) []
    ],
    CTL1 [
        ADCON OFFSET(0) NUMBITS(1) [],
        CTN OFFSET(1) NUMBITS(1) [],
        DAL OFFSET(11) NUMBITS(1) [],
        ETSIC OFFSET(12) NUMBITS(3) [],
        ETEIC OFFSET(15) NUMBITS(1) [],
        ETSRC OFFSET(17) NUMBITS(3) [],
        ETERC OFFSET(20) NUMBITS(1) [],
        SWICST OFFSET(21) NUMBITS(1) [],
        SWRCST OFFSET(22) NUMBITS(1) [],
        TSVEN OFFSET(23) NUMBITS(1) [],
        INREFEN OFFSET(24) NUMBITS(1) []
    ],
    ISQ [
        IL OFFSET(20) NUMBITS(2) []
    ]
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpecialFunction {
    Continuous,
    Scan,
    InsertedAuto,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Align {
    Right,
    Left,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InternalChannel {
    TempSensor,
    Vrefint,
}

/// Sample time in ADC clock cycles
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleTime {
    Cycles1_5 = 0,
    Cycles3_5 = 1,
    Cycles7_5 = 2,
    Cycles12_5 = 3,
    Cycles19_5 = 4,
    Cycles39_5 = 5,
    Cycles79_5 = 6,
    Cycles160_5 = 7,
}

/// Inserted group trigger sources
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InsertedTrigger {
    Timer0Trgo = 0,
    Timer0Ch3 = 1,
    Timer2Trgo = 4,
    Exti15 = 6,
    /// Software trigger (SWICST)
    None = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Flag {
    WatchdogEvent = 0,
    Eoc = 1,
    Eoic = 2,
    InsertedStart = 3,
    RegularStart = 4,
}

/// Converts a temperature sensor reading to degrees Celsius
pub fn temperature_celsius(raw: u16) -> f32 {
    (0.924 - f32::from(raw) * VDDA / FULL_SCALE) * 1000.0 / 2.52 + 25.0
}

/// Converts a reading to volts
pub fn voltage(raw: u16) -> f32 {
    f32::from(raw) * VDDA / FULL_SCALE
}

pub struct Adc {
    regs: StaticRef<RegisterBlock>,
}

impl Adc {
    pub fn new(_adc: pac::ADC) -> Self {
        Adc {
            regs: pac::ADC::regs(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_regs(regs: StaticRef<RegisterBlock>) -> Self {
        Adc { regs }
    }

    pub fn enable(&mut self) {
        self.regs.ctl1.modify(CTL1::ADCON::SET);
    }

    pub fn disable(&mut self) {
        self.regs.ctl1.modify(CTL1::ADCON::CLEAR);
    }

    pub fn special_function_config(&mut self, function: SpecialFunction, enable: bool) {
        let v = u32::from(enable);
        match function {
            SpecialFunction::Continuous => self.regs.ctl1.modify(CTL1::CTN.val(v)),
            SpecialFunction::Scan => self.regs.ctl0.modify(CTL0::SM.val(v)),
            SpecialFunction::InsertedAuto => self.regs.ctl0.modify(CTL0::ICA.val(v)),
        }
    }

    pub fn data_alignment_config(&mut self, align: Align) {
        match align {
            Align::Right => self.regs.ctl1.modify(CTL1::DAL::CLEAR),
            Align::Left => self.regs.ctl1.modify(CTL1::DAL::SET),
        }
    }

    /// Number of conversions in the inserted group, 1..=4
    pub fn inserted_length_config(&mut self, length: u8) {
        let length = u32::from(length.clamp(1, 4));
        self.regs.isq.modify(ISQ::IL.val(length - 1));
    }

    fn sample_time_config(&mut self, channel: u8, sample_time: SampleTime) {
        let (reg, slot) = if channel < 10 {
            (&self.regs.sampt1, u32::from(channel))
        } else {
            (&self.regs.sampt0, u32::from(channel - 10))
        };
        let shift = slot * 3;
        reg.set((reg.get() & !(0x7 << shift)) | ((sample_time as u32) << shift));
    }

    /// Puts `channel` at `rank` of the inserted group. Ranks are stored
    /// right-aligned: with a group of length L, rank r lands in ISQ slot
    /// 4 - L + r. Set the group length first.
    pub fn inserted_channel_config(&mut self, rank: u8, channel: u8, sample_time: SampleTime) {
        let length = self.regs.isq.read(ISQ::IL);
        let rank = u32::from(rank & 0x3);
        if rank <= length {
            let shift = 15 - (length - rank) * 5;
            let isq = self.regs.isq.get();
            self.regs
                .isq
                .set((isq & !(0x1F << shift)) | (u32::from(channel & 0x1F) << shift));
        }
        self.sample_time_config(channel, sample_time);
    }

    pub fn inserted_trigger_source_config(&mut self, source: InsertedTrigger) {
        self.regs.ctl1.modify(CTL1::ETSIC.val(source as u32));
    }

    pub fn inserted_trigger_enable(&mut self, enable: bool) {
        self.regs.ctl1.modify(CTL1::ETEIC.val(u32::from(enable)));
    }

    pub fn internal_channel_config(&mut self, channel: InternalChannel, enable: bool) {
        let v = u32::from(enable);
        match channel {
            InternalChannel::TempSensor => self.regs.ctl1.modify(CTL1::TSVEN.val(v)),
            InternalChannel::Vrefint => self.regs.ctl1.modify(CTL1::INREFEN.val(v)),
        }
    }

    pub fn inserted_software_trigger(&mut self) {
        self.regs.ctl1.modify(CTL1::SWICST::SET);
    }

    pub fn flag_get(&self, flag: Flag) -> bool {
        self.regs.stat.get() & (1 << flag as u32) != 0
    }

    pub fn flag_clear(&mut self, flag: Flag) {
        self.regs.stat.set(self.regs.stat.get() & !(1 << flag as u32));
    }

    /// Result of inserted rank 0..=3
    pub fn inserted_data_read(&self, rank: u8) -> u16 {
        (self.regs.idata[usize::from(rank & 0x3)].get() & 0xFFFF) as u16
    }

    /// Triggers the inserted group by software, waits for the end of the
    /// group and returns the four inserted data registers.
    pub fn convert_inserted(&mut self) -> [u16; 4] {
        self.inserted_software_trigger();
        while !(self.flag_get(Flag::Eoic) && self.flag_get(Flag::Eoc)) {}

        let data = [
            self.inserted_data_read(0),
            self.inserted_data_read(1),
            self.inserted_data_read(2),
            self.inserted_data_read(3),
        ];

        self.flag_clear(Flag::Eoic);
        self.flag_clear(Flag::Eoc);
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fake_regs;

    #[test]
    fn conversions() {
        // 0.924 V at the sensor is 25 degrees
        let raw = (0.924 * 4095.0 / 3.3) as u16;
        assert!((temperature_celsius(raw) - 25.0).abs() < 0.5);
        assert!((voltage(4095) - 3.3).abs() < 1e-4);
        assert!((voltage(1489) - 1.2).abs() < 1e-3);
    }

    #[test]
    fn inserted_ranks_are_right_aligned() {
        let regs = fake_regs::<RegisterBlock>();
        let mut adc = Adc::with_regs(regs);

        adc.inserted_length_config(2);
        adc.inserted_channel_config(0, CHANNEL_TEMPSENSOR, SampleTime::Cycles160_5);
        adc.inserted_channel_config(1, CHANNEL_VREFINT, SampleTime::Cycles160_5);

        assert_eq!(regs.isq.get(), (1 << 20) | (13 << 10) | (14 << 15));
        assert_eq!(regs.sampt0.get(), (7 << 9) | (7 << 12));
        assert_eq!(regs.sampt1.get(), 0);
    }

    #[test]
    fn temperature_demo_setup() {
        let regs = fake_regs::<RegisterBlock>();
        let mut adc = Adc::with_regs(regs);

        adc.special_function_config(SpecialFunction::Continuous, false);
        adc.special_function_config(SpecialFunction::Scan, true);
        adc.data_alignment_config(Align::Right);
        adc.inserted_trigger_source_config(InsertedTrigger::None);
        adc.inserted_trigger_enable(true);
        adc.internal_channel_config(InternalChannel::TempSensor, true);
        adc.internal_channel_config(InternalChannel::Vrefint, true);
        adc.enable();

        assert_eq!(regs.ctl0.get(), 1 << 8);
        assert_eq!(
            regs.ctl1.get(),
            1 | (7 << 12) | (1 << 15) | (1 << 23) | (1 << 24)
        );
    }

    #[test]
    fn convert_reads_and_clears() {
        let regs = fake_regs::<RegisterBlock>();
        let mut adc = Adc::with_regs(regs);

        regs.stat.set(0b110 | (1 << 4));
        regs.idata[0].set(1150);
        regs.idata[1].set(1489);

        let data = adc.convert_inserted();
        assert_eq!(data[..2], [1150, 1489]);
        assert_eq!(regs.stat.get(), 1 << 4);
        assert!(regs.ctl1.is_set(CTL1::SWICST));
    }
}
