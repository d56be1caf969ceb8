//! Register layout of the MidNite Classic.
//!
//! Every block is an ordered list of fields that consumes its registers byte by
//! byte, most significant byte of each word first. Reserved words are declared
//! as `skip` fields so each block's length is exactly what the controller is
//! asked for.

use super::{
    derive,
    decoder::Payload,
    registers,
    tables::{self, Table},
};
use tokio_modbus::Address;
use WordOrder::LowFirst;

/// How two consecutive registers combine into one 32-bit value.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum WordOrder {
    #[cfg_attr(not(test), allow(dead_code))]
    HighFirst,
    LowFirst,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Kind {
    U8,
    I8,
    U16,
    I16,
    U32(WordOrder),
    I32(WordOrder),
    F32(WordOrder),
    /// Reserved bytes, emitted as `null`.
    Skip(usize),
}

impl Kind {
    pub const fn byte_len(self) -> usize {
        match self {
            Kind::U8 | Kind::I8 => 1,
            Kind::U16 | Kind::I16 => 2,
            Kind::U32(_) | Kind::I32(_) | Kind::F32(_) => 4,
            Kind::Skip(bytes) => bytes,
        }
    }
}

/// A masked slice of a flag word, published as its own integer and
/// optionally resolved to text.
#[derive(Debug, Copy, Clone)]
pub struct BitGroup {
    pub name: &'static str,
    pub mask: u32,
    pub shift: u32,
    pub lookup: Option<(&'static Table, &'static str)>,
}

#[derive(Debug, Copy, Clone)]
pub enum Conversion {
    Raw,
    /// `raw / divisor + offset`, always published as a float.
    Scale { divisor: f64, offset: f64 },
    Lookup { table: &'static Table, text: &'static str },
    Flags(&'static [BitGroup]),
}

#[derive(Debug, Copy, Clone)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
    pub conversion: Conversion,
}

impl Field {
    const fn new(name: &'static str, kind: Kind) -> Self {
        Self { name, kind, conversion: Conversion::Raw }
    }

    pub const fn u8(name: &'static str) -> Self {
        Self::new(name, Kind::U8)
    }

    pub const fn i8(name: &'static str) -> Self {
        Self::new(name, Kind::I8)
    }

    pub const fn u16(name: &'static str) -> Self {
        Self::new(name, Kind::U16)
    }

    pub const fn i16(name: &'static str) -> Self {
        Self::new(name, Kind::I16)
    }

    pub const fn u32(name: &'static str, order: WordOrder) -> Self {
        Self::new(name, Kind::U32(order))
    }

    pub const fn i32(name: &'static str, order: WordOrder) -> Self {
        Self::new(name, Kind::I32(order))
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub const fn f32(name: &'static str, order: WordOrder) -> Self {
        Self::new(name, Kind::F32(order))
    }

    pub const fn skip(name: &'static str, bytes: usize) -> Self {
        Self::new(name, Kind::Skip(bytes))
    }

    pub const fn scaled(self, divisor: f64) -> Self {
        self.offset(divisor, 0.0)
    }

    pub const fn offset(self, divisor: f64, offset: f64) -> Self {
        Self { conversion: Conversion::Scale { divisor, offset }, ..self }
    }

    pub const fn lookup(self, table: &'static Table, text: &'static str) -> Self {
        Self { conversion: Conversion::Lookup { table, text }, ..self }
    }

    pub const fn flags(self, groups: &'static [BitGroup]) -> Self {
        Self { conversion: Conversion::Flags(groups), ..self }
    }
}

/// Values assembled from several already decoded fields of the same block.
#[derive(Debug, Copy, Clone)]
pub enum Composite {
    /// One ASCII character per part, joined in the listed order.
    Ascii { name: &'static str, parts: &'static [&'static str] },
    /// Colon separated upper-case hex, one octet per part in the listed order.
    Mac { name: &'static str, parts: [&'static str; 6] },
    /// `YYYY-MM-DD`.
    Date { name: &'static str, year: &'static str, month: &'static str, day: &'static str },
}

impl Composite {
    pub fn name(&self) -> &'static str {
        match self {
            Composite::Ascii { name, .. } | Composite::Mac { name, .. } | Composite::Date { name, .. } => *name,
        }
    }
}

#[derive(Debug)]
pub struct Block {
    pub name: &'static str,
    pub start: Address,
    pub fields: &'static [Field],
    pub composites: &'static [Composite],
}

impl Block {
    pub fn byte_len(&self) -> usize {
        self.fields.iter().map(|field| field.kind.byte_len()).sum()
    }

    /// Number of registers this block reads and decodes.
    pub fn word_count(&self) -> usize {
        self.byte_len().div_ceil(2)
    }
}

/// A full controller layout: blocks in read order plus the fields computed
/// from the merged result.
pub struct Device {
    pub name: &'static str,
    pub blocks: &'static [&'static Block],
    pub derivations: &'static [fn(&mut Payload)],
}

impl Device {
    pub fn block_at(&self, start: Address) -> Option<&'static Block> {
        self.blocks.iter().copied().find(|block| block.start == start)
    }
}

pub static MAIN: Block = Block {
    name: "main",
    start: registers::MAIN_BLOCK,
    fields: &[
        Field::u8("PCB"),
        Field::u8("Type"),
        Field::u16("Year"),
        Field::u8("Month"),
        Field::u8("Day"),
        Field::u16("InfoFlagBits3").flags(&[]),
        Field::skip("ignore", 2),
        Field::u8("mac_1"),
        Field::u8("mac_0"),
        Field::u8("mac_3"),
        Field::u8("mac_2"),
        Field::u8("mac_5"),
        Field::u8("mac_4"),
        Field::skip("ignore2", 4),
        Field::u32("unitID", LowFirst),
        Field::u16("StatusRoll"),
        Field::u16("RsetTmms"),
        Field::i16("BatVoltage").scaled(10.0),
        Field::u16("PVVoltage").scaled(10.0),
        Field::u16("BatCurrent").scaled(10.0),
        Field::u16("EnergyToday").scaled(10.0),
        Field::u16("Power").scaled(1.0),
        Field::u8("ChargeStage").lookup(&tables::CHARGE_STAGE, "ChargeStateText"),
        Field::u8("State"),
        Field::u16("PVCurrent").scaled(10.0),
        Field::u16("lastVOC").scaled(10.0),
        Field::u16("HighestVinputLog"),
        Field::u16("MatchPointShadow"),
        Field::u16("AmpHours"),
        Field::u32("TotalEnergy", LowFirst).scaled(10.0),
        Field::u32("LifetimeAmpHours", LowFirst),
        Field::u32("InfoFlagsBits", LowFirst).flags(&[]),
        Field::i16("BatTemperature").scaled(10.0),
        Field::i16("FETTemperature").scaled(10.0),
        Field::i16("PCBTemperature").scaled(10.0),
        Field::u16("NiteMinutesNoPwr"),
        Field::u16("MinuteLogIntervalSec"),
        Field::u16("modbus_port_register"),
        Field::u16("FloatTimeTodaySeconds"),
        Field::u16("AbsorbTime"),
        Field::u16("reserved1"),
        Field::u16("PWM_ReadOnly"),
        Field::u16("Reason_For_Reset"),
        Field::u16("EqualizeTime"),
        Field::skip("reserved2", 2),
    ],
    composites: &[
        Composite::Mac { name: "MAC", parts: ["mac_5", "mac_4", "mac_3", "mac_2", "mac_1", "mac_0"] },
        Composite::Date { name: "BuildDate", year: "Year", month: "Month", day: "Day" },
    ],
};

static AUX12_GROUPS: [BitGroup; 4] = [
    BitGroup {
        name: "Aux1OffAutoOn",
        mask: 0x00c0,
        shift: 6,
        lookup: Some((&tables::AUX_STATE, "Aux1OffAutoOnText")),
    },
    BitGroup {
        name: "Aux1Function",
        mask: 0x003f,
        shift: 0,
        lookup: Some((&tables::AUX1_FUNCTION, "Aux1FunctionText")),
    },
    BitGroup {
        name: "Aux2OffAutoOn",
        mask: 0xc000,
        shift: 14,
        lookup: Some((&tables::AUX_STATE, "Aux2OffAutoOnText")),
    },
    BitGroup {
        name: "Aux2Function",
        mask: 0x3f00,
        shift: 8,
        lookup: Some((&tables::AUX2_FUNCTION, "Aux2FunctionText")),
    },
];

pub static MODE: Block = Block {
    name: "mode",
    start: registers::MODE_BLOCK,
    fields: &[
        Field::u16("MPPTMode").lookup(&tables::MPPT_MODE, "MPPTModeText"),
        Field::u16("Aux12Function").flags(&AUX12_GROUPS),
    ],
    composites: &[],
};

pub static NAME: Block = Block {
    name: "name",
    start: registers::NAME_BLOCK,
    fields: &[
        Field::u8("Name0"),
        Field::u8("Name1"),
        Field::u8("Name2"),
        Field::u8("Name3"),
        Field::u8("Name4"),
        Field::u8("Name5"),
        Field::u8("Name6"),
        Field::u8("Name7"),
    ],
    // the name is stored with the two characters of each word swapped
    composites: &[Composite::Ascii {
        name: "Name",
        parts: &["Name1", "Name0", "Name3", "Name2", "Name5", "Name4", "Name7", "Name6"],
    }],
};

pub static TIME: Block = Block {
    name: "time",
    start: registers::TIME_BLOCK,
    fields: &[
        Field::u32("CTIME0", LowFirst),
        Field::u32("CTIME1", LowFirst),
        Field::u32("CTIME2", LowFirst),
    ],
    composites: &[],
};

pub static SETTING: Block = Block {
    name: "setting",
    start: registers::SETTING_BLOCK,
    fields: &[
        Field::i16("VbattRegSetPTmpComp").scaled(10.0),
        Field::u16("nominalBatteryVoltage"),
        Field::i16("endingAmps").scaled(10.0),
        Field::skip("skip5", 56),
        Field::u16("ReasonForResting").lookup(&tables::REST_REASON, "ReasonForRestingText"),
    ],
    composites: &[],
};

pub static WHIZBANG: Block = Block {
    name: "whizbang",
    start: registers::WHIZBANG_BLOCK,
    fields: &[
        Field::u16("WbangJrCmdS"),
        Field::i16("WizBangJrRawCurrent"),
        Field::skip("skip", 4),
        Field::u32("WbJrAmpHourPOSitive", LowFirst),
        Field::i32("WbJrAmpHourNEGative", LowFirst),
        Field::i32("WbJrAmpHourNET", LowFirst),
        Field::i16("WhizbangBatCurrent").scaled(10.0),
        Field::i8("WizBangCRC"),
        Field::i8("ShuntTemperature").offset(1.0, -50.0),
        Field::u16("SOC"),
        Field::skip("skip2", 6),
        Field::u16("RemainingAmpHours"),
        Field::skip("skip3", 6),
        Field::u16("TotalAmpHours"),
        Field::skip("skip4", 2),
    ],
    composites: &[],
};

pub static VERSION: Block = Block {
    name: "version",
    start: registers::VERSION_BLOCK,
    fields: &[Field::u32("app_rev", LowFirst), Field::u32("net_rev", LowFirst)],
    composites: &[],
};

pub static CLASSIC: Device = Device {
    name: "Classic",
    blocks: &[&MAIN, &WHIZBANG, &MODE, &NAME, &TIME, &SETTING, &VERSION],
    derivations: &[derive::device_type, derive::charge_state_icon, derive::soc_icon],
};
