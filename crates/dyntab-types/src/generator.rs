use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const OEM_BIT: u32 = 1 << 31;
const TYPE_SHIFT: u32 = 24;
const TYPE_MASK: u32 = 0x7f << TYPE_SHIFT;
const TABLE_TYPE_ACPI: u32 = 1;
const TABLE_ID_MASK: u32 = 0xffff;

/// Standard ACPI tables a generator may be registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum StdAcpiTableId {
    Raw = 1,
    Fadt,
    Madt,
    Gtdt,
    Dbg2,
    Spcr,
    Mcfg,
    Iort,
    Pptt,
    Srat,
    Ssdt,
}

impl StdAcpiTableId {
    pub const ALL: [StdAcpiTableId; 11] = [
        Self::Raw,
        Self::Fadt,
        Self::Madt,
        Self::Gtdt,
        Self::Dbg2,
        Self::Spcr,
        Self::Mcfg,
        Self::Iort,
        Self::Pptt,
        Self::Srat,
        Self::Ssdt,
    ];

    /// Lowercase short name, as used in platform descriptions.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Fadt => "fadt",
            Self::Madt => "madt",
            Self::Gtdt => "gtdt",
            Self::Dbg2 => "dbg2",
            Self::Spcr => "spcr",
            Self::Mcfg => "mcfg",
            Self::Iort => "iort",
            Self::Pptt => "pptt",
            Self::Srat => "srat",
            Self::Ssdt => "ssdt",
        }
    }

    pub fn from_raw(raw: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|id| *id as u16 == raw)
    }
}

/// Identifies the generator responsible for building a table.
///
/// Bit 31 selects the OEM namespace, bits [30:24] the table type, and the
/// low 16 bits the table id within that namespace.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GeneratorId(u32);

impl GeneratorId {
    /// Generator for a standard ACPI table.
    pub const fn std_acpi(table: StdAcpiTableId) -> Self {
        Self((TABLE_TYPE_ACPI << TYPE_SHIFT) | table as u32)
    }

    /// Generator for an OEM-defined ACPI table.
    pub const fn oem_acpi(table_id: u16) -> Self {
        Self(OEM_BIT | (TABLE_TYPE_ACPI << TYPE_SHIFT) | table_id as u32)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }

    pub const fn is_oem(&self) -> bool {
        self.0 & OEM_BIT != 0
    }

    pub const fn is_acpi(&self) -> bool {
        (self.0 & TYPE_MASK) >> TYPE_SHIFT == TABLE_TYPE_ACPI
    }

    pub const fn table_id(&self) -> u16 {
        (self.0 & TABLE_ID_MASK) as u16
    }

    /// The standard table this id names, if any.
    pub fn std_table(&self) -> Option<StdAcpiTableId> {
        if self.is_oem() || !self.is_acpi() {
            return None;
        }
        StdAcpiTableId::from_raw(self.table_id())
    }
}

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.std_table() {
            Some(table) => f.write_str(table.name()),
            None if self.is_oem() => write!(f, "oem:{}", self.table_id()),
            None => write!(f, "0x{:08x}", self.0),
        }
    }
}

impl fmt::Debug for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GeneratorId({self})")
    }
}

impl FromStr for GeneratorId {
    type Err = TypeError;

    /// Accepts a standard table name (`"iort"`), `oem:<id>`, or a raw
    /// `0x`-prefixed id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if let Some(table) = StdAcpiTableId::ALL.into_iter().find(|t| t.name() == lower) {
            return Ok(Self::std_acpi(table));
        }
        if let Some(id) = lower.strip_prefix("oem:") {
            return id
                .parse::<u16>()
                .map(Self::oem_acpi)
                .map_err(|_| TypeError::UnknownGenerator(s.to_string()));
        }
        if let Some(hex) = lower.strip_prefix("0x") {
            return u32::from_str_radix(hex, 16)
                .map(Self)
                .map_err(|_| TypeError::UnknownGenerator(s.to_string()));
        }
        Err(TypeError::UnknownGenerator(s.to_string()))
    }
}

impl TryFrom<String> for GeneratorId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GeneratorId> for String {
    fn from(id: GeneratorId) -> Self {
        id.to_string()
    }
}
