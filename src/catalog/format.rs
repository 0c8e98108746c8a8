//! Catalog format constants and structures.

use std::fmt;
use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Magic bytes for identifying catalog files.
pub const MAGIC: [u8; 8] = *b"APICATFB";

/// The only format version this build reads or writes.
pub const FORMAT_VERSION: i32 = 10;

/// Number of tables in a catalog.
pub const TABLE_COUNT: usize = 12;

/// Header size in bytes: magic, version, table count, one length per table.
pub const HEADER_SIZE: usize = 16 + TABLE_COUNT * 4;

/// Sentinel stored in place of an absent row reference.
pub const NULL_OFFSET: i32 = -1;

/// The tables of a catalog, in on-disk order.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKind {
    /// Deduplicated strings and markup token sequences
    String = 0,
    Platform = 1,
    Framework = 2,
    Package = 3,
    Assembly = 4,
    UsageSource = 5,
    Api = 6,
    Obsoletion = 7,
    PlatformSupport = 8,
    PreviewRequirement = 9,
    Experimental = 10,
    ExtensionMethod = 11,
}

impl TableKind {
    /// All tables in on-disk order.
    pub const ALL: [TableKind; TABLE_COUNT] = [
        TableKind::String,
        TableKind::Platform,
        TableKind::Framework,
        TableKind::Package,
        TableKind::Assembly,
        TableKind::UsageSource,
        TableKind::Api,
        TableKind::Obsoletion,
        TableKind::PlatformSupport,
        TableKind::PreviewRequirement,
        TableKind::Experimental,
        TableKind::ExtensionMethod,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            TableKind::String => "string",
            TableKind::Platform => "platform",
            TableKind::Framework => "framework",
            TableKind::Package => "package",
            TableKind::Assembly => "assembly",
            TableKind::UsageSource => "usageSource",
            TableKind::Api => "api",
            TableKind::Obsoletion => "obsoletion",
            TableKind::PlatformSupport => "platformSupport",
            TableKind::PreviewRequirement => "previewRequirement",
            TableKind::Experimental => "experimental",
            TableKind::ExtensionMethod => "extensionMethod",
        }
    }

    /// Parse a table name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of an API node.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApiKind {
    Namespace = 0,
    Interface = 1,
    Delegate = 2,
    Enum = 3,
    Struct = 4,
    Class = 5,
    Constant = 6,
    EnumItem = 7,
    Field = 8,
    Constructor = 9,
    Destructor = 10,
    Property = 11,
    PropertyGetter = 12,
    PropertySetter = 13,
    Method = 14,
    Operator = 15,
    Event = 16,
    EventAdder = 17,
    EventRemover = 18,
    EventRaiser = 19,
}

impl ApiKind {
    /// Convert from a u8 value.
    ///
    /// Returns `None` for invalid values.
    pub fn from_u8(v: u8) -> Option<Self> {
        use ApiKind::*;
        let kind = match v {
            0 => Namespace,
            1 => Interface,
            2 => Delegate,
            3 => Enum,
            4 => Struct,
            5 => Class,
            6 => Constant,
            7 => EnumItem,
            8 => Field,
            9 => Constructor,
            10 => Destructor,
            11 => Property,
            12 => PropertyGetter,
            13 => PropertySetter,
            14 => Method,
            15 => Operator,
            16 => Event,
            17 => EventAdder,
            18 => EventRemover,
            19 => EventRaiser,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_namespace(self) -> bool {
        self == ApiKind::Namespace
    }

    pub fn is_type(self) -> bool {
        matches!(
            self,
            ApiKind::Interface
                | ApiKind::Delegate
                | ApiKind::Enum
                | ApiKind::Struct
                | ApiKind::Class
        )
    }

    pub fn is_member(self) -> bool {
        !self.is_namespace() && !self.is_type()
    }

    pub fn is_accessor(self) -> bool {
        matches!(
            self,
            ApiKind::PropertyGetter
                | ApiKind::PropertySetter
                | ApiKind::EventAdder
                | ApiKind::EventRemover
                | ApiKind::EventRaiser
        )
    }

    /// Prefix used in documentation-style identity strings.
    pub fn doc_prefix(self) -> char {
        match self {
            ApiKind::Namespace => 'N',
            k if k.is_type() => 'T',
            ApiKind::Constant | ApiKind::EnumItem | ApiKind::Field => 'F',
            ApiKind::Property => 'P',
            ApiKind::Event => 'E',
            _ => 'M',
        }
    }

    /// Ordering rank among siblings: types, then members grouped by kind.
    pub fn sort_rank(self) -> u8 {
        match self {
            ApiKind::Namespace => 0,
            k if k.is_type() => 1,
            ApiKind::EnumItem => 2,
            ApiKind::Constant | ApiKind::Field => 3,
            ApiKind::Constructor | ApiKind::Destructor => 4,
            ApiKind::Property | ApiKind::PropertyGetter | ApiKind::PropertySetter => 5,
            ApiKind::Method | ApiKind::Operator => 6,
            _ => 7,
        }
    }
}

impl fmt::Display for ApiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Catalog file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogHeader {
    pub version: i32,
    /// Byte length of each table, in `TableKind::ALL` order
    pub table_lengths: [i32; TABLE_COUNT],
}

impl CatalogHeader {
    pub fn new(table_lengths: [i32; TABLE_COUNT]) -> Self {
        Self {
            version: FORMAT_VERSION,
            table_lengths,
        }
    }

    /// Sum of all table lengths, i.e. the inflated payload size.
    ///
    /// Fails when the sum does not fit in `usize`.
    pub fn payload_len(&self) -> Result<usize> {
        let mut total: usize = 0;
        for (kind, &length) in TableKind::ALL.iter().zip(&self.table_lengths) {
            total = usize::try_from(length)
                .ok()
                .and_then(|len| total.checked_add(len))
                .ok_or(Error::InvalidTableLength {
                    table: kind.name(),
                    length,
                })?;
        }
        Ok(total)
    }

    pub fn table_len(&self, table: TableKind) -> usize {
        self.table_lengths[table.index()] as usize
    }

    /// Write magic, version, count and lengths.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&MAGIC)?;
        out.write_all(&self.version.to_le_bytes())?;
        out.write_all(&(TABLE_COUNT as i32).to_le_bytes())?;
        for len in &self.table_lengths {
            out.write_all(&len.to_le_bytes())?;
        }
        Ok(())
    }

    /// Read and validate a header, leaving `input` at the compressed stream.
    pub fn read_from<R: Read>(input: &mut R) -> Result<Self> {
        let mut magic = [0u8; 8];
        read_section(input, &mut magic, "magic")?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic);
        }

        let version = read_i32(input, "format version")?;
        if version != FORMAT_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let count = read_i32(input, "table count")?;
        if count != TABLE_COUNT as i32 {
            return Err(Error::InvalidTableCount {
                expected: TABLE_COUNT,
                actual: count,
            });
        }

        let mut table_lengths = [0i32; TABLE_COUNT];
        for (slot, kind) in table_lengths.iter_mut().zip(TableKind::ALL) {
            let length = read_i32(input, "table lengths")?;
            if length < 0 {
                return Err(Error::InvalidTableLength {
                    table: kind.name(),
                    length,
                });
            }
            *slot = length;
        }

        Ok(Self {
            version,
            table_lengths,
        })
    }
}

fn read_section<R: Read>(input: &mut R, buf: &mut [u8], section: &'static str) -> Result<()> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::Truncated { section },
        _ => Error::Io(e),
    })
}

fn read_i32<R: Read>(input: &mut R, section: &'static str) -> Result<i32> {
    let mut bytes = [0u8; 4];
    read_section(input, &mut bytes, section)?;
    Ok(i32::from_le_bytes(bytes))
}
