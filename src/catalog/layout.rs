//! Declarative table layouts.
//!
//! Each table's rows are described as an ordered list of fixed-width
//! fields. Reader handles resolve field positions through these layouts at
//! compile time (`offset_of` is a `const fn`), and the writer checks its
//! hand-rolled rows against `row_size`, so the two sides cannot drift.
//!
//! Table shapes:
//!
//! ```text
//! String heap:    entries addressed by offset, no header
//! Directory:      count, count x i32 row offsets, then rows with their arrays
//! Sorted:         count, then fixed-size rows sorted by lookup key
//! ```
//!
//! Array fields hold a table-relative offset to `len, len x element`, where
//! every element has the fixed shape given in the field kind.

use std::fmt;

use super::codec::{read_f32, read_guid, read_i32, read_str, read_u8};
use super::format::TableKind;

/// Physical kind of a single field or array element component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Byte,
    Bool,
    Int32,
    Float32,
    Guid,
    /// Offset of a length-prefixed string in the string heap
    String,
    /// Offset of a token sequence in the string heap
    Markup,
    /// Offset of a row in another table
    Ref(TableKind),
    /// Like `Ref`, with `-1` meaning absent
    OptionalRef(TableKind),
    /// Offset of a length-prefixed run of elements in the same table
    Array(&'static [FieldKind]),
}

impl FieldKind {
    /// Bytes the field occupies inside its row.
    pub const fn width(&self) -> usize {
        match *self {
            FieldKind::Byte | FieldKind::Bool => 1,
            FieldKind::Guid => 16,
            _ => 4,
        }
    }

    /// Bytes of one element of an array field.
    pub const fn element_size(&self) -> usize {
        match *self {
            FieldKind::Array(parts) => {
                let mut size = 0;
                let mut i = 0;
                while i < parts.len() {
                    size += parts[i].width();
                    i += 1;
                }
                size
            }
            _ => 0,
        }
    }
}

/// A named field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// How rows are addressed within a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableShape {
    /// Rows found through an offset directory after the count
    Directory,
    /// Fixed-size rows directly after the count, sorted by key
    Sorted,
}

/// Row layout of one table.
#[derive(Debug)]
pub struct TableLayout {
    pub table: TableKind,
    pub shape: TableShape,
    pub fields: &'static [Field],
}

impl TableLayout {
    /// Fixed row width (array payloads excluded).
    pub const fn row_size(&self) -> usize {
        let mut size = 0;
        let mut i = 0;
        while i < self.fields.len() {
            size += self.fields[i].kind.width();
            i += 1;
        }
        size
    }

    /// Byte offset of the named field within a row.
    ///
    /// Panics (at compile time when used in a const) for unknown names.
    pub const fn offset_of(&self, name: &str) -> usize {
        let mut offset = 0;
        let mut i = 0;
        while i < self.fields.len() {
            if str_eq(self.fields[i].name, name) {
                return offset;
            }
            offset += self.fields[i].kind.width();
            i += 1;
        }
        panic!("unknown field")
    }

    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of the `index`th row (sorted tables only).
    pub const fn sorted_row(&self, index: usize) -> usize {
        COUNT_SIZE + index * self.row_size()
    }

    /// Layout for a table, `None` for the string heap.
    pub fn for_table(table: TableKind) -> Option<&'static TableLayout> {
        let layout = match table {
            TableKind::String => return None,
            TableKind::Platform => &PLATFORM,
            TableKind::Framework => &FRAMEWORK,
            TableKind::Package => &PACKAGE,
            TableKind::Assembly => &ASSEMBLY,
            TableKind::UsageSource => &USAGE_SOURCE,
            TableKind::Api => &API,
            TableKind::Obsoletion => &OBSOLETION,
            TableKind::PlatformSupport => &PLATFORM_SUPPORT,
            TableKind::PreviewRequirement => &PREVIEW_REQUIREMENT,
            TableKind::Experimental => &EXPERIMENTAL,
            TableKind::ExtensionMethod => &EXTENSION_METHOD,
        };
        Some(layout)
    }
}

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

/// Size of the row count at the start of every non-heap table.
pub const COUNT_SIZE: usize = 4;

/// Position of the `index`th directory slot.
pub const fn directory_slot(index: usize) -> usize {
    COUNT_SIZE + index * 4
}

use FieldKind::{Array, Bool, Byte, Float32, Int32, Markup, OptionalRef, Ref};

pub const PLATFORM: TableLayout = TableLayout {
    table: TableKind::Platform,
    shape: TableShape::Directory,
    fields: &[Field::new("name", FieldKind::String)],
};

pub const FRAMEWORK: TableLayout = TableLayout {
    table: TableKind::Framework,
    shape: TableShape::Directory,
    fields: &[
        Field::new("name", FieldKind::String),
        Field::new("assemblies", Array(&[Ref(TableKind::Assembly)])),
    ],
};

pub const PACKAGE: TableLayout = TableLayout {
    table: TableKind::Package,
    shape: TableShape::Directory,
    fields: &[
        Field::new("name", FieldKind::String),
        Field::new("version", FieldKind::String),
        Field::new(
            "assemblies",
            Array(&[Ref(TableKind::Framework), Ref(TableKind::Assembly)]),
        ),
    ],
};

pub const ASSEMBLY: TableLayout = TableLayout {
    table: TableKind::Assembly,
    shape: TableShape::Directory,
    fields: &[
        Field::new("guid", FieldKind::Guid),
        Field::new("name", FieldKind::String),
        Field::new("publicKeyToken", FieldKind::String),
        Field::new("version", FieldKind::String),
        Field::new("rootApis", Array(&[Ref(TableKind::Api)])),
        Field::new("frameworks", Array(&[Ref(TableKind::Framework)])),
        Field::new(
            "packages",
            Array(&[Ref(TableKind::Package), Ref(TableKind::Framework)]),
        ),
    ],
};

pub const USAGE_SOURCE: TableLayout = TableLayout {
    table: TableKind::UsageSource,
    shape: TableShape::Directory,
    fields: &[Field::new("name", FieldKind::String), Field::new("dayNumber", Int32)],
};

/// The API directory lists root APIs only; other rows hang off `children`.
pub const API: TableLayout = TableLayout {
    table: TableKind::Api,
    shape: TableShape::Directory,
    fields: &[
        Field::new("guid", FieldKind::Guid),
        Field::new("kind", Byte),
        Field::new("parent", OptionalRef(TableKind::Api)),
        Field::new("name", FieldKind::String),
        Field::new("children", Array(&[Ref(TableKind::Api)])),
        Field::new("declarations", Array(&[Ref(TableKind::Assembly), Markup])),
        Field::new("usages", Array(&[Ref(TableKind::UsageSource), Float32])),
    ],
};

pub const OBSOLETION: TableLayout = TableLayout {
    table: TableKind::Obsoletion,
    shape: TableShape::Sorted,
    fields: &[
        Field::new("api", OptionalRef(TableKind::Api)),
        Field::new("assembly", Ref(TableKind::Assembly)),
        Field::new("message", FieldKind::String),
        Field::new("isError", Bool),
        Field::new("diagnosticId", FieldKind::String),
        Field::new("urlFormat", FieldKind::String),
    ],
};

pub const PLATFORM_SUPPORT: TableLayout = TableLayout {
    table: TableKind::PlatformSupport,
    shape: TableShape::Sorted,
    fields: &[
        Field::new("api", OptionalRef(TableKind::Api)),
        Field::new("assembly", Ref(TableKind::Assembly)),
        Field::new("platform", FieldKind::String),
        Field::new("isSupported", Bool),
    ],
};

pub const PREVIEW_REQUIREMENT: TableLayout = TableLayout {
    table: TableKind::PreviewRequirement,
    shape: TableShape::Sorted,
    fields: &[
        Field::new("api", OptionalRef(TableKind::Api)),
        Field::new("assembly", Ref(TableKind::Assembly)),
        Field::new("message", FieldKind::String),
        Field::new("url", FieldKind::String),
    ],
};

pub const EXPERIMENTAL: TableLayout = TableLayout {
    table: TableKind::Experimental,
    shape: TableShape::Sorted,
    fields: &[
        Field::new("api", OptionalRef(TableKind::Api)),
        Field::new("assembly", Ref(TableKind::Assembly)),
        Field::new("diagnosticId", FieldKind::String),
        Field::new("urlFormat", FieldKind::String),
    ],
};

/// Sorted by extended type, so `api` here is the extended type.
pub const EXTENSION_METHOD: TableLayout = TableLayout {
    table: TableKind::ExtensionMethod,
    shape: TableShape::Sorted,
    fields: &[
        Field::new("guid", FieldKind::Guid),
        Field::new("extendedType", Ref(TableKind::Api)),
        Field::new("method", Ref(TableKind::Api)),
    ],
};

/// A decoded field value, for diagnostics and generic dumps.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Byte(u8),
    Bool(bool),
    Int32(i32),
    Float32(f32),
    Guid(crate::Guid),
    String(&'a str),
    Markup(usize),
    Ref(TableKind, usize),
    Null,
    Array(Vec<Vec<FieldValue<'a>>>),
}

impl FieldKind {
    /// Decode a value of this kind at `pos` within `table`.
    pub fn decode<'a>(&self, heap: &'a [u8], table: &'a [u8], pos: usize) -> FieldValue<'a> {
        match *self {
            Byte => FieldValue::Byte(read_u8(table, pos)),
            Bool => FieldValue::Bool(read_u8(table, pos) != 0),
            Int32 => FieldValue::Int32(read_i32(table, pos)),
            Float32 => FieldValue::Float32(read_f32(table, pos)),
            FieldKind::Guid => FieldValue::Guid(read_guid(table, pos)),
            FieldKind::String => FieldValue::String(read_str(heap, read_i32(table, pos) as usize)),
            Markup => FieldValue::Markup(read_i32(table, pos) as usize),
            Ref(target) => FieldValue::Ref(target, read_i32(table, pos) as usize),
            OptionalRef(target) => match read_i32(table, pos) {
                v if v < 0 => FieldValue::Null,
                v => FieldValue::Ref(target, v as usize),
            },
            Array(parts) => {
                let start = read_i32(table, pos) as usize;
                let len = read_i32(table, start) as usize;
                let element_size = self.element_size();
                let elements = (0..len)
                    .map(|i| {
                        let mut at = start + COUNT_SIZE + i * element_size;
                        parts
                            .iter()
                            .map(|part| {
                                let value = part.decode(heap, table, at);
                                at += part.width();
                                value
                            })
                            .collect::<Vec<_>>()
                    })
                    .collect();
                FieldValue::Array(elements)
            }
        }
    }
}

/// Decode every field of the row at `row`.
pub fn decode_row<'a>(
    layout: &TableLayout,
    heap: &'a [u8],
    table: &'a [u8],
    row: usize,
) -> Vec<(&'static str, FieldValue<'a>)> {
    let mut at = row;
    layout
        .fields
        .iter()
        .map(|field| {
            let value = field.kind.decode(heap, table, at);
            at += field.kind.width();
            (field.name, value)
        })
        .collect()
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Byte(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Int32(v) => write!(f, "{}", v),
            FieldValue::Float32(v) => write!(f, "{}", v),
            FieldValue::Guid(v) => write!(f, "{}", v),
            FieldValue::String(v) => write!(f, "{:?}", v),
            FieldValue::Markup(v) => write!(f, "markup@{}", v),
            FieldValue::Ref(table, v) => write!(f, "{}@{}", table, v),
            FieldValue::Null => f.write_str("null"),
            FieldValue::Array(elements) => {
                f.write_str("[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if element.len() == 1 {
                        write!(f, "{}", element[0])?;
                    } else {
                        f.write_str("(")?;
                        for (j, part) in element.iter().enumerate() {
                            if j > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{}", part)?;
                        }
                        f.write_str(")")?;
                    }
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::codec::BinaryWriter;

    #[test]
    fn test_row_sizes() {
        assert_eq!(PLATFORM.row_size(), 4);
        assert_eq!(FRAMEWORK.row_size(), 8);
        assert_eq!(PACKAGE.row_size(), 12);
        assert_eq!(ASSEMBLY.row_size(), 16 + 6 * 4);
        assert_eq!(USAGE_SOURCE.row_size(), 8);
        assert_eq!(API.row_size(), 16 + 1 + 5 * 4);
        assert_eq!(OBSOLETION.row_size(), 4 + 4 + 4 + 1 + 4 + 4);
        assert_eq!(PLATFORM_SUPPORT.row_size(), 13);
        assert_eq!(PREVIEW_REQUIREMENT.row_size(), 16);
        assert_eq!(EXPERIMENTAL.row_size(), 16);
        assert_eq!(EXTENSION_METHOD.row_size(), 24);
    }

    #[test]
    fn test_field_offsets() {
        assert_eq!(API.offset_of("guid"), 0);
        assert_eq!(API.offset_of("kind"), 16);
        assert_eq!(API.offset_of("parent"), 17);
        assert_eq!(API.offset_of("usages"), 33);
        assert_eq!(OBSOLETION.offset_of("isError"), 12);
        assert_eq!(OBSOLETION.offset_of("diagnosticId"), 13);
    }

    #[test]
    fn test_element_sizes() {
        let declarations = API.field("declarations").unwrap();
        assert_eq!(declarations.kind.element_size(), 8);
        let roots = ASSEMBLY.field("rootApis").unwrap();
        assert_eq!(roots.kind.element_size(), 4);
        assert!(API.field("missing").is_none());
    }

    #[test]
    fn test_every_table_but_heap_has_layout() {
        for table in TableKind::ALL {
            let layout = TableLayout::for_table(table);
            assert_eq!(layout.is_some(), table != TableKind::String);
            if let Some(layout) = layout {
                assert_eq!(layout.table, table);
            }
        }
    }

    #[test]
    fn test_decode_row_with_array() {
        let mut heap = BinaryWriter::new();
        heap.write_str("net8.0");
        let heap = heap.into_inner();

        // framework row at 0: name -> heap 0, assemblies -> 8
        let mut table = BinaryWriter::new();
        table.write_i32(0);
        table.write_i32(8);
        table.write_array(&[40i32, 96], |w, v| w.write_i32(*v));
        let table = table.into_inner();

        let row = decode_row(&FRAMEWORK, &heap, &table, 0);
        assert_eq!(row[0], ("name", FieldValue::String("net8.0")));
        assert_eq!(
            row[1].1,
            FieldValue::Array(vec![
                vec![FieldValue::Ref(TableKind::Assembly, 40)],
                vec![FieldValue::Ref(TableKind::Assembly, 96)],
            ])
        );
        assert_eq!(row[1].1.to_string(), "[assembly@40, assembly@96]");
    }
}
