//! Member kind enumerations for the DL type library

use std::fmt;

/// How a member is laid out inside its parent type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomKind {
    /// A single value stored in place
    Basic,
    /// `element_count` values stored in place
    InlineArray,
    /// Offset + count into out-of-line storage
    Array,
    Pointer,
    Bitfield,
    Enum,
    String,
    Unknown(u8),
}

impl From<u8> for AtomKind {
    fn from(value: u8) -> Self {
        match value {
            0 => AtomKind::Basic,
            1 => AtomKind::InlineArray,
            2 => AtomKind::Array,
            3 => AtomKind::Pointer,
            4 => AtomKind::Bitfield,
            5 => AtomKind::Enum,
            6 => AtomKind::String,
            v => AtomKind::Unknown(v),
        }
    }
}

impl From<AtomKind> for u8 {
    fn from(value: AtomKind) -> Self {
        match value {
            AtomKind::Basic => 0,
            AtomKind::InlineArray => 1,
            AtomKind::Array => 2,
            AtomKind::Pointer => 3,
            AtomKind::Bitfield => 4,
            AtomKind::Enum => 5,
            AtomKind::String => 6,
            AtomKind::Unknown(v) => v,
        }
    }
}

/// Storage class of a member's elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Bool,
    /// Nested type, named by the member's type hash
    Struct,
    Enum,
    Hash,
    ThinHash,
    String,
    Unknown(u8),
}

impl From<u8> for StorageKind {
    fn from(value: u8) -> Self {
        match value {
            0 => StorageKind::Int8,
            1 => StorageKind::Int16,
            2 => StorageKind::Int32,
            3 => StorageKind::Int64,
            4 => StorageKind::UInt8,
            5 => StorageKind::UInt16,
            6 => StorageKind::UInt32,
            7 => StorageKind::UInt64,
            8 => StorageKind::Float32,
            9 => StorageKind::Float64,
            10 => StorageKind::Bool,
            11 => StorageKind::Struct,
            12 => StorageKind::Enum,
            13 => StorageKind::Hash,
            14 => StorageKind::ThinHash,
            15 => StorageKind::String,
            v => StorageKind::Unknown(v),
        }
    }
}

impl From<StorageKind> for u8 {
    fn from(value: StorageKind) -> Self {
        match value {
            StorageKind::Int8 => 0,
            StorageKind::Int16 => 1,
            StorageKind::Int32 => 2,
            StorageKind::Int64 => 3,
            StorageKind::UInt8 => 4,
            StorageKind::UInt16 => 5,
            StorageKind::UInt32 => 6,
            StorageKind::UInt64 => 7,
            StorageKind::Float32 => 8,
            StorageKind::Float64 => 9,
            StorageKind::Bool => 10,
            StorageKind::Struct => 11,
            StorageKind::Enum => 12,
            StorageKind::Hash => 13,
            StorageKind::ThinHash => 14,
            StorageKind::String => 15,
            StorageKind::Unknown(v) => v,
        }
    }
}

impl fmt::Display for AtomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomKind::Unknown(v) => write!(f, "Unknown({})", v),
            other => write!(f, "{:?}", other),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Unknown(v) => write!(f, "Unknown({})", v),
            other => write!(f, "{:?}", other),
        }
    }
}
