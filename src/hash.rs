//! Hash identifiers used throughout the DL format
//!
//! The engine names every resource, type and short identifier by a hash of
//! its string form. Three widths are in use:
//!
//! - [`ResourceHash`] (64-bit): primary key for resources, component rows and deltas
//! - [`ThinHash`] (32-bit): node names, events and other short identifiers
//! - [`TypeHash`] (32-bit): declared type names in the type library
//!
//! All three derive from MurmurHash64A with a zero seed; the 32-bit forms keep
//! the upper half.

use std::fmt;

const MURMUR_M: u64 = 0xc6a4_a793_5bd1_e995;
const MURMUR_R: u32 = 47;

/// MurmurHash64A over `data`
pub const fn murmur64a(data: &[u8], seed: u64) -> u64 {
    let len = data.len();
    let mut h = seed ^ (len as u64).wrapping_mul(MURMUR_M);

    let blocks = len / 8;
    let mut i = 0;
    while i < blocks {
        let at = i * 8;
        let mut k = (data[at] as u64)
            | (data[at + 1] as u64) << 8
            | (data[at + 2] as u64) << 16
            | (data[at + 3] as u64) << 24
            | (data[at + 4] as u64) << 32
            | (data[at + 5] as u64) << 40
            | (data[at + 6] as u64) << 48
            | (data[at + 7] as u64) << 56;
        k = k.wrapping_mul(MURMUR_M);
        k ^= k >> MURMUR_R;
        k = k.wrapping_mul(MURMUR_M);
        h ^= k;
        h = h.wrapping_mul(MURMUR_M);
        i += 1;
    }

    let tail = blocks * 8;
    let rem = len & 7;
    if rem > 0 {
        let mut j = rem;
        while j > 0 {
            j -= 1;
            h ^= (data[tail + j] as u64) << (8 * j);
        }
        h = h.wrapping_mul(MURMUR_M);
    }

    h ^= h >> MURMUR_R;
    h = h.wrapping_mul(MURMUR_M);
    h ^= h >> MURMUR_R;
    h
}

/// 64-bit identity hash of a concrete resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ResourceHash(pub u64);

impl ResourceHash {
    /// Reserved empty-slot value; never a valid lookup result
    pub const ZERO: ResourceHash = ResourceHash(0);

    pub const fn from_name(name: &str) -> Self {
        ResourceHash(murmur64a(name.as_bytes(), 0))
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// The 32-bit thin form of this hash
    pub const fn thin(&self) -> ThinHash {
        ThinHash((self.0 >> 32) as u32)
    }
}

/// 32-bit hash for short runtime identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ThinHash(pub u32);

impl ThinHash {
    pub const fn from_name(name: &str) -> Self {
        ResourceHash::from_name(name).thin()
    }
}

/// 32-bit hash of a declared type name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TypeHash(pub u32);

impl TypeHash {
    pub const fn from_name(name: &str) -> Self {
        TypeHash((murmur64a(name.as_bytes(), 0) >> 32) as u32)
    }

    /// Little-endian marker used to find instances of this type in a blob
    pub const fn marker(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for ResourceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Display for ThinHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl From<u64> for ResourceHash {
    fn from(value: u64) -> Self {
        ResourceHash(value)
    }
}

impl From<ResourceHash> for u64 {
    fn from(value: ResourceHash) -> Self {
        value.0
    }
}

impl From<u32> for ThinHash {
    fn from(value: u32) -> Self {
        ThinHash(value)
    }
}

impl From<ThinHash> for u32 {
    fn from(value: ThinHash) -> Self {
        value.0
    }
}

impl From<u32> for TypeHash {
    fn from(value: u32) -> Self {
        TypeHash(value)
    }
}

impl From<TypeHash> for u32 {
    fn from(value: TypeHash) -> Self {
        value.0
    }
}
