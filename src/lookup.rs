//! Name lookup signatures supplied by the surrounding tool
//!
//! The core never resolves hashes to names itself. Callers that own a string
//! table or a name dictionary plug it in through these traits; anything
//! unknown falls back to the hash's hexadecimal form.

use crate::hash::{ResourceHash, ThinHash};

/// Resolve a 64-bit resource hash to a readable name
pub trait HashLookup {
    fn find(&self, hash: ResourceHash) -> Option<String>;

    fn name(&self, hash: ResourceHash) -> String {
        self.find(hash).unwrap_or_else(|| hash.to_string())
    }
}

/// Resolve a 32-bit thin hash to a readable name
pub trait ThinHashLookup {
    fn find(&self, hash: ThinHash) -> Option<String>;

    fn name(&self, hash: ThinHash) -> String {
        self.find(hash).unwrap_or_else(|| hash.to_string())
    }
}

/// Resolve a localized string id to text
pub trait StringsLookup {
    fn find(&self, id: u32) -> Option<String>;

    fn text(&self, id: u32) -> String {
        self.find(id).unwrap_or_else(|| format!("{:08x}", id))
    }
}

impl<F> HashLookup for F
where
    F: Fn(ResourceHash) -> Option<String>,
{
    fn find(&self, hash: ResourceHash) -> Option<String> {
        self(hash)
    }
}

impl<F> ThinHashLookup for F
where
    F: Fn(ThinHash) -> Option<String>,
{
    fn find(&self, hash: ThinHash) -> Option<String> {
        self(hash)
    }
}

impl<F> StringsLookup for F
where
    F: Fn(u32) -> Option<String>,
{
    fn find(&self, id: u32) -> Option<String> {
        self(id)
    }
}

/// Lookup that knows no names
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl HashLookup for NoLookup {
    fn find(&self, _hash: ResourceHash) -> Option<String> {
        None
    }
}

impl ThinHashLookup for NoLookup {
    fn find(&self, _hash: ThinHash) -> Option<String> {
        None
    }
}

impl StringsLookup for NoLookup {
    fn find(&self, _id: u32) -> Option<String> {
        None
    }
}
