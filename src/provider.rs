//! Raw blob providers
//!
//! The library never touches archives or the filesystem. Whatever loaded the
//! game data hands blobs over through [`BlobProvider`], keyed by the
//! well-known resource hashes in [`DataLibraryOptions`](crate::DataLibraryOptions).

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::hash::ResourceHash;

/// Source of already-loaded resource blobs
pub trait BlobProvider: Send + Sync {
    /// Return the blob for `id`, or `None` if it cannot be supplied
    fn load(&self, id: ResourceHash) -> Option<Vec<u8>>;

    /// Like [`load`](Self::load), failing with `ResourceUnavailable`
    fn require(&self, id: ResourceHash) -> Result<Vec<u8>> {
        self.load(id).ok_or(Error::ResourceUnavailable(id))
    }
}

impl<F> BlobProvider for F
where
    F: Fn(ResourceHash) -> Option<Vec<u8>> + Send + Sync,
{
    fn load(&self, id: ResourceHash) -> Option<Vec<u8>> {
        self(id)
    }
}

/// In-memory provider backed by a map
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobs {
    blobs: HashMap<ResourceHash, Vec<u8>>,
}

impl MemoryBlobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a blob
    pub fn insert(&mut self, id: ResourceHash, data: Vec<u8>) -> Option<Vec<u8>> {
        self.blobs.insert(id, data)
    }

    /// Builder-style insert
    pub fn with_blob(mut self, id: ResourceHash, data: Vec<u8>) -> Self {
        self.blobs.insert(id, data);
        self
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl BlobProvider for MemoryBlobs {
    fn load(&self, id: ResourceHash) -> Option<Vec<u8>> {
        self.blobs.get(&id).cloned()
    }
}
