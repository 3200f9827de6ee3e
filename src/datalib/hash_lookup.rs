//! Hash lookup tree parser
//!
//! The hash lookup blob carries several redundant indexing structures used by
//! the engine to go from abstract "add path" keys to resources. Only the flat
//! map in front of the last tree group is kept; everything else is parsed to
//! keep the cursor honest and then dropped.
//!
//! Layout, in order:
//!
//! 1. parent groups: `u32` count, then per group a `u32` count (zero counts
//!    before it are padding) and that many `u64` hashes
//! 2. hash array 1, map 1, hash array 2, hash array 3
//! 3. thin map: `u32` count of `{key: u32, value: u64}`
//! 4. four groups, each a flat map followed by `u32` count of lookup trees
//! 5. sentinel `0xDEADBEE7`

use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::HashMap;
use std::io::Cursor;

use crate::error::{Error, Result};
use crate::hash::{ResourceHash, ThinHash};

/// Trailing sentinel of a hash lookup blob
pub const HASH_LOOKUP_SENTINEL: u32 = 0xDEAD_BEE7;

/// Number of lookup tree groups
const TREE_GROUPS: usize = 4;

struct LookupReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> LookupReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        LookupReader {
            cursor: Cursor::new(data),
        }
    }

    fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.cursor.position() as usize)
    }

    /// Read a count of `record_size`-byte records, rejecting counts the blob cannot hold
    fn count(&mut self, record_size: usize, what: &str) -> Result<usize> {
        let count = self.cursor.read_u32::<LittleEndian>()? as usize;
        if count.saturating_mul(record_size) > self.remaining() {
            return Err(Error::Truncated(format!(
                "{} declares {} entries but only {} bytes remain",
                what,
                count,
                self.remaining()
            )));
        }
        Ok(count)
    }

    fn hashes(&mut self, count: usize) -> Result<Vec<u64>> {
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.cursor.read_u64::<LittleEndian>()?);
        }
        Ok(out)
    }

    fn hash_array(&mut self, what: &str) -> Result<Vec<u64>> {
        let count = self.count(8, what)?;
        self.hashes(count)
    }

    fn pairs(&mut self, count: usize) -> Result<Vec<(u64, u64)>> {
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let key = self.cursor.read_u64::<LittleEndian>()?;
            let value = self.cursor.read_u64::<LittleEndian>()?;
            out.push((key, value));
        }
        Ok(out)
    }

    fn map(&mut self, what: &str) -> Result<Vec<(u64, u64)>> {
        let count = self.count(16, what)?;
        self.pairs(count)
    }

    /// A parent group; zero counts in front of the real one are padding
    fn parent(&mut self) -> Result<Vec<u64>> {
        let count = loop {
            let count = self.count(8, "parent group")?;
            if count != 0 {
                break count;
            }
        };
        self.hashes(count)
    }

    fn thin_map(&mut self) -> Result<Vec<(ThinHash, u64)>> {
        let count = self.count(12, "thin map")?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let key = ThinHash(self.cursor.read_u32::<LittleEndian>()?);
            let value = self.cursor.read_u64::<LittleEndian>()?;
            out.push((key, value));
        }
        Ok(out)
    }

    /// Skip a group of typed, counted sub-maps; returns how many there were
    fn trees(&mut self, what: &str) -> Result<usize> {
        let count = self.count(12, what)?;
        for _ in 0..count {
            let tree_type = ThinHash(self.cursor.read_u32::<LittleEndian>()?);
            let _unused = self.cursor.read_u32::<LittleEndian>()?;
            let entries = self.count(16, "lookup tree")?;
            self.pairs(entries)?;
            tracing::trace!("skipped lookup tree {} ({} entries)", tree_type, entries);
        }
        Ok(count)
    }

    fn sentinel(&mut self) -> Result<()> {
        let value = self.cursor.read_u32::<LittleEndian>().map_err(|_| {
            Error::CorruptFormat("hash lookup blob ends without its sentinel".into())
        })?;
        if value != HASH_LOOKUP_SENTINEL {
            return Err(Error::CorruptFormat(format!(
                "hash lookup sentinel is {:08x}, expected {:08x}",
                value, HASH_LOOKUP_SENTINEL
            )));
        }
        Ok(())
    }
}

/// Reverse map from add-path key to resource
#[derive(Debug, Clone, Default)]
pub struct HashLookupTable {
    entries: HashMap<u64, ResourceHash>,
}

impl HashLookupTable {
    /// Parse a hash lookup blob; there is no partial result
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = LookupReader::new(data);

        let parent_count = reader.count(4, "parent groups")?;
        let mut parent_hashes = 0usize;
        for _ in 0..parent_count {
            parent_hashes += reader.parent()?.len();
        }

        let array1 = reader.hash_array("hash array 1")?;
        let _map1 = reader.map("hashmap 1")?;
        let array2 = reader.hash_array("hash array 2")?;
        let array3 = reader.hash_array("hash array 3")?;
        let thin = reader.thin_map()?;

        let mut group_maps = Vec::with_capacity(TREE_GROUPS);
        let mut tree_count = 0usize;
        for group in 0..TREE_GROUPS {
            // group maps are hashmaps 2..=5
            group_maps.push(reader.map(&format!("hashmap {}", group + 2))?);
            tree_count += reader.trees(&format!("tree group {}", group + 1))?;
        }

        reader.sentinel()?;
        if reader.remaining() > 0 {
            tracing::debug!("{} bytes after hash lookup sentinel ignored", reader.remaining());
        }

        let entries: HashMap<u64, ResourceHash> = group_maps
            .pop()
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| (key, ResourceHash(value)))
            .collect();

        tracing::debug!(
            "hash lookup: {} parents ({} hashes), arrays {}/{}/{}, {} thin, {} trees, {} kept",
            parent_count,
            parent_hashes,
            array1.len(),
            array2.len(),
            array3.len(),
            thin.len(),
            tree_count,
            entries.len()
        );
        Ok(HashLookupTable { entries })
    }

    pub fn get(&self, key: u64) -> Option<ResourceHash> {
        self.entries.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, ResourceHash)> + '_ {
        self.entries.iter().map(|(&k, &v)| (k, v))
    }
}

/// Parse a hash lookup blob into its reverse map
pub fn parse_hash_lookup(data: &[u8]) -> Result<HashLookupTable> {
    HashLookupTable::parse(data)
}
