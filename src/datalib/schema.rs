//! Runtime type library
//!
//! The type library describes every DL type: its size and its member list.
//! It is never used to decode data generically. Component readers keep their
//! compiled-in layouts and only ask the registry whether those layouts still
//! match the shipped build.

use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::HashMap;
use std::io::{Cursor, Read};

use crate::datalib::types::{AtomKind, StorageKind};
use crate::error::{Error, Result};
use crate::hash::{ThinHash, TypeHash};
use crate::lookup::ThinHashLookup;

/// One member of a declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Member name
    pub name: ThinHash,
    /// Element type
    pub type_hash: TypeHash,
    pub atom_kind: AtomKind,
    pub storage_kind: StorageKind,
    /// Number of elements for inline arrays, 1 otherwise
    pub element_count: u32,
}

impl Member {
    pub const RECORD_SIZE: usize = 16;

    fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let name = ThinHash(reader.read_u32::<LittleEndian>()?);
        let type_hash = TypeHash(reader.read_u32::<LittleEndian>()?);
        let atom_kind = AtomKind::from(reader.read_u8()?);
        let storage_kind = StorageKind::from(reader.read_u8()?);
        let _reserved = reader.read_u16::<LittleEndian>()?;
        let element_count = reader.read_u32::<LittleEndian>()?;
        Ok(Member {
            name,
            type_hash,
            atom_kind,
            storage_kind,
            element_count,
        })
    }
}

/// Declared layout of one type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSchema {
    pub type_hash: TypeHash,
    pub size_bytes: u32,
    pub members: Vec<Member>,
}

impl TypeSchema {
    /// Size of the fixed `{type_hash, size, member_count}` prefix
    pub const HEADER_SIZE: usize = 12;

    pub fn member(&self, index: usize) -> Option<&Member> {
        self.members.get(index)
    }
}

/// Every type in a type library, keyed by type hash
#[derive(Debug, Clone, Default)]
pub struct TypeSchemaRegistry {
    types: HashMap<TypeHash, TypeSchema>,
}

impl TypeSchemaRegistry {
    /// Parse a type library blob
    ///
    /// Any failure rejects the whole library; there is no partial registry.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let type_count = cursor.read_u32::<LittleEndian>()?;

        // Each type needs at least its header; reject absurd counts before allocating
        let remaining = data.len().saturating_sub(4);
        if type_count as usize > remaining / TypeSchema::HEADER_SIZE {
            return Err(Error::Truncated(format!(
                "type library declares {} types but holds only {} bytes",
                type_count, remaining
            )));
        }

        let mut types = HashMap::with_capacity(type_count as usize);
        for _ in 0..type_count {
            let type_hash = TypeHash(cursor.read_u32::<LittleEndian>()?);
            let size_bytes = cursor.read_u32::<LittleEndian>()?;
            let member_count = cursor.read_u32::<LittleEndian>()?;

            let mut members = Vec::with_capacity((member_count as usize).min(1024));
            for _ in 0..member_count {
                members.push(Member::read(&mut cursor)?);
            }

            let schema = TypeSchema {
                type_hash,
                size_bytes,
                members,
            };
            if types.insert(type_hash, schema).is_some() {
                return Err(Error::CorruptFormat(format!(
                    "type {} declared twice in type library",
                    type_hash
                )));
            }
        }

        tracing::debug!("parsed type library with {} types", types.len());
        Ok(TypeSchemaRegistry { types })
    }

    /// Look up the declared layout of `type_hash`
    pub fn schema_for(&self, type_hash: TypeHash) -> Result<&TypeSchema> {
        self.types
            .get(&type_hash)
            .ok_or_else(|| Error::NotFound(format!("type {} not in type library", type_hash)))
    }

    pub fn contains(&self, type_hash: TypeHash) -> bool {
        self.types.contains_key(&type_hash)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeSchema> {
        self.types.values()
    }

    /// One-line summary of a type, naming members through `names` where possible
    pub fn describe_type(&self, type_hash: TypeHash, names: &dyn ThinHashLookup) -> Result<String> {
        let schema = self.schema_for(type_hash)?;
        let members: Vec<String> = schema
            .members
            .iter()
            .map(|m| {
                let count = if m.atom_kind == AtomKind::InlineArray {
                    format!("[{}]", m.element_count)
                } else {
                    String::new()
                };
                format!(
                    "{}: {}<{}>{}",
                    names.name(m.name),
                    m.storage_kind,
                    m.type_hash,
                    count
                )
            })
            .collect();
        Ok(format!(
            "{} ({} bytes) {{ {} }}",
            type_hash,
            schema.size_bytes,
            members.join(", ")
        ))
    }
}
