//! Fixed-layout record structures shared by the DL parsers

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

use crate::error::Result;
use crate::hash::{ResourceHash, TypeHash};

/// `"LDLD"` read as a little-endian u32; starts every framed instance
pub const DL_MAGIC: u32 = 0x444c_444c;

/// Header in front of every framed DL instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DlInstanceHeader {
    pub magic: u32,
    pub type_hash: TypeHash,
    pub payload_size: u32,
}

impl DlInstanceHeader {
    pub const RECORD_SIZE: usize = 12;

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(DlInstanceHeader {
            magic: reader.read_u32::<LittleEndian>()?,
            type_hash: TypeHash(reader.read_u32::<LittleEndian>()?),
            payload_size: reader.read_u32::<LittleEndian>()?,
        })
    }

    pub fn has_magic(&self) -> bool {
        self.magic == DL_MAGIC
    }
}

/// One slot of a component table's sparse index array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentIndexEntry {
    /// Resource owning the row; zero marks an empty slot
    pub resource: ResourceHash,
    /// Row in the dense data array
    pub index: u32,
}

impl ComponentIndexEntry {
    pub const RECORD_SIZE: usize = 16;

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let resource = ResourceHash(reader.read_u64::<LittleEndian>()?);
        let index = reader.read_u32::<LittleEndian>()?;
        let _reserved = reader.read_u32::<LittleEndian>()?;
        Ok(ComponentIndexEntry { resource, index })
    }

    pub fn is_empty(&self) -> bool {
        self.resource.is_zero()
    }
}

/// `(offset, count)` pair locating one delta-store section relative to its base
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionDescriptor {
    pub offset: u32,
    pub count: u32,
}

impl SectionDescriptor {
    pub const RECORD_SIZE: usize = 8;

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(SectionDescriptor {
            offset: reader.read_u32::<LittleEndian>()?,
            count: reader.read_u32::<LittleEndian>()?,
        })
    }
}

/// Delta store hashmap slot: entity resource to settings row
#[derive(Debug, Clone, Copy)]
pub struct EntityDeltaMapEntry {
    pub resource: ResourceHash,
    pub settings_index: u32,
}

impl EntityDeltaMapEntry {
    pub const RECORD_SIZE: usize = 16;

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let resource = ResourceHash(reader.read_u64::<LittleEndian>()?);
        let settings_index = reader.read_u32::<LittleEndian>()?;
        let _reserved = reader.read_u32::<LittleEndian>()?;
        Ok(EntityDeltaMapEntry {
            resource,
            settings_index,
        })
    }
}

/// Per-entity settings row
#[derive(Debug, Clone, Copy)]
pub struct EntityDeltaSettingsRow {
    pub modified_component_count: u32,
    pub first_component_delta_index: u32,
}

impl EntityDeltaSettingsRow {
    pub const RECORD_SIZE: usize = 8;

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(EntityDeltaSettingsRow {
            modified_component_count: reader.read_u32::<LittleEndian>()?,
            first_component_delta_index: reader.read_u32::<LittleEndian>()?,
        })
    }
}

/// Per-component settings row
#[derive(Debug, Clone, Copy)]
pub struct ComponentDeltaSettingsRow {
    pub component_index: u32,
    pub first_delta_index: u32,
    pub delta_count: u32,
}

impl ComponentDeltaSettingsRow {
    pub const RECORD_SIZE: usize = 12;

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(ComponentDeltaSettingsRow {
            component_index: reader.read_u32::<LittleEndian>()?,
            first_delta_index: reader.read_u32::<LittleEndian>()?,
            delta_count: reader.read_u32::<LittleEndian>()?,
        })
    }
}

/// Raw patch descriptor: `size` bytes at `data_offset` replace the record bytes at `offset`
#[derive(Debug, Clone, Copy)]
pub struct DeltaRow {
    pub offset: u32,
    pub size: u32,
    pub data_offset: u32,
}

impl DeltaRow {
    pub const RECORD_SIZE: usize = 12;

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(DeltaRow {
            offset: reader.read_u32::<LittleEndian>()?,
            size: reader.read_u32::<LittleEndian>()?,
            data_offset: reader.read_u32::<LittleEndian>()?,
        })
    }
}

/// Read `count` consecutive records from the front of `data`
pub(crate) fn read_records<T>(
    data: &[u8],
    count: usize,
    read: impl Fn(&mut std::io::Cursor<&[u8]>) -> Result<T>,
) -> Result<Vec<T>> {
    let mut cursor = std::io::Cursor::new(data);
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        records.push(read(&mut cursor)?);
    }
    Ok(records)
}
