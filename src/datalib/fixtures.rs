//! Synthetic blob builders for unit tests

use byteorder::{LittleEndian, WriteBytesExt};

use crate::datalib::definitions::DL_MAGIC;
use crate::datalib::types::{AtomKind, StorageKind};
use crate::hash::{ThinHash, TypeHash};

/// Header + payload of one framed instance
pub fn frame(type_hash: TypeHash, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(12 + payload.len());
    out.write_u32::<LittleEndian>(DL_MAGIC).unwrap();
    out.write_u32::<LittleEndian>(type_hash.0).unwrap();
    out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
    out.extend_from_slice(payload);
    out
}

#[derive(Debug, Clone, Copy)]
pub struct MemberSpec {
    pub name: ThinHash,
    pub type_hash: TypeHash,
    pub atom_kind: AtomKind,
    pub storage_kind: StorageKind,
    pub element_count: u32,
}

impl MemberSpec {
    pub fn inline_struct(type_hash: TypeHash, element_count: u32) -> Self {
        MemberSpec {
            name: ThinHash(0),
            type_hash,
            atom_kind: AtomKind::InlineArray,
            storage_kind: StorageKind::Struct,
            element_count,
        }
    }

    pub fn basic(type_hash: TypeHash, storage_kind: StorageKind) -> Self {
        MemberSpec {
            name: ThinHash(0),
            type_hash,
            atom_kind: AtomKind::Basic,
            storage_kind,
            element_count: 1,
        }
    }
}

#[derive(Default)]
pub struct TypeLibraryBuilder {
    types: Vec<(TypeHash, u32, Vec<MemberSpec>)>,
}

impl TypeLibraryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, type_hash: TypeHash, size: u32, members: &[MemberSpec]) -> Self {
        self.types.push((type_hash, size, members.to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.write_u32::<LittleEndian>(self.types.len() as u32).unwrap();
        for (type_hash, size, members) in &self.types {
            out.write_u32::<LittleEndian>(type_hash.0).unwrap();
            out.write_u32::<LittleEndian>(*size).unwrap();
            out.write_u32::<LittleEndian>(members.len() as u32).unwrap();
            for m in members {
                out.write_u32::<LittleEndian>(m.name.0).unwrap();
                out.write_u32::<LittleEndian>(m.type_hash.0).unwrap();
                out.write_u8(m.atom_kind.into()).unwrap();
                out.write_u8(m.storage_kind.into()).unwrap();
                out.write_u16::<LittleEndian>(0).unwrap();
                out.write_u32::<LittleEndian>(m.element_count).unwrap();
            }
        }
        out
    }
}

/// Payload of a component table: sparse index entries then dense records
pub fn table_payload(entries: &[(u64, u32)], records: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for &(resource, index) in entries {
        out.write_u64::<LittleEndian>(resource).unwrap();
        out.write_u32::<LittleEndian>(index).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap();
    }
    for record in records {
        out.extend_from_slice(record);
    }
    out
}

/// Entities stream: a bare leading frame, then `(Some(index), ..)` indexed
/// frames or `(None, ..)` bare frames
pub fn entity_stream(first: TypeHash, rest: &[(Option<u32>, TypeHash, Vec<u8>)]) -> Vec<u8> {
    let mut out = frame(first, &[0u8; 4]);
    for (index, type_hash, payload) in rest {
        if let Some(index) = index {
            out.write_u32::<LittleEndian>(*index).unwrap();
        }
        out.extend(frame(*type_hash, payload));
    }
    out
}

/// One entity's recorded overrides: `(component_index, [(offset, bytes)])`
pub type EntityDeltas = Vec<(u32, Vec<(u32, Vec<u8>)>)>;

#[derive(Default)]
pub struct DeltaStoreBuilder {
    entities: Vec<(u64, EntityDeltas)>,
    /// Zero-resource slots to scatter into the hashmap
    empty_slots: usize,
}

impl DeltaStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, resource: u64, components: EntityDeltas) -> Self {
        self.entities.push((resource, components));
        self
    }

    pub fn empty_slots(mut self, count: usize) -> Self {
        self.empty_slots = count;
        self
    }

    pub fn build(&self, store_type: TypeHash) -> Vec<u8> {
        let mut hashmap = Vec::new();
        let mut settings = Vec::new();
        let mut component_settings = Vec::new();
        let mut deltas = Vec::new();
        let mut data = Vec::new();
        let (mut n_settings, mut n_components, mut n_deltas, mut n_map) = (0u32, 0u32, 0u32, 0u32);

        for _ in 0..self.empty_slots {
            hashmap.write_u64::<LittleEndian>(0).unwrap();
            hashmap.write_u32::<LittleEndian>(0xdead).unwrap();
            hashmap.write_u32::<LittleEndian>(0).unwrap();
            n_map += 1;
        }

        for (resource, components) in &self.entities {
            hashmap.write_u64::<LittleEndian>(*resource).unwrap();
            hashmap.write_u32::<LittleEndian>(n_settings).unwrap();
            hashmap.write_u32::<LittleEndian>(0).unwrap();
            n_map += 1;

            settings.write_u32::<LittleEndian>(components.len() as u32).unwrap();
            settings.write_u32::<LittleEndian>(n_components).unwrap();
            n_settings += 1;

            for (component_index, patches) in components {
                component_settings.write_u32::<LittleEndian>(*component_index).unwrap();
                component_settings.write_u32::<LittleEndian>(n_deltas).unwrap();
                component_settings.write_u32::<LittleEndian>(patches.len() as u32).unwrap();
                n_components += 1;

                for (offset, bytes) in patches {
                    deltas.write_u32::<LittleEndian>(*offset).unwrap();
                    deltas.write_u32::<LittleEndian>(bytes.len() as u32).unwrap();
                    deltas.write_u32::<LittleEndian>(data.len() as u32).unwrap();
                    data.extend_from_slice(bytes);
                    n_deltas += 1;
                }
            }
        }

        let sections = [
            (hashmap, n_map),
            (settings, n_settings),
            (component_settings, n_components),
            (deltas, n_deltas),
        ];

        let mut body = Vec::new();
        let mut descriptor = Vec::new();
        for (bytes, count) in &sections {
            descriptor.write_u32::<LittleEndian>(body.len() as u32).unwrap();
            descriptor.write_u32::<LittleEndian>(*count).unwrap();
            body.extend_from_slice(bytes);
        }
        descriptor.write_u32::<LittleEndian>(body.len() as u32).unwrap();
        descriptor.write_u32::<LittleEndian>(data.len() as u32).unwrap();
        body.extend_from_slice(&data);
        // reserved sections
        for _ in 0..5 {
            descriptor.write_u32::<LittleEndian>(0).unwrap();
            descriptor.write_u32::<LittleEndian>(0).unwrap();
        }

        let mut payload = descriptor;
        payload.extend(body);
        frame(store_type, &payload)
    }
}

/// One lookup tree: `(type, [(key, value)])`
pub type Tree = (u32, Vec<(u64, u64)>);

#[derive(Default, Clone)]
pub struct HashLookupBuilder {
    pub parents: Vec<Vec<u64>>,
    /// Zero counts written before each parent's real count
    pub parent_padding: usize,
    pub arrays: [Vec<u64>; 3],
    pub map1: Vec<(u64, u64)>,
    pub thin_map: Vec<(u32, u64)>,
    /// Flat map and trees of each of the four groups
    pub groups: [(Vec<(u64, u64)>, Vec<Tree>); 4],
    pub sentinel: Option<u32>,
}

impl HashLookupBuilder {
    pub fn new() -> Self {
        HashLookupBuilder {
            sentinel: Some(0xDEAD_BEE7),
            ..Default::default()
        }
    }

    fn write_array(out: &mut Vec<u8>, values: &[u64]) {
        out.write_u32::<LittleEndian>(values.len() as u32).unwrap();
        for v in values {
            out.write_u64::<LittleEndian>(*v).unwrap();
        }
    }

    fn write_map(out: &mut Vec<u8>, pairs: &[(u64, u64)]) {
        out.write_u32::<LittleEndian>(pairs.len() as u32).unwrap();
        for (k, v) in pairs {
            out.write_u64::<LittleEndian>(*k).unwrap();
            out.write_u64::<LittleEndian>(*v).unwrap();
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.write_u32::<LittleEndian>(self.parents.len() as u32).unwrap();
        for parent in &self.parents {
            for _ in 0..self.parent_padding {
                out.write_u32::<LittleEndian>(0).unwrap();
            }
            Self::write_array(&mut out, parent);
        }

        Self::write_array(&mut out, &self.arrays[0]);
        Self::write_map(&mut out, &self.map1);
        Self::write_array(&mut out, &self.arrays[1]);
        Self::write_array(&mut out, &self.arrays[2]);

        out.write_u32::<LittleEndian>(self.thin_map.len() as u32).unwrap();
        for (k, v) in &self.thin_map {
            out.write_u32::<LittleEndian>(*k).unwrap();
            out.write_u64::<LittleEndian>(*v).unwrap();
        }

        for (map, trees) in &self.groups {
            Self::write_map(&mut out, map);
            out.write_u32::<LittleEndian>(trees.len() as u32).unwrap();
            for (tree_type, entries) in trees {
                out.write_u32::<LittleEndian>(*tree_type).unwrap();
                out.write_u32::<LittleEndian>(0).unwrap();
                out.write_u32::<LittleEndian>(entries.len() as u32).unwrap();
                for (k, v) in entries {
                    out.write_u64::<LittleEndian>(*k).unwrap();
                    out.write_u64::<LittleEndian>(*v).unwrap();
                }
            }
        }

        if let Some(sentinel) = self.sentinel {
            out.write_u32::<LittleEndian>(sentinel).unwrap();
        }
        out
    }
}
