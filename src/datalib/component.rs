//! Component tables and resolution
//!
//! Every component kind is stored the same way: one framed instance whose
//! type has exactly two members, a sparse inline array of
//! [`ComponentIndexEntry`] and a dense inline array of fixed-size records.
//! [`ComponentKind`] names the three types involved plus the record size the
//! caller's decoder was compiled against.

use std::collections::HashMap;

use crate::datalib::definitions::{read_records, ComponentIndexEntry};
use crate::datalib::header::locate_instance;
use crate::datalib::schema::{TypeSchema, TypeSchemaRegistry};
use crate::datalib::types::{AtomKind, StorageKind};
use crate::error::{Error, Result};
use crate::hash::{ResourceHash, TypeHash};
use crate::utils::{array_len, slice_at};

/// Compiled-in description of one component kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentKind {
    /// Readable name for logs
    pub name: &'static str,
    /// Type of the table instance
    pub component: TypeHash,
    /// Element type of member 0
    pub index_entry: TypeHash,
    /// Element type of member 1
    pub record: TypeHash,
    /// Size of one record as the decoder expects it
    pub record_size: usize,
}

impl ComponentKind {
    /// Number of members a component table type must declare
    pub const MEMBER_COUNT: usize = 2;

    pub const fn new(
        name: &'static str,
        component: TypeHash,
        index_entry: TypeHash,
        record: TypeHash,
        record_size: usize,
    ) -> Self {
        ComponentKind {
            name,
            component,
            index_entry,
            record,
            record_size,
        }
    }

    /// Check the shipped type library against this kind's compiled layout
    ///
    /// Returns the table schema on success. Runs before any table byte is read.
    pub fn validate<'r>(&self, registry: &'r TypeSchemaRegistry) -> Result<&'r TypeSchema> {
        let schema = registry.schema_for(self.component)?;

        if schema.members.len() != Self::MEMBER_COUNT {
            return Err(Error::violated(
                self.component,
                None,
                format!("{} members", Self::MEMBER_COUNT),
                format!("{} members", schema.members.len()),
            ));
        }

        for (slot, expected) in [(0, self.index_entry), (1, self.record)] {
            let member = &schema.members[slot];
            if member.atom_kind != AtomKind::InlineArray {
                return Err(Error::violated(
                    self.component,
                    Some(slot),
                    AtomKind::InlineArray,
                    member.atom_kind,
                ));
            }
            if member.storage_kind != StorageKind::Struct {
                return Err(Error::violated(
                    self.component,
                    Some(slot),
                    StorageKind::Struct,
                    member.storage_kind,
                ));
            }
            if member.type_hash != expected {
                return Err(Error::violated(
                    self.component,
                    Some(slot),
                    format!("element type {}", expected),
                    format!("element type {}", member.type_hash),
                ));
            }
        }

        self.check_element_size(registry, 0, self.index_entry, ComponentIndexEntry::RECORD_SIZE)?;
        self.check_element_size(registry, 1, self.record, self.record_size)?;

        Ok(schema)
    }

    fn check_element_size(
        &self,
        registry: &TypeSchemaRegistry,
        slot: usize,
        element: TypeHash,
        expected: usize,
    ) -> Result<()> {
        // Element types the library does not describe are accepted on the member check alone
        if let Ok(element_schema) = registry.schema_for(element) {
            if element_schema.size_bytes as usize != expected {
                return Err(Error::violated(
                    self.component,
                    Some(slot),
                    format!("{}-byte elements", expected),
                    format!("{}-byte elements", element_schema.size_bytes),
                ));
            }
        }
        Ok(())
    }

    /// Validate, locate and decode this kind's table from `blob`
    pub fn load_table(&self, registry: &TypeSchemaRegistry, blob: &[u8]) -> Result<ComponentTable> {
        let schema = self.validate(registry)?;
        let index_count = schema.members[0].element_count as usize;
        let record_count = schema.members[1].element_count as usize;

        let frame = locate_instance(blob, self.component)?;
        ComponentTable::parse(frame.payload, index_count, record_count, self.record_size)
            .map_err(|e| match e {
                Error::Truncated(msg) => Error::Truncated(format!("{} table: {}", self.name, msg)),
                other => other,
            })
    }
}

/// Decoded sparse index + dense data of one component kind
#[derive(Debug, Clone)]
pub struct ComponentTable {
    entries: Vec<ComponentIndexEntry>,
    /// First non-empty slot per resource
    by_resource: HashMap<ResourceHash, u32>,
    data: Vec<u8>,
    record_size: usize,
    record_count: usize,
}

impl ComponentTable {
    /// Decode a table payload holding `index_count` entries then `record_count` records
    pub fn parse(
        payload: &[u8],
        index_count: usize,
        record_count: usize,
        record_size: usize,
    ) -> Result<Self> {
        let index_len = array_len(index_count, ComponentIndexEntry::RECORD_SIZE, "index array")?;
        let data_len = array_len(record_count, record_size, "data array")?;

        let index_bytes = slice_at(payload, 0, index_len, "index array")?;
        let data = slice_at(payload, index_len, data_len, "data array")?.to_vec();

        let entries = read_records(index_bytes, index_count, |c| ComponentIndexEntry::read(c))?;

        let mut by_resource = HashMap::with_capacity(entries.len());
        for entry in entries.iter().filter(|e| !e.is_empty()) {
            by_resource.entry(entry.resource).or_insert(entry.index);
        }

        Ok(ComponentTable {
            entries,
            by_resource,
            data,
            record_size,
            record_count,
        })
    }

    /// Raw record bytes for `resource`
    ///
    /// The zero hash marks empty slots and never resolves.
    pub fn resolve(&self, resource: ResourceHash) -> Result<&[u8]> {
        if resource.is_zero() {
            return Err(Error::NotFound("zero resource hash marks an empty slot".into()));
        }

        let index = *self
            .by_resource
            .get(&resource)
            .ok_or_else(|| Error::NotFound(format!("no component row for resource {}", resource)))?;

        if index as usize >= self.record_count {
            return Err(Error::CorruptFormat(format!(
                "resource {} points at row {} of {}",
                resource, index, self.record_count
            )));
        }

        let start = self.record_size * index as usize;
        Ok(&self.data[start..start + self.record_size])
    }

    pub fn contains(&self, resource: ResourceHash) -> bool {
        !resource.is_zero() && self.by_resource.contains_key(&resource)
    }

    /// Non-empty index entries in table order
    pub fn entries(&self) -> impl Iterator<Item = &ComponentIndexEntry> {
        self.entries.iter().filter(|e| !e.is_empty())
    }

    /// Resources with a row in this table
    pub fn resources(&self) -> impl Iterator<Item = ResourceHash> + '_ {
        self.entries().map(|e| e.resource)
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }
}

/// Typed decoder for one component kind's records
///
/// `decode` receives exactly `KIND.record_size` bytes, already patched with
/// any entity deltas.
pub trait ComponentRecord: Sized {
    const KIND: ComponentKind;

    fn decode(raw: &[u8]) -> Result<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datalib::fixtures::{frame, table_payload, MemberSpec, TypeLibraryBuilder};

    const HEALTH: ComponentKind = ComponentKind::new(
        "HealthComponent",
        TypeHash::from_name("HealthComponent"),
        TypeHash::from_name("HealthComponentIndexEntry"),
        TypeHash::from_name("HealthComponentData"),
        8,
    );

    fn library(members: &[MemberSpec]) -> TypeSchemaRegistry {
        let data = TypeLibraryBuilder::new()
            .add(HEALTH.component, 0, members)
            .add(HEALTH.index_entry, 16, &[])
            .add(HEALTH.record, 8, &[])
            .build();
        TypeSchemaRegistry::parse(&data).unwrap()
    }

    fn record(value: u64) -> Vec<u8> {
        value.to_le_bytes().to_vec()
    }

    fn valid_members(index_count: u32, record_count: u32) -> Vec<MemberSpec> {
        vec![
            MemberSpec::inline_struct(HEALTH.index_entry, index_count),
            MemberSpec::inline_struct(HEALTH.record, record_count),
        ]
    }

    #[test]
    fn test_resolve_returns_indexed_record() {
        let registry = library(&valid_members(4, 3));
        let payload = table_payload(
            &[(0, 0), (0xAA, 2), (0xBB, 0), (0, 1)],
            &[record(100), record(200), record(300)],
        );
        let blob = frame(HEALTH.component, &payload);

        let table = HEALTH.load_table(&registry, &blob).unwrap();
        assert_eq!(table.resolve(ResourceHash(0xAA)).unwrap(), &record(300)[..]);
        assert_eq!(table.resolve(ResourceHash(0xBB)).unwrap(), &record(100)[..]);
        assert!(table.resolve(ResourceHash(0xCC)).unwrap_err().is_not_found());
        assert_eq!(
            table.resources().collect::<Vec<_>>(),
            vec![ResourceHash(0xAA), ResourceHash(0xBB)]
        );
    }

    #[test]
    fn test_zero_resource_never_resolves() {
        let registry = library(&valid_members(2, 2));
        let payload = table_payload(&[(0, 1), (0x10, 0)], &[record(1), record(2)]);
        let blob = frame(HEALTH.component, &payload);

        let table = HEALTH.load_table(&registry, &blob).unwrap();
        assert!(table.resolve(ResourceHash::ZERO).unwrap_err().is_not_found());
        assert!(!table.contains(ResourceHash::ZERO));
        assert_eq!(table.entries().count(), 1);
    }

    #[test]
    fn test_duplicate_resource_keeps_first_row() {
        let table = ComponentTable::parse(
            &table_payload(&[(0x10, 1), (0x10, 0)], &[record(1), record(2)]),
            2,
            2,
            8,
        )
        .unwrap();
        assert_eq!(table.resolve(ResourceHash(0x10)).unwrap(), &record(2)[..]);
    }

    #[test]
    fn test_three_members_fail_before_reading_data() {
        let mut members = valid_members(1, 1);
        members.push(MemberSpec::basic(TypeHash(0), StorageKind::UInt32));
        let registry = library(&members);

        // An empty blob would be NotFound if the table were ever located
        let err = HEALTH.load_table(&registry, &[]).unwrap_err();
        match err {
            Error::FormatAssumptionViolated {
                type_hash,
                member,
                expected,
                observed,
            } => {
                assert_eq!(type_hash, HEALTH.component);
                assert_eq!(member, None);
                assert_eq!(expected, "2 members");
                assert_eq!(observed, "3 members");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_member_shape_violations_name_the_member() {
        let mut members = valid_members(1, 1);
        members[1].atom_kind = AtomKind::Pointer;
        let err = HEALTH.validate(&library(&members)).unwrap_err();
        assert!(matches!(err, Error::FormatAssumptionViolated { member: Some(1), .. }));

        let mut members = valid_members(1, 1);
        members[0].storage_kind = StorageKind::UInt64;
        let err = HEALTH.validate(&library(&members)).unwrap_err();
        assert!(matches!(err, Error::FormatAssumptionViolated { member: Some(0), .. }));

        let mut members = valid_members(1, 1);
        members[1].type_hash = TypeHash::from_name("SomethingElse");
        let err = HEALTH.validate(&library(&members)).unwrap_err();
        assert!(matches!(err, Error::FormatAssumptionViolated { member: Some(1), .. }));
    }

    #[test]
    fn test_record_size_drift_is_detected() {
        let data = TypeLibraryBuilder::new()
            .add(HEALTH.component, 0, &valid_members(1, 1))
            .add(HEALTH.record, 12, &[])
            .build();
        let registry = TypeSchemaRegistry::parse(&data).unwrap();
        let err = HEALTH.validate(&registry).unwrap_err();
        assert!(err.to_string().contains("expected 8-byte elements, found 12-byte elements"));
    }

    #[test]
    fn test_unknown_component_type_is_not_found() {
        let registry = TypeSchemaRegistry::default();
        assert!(HEALTH.validate(&registry).unwrap_err().is_not_found());
    }

    #[test]
    fn test_short_payload_is_truncated() {
        let registry = library(&valid_members(2, 2));
        let payload = table_payload(&[(0x10, 0), (0x20, 1)], &[record(1)]);
        let blob = frame(HEALTH.component, &payload);
        assert!(matches!(HEALTH.load_table(&registry, &blob), Err(Error::Truncated(_))));
    }

    #[test]
    fn test_row_out_of_range_is_corrupt() {
        let payload = table_payload(&[(0x10, 5)], &[record(1)]);
        let table = ComponentTable::parse(&payload, 1, 1, 8).unwrap();
        assert!(matches!(table.resolve(ResourceHash(0x10)), Err(Error::CorruptFormat(_))));
    }
}
