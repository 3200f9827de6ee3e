//! Entity delta store and patch engine
//!
//! Per-instance customizations are not stored as full component records.
//! Instead, the delta store records byte-range overrides per entity and per
//! component index, and [`DeltaPatcher`] replays them over a copy of the base
//! record before it is decoded.
//!
//! ## Store layout
//!
//! After the instance header comes a descriptor of ten `(offset, count)`
//! pairs, each offset relative to the first byte after the descriptor:
//!
//! | # | section | record |
//! |---|---------|--------|
//! | 0 | entity hashmap | `{resource: u64, settings_index: u32, reserved: u32}` |
//! | 1 | entity settings | `{modified_component_count: u32, first_component_delta_index: u32}` |
//! | 2 | component settings | `{component_index: u32, first_delta_index: u32, delta_count: u32}` |
//! | 3 | deltas | `{offset: u32, size: u32, data_offset: u32}` |
//! | 4 | delta data | raw bytes, count is the byte length |
//!
//! Sections 5 to 9 are reserved.

use std::collections::HashMap;
use std::io::Cursor;

use crate::datalib::definitions::*;
use crate::datalib::header::read_frame;
use crate::datalib::stream::ComponentIndexMap;
use crate::error::{Error, Result};
use crate::hash::{ResourceHash, TypeHash};
use crate::utils::{array_len, slice_at};

/// Type of the delta store instance
pub const ENTITY_DELTA_STORE_TYPE: TypeHash = TypeHash::from_name("EntityDeltaSettingsLibrary");

/// Number of `(offset, count)` pairs in the store descriptor
pub const SECTION_COUNT: usize = 10;

const SECTION_HASHMAP: usize = 0;
const SECTION_ENTITY_SETTINGS: usize = 1;
const SECTION_COMPONENT_SETTINGS: usize = 2;
const SECTION_DELTAS: usize = 3;
const SECTION_DATA: usize = 4;

/// Replace `data.len()` bytes starting at `offset`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteRangePatch {
    pub offset: u32,
    pub data: Vec<u8>,
}

/// Overrides recorded for one component of an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDeltaSettings {
    /// Index into the component index map
    pub component_index: u32,
    pub deltas: Vec<ByteRangePatch>,
}

/// Overrides recorded for one entity, across all its components
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityDeltaSettings {
    pub modified_components: Vec<ComponentDeltaSettings>,
}

/// All entity overrides, keyed by entity resource
#[derive(Debug, Clone, Default)]
pub struct EntityDeltaStore {
    entities: HashMap<ResourceHash, EntityDeltaSettings>,
}

impl EntityDeltaStore {
    /// Parse a delta store blob
    pub fn parse(blob: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(blob);
        let frame = read_frame(&mut cursor)?;
        if frame.type_hash != ENTITY_DELTA_STORE_TYPE {
            return Err(Error::CorruptFormat(format!(
                "delta store has type {}, expected {}",
                frame.type_hash, ENTITY_DELTA_STORE_TYPE
            )));
        }

        let payload = frame.payload;
        let mut cursor = Cursor::new(payload);
        let mut sections = [SectionDescriptor::default(); SECTION_COUNT];
        for section in sections.iter_mut() {
            *section = SectionDescriptor::read(&mut cursor)?;
        }
        let body = &payload[SECTION_COUNT * SectionDescriptor::RECORD_SIZE..];

        let hashmap = read_section(
            body,
            &sections[SECTION_HASHMAP],
            "entity hashmap",
            EntityDeltaMapEntry::RECORD_SIZE,
            |c| EntityDeltaMapEntry::read(c),
        )?;
        let settings = read_section(
            body,
            &sections[SECTION_ENTITY_SETTINGS],
            "entity settings",
            EntityDeltaSettingsRow::RECORD_SIZE,
            |c| EntityDeltaSettingsRow::read(c),
        )?;
        let component_settings = read_section(
            body,
            &sections[SECTION_COMPONENT_SETTINGS],
            "component settings",
            ComponentDeltaSettingsRow::RECORD_SIZE,
            |c| ComponentDeltaSettingsRow::read(c),
        )?;
        let deltas = read_section(
            body,
            &sections[SECTION_DELTAS],
            "deltas",
            DeltaRow::RECORD_SIZE,
            |c| DeltaRow::read(c),
        )?;
        let data_section = &sections[SECTION_DATA];
        let data = slice_at(
            body,
            data_section.offset as usize,
            data_section.count as usize,
            "delta data",
        )?;

        let mut entities = HashMap::with_capacity(hashmap.len());
        for entry in hashmap.iter().filter(|e| !e.resource.is_zero()) {
            let row = settings.get(entry.settings_index as usize).ok_or_else(|| {
                Error::CorruptFormat(format!(
                    "entity {} points at settings row {} of {}",
                    entry.resource,
                    entry.settings_index,
                    settings.len()
                ))
            })?;

            let capacity = (row.modified_component_count as usize).min(component_settings.len());
            let mut modified_components = Vec::with_capacity(capacity);
            for i in 0..row.modified_component_count as usize {
                let at = row.first_component_delta_index as usize + i;
                let component = component_settings.get(at).ok_or_else(|| {
                    Error::CorruptFormat(format!(
                        "entity {} points at component settings row {} of {}",
                        entry.resource,
                        at,
                        component_settings.len()
                    ))
                })?;
                modified_components.push(assemble_component(component, &deltas, data)?);
            }

            entities.insert(entry.resource, EntityDeltaSettings { modified_components });
        }

        if entities.is_empty() {
            tracing::warn!("delta store holds no entities");
        }
        tracing::debug!(
            "parsed delta store: {} entities, {} component settings, {} deltas, {} data bytes",
            entities.len(),
            component_settings.len(),
            deltas.len(),
            data.len()
        );
        Ok(EntityDeltaStore { entities })
    }

    /// Recorded overrides of `resource`, if any
    pub fn get(&self, resource: ResourceHash) -> Option<&EntityDeltaSettings> {
        if resource.is_zero() {
            return None;
        }
        self.entities.get(&resource)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn resources(&self) -> impl Iterator<Item = ResourceHash> + '_ {
        self.entities.keys().copied()
    }
}

fn read_section<T>(
    body: &[u8],
    section: &SectionDescriptor,
    what: &str,
    record_size: usize,
    read: impl Fn(&mut Cursor<&[u8]>) -> Result<T>,
) -> Result<Vec<T>> {
    let len = array_len(section.count as usize, record_size, what)?;
    let bytes = slice_at(body, section.offset as usize, len, what)?;
    read_records(bytes, section.count as usize, read)
}

fn assemble_component(
    row: &ComponentDeltaSettingsRow,
    deltas: &[DeltaRow],
    data: &[u8],
) -> Result<ComponentDeltaSettings> {
    let mut patches = Vec::with_capacity((row.delta_count as usize).min(deltas.len()));
    for i in 0..row.delta_count as usize {
        let at = row.first_delta_index as usize + i;
        let delta = deltas.get(at).ok_or_else(|| {
            Error::CorruptFormat(format!(
                "component {} points at delta {} of {}",
                row.component_index,
                at,
                deltas.len()
            ))
        })?;
        let bytes = slice_at(
            data,
            delta.data_offset as usize,
            delta.size as usize,
            "delta payload",
        )?;
        patches.push(ByteRangePatch {
            offset: delta.offset,
            data: bytes.to_vec(),
        });
    }
    Ok(ComponentDeltaSettings {
        component_index: row.component_index,
        deltas: patches,
    })
}

/// Parse a delta store blob
pub fn parse_delta_store(blob: &[u8]) -> Result<EntityDeltaStore> {
    EntityDeltaStore::parse(blob)
}

/// Outcome counters of one patch application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Byte ranges written
    pub applied: usize,
    /// Component settings for a different component type
    pub skipped_other_type: usize,
    /// Component settings whose index the map does not know
    pub skipped_unknown_index: usize,
}

/// Applies recorded overrides for one component type
pub struct DeltaPatcher<'m> {
    index_map: &'m ComponentIndexMap,
}

impl<'m> DeltaPatcher<'m> {
    pub fn new(index_map: &'m ComponentIndexMap) -> Self {
        DeltaPatcher { index_map }
    }

    /// Patched copy of `raw`; `raw` itself is never modified
    pub fn apply(
        &self,
        component_type: TypeHash,
        raw: &[u8],
        settings: &EntityDeltaSettings,
    ) -> Result<Vec<u8>> {
        self.apply_with_report(component_type, raw, settings)
            .map(|(bytes, _)| bytes)
    }

    /// Like [`apply`](Self::apply), also counting what was skipped
    pub fn apply_with_report(
        &self,
        component_type: TypeHash,
        raw: &[u8],
        settings: &EntityDeltaSettings,
    ) -> Result<(Vec<u8>, PatchReport)> {
        let mut patched = raw.to_vec();
        let mut report = PatchReport::default();

        for component in &settings.modified_components {
            match self.index_map.get(component.component_index) {
                None => {
                    tracing::warn!(
                        "ignoring deltas for unknown component index {}",
                        component.component_index
                    );
                    report.skipped_unknown_index += 1;
                }
                Some(t) if t != component_type => report.skipped_other_type += 1,
                Some(_) => {
                    // List order is significant: later patches overwrite earlier ones
                    for patch in &component.deltas {
                        let start = patch.offset as usize;
                        let end = start + patch.data.len();
                        let target = patched.get_mut(start..end).ok_or_else(|| {
                            Error::CorruptFormat(format!(
                                "delta {}..{} exceeds {}-byte record of type {}",
                                start,
                                end,
                                raw.len(),
                                component_type
                            ))
                        })?;
                        target.copy_from_slice(&patch.data);
                        report.applied += 1;
                    }
                }
            }
        }

        Ok((patched, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datalib::fixtures::DeltaStoreBuilder;

    const HEALTH: TypeHash = TypeHash::from_name("HealthComponent");
    const ARMOR: TypeHash = TypeHash::from_name("ArmorComponent");

    fn index_map() -> ComponentIndexMap {
        [(1, HEALTH), (2, ARMOR)].into_iter().collect()
    }

    fn settings(components: Vec<(u32, Vec<(u32, Vec<u8>)>)>) -> EntityDeltaSettings {
        EntityDeltaSettings {
            modified_components: components
                .into_iter()
                .map(|(component_index, patches)| ComponentDeltaSettings {
                    component_index,
                    deltas: patches
                        .into_iter()
                        .map(|(offset, data)| ByteRangePatch { offset, data })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_parse_store() {
        let blob = DeltaStoreBuilder::new()
            .empty_slots(2)
            .entity(0xE1, vec![(1, vec![(0, vec![1, 2]), (4, vec![3])]), (2, vec![])])
            .entity(0xE2, vec![(2, vec![(8, vec![9; 4])])])
            .build(ENTITY_DELTA_STORE_TYPE);

        let store = parse_delta_store(&blob).unwrap();
        assert_eq!(store.len(), 2);

        let e1 = store.get(ResourceHash(0xE1)).unwrap();
        assert_eq!(e1.modified_components.len(), 2);
        assert_eq!(e1.modified_components[0].component_index, 1);
        assert_eq!(
            e1.modified_components[0].deltas,
            vec![
                ByteRangePatch { offset: 0, data: vec![1, 2] },
                ByteRangePatch { offset: 4, data: vec![3] },
            ]
        );
        assert!(e1.modified_components[1].deltas.is_empty());

        let e2 = store.get(ResourceHash(0xE2)).unwrap();
        assert_eq!(e2.modified_components[0].deltas[0].data, vec![9; 4]);

        assert!(store.get(ResourceHash::ZERO).is_none());
        assert!(store.get(ResourceHash(0xE3)).is_none());
    }

    #[test]
    fn test_wrong_store_type_is_corrupt() {
        let blob = DeltaStoreBuilder::new()
            .entity(0xE1, vec![])
            .build(TypeHash::from_name("NotADeltaStore"));
        assert!(matches!(parse_delta_store(&blob), Err(Error::CorruptFormat(_))));
    }

    #[test]
    fn test_truncated_store() {
        let mut blob = DeltaStoreBuilder::new()
            .entity(0xE1, vec![(1, vec![(0, vec![1, 2, 3, 4])])])
            .build(ENTITY_DELTA_STORE_TYPE);
        blob.truncate(blob.len() - 2);
        assert!(matches!(parse_delta_store(&blob), Err(Error::Truncated(_))));
    }

    #[test]
    fn test_apply_never_mutates_input() {
        let raw = vec![0u8; 8];
        let patched = DeltaPatcher::new(&index_map())
            .apply(HEALTH, &raw, &settings(vec![(1, vec![(2, vec![7, 7])])]))
            .unwrap();
        assert_eq!(raw, vec![0u8; 8]);
        assert_eq!(patched, vec![0, 0, 7, 7, 0, 0, 0, 0]);
    }

    #[test]
    fn test_empty_settings_is_identity() {
        let raw: Vec<u8> = (0..16).collect();
        let patched = DeltaPatcher::new(&index_map())
            .apply(HEALTH, &raw, &EntityDeltaSettings::default())
            .unwrap();
        assert_eq!(patched, raw);
    }

    #[test]
    fn test_disjoint_patches_commute() {
        let raw = vec![0u8; 8];
        let map = index_map();
        let patcher = DeltaPatcher::new(&map);
        let a = (0, vec![1, 1]);
        let b = (4, vec![2, 2]);
        let ab = patcher
            .apply(HEALTH, &raw, &settings(vec![(1, vec![a.clone(), b.clone()])]))
            .unwrap();
        let ba = patcher.apply(HEALTH, &raw, &settings(vec![(1, vec![b, a])])).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab, vec![1, 1, 0, 0, 2, 2, 0, 0]);
    }

    #[test]
    fn test_overlapping_patches_last_in_list_wins() {
        let raw = vec![0u8; 6];
        let map = index_map();
        let patcher = DeltaPatcher::new(&map);
        let wide = (0, vec![1, 1, 1, 1]);
        let narrow = (2, vec![2, 2]);

        let narrow_last = patcher
            .apply(HEALTH, &raw, &settings(vec![(1, vec![wide.clone(), narrow.clone()])]))
            .unwrap();
        assert_eq!(narrow_last, vec![1, 1, 2, 2, 0, 0]);

        let wide_last = patcher
            .apply(HEALTH, &raw, &settings(vec![(1, vec![narrow, wide])]))
            .unwrap();
        assert_eq!(wide_last, vec![1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_other_component_type_is_skipped() {
        let raw = vec![5u8; 4];
        let (patched, report) = DeltaPatcher::new(&index_map())
            .apply_with_report(HEALTH, &raw, &settings(vec![(2, vec![(0, vec![9, 9])])]))
            .unwrap();
        assert_eq!(patched, raw);
        assert_eq!(report.skipped_other_type, 1);
        assert_eq!(report.applied, 0);
    }

    #[test]
    fn test_unknown_index_is_counted_not_fatal() {
        let raw = vec![0u8; 4];
        let (patched, report) = DeltaPatcher::new(&index_map())
            .apply_with_report(
                HEALTH,
                &raw,
                &settings(vec![(99, vec![(0, vec![9])]), (1, vec![(3, vec![4])])]),
            )
            .unwrap();
        assert_eq!(patched, vec![0, 0, 0, 4]);
        assert_eq!(
            report,
            PatchReport {
                applied: 1,
                skipped_other_type: 0,
                skipped_unknown_index: 1
            }
        );
    }

    #[test]
    fn test_out_of_range_patch_is_corrupt() {
        let raw = vec![0u8; 4];
        let err = DeltaPatcher::new(&index_map())
            .apply(HEALTH, &raw, &settings(vec![(1, vec![(3, vec![1, 2])])]))
            .unwrap_err();
        assert!(matches!(err, Error::CorruptFormat(_)));
    }
}
